//! Application state management

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::convert::ConversionPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: ConversionPipeline,
}

impl AppState {
    /// State with the standard converter chain for `config`
    pub fn new(config: Config) -> Self {
        let pipeline = ConversionPipeline::standard(&config.convert);
        Self::with_pipeline(config, pipeline)
    }

    /// State with an explicit converter chain
    pub fn with_pipeline(config: Config, pipeline: ConversionPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the conversion pipeline
    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.inner.pipeline
    }

    /// Root of the per-customer upload directories
    pub fn upload_base_dir(&self) -> &Path {
        &self.inner.config.storage.upload_base_dir
    }
}
