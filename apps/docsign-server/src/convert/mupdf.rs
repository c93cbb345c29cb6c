//! In-process MuPDF converter (feature `mupdf`)
//!
//! Renders page 1 so its long side is [`MUPDF_LONG_SIDE`] pixels and writes
//! `<base>-1.jpg`. Builds without the feature keep the stage in the chain
//! but report it unavailable, so the pipeline falls through to pdftoppm.

use std::path::PathBuf;

use async_trait::async_trait;

use super::converter::Converter;
use super::types::{ConversionJob, ConvertError};

/// Target size of the rendered page's longer edge
pub const MUPDF_LONG_SIDE: f32 = 600.0;

/// JPEG quality of the raw render; the canonical preview is re-encoded later
#[cfg(feature = "mupdf")]
const RAW_JPEG_QUALITY: u8 = 95;

pub struct MupdfConverter;

impl MupdfConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MupdfConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "mupdf")]
#[async_trait]
impl Converter for MupdfConverter {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    async fn attempt_convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        let converter = self.name();
        let pdf_path = job.pdf_path.clone();
        let target = job.out_dir.join(format!("{}-1.jpg", job.base_name));

        let jpeg = tokio::task::spawn_blocking(move || render_first_page(&pdf_path))
            .await
            .map_err(|e| ConvertError::Join(e.to_string()))?
            .map_err(|reason| ConvertError::Failed { converter, reason })?;

        // The render itself never touches the output directory; an attempt
        // dropped by the pipeline timeout stops here without writing.
        tokio::fs::write(&target, jpeg).await?;
        job.discover_output(converter).await
    }
}

/// Render page 1 of `pdf_path` and return it JPEG-encoded
#[cfg(feature = "mupdf")]
fn render_first_page(pdf_path: &std::path::Path) -> Result<Vec<u8>, String> {
    use image::codecs::jpeg::JpegEncoder;
    use ::mupdf::{Colorspace, Document, Matrix};

    let path = pdf_path
        .to_str()
        .ok_or_else(|| format!("non UTF-8 path {}", pdf_path.display()))?;
    let doc = Document::open(path).map_err(|e| e.to_string())?;
    let page = doc.load_page(0).map_err(|e| e.to_string())?;
    let bounds = page.bounds().map_err(|e| e.to_string())?;

    let long_side = (bounds.x1 - bounds.x0).max(bounds.y1 - bounds.y0);
    if long_side <= 0.0 {
        return Err("empty page bounds".to_string());
    }
    let scale = MUPDF_LONG_SIDE / long_side;
    let matrix = Matrix::new_scale(scale, scale);
    let pixmap = page
        .to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)
        .map_err(|e| e.to_string())?;

    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for px in samples.chunks(n.max(1)).take((width * height) as usize) {
        let r = px.first().copied().unwrap_or(255);
        let g = px.get(1).copied().unwrap_or(r);
        let b = px.get(2).copied().unwrap_or(r);
        rgb.extend_from_slice(&[r, g, b]);
    }
    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| "failed to create image buffer".to_string())?;

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, RAW_JPEG_QUALITY)
        .encode_image(&img)
        .map_err(|e| e.to_string())?;

    tracing::debug!(width, height, pdf = %pdf_path.display(), "mupdf rendered first page");
    Ok(jpeg)
}

#[cfg(not(feature = "mupdf"))]
#[async_trait]
impl Converter for MupdfConverter {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    async fn attempt_convert(&self, _job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        Err(ConvertError::Unavailable {
            converter: self.name(),
            reason: "built without the mupdf feature".to_string(),
        })
    }
}


#[cfg(all(test, feature = "mupdf"))]
mod render_tests {
    use super::*;

    /// Blank two-page PDF: a 300x400 portrait page, then an 800x200 landscape one
    fn two_page_pdf() -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 800 200] >>",
        ];
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        pdf
    }

    fn names_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_renders_only_first_page() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, two_page_pdf()).unwrap();
        let job = ConversionJob::for_pdf(&pdf).unwrap();

        let output = MupdfConverter::new().attempt_convert(&job).await.unwrap();
        assert_eq!(output, dir.path().join("doc-1.jpg"));
        assert_eq!(names_in(dir.path()), vec!["doc-1.jpg", "doc.pdf"]);

        // Portrait page 1 scaled to a 600px long side; page 2 would be 600x150
        let (width, height) = image::image_dimensions(&output).unwrap();
        assert_eq!(height, 600);
        assert!((449..=451).contains(&width), "width {}", width);
    }

    #[test]
    fn test_render_leaves_directory_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, two_page_pdf()).unwrap();

        let jpeg = render_first_page(&pdf).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
        assert_eq!(names_in(dir.path()), vec!["doc.pdf"]);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("broken.pdf");
        std::fs::write(&pdf, b"not a pdf at all").unwrap();
        let job = ConversionJob::for_pdf(&pdf).unwrap();

        let result = MupdfConverter::new().attempt_convert(&job).await;
        assert!(matches!(result, Err(ConvertError::Failed { converter: "mupdf", .. })));
        assert_eq!(names_in(dir.path()), vec!["broken.pdf"]);
    }
}
