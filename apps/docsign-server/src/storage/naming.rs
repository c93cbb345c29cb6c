//! Deterministic artifact naming
//!
//! `<customerId>[-<terms>]-<YYYY-MM-DD_HH-MM-SS><ext>`. Second resolution
//! and no disambiguator: two saves for the same customer and terms within
//! one second land on the same name and the later one overwrites.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

/// Longest customer id kept after sanitizing
pub const CUSTOMER_ID_MAX_DIGITS: usize = 8;

/// Directory name for ids with no digits at all
pub const UNKNOWN_CUSTOMER: &str = "unknown";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Keep the first 8 ASCII digits; `unknown` if none
pub fn sanitize_customer_id(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(CUSTOMER_ID_MAX_DIGITS)
        .collect();
    if digits.is_empty() {
        UNKNOWN_CUSTOMER.to_string()
    } else {
        digits
    }
}

/// Trim, fold whitespace runs to `-`, keep only `[A-Za-z0-9_-]`
pub fn sanitize_terms(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Local wall-clock time, second resolution
pub fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}

/// `ext` includes its dot (`.jpg`) or is empty
pub fn make_filename(customer_id: &str, terms: &str, stamp: &str, ext: &str) -> String {
    let cid = sanitize_customer_id(customer_id);
    let terms = sanitize_terms(terms);
    if terms.is_empty() {
        format!("{}-{}{}", cid, stamp, ext)
    } else {
        format!("{}-{}-{}{}", cid, terms, stamp, ext)
    }
}

/// `<base>/<sanitized id>`
pub fn customer_dir(upload_base_dir: &Path, customer_id: &str) -> PathBuf {
    upload_base_dir.join(sanitize_customer_id(customer_id))
}

/// URL under the static `/uploads` mount
pub fn web_path(customer_dir_name: &str, filename: &str) -> String {
    format!(
        "/uploads/{}/{}",
        customer_dir_name,
        urlencoding::encode(filename)
    )
}

/// Web path for a file stored directly inside a customer directory
pub fn web_path_for(path: &Path) -> Option<String> {
    let filename = path.file_name()?.to_str()?;
    let dir = path.parent()?.file_name()?.to_str()?;
    Some(web_path(dir, filename))
}

/// Lowercased extension with its dot, or empty
pub fn dotted_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const TS: &str = "2024-03-05_07-08-09";

    #[test]
    fn test_sanitize_customer_id() {
        assert_eq!(sanitize_customer_id("123"), "123");
        assert_eq!(sanitize_customer_id("abc123"), "123");
        assert_eq!(sanitize_customer_id("12-34 56/78 90"), "12345678");
        assert_eq!(sanitize_customer_id(""), UNKNOWN_CUSTOMER);
        assert_eq!(sanitize_customer_id("../etc"), UNKNOWN_CUSTOMER);
        assert_eq!(sanitize_customer_id("١٢٣"), UNKNOWN_CUSTOMER);
    }

    #[test]
    fn test_sanitize_terms() {
        assert_eq!(sanitize_terms("PAN-Peri"), "PAN-Peri");
        assert_eq!(sanitize_terms("  PAN   Peri\tFI "), "PAN-Peri-FI");
        assert_eq!(sanitize_terms("Núcleo/../x"), "Ncleox");
        assert_eq!(sanitize_terms(""), "");
        assert_eq!(sanitize_terms("   "), "");
    }

    #[test]
    fn test_make_filename() {
        assert_eq!(make_filename("123", "PAN-Peri", TS, ".jpg"), format!("123-PAN-Peri-{}.jpg", TS));
        assert_eq!(make_filename("abc123", "", TS, ".jpg"), format!("123-{}.jpg", TS));
        assert_eq!(make_filename("", "", TS, ".png"), format!("unknown-{}.png", TS));
        assert_eq!(make_filename("42", "x", TS, ""), format!("42-x-{}", TS));
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(format_timestamp(&at), TS);
        assert_eq!(timestamp_now().len(), TS.len());
    }

    #[test]
    fn test_web_paths() {
        assert_eq!(web_path("123", "a b.jpg"), "/uploads/123/a%20b.jpg");
        assert_eq!(
            web_path_for(Path::new("/srv/uploads/123/123-PAN-x-preview.jpg")).as_deref(),
            Some("/uploads/123/123-PAN-x-preview.jpg")
        );
        assert_eq!(customer_dir(Path::new("/srv/uploads"), "x9"), PathBuf::from("/srv/uploads/9"));
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension("Scan.PDF"), ".pdf");
        assert_eq!(dotted_extension("photo.jpeg"), ".jpeg");
        assert_eq!(dotted_extension("noext"), "");
    }
}
