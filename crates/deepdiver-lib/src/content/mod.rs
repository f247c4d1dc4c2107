//! Local document checks and preparation before upload.

pub mod html;
pub mod processor;

pub use processor::{ContentInfo, ContentProcessor, PreparedContent};

const UNITS: &[(&str, u64)] = &[
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("B", 1),
];

/// Parse sizes like `50MB`, `1.5 GB`, `512kb` or `100` (bytes).
pub fn parse_file_size(input: &str) -> Option<u64> {
    let s = input.trim().to_ascii_uppercase();
    if s.is_empty() {
        return None;
    }
    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (n.trim(), *mult)))
        .unwrap_or((s.as_str(), 1));
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64) as u64)
}

pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1}{}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1}TB", size)
}
