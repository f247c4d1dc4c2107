use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{format_file_size, html, parse_file_size};
use crate::config::settings::ContentSettings;
use crate::errors::{DeepDiverError, Result};

const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Outcome of preparing a local file for upload.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedContent {
    pub original: PathBuf,
    /// File to hand to the upload; differs from `original` for converted HTML.
    pub upload_path: PathBuf,
    pub format: String,
    pub size: u64,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    pub format: Option<String>,
    pub readable: bool,
    /// Why validation failed, if it did.
    pub problem: Option<String>,
}

pub struct ContentProcessor {
    supported_formats: Vec<String>,
    max_file_size: u64,
    temp_dir: PathBuf,
}

impl ContentProcessor {
    pub fn from_settings(settings: &ContentSettings) -> Self {
        let max_file_size = parse_file_size(&settings.max_file_size).unwrap_or_else(|| {
            tracing::warn!(value = %settings.max_file_size, "unparsable max_file_size, using 50MB");
            DEFAULT_MAX_FILE_SIZE
        });
        Self {
            supported_formats: settings
                .supported_formats
                .iter()
                .map(|f| f.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_file_size,
            temp_dir: PathBuf::from(&settings.temp_dir),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Check existence, extension, size limit and readability. Returns the
    /// file's size and lower-case extension.
    pub fn validate_file(&self, path: &Path) -> Result<(u64, String)> {
        let meta = std::fs::metadata(path).map_err(|_| {
            DeepDiverError::Content(format!("File not found: {}", path.display()))
        })?;
        if !meta.is_file() {
            return Err(DeepDiverError::Content(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let format = extension(path).unwrap_or_default();
        if !self.supported_formats.contains(&format) {
            return Err(DeepDiverError::Content(format!(
                "Unsupported file format: '{}'. Supported formats: {}",
                format,
                self.supported_formats.join(", ")
            )));
        }

        let size = meta.len();
        if size > self.max_file_size {
            return Err(DeepDiverError::Content(format!(
                "File too large: {}. Maximum allowed: {}",
                format_file_size(size),
                format_file_size(self.max_file_size)
            )));
        }

        probe_readable(path)
            .map_err(|e| DeepDiverError::Content(format!("File not readable: {}", e)))?;

        tracing::debug!(path = %path.display(), size, format = %format, "file validated");
        Ok((size, format))
    }

    /// Validate `path` and convert it into something NotebookLM ingests
    /// cleanly. HTML is reduced to plain text under `output_dir` (default the
    /// temp dir); other formats upload as-is.
    pub fn prepare(&self, path: &Path, output_dir: Option<&Path>) -> Result<PreparedContent> {
        let (size, format) = self.validate_file(path)?;
        let mut steps = vec!["File validation completed".to_string()];

        let upload_path = match format.as_str() {
            "html" | "htm" => {
                let dir = output_dir.unwrap_or(&self.temp_dir);
                std::fs::create_dir_all(dir)?;
                let raw = std::fs::read_to_string(path)?;
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("document");
                let out = dir.join(format!("processed_{}.txt", stem));
                std::fs::write(&out, html::html_to_text(&raw))?;
                steps.push("HTML converted to plain text".into());
                out
            }
            "txt" | "md" => {
                steps.push("Text file ready for upload".into());
                path.to_path_buf()
            }
            _ => {
                steps.push("Binary file ready for upload".into());
                path.to_path_buf()
            }
        };

        tracing::info!(path = %path.display(), upload = %upload_path.display(), "content prepared");
        Ok(PreparedContent {
            original: path.to_path_buf(),
            upload_path,
            format,
            size,
            steps,
        })
    }

    pub fn info(&self, path: &Path) -> ContentInfo {
        let meta = std::fs::metadata(path).ok();
        ContentInfo {
            path: path.to_path_buf(),
            exists: meta.is_some(),
            size: meta.as_ref().map(|m| m.len()).unwrap_or(0),
            format: extension(path),
            readable: probe_readable(path).is_ok(),
            problem: self.validate_file(path).err().map(|e| e.to_string()),
        }
    }

    /// Remove regular files directly under the temp dir. Returns the count.
    pub fn cleanup_temp_files(&self) -> Result<usize> {
        if !self.temp_dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.temp_dir)?.flatten() {
            let path = entry.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
                tracing::debug!(path = %path.display(), "removed temp file");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn probe_readable(path: &Path) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    std::fs::File::open(path)?.read(&mut buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(dir: &Path) -> ContentProcessor {
        ContentProcessor::from_settings(&ContentSettings {
            supported_formats: vec!["pdf".into(), "txt".into(), "html".into(), ".MD".into()],
            max_file_size: "1KB".into(),
            temp_dir: dir.join("temp").to_string_lossy().into_owned(),
        })
    }

    #[test]
    fn test_validate_file() {
        let tmp = tempfile::tempdir().unwrap();
        let p = processor(tmp.path());

        let ok = tmp.path().join("notes.MD");
        std::fs::write(&ok, "# hi").unwrap();
        assert_eq!(p.validate_file(&ok).unwrap(), (4, "md".to_string()));

        let big = tmp.path().join("big.txt");
        std::fs::write(&big, vec![b'a'; 2048]).unwrap();
        let err = p.validate_file(&big).unwrap_err().to_string();
        assert!(err.contains("too large"), "{}", err);

        let exe = tmp.path().join("tool.exe");
        std::fs::write(&exe, "x").unwrap();
        assert!(p.validate_file(&exe).unwrap_err().to_string().contains("Unsupported"));

        assert!(p
            .validate_file(&tmp.path().join("missing.pdf"))
            .unwrap_err()
            .to_string()
            .contains("not found"));
        assert!(p.validate_file(tmp.path()).is_err());
    }

    #[test]
    fn test_prepare_html_converts_to_text() {
        let tmp = tempfile::tempdir().unwrap();
        let p = processor(tmp.path());
        let page = tmp.path().join("article.html");
        std::fs::write(&page, "<html><body><p>Deep   dive</p><script>x()</script></body></html>").unwrap();

        let prepared = p.prepare(&page, None).unwrap();
        assert_eq!(prepared.format, "html");
        assert_eq!(prepared.upload_path, p.temp_dir().join("processed_article.txt"));
        assert_eq!(std::fs::read_to_string(&prepared.upload_path).unwrap(), "Deep dive");
        assert_eq!(prepared.steps.len(), 2);

        assert_eq!(p.cleanup_temp_files().unwrap(), 1);
        assert!(!prepared.upload_path.exists());
    }

    #[test]
    fn test_prepare_passthrough() {
        let tmp = tempfile::tempdir().unwrap();
        let p = processor(tmp.path());
        let pdf = tmp.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let prepared = p.prepare(&pdf, None).unwrap();
        assert_eq!(prepared.upload_path, pdf);
        assert_eq!(prepared.steps[1], "Binary file ready for upload");
    }

    #[test]
    fn test_info() {
        let tmp = tempfile::tempdir().unwrap();
        let p = processor(tmp.path());
        let missing = p.info(&tmp.path().join("nope.pdf"));
        assert!(!missing.exists);
        assert!(!missing.readable);
        assert!(missing.problem.is_some());

        let txt = tmp.path().join("a.txt");
        std::fs::write(&txt, "hello").unwrap();
        let info = p.info(&txt);
        assert!(info.exists && info.readable);
        assert_eq!(info.size, 5);
        assert_eq!(info.format.as_deref(), Some("txt"));
        assert!(info.problem.is_none());
    }

    #[test]
    fn test_bad_limit_falls_back() {
        let p = ContentProcessor::from_settings(&ContentSettings {
            max_file_size: "huge".into(),
            ..ContentSettings::default()
        });
        assert_eq!(p.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }
}
