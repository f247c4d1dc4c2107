//! Local library of downloaded Audio Overviews: `<output_dir>/<name>.mp3`
//! with an optional `<name>_metadata.json` sidecar.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::settings::AudioSettings;
use crate::errors::{DeepDiverError, Result};

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_TITLE_LEN: usize = 100;
const MIN_AUDIO_BYTES: u64 = 1024;
const AUDIO_EXTENSION: &str = "mp3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub file_size: u64,
    pub file_size_mb: f64,
    /// Larger than 1KB.
    pub has_content: bool,
    /// Starts with an ID3 tag or an MPEG frame sync.
    pub format_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastMetadata {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub source_file: PathBuf,
    pub saved_file: PathBuf,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_check: Option<QualityReport>,
    /// Caller supplied fields such as notebook id or artifact details.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PodcastEntry {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub metadata: Option<PodcastMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedPodcast {
    pub filename: String,
    pub path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    pub metadata: PodcastMetadata,
}

pub struct PodcastManager {
    output_dir: PathBuf,
    naming_pattern: String,
    write_metadata: bool,
    quality_check: bool,
}

impl PodcastManager {
    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self {
            output_dir: PathBuf::from(&settings.output_dir),
            naming_pattern: settings.naming_pattern.clone(),
            write_metadata: settings.metadata_embed,
            quality_check: settings.quality_check,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Expand the naming pattern. Supports `{title}`, `{timestamp}`,
    /// `{date}` and `{time}`.
    pub fn generate_filename(&self, title: &str, at: DateTime<Local>) -> String {
        let name = self
            .naming_pattern
            .replace("{title}", &clean_title(title))
            .replace("{timestamp}", &at.format("%Y%m%d_%H%M%S").to_string())
            .replace("{date}", &at.format("%Y%m%d").to_string())
            .replace("{time}", &at.format("%H%M%S").to_string());
        format!("{}.{}", name, AUDIO_EXTENSION)
    }

    /// Copy `source` into the library under a generated name.
    pub fn save(&self, source: &Path, title: &str, extra: Map<String, Value>) -> Result<SavedPodcast> {
        if !source.is_file() {
            return Err(DeepDiverError::Content(format!(
                "Source file not found: {}",
                source.display()
            )));
        }
        std::fs::create_dir_all(&self.output_dir)?;

        let filename = self.generate_filename(title, Local::now());
        let path = self.output_dir.join(&filename);
        std::fs::copy(source, &path)?;

        let quality_check = if self.quality_check {
            let report = check_quality(&path)?;
            if !report.has_content || !report.format_valid {
                tracing::warn!(path = %path.display(), ?report, "downloaded audio looks suspicious");
            }
            Some(report)
        } else {
            None
        };

        let metadata = PodcastMetadata {
            title: title.to_string(),
            created_at: Utc::now(),
            source_file: source.to_path_buf(),
            saved_file: path.clone(),
            file_size: std::fs::metadata(&path)?.len(),
            quality_check,
            extra,
        };

        let metadata_path = if self.write_metadata {
            let sidecar = metadata_path_for(&path);
            std::fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)?;
            Some(sidecar)
        } else {
            None
        };

        tracing::info!(path = %path.display(), "podcast saved");
        Ok(SavedPodcast {
            filename,
            path,
            metadata_path,
            metadata,
        })
    }

    /// Every `.mp3` in the library, newest first.
    pub fn list(&self) -> Result<Vec<PodcastEntry>> {
        if !self.output_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.output_dir)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(AUDIO_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                entries.push(self.entry(name, &path)?);
            }
        }
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    pub fn info(&self, filename: &str) -> Result<Option<PodcastEntry>> {
        let path = self.library_path(filename)?;
        if !path.is_file() {
            return Ok(None);
        }
        self.entry(filename, &path).map(Some)
    }

    /// Remove a podcast and its sidecar. Returns false when it did not exist.
    pub fn delete(&self, filename: &str) -> Result<bool> {
        let path = self.library_path(filename)?;
        if !path.is_file() {
            tracing::warn!(filename, "podcast not found");
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        let sidecar = metadata_path_for(&path);
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)?;
        }
        tracing::info!(filename, "podcast deleted");
        Ok(true)
    }

    pub fn cleanup_old(&self, days: u64) -> Result<usize> {
        self.cleanup_before(Utc::now() - ChronoDuration::days(days as i64))
    }

    /// Delete podcasts created before `cutoff`. Creation time comes from the
    /// sidecar, or the file's modification time without one.
    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut deleted = 0;
        for entry in self.list()? {
            let created = entry
                .metadata
                .as_ref()
                .map(|m| m.created_at)
                .or(entry.modified);
            if created.is_some_and(|c| c < cutoff) && self.delete(&entry.filename)? {
                deleted += 1;
            }
        }
        tracing::info!(deleted, "old podcasts cleaned up");
        Ok(deleted)
    }

    fn library_path(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename == ".."
        {
            return Err(DeepDiverError::Command(format!(
                "Invalid podcast file name: '{}'",
                filename
            )));
        }
        Ok(self.output_dir.join(filename))
    }

    fn entry(&self, filename: &str, path: &Path) -> Result<PodcastEntry> {
        let meta = std::fs::metadata(path)?;
        let sidecar = metadata_path_for(path);
        let metadata = if sidecar.exists() {
            match std::fs::read_to_string(&sidecar)
                .map_err(DeepDiverError::from)
                .and_then(|raw| Ok(serde_json::from_str::<PodcastMetadata>(&raw)?))
            {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!(path = %sidecar.display(), error = %e, "unreadable podcast metadata");
                    None
                }
            }
        } else {
            None
        };
        Ok(PodcastEntry {
            filename: filename.to_string(),
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            metadata,
        })
    }
}

/// Strip characters that are unsafe in file names, join whitespace runs
/// with `_` and cap the length.
pub fn clean_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let joined = replaced.split_whitespace().collect::<Vec<_>>().join("_");
    joined.chars().take(MAX_TITLE_LEN).collect()
}

pub fn metadata_path_for(audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    audio.with_file_name(format!("{}_metadata.json", stem))
}

pub fn check_quality(path: &Path) -> Result<QualityReport> {
    use std::io::Read;

    let file_size = std::fs::metadata(path)?.len();
    let mut header = [0u8; 10];
    let read = std::fs::File::open(path)?.read(&mut header)?;
    let header = &header[..read];
    let format_valid = header.starts_with(b"ID3") || header.starts_with(&[0xFF, 0xFB]);

    Ok(QualityReport {
        file_size,
        file_size_mb: (file_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        has_content: file_size > MIN_AUDIO_BYTES,
        format_valid,
    })
}
