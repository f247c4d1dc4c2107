pub mod manager;

pub use manager::{PodcastEntry, PodcastManager, PodcastMetadata, QualityReport, SavedPodcast};
