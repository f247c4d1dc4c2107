pub mod discovery;
pub mod endpoint;
pub mod manager;
pub mod settings;

pub use endpoint::{resolve_cdp_url, CdpUrlSource, CDP_URL_ENV, DEFAULT_CDP_URL};
pub use manager::ConfigManager;
pub use settings::DeepDiverConfig;
