use std::path::{Path, PathBuf};

/// Config locations relative to the working directory, in priority order.
pub const LOCAL_CANDIDATES: &[&str] = &["deepdiver/deepdiver.yaml", "deepdiver.yaml"];

/// Config locations relative to `$HOME`, checked after the local ones.
pub const HOME_CANDIDATES: &[&str] = &[".config/deepdiver/deepdiver.yaml", ".deepdiver/deepdiver.yaml"];

/// Ordered list of paths that are probed for a config file.
///
/// An explicit path comes first, then the working-directory candidates, then
/// the home-directory candidates.
pub fn candidate_paths(explicit: Option<&Path>, cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    paths.extend(LOCAL_CANDIDATES.iter().map(|c| cwd.join(c)));
    if let Some(home) = home {
        paths.extend(HOME_CANDIDATES.iter().map(|c| home.join(c)));
    }
    paths
}

/// Returns the first candidate that exists on disk.
///
/// An explicit path that does not exist is skipped rather than treated as an
/// error; the caller falls through to the fixed list and then to defaults.
pub fn discover_in(explicit: Option<&Path>, cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if !p.is_file() {
            tracing::warn!(path = %p.display(), "config file not found, searching default locations");
        }
    }
    candidate_paths(explicit, cwd, home)
        .into_iter()
        .find(|p| p.is_file())
}

/// [`discover_in`] against the process working directory and `$HOME`.
pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let home = std::env::var_os("HOME").map(PathBuf::from);
    discover_in(explicit, &cwd, home.as_deref())
}
