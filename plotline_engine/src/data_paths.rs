use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Environment variable that points the engine at a specific data directory.
pub const DATA_DIR_VAR: &str = "PLOTLINE_DATA_DIR";

/// Default story file name inside the data directory.
pub const STORY_FILE: &str = "story.ron";

/// Default engine configuration file name inside the data directory.
pub const CONFIG_FILE: &str = "plotline.toml";

/// Cached path to the directory holding story and config files.
static DATA_ROOT: LazyLock<PathBuf> = LazyLock::new(detect_data_root);

/// Construct a data path relative to the resolved data root.
pub fn data_path(relative: impl AsRef<Path>) -> PathBuf {
    DATA_ROOT.join(relative)
}

pub fn story_path() -> PathBuf {
    data_path(STORY_FILE)
}

pub fn config_path() -> PathBuf {
    data_path(CONFIG_FILE)
}

fn detect_data_root() -> PathBuf {
    let override_dir = env::var_os(DATA_DIR_VAR).map(PathBuf::from);
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    candidate_roots(override_dir, exe_dir.as_deref())
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| PathBuf::from("plotline_engine/data"))
}

/// Directories to probe, most specific first: the env override, the
/// workspace layout, a flattened `data/`, then the same next to the executable.
fn candidate_roots(override_dir: Option<PathBuf>, exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = override_dir.into_iter().collect();
    candidates.push(PathBuf::from("plotline_engine/data"));
    candidates.push(PathBuf::from("data"));

    if let Some(dir) = exe_dir {
        candidates.push(dir.join("plotline_engine/data"));
        candidates.push(dir.join("data"));
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join("plotline_engine/data"));
            candidates.push(parent.join("data"));
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_is_probed_first() {
        let roots = candidate_roots(Some(PathBuf::from("/tmp/story")), Some(Path::new("/opt/plotline/bin")));
        assert_eq!(roots.first(), Some(&PathBuf::from("/tmp/story")));
        assert!(roots.contains(&PathBuf::from("/opt/plotline/bin/data")));
        assert!(roots.contains(&PathBuf::from("/opt/plotline/data")));
    }

    #[test]
    fn workspace_layout_without_executable() {
        let roots = candidate_roots(None, None);
        assert_eq!(roots, vec![PathBuf::from("plotline_engine/data"), PathBuf::from("data")]);
    }
}
