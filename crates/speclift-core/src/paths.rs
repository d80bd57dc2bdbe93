use crate::chain::ChainId;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECLIFT_DIR: &str = ".speclift";
pub const CHAINS_DIR: &str = ".speclift/chains";
pub const CONFIG_FILE: &str = ".speclift/config.yaml";

pub const LATEST_STEM: &str = "latest";
pub const LATEST_FILE: &str = "latest.json";
pub const DOCUMENT_EXT: &str = "json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn speclift_dir(root: &Path) -> PathBuf {
    root.join(SPECLIFT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<state_root>/<chain_id>`: one State Directory per chain.
pub fn chain_dir(state_root: &Path, chain: &ChainId) -> PathBuf {
    state_root.join(chain.as_str())
}

pub fn latest_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LATEST_FILE)
}
