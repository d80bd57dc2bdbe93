pub mod config;
pub mod document;
pub mod init;
pub mod resume;
pub mod state;

use anyhow::Context as _;
use speclift_core::{chain::ChainId, config::Config, store, store::StateStore};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Global flags every command needs.
pub struct Context {
    pub root: PathBuf,
    pub json: bool,
    pub chain: Option<String>,
    pub state_dir: Option<PathBuf>,
}

impl Context {
    pub fn config(&self) -> anyhow::Result<Config> {
        Config::load_or_default(&self.root).context("failed to load .speclift/config.yaml")
    }

    pub fn state_root(&self) -> anyhow::Result<PathBuf> {
        Ok(self.config()?.state_root(&self.root))
    }

    /// The store commands act on.
    ///
    /// `--state-dir` wins and is used as-is. Otherwise the chain comes from
    /// `--chain`, or is inferred when the state root holds exactly one.
    pub fn store(&self) -> anyhow::Result<StateStore> {
        self.try_store()?
            .ok_or_else(|| anyhow::anyhow!("no chains found: run 'speclift init' first"))
    }

    /// Like [`Context::store`], but `None` when no chain exists yet, for
    /// queries where an empty workspace is a valid answer.
    pub fn try_store(&self) -> anyhow::Result<Option<StateStore>> {
        if let Some(dir) = &self.state_dir {
            return Ok(Some(StateStore::open(dir.clone())));
        }
        let state_root = self.state_root()?;
        let chain = match &self.chain {
            Some(raw) => raw.parse::<ChainId>()?,
            None => {
                let mut chains = store::list_chains(&state_root)?;
                match chains.len() {
                    0 => return Ok(None),
                    1 => chains.remove(0),
                    n => anyhow::bail!(
                        "{n} chains found in {}: pass --chain or set SPECLIFT_CHAIN",
                        state_root.display()
                    ),
                }
            }
        };
        tracing::debug!(chain = %chain, root = %state_root.display(), "resolved chain store");
        Ok(Some(StateStore::for_chain(&state_root, &chain)))
    }
}

/// Read a document from `file`, or from stdin when no file is given.
pub fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Print a document as pretty JSON regardless of `--json`: documents are
/// already machine-readable.
pub fn print_document(doc: &speclift_core::document::StageDocument) -> anyhow::Result<()> {
    crate::output::print_json(doc)
}
