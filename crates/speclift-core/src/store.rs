use crate::chain::ChainId;
use crate::document::{self, StageDocument};
use crate::error::{Result, SpecliftError};
use crate::io;
use crate::paths;
use crate::stage::StageName;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// One State Directory: a JSON document per completed stage plus
/// `latest.json`, a copy of the most recent successful save.
///
/// A store opened with [`StateStore::for_chain`] lives under the chain's own
/// directory and refuses documents from any other chain.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    chain: Option<ChainId>,
}

impl StateStore {
    /// Open a store over an arbitrary directory, without a chain binding.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            chain: None,
        }
    }

    /// Open the store for `chain` under `state_root`.
    pub fn for_chain(state_root: &Path, chain: &ChainId) -> Self {
        Self {
            dir: paths::chain_dir(state_root, chain),
            chain: Some(chain.clone()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chain(&self) -> Option<&ChainId> {
        self.chain.as_ref()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn init(&self) -> Result<()> {
        io::ensure_dir(&self.dir)
    }

    /// Parse `text` and save it under `stage`. See [`StateStore::save`].
    pub fn save_raw(&self, stage: &str, text: &str) -> Result<StageDocument> {
        let stage: StageName = stage.parse()?;
        let doc = StageDocument::parse(text)?;
        self.save_checked(&stage, &doc)
    }

    /// Validate `doc` and persist it as `stage`'s document and as the Latest
    /// Pointer. Returns the saved document.
    ///
    /// Every check runs before the first byte hits disk: on error the
    /// directory is exactly as it was.
    pub fn save(&self, stage: &str, doc: &StageDocument) -> Result<StageDocument> {
        let stage: StageName = stage.parse()?;
        self.save_checked(&stage, doc)
    }

    fn save_checked(&self, stage: &StageName, doc: &StageDocument) -> Result<StageDocument> {
        document::validate(doc).into_result()?;
        if let Some(expected) = &self.chain {
            let found = doc.chain_id().unwrap_or_default();
            if found != expected.as_str() {
                return Err(SpecliftError::ChainMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let data = doc.to_pretty_json()?;
        let stage_path = self.dir.join(stage.file_name());
        let latest_path = paths::latest_path(&self.dir);
        io::atomic_write_all(&[
            (stage_path.as_path(), data.as_bytes()),
            (latest_path.as_path(), data.as_bytes()),
        ])?;

        tracing::debug!(stage = %stage, dir = %self.dir.display(), "saved stage document");
        Ok(doc.clone())
    }

    pub fn load(&self, stage: &str) -> Result<StageDocument> {
        let name: StageName = stage
            .parse()
            .map_err(|_| SpecliftError::NotFound(stage.to_string()))?;
        self.read_document(&self.dir.join(name.file_name()), stage)
    }

    pub fn load_latest(&self) -> Result<StageDocument> {
        self.read_document(&paths::latest_path(&self.dir), paths::LATEST_STEM)
    }

    fn read_document(&self, path: &Path, label: &str) -> Result<StageDocument> {
        let text = io::read_optional(path)?
            .ok_or_else(|| SpecliftError::NotFound(label.to_string()))?;
        tracing::debug!(path = %path.display(), "loaded stage document");
        StageDocument::parse(&text).map_err(|e| match e {
            SpecliftError::Malformed(reason) => {
                SpecliftError::Malformed(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    // -----------------------------------------------------------------------
    // Completion tracking
    // -----------------------------------------------------------------------

    /// The most recently completed stage, judged from the stage files on
    /// disk (not the Latest Pointer).
    ///
    /// Highest ordinal wins. Branch variants at the same ordinal are
    /// alternatives, so a tie goes to the newer file, then to the name.
    /// A missing or unreadable directory means nothing has run.
    pub fn last_stage(&self) -> Option<StageName> {
        self.scan()
            .into_iter()
            .max_by(|(a, a_time), (b, b_time)| {
                a.ordinal()
                    .cmp(&b.ordinal())
                    .then(a_time.cmp(b_time))
                    .then_with(|| a.to_string().cmp(&b.to_string()))
            })
            .map(|(name, _)| name)
    }

    /// True when a document for `stage` has been saved in this directory.
    pub fn is_complete(&self, stage: &str) -> bool {
        match stage.parse::<StageName>() {
            Ok(name) => self.dir.join(name.file_name()).is_file(),
            Err(_) => false,
        }
    }

    /// Every saved stage, ordered by ordinal then name.
    pub fn completed_stages(&self) -> Vec<StageName> {
        let mut stages: Vec<StageName> = self.scan().into_iter().map(|(n, _)| n).collect();
        stages.sort_by(|a, b| {
            a.ordinal()
                .cmp(&b.ordinal())
                .then_with(|| a.to_string().cmp(&b.to_string()))
        });
        stages
    }

    fn scan(&self) -> Vec<(StageName, SystemTime)> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = StageName::from_file_name(entry.file_name().to_str()?)?;
                let meta = std::fs::metadata(entry.path()).ok()?;
                if !meta.is_file() {
                    return None;
                }
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((name, modified))
            })
            .collect()
    }
}

/// Chain directories present under `state_root`, sorted. A missing root
/// yields an empty list.
pub fn list_chains(state_root: &Path) -> Result<Vec<ChainId>> {
    let entries = match std::fs::read_dir(state_root) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut chains = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<ChainId>().ok())
        {
            chains.push(id);
        }
    }
    chains.sort();
    Ok(chains)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
