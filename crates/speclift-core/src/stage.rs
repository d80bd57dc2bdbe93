use crate::error::{Result, SpecliftError};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

/// Variant suffix on a stage ordinal. Variants at one ordinal are mutually
/// exclusive alternatives, not sequential steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    A,
    B,
}

impl Branch {
    pub fn as_char(self) -> char {
        match self {
            Branch::A => 'a',
            Branch::B => 'b',
        }
    }
}

// ---------------------------------------------------------------------------
// StageName
// ---------------------------------------------------------------------------

/// A stage identifier such as `01-setup-and-scope` or `03b-cross-cutting`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageName {
    ordinal: u8,
    branch: Option<Branch>,
    slug: String,
}

static STAGE_RE: OnceLock<Regex> = OnceLock::new();

fn stage_re() -> &'static Regex {
    STAGE_RE.get_or_init(|| Regex::new(r"^(\d{2})([ab])?-([a-z-]+)$").unwrap())
}

impl StageName {
    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    pub fn branch(&self) -> Option<Branch> {
        self.branch
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// On-disk file name of this stage's document.
    pub fn file_name(&self) -> String {
        format!("{self}.{}", paths::DOCUMENT_EXT)
    }

    /// Parse a directory entry name (`NN[ab]-slug.json`) back to a stage.
    /// Returns `None` for anything else, including `latest.json`.
    pub fn from_file_name(name: &str) -> Option<StageName> {
        let stem = name.strip_suffix(".json")?;
        stem.parse().ok()
    }

    /// True when both names are variants of the same ordinal.
    pub fn is_sibling_of(&self, other: &StageName) -> bool {
        self.ordinal == other.ordinal && self != other
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.ordinal)?;
        if let Some(b) = self.branch {
            write!(f, "{}", b.as_char())?;
        }
        write!(f, "-{}", self.slug)
    }
}

impl std::str::FromStr for StageName {
    type Err = SpecliftError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = stage_re()
            .captures(s)
            .ok_or_else(|| SpecliftError::InvalidStageName(s.to_string()))?;
        let ordinal = caps[1]
            .parse::<u8>()
            .map_err(|_| SpecliftError::InvalidStageName(s.to_string()))?;
        let branch = caps.get(2).map(|m| match m.as_str() {
            "a" => Branch::A,
            _ => Branch::B,
        });
        Ok(StageName {
            ordinal,
            branch,
            slug: caps[3].to_string(),
        })
    }
}

impl Serialize for StageName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StageName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub const DEFAULT_STAGES: &[&str] = &[
    "00-bootstrap",
    "01-setup-and-scope",
    "02-file-inventory",
    "03a-full-app",
    "03b-cross-cutting",
    "04-deep-analysis",
    "05-spec-generation",
    "06-report",
];

/// The fixed, ordered stage sequence of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<StageName>,
}

impl Pipeline {
    /// Build a pipeline from stage names. Ordinals must not go backwards,
    /// names must be unique, and stages sharing an ordinal must all carry a
    /// branch suffix.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut stages: Vec<StageName> = Vec::with_capacity(names.len());
        for raw in names {
            let stage: StageName = raw.as_ref().parse()?;
            if let Some(prev) = stages.last() {
                if stage.ordinal < prev.ordinal {
                    return Err(SpecliftError::InvalidPipeline(format!(
                        "'{stage}' comes after '{prev}' but has a lower ordinal"
                    )));
                }
                if stage.ordinal == prev.ordinal
                    && (stage.branch.is_none() || prev.branch.is_none())
                {
                    return Err(SpecliftError::InvalidPipeline(format!(
                        "'{prev}' and '{stage}' share ordinal {:02} without branch suffixes",
                        stage.ordinal
                    )));
                }
            }
            if stages
                .iter()
                .any(|s| s.ordinal == stage.ordinal && s.branch == stage.branch)
            {
                return Err(SpecliftError::InvalidPipeline(format!(
                    "duplicate stage slot for '{stage}'"
                )));
            }
            stages.push(stage);
        }
        Ok(Pipeline { stages })
    }

    pub fn stages(&self) -> &[StageName] {
        &self.stages
    }

    pub fn contains(&self, stage: &StageName) -> bool {
        self.stages.contains(stage)
    }

    pub fn position(&self, stage: &StageName) -> Option<usize> {
        self.stages.iter().position(|s| s == stage)
    }

    /// The stage to run after `last`, for resuming a chain.
    ///
    /// `None` as input means nothing has run yet. Sibling branch variants of
    /// `last` are skipped: only one of them runs per chain.
    pub fn next_after(&self, last: Option<&StageName>) -> Option<&StageName> {
        match last {
            None => self.stages.first(),
            Some(last) => self.stages.iter().find(|s| s.ordinal > last.ordinal),
        }
    }

    /// All variants registered at `ordinal`.
    pub fn alternatives(&self, ordinal: u8) -> Vec<&StageName> {
        self.stages.iter().filter(|s| s.ordinal == ordinal).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::from_names(DEFAULT_STAGES).expect("default pipeline is well-formed")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> StageName {
        s.parse().unwrap()
    }

    #[test]
    fn valid_stage_names() {
        for s in ["00-bootstrap", "01-setup-and-scope", "03a-full-app", "03b-x", "99-a"] {
            let parsed: StageName = s.parse().unwrap_or_else(|_| panic!("expected valid: {s}"));
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn invalid_stage_names() {
        for s in [
            "",
            "latest",
            "1-setup",
            "001-setup",
            "03c-other",
            "01_setup",
            "01-Setup",
            "01-setup2",
            "01-",
        ] {
            assert!(s.parse::<StageName>().is_err(), "expected invalid: {s}");
        }
    }

    #[test]
    fn parts_are_exposed() {
        let s = name("03b-cross-cutting");
        assert_eq!(s.ordinal(), 3);
        assert_eq!(s.branch(), Some(Branch::B));
        assert_eq!(s.slug(), "cross-cutting");
        assert_eq!(s.file_name(), "03b-cross-cutting.json");
    }

    #[test]
    fn from_file_name_filters() {
        assert_eq!(
            StageName::from_file_name("02-file-inventory.json"),
            Some(name("02-file-inventory"))
        );
        assert_eq!(StageName::from_file_name("latest.json"), None);
        assert_eq!(StageName::from_file_name("02-file-inventory.yaml"), None);
        assert_eq!(StageName::from_file_name("notes.txt"), None);
    }

    #[test]
    fn default_pipeline_is_ordered() {
        let p = Pipeline::default();
        assert_eq!(p.stages().len(), DEFAULT_STAGES.len());
        assert_eq!(p.stages()[0], name("00-bootstrap"));
        assert_eq!(p.alternatives(3).len(), 2);
        assert_eq!(p.position(&name("03b-cross-cutting")), Some(4));
        assert!(p.contains(&name("06-report")));
        assert!(!p.contains(&name("07-extra")));
    }

    #[test]
    fn next_after_skips_branch_siblings() {
        let p = Pipeline::default();
        assert_eq!(p.next_after(None), Some(&name("00-bootstrap")));
        assert_eq!(
            p.next_after(Some(&name("02-file-inventory"))),
            Some(&name("03a-full-app"))
        );
        assert_eq!(
            p.next_after(Some(&name("03a-full-app"))),
            Some(&name("04-deep-analysis"))
        );
        assert_eq!(
            p.next_after(Some(&name("03b-cross-cutting"))),
            Some(&name("04-deep-analysis"))
        );
        assert_eq!(p.next_after(Some(&name("06-report"))), None);
    }

    #[test]
    fn next_after_unknown_stage_uses_ordinal() {
        let p = Pipeline::default();
        assert_eq!(
            p.next_after(Some(&name("01-custom"))),
            Some(&name("02-file-inventory"))
        );
    }

    #[test]
    fn siblings() {
        assert!(name("03a-full-app").is_sibling_of(&name("03b-cross-cutting")));
        assert!(!name("03a-full-app").is_sibling_of(&name("03a-full-app")));
        assert!(!name("03a-full-app").is_sibling_of(&name("04-x")));
    }

    #[test]
    fn pipeline_rejects_backwards_ordinals() {
        let err = Pipeline::from_names(&["02-b", "01-a"]).unwrap_err();
        assert!(matches!(err, SpecliftError::InvalidPipeline(_)));
    }

    #[test]
    fn pipeline_rejects_unbranched_shared_ordinal() {
        assert!(Pipeline::from_names(&["01-a", "01-b"]).is_err());
        assert!(Pipeline::from_names(&["01-a", "01b-b"]).is_err());
        assert!(Pipeline::from_names(&["01a-a", "01b-b"]).is_ok());
    }

    #[test]
    fn pipeline_rejects_duplicates() {
        assert!(Pipeline::from_names(&["01a-a", "01a-b"]).is_err());
    }

    #[test]
    fn pipeline_rejects_bad_names() {
        let err = Pipeline::from_names(&["00-ok", "latest"]).unwrap_err();
        assert!(matches!(err, SpecliftError::InvalidStageName(_)));
    }

    #[test]
    fn stage_name_serde() {
        let s = name("03a-full-app");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"03a-full-app\"");
        let back: StageName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(serde_json::from_str::<StageName>("\"bogus\"").is_err());
    }
}
