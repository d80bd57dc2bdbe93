use crate::error::{Result, SpecliftError};
use crate::paths;
use crate::stage::{Pipeline, StageName, DEFAULT_STAGES};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Root under which each chain gets its own directory. Relative paths
    /// are resolved against the project root.
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(paths::CHAINS_DIR)
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,
}

fn default_stages() -> Vec<String> {
    DEFAULT_STAGES.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            state: StateConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SpecliftError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load the project config, or fall back to defaults named after the
    /// root directory when none has been written yet.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(SpecliftError::NotInitialized) => {
                let name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "project".to_string());
                Ok(Self::new(name))
            }
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        Pipeline::from_names(self.pipeline.stages.as_slice())
    }

    /// Absolute state root for this project.
    pub fn state_root(&self, root: &Path) -> PathBuf {
        if self.state.dir.is_absolute() {
            self.state.dir.clone()
        } else {
            root.join(&self.state.dir)
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.pipeline.stages.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "pipeline.stages is empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for stage in &self.pipeline.stages {
            if stage.parse::<StageName>().is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "stage '{stage}' does not match NN[a|b]-slug (e.g. 03a-full-app)"
                    ),
                });
            }
            if !seen.insert(stage.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("stage '{stage}' is listed more than once"),
                });
            }
        }

        // Ordering problems only make sense once every name parses.
        if warnings.is_empty() {
            if let Err(e) = self.pipeline() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: e.to_string(),
                });
            }
        }

        if let Ok(pipeline) = self.pipeline() {
            for stage in pipeline.stages() {
                if stage.branch().is_some() && pipeline.alternatives(stage.ordinal()).len() == 1 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "stage '{stage}' has a branch suffix but no alternative at ordinal {:02}",
                            stage.ordinal()
                        ),
                    });
                }
            }
        }

        if self.state.dir.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "state.dir is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new("legacy-app");
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "legacy-app");
        assert_eq!(loaded.pipeline.stages, default_stages());
        assert_eq!(loaded.state.dir, PathBuf::from(".speclift/chains"));
        assert!(loaded.validate().is_empty());
    }

    #[test]
    fn missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(SpecliftError::NotInitialized)
        ));
        let cfg = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.pipeline().unwrap(), Pipeline::default());
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let cfg: Config = serde_yaml::from_str("project:\n  name: x\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.pipeline.stages.len(), DEFAULT_STAGES.len());
    }

    #[test]
    fn state_root_resolution() {
        let root = Path::new("/tmp/proj");
        let mut cfg = Config::new("p");
        assert_eq!(
            cfg.state_root(root),
            PathBuf::from("/tmp/proj/.speclift/chains")
        );
        cfg.state.dir = PathBuf::from("/var/speclift");
        assert_eq!(cfg.state_root(root), PathBuf::from("/var/speclift"));
    }

    #[test]
    fn validate_flags_bad_pipelines() {
        let mut cfg = Config::new("p");
        cfg.pipeline.stages = vec!["01-a".into(), "latest".into(), "01-a".into()];
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("'latest'")));
        assert!(warnings.iter().any(|w| w.message.contains("more than once")));

        cfg.pipeline.stages = vec!["02-b".into(), "01-a".into()];
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);

        cfg.pipeline.stages = Vec::new();
        assert!(!cfg.validate().is_empty());
    }

    #[test]
    fn validate_warns_on_lonely_branch() {
        let mut cfg = Config::new("p");
        cfg.pipeline.stages = vec!["00-a".into(), "01a-b".into(), "02-c".into()];
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }
}
