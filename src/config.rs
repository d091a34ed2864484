//! Configuration for spanjudge.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SPANJUDGE_HOME, SPANJUDGE_JUDGE_BACKEND, SPANJUDGE_JUDGE_MODEL)
//! 2. Config file (.spanjudge/config.yaml)
//! 3. Defaults (~/.spanjudge, thresholds of the matching ladder)
//!
//! Config file discovery:
//! - Searches current directory and parents for .spanjudge/config.yaml
//! - `paths.home` is relative to the .spanjudge/ directory, `paths.ledger_dir`
//!   to the project root

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{MatchPolicy, StrictPolicy};
use crate::text::SimilarityKind;

pub const HOME_ENV: &str = "SPANJUDGE_HOME";
pub const JUDGE_BACKEND_ENV: &str = "SPANJUDGE_JUDGE_BACKEND";
pub const JUDGE_MODEL_ENV: &str = "SPANJUDGE_JUDGE_MODEL";

const DEFAULT_MODEL: &str = "openai:gpt-4o-mini";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub matching: Option<MatchingConfig>,
    #[serde(default)]
    pub judge: Option<JudgeConfig>,
    #[serde(default)]
    pub strict: Option<StrictConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .spanjudge/)
    pub home: Option<String>,
    /// Ledger export directory (relative to the project root)
    pub ledger_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub containment_accept: Option<f64>,
    pub escalate_above: Option<f64>,
    pub report_floor: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    pub backend: Option<String>,
    pub model: Option<String>,
    pub threshold: Option<f64>,
    pub timeout_seconds: Option<u64>,
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrictConfig {
    pub similarity: Option<SimilarityKind>,
    pub threshold: Option<f64>,
}

/// Which judge backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeBackendKind {
    /// OpenAI-compatible chat completions endpoint
    OpenAi,
    /// External program reading the task on stdin
    Command,
    /// No judge; strict evaluation only
    None,
}

impl JudgeBackendKind {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "http" => Ok(JudgeBackendKind::OpenAi),
            "command" | "cmd" => Ok(JudgeBackendKind::Command),
            "none" | "off" | "" => Ok(JudgeBackendKind::None),
            other => bail!("Unknown judge backend: {} (expected openai, command or none)", other),
        }
    }
}

/// Resolved judge settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeSettings {
    pub backend: JudgeBackendKind,
    /// `provider:model` spec for the OpenAI-compatible backend
    pub model: String,
    pub timeout_seconds: u64,
    /// Command line for the command backend
    pub command: Option<String>,
}

impl JudgeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            backend: JudgeBackendKind::None,
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            command: None,
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Absolute path to spanjudge home
    pub home: PathBuf,
    /// Where ledgers are exported
    pub ledger_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Thresholds of the judged ladder
    pub matching: MatchPolicy,
    pub judge: JudgeSettings,
    pub strict: StrictPolicy,
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".spanjudge").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Fold a parsed config file and environment lookups into a resolved config
fn resolve<F>(
    config_file: Option<(PathBuf, ConfigFile)>,
    default_home: PathBuf,
    env: F,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut matching = MatchPolicy::default();
    let mut judge = JudgeSettings::default();
    let mut strict = StrictPolicy::default();

    let (home, ledger_dir, config_path) = if let Some((config_path, config)) = config_file {
        // .spanjudge/ and the project root above it
        let dot_dir = config_path.parent().unwrap_or(Path::new("."));
        let base_dir = dot_dir.parent().unwrap_or(Path::new("."));

        let home = if let Some(env_home) = env(HOME_ENV) {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            resolve_path(dot_dir, home_path)
        } else {
            default_home
        };

        let ledger_dir = match config.paths.ledger_dir {
            Some(ref dir) => resolve_path(base_dir, dir),
            None => home.join("ledgers"),
        };

        if let Some(m) = config.matching {
            if let Some(v) = m.containment_accept {
                matching.containment_accept = v;
            }
            if let Some(v) = m.escalate_above {
                matching.escalate_above = v;
            }
            if let Some(v) = m.report_floor {
                matching.report_floor = v;
            }
        }

        if let Some(j) = config.judge {
            if let Some(ref backend) = j.backend {
                judge.backend = JudgeBackendKind::parse(backend)?;
            }
            if let Some(model) = j.model {
                judge.model = model;
            }
            if let Some(threshold) = j.threshold {
                matching.judge_threshold = threshold;
            }
            if let Some(timeout) = j.timeout_seconds {
                judge.timeout_seconds = timeout;
            }
            judge.command = j.command;
        }

        if let Some(s) = config.strict {
            if let Some(similarity) = s.similarity {
                strict.similarity = similarity;
            }
            strict.threshold = s.threshold;
        }

        (home, ledger_dir, Some(config_path))
    } else {
        // No config file - use env vars or defaults
        let home = env(HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or(default_home);
        let ledger_dir = home.join("ledgers");
        (home, ledger_dir, None)
    };

    if let Some(backend) = env(JUDGE_BACKEND_ENV) {
        judge.backend = JudgeBackendKind::parse(&backend)?;
    }
    if let Some(model) = env(JUDGE_MODEL_ENV) {
        judge.model = model;
    }

    matching
        .validate()
        .context("Invalid matching thresholds in configuration")?;
    strict
        .validate()
        .context("Invalid strict settings in configuration")?;

    Ok(ResolvedConfig {
        home,
        ledger_dir,
        config_file: config_path,
        matching,
        judge,
        strict,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".spanjudge");

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config_file = match find_config_file(&cwd) {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Some((path, parsed))
        }
        None => None,
    };

    resolve(config_file, default_home, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the spanjudge home directory
pub fn spanjudge_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the ledger export directory
pub fn ledger_dir() -> Result<PathBuf> {
    Ok(config()?.ledger_dir.clone())
}
