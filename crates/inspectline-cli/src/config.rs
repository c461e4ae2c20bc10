//! Run configuration – reads/writes `~/.inspectline/config.toml`.

use inspectline_types::{Decision, LineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where inspection verdicts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    /// An operator types verdicts at the prompt.
    #[default]
    Keyboard,
    /// Verdicts are taken from `scripted_verdicts` in order.
    Scripted,
}

impl DecisionMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyboard" => Some(DecisionMode::Keyboard),
            "scripted" => Some(DecisionMode::Scripted),
            _ => None,
        }
    }
}

impl std::fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionMode::Keyboard => write!(f, "keyboard"),
            DecisionMode::Scripted => write!(f, "scripted"),
        }
    }
}

/// Persisted run configuration stored in `~/.inspectline/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decision_mode: DecisionMode,

    /// Verdicts handed out one per arrival in scripted mode.
    pub scripted_verdicts: Vec<Decision>,

    /// Verdict used once `scripted_verdicts` runs out.
    pub scripted_fallback: Decision,

    /// Hard stop for the run, in ticks.
    pub max_ticks: u64,

    /// Sleep between ticks so the line runs at wall-clock speed.
    pub realtime: bool,

    /// JSON-lines traceability log.  No file is written when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_log_path: Option<PathBuf>,

    /// Line geometry and timing.
    pub line: LineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decision_mode: DecisionMode::default(),
            scripted_verdicts: Vec::new(),
            scripted_fallback: Decision::Accept,
            max_ticks: 300_000,
            realtime: true,
            trace_log_path: None,
            line: LineConfig::default(),
        }
    }
}

/// Return the path to `~/.inspectline/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".inspectline").join("config.toml")
}

/// Load the config from disk with environment overrides applied.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `INSPECTLINE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `INSPECTLINE_DECISION_MODE` | `decision_mode` (`keyboard` / `scripted`) |
/// | `INSPECTLINE_MAX_TICKS` | `max_ticks` |
/// | `INSPECTLINE_REALTIME` | `realtime` (`true`/`false`/`1`/`0`) |
/// | `INSPECTLINE_TRACE_LOG` | `trace_log_path` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("INSPECTLINE_DECISION_MODE")
        && let Some(mode) = DecisionMode::parse(&v)
    {
        cfg.decision_mode = mode;
    }
    if let Ok(v) = std::env::var("INSPECTLINE_MAX_TICKS")
        && let Ok(n) = v.trim().parse::<u64>()
    {
        cfg.max_ticks = n;
    }
    if let Ok(v) = std::env::var("INSPECTLINE_REALTIME") {
        match v.trim() {
            "1" | "true" => cfg.realtime = true,
            "0" | "false" => cfg.realtime = false,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("INSPECTLINE_TRACE_LOG")
        && !v.trim().is_empty()
    {
        cfg.trace_log_path = Some(PathBuf::from(v));
    }
}

/// Save the config to disk, creating `~/.inspectline/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.line, LineConfig::default());
        assert_eq!(loaded.max_ticks, 300_000);
        assert_eq!(loaded.decision_mode, DecisionMode::Keyboard);
        assert_eq!(loaded.scripted_fallback, Decision::Accept);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "decision_mode = \"scripted\"\nscripted_verdicts = [\"reject\", \"accept\"]\n\n[line]\nspeed = 0.4\n",
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.decision_mode, DecisionMode::Scripted);
        assert_eq!(cfg.scripted_verdicts, [Decision::Reject, Decision::Accept]);
        assert!((cfg.line.speed - 0.4).abs() < f64::EPSILON);
        assert_eq!(cfg.line.item_count(), 6);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_ticks = \"lots\"").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_inspectline_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".inspectline"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn apply_env_overrides_changes_decision_mode() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("INSPECTLINE_DECISION_MODE", "Scripted") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.decision_mode, DecisionMode::Scripted);
        unsafe { std::env::remove_var("INSPECTLINE_DECISION_MODE") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_max_ticks() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("INSPECTLINE_MAX_TICKS", "forever") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.max_ticks, 300_000);

        unsafe { std::env::set_var("INSPECTLINE_MAX_TICKS", "5000") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.max_ticks, 5000);
        unsafe { std::env::remove_var("INSPECTLINE_MAX_TICKS") };
    }

    #[test]
    fn apply_env_overrides_changes_realtime() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("INSPECTLINE_REALTIME", "0") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!(!cfg.realtime);
        unsafe { std::env::remove_var("INSPECTLINE_REALTIME") };
    }

    #[test]
    fn apply_env_overrides_sets_trace_log() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("INSPECTLINE_TRACE_LOG", "/tmp/trace.jsonl") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.trace_log_path, Some(PathBuf::from("/tmp/trace.jsonl")));
        unsafe { std::env::remove_var("INSPECTLINE_TRACE_LOG") };
    }
}
