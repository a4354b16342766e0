//! Console configuration.
//!
//! Sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. A TOML config file (`--config`, `REN_CONFIG`, `.ren.toml` or `ren.toml`)
//! 4. Built-in defaults

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use ren_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Text shown before each input line
    pub prompt: String,
    pub log_level: LogLevel,
    /// Print the startup banner
    pub banner: bool,
    pub engine: EngineConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: ">> ".to_string(),
            log_level: LogLevel::Warn,
            banner: true,
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub prompt: Option<String>,
    pub log_level: Option<LogLevel>,
    pub no_banner: bool,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the process environment and working directory, then apply `cli`.
    pub fn load(cli: &CliOverrides) -> Result<ConsoleConfig> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        Self::load_with(cli, &cwd, &|key| std::env::var(key).ok())
    }

    /// Load with an explicit working directory and environment lookup.
    pub fn load_with(
        cli: &CliOverrides,
        dir: &Path,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ConsoleConfig> {
        let mut config = Self::load_from_files(cli.config.as_deref(), dir, env)?;
        Self::apply_environment_variables(&mut config, env);
        Self::apply_cli(&mut config, cli);
        config
            .engine
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid engine configuration: {e}"))?;
        Ok(config)
    }

    fn load_from_files(
        explicit: Option<&Path>,
        dir: &Path,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ConsoleConfig> {
        // A named file must exist; discovered ones are optional
        if let Some(path) = explicit
            .map(Path::to_path_buf)
            .or_else(|| env("REN_CONFIG").map(PathBuf::from))
        {
            info!("Loading configuration from: {}", path.display());
            return Self::load_from_file(&path);
        }

        for name in [".ren.toml", "ren.toml"] {
            let path = dir.join(name);
            if path.is_file() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(ConsoleConfig::default())
    }

    pub fn load_from_file(path: &Path) -> Result<ConsoleConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    fn apply_environment_variables(config: &mut ConsoleConfig, env: &dyn Fn(&str) -> Option<String>) {
        if let Some(prompt) = env("REN_PROMPT") {
            config.prompt = prompt;
        }
        if let Some(level) = env("REN_LOG_LEVEL").as_deref().and_then(LogLevel::parse) {
            config.log_level = level;
        }
        if let Some(depth) = env("REN_MAX_EVAL_DEPTH").and_then(|v| v.trim().parse().ok()) {
            config.engine.max_eval_depth = depth;
        }
        if let Some(flag) = env("REN_NO_BANNER").as_deref().and_then(parse_bool) {
            config.banner = !flag;
        }
    }

    fn apply_cli(config: &mut ConsoleConfig, cli: &CliOverrides) {
        if let Some(prompt) = &cli.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(level) = cli.log_level {
            config.log_level = level;
        }
        if cli.no_banner {
            config.banner = false;
        }
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_with(&CliOverrides::default(), dir.path(), &env_of(&[])).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.prompt, ">> ");
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_file_loading() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".ren.toml"),
            r#"
prompt = "ren> "
log_level = "debug"

[engine]
name = "garden"
max_eval_depth = 64
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_with(&CliOverrides::default(), dir.path(), &env_of(&[])).unwrap();
        assert_eq!(config.prompt, "ren> ");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.engine.name, "garden");
        assert_eq!(config.engine.max_eval_depth, 64);
        assert!(config.banner);
    }

    #[test]
    fn test_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        let mut saved = ConsoleConfig::default();
        saved.prompt = "file> ".into();
        saved.engine.max_eval_depth = 10;
        fs::write(&path, toml::to_string_pretty(&saved).unwrap()).unwrap();

        let env = env_of(&[
            ("REN_CONFIG", path.to_str().unwrap()),
            ("REN_PROMPT", "env> "),
            ("REN_MAX_EVAL_DEPTH", "20"),
            ("REN_NO_BANNER", "yes"),
        ]);

        let config = ConfigLoader::load_with(&CliOverrides::default(), dir.path(), &env).unwrap();
        assert_eq!(config.prompt, "env> ");
        assert_eq!(config.engine.max_eval_depth, 20);
        assert!(!config.banner);

        let cli = CliOverrides {
            prompt: Some("cli> ".into()),
            log_level: Some(LogLevel::Trace),
            ..Default::default()
        };
        let config = ConfigLoader::load_with(&cli, dir.path(), &env).unwrap();
        assert_eq!(config.prompt, "cli> ");
        assert_eq!(config.log_level, LogLevel::Trace);
    }

    #[test]
    fn test_bad_files_and_values() {
        let dir = TempDir::new().unwrap();
        let missing = CliOverrides {
            config: Some(dir.path().join("nope.toml")),
            ..Default::default()
        };
        assert!(ConfigLoader::load_with(&missing, dir.path(), &env_of(&[])).is_err());

        fs::write(dir.path().join("ren.toml"), "prompt = [").unwrap();
        assert!(ConfigLoader::load_with(&CliOverrides::default(), dir.path(), &env_of(&[])).is_err());

        let zero = env_of(&[("REN_MAX_EVAL_DEPTH", "0")]);
        let empty = TempDir::new().unwrap();
        assert!(ConfigLoader::load_with(&CliOverrides::default(), empty.path(), &zero).is_err());
    }

    #[test]
    fn test_bool_and_level_parsing() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("invalid"), None);
        assert_eq!(LogLevel::parse("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
    }
}
