// File: src/config.rs
//
// Configuration handling for the toy binary: loading `toy.toml` and defaults.
// Every field is optional in the file; anything omitted keeps its default.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::interpreter::{DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH_LIMIT};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "toy.toml";

/// Configuration model loaded from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToyConfig {
    /// Use ANSI colors in error reports, token listings and the REPL.
    pub color: bool,
    pub repl: ReplConfig,
    pub interpreter: InterpreterConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    pub prompt: String,
    /// Shown while a `{ ... }` block is still open.
    pub continuation: String,
    /// History persistence is disabled when unset.
    pub history_file: Option<PathBuf>,
    pub show_tokens: bool,
    pub show_ast: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub max_call_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"toy=debug"`.
    pub filter: String,
}

impl Default for ToyConfig {
    fn default() -> Self {
        Self {
            color: true,
            repl: ReplConfig::default(),
            interpreter: InterpreterConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "toy> ".to_string(),
            continuation: "...> ".to_string(),
            history_file: None,
            show_tokens: false,
            show_ast: false,
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "warn".to_string() }
    }
}

impl ToyConfig {
    /// Load configuration from an explicit path, or from `toy.toml` in the
    /// working directory, falling back to defaults when that file is absent.
    ///
    /// An explicit path that cannot be read is an error.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let data = fs::read_to_string(&path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        let cfg = Self::from_toml(&data)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(cfg)
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let depth = self.interpreter.max_call_depth;
        if depth == 0 || depth > MAX_CALL_DEPTH_LIMIT {
            anyhow::bail!(
                "interpreter.max_call_depth must be between 1 and {}, got {}",
                MAX_CALL_DEPTH_LIMIT,
                depth
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_file_yields_defaults() {
        assert_eq!(ToyConfig::from_toml("").unwrap(), ToyConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let cfg = ToyConfig::from_toml(
            r#"
color = false

[repl]
prompt = ">> "
show_ast = true

[interpreter]
max_call_depth = 32
"#,
        )
        .unwrap();

        assert!(!cfg.color);
        assert_eq!(cfg.repl.prompt, ">> ");
        assert_eq!(cfg.repl.continuation, "...> ");
        assert!(cfg.repl.show_ast);
        assert!(!cfg.repl.show_tokens);
        assert_eq!(cfg.interpreter.max_call_depth, 32);
        assert_eq!(cfg.log.filter, "warn");
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(ToyConfig::from_toml("color = ").is_err());
        assert!(ToyConfig::from_toml("[interpreter]\nmax_call_depth = \"deep\"").is_err());
    }

    #[test]
    fn test_call_depth_out_of_range_is_rejected() {
        let err = ToyConfig::from_toml("[interpreter]\nmax_call_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_call_depth"));
        assert!(ToyConfig::from_toml("[interpreter]\nmax_call_depth = 1000000").is_err());
        assert!(ToyConfig::from_toml("[interpreter]\nmax_call_depth = 10000").is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[repl]\nhistory_file = \"hist.txt\"\n[log]\nfilter = \"toy=debug\"").unwrap();

        let cfg = ToyConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.repl.history_file, Some(PathBuf::from("hist.txt")));
        assert_eq!(cfg.log.filter, "toy=debug");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ToyConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("reading configuration"));
    }
}
