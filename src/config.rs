//! Weave configuration (`weave.toml`).
//!
//! Declares which repository locations mirror each other, so the zipper can
//! collapse the commits they share.
//!
//! ```toml
//! [[zip.groups]]
//! name = "upstream"
//! locations = ["https://git.example.com/repo.git", "https://mirror.example.org/repo.git"]
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "weave.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level weave configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeaveConfig {
    /// Sequence zipper settings.
    #[serde(default)]
    pub zip: ZipConfig,
}

// ---------------------------------------------------------------------------
// ZipConfig
// ---------------------------------------------------------------------------

/// Location grouping for the sequence zipper.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZipConfig {
    /// Mirror groups, in output order.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

/// One `[[zip.groups]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// Display name of the group.
    pub name: String,
    /// Presentable keys (URLs or paths) of the member locations, in merge
    /// order.
    pub locations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a weave configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl WeaveConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but is invalid, returns a [`ConfigError`] with
    ///   line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found), parse
    /// errors, or an invalid group layout.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields, or an invalid
    /// group layout.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })?;
        config.zip.validate()?;
        Ok(config)
    }
}

impl ZipConfig {
    /// Reject layouts the grouping policy could not honor: unnamed or empty
    /// groups, and a location listed more than once.
    ///
    /// # Errors
    /// Returns `ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(invalid("zip group with an empty name".to_owned()));
            }
            if group.locations.is_empty() {
                return Err(invalid(format!("zip group '{}' has no locations", group.name)));
            }
            for location in &group.locations {
                if !seen.insert(location.as_str()) {
                    return Err(invalid(format!(
                        "location '{location}' is listed more than once (in group '{}')",
                        group.name
                    )));
                }
            }
        }
        Ok(())
    }
}

const fn invalid(message: String) -> ConfigError {
    ConfigError {
        path: None,
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
