//! User preferences for the socket inventory.
//!
//! Every field has a default, so a partial file (or none at all) is valid.
//!
//! # Example YAML
//!
//! ```yaml
//! tracked_command: node
//! hide_by_args:
//!   - node /usr/local/lib/node_modules/typescript/lib/tsserver.js
//! label_max_chars: 35
//! title_excluded_ports: ["80", "443"]
//! resolve_cwd: false
//! listing_timeout_ms: 5000
//! cwd_timeout_ms: 1000
//! lsof_path: lsof
//! ps_path: ps
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use portscope_collect::RefreshOptions;
use portscope_collect::source::{DEFAULT_CWD_TIMEOUT_MS, DEFAULT_LISTING_TIMEOUT_MS, SourceConfig};
use portscope_core::ClassifyOptions;
use portscope_core::format::{DEFAULT_LABEL_MAX_CHARS, LabelOptions};
use serde::{Deserialize, Serialize};

use crate::error::{PrefsError, Result};

/// Shortest label budget that still leaves room around the ellipsis.
pub const MIN_LABEL_MAX_CHARS: usize = 8;

/// Persisted user preferences.
///
/// # Examples
///
/// ```
/// use portscope_prefs::Preferences;
///
/// let prefs: Preferences = serde_yaml::from_str("hide_by_args: [\"node lsp.js\"]").unwrap();
/// assert_eq!(prefs.tracked_command, "node");
/// assert_eq!(prefs.classify_options().hide_by_args, vec!["node lsp.js"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Short command name of the runtime whose processes are tracked.
    pub tracked_command: String,
    /// Command lines to hide (compared after trimming).
    pub hide_by_args: Vec<String>,
    /// Character budget for process labels.
    pub label_max_chars: usize,
    /// Listening ports left out of the summary title.
    pub title_excluded_ports: Vec<String>,
    /// Resolve working directories during refresh.
    pub resolve_cwd: bool,
    pub listing_timeout_ms: u64,
    pub cwd_timeout_ms: u64,
    pub lsof_path: PathBuf,
    pub ps_path: PathBuf,
}

impl Default for Preferences {
    fn default() -> Self {
        let classify = ClassifyOptions::default();
        Self {
            tracked_command: classify.tracked_command,
            hide_by_args: classify.hide_by_args,
            label_max_chars: DEFAULT_LABEL_MAX_CHARS,
            title_excluded_ports: classify.title_excluded_ports,
            resolve_cwd: false,
            listing_timeout_ms: DEFAULT_LISTING_TIMEOUT_MS,
            cwd_timeout_ms: DEFAULT_CWD_TIMEOUT_MS,
            lsof_path: PathBuf::from("lsof"),
            ps_path: PathBuf::from("ps"),
        }
    }
}

impl Preferences {
    /// Loads preferences from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](PrefsError::IoError) if the file cannot be read,
    /// [`YamlError`](PrefsError::YamlError) if parsing fails, or
    /// [`Invalid`](PrefsError::Invalid) if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let prefs: Self = serde_yaml::from_reader(reader)?;
        prefs.validate()?;
        Ok(prefs)
    }

    /// Loads preferences, falling back to defaults when the file is missing.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path) {
            Err(PrefsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Saves the preferences as YAML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Default location: `$XDG_CONFIG_HOME/portscope/config.yml`, else
    /// `~/.config/portscope/config.yml`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("portscope").join("config.yml"))
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.tracked_command.trim().is_empty() {
            return Err(PrefsError::Invalid(
                "tracked_command must not be empty".to_string(),
            ));
        }
        if self.label_max_chars < MIN_LABEL_MAX_CHARS {
            return Err(PrefsError::Invalid(format!(
                "label_max_chars must be at least {MIN_LABEL_MAX_CHARS}, got {}",
                self.label_max_chars
            )));
        }
        if self.listing_timeout_ms == 0 || self.cwd_timeout_ms == 0 {
            return Err(PrefsError::Invalid(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            tracked_command: self.tracked_command.clone(),
            hide_by_args: self.hide_by_args.clone(),
            title_excluded_ports: self.title_excluded_ports.clone(),
        }
    }

    /// Label options; `home` is abbreviated as `~` in command lines.
    pub fn label_options(&self, home: Option<String>) -> LabelOptions {
        LabelOptions {
            max_chars: self.label_max_chars,
            home,
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            lsof_path: self.lsof_path.clone(),
            ps_path: self.ps_path.clone(),
            listing_timeout: Duration::from_millis(self.listing_timeout_ms),
            cwd_timeout: Duration::from_millis(self.cwd_timeout_ms),
        }
    }

    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            resolve_cwd: self.resolve_cwd,
            cwd_jobs: None,
        }
    }
}
