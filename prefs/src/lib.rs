//! Preferences for the portscope socket inventory.
//!
//! [`Preferences`] is a YAML-serializable set of user settings: the tracked
//! runtime, the hide-list, label and title options, and the tool paths and
//! timeouts used for collection. It converts into the option structs the
//! `portscope-core` and `portscope-collect` crates take.

pub mod error;
pub mod preferences;

pub use error::{PrefsError, Result};
pub use preferences::{MIN_LABEL_MAX_CHARS, Preferences};
