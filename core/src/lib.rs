//! Socket inventory model, listing parser and process classifier.
//!
//! This crate turns the field-tagged output of `lsof -F cPnpLT` into typed
//! records and derives the views a presentation layer needs:
//!
//! - [`Process`] / [`Connection`] / [`Endpoint`]: the inventory model,
//!   grouped into a [`Snapshot`] per refresh.
//! - [`parse_listing`]: tolerant parser; malformed records are skipped and
//!   reported as [`MalformedRecord`]s.
//! - [`enrich`]: parsing and merging of the batched `ps` command-line
//!   lookup and the per-pid working-directory lookup.
//! - [`classify`] / [`format_title`]: tracked/hidden/local/external buckets
//!   and the compact port title.
//! - [`format`]: connection arrows, middle-ellipsis truncation and process
//!   labels.
//!
//! Nothing here runs a command; `portscope-collect` does that.
//!
//! # Example
//!
//! ```
//! use portscope_core::*;
//!
//! let listing = parse_listing("p88\ncnode\nLdev\nf22\nPTCP\nn127.0.0.1:3000\nTST=LISTEN\n");
//! let mut processes = listing.processes;
//!
//! let args: enrich::ArgsMap = [(88, "node server.js".to_string())].into_iter().collect();
//! enrich::merge_args(&mut processes, &args);
//!
//! let options = ClassifyOptions::default();
//! let sections = classify(&processes, &options);
//! assert_eq!(sections.shown_tracked.len(), 1);
//! assert_eq!(format_title(&processes, &options), "3000");
//! ```

mod classify;
pub mod enrich;
pub mod format;
pub mod lexer;
pub mod parser;
mod types;

pub use classify::{
    ClassifyOptions, DEFAULT_TITLE_EXCLUDED_PORTS, DEFAULT_TRACKED_COMMAND, Locality,
    ProcSections, classify, format_title, locality,
};
pub use parser::{MalformedRecord, ParsedListing, parse_listing};
pub use types::*;
