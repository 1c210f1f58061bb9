//! Socket inventory collection.
//!
//! This crate runs the system tools that describe open Internet sockets,
//! feeds their output through [`portscope_core`] and publishes the resulting
//! [`Snapshot`](portscope_core::Snapshot)s.
//!
//! # Main entry points
//!
//! - [`Refresher`] runs one list → parse → enrich cycle against an
//!   [`InventorySource`].
//! - [`SystemSource`] is the source backed by `lsof` and `ps`.
//! - [`SnapshotStore`] holds the latest snapshot for a consumer.
//! - [`output`] renders snapshots and sections as JSON, YAML, Markdown or a
//!   plain table.
//!
//! # Example
//!
//! ```
//! use portscope_collect::{
//!     InventorySource, MemorySnapshotStore, RefreshOptions, Refresher, Result, SnapshotStore,
//! };
//!
//! struct Canned;
//!
//! impl InventorySource for Canned {
//!     fn list_sockets(&self) -> Result<String> {
//!         Ok("p42\ncnode\nLdev\nf20\nPTCP\nn127.0.0.1:3000\nTST=LISTEN\n".to_string())
//!     }
//!     fn lookup_args(&self, _pids: &[u32]) -> Result<String> {
//!         Ok("42 node server.js\n".to_string())
//!     }
//!     fn lookup_cwd(&self, _pid: u32) -> Result<String> {
//!         Ok(String::new())
//!     }
//! }
//!
//! let store = MemorySnapshotStore::new();
//! let refresher = Refresher::new(Canned, RefreshOptions::default());
//! refresher.refresh_into(&store).unwrap();
//!
//! let snapshot = store.get().unwrap();
//! assert_eq!(snapshot.processes[0].args.as_deref(), Some("node server.js"));
//! ```

pub mod error;
pub mod output;
pub mod refresh;
pub mod runner;
pub mod signal;
pub mod source;
pub mod store;

pub use error::{CollectError, Result, RunError};
pub use output::OutputFormat;
pub use refresh::{RefreshOptions, Refresher};
pub use signal::{ProcessSignaller, Signal, SystemSignaller};
pub use source::{InventorySource, SourceConfig, SystemSource};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
