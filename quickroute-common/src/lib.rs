//! Common utilities shared across QuickRoute crates.
//!
//! Today this is only the [`observability`] module: a single place that knows
//! how to install the global `tracing` subscriber for binaries and tests. The
//! library crates emit events through `tracing` and never install a
//! subscriber on their own.
//!
//! ```no_run
//! use quickroute_common::observability::{init_logging, LogConfig};
//!
//! let path = init_logging(LogConfig::default()).expect("logging");
//! println!("logging to {}", path.display());
//! ```

pub mod observability;
