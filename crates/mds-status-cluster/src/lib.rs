//! Cluster-state access, counter helpers, and the admin command channel.
//!
//! Provides:
//! - `fetch_map` / `MemoryClusterSource` - Tagged map fetching
//! - `counters` - Latest-value and rate helpers
//! - `format_dimless` - Compact numbers for status tables
//! - `RegistryCommandChannel` - "session ls" / "session evict" commands

pub mod commands;
pub mod counters;
pub mod format;
pub mod source;
pub mod status;

pub use commands::RegistryCommandChannel;
pub use format::format_dimless;
pub use source::{MemoryClusterSource, fetch_map};
