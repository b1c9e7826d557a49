//! Session liveness tracking with autoclose eviction.
//!
//! Provides:
//! - `SessionRegistry` - Track sessions, evict the idle ones
//! - `spawn_autoclose` - Periodic sweeper task
//! - `EventBus` - Lifecycle event broadcast with history

pub mod autoclose;
pub mod events;
pub mod registry;

pub use autoclose::{AutocloseHandle, spawn_autoclose};
pub use events::{EventBus, RegistryEvent};
pub use registry::{RegistryConfig, SessionRegistry};
