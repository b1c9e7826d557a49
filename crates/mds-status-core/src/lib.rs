//! Core abstractions for MDS cluster status and session liveness.
//!
//! This crate provides the fundamental building blocks:
//! - `Clock` - Injectable time source (system and manual implementations)
//! - `Session` / `SessionState` - Tracked client session model
//! - `ClusterStateSource` / `CommandChannel` - Narrow manager interfaces
//! - `MapKind` / `MapSnapshot` - Tagged cluster map access

pub mod clock;
pub mod cluster;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cluster::{
    ClusterError, ClusterStateSource, CommandChannel, CommandError, CounterSample, MapKind,
    MapSnapshot,
};
pub use session::{ClientId, RegistryError, Session, SessionHandle, SessionState};
