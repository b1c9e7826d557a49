//! Admin command channel backed by a local session registry.

use std::sync::Arc;

use async_trait::async_trait;
use mds_status_core::{CommandChannel, CommandError};
use mds_status_session::SessionRegistry;
use serde_json::Value;

/// Serves session admin commands against an in-process registry.
///
/// The registry is injected at construction; handlers built on top of this
/// channel never reach for a process-wide instance.
pub struct RegistryCommandChannel {
    registry: Arc<SessionRegistry>,
}

impl RegistryCommandChannel {
    /// Create a channel over `registry`.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CommandChannel for RegistryCommandChannel {
    async fn run(&self, prefix: &str, args: Value) -> Result<Value, CommandError> {
        tracing::debug!(prefix, "admin command");
        match prefix {
            "session ls" => serde_json::to_value(self.registry.list())
                .map_err(|e| CommandError::Failed(e.to_string())),
            "session evict" => {
                let id = args
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CommandError::InvalidArguments("missing id".to_owned()))?;
                let session = self
                    .registry
                    .disconnect(id)
                    .map_err(|e| CommandError::Failed(e.to_string()))?;
                serde_json::to_value(session).map_err(|e| CommandError::Failed(e.to_string()))
            }
            other => Err(CommandError::UnknownCommand(other.to_owned())),
        }
    }
}
