use crate::errors::Result;
use async_trait::async_trait;

/// Base trait for artifact sinks
#[async_trait]
pub trait ArtifactStore {
    /// Human-readable location, used in log lines
    fn describe(&self) -> String;

    /// Whether an artifact with this name is already persisted
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Persist the artifact. On error no readable partial artifact is left behind.
    async fn write(&self, name: &str, content: &[u8]) -> Result<()>;
}
