//! Nearest-neighbour storage for memory embeddings

mod in_memory;
mod qdrant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub use in_memory::{InMemoryIndex, cosine_similarity};
pub use qdrant::{DEFAULT_COLLECTION, DEFAULT_QDRANT_URL, QdrantIndex};

/// Arbitrary JSON attributes stored next to a vector.
pub type Payload = Map<String, Value>;

/// A search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// Vector index operations. Search results come back best match first.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self) -> Result<()>;

    async fn upsert(&self, id: &str, vector: Vec<f32>, payload: Payload) -> Result<()>;

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Release the backing client. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;
}
