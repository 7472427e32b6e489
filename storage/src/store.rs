use crate as storage;
use crate::{Document, FindOptions, Projection};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection-scoped read operations every backing store provides.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Round-trip to the store to prove the connection is usable.
    async fn ping(&self) -> storage::Result<()>;

    /// Native random sample of up to `size` documents.
    ///
    /// Stores without a sampling primitive return [`storage::Error::Unsupported`].
    async fn sample(
        &self,
        collection: &str,
        size: usize,
        projection: Option<&Projection>,
    ) -> storage::Result<Vec<Document>>;

    /// Cheap document count. May lag behind concurrent writes.
    async fn estimated_count(&self, collection: &str) -> storage::Result<u64>;

    async fn find(&self, collection: &str, options: &FindOptions)
        -> storage::Result<Vec<Document>>;
}

/// Opens a connection to a [`DocumentStore`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> storage::Result<Arc<dyn DocumentStore>>;
}
