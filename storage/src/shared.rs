use crate as storage;
use crate::{Connector, DocumentStore};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Process-lifetime store handle, connected on first use.
///
/// Concurrent first callers wait on the same initialisation and all receive
/// the one connection it produces. A failed connect or ping leaves the handle
/// empty, so the next caller tries again.
pub struct SharedStore {
    connector: Box<dyn Connector>,
    store: OnceCell<Arc<dyn DocumentStore>>,
}

impl SharedStore {
    pub fn new<C: Connector + 'static>(connector: C) -> SharedStore {
        SharedStore {
            connector: Box::new(connector),
            store: OnceCell::new(),
        }
    }

    /// Wraps a store that is already connected.
    pub fn from_store(store: Arc<dyn DocumentStore>) -> SharedStore {
        SharedStore {
            connector: Box::new(Connected(Arc::clone(&store))),
            store: OnceCell::new_with(Some(store)),
        }
    }

    pub async fn get(&self) -> storage::Result<Arc<dyn DocumentStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let store = self.connector.connect().await?;
                store.ping().await?;
                info!("Storage connection established (ping ok)");
                Ok::<_, storage::Error>(store)
            })
            .await?;
        Ok(Arc::clone(store))
    }

    pub fn is_connected(&self) -> bool {
        self.store.initialized()
    }
}

struct Connected(Arc<dyn DocumentStore>);

#[async_trait::async_trait]
impl Connector for Connected {
    async fn connect(&self) -> storage::Result<Arc<dyn DocumentStore>> {
        Ok(Arc::clone(&self.0))
    }
}
