use crate as storage;
use crate::{Connector, Document, DocumentStore, FindOptions, Projection};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{collections::HashMap, convert::TryFrom, path::PathBuf, sync::Arc};
use tokio::fs;

/// In-memory DocumentStore.
///
/// Native sampling can be switched off to behave like a backend that lacks it.
pub struct InMemoryStore {
    collections: DashMap<String, Vec<Document>>,
    sampling: bool,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore {
            collections: DashMap::new(),
            sampling: true,
        }
    }

    pub fn with_sampling(mut self, sampling: bool) -> InMemoryStore {
        self.sampling = sampling;
        self
    }

    /// Builds a store from a JSON object mapping collection names to document arrays.
    pub fn from_corpus_json(json: &str) -> storage::Result<InMemoryStore> {
        let corpus: HashMap<String, Vec<Document>> = serde_json::from_str(json)?;
        let store = InMemoryStore::new();
        for (collection, docs) in corpus.into_iter() {
            store.insert_many(&collection, docs);
        }
        Ok(store)
    }

    pub fn insert(&self, collection: &str, doc: Document) {
        self.collections
            .entry(collection.to_owned())
            .or_insert_with(Vec::new)
            .push(doc);
    }

    pub fn insert_many<I: IntoIterator<Item = Document>>(&self, collection: &str, docs: I) {
        self.collections
            .entry(collection.to_owned())
            .or_insert_with(Vec::new)
            .extend(docs);
    }

    /// Snapshot of a collection's documents in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        match self.collections.get(collection) {
            Some(docs) => docs.clone(),
            None => vec![],
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore::new()
    }
}

fn project_all(docs: Vec<Document>, projection: Option<&Projection>) -> Vec<Document> {
    match projection {
        Some(p) => docs.iter().map(|d| d.project(p)).collect(),
        None => docs,
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ping(&self) -> storage::Result<()> {
        Ok(())
    }

    async fn sample(
        &self,
        collection: &str,
        size: usize,
        projection: Option<&Projection>,
    ) -> storage::Result<Vec<Document>> {
        if !self.sampling {
            return Err(storage::Error::Unsupported(
                "random sampling is disabled for this store".to_owned(),
            ));
        }

        let picked = match self.collections.get(collection) {
            Some(docs) => {
                let amount = size.min(docs.len());
                let mut rng = rand::thread_rng();
                rand::seq::index::sample(&mut rng, docs.len(), amount)
                    .into_iter()
                    .map(|i| docs[i].clone())
                    .collect()
            }
            None => vec![],
        };
        Ok(project_all(picked, projection))
    }

    async fn estimated_count(&self, collection: &str) -> storage::Result<u64> {
        let len = match self.collections.get(collection) {
            Some(docs) => docs.len(),
            None => 0,
        };
        u64::try_from(len).map_err(|e| storage::Error::Other(e.to_string()))
    }

    async fn find(
        &self,
        collection: &str,
        options: &FindOptions,
    ) -> storage::Result<Vec<Document>> {
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = match options.limit {
            Some(limit) => usize::try_from(limit).unwrap_or(usize::MAX),
            None => usize::MAX,
        };

        let found = match self.collections.get(collection) {
            Some(docs) => docs
                .iter()
                .filter(|d| d.matches(&options.filter))
                .skip(skip)
                .take(limit)
                .cloned()
                .collect(),
            None => vec![],
        };
        Ok(project_all(found, options.projection.as_ref()))
    }
}

/// Loads an [`InMemoryStore`] from a corpus file when first connected.
pub struct CorpusConnector {
    corpus_path: Option<PathBuf>,
    sampling: bool,
}

impl CorpusConnector {
    pub fn new(corpus_path: Option<PathBuf>, sampling: bool) -> CorpusConnector {
        CorpusConnector {
            corpus_path,
            sampling,
        }
    }
}

#[async_trait]
impl Connector for CorpusConnector {
    async fn connect(&self) -> storage::Result<Arc<dyn DocumentStore>> {
        let store = match self.corpus_path {
            Some(ref path) => {
                info!("Loading corpus from {}", path.display());
                let contents = fs::read_to_string(path).await?;
                InMemoryStore::from_corpus_json(&contents)?
            }
            None => {
                warn!("No corpus configured, starting with an empty in-memory store");
                InMemoryStore::new()
            }
        };
        Ok(Arc::new(store.with_sampling(self.sampling)))
    }
}
