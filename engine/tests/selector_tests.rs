extern crate env_logger;

use async_trait::async_trait;
use postbox_engine::{
    selector::select_random_message, Api, Collections, ErrorCode, NotFoundReason, Selection,
};
use postbox_models::{Message, Mood};
use postbox_storage::{
    memory::InMemoryStore, Connector, Document, DocumentStore, FindOptions, Projection,
    SharedStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn logging_init() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}

fn message_doc(content: &str) -> Document {
    serde_json::from_value(json!({ "_id": format!("id-{}", content), "content": content }))
        .unwrap()
}

fn corpus(good: &[&str], bad: &[&str], sampling: bool) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new().with_sampling(sampling);
    store.insert_many("emotion_good", good.iter().map(|c| message_doc(c)));
    store.insert_many("emotion_bad", bad.iter().map(|c| message_doc(c)));
    Arc::new(store)
}

fn api_over(store: Arc<InMemoryStore>) -> Api {
    Api::new(SharedStore::from_store(store), Collections::default())
}

fn found(selection: Selection) -> String {
    match selection {
        Selection::Found(Message { content }) => content,
        other => panic!("expected a message, got {:?}", other),
    }
}

#[tokio::test]
async fn good_mood_returns_one_of_the_stored_messages() {
    logging_init();

    for sampling in &[true, false] {
        let api = api_over(corpus(&["A", "B"], &[], *sampling));
        for _ in 0..200 {
            let content = found(api.get_random_message(Mood::Good).await.unwrap());
            assert!(content == "A" || content == "B", "unexpected {}", content);
        }
    }
}

#[tokio::test]
async fn moods_never_cross_collections() {
    logging_init();

    for sampling in &[true, false] {
        let api = api_over(corpus(&["good-1", "good-2"], &["bad-1"], *sampling));
        for _ in 0..100 {
            assert!(found(api.get_random_message(Mood::Good).await.unwrap()).starts_with("good"));
            assert_eq!(
                found(api.get_random_message(Mood::Bad).await.unwrap()),
                "bad-1"
            );
        }
    }
}

#[tokio::test]
async fn empty_collection_is_not_found_on_either_path() {
    logging_init();

    for sampling in &[true, false] {
        let api = api_over(corpus(&["A"], &[], *sampling));
        assert_eq!(
            api.get_random_message(Mood::Bad).await.unwrap(),
            Selection::NotFound(NotFoundReason::CollectionEmpty)
        );
    }
}

#[tokio::test]
async fn fallback_draws_are_roughly_uniform() {
    logging_init();

    let texts = ["A", "B", "C", "D"];
    let api = api_over(corpus(&texts, &[], false));
    let trials = 8_000;
    let mut tally: HashMap<String, usize> = HashMap::new();
    for _ in 0..trials {
        let content = found(api.get_random_message(Mood::Good).await.unwrap());
        *tally.entry(content).or_insert(0) += 1;
    }

    let expected = trials / texts.len();
    for text in texts.iter() {
        let n = tally.get(*text).copied().unwrap_or(0);
        assert!(
            n > expected * 8 / 10 && n < expected * 12 / 10,
            "{} picked {} times, expected about {}",
            text,
            n,
            expected
        );
    }
    assert_eq!(tally.len(), texts.len());
}

#[tokio::test]
async fn repeated_requests_leave_corpus_unchanged() {
    logging_init();

    let store = corpus(&["A", "B", "C"], &["X"], false);
    let before_good = store.documents("emotion_good");
    let before_bad = store.documents("emotion_bad");
    let api = api_over(Arc::clone(&store));

    for _ in 0..50 {
        api.get_random_message(Mood::Good).await.unwrap();
        api.get_random_message(Mood::Bad).await.unwrap();
    }

    assert_eq!(store.documents("emotion_good"), before_good);
    assert_eq!(store.documents("emotion_bad"), before_bad);
    assert_eq!(store.estimated_count("emotion_good").await.unwrap(), 3);
}

// Store whose behaviour per operation is fixed up front, counting calls.
#[derive(Default)]
struct ScriptedStore {
    sample_fails: bool,
    sample_docs: Vec<Document>,
    count: Option<u64>,
    find_docs: Vec<Document>,
    find_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn ping(&self) -> postbox_storage::Result<()> {
        Ok(())
    }

    async fn sample(
        &self,
        _collection: &str,
        _size: usize,
        _projection: Option<&Projection>,
    ) -> postbox_storage::Result<Vec<Document>> {
        if self.sample_fails {
            Err(postbox_storage::Error::Unsupported("$sample".to_owned()))
        } else {
            Ok(self.sample_docs.clone())
        }
    }

    async fn estimated_count(&self, _collection: &str) -> postbox_storage::Result<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.count
            .ok_or_else(|| postbox_storage::Error::Other("count failed".to_owned()))
    }

    async fn find(
        &self,
        _collection: &str,
        options: &FindOptions,
    ) -> postbox_storage::Result<Vec<Document>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(options.limit, Some(1));
        assert!(options.skip < self.count.unwrap_or(0));
        Ok(self.find_docs.clone())
    }
}

#[tokio::test]
async fn empty_sample_is_final_without_fallback() {
    logging_init();

    let store = ScriptedStore {
        count: Some(3),
        find_docs: vec![message_doc("never")],
        ..ScriptedStore::default()
    };
    let selection = select_random_message(&store, "emotion_good").await.unwrap();

    assert_eq!(selection, Selection::NotFound(NotFoundReason::CollectionEmpty));
    assert_eq!(store.count_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.find_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sample_result_wins_when_available() {
    logging_init();

    let store = ScriptedStore {
        sample_docs: vec![message_doc("sampled")],
        ..ScriptedStore::default()
    };
    let selection = select_random_message(&store, "emotion_good").await.unwrap();

    assert_eq!(selection, Selection::Found(Message::new("sampled")));
    assert_eq!(store.count_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_sample_falls_back_to_skip() {
    logging_init();

    let store = ScriptedStore {
        sample_fails: true,
        count: Some(10),
        find_docs: vec![message_doc("skipped-to")],
        ..ScriptedStore::default()
    };
    let selection = select_random_message(&store, "emotion_good").await.unwrap();

    assert_eq!(selection, Selection::Found(Message::new("skipped-to")));
    assert_eq!(store.count_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.find_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_count_is_reported_as_raced() {
    logging_init();

    let store = ScriptedStore {
        sample_fails: true,
        count: Some(5),
        ..ScriptedStore::default()
    };
    let selection = select_random_message(&store, "emotion_good").await.unwrap();

    assert_eq!(selection, Selection::NotFound(NotFoundReason::Raced));
}

#[tokio::test]
async fn zero_count_skips_the_find() {
    logging_init();

    let store = ScriptedStore {
        sample_fails: true,
        count: Some(0),
        ..ScriptedStore::default()
    };
    let selection = select_random_message(&store, "emotion_good").await.unwrap();

    assert_eq!(selection, Selection::NotFound(NotFoundReason::CollectionEmpty));
    assert_eq!(store.find_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fallback_failure_is_terminal() {
    logging_init();

    let store = ScriptedStore {
        sample_fails: true,
        count: None,
        ..ScriptedStore::default()
    };
    let err = select_random_message(&store, "emotion_good")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::StorageGeneric);
    assert_eq!(store.count_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.find_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn document_without_content_is_an_error() {
    logging_init();

    let store = ScriptedStore {
        sample_docs: vec![serde_json::from_value(json!({ "text": "wrong field" })).unwrap()],
        ..ScriptedStore::default()
    };
    let err = select_random_message(&store, "emotion_good")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::MalformedDocument);
}

struct Unreachable;

#[async_trait]
impl Connector for Unreachable {
    async fn connect(&self) -> postbox_storage::Result<Arc<dyn DocumentStore>> {
        Err(postbox_storage::Error::Unavailable(
            "connection refused".to_owned(),
        ))
    }
}

#[tokio::test]
async fn unreachable_store_is_an_error() {
    logging_init();

    let api = Api::new(SharedStore::new(Unreachable), Collections::default());
    let err = api.get_random_message(Mood::Good).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::StorageUnavailable);
    assert!(!api.is_store_connected());
}
