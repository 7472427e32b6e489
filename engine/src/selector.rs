//! Random message selection.
//!
//! The native sample query is tried first. Only when that query *fails* does
//! selection fall back to counting the collection and skipping to a random
//! offset. A sample that succeeds with no documents is final: the collection
//! is treated as empty and no fallback is attempted.

use crate as engine;
use engine::{ErrorCode, ErrorSource};
use postbox_models::Message;
use postbox_storage::{DocumentStore, Filter, FindOptions, Projection};
use rand::Rng;
use std::convert::TryFrom;

#[derive(Debug, PartialEq)]
pub enum Selection {
    Found(Message),
    NotFound(NotFoundReason),
}

#[derive(Debug, PartialEq)]
pub enum NotFoundReason {
    /// The collection had no documents.
    CollectionEmpty,
    /// The count said there were documents but the skip landed past the end.
    Raced,
}

pub async fn select_random_message(
    store: &dyn DocumentStore,
    collection: &str,
) -> engine::Result<Selection> {
    let projection = Projection::fields(&["content"]);

    match store.sample(collection, 1, Some(&projection)).await {
        Ok(docs) => match docs.into_iter().next() {
            Some(doc) => Ok(Selection::Found(to_message(doc)?)),
            None => {
                debug!("Sample of '{}' returned no documents", collection);
                Ok(Selection::NotFound(NotFoundReason::CollectionEmpty))
            }
        },
        Err(e) => {
            info!(
                "Sampling not available for '{}', falling back to skip: {}",
                collection, e
            );
            select_by_skip(store, collection, projection).await
        }
    }
}

async fn select_by_skip(
    store: &dyn DocumentStore,
    collection: &str,
    projection: Projection,
) -> engine::Result<Selection> {
    let count = store.estimated_count(collection).await?;
    if count == 0 {
        return Ok(Selection::NotFound(NotFoundReason::CollectionEmpty));
    }

    let index = random_index(count);
    debug!("Total documents: {}, random index: {}", count, index);

    let options = FindOptions::new(Filter::new())
        .skip(index)
        .limit(1)
        .projection(projection);
    match store.find(collection, &options).await?.into_iter().next() {
        Some(doc) => Ok(Selection::Found(to_message(doc)?)),
        None => {
            info!(
                "Skip to {} of {} in '{}' found nothing",
                index, count, collection
            );
            Ok(Selection::NotFound(NotFoundReason::Raced))
        }
    }
}

/// Uniform over `[0, count)`. `count` must be non-zero.
pub fn random_index(count: u64) -> u64 {
    rand::thread_rng().gen_range(0..count)
}

fn to_message(doc: postbox_storage::Document) -> engine::Result<Message> {
    Message::try_from(doc).map_err(|e| {
        error!("Failed to convert Document to Message: {}", e);
        engine::Error::new(ErrorCode::MalformedDocument, Some(ErrorSource::Conversion(e)))
    })
}
