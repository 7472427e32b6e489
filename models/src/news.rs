use postbox_storage::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::TryFrom;

/// A crawled headline, as written to the `news` collection by the crawler.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub press: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
}

impl NewsItem {
    /// Article id when the crawler found one, otherwise the link.
    pub fn dedupe_key(&self) -> &str {
        match self.aid {
            Some(ref aid) if !aid.is_empty() => aid,
            _ => &self.link,
        }
    }
}

impl TryFrom<Document> for NewsItem {
    type Error = String;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        Ok(NewsItem {
            title: value.extract_string("title")?,
            link: value.extract_string("link")?,
            press: value.extract_optional_string("press")?,
            time: value.extract_optional_string("time")?,
            aid: value.extract_optional_string("aid")?,
        })
    }
}

/// Drops repeated articles, keeping the first occurrence.
pub fn dedupe(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let before = items.len();
    let unique: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| seen.insert(item.dedupe_key().to_owned()))
        .collect();
    if unique.len() < before {
        debug!("Dropped {} duplicate news items", before - unique.len());
    }
    unique
}
