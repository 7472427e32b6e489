use crate as engine;
use chrono::{Duration, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use engine::{
    selector::{self, Selection},
    ErrorCode, ErrorSource,
};
use postbox_models::{dedupe, Mood, NewsItem, User};
use postbox_storage::{Document, Filter, FindOptions, Projection, SharedStore};
use serde::Deserialize;
use std::convert::TryFrom;

/// Collection names, one per kind of document.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub good: String,
    pub bad: String,
    pub users: String,
    pub news: String,
}

impl Collections {
    pub fn for_mood(&self, mood: Mood) -> &str {
        match mood {
            Mood::Good => &self.good,
            Mood::Bad => &self.bad,
        }
    }
}

impl Default for Collections {
    fn default() -> Self {
        Collections {
            good: "emotion_good".to_owned(),
            bad: "emotion_bad".to_owned(),
            users: "userinfo".to_owned(),
            news: "news".to_owned(),
        }
    }
}

pub struct Api {
    store: SharedStore,
    collections: Collections,
    signups: DashMap<String, User>,
}

impl Api {
    pub fn new(store: SharedStore, collections: Collections) -> Api {
        Api {
            store,
            collections,
            signups: DashMap::new(),
        }
    }

    pub fn is_store_connected(&self) -> bool {
        self.store.is_connected()
    }

    // ############
    // # Messages #
    // ############

    pub async fn get_random_message(&self, mood: Mood) -> engine::Result<Selection> {
        let store = self.store.get().await?;
        let collection = self.collections.for_mood(mood);
        selector::select_random_message(store.as_ref(), collection).await
    }

    // ############
    // # Accounts #
    // ############

    /// Checks credentials against the stored account collection first, then
    /// against accounts created through `signup`.
    pub async fn login(&self, id: &str, password: &str) -> engine::Result<User> {
        if id.is_empty() || password.is_empty() {
            return Err(engine::Error::new(ErrorCode::MissingCredentials, None));
        }

        let user = match self.find_user(id).await? {
            Some(user) => Some(user),
            None => self
                .signups
                .get(&id.to_lowercase())
                .map(|u| u.value().clone()),
        };

        match user {
            Some(user) if user.password_matches(password) => Ok(user),
            _ => Err(engine::Error::new(ErrorCode::InvalidCredentials, None)),
        }
    }

    /// Registers a process-local account. Ids are case-insensitive.
    pub async fn signup(&self, id: &str, password: &str, nickname: &str) -> engine::Result<User> {
        let (id, password, nickname) = (id.trim(), password.trim(), nickname.trim());
        if id.is_empty() || password.is_empty() || nickname.is_empty() {
            return Err(engine::Error::new(ErrorCode::MissingFields, None));
        }

        let key = id.to_lowercase();
        if self.stored_id_exists(&key).await? {
            return Err(engine::Error::new(ErrorCode::UserAlreadyExists, None));
        }

        match self.signups.entry(key.clone()) {
            Entry::Occupied(_) => Err(engine::Error::new(ErrorCode::UserAlreadyExists, None)),
            Entry::Vacant(v) => {
                let user = User::new(key, nickname.to_owned(), password.to_owned());
                v.insert(user.clone());
                info!("Registered user {}", user.id);
                Ok(user)
            }
        }
    }

    async fn find_user(&self, id: &str) -> engine::Result<Option<User>> {
        let store = self.store.get().await?;
        let options = FindOptions::new(Filter::new().eq("id", id)).limit(1);
        match store
            .find(&self.collections.users, &options)
            .await?
            .into_iter()
            .next()
        {
            Some(doc) => Ok(Some(convert::<User>(doc)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive match of `key` (already lowercased) against stored ids.
    async fn stored_id_exists(&self, key: &str) -> engine::Result<bool> {
        let store = self.store.get().await?;
        let options = FindOptions::new(Filter::new()).projection(Projection::fields(&["id"]));
        let docs = store.find(&self.collections.users, &options).await?;
        Ok(docs.iter().any(|doc| match doc.extract_string("id") {
            Ok(id) => id.to_lowercase() == key,
            Err(_) => false,
        }))
    }

    // ########
    // # News #
    // ########

    /// Headlines stored for `date` (`YYYYMMDD`, default today in KST), without duplicates.
    pub async fn list_news(&self, date: Option<&str>) -> engine::Result<Vec<NewsItem>> {
        let date = match date {
            Some(d) if !d.is_empty() => {
                if !is_valid_date(d) {
                    return Err(engine::Error::new(ErrorCode::InvalidDateFormat, None));
                }
                d.to_owned()
            }
            _ => today_kst(),
        };

        let store = self.store.get().await?;
        let options = FindOptions::new(Filter::new().eq("date", date.as_str()));
        let docs = store.find(&self.collections.news, &options).await?;

        let mut items = Vec::with_capacity(docs.len());
        for doc in docs.into_iter() {
            match NewsItem::try_from(doc) {
                Ok(item) => items.push(item),
                // For now treat conversion error as missing doc
                Err(e) => error!("Skipping malformed news document for {}: {}", date, e),
            }
        }
        Ok(dedupe(items))
    }
}

fn convert<T: TryFrom<Document, Error = String>>(doc: Document) -> engine::Result<T> {
    T::try_from(doc).map_err(|e| {
        error!("Failed to convert Document to requested type: {}", e);
        engine::Error::new(ErrorCode::MalformedDocument, Some(ErrorSource::Conversion(e)))
    })
}

fn is_valid_date(date: &str) -> bool {
    date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit())
}

fn today_kst() -> String {
    (Utc::now() + Duration::hours(9))
        .format("%Y%m%d")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_date_format() {
        assert!(is_valid_date("20240131"));
        assert!(!is_valid_date("2024-01-31"));
        assert!(!is_valid_date("2024013"));
        assert!(!is_valid_date("202401311"));
        assert!(!is_valid_date("２０２４０１３１"));
    }

    #[test]
    fn today_is_eight_digits() {
        assert!(is_valid_date(&today_kst()));
    }

    #[test]
    fn maps_mood_to_collection() {
        let collections = Collections::default();
        assert_eq!(collections.for_mood(Mood::Good), "emotion_good");
        assert_eq!(collections.for_mood(Mood::Bad), "emotion_bad");
    }
}
