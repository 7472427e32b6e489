use postbox_storage::Document;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Account record from the `userinfo` collection.
///
/// Passwords are compared as stored; there is no hashing.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl User {
    pub fn new(id: String, nickname: String, password: String) -> User {
        User {
            id,
            nickname,
            password,
        }
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }
}

impl TryFrom<Document> for User {
    type Error = String;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let id = value.extract_string("id")?;
        let password = value.extract_string("password")?;
        // Older accounts were created without a nickname
        let nickname = value
            .extract_optional_string("nickname")?
            .unwrap_or_else(|| id.clone());
        Ok(User {
            id,
            nickname,
            password,
        })
    }
}
