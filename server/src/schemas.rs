use postbox_models::{Mood, NewsItem, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

// ###################
// # Request schemas #
// ###################

/// Where a random message request takes its mood from.
///
/// A non-empty `mood` query parameter wins over the body. The body is only
/// consulted as a JSON object, and only string values count.
#[derive(Debug, Default)]
pub struct MoodRequest {
    pub mood: Option<String>,
}

impl MoodRequest {
    pub fn from_parts(query: &HashMap<String, String>, body: &[u8]) -> MoodRequest {
        if let Some(mood) = query.get("mood").filter(|m| !m.is_empty()) {
            return MoodRequest {
                mood: Some(mood.clone()),
            };
        }
        let mood = json_object(body).and_then(|obj| string_field(&obj, "mood"));
        MoodRequest { mood }
    }

    pub fn parse(&self) -> Option<Mood> {
        self.mood.as_deref().and_then(|m| Mood::from_str(m).ok())
    }
}

#[derive(Debug, Default)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

impl LoginRequest {
    /// `email` is accepted in place of `id`.
    pub fn from_body(body: &[u8]) -> LoginRequest {
        let obj = json_object(body).unwrap_or_default();
        LoginRequest {
            id: account_id(&obj),
            password: string_field(&obj, "password").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SignupRequest {
    pub id: String,
    pub password: String,
    pub nickname: String,
}

impl SignupRequest {
    /// `email` is accepted in place of `id`.
    pub fn from_body(body: &[u8]) -> SignupRequest {
        let obj = json_object(body).unwrap_or_default();
        SignupRequest {
            id: account_id(&obj),
            password: string_field(&obj, "password").unwrap_or_default(),
            nickname: string_field(&obj, "nickname").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub date: Option<String>,
}

/// Debug view of what the server parsed from a request.
#[derive(Debug)]
pub struct EchoRequest {
    pub content_type: String,
    pub merged: serde_json::Map<String, Value>,
}

impl EchoRequest {
    /// Query parameters overlaid with the fields of a JSON-object body.
    pub fn from_parts(
        content_type: Option<String>,
        query: &HashMap<String, String>,
        body: &[u8],
    ) -> EchoRequest {
        let mut merged: serde_json::Map<String, Value> = query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        if let Some(obj) = json_object(body) {
            merged.extend(obj);
        }
        EchoRequest {
            content_type: content_type.unwrap_or_default(),
            merged,
        }
    }
}

fn account_id(obj: &serde_json::Map<String, Value>) -> String {
    string_field(obj, "id")
        .or_else(|| string_field(obj, "email"))
        .unwrap_or_default()
}

fn json_object(body: &[u8]) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

// ####################
// # Response schemas #
// ####################

#[derive(Serialize)]
pub struct MessageResponse {
    pub content: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id: String,
    pub nickname: String,
}

impl From<User> for LoginResponse {
    fn from(user: User) -> Self {
        LoginResponse {
            id: user.id,
            nickname: user.nickname,
        }
    }
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub ok: bool,
    pub user: LoginResponse,
}

#[derive(Serialize)]
pub struct NewsResponse {
    pub count: usize,
    pub items: Vec<NewsItem>,
}

impl From<Vec<NewsItem>> for NewsResponse {
    fn from(items: Vec<NewsItem>) -> Self {
        NewsResponse {
            count: items.len(),
            items,
        }
    }
}

#[derive(Serialize)]
pub struct EchoResponse {
    pub content_type: String,
    pub merged: serde_json::Map<String, Value>,
}

impl From<EchoRequest> for EchoResponse {
    fn from(req: EchoRequest) -> Self {
        EchoResponse {
            content_type: req.content_type,
            merged: req.merged,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> ErrorResponse {
        ErrorResponse {
            ok: None,
            error: error.into(),
            hint: None,
        }
    }

    pub fn not_ok<S: Into<String>>(error: S) -> ErrorResponse {
        ErrorResponse {
            ok: Some(false),
            ..ErrorResponse::new(error)
        }
    }

    pub fn with_hint(mut self, hint: &'static str) -> ErrorResponse {
        self.hint = Some(hint);
        self
    }
}
