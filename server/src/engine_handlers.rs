use crate::schemas::{self, ErrorResponse};
use postbox_engine as engine;

use engine::{ErrorCategory, NotFoundReason, Selection};
use std::collections::HashMap;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{reject, reply, Rejection, Reply};

pub const INVALID_MOOD: &str = "A valid mood (good or bad) is required.";
pub const NO_MESSAGES: &str = "이런, 지금은 드릴 메시지가 없네요.";
pub const RACED_TO_EMPTY: &str = "메시지를 찾는 데 실패했어요. 다시 시도해주세요.";
pub const MESSAGE_SERVER_ERROR: &str = "Server error while fetching message.";

pub const MISSING_CREDENTIALS: &str = "ID and password are required.";
pub const INVALID_CREDENTIALS: &str = "아이디 또는 비밀번호가 올바르지 않습니다.";
pub const LOGIN_SERVER_ERROR: &str = "Server error during login.";

pub async fn get_random_message(
    query: HashMap<String, String>,
    body: Bytes,
    api: Arc<engine::Api>,
) -> Result<impl Reply, Rejection> {
    info!("Handling: get_random_message");

    let mood = match schemas::MoodRequest::from_parts(&query, &body).parse() {
        Some(mood) => mood,
        None => {
            return Err(reject::custom(MessageError::new(
                ErrorResponse::new(INVALID_MOOD),
                StatusCode::BAD_REQUEST,
            )))
        }
    };

    match api.get_random_message(mood).await {
        Ok(Selection::Found(message)) => Ok(reply::with_status(
            reply::json(&schemas::MessageResponse {
                content: message.content,
            }),
            StatusCode::OK,
        )),
        Ok(Selection::NotFound(reason)) => {
            let placeholder = match reason {
                NotFoundReason::CollectionEmpty => NO_MESSAGES,
                NotFoundReason::Raced => RACED_TO_EMPTY,
            };
            Ok(reply::with_status(
                reply::json(&schemas::MessageResponse {
                    content: placeholder.to_owned(),
                }),
                StatusCode::NOT_FOUND,
            ))
        }
        Err(e) => {
            error!("Failed to fetch a {} message: {}", mood, e);
            Err(reject::custom(MessageError::new(
                ErrorResponse::new(MESSAGE_SERVER_ERROR),
                StatusCode::INTERNAL_SERVER_ERROR,
            )))
        }
    }
}

pub async fn login(body: Bytes, api: Arc<engine::Api>) -> Result<impl Reply, Rejection> {
    info!("Handling: login");

    let body = schemas::LoginRequest::from_body(&body);
    match api.login(&body.id, &body.password).await {
        Ok(user) => Ok(reply::with_status(
            reply::json(&schemas::LoginResponse::from(user)),
            StatusCode::OK,
        )),
        Err(e) => {
            let (message, status_code) = match e.classify() {
                ErrorCategory::BadRequest => (MISSING_CREDENTIALS, StatusCode::BAD_REQUEST),
                ErrorCategory::Unauthorized => (INVALID_CREDENTIALS, StatusCode::UNAUTHORIZED),
                _ => {
                    error!("Login failed for {}: {}", body.id, e);
                    (LOGIN_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR)
                }
            };
            Err(reject::custom(MessageError::new(
                ErrorResponse::new(message),
                status_code,
            )))
        }
    }
}

pub async fn signup(body: Bytes, api: Arc<engine::Api>) -> Result<impl Reply, Rejection> {
    info!("Handling: signup");

    let body = schemas::SignupRequest::from_body(&body);
    match api.signup(&body.id, &body.password, &body.nickname).await {
        Ok(user) => Ok(reply::with_status(
            reply::json(&schemas::SignupResponse {
                ok: true,
                user: user.into(),
            }),
            StatusCode::CREATED,
        )),
        Err(e) => {
            let (code, status_code) = match e.classify() {
                ErrorCategory::BadRequest => ("MISSING_FIELDS", StatusCode::BAD_REQUEST),
                ErrorCategory::Conflict => ("ALREADY_EXISTS", StatusCode::CONFLICT),
                _ => {
                    error!("Signup failed for {}: {}", body.id, e);
                    ("SERVER_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
                }
            };
            Err(reject::custom(MessageError::new(
                ErrorResponse::not_ok(code),
                status_code,
            )))
        }
    }
}

pub async fn list_news(
    query: schemas::NewsQuery,
    api: Arc<engine::Api>,
) -> Result<impl Reply, Rejection> {
    info!("Handling: list_news");

    match api.list_news(query.date.as_deref()).await {
        Ok(items) => Ok(reply::with_status(
            reply::json(&schemas::NewsResponse::from(items)),
            StatusCode::OK,
        )),
        Err(e) => {
            let error = match e.classify() {
                ErrorCategory::BadRequest => MessageError::new(
                    ErrorResponse::new("INVALID_DATE_FORMAT").with_hint("YYYYMMDD"),
                    StatusCode::BAD_REQUEST,
                ),
                _ => {
                    error!("Failed to list news: {}", e);
                    MessageError::new(
                        ErrorResponse::new("SERVER_ERROR"),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                }
            };
            Err(reject::custom(error))
        }
    }
}

pub async fn handle_message_error(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(e) = err.find::<MessageError>() {
        let json = warp::reply::json(&e.body);
        Ok(warp::reply::with_status(json, e.status_code))
    } else {
        Err(err)
    }
}

#[derive(Debug)]
struct MessageError {
    pub body: ErrorResponse,
    pub status_code: StatusCode,
}

impl MessageError {
    fn new(body: ErrorResponse, status_code: StatusCode) -> MessageError {
        MessageError { body, status_code }
    }
}

impl reject::Reject for MessageError {}
