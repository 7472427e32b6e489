extern crate env_logger;

use postbox_engine::{Api, Collections, ErrorCategory, ErrorCode};
use postbox_storage::{memory::InMemoryStore, Document, SharedStore};
use serde_json::{json, Value};
use std::sync::Arc;

fn logging_init() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}

fn doc(value: Value) -> Document {
    serde_json::from_value(value).unwrap()
}

fn api() -> Api {
    let store = InMemoryStore::new();
    store.insert(
        "userinfo",
        doc(json!({ "id": "kim", "password": "secret", "nickname": "김" })),
    );
    store.insert("userinfo", doc(json!({ "id": "lee", "password": "pw" })));
    store.insert(
        "userinfo",
        doc(json!({ "id": "Park", "password": "owner-pw", "nickname": "박" })),
    );
    store.insert_many(
        "news",
        vec![
            doc(json!({ "date": "20240131", "title": "First", "link": "https://n/1", "aid": "001" })),
            doc(json!({ "date": "20240131", "title": "First again", "link": "https://n/1b", "aid": "001" })),
            doc(json!({ "date": "20240131", "title": "No aid", "link": "https://n/2" })),
            doc(json!({ "date": "20240131", "title": "No aid dup", "link": "https://n/2" })),
            doc(json!({ "date": "20240131", "link": "https://n/broken" })),
            doc(json!({ "date": "20240201", "title": "Next day", "link": "https://n/3" })),
        ],
    );
    Api::new(
        SharedStore::from_store(Arc::new(store)),
        Collections::default(),
    )
}

#[tokio::test]
async fn login_with_stored_account() {
    logging_init();

    let user = api().login("kim", "secret").await.unwrap();
    assert_eq!(user.id, "kim");
    assert_eq!(user.nickname, "김");
}

#[tokio::test]
async fn login_nickname_defaults_to_id() {
    logging_init();

    let user = api().login("lee", "pw").await.unwrap();
    assert_eq!(user.nickname, "lee");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    logging_init();

    let api = api();
    let wrong_password = api.login("kim", "nope").await.unwrap_err();
    assert_eq!(wrong_password.code, ErrorCode::InvalidCredentials);
    assert_eq!(wrong_password.classify(), ErrorCategory::Unauthorized);

    let unknown = api.login("choi", "secret").await.unwrap_err();
    assert_eq!(unknown.code, ErrorCode::InvalidCredentials);

    let missing = api.login("", "secret").await.unwrap_err();
    assert_eq!(missing.code, ErrorCode::MissingCredentials);
    assert_eq!(missing.classify(), ErrorCategory::BadRequest);
}

#[tokio::test]
async fn signup_then_login() {
    logging_init();

    let api = api();
    let user = api.signup(" Choi ", "pw2", "최").await.unwrap();
    assert_eq!(user.id, "choi");
    assert_eq!(user.nickname, "최");

    let logged_in = api.login("CHOI", "pw2").await.unwrap();
    assert_eq!(logged_in.id, "choi");
}

#[tokio::test]
async fn signup_rejects_duplicates_and_blanks() {
    logging_init();

    let api = api();
    let stored = api.signup("kim", "x", "y").await.unwrap_err();
    assert_eq!(stored.code, ErrorCode::UserAlreadyExists);
    assert_eq!(stored.classify(), ErrorCategory::Conflict);

    api.signup("new", "x", "y").await.unwrap();
    let again = api.signup("NEW", "z", "w").await.unwrap_err();
    assert_eq!(again.code, ErrorCode::UserAlreadyExists);

    let blank = api.signup("someone", "  ", "y").await.unwrap_err();
    assert_eq!(blank.code, ErrorCode::MissingFields);
}

#[tokio::test]
async fn signup_cannot_take_over_stored_account_by_case() {
    logging_init();

    let api = api();
    for id in &["park", "Park", "PARK "] {
        let err = api.signup(id, "hijack", "evil").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UserAlreadyExists, "{}", id);
    }

    let owner = api.login("Park", "owner-pw").await.unwrap();
    assert_eq!(owner.nickname, "박");
    let attacker = api.login("Park", "hijack").await.unwrap_err();
    assert_eq!(attacker.code, ErrorCode::InvalidCredentials);
}

#[tokio::test]
async fn stored_and_signed_up_accounts_coexist() {
    logging_init();

    let api = api();
    let user = api.signup("KIM", "other", "k2").await;
    assert_eq!(user.unwrap_err().code, ErrorCode::UserAlreadyExists);

    api.signup("Lee2", "pw2", "이").await.unwrap();
    assert_eq!(api.login("lee2", "pw2").await.unwrap().id, "lee2");
    assert_eq!(api.login("kim", "secret").await.unwrap().nickname, "김");
}

#[tokio::test]
async fn news_for_a_date_is_deduplicated() {
    logging_init();

    let items = api().list_news(Some("20240131")).await.unwrap();
    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "No aid"]);
}

#[tokio::test]
async fn news_rejects_bad_dates() {
    logging_init();

    let err = api().list_news(Some("2024-01-31")).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidDateFormat);
    assert_eq!(err.classify(), ErrorCategory::BadRequest);
}

#[tokio::test]
async fn news_for_an_empty_day_is_empty() {
    logging_init();

    assert!(api().list_news(Some("19990101")).await.unwrap().is_empty());
}
