use crate::engine_handlers;
use crate::health_handlers;
use crate::logging;
use crate::schemas::{self, ErrorResponse};
use postbox_engine as engine;

use http::StatusCode;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

pub fn build_routes(
    api: Arc<engine::Api>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and_then(health_handlers::index);

    let api_index = warp::path!("api")
        .and(warp::get())
        .and_then(health_handlers::index);

    let favicon = warp::path!("favicon.ico")
        .and(warp::get())
        .and_then(health_handlers::favicon);

    let health = api_function("health")
        .and(warp::get())
        .and_then(health_handlers::health);

    let version = api_function("version")
        .and(warp::get())
        .and_then(health_handlers::version);

    let echo = api_function("_echo")
        .and(warp::post())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::body::bytes())
        .and_then(health_handlers::echo);

    let get_random_message = api_function("GetRandomMessage")
        .and(warp::get().or(warp::post()).unify())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::body::bytes())
        .and(with_engine_api(Arc::clone(&api)))
        .and_then(engine_handlers::get_random_message);

    let login = api_function("Login")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_engine_api(Arc::clone(&api)))
        .and_then(engine_handlers::login);

    let signup = api_function("signup")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_engine_api(Arc::clone(&api)))
        .and_then(engine_handlers::signup);

    let list_news = api_function("news")
        .and(warp::get())
        .and(warp::query::<schemas::NewsQuery>())
        .and(with_engine_api(Arc::clone(&api)))
        .and_then(engine_handlers::list_news);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_header("content-type");

    index
        .or(api_index)
        .or(favicon)
        .or(health)
        .or(version)
        .or(echo)
        .or(get_random_message)
        .or(login)
        .or(signup)
        .or(list_news)
        .recover(engine_handlers::handle_message_error)
        .recover(handle_not_found)
        .recover(handle_method_not_allowed)
        .recover(unhandled)
        .with(cors)
        .with(logging::log_incoming_request())
}

/// `/api/<name>`, matching `name` without regard to ASCII case.
fn api_function(name: &'static str) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path("api")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and_then(move |segment: String| async move {
            if segment.eq_ignore_ascii_case(name) {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}

fn with_engine_api(
    api: Arc<engine::Api>,
) -> impl Filter<Extract = (Arc<engine::Api>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&api))
}

async fn handle_method_not_allowed(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(_) = err.find::<warp::reject::MethodNotAllowed>() {
        Ok(warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new("METHOD_NOT_ALLOWED")),
            StatusCode::METHOD_NOT_ALLOWED,
        ))
    } else {
        Err(err)
    }
}

async fn handle_not_found(err: Rejection) -> Result<impl Reply, Rejection> {
    if err.is_not_found() {
        Ok(warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new("NOT_FOUND")),
            StatusCode::NOT_FOUND,
        ))
    } else {
        Err(err)
    }
}

async fn unhandled(err: Rejection) -> Result<impl Reply, Infallible> {
    error!("Unhandled rejection {:?}", err);
    let (error, status_code) = if let Some(_) = err.find::<warp::reject::InvalidQuery>() {
        ("INVALID_QUERY", StatusCode::BAD_REQUEST)
    } else {
        ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(error)),
        status_code,
    ))
}
