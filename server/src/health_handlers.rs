use crate::schemas;
use std::collections::HashMap;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::Reply;

pub const ENDPOINTS: &[&str] = &[
    "GET|POST /api/GetRandomMessage",
    "POST /api/Login",
    "POST /api/signup",
    "GET /api/news",
    "GET /api/health",
    "GET /api/version",
    "POST /api/_echo",
];

pub async fn health() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&schemas::HealthResponse { ok: true }))
}

pub async fn version() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&schemas::VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn index() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&schemas::IndexResponse {
        service: "mind-postbox",
        endpoints: ENDPOINTS.to_vec(),
    }))
}

pub async fn favicon() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT))
}

pub async fn echo(
    content_type: Option<String>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Result<impl Reply, Infallible> {
    let echoed = schemas::EchoRequest::from_parts(content_type, &query, &body);
    debug!("Echo: {:?}", echoed);
    Ok(warp::reply::json(&schemas::EchoResponse::from(echoed)))
}
