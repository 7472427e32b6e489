#[macro_use]
extern crate log;

pub mod config;

mod engine_handlers;
mod health_handlers;
mod logging;

mod routes;
pub use self::routes::build_routes;

mod schemas;
