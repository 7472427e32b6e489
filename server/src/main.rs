#[macro_use]
extern crate log;

use postbox_engine as engine;
use postbox_server::config::{Config, StorageConfig};
use postbox_storage::{firestore::FirestoreConnector, memory::CorpusConnector, SharedStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() {
    logging_init();

    info!("Parsing config path from argv");
    let config_path = get_config_path_from_argv().unwrap_or_else(|err_msg| {
        eprintln!("Problem parsing arguments: {}", err_msg);
        std::process::exit(1);
    });

    info!("Reading application config from {}", config_path.display());
    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Problem loading config: {}", e);
        std::process::exit(1);
    });
    let addr = config.server.get_socket_addr().unwrap_or_else(|e| {
        eprintln!("Invalid server address '{}': {}", config.server.ip, e);
        std::process::exit(1);
    });

    // Connection happens on the first request that needs the store
    let store = match config.storage {
        StorageConfig::Memory { corpus, sampling } => {
            info!("Using in-memory storage (sampling: {})", sampling);
            SharedStore::new(CorpusConnector::new(corpus, sampling))
        }
        StorageConfig::Firestore { json_key_path } => {
            info!("Using Firestore storage");
            SharedStore::new(FirestoreConnector::new(json_key_path))
        }
    };

    info!("Initialising engine api");
    let api = Arc::new(engine::Api::new(store, config.collections));

    info!("Starting web server on {}", addr);
    let routes = postbox_server::build_routes(api);
    let (_, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, ctrlc_handler());
    server.await;

    info!("Shutting down");
}

fn logging_init() {
    // If log level is not explicitly set,
    // set to info by default
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
}

/// Wrapper around tokio::signal::ctrl_c
async fn ctrlc_handler() {
    signal::ctrl_c().await.ok();
    info!("SIGINT detected");
}

fn get_config_path_from_argv() -> Result<PathBuf, String> {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| String::from("Missing config path argument"))
}
