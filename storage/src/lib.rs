#[macro_use]
extern crate log;

pub mod firestore;
pub mod memory;

mod document;
pub use document::{Document, Filter, FindOptions, Projection};

mod error;
pub use error::Error;
pub use error::Result;

mod shared;
pub use shared::SharedStore;

mod store;
pub use store::{Connector, DocumentStore};
