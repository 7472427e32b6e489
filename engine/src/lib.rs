#[macro_use]
extern crate log;

pub mod api;
pub use self::api::{Api, Collections};

mod error;
pub use self::error::*;

pub mod selector;
pub use self::selector::{NotFoundReason, Selection};
