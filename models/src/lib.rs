#[macro_use]
extern crate log;

mod message;
pub use self::message::Message;

mod mood;
pub use self::mood::{Mood, ParseMoodError};

mod news;
pub use self::news::{dedupe, NewsItem};

mod user;
pub use self::user::User;
