use serde::Serialize;
use std::error;
use std::fmt::{self, Display};
use std::result;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Http(http::Error),
    Hyper(hyper::Error),
    Io(std::io::Error),
    Jwt(jsonwebtoken::errors::Error),
    OAuth(String),
    Other(String),
    Serialization(serde_json::error::Error),
    Unavailable(String),
    Unsupported(String),
}

impl Error {
    /// True when the store rejected the operation itself rather than failing to run it.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Http(ref e) => Display::fmt(e, f),
            Error::Hyper(ref e) => Display::fmt(e, f),
            Error::Io(ref e) => Display::fmt(e, f),
            Error::Jwt(ref e) => Display::fmt(e, f),
            Error::OAuth(ref e) => Display::fmt(e, f),
            Error::Other(ref e) => Display::fmt(e, f),
            Error::Serialization(ref e) => Display::fmt(e, f),
            Error::Unavailable(ref e) => write!(f, "storage unavailable: {}", e),
            Error::Unsupported(ref e) => write!(f, "operation not supported: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Http(ref e) => Some(e),
            Error::Hyper(ref e) => Some(e),
            Error::Io(ref e) => Some(e),
            Error::Jwt(ref e) => Some(e),
            Error::OAuth(_) => None,
            Error::Other(_) => None,
            Error::Serialization(ref e) => Some(e),
            Error::Unavailable(_) => None,
            Error::Unsupported(_) => None,
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let name = "storage::Error";
        let (variant_index, variant, value) = match *self {
            Error::Http(ref e) => (0, "Http", format!("{:?}", e)),
            Error::Hyper(ref e) => (1, "Hyper", format!("{:?}", e)),
            Error::Io(ref e) => (2, "Io", format!("{:?}", e)),
            Error::Jwt(ref e) => (3, "Jwt", format!("{:?}", e)),
            Error::OAuth(ref e) => (4, "OAuth", e.to_string()),
            Error::Other(ref e) => (5, "Other", e.to_string()),
            Error::Serialization(ref e) => (6, "Serialization", format!("{:?}", e)),
            Error::Unavailable(ref e) => (7, "Unavailable", e.to_string()),
            Error::Unsupported(ref e) => (8, "Unsupported", e.to_string()),
        };
        serializer.serialize_newtype_variant(name, variant_index, variant, &value)
    }
}

impl From<http::Error> for Error {
    fn from(value: http::Error) -> Self {
        Error::Http(value)
    }
}

impl From<hyper::Error> for Error {
    fn from(value: hyper::Error) -> Self {
        Error::Hyper(value)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Serialization(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
