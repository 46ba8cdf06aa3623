use std::{fmt, io};

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Json(serde_json::Error),
    Jose(josekit::JoseError),
    Base64(base64ct::Error),
    KeyType(Box<str>),
    Algorithm(Box<str>, &'static str),
    Curve(Box<str>),
    Coordinate(&'static str),
    MissingKeyOp(Box<str>),
    JsonMissingKey(Box<str>),
    JsonKeyType(Box<str>),
    NotOnCurve,
    KeyNotFound(Box<str>),
    NoAdvertisedKeys,
    NoSignKeys,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "invalid json: {err}"),
            Self::Jose(err) => write!(f, "jose error: {err}"),
            Self::Base64(err) => write!(f, "invalid base64: {err}"),
            Self::KeyType(v) => write!(f, "unsupported key type {v}"),
            Self::Algorithm(v, c) => write!(f, "invalid algorithm {v} for {c}"),
            Self::Curve(v) => write!(f, "unsupported curve {v}"),
            Self::Coordinate(name) => write!(f, "invalid '{name}' coordinate"),
            Self::MissingKeyOp(v) => write!(f, "missing a key marked '{v}'"),
            Self::JsonMissingKey(v) => write!(f, "missing key {v}"),
            Self::JsonKeyType(v) => write!(f, "invalid key type {v} in JSON"),
            Self::NotOnCurve => write!(f, "EC point is not on the curve"),
            Self::KeyNotFound(thp) => write!(f, "key '{thp}' not found"),
            Self::NoAdvertisedKeys => write!(f, "no advertised keys found"),
            Self::NoSignKeys => write!(f, "no sign keys found"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Jose(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<josekit::JoseError> for Error {
    fn from(value: josekit::JoseError) -> Self {
        Self::Jose(value)
    }
}

impl From<base64ct::Error> for Error {
    fn from(value: base64ct::Error) -> Self {
        Self::Base64(value)
    }
}
