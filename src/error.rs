use std::error;
use std::fmt::{self, Display, Formatter};
use std::io;

#[derive(Debug)]
pub struct Error {
    description: String,

    pub kind: ErrorKind,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ErrorKind {
    Io,
    Config,
    Network,
    LoginFailed,
    InvalidAssertion,
    NoRole,
    InvalidSelection,
    AssumeRole,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Error {
            description: message.into(),
            kind,
        }
    }

    pub fn network(message: &str) -> Self {
        Error::new(ErrorKind::Network, message)
    }

    pub fn invalid_assertion(message: &str) -> Self {
        Error::new(ErrorKind::InvalidAssertion, message)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::new(ErrorKind::Io, &e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::network(&e.to_string())
    }
}

impl From<ini::Error> for Error {
    fn from(e: ini::Error) -> Self {
        Error::new(ErrorKind::Config, &e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::new(ErrorKind::Config, &e.to_string())
    }
}
