use std::{error::Error as StdError, fmt};

use backtrace::Backtrace;
use thiserror::Error;

pub trait ErrorCode: StdError + 'static {
    fn code(&self) -> &'static str;
}

#[derive(Error, Debug)]
pub enum Code {
    #[error(transparent)]
    Any(#[from] anyhow::Error),
    #[error("Key generation unavailable for {algorithm}. {reason}")]
    KeyGenerationUnavailable { algorithm: String, reason: String },
    #[error("Invalid {algorithm} key encoding. {reason}")]
    InvalidKeyEncoding { algorithm: String, reason: String },
    #[error("Unsupported key algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("Key type mismatch, expected {expected} but got {actual}")]
    KeyTypeMismatch { expected: String, actual: String },
    #[error("Invalid configuration. {0}")]
    Config(String),
}

impl ErrorCode for Code {
    fn code(&self) -> &'static str {
        match self {
            Self::Any(_) => "1020001",
            Self::KeyGenerationUnavailable { .. } => "1020002",
            Self::InvalidKeyEncoding { .. } => "1020003",
            Self::UnsupportedAlgorithm(_) => "1020004",
            Self::KeyTypeMismatch { .. } => "1020005",
            Self::Config(_) => "1020006",
        }
    }
}

pub struct WithBacktrace {
    source: Code,
    backtrace: Backtrace,
}

impl WithBacktrace {
    pub fn kind(&self) -> &Code {
        &self.source
    }
}

impl fmt::Debug for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithBacktrace")
            .field("source", &self.source)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

impl fmt::Display for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl StdError for WithBacktrace {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

impl From<Code> for WithBacktrace {
    fn from(code: Code) -> Self {
        WithBacktrace {
            source: code,
            backtrace: Backtrace::new(),
        }
    }
}

impl From<WithBacktrace> for Code {
    fn from(value: WithBacktrace) -> Self {
        value.source
    }
}

impl PartialEq for WithBacktrace {
    fn eq(&self, other: &Self) -> bool {
        self.source.code() == other.source.code()
    }
}

#[inline]
pub fn any<E: StdError>(err: E) -> WithBacktrace {
    Code::Any(anyhow::anyhow!("{}", err.to_string())).into()
}

#[inline]
pub fn anyhow(err: anyhow::Error) -> WithBacktrace {
    Code::Any(err).into()
}

#[inline]
pub fn key_generation_unavailable<A, S>(algorithm: &A, reason: &S) -> WithBacktrace
where
    A: ToString + ?Sized,
    S: ToString + ?Sized,
{
    Code::KeyGenerationUnavailable {
        algorithm: algorithm.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[inline]
pub fn invalid_key_encoding<A, S>(algorithm: &A, reason: &S) -> WithBacktrace
where
    A: ToString + ?Sized,
    S: ToString + ?Sized,
{
    Code::InvalidKeyEncoding {
        algorithm: algorithm.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[inline]
pub fn unsupported_algorithm<S: ToString + ?Sized>(algorithm: &S) -> WithBacktrace {
    Code::UnsupportedAlgorithm(algorithm.to_string()).into()
}

#[inline]
pub fn key_type_mismatch<E, A>(expected: &E, actual: &A) -> WithBacktrace
where
    E: ToString + ?Sized,
    A: ToString + ?Sized,
{
    Code::KeyTypeMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
    .into()
}

#[inline]
pub fn config<S: ToString + ?Sized>(err: &S) -> WithBacktrace {
    Code::Config(err.to_string()).into()
}
