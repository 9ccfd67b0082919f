//! Purpose: Single error type for value access, marshaling, and the native call protocol.
//! Exports: `Error`, `ErrorKind`, `ErrorInfo`, `to_abi_code`.
//! Role: Lets callers tell native business failures apart from binding/library skew.
//! Invariants: Only `ErrorKind::Native` errors carry an `ErrorInfo`.
//! Invariants: ABI codes per kind are stable; reordering breaks foreign callers.
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Native,
    Protocol,
    WrongTag,
    Corrupt,
}

/// Structured failure reported by the native library inside a call envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i64,
    pub name: String,
    pub scope: String,
    pub message: String,
    pub description: String,
    pub full: Option<String>,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    native: Option<Box<ErrorInfo>>,
    key: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            native: None,
            key: None,
            source: None,
        }
    }

    pub fn native(info: ErrorInfo) -> Self {
        let mut err = Self::new(ErrorKind::Native);
        err.message = Some(info.message.clone());
        err.native = Some(Box::new(info));
        err
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol).with_message(message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Object key being decoded when a shape error surfaced.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn native_info(&self) -> Option<&ErrorInfo> {
        self.native.as_deref()
    }

    pub fn is_native(&self) -> bool {
        self.kind == ErrorKind::Native
    }

    pub fn is_protocol(&self) -> bool {
        self.kind == ErrorKind::Protocol
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        if self.key.is_none() {
            self.key = Some(key.into());
        }
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Re-labels a lower-level failure as a protocol mismatch, keeping it as the source.
    pub(crate) fn into_protocol(self, message: impl Into<String>) -> Self {
        if self.kind == ErrorKind::Protocol {
            return self;
        }
        let key = self.key.clone();
        let mut err = Error::protocol(message).with_source(self);
        err.key = key;
        err
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(info) = &self.native {
            write!(f, ": {} ({}, code {})", info.message, info.name, info.code)?;
            if !info.scope.is_empty() {
                write!(f, " [scope: {}]", info.scope)?;
            }
            return Ok(());
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_abi_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Native => 3,
        ErrorKind::Protocol => 4,
        ErrorKind::WrongTag => 5,
        ErrorKind::Corrupt => 6,
    }
}
