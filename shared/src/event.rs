//! Controller error/message events

use serde::{Serialize, Serializer};

/// Message kinds reported on the controller's error channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NmlError,
    NmlText,
    NmlDisplay,
    OperatorError,
    OperatorText,
    OperatorDisplay,
    Other(i32),
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::NmlError => 1,
            ErrorKind::NmlText => 2,
            ErrorKind::NmlDisplay => 3,
            ErrorKind::OperatorError => 11,
            ErrorKind::OperatorText => 12,
            ErrorKind::OperatorDisplay => 13,
            ErrorKind::Other(code) => code,
        }
    }

    /// Only NML and operator errors are errors; everything else is informational
    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::NmlError | ErrorKind::OperatorError => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Info,
}

/// One message drained from the error channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub id: u64,
    pub kind: ErrorKind,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub text: String,
    pub time: String,
}

impl ErrorEvent {
    pub fn new(id: u64, kind: ErrorKind, text: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            severity: kind.severity(),
            text: text.into(),
            time: time.into(),
        }
    }
}
