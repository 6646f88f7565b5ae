//! Structured error types shared across wilco crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`WilcoError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (particle names, operator labels, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the wilco pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum WilcoError {
    /// Model registry construction errors.
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Malformed process specifications, reported before any amplitude work.
    #[error("process error: {0}")]
    Process(ErrorInfo),
    /// Loop-integral or Dirac-algebra reduction failures.
    #[error("reduction error: {0}")]
    Reduction(ErrorInfo),
    /// Operator-basis projection failures.
    #[error("match error: {0}")]
    Match(ErrorInfo),
    /// Recoverable lookup miss for an operator template.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// Malformed symbolic expressions.
    #[error("expression error: {0}")]
    Expr(ErrorInfo),
    /// Abbreviation table errors.
    #[error("abbreviation error: {0}")]
    Abbreviation(ErrorInfo),
    /// Numeric evaluation errors.
    #[error("evaluation error: {0}")]
    Eval(ErrorInfo),
    /// Library emission errors.
    #[error("codegen error: {0}")]
    Codegen(ErrorInfo),
    /// Configuration loading errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Terminal and stream I/O failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl WilcoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            WilcoError::Model(info)
            | WilcoError::Process(info)
            | WilcoError::Reduction(info)
            | WilcoError::Match(info)
            | WilcoError::NotFound(info)
            | WilcoError::Expr(info)
            | WilcoError::Abbreviation(info)
            | WilcoError::Eval(info)
            | WilcoError::Codegen(info)
            | WilcoError::Config(info)
            | WilcoError::Serde(info)
            | WilcoError::Io(info) => info,
        }
    }

    /// Returns the stable machine readable code of the payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Whether the error is a recoverable operator lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WilcoError::NotFound(_))
    }
}
