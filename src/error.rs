//! Error types for the mock engine

use thiserror::Error;

use crate::handle::Operator;

/// Main error type for the mock engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MockError {
    /// An operator was used in a way its preconditions forbid
    #[error("UsageError: {}{message}", format_operator(.operator))]
    Usage {
        operator: Option<Operator>,
        message: String,
    },

    /// Code under test called a value that is not an installed function
    #[error("TypeError: {type_of} is not a function")]
    NotCallable { type_of: &'static str },

    /// A spy was requested before a spy constructor was configured
    #[error("ConfigError: no spy constructor configured; call Session::configure first")]
    SpyNotConfigured,

    /// The parent a node was attached to no longer exists
    #[error("UsageError: the parent this value was attached to has been dropped")]
    Detached,
}

fn format_operator(operator: &Option<Operator>) -> String {
    match operator {
        Some(op) => format!("[{}] ", op),
        None => String::new(),
    }
}

impl MockError {
    pub fn usage(operator: Operator, message: impl Into<String>) -> Self {
        MockError::Usage {
            operator: Some(operator),
            message: message.into(),
        }
    }

    /// Usage error raised by plain assignment rather than an operator
    pub fn assignment(message: impl Into<String>) -> Self {
        MockError::Usage {
            operator: None,
            message: message.into(),
        }
    }

    pub fn not_callable(type_of: &'static str) -> Self {
        MockError::NotCallable { type_of }
    }

    /// Check if this error reports a violated usage precondition
    pub fn is_usage(&self) -> bool {
        matches!(self, MockError::Usage { .. } | MockError::Detached)
    }
}
