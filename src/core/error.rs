//! Purpose: Single error type shared by the codec, registry, and environment facade.
//! Exports: `Error`, `ErrorKind`.
//! Role: Structured failure carrier; callers branch on `kind()`, humans read `Display`.
//! Invariants: Collaborator failures are wrapped once and keep their source chain.
//! Invariants: Date-candidate parse failures never surface as an `Error`.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    /// Conflicting or invalid encoder/decoder options.
    Config,
    /// No registry entry matches the value and it is not natively encodable.
    NotSerializable,
    /// A value is encodable in principle but not in this form (binary text, NaN).
    Encoding,
    RecursionLimit,
    Parse,
    /// A collaborator (key, future, query, model) failed while being resolved.
    Resolve,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    type_name: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            type_name: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn not_serializable(type_name: &str) -> Self {
        Self::new(ErrorKind::NotSerializable)
            .with_message(format!("object of type {type_name} is not JSON serializable"))
            .with_type_name(type_name)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(type_name) = &self.type_name {
            write!(f, " (type: {type_name})")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
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

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io)
            .with_message(err.to_string())
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};
    use std::error::Error as _;

    #[test]
    fn display_lists_message_type_and_hint() {
        let err = Error::not_serializable("Widget").with_hint("register an encoder for Widget");
        let text = err.to_string();
        assert!(text.starts_with("NotSerializable: object of type Widget"));
        assert!(text.contains("(type: Widget)"));
        assert!(text.contains("(hint: register an encoder for Widget)"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::from(io);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("pipe closed"));
    }
}
