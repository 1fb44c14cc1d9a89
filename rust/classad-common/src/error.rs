use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` when the error reports a broken structural invariant inside an
    /// index. Such an index (and anything built on top of it) must not be trusted
    /// for further queries.
    pub fn is_internal(&self) -> bool {
        matches!(self.kind(), ErrorKind::InternalInvariant { .. })
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn inconsistent_bound(attribute: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InconsistentBound {
                attribute: attribute.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn unknown_attribute_type(attribute: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnknownAttributeType {
                attribute: attribute.into(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn internal(context: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InternalInvariant {
                context: context.into(),
                message: message.into(),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    /// A bound that would leave a record's interval for `attribute` with its upper
    /// endpoint below its lower one.
    #[error("inconsistent bound on '{attribute}': {message}")]
    InconsistentBound { attribute: String, message: String },

    #[error("attribute '{attribute}' has no recognized type prefix")]
    UnknownAttributeType { attribute: String },

    #[error("internal invariant violated in {context}: {message}")]
    InternalInvariant { context: String, message: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
