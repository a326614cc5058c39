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

    #[cold]
    pub fn region_too_short(element: impl Into<String>, required: u64, available: u64) -> Error {
        Error(
            ErrorKind::RegionTooShort {
                element: element.into(),
                required,
                available,
            }
            .into(),
        )
    }

    #[cold]
    pub fn codec_overflow(codec: impl Into<String>, value: u64) -> Error {
        Error(
            ErrorKind::CodecOverflow {
                codec: codec.into(),
                value,
            }
            .into(),
        )
    }

    #[cold]
    pub fn verification_mismatch(
        term: usize,
        position: u64,
        field: &'static str,
        expected: u64,
        actual: u64,
    ) -> Error {
        Error(
            ErrorKind::VerificationMismatch {
                term,
                position,
                field,
                expected,
                actual,
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
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

    #[error("invalid encoded format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("region too short for '{element}': {required} bits required, {available} available")]
    RegionTooShort {
        element: String,
        required: u64,
        available: u64,
    },

    #[error("value {value} does not fit the 32-bit posting width of {codec}")]
    CodecOverflow { codec: String, value: u64 },

    #[error(
        "verification failed for term {term} at position {position}: \
         {field} expected {expected}, found {actual}"
    )]
    VerificationMismatch {
        term: usize,
        position: u64,
        field: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
