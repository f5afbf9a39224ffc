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

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn out_of_memory(size: usize, alignment: usize) -> Error {
        Error(ErrorKind::OutOfMemory { size, alignment }.into())
    }

    pub fn capacity_overflow(count: usize, element_size: usize) -> Error {
        Error(
            ErrorKind::CapacityOverflow {
                count,
                element_size,
            }
            .into(),
        )
    }

    /// Returns `true` if the error was raised by a failing allocator.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfMemory { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("failed to allocate {size} bytes aligned to {alignment}")]
    OutOfMemory { size: usize, alignment: usize },

    #[error("capacity overflow: {count} elements of {element_size} bytes")]
    CapacityOverflow { count: usize, element_size: usize },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
