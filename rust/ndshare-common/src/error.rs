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
        ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        ErrorKind::InvalidOperation { name: name.into() }.into()
    }

    pub fn invalid_shape(expected: impl Into<String>, actual: impl Into<String>) -> Error {
        ErrorKind::InvalidShape {
            expected: expected.into(),
            actual: actual.into(),
        }
        .into()
    }

    pub fn layout_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Error {
        ErrorKind::LayoutMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
        .into()
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Error {
        ErrorKind::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
        .into()
    }

    pub fn unsupported_device(device: impl Into<String>) -> Error {
        ErrorKind::UnsupportedDevice {
            device: device.into(),
        }
        .into()
    }

    pub fn read_only() -> Error {
        ErrorKind::ReadOnly.into()
    }

    pub fn overlapping_view(message: impl Into<String>) -> Error {
        ErrorKind::OverlappingView {
            message: message.into(),
        }
        .into()
    }

    pub fn allocation(size: usize, reason: impl Into<String>) -> Error {
        ErrorKind::Allocation {
            size,
            reason: reason.into(),
        }
        .into()
    }

    /// Returns `true` for the mismatch kinds a boundary check reports
    /// (shape, layout, element type or device).
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidShape { .. }
                | ErrorKind::LayoutMismatch { .. }
                | ErrorKind::TypeMismatch { .. }
                | ErrorKind::UnsupportedDevice { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid shape: expected {expected}, got {actual}")]
    InvalidShape { expected: String, actual: String },

    #[error("layout mismatch: expected {expected}, got {actual}")]
    LayoutMismatch { expected: String, actual: String },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("memory on device '{device}' is not host-accessible")]
    UnsupportedDevice { device: String },

    #[error("buffer is read-only")]
    ReadOnly,

    #[error("view overlaps a live view of the same allocation: {message}")]
    OverlappingView { message: String },

    #[error("failed to allocate {size} bytes: {reason}")]
    Allocation { size: usize, reason: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
