pub type RtResult<T> = Result<T, RtError>;

/// Generic error that contains all the different kinds of errors that may occur when talking to
/// the graphics device
#[derive(Debug, Clone)]
pub enum RtError {
    StringError(String),
}

impl std::error::Error for RtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            RtError::StringError(_) => None,
        }
    }
}

impl core::fmt::Display for RtError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            RtError::StringError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for RtError {
    fn from(str: &str) -> Self {
        RtError::StringError(str.to_string())
    }
}

impl From<String> for RtError {
    fn from(string: String) -> Self {
        RtError::StringError(string)
    }
}
