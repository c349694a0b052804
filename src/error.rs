use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerError {
    InvalidArgument(String),
    IncompleteRange,
}

impl PickerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PickerError::InvalidArgument(message.into())
    }
}

impl Display for PickerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PickerError::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            PickerError::IncompleteRange => {
                write!(f, "date range is incomplete: both start and end must be selected")
            }
        }
    }
}

impl std::error::Error for PickerError {}
