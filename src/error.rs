use serde::Serialize;
use thiserror::Error;

/// Error kinds reported to callers of the bridge.
///
/// Every failing operation reports exactly one of these. Low-level parser failures never leak
/// as their own kind; they are folded into [`ErrorKind::Unreadable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Unreadable,
    InvalidHandle,
    UnknownGroup,
    UnknownChannel,
    OutOfRange,
    Unimplemented,
    BadRequest,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unreadable => "Unreadable",
            ErrorKind::InvalidHandle => "InvalidHandle",
            ErrorKind::UnknownGroup => "UnknownGroup",
            ErrorKind::UnknownChannel => "UnknownChannel",
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::Unimplemented => "Unimplemented",
            ErrorKind::BadRequest => "BadRequest",
        }
    }
}

/// Main error type for the exd_sheet crate.
/// Aggregates the bridge taxonomy together with errors raised while parsing spreadsheet containers.
#[derive(Error, Debug)]
pub enum ExdSheetError {
    // Bridge taxonomy
    #[error("File '{0}' not accessible")]
    NotFound(String),

    #[error("File '{0}' is not a readable spreadsheet: {1}")]
    Unreadable(String, String),

    #[error("Invalid handle '{0}'")]
    InvalidHandle(String),

    #[error("Unknown group id {0}")]
    UnknownGroup(usize),

    #[error("Unknown channel id {1} in group {0}")]
    UnknownChannel(usize, usize),

    #[error("Row start {0} out of range")]
    OutOfRange(i64),

    #[error("Method '{0}' not implemented")]
    Unimplemented(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Row count {0} exceeds the limit of {1} rows per request")]
    RowCountLimit(usize, usize),

    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    AllocationError(#[from] std::collections::TryReserveError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),
}

impl ExdSheetError {
    /// Maps this error onto the taxonomy reported to callers.
    ///
    /// Anything raised by the container parsers counts as an unreadable file.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExdSheetError::NotFound(_) => ErrorKind::NotFound,
            ExdSheetError::InvalidHandle(_) => ErrorKind::InvalidHandle,
            ExdSheetError::UnknownGroup(_) => ErrorKind::UnknownGroup,
            ExdSheetError::UnknownChannel(_, _) => ErrorKind::UnknownChannel,
            ExdSheetError::OutOfRange(_) => ErrorKind::OutOfRange,
            ExdSheetError::Unimplemented(_) => ErrorKind::Unimplemented,
            ExdSheetError::BadRequest(_)
            | ExdSheetError::RowCountLimit(_, _)
            | ExdSheetError::AllocationError(_)
            | ExdSheetError::JsonError(_) => ErrorKind::BadRequest,
            _ => ErrorKind::Unreadable,
        }
    }

    /// Folds a low-level failure into [`ExdSheetError::Unreadable`] for the given file.
    /// Taxonomy errors pass through untouched.
    pub(crate) fn into_unreadable(self, file_name: &str) -> Self {
        match self.kind() {
            ErrorKind::Unreadable => match self {
                ExdSheetError::Unreadable(_, _) => self,
                other => ExdSheetError::Unreadable(file_name.to_owned(), other.to_string()),
            },
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ExdSheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e.kind() {
            ErrorKind::Unreadable => ExdSheetError::WithContextError(format!("{}: {}", message, e)),
            _ => e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_errors_are_unreadable() {
        let error = ExdSheetError::from(std::io::Error::other("boom"));
        assert_eq!(error.kind(), ErrorKind::Unreadable);

        let error = error.into_unreadable("a.xlsx");
        assert!(matches!(error, ExdSheetError::Unreadable(ref name, _) if name == "a.xlsx"));
        assert_eq!(error.to_string(), "File 'a.xlsx' is not a readable spreadsheet: boom");
    }

    #[test]
    fn taxonomy_errors_keep_their_kind() {
        let error = ExdSheetError::InvalidHandle("7".to_owned()).into_unreadable("a.xlsx");
        assert_eq!(error.kind(), ErrorKind::InvalidHandle);

        let result: Result<(), ExdSheetError> = Err(ExdSheetError::UnknownGroup(3));
        assert_eq!(result.with_prefix("a.xlsx").unwrap_err().kind(), ErrorKind::UnknownGroup);
    }

    #[test]
    fn oversized_requests_are_bad_requests() {
        assert_eq!(ExdSheetError::RowCountLimit(10, 5).kind(), ErrorKind::BadRequest);
        let error = Vec::<u64>::new().try_reserve_exact(usize::MAX).unwrap_err();
        let error = ExdSheetError::from(error).into_unreadable("a.xlsx");
        assert_eq!(error.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn prefix_keeps_unreadable_kind() {
        let result: Result<(), ExdSheetError> = Err(ExdSheetError::from(std::io::Error::other("boom")));
        let error = result.with_prefix("a.xlsx").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unreadable);
        assert_eq!(error.to_string(), "a.xlsx: boom");
    }
}
