use thiserror::Error;

/// How an error should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A rejected-but-harmless request; shown as an informational modal.
    Advisory,
    /// A real failure; shown as an error modal.
    Error,
}

#[derive(Error, Debug)]
pub enum PageDeckError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Failed to render page: {0}")]
    RenderError(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Page index {0} is out of bounds")]
    IndexOutOfBounds(usize),

    #[error("No pages selected")]
    NothingSelected,

    #[error("No pages loaded")]
    EmptyCollection,

    #[error("Pages are still being rendered")]
    Busy,
}

impl PageDeckError {
    pub fn severity(&self) -> Severity {
        match self {
            PageDeckError::NothingSelected
            | PageDeckError::EmptyCollection
            | PageDeckError::Busy => Severity::Advisory,
            _ => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_variants() {
        assert_eq!(PageDeckError::Busy.severity(), Severity::Advisory);
        assert_eq!(PageDeckError::NothingSelected.severity(), Severity::Advisory);
        assert_eq!(PageDeckError::EmptyCollection.severity(), Severity::Advisory);
    }

    #[test]
    fn test_failure_variants() {
        assert_eq!(
            PageDeckError::ParseError("bad".into()).severity(),
            Severity::Error
        );
        assert_eq!(PageDeckError::IndexOutOfBounds(3).severity(), Severity::Error);
    }
}
