//! Store-layer errors.

use {std::path::PathBuf, thiserror::Error};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A report row that cannot be mapped back into a reward entry.
    #[error("malformed row in {file}: {reason}")]
    BadRow { file: PathBuf, reason: String },
}

impl StoreError {
    /// The underlying io error, if any, unwrapping csv's own wrapper.
    /// Callers branch on the errno (disk full is fatal in a different
    /// way than a permissions problem).
    pub fn as_io(&self) -> Option<&std::io::Error> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Csv(err) => match err.kind() {
                csv::ErrorKind::Io(io_err) => Some(io_err),
                _ => None,
            },
            StoreError::BadRow { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_io_unwraps_both_io_variants() {
        let direct = StoreError::Io(std::io::Error::other("disk"));
        assert!(direct.as_io().is_some());

        let wrapped = StoreError::Csv(csv::Error::from(std::io::Error::other("disk")));
        assert!(wrapped.as_io().is_some());

        let row = StoreError::BadRow {
            file: PathBuf::from("x.csv"),
            reason: "bad".to_string(),
        };
        assert!(row.as_io().is_none());
    }
}
