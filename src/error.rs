use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Arity,
    Transform,
    Structure,
    Input,
    Options,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("expected {expected} values, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("transform failed at `{path}`: {source}")]
    Transform {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("header `{header}` descends through the value bound at `{prefix}`")]
    PathConflict { header: String, prefix: String },

    #[error("input doesn't contain headers")]
    MissingHeaders,

    #[error("invalid options: {0}")]
    Options(String),

    #[error("row {row}: {source}")]
    Row {
        row: u64,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transform(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Transform {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn options(message: impl Into<String>) -> Self {
        Error::Options(message.into())
    }

    pub fn at_row(self, row: u64) -> Self {
        Error::Row {
            row,
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Arity { .. } => ErrorKind::Arity,
            Error::Transform { .. } => ErrorKind::Transform,
            Error::PathConflict { .. } => ErrorKind::Structure,
            Error::Options(_) => ErrorKind::Options,
            Error::Row { source, .. } => source.kind(),
            Error::MissingHeaders | Error::Csv(_) | Error::Json(_) | Error::Io(_) => {
                ErrorKind::Input
            }
        }
    }

    /// Whether only the current row failed; the template that produced it
    /// can keep rendering.
    pub fn is_row_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Arity | ErrorKind::Transform)
    }
}
