use std::path::{Path, PathBuf};

pub type Cause = Box<dyn std::error::Error + Send + Sync>;

/// One variant per pipeline stage. Every variant keeps the original cause.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse document: {context}")]
    Parse {
        context: String,
        #[source]
        source: Option<Cause>,
    },

    #[error("failed to transform scraped data: {context}")]
    Transform {
        context: String,
        #[source]
        source: Option<Cause>,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Cause,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    pub fn fetch(url: &str, source: reqwest::Error) -> Self {
        EtlError::Fetch {
            url: url.to_string(),
            source,
        }
    }

    pub fn parse(context: impl Into<String>) -> Self {
        EtlError::Parse {
            context: context.into(),
            source: None,
        }
    }

    pub fn parse_with(context: impl Into<String>, source: impl Into<Cause>) -> Self {
        EtlError::Parse {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    pub fn transform_with(context: impl Into<String>, source: impl Into<Cause>) -> Self {
        EtlError::Transform {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    pub fn write(path: &Path, source: impl Into<Cause>) -> Self {
        EtlError::Write {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}
