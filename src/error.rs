use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("model not found: {app_label}.{model_name}")]
    ModelNotFound {
        app_label: String,
        model_name: String,
    },
    #[error("invalid file type: {0}")]
    InvalidFileType(String),
    #[error("no file stored for upload field '{0}'")]
    MissingFile(String),
    #[error("unknown column '{column}' for model {model}")]
    UnknownColumn { column: String, model: String },
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;
