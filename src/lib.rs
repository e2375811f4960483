pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod storage;

pub use admin::{
    Actions, FieldConfig, Level, Message, ModelAdmin, Record, RecordSchema, RowLoader, UploadField,
};
pub use config::AppConfig;
pub use db::{Model, ModelSchema, Registry, Row};
pub use error::LoadError;
pub use loader::{CsvFile, load_csv_files, register_action};
pub use storage::{FileStore, StoredFile};
