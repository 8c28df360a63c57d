#![forbid(unsafe_code)]

pub mod envelope;
pub mod json_file;
pub mod repository;
pub mod sqlite;

pub use json_file::JsonFileProgressRepository;
pub use repository::{
    DEFAULT_PROGRESS_KEY, InMemoryProgressRepository, ProgressRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
