mod file;
mod memory;
mod store;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use store::{ ConversationStore, CORRUPT_SUFFIX, HISTORY_KEY };

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Key-value persistence port standing in for browser local storage.
/// Values are whole serialized documents; `save` always overwrites.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn clear(&self, key: &str) -> Result<(), StorageError>;
}
