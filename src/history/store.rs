use log::{ info, warn, error };

use super::{ Storage, StorageError };
use crate::models::chat::Message;

pub const HISTORY_KEY: &str = "chat_history";
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// The ordered message history of the active session, mirrored to a
/// [`Storage`] entry that is rewritten in full after every mutation.
pub struct ConversationStore {
    storage: Box<dyn Storage>,
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Restores the persisted history. An absent entry, an unreadable one,
    /// or one that does not decode as a message list all yield an empty
    /// conversation. Undecodable payloads are kept under a side key.
    pub fn load(storage: Box<dyn Storage>) -> Self {
        let messages = match storage.load(HISTORY_KEY) {
            Ok(Some(raw)) =>
                match serde_json::from_str::<Vec<Message>>(&raw) {
                    Ok(messages) => {
                        info!("Restored {} messages from history", messages.len());
                        messages
                    }
                    Err(e) => {
                        warn!("Discarding malformed chat history: {}", e);
                        back_up_malformed(storage.as_ref(), &raw);
                        Vec::new()
                    }
                }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to read chat history: {}", e);
                Vec::new()
            }
        };

        Self { storage, messages }
    }

    /// Appends one message and overwrites the persisted sequence. The
    /// in-memory append stands even when the write fails.
    pub fn append(&mut self, message: Message) -> Result<(), StorageError> {
        self.messages.push(message);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.messages.clear();
        self.storage.clear(HISTORY_KEY)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn persist(&self) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&self.messages)?;
        self.storage.save(HISTORY_KEY, &encoded)
    }
}

/// Keeps the first malformed payload seen; later ones are only logged.
fn back_up_malformed(storage: &dyn Storage, raw: &str) {
    let backup_key = format!("{}{}", HISTORY_KEY, CORRUPT_SUFFIX);
    match storage.load(&backup_key) {
        Ok(Some(_)) => {
            warn!("Backup {} already exists; leaving it untouched", backup_key);
        }
        Ok(None) => {
            if let Err(e) = storage.save(&backup_key, raw) {
                error!("Failed to back up malformed history: {}", e);
            }
        }
        Err(e) => {
            error!("Failed to check for existing history backup: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryStorage;

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
        fn clear(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn test_empty_storage_loads_empty_conversation() {
        let store = ConversationStore::load(Box::new(MemoryStorage::new()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_reload_reproduces_appended_sequence() {
        let storage = MemoryStorage::new();
        let appended = vec![
            Message::user("Hello"),
            Message::model("Hi there\n```rust\nfn main() {}\n```"),
            Message::user(""),
            Message::model("ünïcödé ✓"),
        ];

        let mut store = ConversationStore::load(Box::new(storage.clone()));
        for msg in &appended {
            store.append(msg.clone()).unwrap();
        }

        let reloaded = ConversationStore::load(Box::new(storage));
        assert_eq!(reloaded.messages(), appended.as_slice());
    }

    #[test]
    fn test_every_append_rewrites_the_whole_entry() {
        let storage = MemoryStorage::new();
        let mut store = ConversationStore::load(Box::new(storage.clone()));
        store.append(Message::user("one")).unwrap();
        store.append(Message::model("two")).unwrap();

        let raw = storage.load(HISTORY_KEY).unwrap().unwrap();
        assert_eq!(
            raw,
            r#"[{"role":"user","content":"one"},{"role":"model","content":"two"}]"#
        );
    }

    #[test]
    fn test_clear_then_load_is_empty() {
        let storage = MemoryStorage::new();
        let mut store = ConversationStore::load(Box::new(storage.clone()));
        store.append(Message::user("Hello")).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(storage.load(HISTORY_KEY).unwrap(), None);

        let reloaded = ConversationStore::load(Box::new(storage));
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_malformed_history_starts_empty_and_is_backed_up() {
        let storage = MemoryStorage::new();
        storage.save(HISTORY_KEY, r#"[{"role":"user","content":"#).unwrap();

        let store = ConversationStore::load(Box::new(storage.clone()));
        assert!(store.is_empty());
        let backup = storage.load(&format!("{}{}", HISTORY_KEY, CORRUPT_SUFFIX)).unwrap();
        assert_eq!(backup.as_deref(), Some(r#"[{"role":"user","content":"#));
    }

    #[test]
    fn test_later_malformed_history_keeps_first_backup() {
        let storage = MemoryStorage::new();
        let backup_key = format!("{}{}", HISTORY_KEY, CORRUPT_SUFFIX);

        storage.save(HISTORY_KEY, "first garbage").unwrap();
        ConversationStore::load(Box::new(storage.clone()));
        storage.save(HISTORY_KEY, "second garbage").unwrap();
        ConversationStore::load(Box::new(storage.clone()));

        assert_eq!(storage.load(&backup_key).unwrap().as_deref(), Some("first garbage"));
    }

    #[test]
    fn test_invalid_role_counts_as_malformed() {
        let storage = MemoryStorage::new();
        storage.save(HISTORY_KEY, r#"[{"role":"system","content":"x"}]"#).unwrap();
        assert!(ConversationStore::load(Box::new(storage)).is_empty());
    }

    #[test]
    fn test_storage_failures_degrade_to_empty_and_keep_memory() {
        let mut store = ConversationStore::load(Box::new(BrokenStorage));
        assert!(store.is_empty());
        assert!(store.append(Message::user("Hello")).is_err());
        assert_eq!(store.len(), 1);
    }
}
