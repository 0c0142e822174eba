use crate::errors::CoreError;

use super::format;
use super::memory::{InMemoryStore, StoreState};

/// Save/load an [`InMemoryStore`] to/from portable snapshot bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Flow: StoreState → bincode → PFTK format bytes
    pub fn save_to_bytes(store: &InMemoryStore) -> Result<Vec<u8>, CoreError> {
        let state = store.snapshot()?;
        let payload = bincode::serialize(&state)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize store: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Flow: PFTK bytes → parse header → bincode → StoreState
    pub fn load_from_bytes(data: &[u8]) -> Result<InMemoryStore, CoreError> {
        let (_header, payload) = format::read_file(data)?;
        let state: StoreState = bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize store: {e}")))?;
        Ok(InMemoryStore::from_state(state))
    }

    pub fn save_to_file(store: &InMemoryStore, path: &str) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(store)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<InMemoryStore, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}
