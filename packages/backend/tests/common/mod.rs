use backend::{AnyStore, BackendConfig, MemoryStore, StoreError};

pub fn memory_store() -> MemoryStore {
    MemoryStore::new("test")
}

pub async fn configured_store() -> Result<AnyStore, StoreError> {
    backend::connect(&BackendConfig::memory().with_namespace("test")).await
}
