use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::fs::operations::{read_document, write_document};

/// Loads a JSON document, falling back to its default when it was never written.
pub async fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match read_document(path).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {path:?}")),
        None => Ok(T::default()),
    }
}

pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_document(path, &bytes).await
}
