use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::fs::operations::read_document;

#[derive(Debug, Default, Deserialize)]
struct Secrets {
    password: Option<String>,
}

/// Single shared password kept in `secrets.toml`.
pub struct PasswordGate {
    secret: Option<String>,
}

impl PasswordGate {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let secrets = match read_document(path).await? {
            Some(bytes) => toml::from_str::<Secrets>(&String::from_utf8(bytes)?)
                .with_context(|| format!("Failed to parse {path:?}"))?,
            None => Secrets::default(),
        };
        if secrets.password.is_none() {
            warn!("No password configured in {path:?}, the tracker is unprotected");
        }
        Ok(Self::new(secrets.password))
    }

    pub fn verify(&self, candidate: Option<&str>) -> bool {
        match (&self.secret, candidate) {
            (None, _) => true,
            (Some(secret), Some(candidate)) => secret == candidate,
            (Some(_), None) => false,
        }
    }
}
