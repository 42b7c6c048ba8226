// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted on-disk archive for inbound images.

use std::path::{Path, PathBuf};

use ticketline_config::model::MediaConfig;
use ticketline_core::TicketlineError;
use tracing::{debug, warn};

use crate::crypto::{self, MediaKey};

/// Writes encrypted media blobs under a single directory.
#[derive(Debug)]
pub struct MediaVault {
    key: MediaKey,
    dir: PathBuf,
}

impl MediaVault {
    pub fn new(key: MediaKey, dir: impl Into<PathBuf>) -> Self {
        Self {
            key,
            dir: dir.into(),
        }
    }

    /// Build a vault from config.
    ///
    /// Returns `None` when image download is disabled, or when it is enabled
    /// without an encryption key (logged as a warning).
    pub fn from_config(config: &MediaConfig) -> Option<Self> {
        if !config.enable_image_download {
            debug!("image download disabled by configuration");
            return None;
        }
        match config.encryption_key.as_deref() {
            Some(passphrase) if !passphrase.trim().is_empty() => Some(Self::new(
                MediaKey::from_passphrase(passphrase),
                &config.storage_path,
            )),
            _ => {
                warn!(
                    "media.enable_image_download is set but media.encryption_key is missing; \
                     images will not be archived"
                );
                None
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encrypt `data` and write it to `{dir}/{sanitized conversation}-{timestamp}.enc`.
    pub async fn archive(
        &self,
        conversation_id: &str,
        timestamp: i64,
        data: &[u8],
    ) -> Result<PathBuf, TicketlineError> {
        let blob = crypto::seal(&self.key, data)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TicketlineError::Vault(format!("cannot create {}: {e}", self.dir.display())))?;

        let path = self
            .dir
            .join(format!("{}-{timestamp}.enc", sanitize_conversation_id(conversation_id)));
        tokio::fs::write(&path, &blob)
            .await
            .map_err(|e| TicketlineError::Vault(format!("cannot write {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = data.len(), "encrypted media written");
        Ok(path)
    }

    /// Read and decrypt a previously archived file.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, TicketlineError> {
        let blob = tokio::fs::read(path)
            .await
            .map_err(|e| TicketlineError::Vault(format!("cannot read {}: {e}", path.display())))?;
        crypto::open(&self.key, &blob)
    }
}

/// Replace the characters of a conversation id that are unsafe in file names.
pub fn sanitize_conversation_id(conversation_id: &str) -> String {
    conversation_id
        .chars()
        .map(|c| match c {
            '@' | ':' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}
