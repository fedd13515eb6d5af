//! File-backed checkpoints stored in the relayer's working directory.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use async_trait::async_trait;
use primitive_types::U256;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, trace};

use crate::{
    checkpoint::CheckpointDb,
    constants::{BLOCK_INDEX_FILE_EXTENSION, BROADCAST_NONCE_FILE_NAME, CHECKPOINT_FILE_MODE},
    errors::{DbError, DbResult},
};

/// [`CheckpointDb`] keeping one decimal file per value under a directory.
///
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct FileCheckpointDb {
    dir: PathBuf,
}

impl FileCheckpointDb {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory the files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the block index file of `chain`.
    pub fn block_index_path(&self, chain: &str) -> DbResult<PathBuf> {
        let valid = !chain.is_empty()
            && chain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DbError::InvalidChainName(chain.to_string()));
        }

        Ok(self
            .dir
            .join(format!(".{chain}.{BLOCK_INDEX_FILE_EXTENSION}")))
    }

    fn nonce_path(&self) -> PathBuf {
        self.dir.join(BROADCAST_NONCE_FILE_NAME)
    }
}

async fn read_decimal(path: &Path) -> DbResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_decimal(dir: &Path, path: &Path, value: String) -> DbResult<()> {
    fs::create_dir_all(dir).await?;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(CHECKPOINT_FILE_MODE)
        .open(path)
        .await?;
    file.write_all(value.as_bytes()).await?;
    file.sync_all().await?;

    Ok(())
}

#[async_trait]
impl CheckpointDb for FileCheckpointDb {
    async fn load_block_index(&self, chain: &str) -> DbResult<U256> {
        let path = self.block_index_path(chain)?;
        let Some(content) = read_decimal(&path).await? else {
            debug!(path = %path.display(), "no block index stored, starting from zero");
            return Ok(U256::zero());
        };

        U256::from_dec_str(&content)
            .map_err(|e| DbError::InvalidData(format!("{}: {e:?}", path.display())))
    }

    async fn store_block_index(&self, chain: &str, index: U256) -> DbResult<()> {
        let path = self.block_index_path(chain)?;
        trace!(path = %path.display(), %index, "storing block index");

        write_decimal(&self.dir, &path, index.to_string()).await
    }

    async fn load_broadcast_nonce(&self) -> DbResult<Option<u64>> {
        let path = self.nonce_path();
        let Some(content) = read_decimal(&path).await? else {
            return Ok(None);
        };

        u64::from_str(&content)
            .map(Some)
            .map_err(|e| DbError::InvalidData(format!("{}: {e}", path.display())))
    }

    async fn store_broadcast_nonce(&self, nonce: u64) -> DbResult<()> {
        write_decimal(&self.dir, &self.nonce_path(), nonce.to_string()).await
    }
}
