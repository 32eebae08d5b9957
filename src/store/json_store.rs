use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use super::entities::Document;

/// Repository seam over the persisted document. The tracker only ever loads
/// the whole document, mutates it in memory and saves it back, so the
/// interface stays this small.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<Document>;

    async fn save(&self, doc: &Document) -> Result<()>;
}

/// The main realization of [StateStore]: one JSON file, rewritten in full on
/// every save. Advisory locks guard the file against a second daylog process;
/// last write wins.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            path: dir.join("state.json"),
        })
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<Document> {
        let mut file = match File::open(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state document at {:?}, starting from defaults", self.path);
                return Ok(Document::default());
            }
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read?;

        Ok(serde_json::from_str(&contents)?)
    }

    async fn save(&self, doc: &Document) -> Result<()> {
        let buffer = serde_json::to_vec_pretty(doc)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;

        file.lock_exclusive()?;
        let written = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        written?;

        Ok(())
    }
}
