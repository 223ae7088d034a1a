use serde::{de::DeserializeOwned, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{fs, sync::RwLock, time};
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Custom(String),
}

#[derive(Debug)]
struct DatabaseInner<T> {
    data: T,
    path: PathBuf,
}

/// A JSON file holding one `T`, kept in memory and rewritten on every
/// committed transaction.
#[derive(Clone, Debug)]
pub struct Database<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> {
    inner: Arc<RwLock<DatabaseInner<T>>>,
}

impl<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> Database<T> {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create database directory: {}", e);
                DbError::Io(e)
            })?;
        }

        let data = if path.exists() {
            match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to deserialize database {}: {}", path.display(), e);
                        T::default()
                    }
                },
                Err(e) => {
                    error!("Failed to read database {}: {}", path.display(), e);
                    T::default()
                }
            }
        } else {
            T::default()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(DatabaseInner { data, path })),
        })
    }

    async fn save(path: &Path, data: &T) -> Result<(), DbError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = path.with_extension("json.tmp");

        let write = async {
            fs::write(&tmp, bytes).await?;
            fs::rename(&tmp, path).await
        };

        match time::timeout(Duration::from_secs(5), write).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                error!("Database save operation timed out");
                Err(DbError::Custom("Save operation timed out".into()))
            }
        }
    }

    /// Applies `f` to a copy of the data. The copy is persisted and
    /// published only when `f` succeeds; transactions run one at a time.
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<DbError>,
    {
        let mut guard = self.inner.write().await;
        let mut data = guard.data.clone();
        let result = f(&mut data)?;

        Self::save(&guard.path, &data).await.map_err(E::from)?;
        debug!("Committed {}", guard.path.display());

        guard.data = data;
        Ok(result)
    }

    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.inner.read().await;
        f(&guard.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Counters {
        counts: HashMap<u64, u32>,
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Counters>::new(dir.path().join("nested/counters.json"))
            .await
            .unwrap();

        assert_eq!(db.read(|d| d.clone()).await, Counters::default());
        assert!(dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn committed_transaction_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");

        let db = Database::<Counters>::new(&path).await.unwrap();
        db.transaction(|d| {
            d.counts.insert(7, 3);
            Ok::<_, DbError>(())
        })
        .await
        .unwrap();

        let reloaded = Database::<Counters>::new(&path).await.unwrap();
        assert_eq!(reloaded.read(|d| d.counts.get(&7).copied()).await, Some(3));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_transaction_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let db = Database::<Counters>::new(&path).await.unwrap();

        let result: Result<(), DbError> = db
            .transaction(|d| {
                d.counts.insert(1, 1);
                Err(DbError::Custom("nope".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(db.read(|d| d.counts.is_empty()).await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let db = Database::<Counters>::new(&path).await.unwrap();
        assert_eq!(db.read(|d| d.clone()).await, Counters::default());
    }

    #[tokio::test]
    async fn concurrent_transactions_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Counters>::new(dir.path().join("counters.json"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.transaction(|d| {
                    *d.counts.entry(1).or_default() += 1;
                    Ok::<_, DbError>(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.read(|d| d.counts[&1]).await, 16);
    }
}
