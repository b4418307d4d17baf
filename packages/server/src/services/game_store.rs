//! In-process game storage with optimistic concurrency.
//!
//! Readers take a snapshot, compute outside the lock and `commit` the result;
//! a commit whose snapshot version is stale fails with `ConcurrencyConflict`.
//! Short read-modify-write units go through `update`, which holds the lock for
//! the whole closure and discards the change if the closure fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use werewolf_rules::GameError;

use crate::models::game::{GameId, GameRecord};

#[derive(Clone, Default)]
pub struct GameStore {
    games: Arc<Mutex<HashMap<GameId, GameRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id and stores the record built for it.
    pub async fn create<F>(&self, build: F) -> GameId
    where
        F: FnOnce(GameId) -> GameRecord,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = build(id);
        self.games.lock().await.insert(id, record);
        id
    }

    pub async fn remove(&self, id: GameId) -> Option<GameRecord> {
        self.games.lock().await.remove(&id)
    }

    pub async fn snapshot(&self, id: GameId) -> Result<GameRecord, GameError> {
        self.games
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("game {}", id)))
    }

    /// Stores `record` if nobody committed since it was snapshotted.
    pub async fn commit(&self, mut record: GameRecord) -> Result<u64, GameError> {
        let mut games = self.games.lock().await;
        let stored = games
            .get_mut(&record.id)
            .ok_or_else(|| GameError::NotFound(format!("game {}", record.id)))?;
        if stored.version != record.version {
            return Err(GameError::ConcurrencyConflict(format!(
                "game {} moved from version {} to {}",
                record.id, record.version, stored.version
            )));
        }
        record.version += 1;
        let version = record.version;
        *stored = record;
        Ok(version)
    }

    /// Atomic read-modify-write. Nothing is stored when `f` fails.
    pub async fn update<T, F>(&self, id: GameId, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut GameRecord) -> Result<T, GameError>,
    {
        let mut games = self.games.lock().await;
        let stored = games
            .get_mut(&id)
            .ok_or_else(|| GameError::NotFound(format!("game {}", id)))?;
        let mut draft = stored.clone();
        let out = f(&mut draft)?;
        draft.version = stored.version + 1;
        *stored = draft;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_commit_is_rejected() {
        let store = GameStore::new();
        let id = store.create(|id| GameRecord::new(id, "r".to_string())).await;

        let first = store.snapshot(id).await.unwrap();
        let second = store.snapshot(id).await.unwrap();
        assert_eq!(store.commit(first).await.unwrap(), 1);
        assert!(matches!(
            store.commit(second).await,
            Err(GameError::ConcurrencyConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_record_untouched() {
        let store = GameStore::new();
        let id = store.create(|id| GameRecord::new(id, "r".to_string())).await;

        let result: Result<(), _> = store
            .update(id, |game| {
                game.finished = true;
                Err(GameError::State("nope".to_string()))
            })
            .await;
        assert!(result.is_err());
        let game = store.snapshot(id).await.unwrap();
        assert!(!game.finished);
        assert_eq!(game.version, 0);
    }

    #[tokio::test]
    async fn test_missing_game() {
        let store = GameStore::new();
        assert!(matches!(store.snapshot(9).await, Err(GameError::NotFound(_))));
    }
}
