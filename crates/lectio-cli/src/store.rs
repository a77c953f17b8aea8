//! Highlight and reflection records kept in one JSON file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lectio_core::{
    DayKey, Highlight, HighlightId, HighlightStore, NewHighlight, NewReflection, Reflection,
    ReflectionId, ReflectionStore, StoreError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    next_id: i64,
    #[serde(default)]
    next_reflection_id: i64,
    #[serde(default)]
    highlights: Vec<Highlight>,
    #[serde(default)]
    reflections: Vec<Reflection>,
}

/// File-backed store. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(StoreFile::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Backend(format!("{} is not a lectio store: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(StoreError::Transport(format!(
                "reading {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Transport(format!("creating {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_vec_pretty(file)
            .map_err(|e| StoreError::Backend(format!("serializing store: {}", e)))?;

        // Write beside the target, then swap it in.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Transport(format!("writing {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Transport(format!("replacing {}: {}", self.path.display(), e)))
    }
}

impl HighlightStore for JsonFileStore {
    async fn list(&self, day: &DayKey) -> Result<Vec<Highlight>, StoreError> {
        let file = self.load().await?;
        Ok(file
            .highlights
            .into_iter()
            .filter(|h| &h.day_key == day)
            .collect())
    }

    async fn create(&self, highlight: NewHighlight) -> Result<Highlight, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        // Older files may lack the counter.
        let max = file.highlights.iter().map(|h| h.id.0).max().unwrap_or(0);
        file.next_id = file.next_id.max(max) + 1;
        let record = highlight.into_highlight(HighlightId(file.next_id));
        file.highlights.push(record.clone());
        self.save(&file).await?;
        tracing::debug!(target: "lectio::store", id = %record.id, day = %record.day_key, "highlight created");
        Ok(record)
    }

    async fn delete(&self, id: HighlightId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let before = file.highlights.len();
        file.highlights.retain(|h| h.id != id);
        if file.highlights.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.save(&file).await?;
        tracing::debug!(target: "lectio::store", %id, "highlight deleted");
        Ok(())
    }
}

impl ReflectionStore for JsonFileStore {
    async fn list_reflections(&self, day: &DayKey) -> Result<Vec<Reflection>, StoreError> {
        let file = self.load().await?;
        Ok(file
            .reflections
            .into_iter()
            .filter(|r| &r.day_key == day)
            .collect())
    }

    async fn create_reflection(&self, reflection: NewReflection) -> Result<Reflection, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let max = file.reflections.iter().map(|r| r.id.0).max().unwrap_or(0);
        file.next_reflection_id = file.next_reflection_id.max(max) + 1;
        let record = reflection
            .into_reflection(ReflectionId(file.next_reflection_id), Utc::now());
        file.reflections.push(record.clone());
        self.save(&file).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_core::HighlightColor;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lectio-cli-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("store.json")
    }

    fn day() -> DayKey {
        DayKey::new("11-12").unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_lists_nothing() {
        let store = JsonFileStore::new(scratch("missing"));
        assert!(store.list(&day()).await.unwrap().is_empty());
        assert!(store.list_reflections(&day()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_persists_in_creation_order() {
        let path = scratch("create");
        let store = JsonFileStore::new(&path);
        for text in ["the Word", "beginning was the Word"] {
            let new = NewHighlight::new(day(), HighlightColor::Green, text).unwrap();
            store.create(new).await.unwrap();
        }

        let reopened = JsonFileStore::new(&path);
        let listed = reopened.list(&day()).await.unwrap();
        assert_eq!(
            listed.iter().map(|h| h.id).collect::<Vec<_>>(),
            vec![HighlightId(1), HighlightId(2)]
        );
        assert_eq!(listed[1].selected_text, "beginning was the Word");

        let other = DayKey::new("11-13").unwrap();
        assert!(reopened.list(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = JsonFileStore::new(scratch("delete"));
        let new = NewHighlight::new(day(), HighlightColor::Pink, "light shines").unwrap();
        let created = store.create(new).await.unwrap();

        store.delete(created.id).await.unwrap();
        assert!(store.list(&day()).await.unwrap().is_empty());
        assert_eq!(
            store.delete(created.id).await,
            Err(StoreError::NotFound(created.id))
        );
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = JsonFileStore::new(scratch("ids"));
        let first = store
            .create(NewHighlight::new(day(), HighlightColor::Blue, "grace").unwrap())
            .await
            .unwrap();
        store.delete(first.id).await.unwrap();
        let second = store
            .create(NewHighlight::new(day(), HighlightColor::Blue, "truth").unwrap())
            .await
            .unwrap();
        assert_eq!(second.id, HighlightId(2));
    }

    #[tokio::test]
    async fn test_reflections_round_trip() {
        let path = scratch("reflect");
        let store = JsonFileStore::new(&path);
        let new = NewReflection::new(day(), "Light is not overcome.").unwrap();
        let created = store.create_reflection(new).await.unwrap();
        assert_eq!(created.id, ReflectionId(1));

        let listed = JsonFileStore::new(&path).list_reflections(&day()).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_backend_error() {
        let path = scratch("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        let err = JsonFileStore::new(&path).list(&day()).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
