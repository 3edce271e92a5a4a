//! Watch registry backends.
//!
//! A watch records that a user wants to hear about one kind of event on one
//! object. The backend trait lets the host plug in its own storage; the
//! in-memory implementation keeps watches in a `DashMap`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::wiki::{DocumentId, User, UserId};

/// Errors that can occur during watch backend operations.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Backend is temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A user's subscription to an event type on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    pub id: Uuid,
    pub event_type: String,
    pub object_id: DocumentId,
    pub user: User,
    /// Token authorizing one-click unsubscribe
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

impl Watch {
    pub fn new(event_type: impl Into<String>, object_id: DocumentId, user: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            object_id,
            user,
            secret: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Site-relative unsubscribe link for this watch
    pub fn unsubscribe_path(&self, locale: &str) -> String {
        format!("/{}/unsubscribe/{}?s={}", locale, self.id, self.secret)
    }
}

/// Storage abstraction for watches.
#[async_trait]
pub trait WatchBackend: Send + Sync {
    /// Register a watch, returning the existing one if the user already watches
    async fn add(
        &self,
        event_type: &str,
        object_id: DocumentId,
        user: &User,
    ) -> Result<Watch, WatchError>;

    /// Remove a user's watch. Returns whether a watch was removed.
    async fn remove(
        &self,
        event_type: &str,
        object_id: DocumentId,
        user_id: UserId,
    ) -> Result<bool, WatchError>;

    /// Whether the user watches the event on the object
    async fn exists(
        &self,
        event_type: &str,
        object_id: DocumentId,
        user_id: UserId,
    ) -> Result<bool, WatchError>;

    /// All watches of an event type on any of the given objects
    async fn watches_for(
        &self,
        event_type: &str,
        object_ids: &[DocumentId],
    ) -> Result<Vec<Watch>, WatchError>;
}

/// In-memory watch backend.
///
/// Watches are grouped per (event type, object) key.
#[derive(Default)]
pub struct MemoryWatchBackend {
    watches: DashMap<(String, DocumentId), Vec<Watch>>,
}

impl MemoryWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of registered watches
    pub fn len(&self) -> usize {
        self.watches.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WatchBackend for MemoryWatchBackend {
    async fn add(
        &self,
        event_type: &str,
        object_id: DocumentId,
        user: &User,
    ) -> Result<Watch, WatchError> {
        let mut watches = self
            .watches
            .entry((event_type.to_string(), object_id))
            .or_default();

        if let Some(existing) = watches.iter().find(|w| w.user.id == user.id) {
            return Ok(existing.clone());
        }

        let watch = Watch::new(event_type, object_id, user.clone());
        watches.push(watch.clone());

        tracing::debug!(
            event_type = %event_type,
            object_id = object_id,
            user = %user.username,
            watch_id = %watch.id,
            "Watch registered"
        );

        Ok(watch)
    }

    async fn remove(
        &self,
        event_type: &str,
        object_id: DocumentId,
        user_id: UserId,
    ) -> Result<bool, WatchError> {
        let key = (event_type.to_string(), object_id);
        let removed = match self.watches.get_mut(&key) {
            Some(mut watches) => {
                let before = watches.len();
                watches.retain(|w| w.user.id != user_id);
                before != watches.len()
            }
            None => false,
        };
        self.watches.remove_if(&key, |_, watches| watches.is_empty());
        Ok(removed)
    }

    async fn exists(
        &self,
        event_type: &str,
        object_id: DocumentId,
        user_id: UserId,
    ) -> Result<bool, WatchError> {
        Ok(self
            .watches
            .get(&(event_type.to_string(), object_id))
            .map(|watches| watches.iter().any(|w| w.user.id == user_id))
            .unwrap_or(false))
    }

    async fn watches_for(
        &self,
        event_type: &str,
        object_ids: &[DocumentId],
    ) -> Result<Vec<Watch>, WatchError> {
        let mut found = Vec::new();
        for object_id in object_ids {
            if let Some(watches) = self.watches.get(&(event_type.to_string(), *object_id)) {
                found.extend(watches.iter().cloned());
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, name: &str) -> User {
        User::new(id, name, format!("{}@example.com", name))
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let backend = MemoryWatchBackend::new();
        let alice = user(1, "alice");

        let first = backend.add("edit", 10, &alice).await.unwrap();
        let second = backend.add("edit", 10, &alice).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_exists() {
        let backend = MemoryWatchBackend::new();
        let alice = user(1, "alice");
        let bob = user(2, "bob");

        backend.add("edit", 10, &alice).await.unwrap();
        backend.add("edit", 10, &bob).await.unwrap();
        assert!(backend.exists("edit", 10, 1).await.unwrap());

        assert!(backend.remove("edit", 10, 1).await.unwrap());
        assert!(!backend.remove("edit", 10, 1).await.unwrap());
        assert!(!backend.exists("edit", 10, 1).await.unwrap());
        assert!(backend.exists("edit", 10, 2).await.unwrap());

        assert!(backend.remove("edit", 10, 2).await.unwrap());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_watches_for_multiple_objects() {
        let backend = MemoryWatchBackend::new();
        backend.add("tree", 1, &user(1, "alice")).await.unwrap();
        backend.add("tree", 2, &user(2, "bob")).await.unwrap();
        backend.add("edit", 2, &user(3, "carol")).await.unwrap();

        let found = backend.watches_for("tree", &[1, 2, 3]).await.unwrap();
        let mut names: Vec<_> = found.iter().map(|w| w.user.username.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_unsubscribe_path() {
        let watch = Watch::new("edit", 1, user(1, "alice"));
        let path = watch.unsubscribe_path("en-US");
        assert!(path.starts_with(&format!("/en-US/unsubscribe/{}?s=", watch.id)));
        assert_eq!(watch.secret.len(), 32);
    }
}
