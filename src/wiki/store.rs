use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use dashmap::DashMap;

use super::{Document, DocumentId, Revision, RevisionHistory, RevisionId, User, UserId};

/// In-memory documents and revisions.
///
/// Stands in for the host's persistent models so events and emails can be
/// built and previewed without a database.
pub struct WikiStore {
    documents: DashMap<DocumentId, Document>,
    revisions: DashMap<RevisionId, Revision>,
    next_document_id: AtomicU64,
    next_revision_id: AtomicU64,
}

impl Default for WikiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WikiStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            revisions: DashMap::new(),
            next_document_id: AtomicU64::new(1),
            next_revision_id: AtomicU64::new(1),
        }
    }

    /// Create a document without any revisions
    pub fn create_document(
        &self,
        locale: impl Into<String>,
        slug: impl Into<String>,
        title: impl Into<String>,
        parent_id: Option<DocumentId>,
    ) -> Document {
        let document = Document {
            id: self.next_document_id.fetch_add(1, Ordering::Relaxed),
            locale: locale.into(),
            slug: slug.into(),
            title: title.into(),
            parent_id,
            current_revision_id: None,
        };
        self.documents.insert(document.id, document.clone());
        document
    }

    /// Add a revision and make it the document's current revision
    pub fn create_revision(
        &self,
        document_id: DocumentId,
        creator: &User,
        content: impl Into<String>,
        comment: Option<&str>,
        created: NaiveDateTime,
    ) -> Option<Revision> {
        let mut document = self.documents.get_mut(&document_id)?;

        let revision = Revision {
            id: self.next_revision_id.fetch_add(1, Ordering::Relaxed),
            document_id,
            creator: creator.clone(),
            content: content.into(),
            title: document.title.clone(),
            comment: comment.map(str::to_string),
            created,
        };
        document.current_revision_id = Some(revision.id);
        self.revisions.insert(revision.id, revision.clone());

        tracing::debug!(
            document_id = document_id,
            revision_id = revision.id,
            creator = %creator.username,
            "Revision created"
        );

        Some(revision)
    }

    /// All revisions of a document, oldest first
    pub fn revisions_of(&self, document_id: DocumentId) -> Vec<Revision> {
        let mut revisions: Vec<Revision> = self
            .revisions
            .iter()
            .filter(|entry| entry.document_id == document_id)
            .map(|entry| entry.value().clone())
            .collect();
        revisions.sort_by_key(|r| (r.created, r.id));
        revisions
    }

    /// Number of revisions a user has authored across all documents
    pub fn revision_count_by(&self, user_id: UserId) -> usize {
        self.revisions
            .iter()
            .filter(|entry| entry.creator.id == user_id)
            .count()
    }
}

impl RevisionHistory for WikiStore {
    fn document(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(&id).map(|d| d.clone())
    }

    fn previous_revision(&self, revision: &Revision) -> Option<Revision> {
        self.revisions_of(revision.document_id)
            .into_iter()
            .filter(|r| (r.created, r.id) < (revision.created, revision.id))
            .last()
    }
}
