//! Wiki records consumed by the notification layer.
//!
//! The host application owns documents and revisions; this module defines
//! the read-only view notifications need (`RevisionHistory`) and an
//! in-memory `WikiStore` implementing it.

mod store;
mod types;

pub use store::WikiStore;
pub use types::{Document, DocumentId, DocumentSpamAttempt, Revision, RevisionId, User, UserId};

/// Read-only access to documents and their revision history.
pub trait RevisionHistory: Send + Sync {
    /// Look up a document by id
    fn document(&self, id: DocumentId) -> Option<Document>;

    /// The revision directly preceding `revision` in its document's history
    fn previous_revision(&self, revision: &Revision) -> Option<Revision>;

    /// Whether `revision` started its document's history
    fn is_first_revision(&self, revision: &Revision) -> bool {
        self.previous_revision(revision).is_none()
    }

    /// Parent chain of a document, nearest first
    fn ancestors(&self, document: &Document) -> Vec<Document> {
        let mut ancestors = Vec::new();
        let mut parent_id = document.parent_id;

        while let Some(id) = parent_id {
            // Guard against cycles in malformed trees
            if id == document.id || ancestors.iter().any(|d: &Document| d.id == id) {
                break;
            }
            match self.document(id) {
                Some(parent) => {
                    parent_id = parent.parent_id;
                    ancestors.push(parent);
                }
                None => break,
            }
        }

        ancestors
    }
}
