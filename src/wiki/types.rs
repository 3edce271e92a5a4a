use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type DocumentId = u64;
pub type RevisionId = u64;

/// A wiki account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Preferred locale for outgoing mail (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            locale: None,
        }
    }

    /// Public profile path
    pub fn profile_path(&self) -> String {
        format!("/profiles/{}", self.username)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// A wiki page in a given locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub locale: String,
    pub slug: String,
    pub title: String,
    /// Parent in the document tree; root documents have none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_revision_id: Option<RevisionId>,
}

impl Document {
    /// Site-relative path, e.g. `/en-US/docs/Root`
    pub fn path(&self) -> String {
        format!("/{}/docs/{}", self.locale, self.slug)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path(), self.title)
    }
}

/// A historical version of a document's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub document_id: DocumentId,
    pub creator: User,
    pub content: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created: NaiveDateTime,
}

/// A rejected edit attempt. Any field besides the user and slug may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpamAttempt {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    pub created: NaiveDateTime,
}
