//! Document edit events and the union that fires them together.
//!
//! An edit is interesting to two groups of watchers: those following the
//! document itself and those following the document's tree (the document or
//! any of its ancestors). `EventUnion` gathers both groups, merges them per
//! user, and sends one batch so nobody gets the same edit twice.

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::config::Settings;
use crate::error::{NotifyError, Result};
use crate::template::EDITED_TEMPLATE;
use crate::wiki::{Document, DocumentId, Revision, RevisionHistory, User, UserId};

use super::context::{notification_context, NotificationContext};
use super::emails::{emails_with_users_and_watches, EmailMessage, EmailRequest, Recipient};
use super::watch::{Watch, WatchBackend};
use super::{DeliveryResult, NotificationDispatcher};

/// Watch event type for edits to a single document
pub const EDIT_DOCUMENT: &str = "wiki edit document";

/// Watch event type for edits anywhere in a document's tree
pub const EDIT_DOCUMENT_IN_TREE: &str = "wiki edit document in tree";

/// Something that can collect interested users and format their mail.
#[async_trait]
pub trait Event: Send + Sync {
    fn event_type(&self) -> &'static str;

    /// Users watching this event, each with the watches that matched
    async fn users_and_watches(&self, watches: &dyn WatchBackend) -> Result<Vec<Recipient>>;

    /// Format one message per recipient
    fn mails(&self, users_and_watches: Vec<Recipient>, settings: &Settings)
        -> Result<Vec<EmailMessage>>;
}

/// Group watches by user, keeping first-seen order
fn recipients_from(watches: Vec<Watch>) -> Vec<Recipient> {
    let mut recipients: Vec<Recipient> = Vec::new();
    for watch in watches {
        match recipients.iter_mut().find(|r| r.user.id == watch.user.id) {
            Some(recipient) => recipient.watches.push(watch),
            None => recipients.push(Recipient {
                user: watch.user.clone(),
                watches: vec![watch],
            }),
        }
    }
    recipients
}

// ---------------------------------------------------------------------------
// EditDocumentEvent
// ---------------------------------------------------------------------------

/// A revision was saved to a document.
#[derive(Debug, Clone)]
pub struct EditDocumentEvent {
    revision: Revision,
    document: Document,
    ancestors: Vec<Document>,
    context: NotificationContext,
}

impl EditDocumentEvent {
    /// Build the event, resolving the document, its ancestors and the
    /// notification context up front.
    pub fn new(
        revision: Revision,
        history: &dyn RevisionHistory,
        settings: &Settings,
    ) -> Result<Self> {
        let context = notification_context(&revision, history, settings)?;
        let document = history
            .document(revision.document_id)
            .ok_or_else(|| NotifyError::NotFound(format!("document {}", revision.document_id)))?;
        let ancestors = history.ancestors(&document);

        Ok(Self {
            revision,
            document,
            ancestors,
            context,
        })
    }

    /// Start watching edits to `document`
    pub async fn notify(
        watches: &dyn WatchBackend,
        user: &User,
        document: &Document,
    ) -> Result<Watch> {
        Ok(watches.add(EDIT_DOCUMENT, document.id, user).await?)
    }

    pub async fn stop_notifying(
        watches: &dyn WatchBackend,
        user: &User,
        document: &Document,
    ) -> Result<bool> {
        Ok(watches.remove(EDIT_DOCUMENT, document.id, user.id).await?)
    }

    pub async fn is_notifying(
        watches: &dyn WatchBackend,
        user: &User,
        document: &Document,
    ) -> Result<bool> {
        Ok(watches.exists(EDIT_DOCUMENT, document.id, user.id).await?)
    }

    /// The companion event for tree watchers
    pub fn in_tree(&self) -> EditDocumentInTreeEvent {
        EditDocumentInTreeEvent {
            inner: self.clone(),
        }
    }

    /// Parameters for the per-recipient edit emails
    pub fn mail_request(&self, users_and_watches: Vec<Recipient>, settings: &Settings) -> EmailRequest {
        EmailRequest {
            subject: format!(
                "{} Page \"%(document_title)s\" changed by %(creator)s",
                settings.email.subject_prefix
            ),
            text_template: EDITED_TEMPLATE.to_string(),
            html_template: None,
            context_vars: self.context.clone(),
            users_and_watches,
            default_locale: self.document.locale.clone(),
        }
    }

    /// Notify document and tree watchers in a single delivery.
    ///
    /// Users in `exclude` (usually the revision's creator) are skipped.
    pub async fn fire(
        &self,
        dispatcher: &NotificationDispatcher,
        exclude: &[UserId],
    ) -> Result<DeliveryResult> {
        tracing::debug!(
            revision_id = self.revision.id,
            document = %self.document.path(),
            ancestors = self.ancestors.len(),
            "Firing edit events"
        );

        let events: Vec<Box<dyn Event>> = vec![Box::new(self.clone()), Box::new(self.in_tree())];
        EventUnion::new(events).fire(dispatcher, exclude).await
    }
}

#[async_trait]
impl Event for EditDocumentEvent {
    fn event_type(&self) -> &'static str {
        EDIT_DOCUMENT
    }

    async fn users_and_watches(&self, watches: &dyn WatchBackend) -> Result<Vec<Recipient>> {
        let found = watches
            .watches_for(EDIT_DOCUMENT, &[self.document.id])
            .await?;
        Ok(recipients_from(found))
    }

    fn mails(
        &self,
        users_and_watches: Vec<Recipient>,
        settings: &Settings,
    ) -> Result<Vec<EmailMessage>> {
        emails_with_users_and_watches(&self.mail_request(users_and_watches, settings), settings)
    }
}

// ---------------------------------------------------------------------------
// EditDocumentInTreeEvent
// ---------------------------------------------------------------------------

/// A revision was saved to a document within a watched tree.
#[derive(Debug, Clone)]
pub struct EditDocumentInTreeEvent {
    inner: EditDocumentEvent,
}

impl EditDocumentInTreeEvent {
    /// Start watching edits to `document` and all of its descendants
    pub async fn notify(
        watches: &dyn WatchBackend,
        user: &User,
        document: &Document,
    ) -> Result<Watch> {
        Ok(watches.add(EDIT_DOCUMENT_IN_TREE, document.id, user).await?)
    }

    pub async fn stop_notifying(
        watches: &dyn WatchBackend,
        user: &User,
        document: &Document,
    ) -> Result<bool> {
        Ok(watches
            .remove(EDIT_DOCUMENT_IN_TREE, document.id, user.id)
            .await?)
    }

    pub async fn is_notifying(
        watches: &dyn WatchBackend,
        user: &User,
        document: &Document,
    ) -> Result<bool> {
        Ok(watches
            .exists(EDIT_DOCUMENT_IN_TREE, document.id, user.id)
            .await?)
    }

    /// The edited document followed by its ancestors
    fn tree_ids(&self) -> Vec<DocumentId> {
        std::iter::once(self.inner.document.id)
            .chain(self.inner.ancestors.iter().map(|d| d.id))
            .collect()
    }
}

#[async_trait]
impl Event for EditDocumentInTreeEvent {
    fn event_type(&self) -> &'static str {
        EDIT_DOCUMENT_IN_TREE
    }

    async fn users_and_watches(&self, watches: &dyn WatchBackend) -> Result<Vec<Recipient>> {
        let found = watches
            .watches_for(EDIT_DOCUMENT_IN_TREE, &self.tree_ids())
            .await?;
        Ok(recipients_from(found))
    }

    fn mails(
        &self,
        users_and_watches: Vec<Recipient>,
        settings: &Settings,
    ) -> Result<Vec<EmailMessage>> {
        self.inner.mails(users_and_watches, settings)
    }
}

// ---------------------------------------------------------------------------
// EventUnion
// ---------------------------------------------------------------------------

/// Fires several events as one, delivering at most once per user.
///
/// Mail is formatted by the first event in the union.
pub struct EventUnion {
    events: Vec<Box<dyn Event>>,
}

impl EventUnion {
    pub fn new(events: Vec<Box<dyn Event>>) -> Self {
        Self { events }
    }

    /// Collect recipients from every event, merged per user
    pub async fn users_and_watches(
        &self,
        watches: &dyn WatchBackend,
        exclude: &[UserId],
    ) -> Result<Vec<Recipient>> {
        let gathered =
            try_join_all(self.events.iter().map(|event| event.users_and_watches(watches))).await?;

        let mut merged: Vec<Recipient> = Vec::new();
        for recipient in gathered.into_iter().flatten() {
            if exclude.contains(&recipient.user.id) {
                continue;
            }
            match merged.iter_mut().find(|m| m.user.id == recipient.user.id) {
                Some(existing) => existing.watches.extend(recipient.watches),
                None => merged.push(recipient),
            }
        }
        Ok(merged)
    }

    #[tracing::instrument(
        name = "events.union_fire",
        skip(self, dispatcher, exclude),
        fields(events = self.events.len())
    )]
    pub async fn fire(
        &self,
        dispatcher: &NotificationDispatcher,
        exclude: &[UserId],
    ) -> Result<DeliveryResult> {
        let Some(primary) = self.events.first() else {
            return dispatcher.deliver(Vec::new()).await;
        };

        let recipients = self.users_and_watches(dispatcher.watches(), exclude).await?;
        tracing::debug!(
            event_type = primary.event_type(),
            recipients = recipients.len(),
            "Collected watchers for event union"
        );

        let messages = primary.mails(recipients, dispatcher.settings())?;
        dispatcher.deliver(messages).await
    }
}
