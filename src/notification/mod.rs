//! Wiki edit notifications: context building, event firing and email
//! formatting.
//!
//! # Architecture
//!
//! - `context`: template variables for a revision (tracked links, diff)
//! - `events`: document and tree edit events, fired together through `EventUnion`
//! - `emails`: edit, first-edit and spam-attempt message formatting
//! - `watch`: watch registry backends (`MemoryWatchBackend` by default)
//! - `sender`: mail queue abstraction (`OutboxSender` for previews and tests)
//!
//! Events fire through a `NotificationDispatcher`, which owns the watch
//! backend and sender and hands each fired union to the sender as one batch.

mod context;
pub mod diff;
mod dispatcher;
mod emails;
mod events;
mod sender;
pub mod urls;
mod watch;

pub use context::{notification_context, NotificationContext, DIFF_UNAVAILABLE};
pub use dispatcher::{DeliveryResult, DispatcherStatsSnapshot, NotificationDispatcher};
pub use emails::{
    emails_with_users_and_watches, first_edit_email, spam_attempt_email, spam_attempt_subject,
    EmailMessage, EmailRequest, Recipient, DOCUMENT_URL_HEADER, EDITOR_USERNAME_HEADER,
};
pub use events::{
    EditDocumentEvent, EditDocumentInTreeEvent, Event, EventUnion, EDIT_DOCUMENT,
    EDIT_DOCUMENT_IN_TREE,
};
pub use sender::{MailError, MailSender, OutboxSender};
pub use watch::{MemoryWatchBackend, Watch, WatchBackend, WatchError};
