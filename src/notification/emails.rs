//! Outbound email formatting.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Settings;
use crate::error::{NotifyError, Result};
use crate::template::{self, EDITED_TEMPLATE, SPAM_TEMPLATE};
use crate::wiki::{DocumentSpamAttempt, Revision, RevisionHistory, User};

use super::context::{notification_context, NotificationContext};
use super::watch::Watch;

/// Header carrying the absolute URL of the edited document
pub const DOCUMENT_URL_HEADER: &str = "X-Kuma-Document-Url";

/// Header carrying the editor's username, for mail filters
pub const EDITOR_USERNAME_HEADER: &str = "X-Kuma-Editor-Username";

/// A formatted message ready to hand to the mail queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub from_email: String,
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// A user and the watches that made them a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user: User,
    pub watches: Vec<Watch>,
}

/// Parameters for a per-recipient batch of templated emails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRequest {
    /// Subject with `%(name)s` placeholders filled from `context_vars`
    pub subject: String,
    pub text_template: String,
    pub html_template: Option<String>,
    pub context_vars: NotificationContext,
    pub users_and_watches: Vec<Recipient>,
    pub default_locale: String,
}

/// Render one message per recipient of an email request.
///
/// Each body ends with an unsubscribe link for the recipient's first watch.
pub fn emails_with_users_and_watches(
    request: &EmailRequest,
    settings: &Settings,
) -> Result<Vec<EmailMessage>> {
    let vars = request.context_vars.to_vars();
    let subject = template::interpolate(&request.subject, &vars);
    let body = template::render(&request.text_template, &vars)?;

    let messages = request
        .users_and_watches
        .iter()
        .map(|recipient| {
            let locale = recipient
                .user
                .locale
                .clone()
                .unwrap_or_else(|| request.default_locale.clone());

            let mut body = body.clone();
            if let Some(watch) = recipient.watches.first() {
                body.push_str(&format!(
                    "\nUnsubscribe from these emails:\n{}\n",
                    settings.absolutify(&watch.unsubscribe_path(&locale))
                ));
            }

            EmailMessage {
                subject: subject.clone(),
                body,
                from_email: settings.email.default_from.clone(),
                to: vec![recipient.user.email.clone()],
                extra_headers: BTreeMap::new(),
                locale: Some(locale),
            }
        })
        .collect();

    Ok(messages)
}

/// Alert for a user's first edit, sent to the spam-watch list.
pub fn first_edit_email(
    revision: &Revision,
    history: &dyn RevisionHistory,
    settings: &Settings,
) -> Result<EmailMessage> {
    let context = notification_context(revision, history, settings)?;
    let document = history
        .document(revision.document_id)
        .ok_or_else(|| NotifyError::NotFound(format!("document {}", revision.document_id)))?;
    let user = &revision.creator;

    let subject = format!(
        "{} [{}] {} made their first edit, to: {}",
        settings.email.subject_prefix, document.locale, user.username, document.title
    );
    let body = template::render(EDITED_TEMPLATE, &context.to_vars())?;

    let mut extra_headers = BTreeMap::new();
    extra_headers.insert(
        DOCUMENT_URL_HEADER.to_string(),
        settings.absolutify(&document.path()),
    );
    extra_headers.insert(EDITOR_USERNAME_HEADER.to_string(), user.username.clone());

    Ok(EmailMessage {
        subject,
        body,
        from_email: settings.email.default_from.clone(),
        to: settings.email.spam_watch_list.clone(),
        extra_headers,
        locale: Some(document.locale.clone()),
    })
}

/// Subject line for a spam attempt, as specific as the record allows
pub fn spam_attempt_subject(attempt: &DocumentSpamAttempt, settings: &Settings) -> String {
    let subject = format!("{} Wiki spam attempt recorded", settings.email.subject_prefix);
    match (&attempt.document, &attempt.title) {
        (Some(document), _) => format!("{} for document {}", subject, document),
        (None, Some(title)) if !title.is_empty() => format!("{} with title {}", subject, title),
        _ => subject,
    }
}

/// Alert for a blocked spam edit, sent to the spam-watch list.
pub fn spam_attempt_email(
    attempt: &DocumentSpamAttempt,
    settings: &Settings,
) -> Result<EmailMessage> {
    let mut vars = BTreeMap::new();
    vars.insert("username".to_string(), attempt.user.username.clone());
    vars.insert("user_email".to_string(), attempt.user.email.clone());
    vars.insert(
        "title".to_string(),
        attempt.title.clone().unwrap_or_else(|| "(none)".to_string()),
    );
    vars.insert("slug".to_string(), attempt.slug.clone());
    vars.insert(
        "document_url".to_string(),
        attempt
            .document
            .as_ref()
            .map(|d| settings.absolutify(&d.path()))
            .unwrap_or_else(|| "(new page)".to_string()),
    );
    vars.insert(
        "created".to_string(),
        attempt.created.format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    Ok(EmailMessage {
        subject: spam_attempt_subject(attempt, settings),
        body: template::render(SPAM_TEMPLATE, &vars)?,
        from_email: settings.email.default_from.clone(),
        to: settings.email.spam_watch_list.clone(),
        extra_headers: BTreeMap::new(),
        locale: None,
    })
}
