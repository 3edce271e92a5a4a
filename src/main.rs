use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use wiki_edit_notifier::config::Settings;
use wiki_edit_notifier::notification::{
    first_edit_email, spam_attempt_email, EditDocumentEvent, EditDocumentInTreeEvent,
    MemoryWatchBackend, NotificationDispatcher, OutboxSender,
};
use wiki_edit_notifier::telemetry::init_tracing;
use wiki_edit_notifier::wiki::{DocumentSpamAttempt, User, WikiStore};

/// Render sample notifications for a small in-memory wiki and print them as
/// JSON, so templates and settings can be checked without a mail server.
#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;
    tracing::info!(site = %settings.site.url, "Configuration loaded");

    let settings = Arc::new(settings);
    let watches = Arc::new(MemoryWatchBackend::new());
    let outbox = Arc::new(OutboxSender::new());
    let dispatcher = NotificationDispatcher::new(watches.clone(), outbox.clone(), settings.clone());

    let store = WikiStore::new();
    let author = User::new(1, "wiki_user", "wiki_user@example.com");
    let watcher = User::new(2, "watcher", "watcher@example.com");

    let root = store.create_document("en-US", "Web", "Web technology", None);
    let page = store.create_document("en-US", "Web/HTML", "HTML", Some(root.id));

    let now = Utc::now().naive_utc();
    let first = store
        .create_revision(page.id, &author, "<p>HTML is a markup language.</p>", None, now)
        .ok_or_else(|| anyhow::anyhow!("document {} missing", page.id))?;
    let is_first_edit = store.revision_count_by(author.id) == 1;
    let second = store
        .create_revision(
            page.id,
            &author,
            "<p>HTML is the markup language of the web.</p>",
            Some("Clarify intro"),
            now + chrono::Duration::minutes(5),
        )
        .ok_or_else(|| anyhow::anyhow!("document {} missing", page.id))?;

    EditDocumentEvent::notify(dispatcher.watches(), &watcher, &page).await?;
    EditDocumentInTreeEvent::notify(dispatcher.watches(), &watcher, &root).await?;

    let event = EditDocumentEvent::new(second, &store, &settings)?;
    event.fire(&dispatcher, &[author.id]).await?;

    // Alerts go to the spam-watch list only
    if !settings.email.spam_watch_list.is_empty() {
        if is_first_edit {
            dispatcher
                .send(first_edit_email(&first, &store, &settings)?)
                .await?;
        }

        let attempt = DocumentSpamAttempt {
            user: author.clone(),
            title: Some("Cheap watches".to_string()),
            slug: "cheap-watches".to_string(),
            document: None,
            created: now,
        };
        dispatcher.send(spam_attempt_email(&attempt, &settings)?).await?;
    }

    println!("{}", serde_json::to_string_pretty(&outbox.messages().await)?);
    tracing::info!(stats = ?dispatcher.stats(), watches = watches.len(), "Preview complete");
    Ok(())
}
