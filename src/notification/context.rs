use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Settings;
use crate::error::{NotifyError, Result};
use crate::wiki::{Revision, RevisionHistory, User};

use super::diff::content_diff;
use super::urls::{add_utm, compare_path, edit_path, history_path};

/// Diff text used when a revision has nothing to compare against
pub const DIFF_UNAVAILABLE: &str = "Diff is unavailable.";

/// Template variables describing a single revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContext {
    /// Revision comparison page (bare tracking query for a first revision)
    pub compare_url: String,
    pub creator: User,
    pub diff: String,
    pub document_title: String,
    pub edit_url: String,
    pub history_url: String,
    pub user_url: String,
    pub view_url: String,
}

impl NotificationContext {
    /// Flatten into string variables for subject and body templates
    pub fn to_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("compare_url".to_string(), self.compare_url.clone());
        vars.insert("creator".to_string(), self.creator.to_string());
        vars.insert("diff".to_string(), self.diff.clone());
        vars.insert("document_title".to_string(), self.document_title.clone());
        vars.insert("edit_url".to_string(), self.edit_url.clone());
        vars.insert("history_url".to_string(), self.history_url.clone());
        vars.insert("user_url".to_string(), self.user_url.clone());
        vars.insert("view_url".to_string(), self.view_url.clone());
        vars
    }
}

/// Build the notification context for a revision.
///
/// The first revision of a document has no diff and no comparison link.
/// Later revisions are diffed against their immediate predecessor.
pub fn notification_context(
    revision: &Revision,
    history: &dyn RevisionHistory,
    settings: &Settings,
) -> Result<NotificationContext> {
    let document = history
        .document(revision.document_id)
        .ok_or_else(|| NotifyError::NotFound(format!("document {}", revision.document_id)))?;

    let tracking = &settings.tracking;
    let campaign = tracking.edit_campaign.as_str();
    let tracked = |url: &str| add_utm(url, campaign, tracking);

    let (compare_url, diff) = match history.previous_revision(revision) {
        Some(previous) => {
            let diff = content_diff(
                &previous.content,
                &revision.content,
                &format!("[{}] #{}", document.locale, previous.id),
                &format!("[{}] #{}", document.locale, revision.id),
                settings.diff.context_lines,
            );
            (tracked(&compare_path(&document, revision.id, previous.id)), diff)
        }
        None => (tracked(""), DIFF_UNAVAILABLE.to_string()),
    };

    Ok(NotificationContext {
        compare_url,
        creator: revision.creator.clone(),
        diff,
        document_title: document.title.clone(),
        edit_url: tracked(&edit_path(&document)),
        history_url: tracked(&history_path(&document)),
        user_url: tracked(&revision.creator.profile_path()),
        view_url: tracked(&document.path()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::WikiStore;
    use chrono::NaiveDate;

    #[test]
    fn test_context_vars_use_username_for_creator() {
        let store = WikiStore::new();
        let user = User::new(1, "wiki_user", "wiki_user@example.com");
        let doc = store.create_document("de", "Start", "Startseite", None);
        let created = NaiveDate::from_ymd_opt(2017, 4, 14)
            .unwrap()
            .and_hms_opt(12, 15, 0)
            .unwrap();
        let revision = store
            .create_revision(doc.id, &user, "<p>Hallo</p>", None, created)
            .unwrap();

        let context = notification_context(&revision, &store, &Settings::default()).unwrap();
        let vars = context.to_vars();
        assert_eq!(vars["creator"], "wiki_user");
        assert_eq!(vars["document_title"], "Startseite");
        assert!(vars["view_url"].starts_with("/de/docs/Start?utm_campaign="));
        assert_eq!(vars.len(), 8);
    }

    #[test]
    fn test_context_for_missing_document() {
        let store = WikiStore::new();
        let revision = Revision {
            id: 9,
            document_id: 404,
            creator: User::new(1, "wiki_user", "wiki_user@example.com"),
            content: String::new(),
            title: String::new(),
            comment: None,
            created: NaiveDate::from_ymd_opt(2017, 4, 14)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };

        assert!(matches!(
            notification_context(&revision, &store, &Settings::default()),
            Err(NotifyError::NotFound(_))
        ));
    }
}
