//! Links embedded in notification emails.

use url::form_urlencoded;

use crate::config::TrackingConfig;
use crate::wiki::{Document, RevisionId};

/// Append UTM campaign parameters to a URL or path.
///
/// Existing query parameters are kept and the tracking parameters follow them
/// in key order. An empty input yields the bare query string.
pub fn add_utm(url: &str, campaign: &str, tracking: &TrackingConfig) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("utm_campaign", campaign)
        .append_pair("utm_medium", &tracking.medium)
        .append_pair("utm_source", &tracking.source)
        .finish();

    let (base, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    format!("{}{}{}{}", base, separator, query, fragment)
}

pub fn edit_path(document: &Document) -> String {
    format!("{}$edit", document.path())
}

pub fn history_path(document: &Document) -> String {
    format!("{}$history", document.path())
}

/// Comparison page between two revisions of a document
pub fn compare_path(document: &Document, to: RevisionId, from: RevisionId) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("to", &to.to_string())
        .append_pair("from", &from.to_string())
        .finish();
    format!("{}$compare?{}", document.path(), query)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM: &str =
        "utm_campaign=Wiki+Doc+Edits&utm_medium=email&utm_source=developer.mozilla.org";

    fn doc() -> Document {
        Document {
            id: 1,
            locale: "en-US".to_string(),
            slug: "Root".to_string(),
            title: "Root Document".to_string(),
            parent_id: None,
            current_revision_id: None,
        }
    }

    #[test]
    fn test_add_utm_to_empty() {
        let tracking = TrackingConfig::default();
        assert_eq!(add_utm("", "Wiki Doc Edits", &tracking), format!("?{}", UTM));
    }

    #[test]
    fn test_add_utm_to_path() {
        let tracking = TrackingConfig::default();
        assert_eq!(
            add_utm("/en-US/docs/Root", "Wiki Doc Edits", &tracking),
            format!("/en-US/docs/Root?{}", UTM)
        );
    }

    #[test]
    fn test_add_utm_keeps_existing_query_and_fragment() {
        let tracking = TrackingConfig::default();
        assert_eq!(
            add_utm("/en-US/docs/Root$compare?to=2&from=1", "Wiki Doc Edits", &tracking),
            format!("/en-US/docs/Root$compare?to=2&from=1&{}", UTM)
        );
        assert_eq!(
            add_utm("/en-US/docs/Root#Syntax", "Wiki Doc Edits", &tracking),
            format!("/en-US/docs/Root?{}#Syntax", UTM)
        );
    }

    #[test]
    fn test_document_paths() {
        let doc = doc();
        assert_eq!(edit_path(&doc), "/en-US/docs/Root$edit");
        assert_eq!(history_path(&doc), "/en-US/docs/Root$history");
        assert_eq!(compare_path(&doc, 2, 1), "/en-US/docs/Root$compare?to=2&from=1");
    }
}
