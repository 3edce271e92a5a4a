//! Email body templates and placeholder substitution.
//!
//! This module provides:
//! - A built-in table of plain-text email templates keyed by name
//! - `{{variable}}` substitution for template bodies
//! - `%(variable)s` interpolation for subject lines
//!
//! # Example
//!
//! ```ignore
//! let mut vars = BTreeMap::new();
//! vars.insert("creator".to_string(), "wiki_user".to_string());
//! vars.insert("document_title".to_string(), "Root Document".to_string());
//!
//! let subject = interpolate("Page \"%(document_title)s\" changed by %(creator)s", &vars);
//! let body = render(EDITED_TEMPLATE, &vars)?;
//! ```

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use thiserror::Error;

/// Plain-text body for edit notifications and first-edit alerts
pub const EDITED_TEMPLATE: &str = "wiki/email/edited.ltxt";

/// Plain-text body for spam-attempt alerts
pub const SPAM_TEMPLATE: &str = "wiki/email/spam.ltxt";

lazy_static! {
    static ref BUILTIN_TEMPLATES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(
            EDITED_TEMPLATE,
            "{{creator}} changed the page \"{{document_title}}\".\n\
             \n\
             {{diff}}\n\
             \n\
             View the page:\n\
             {{view_url}}\n\
             \n\
             Compare the changes:\n\
             {{compare_url}}\n\
             \n\
             Edit the page:\n\
             {{edit_url}}\n\
             \n\
             Page history:\n\
             {{history_url}}\n\
             \n\
             Editor's profile:\n\
             {{user_url}}\n",
        );
        m.insert(
            SPAM_TEMPLATE,
            "An edit was blocked as spam.\n\
             \n\
             User: {{username}} <{{user_email}}>\n\
             Title: {{title}}\n\
             Slug: {{slug}}\n\
             Document: {{document_url}}\n\
             Recorded: {{created}}\n",
        );
        m
    };
}

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Render a built-in template with variables
pub fn render(name: &str, variables: &BTreeMap<String, String>) -> TemplateResult<String> {
    let body = BUILTIN_TEMPLATES
        .get(name)
        .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;

    Ok(substitute_string(body, variables))
}

/// Substitute {{variable}} placeholders in a single pass.
///
/// Substituted values are never rescanned. Unknown placeholders are kept as-is.
pub fn substitute_string(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match variables.get(key) {
                    Some(value) => result.push_str(value),
                    None => result.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// Interpolate `%(name)s` placeholders, with `%%` as a literal percent sign.
///
/// Unknown names are left verbatim so a subject line is always produced.
pub fn interpolate(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('%') {
            result.push('%');
            rest = stripped;
            continue;
        }

        let placeholder = after
            .strip_prefix('(')
            .and_then(|inner| inner.find(")s").map(|end| (&inner[..end], &inner[end + 2..])));

        match placeholder {
            Some((key, tail)) => {
                match variables.get(key) {
                    Some(value) => result.push_str(value),
                    None => {
                        tracing::warn!(key = %key, "Unknown placeholder in subject template");
                        result.push_str(&rest[pos..rest.len() - tail.len()]);
                    }
                }
                rest = tail;
            }
            None => {
                result.push('%');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}
