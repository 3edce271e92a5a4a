use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host used to absolutify document paths
    #[serde(default = "default_site_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_from_email")]
    pub default_from: String,
    /// Recipients of first-edit and spam-attempt alerts
    #[serde(default)]
    pub spam_watch_list: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_utm_source")]
    pub source: String,
    #[serde(default = "default_utm_medium")]
    pub medium: String,
    #[serde(default = "default_edit_campaign")]
    pub edit_campaign: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffConfig {
    /// Unchanged lines shown around each hunk
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_site_url() -> String {
    "https://example.com".to_string()
}

fn default_from_email() -> String {
    "notifications@example.com".to_string()
}

fn default_subject_prefix() -> String {
    "[MDN]".to_string()
}

fn default_utm_source() -> String {
    "developer.mozilla.org".to_string()
}

fn default_utm_medium() -> String {
    "email".to_string()
}

fn default_edit_campaign() -> String {
    "Wiki Doc Edits".to_string()
}

fn default_context_lines() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("site.url", default_site_url())?
            .set_default("email.default_from", default_from_email())?
            .set_default("email.subject_prefix", default_subject_prefix())?
            .set_default("tracking.source", default_utm_source())?
            .set_default("tracking.medium", default_utm_medium())?
            .set_default("tracking.edit_campaign", default_edit_campaign())?
            .set_default("diff.context_lines", default_context_lines() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // NOTIFIER_SITE__URL, NOTIFIER_EMAIL__SPAM_WATCH_LIST, NOTIFIER_DIFF__CONTEXT_LINES, etc.
            .add_source(
                Environment::with_prefix("NOTIFIER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("email.spam_watch_list"),
            );

        builder.build()?.try_deserialize()
    }

    /// Turn a site-relative path into an absolute URL
    pub fn absolutify(&self, path: &str) -> String {
        format!("{}{}", self.site.url.trim_end_matches('/'), path)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            default_from: default_from_email(),
            spam_watch_list: vec![],
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            source: default_utm_source(),
            medium: default_utm_medium(),
            edit_campaign: default_edit_campaign(),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.site.url, "https://example.com");
        assert_eq!(settings.email.subject_prefix, "[MDN]");
        assert_eq!(settings.tracking.edit_campaign, "Wiki Doc Edits");
        assert_eq!(settings.diff.context_lines, 3);
        assert!(settings.email.spam_watch_list.is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        env::set_var("NOTIFIER_EMAIL__SPAM_WATCH_LIST", "a@example.com,b@example.com");
        env::set_var("NOTIFIER_DIFF__CONTEXT_LINES", "5");
        env::set_var("NOTIFIER_SITE__URL", "https://wiki.example.org");
        // Unprefixed variables are ignored
        env::set_var("EMAIL", "dev@example.com");

        let settings = Settings::new();

        env::remove_var("NOTIFIER_EMAIL__SPAM_WATCH_LIST");
        env::remove_var("NOTIFIER_DIFF__CONTEXT_LINES");
        env::remove_var("NOTIFIER_SITE__URL");
        env::remove_var("EMAIL");

        let settings = settings.unwrap();
        assert_eq!(
            settings.email.spam_watch_list,
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert_eq!(settings.diff.context_lines, 5);
        assert_eq!(settings.site.url, "https://wiki.example.org");
        assert_eq!(settings.email.default_from, "notifications@example.com");
    }

    #[test]
    fn test_absolutify_trims_trailing_slash() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.absolutify("/en-US/docs/Root"),
            "https://example.com/en-US/docs/Root"
        );

        settings.site.url = "https://wiki.example.org/".to_string();
        assert_eq!(
            settings.absolutify("/fr/docs/Racine"),
            "https://wiki.example.org/fr/docs/Racine"
        );
    }
}
