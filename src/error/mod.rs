use thiserror::Error;

use crate::notification::{MailError, WatchError};
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Watch backend error: {0}")]
    Watch(#[from] WatchError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] MailError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NotifyError::NotFound("document 7".to_string());
        assert_eq!(err.to_string(), "Not found: document 7");

        let err: NotifyError = TemplateError::NotFound("wiki/email/missing.ltxt".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Template error: Template not found: wiki/email/missing.ltxt"
        );
    }
}
