mod settings;

pub use settings::{
    DiffConfig, EmailConfig, LoggingConfig, Settings, SiteConfig, TrackingConfig,
};
