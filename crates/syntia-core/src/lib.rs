// ABOUTME: Shared types and configuration for syntia.
// ABOUTME: Defines config file handling, language tags, and user notifications.

pub mod config;
pub mod language;
pub mod notify;

pub use config::{BehaviorSettings, Config, ConfigError, LayoutSettings, TerminalSettings};
pub use language::{ExtensionDetector, Language, LanguageDetector};
pub use notify::{Notification, NotificationQueue, Severity};
