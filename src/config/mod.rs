mod file_settings;

pub use file_settings::{Charset, FileSettings, SettingsError, SETTINGS_FILE_NAME};
