use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compio::fs;
use derive_more::Display;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::BestEffortPathExt;

pub const SETTINGS_FILE_NAME: &str = ".cfs.yaml";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_CHARSET: &str = "UTF-8";

fn get_settings_file_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

/// Opaque charset label handed to every file node. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct Charset(String);

impl Charset {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl AsRef<str> for Charset {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self(DEFAULT_CHARSET.to_string())
    }
}

/// Per-filesystem settings.
///
/// `create_on_access` makes `open_*` on a file create it first when missing.
/// `poll_interval` is the period of the watch scheduler's ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettings {
    create_on_access: bool,
    charset: Charset,
    poll_interval: Duration,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            create_on_access: false,
            charset: Charset::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl FileSettings {
    /// Reads `.cfs.yaml` from `root`. A missing file yields the defaults.
    pub async fn read(root: &Path) -> Result<Self, SettingsError> {
        let path = get_settings_file_path(root);
        debug!("Reading settings from {}", path.best_effort_path_display());

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                });
            }
        };

        let contents = String::from_utf8_lossy(&bytes);
        let settings = Self::try_from(&*contents)?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn create_on_access(&self) -> bool {
        self.create_on_access
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn with_create_on_access(mut self, create_on_access: bool) -> Self {
        self.create_on_access = create_on_access;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn apply_yaml(mut self, top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Self, SettingsError> {
        if let Some(value) = get_key(top_level, "createOnAccess") {
            match value {
                Yaml::Value(Scalar::Boolean(flag)) => self.create_on_access = *flag,
                _ => return InvalidValueSnafu { key: "createOnAccess" }.fail(),
            }
        }

        if let Some(value) = get_key(top_level, "charset") {
            let name = value
                .as_str()
                .context(InvalidValueSnafu { key: "charset" })?;
            self.charset = Charset::new(name);
        }

        if let Some(value) = get_key(top_level, "pollIntervalMs") {
            match value {
                Yaml::Value(Scalar::Integer(millis)) if *millis > 0 => {
                    self.poll_interval = Duration::from_millis(*millis as u64);
                }
                _ => return InvalidValueSnafu { key: "pollIntervalMs" }.fail(),
            }
        }

        Ok(self)
    }
}

fn get_key<'a, 'input>(
    mapping: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
    key: &'static str,
) -> Option<&'a Yaml<'input>> {
    mapping
        .get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))))
        .filter(|value| !value.is_null())
}

impl TryFrom<&str> for FileSettings {
    type Error = SettingsError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            // An empty settings file is the same as no settings file
            return Ok(Self::default());
        };

        let top_level = document
            .as_mapping()
            .ok_or(SettingsError::TopLevelNotMap)?;

        Self::default().apply_yaml(top_level)
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of the settings file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Setting '{}' has an invalid value", key))]
    InvalidValue { key: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn settings_default_when_file_is_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let settings = FileSettings::read(temp_dir.path())
            .await
            .expect("Missing file should not be an error");

        assert_eq!(settings, FileSettings::default());
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
    }

    #[compio::test]
    async fn settings_are_read_from_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(
            temp_dir.path().join(SETTINGS_FILE_NAME),
            "createOnAccess: true\ncharset: ISO-8859-1\npollIntervalMs: 250\n",
        )
        .expect("Failed to write settings file");

        let settings = FileSettings::read(temp_dir.path())
            .await
            .expect("Failed to read settings");

        assert!(settings.create_on_access());
        assert_eq!(settings.charset().as_ref(), "ISO-8859-1");
        assert_eq!(settings.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn settings_empty_document_is_default() {
        let settings: FileSettings = "".try_into().expect("Empty file should parse");
        assert_eq!(settings, FileSettings::default());
    }

    #[test]
    fn settings_ignore_unknown_keys_and_nulls() {
        let settings: FileSettings = "somethingElse: 3\ncharset: null\n"
            .try_into()
            .expect("Unknown keys should be ignored");
        assert_eq!(settings, FileSettings::default());
    }

    #[test]
    fn settings_reject_invalid_yaml() {
        let result: Result<FileSettings, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(SettingsError::ParseError { .. })));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn settings_reject_non_map_top_level(#[case] contents: &str) {
        let result: Result<FileSettings, _> = contents.try_into();
        assert!(matches!(result, Err(SettingsError::TopLevelNotMap)));
    }

    #[rstest]
    #[case("pollIntervalMs: 0", "pollIntervalMs")]
    #[case("pollIntervalMs: -5", "pollIntervalMs")]
    #[case("pollIntervalMs: fast", "pollIntervalMs")]
    #[case("createOnAccess: maybe", "createOnAccess")]
    #[case("charset: [a, b]", "charset")]
    fn settings_reject_invalid_values(#[case] contents: &str, #[case] expected_key: &str) {
        let result: Result<FileSettings, _> = contents.try_into();
        match result {
            Err(SettingsError::InvalidValue { key }) => assert_eq!(key, expected_key),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn builder_overrides_defaults() {
        let settings = FileSettings::default()
            .with_create_on_access(true)
            .with_charset(Charset::new("UTF-16"))
            .with_poll_interval(Duration::from_millis(20));

        assert!(settings.create_on_access());
        assert_eq!(settings.charset().to_string(), "UTF-16");
        assert_eq!(settings.poll_interval(), Duration::from_millis(20));
    }
}
