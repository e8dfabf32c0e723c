use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::settings::Settings;

/// Applies `changes` and persists the result. `settings` is left as it was
/// when the file cannot be written.
pub fn update_settings(
    settings: &mut Settings,
    settings_path: &Path,
    changes: UpdateableSettings,
) -> Result<()> {
    let mut staged = settings.clone();
    changes.apply_updates(&mut staged);

    staged
        .save_to_file(settings_path)
        .with_context(|| format!("while saving settings to {}", settings_path.display()))?;
    *settings = staged;

    Ok(())
}

/// A partial update: `None` leaves the current value untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UpdateableSettings {
    pub api_base_url: Option<Url>,
    pub covers_base_url: Option<Url>,
    /// `Some(None)` removes the proxy.
    pub proxy_base_url: Option<Option<Url>>,
    pub language: Option<String>,
    pub search_limit: Option<usize>,
    pub search_debounce_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub data_saver: Option<bool>,
}

impl UpdateableSettings {
    pub fn apply_updates(self, settings: &mut Settings) {
        if let Some(api_base_url) = self.api_base_url {
            settings.api_base_url = api_base_url;
        }
        if let Some(covers_base_url) = self.covers_base_url {
            settings.covers_base_url = covers_base_url;
        }
        if let Some(proxy_base_url) = self.proxy_base_url {
            settings.proxy_base_url = proxy_base_url;
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(search_limit) = self.search_limit {
            settings.search_limit = search_limit;
        }
        if let Some(search_debounce_ms) = self.search_debounce_ms {
            settings.search_debounce_ms = search_debounce_ms;
        }
        if let Some(request_timeout_secs) = self.request_timeout_secs {
            settings.request_timeout_secs = Some(request_timeout_secs);
        }
        if let Some(data_saver) = self.data_saver {
            settings.data_saver = data_saver;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SETTINGS_FILE_NAME;

    #[test]
    fn test_update_is_persisted_and_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let mut settings = Settings::default();

        update_settings(
            &mut settings,
            &path,
            UpdateableSettings {
                language: Some("en".into()),
                data_saver: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(settings.language, "en");
        assert!(settings.data_saver);
        assert_eq!(settings.search_limit, 5);
        assert_eq!(Settings::from_file(&path).unwrap(), settings);
    }

    #[test]
    fn test_failed_save_leaves_settings_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be makes the final rename fail
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "").unwrap();
        let mut settings = Settings::default();

        let result = update_settings(
            &mut settings,
            &path,
            UpdateableSettings {
                language: Some("en".into()),
                ..Default::default()
            },
        );

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("while saving settings to"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_proxy_can_be_removed() {
        let mut settings = Settings {
            proxy_base_url: Some(Url::parse("http://localhost:5000").unwrap()),
            ..Settings::default()
        };

        UpdateableSettings {
            proxy_base_url: Some(None),
            ..Default::default()
        }
        .apply_updates(&mut settings);

        assert_eq!(settings.proxy_base_url, None);
    }
}
