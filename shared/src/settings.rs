use std::{
    fs,
    io::{ErrorKind, Write},
    path::Path,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use url::Url;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: Url,
    pub covers_base_url: Url,
    /// First-party backend that proxies trending lists and cover lookups.
    pub proxy_base_url: Option<Url>,
    pub language: String,
    pub chapter_list_freshness_secs: u64,
    pub search_freshness_secs: u64,
    pub search_debounce_ms: u64,
    pub search_limit: usize,
    pub cache_capacity: usize,
    pub cache_retention_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub data_saver: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_url("https://api.mangadex.org"),
            covers_base_url: default_url("https://uploads.mangadex.org/covers"),
            proxy_base_url: None,
            language: "vi".to_owned(),
            chapter_list_freshness_secs: 10 * 60,
            search_freshness_secs: 5 * 60,
            search_debounce_ms: 300,
            search_limit: 5,
            cache_capacity: 256,
            cache_retention_secs: 60 * 60,
            request_timeout_secs: None,
            data_saver: false,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("while reading settings at {}", path.display()))
            }
        };

        serde_json::from_slice(&contents)
            .with_context(|| format!("while parsing settings at {}", path.display()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("while creating {}", parent.display()))?;

        let mut file = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.flush()?;
        file.persist(path)
            .with_context(|| format!("while saving settings to {}", path.display()))?;

        Ok(())
    }

    pub fn chapter_list_freshness(&self) -> TimeDelta {
        seconds(self.chapter_list_freshness_secs)
    }

    pub fn search_freshness(&self) -> TimeDelta {
        seconds(self.search_freshness_secs)
    }

    pub fn cache_retention(&self) -> TimeDelta {
        seconds(self.cache_retention_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn seconds(value: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(value).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}

fn default_url(value: &str) -> Url {
    Url::parse(value).unwrap_or_else(|_| unreachable!("`{value}` is a valid URL"))
}
