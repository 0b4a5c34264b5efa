use std::{path::PathBuf, sync::Arc};

use formbind::{BinderOptions, FormLayout};

mod fs;

pub use self::fs::{FsConfigStore, read_page_file};

/// A page: a named set of forms, the endpoint they submit to and the binder
/// options to use.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PageConfig {
    pub name: String,
    /// Transport URI, eg: `http://localhost:8777`.
    ///
    /// Callers pick a default when missing.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: BinderOptions,
    #[serde(default)]
    pub forms: Vec<FormLayout>,
}

impl PageConfig {
    pub fn form(&self, action: &str) -> Option<&FormLayout> {
        self.forms.iter().find(|f| f.action == action)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::File(path)
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoadedPage {
    pub source: Option<ConfigSource>,
    pub config: PageConfig,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedPages {
    pub pages: Vec<LoadedPage>,
    pub failed: Vec<PageLoadError>,
}

impl LoadedPages {
    pub fn get(&self, name: &str) -> Option<&LoadedPage> {
        self.pages.iter().find(|p| p.config.name == name)
    }

    /// Names of the loaded pages, in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.config.name.as_str())
    }
}

/// A page file, or one entry of a list file, that could not be loaded.
#[derive(Debug, Clone)]
pub struct PageLoadError {
    pub source: ConfigSource,
    pub error: String,
    /// Position in a list file.
    pub index: Option<usize>,
}

impl std::fmt::Display for PageLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "{} (entry {}): {}", self.source, index, self.error),
            None => write!(f, "{}: {}", self.source, self.error),
        }
    }
}

#[async_trait::async_trait]
pub trait ConfigStore {
    async fn load_pages(&self) -> Result<LoadedPages, anyhow::Error>;

    async fn save_page(&self, page: PageConfig) -> Result<LoadedPage, anyhow::Error>;
}

pub type DynConfigStore = Arc<dyn ConfigStore + Send + Sync>;
