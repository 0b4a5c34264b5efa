use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};

use crate::{ConfigSource, LoadedPage, LoadedPages, PageConfig, PageLoadError};

const CONFIG_DIR_NAME: &str = "formbind";
const PAGES_DIR_NAME: &str = "pages";

/// Page configs stored as `.json`, `.yaml` or `.yml` files in a directory.
///
/// A file holds either a single page or a list of pages.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    path: PathBuf,
}

impl FsConfigStore {
    fn default_config_dir() -> Result<PathBuf, anyhow::Error> {
        let home = std::env::home_dir().context("Could not determine home directory")?;

        let dir = home.join(".config").join(CONFIG_DIR_NAME);

        Ok(dir)
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store rooted at `~/.config/formbind`.
    pub fn new_default() -> Result<Self, anyhow::Error> {
        let path = Self::default_config_dir()?;
        Ok(Self { path })
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.path.join(PAGES_DIR_NAME)
    }

    /// Load all pages.
    ///
    /// A missing directory yields no pages. Files that cannot be parsed end
    /// up in [`LoadedPages::failed`] instead of failing the whole load.
    pub fn pages(&self) -> Result<LoadedPages, anyhow::Error> {
        let pages_dir = self.pages_dir();
        let mut paths = match std::fs::read_dir(&pages_dir) {
            Ok(entries) => entries
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to list '{}'", pages_dir.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %pages_dir.display(), "pages directory does not exist");
                return Ok(LoadedPages::default());
            }
            Err(err) => bail!("Failed to read pages directory: {}", err),
        };
        paths.retain(|path| path.is_file());
        // Directory order is platform dependent.
        paths.sort();

        let mut loaded = LoadedPages::default();
        for path in paths {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read page file: '{}'", path.display()))?;
            match parse_page_file(&path, &contents) {
                Ok(file) => {
                    loaded.pages.extend(file.pages);
                    loaded.failed.extend(file.failed);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping invalid page file");
                    loaded.failed.push(PageLoadError {
                        source: path.into(),
                        error: format!("{err:#}"),
                        index: None,
                    });
                }
            }
        }

        Ok(loaded)
    }

    fn write_page(&self, config: &PageConfig) -> Result<LoadedPage, anyhow::Error> {
        if config.name.is_empty() || config.name.contains(['/', '\\']) || config.name == ".." {
            bail!("Invalid page name: '{}'", config.name);
        }

        let pages_dir = self.pages_dir();
        std::fs::create_dir_all(&pages_dir).with_context(|| {
            format!(
                "Failed to create pages directory '{}'",
                pages_dir.display()
            )
        })?;

        let file_name = format!("{}.yaml", config.name);
        let file_path = pages_dir.join(file_name);

        let contents =
            serde_yaml::to_string(config).context("Failed to serialize page config to YAML")?;

        std::fs::write(&file_path, contents).with_context(|| {
            format!("Failed to write page config to '{}'", file_path.display())
        })?;

        Ok(LoadedPage {
            source: Some(file_path.into()),
            config: config.clone(),
        })
    }
}

/// Read a single page file.
///
/// Unlike [`FsConfigStore::pages`], any failure is an error, and the file must
/// contain exactly one page.
pub fn read_page_file(path: &Path) -> Result<LoadedPage, anyhow::Error> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page file: '{}'", path.display()))?;
    let loaded = parse_page_file(path, &contents)?;
    if let Some(failed) = loaded.failed.first() {
        bail!("{}", failed);
    }
    let count = loaded.pages.len();
    match <[LoadedPage; 1]>::try_from(loaded.pages) {
        Ok([page]) => Ok(page),
        Err(_) => bail!(
            "Expected a single page in '{}', found {}",
            path.display(),
            count
        ),
    }
}

enum PageFormat {
    Json,
    Yaml,
}

impl PageFormat {
    fn of(path: &Path) -> Result<Self, anyhow::Error> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .context("page file has no usable extension")?;
        match ext {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => bail!("Unsupported file extension: '{}'", other),
        }
    }
}

/// Parse a file holding one page or a list of pages.
///
/// Entries of a list that are not valid pages are reported with their index;
/// a single page that does not deserialize has no index.
fn parse_page_file(path: &Path, contents: &str) -> Result<LoadedPages, anyhow::Error> {
    let value: serde_json::Value = match PageFormat::of(path)? {
        PageFormat::Json => serde_json::from_str(contents).context("Failed to parse JSON")?,
        PageFormat::Yaml => serde_yaml::from_str(contents).context("Failed to parse YAML")?,
    };

    let entries: Vec<(Option<usize>, serde_json::Value)> = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (Some(index), item))
            .collect(),
        page @ serde_json::Value::Object(_) => vec![(None, page)],
        other => bail!(
            "A page file must contain either a list of pages or a single page - got {}",
            other
        ),
    };

    let mut loaded = LoadedPages::default();
    for (index, entry) in entries {
        let source = ConfigSource::File(path.to_owned());
        match serde_json::from_value::<PageConfig>(entry) {
            Ok(config) => loaded.pages.push(LoadedPage {
                source: Some(source),
                config,
            }),
            Err(err) => loaded.failed.push(PageLoadError {
                source,
                error: format!("Failed to parse page config: {err}"),
                index,
            }),
        }
    }
    Ok(loaded)
}

#[async_trait::async_trait]
impl crate::ConfigStore for FsConfigStore {
    async fn load_pages(&self) -> Result<LoadedPages, anyhow::Error> {
        #[cfg(feature = "tokio")]
        {
            let s = self.clone();
            tokio::task::spawn_blocking(move || s.pages())
                .await
                .context("Failed to load pages")?
        }

        #[cfg(not(feature = "tokio"))]
        {
            self.pages()
        }
    }

    async fn save_page(&self, page: PageConfig) -> Result<LoadedPage, anyhow::Error> {
        #[cfg(feature = "tokio")]
        {
            let s = self.clone();
            tokio::task::spawn_blocking(move || s.write_page(&page))
                .await
                .context("Failed to save page")?
        }

        #[cfg(not(feature = "tokio"))]
        {
            self.write_page(&page)
        }
    }
}
