//! Run-wide asset deduplication and download.

use crate::extract::AssetRef;
use crate::fetch::HttpFetch;
use crate::result::{AssetCategory, AssetCounts, AssetManifest};
use crate::sink::FileSink;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Derived names longer than this are replaced by a short hash.
pub const MAX_FILE_NAME_LEN: usize = 200;
const HASH_PREFIX_LEN: usize = 10;

#[derive(Debug, Clone)]
enum Slot {
    Downloading,
    Stored {
        category: AssetCategory,
        path: PathBuf,
    },
}

#[derive(Debug, Default)]
struct Registry {
    slots: HashMap<String, Slot>,
    /// Relative path of every file written or in flight, and the URL owning it.
    claims: HashMap<PathBuf, String>,
}

impl Registry {
    /// Reserves a relative path for `url`. When the derived name already
    /// belongs to a different URL (another host or query string), the name
    /// is prefixed with a hash of the full URL.
    fn claim(&mut self, url: &Url, category: AssetCategory) -> PathBuf {
        let dir = Path::new(category.dir_name());
        let preferred = dir.join(asset_file_name(url));
        let path = match self.claims.get(&preferred) {
            Some(owner) if owner != url.as_str() => dir.join(disambiguated_file_name(url)),
            _ => preferred,
        };
        self.claims.insert(path.clone(), url.to_string());
        path
    }

    fn release(&mut self, key: &str) {
        self.slots.remove(key);
        self.claims.retain(|_, owner| owner != key);
    }
}

/// Downloads each distinct asset URI at most once per run and stores it
/// under `output_root/<category>/<name>`.
#[derive(Clone)]
pub struct AssetStore {
    fetcher: Arc<dyn HttpFetch>,
    sink: Arc<dyn FileSink>,
    output_root: PathBuf,
    timeout: Duration,
    workers: usize,
    registry: Arc<Mutex<Registry>>,
}

impl AssetStore {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        sink: Arc<dyn FileSink>,
        output_root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            sink,
            output_root: output_root.into(),
            timeout,
            workers: 1,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Resolves `reference` against `base` and stores it.
    ///
    /// Returns the stored path relative to the output root. An asset already
    /// stored earlier in the run returns its existing path without another
    /// download. Returns `None` for empty or unresolvable references, assets
    /// another task is still downloading, and failed downloads; failures are
    /// logged, never propagated.
    pub async fn fetch(
        &self,
        base: &Url,
        reference: &str,
        category: AssetCategory,
    ) -> Option<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let url = match base.join(reference) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping asset '{}' on {}: {}", reference, base, e);
                return None;
            }
        };
        let key = url.to_string();

        let relative = {
            let mut registry = self.lock_registry();
            match registry.slots.get(&key) {
                Some(Slot::Stored { path, .. }) => {
                    debug!("Asset already stored: {}", key);
                    return Some(path.clone());
                }
                Some(Slot::Downloading) => {
                    debug!("Asset download already in flight: {}", key);
                    return None;
                }
                None => {
                    registry.slots.insert(key.clone(), Slot::Downloading);
                    registry.claim(&url, category)
                }
            }
        };

        match self.download(&url, category, &relative).await {
            Ok(()) => {
                debug!("Downloaded {}: {}", category, key);
                self.lock_registry().slots.insert(
                    key,
                    Slot::Stored {
                        category,
                        path: relative.clone(),
                    },
                );
                Some(relative)
            }
            Err(reason) => {
                warn!("Failed to download {} asset {}: {}", category, key, reason);
                self.lock_registry().release(&key);
                None
            }
        }
    }

    /// Stores every reference of one page through the bounded worker pool.
    /// The manifest keeps document order and lists each path once.
    pub async fn fetch_all(&self, base: &Url, refs: &[AssetRef]) -> AssetManifest {
        let results: Vec<(usize, AssetCategory, Option<PathBuf>)> = stream::iter(
            refs.iter().enumerate(),
        )
        .map(|(index, asset)| async move {
            let path = self.fetch(base, &asset.href, asset.category).await;
            (index, asset.category, path)
        })
        .buffer_unordered(self.workers)
        .collect()
        .await;

        let mut ordered = results;
        ordered.sort_by_key(|(index, _, _)| *index);

        let mut manifest = AssetManifest::new();
        for (_, category, path) in ordered {
            if let Some(path) = path {
                manifest.push(category, path);
            }
        }
        manifest
    }

    /// Number of files stored so far, per category.
    pub fn counts(&self) -> AssetCounts {
        let registry = self.lock_registry();
        let mut counts = AssetCounts::default();
        for slot in registry.slots.values() {
            if let Slot::Stored { category, .. } = slot {
                counts.increment(*category);
            }
        }
        counts
    }

    pub fn is_stored(&self, url: &Url) -> bool {
        matches!(
            self.lock_registry().slots.get(url.as_str()),
            Some(Slot::Stored { .. })
        )
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    async fn download(
        &self,
        url: &Url,
        category: AssetCategory,
        relative: &Path,
    ) -> Result<(), String> {
        let bytes = self
            .fetcher
            .get(url, self.timeout)
            .await
            .map_err(|e| e.to_string())?;

        let dir = self.output_root.join(category.dir_name());
        self.sink.ensure_dir(&dir).await.map_err(|e| e.to_string())?;
        self.sink
            .write_file(&self.output_root.join(relative), &bytes)
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        // A poisoned registry still holds consistent entries.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Flat, filesystem-safe file name for an asset URL, derived from its path.
///
/// Names over [`MAX_FILE_NAME_LEN`] characters become the first ten hex
/// digits of the name's SHA-256 plus the original extension (`.bin` when
/// there is none). Pure: the same URL path always yields the same name.
pub fn asset_file_name(url: &Url) -> String {
    let path = url.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    let name: String = path
        .chars()
        .map(|c| match c {
            '/' | '?' | '&' | '\\' | ':' | '*' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if name.chars().count() <= MAX_FILE_NAME_LEN {
        return name;
    }

    format!("{}{}", short_digest(&name), extension_of(&name))
}

/// Name used when the path-derived name is taken by another URL: a hash of
/// the whole URL (host and query included) in front of the derived name.
pub fn disambiguated_file_name(url: &Url) -> String {
    let name = asset_file_name(url);
    let prefixed = format!("{}_{}", short_digest(url.as_str()), name);
    if prefixed.chars().count() <= MAX_FILE_NAME_LEN {
        prefixed
    } else {
        format!("{}{}", short_digest(url.as_str()), extension_of(&name))
    }
}

fn short_digest(input: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    digest[..HASH_PREFIX_LEN].to_string()
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 16)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".bin".to_string())
}
