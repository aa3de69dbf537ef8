//! Native collaborators: part records read from a directory of JSON files,
//! panel flags persisted to a JSON file, and surfaces that only log.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::panels;
use crate::error::EditorError;
use crate::model::{Page, PageId};
use crate::navigator::{LoadOutcome, Location, PageSource};
use crate::panel::{Overlay, Surface};
use crate::shell::EditorShell;
use crate::viewport::ViewportState;
use crate::visibility::{KeyValueStore, StoredEntry, now_ms};

/// Serves `<dir>/<id>.json` part records.
///
/// Image URIs are resolved against `media_root` when one is set; otherwise
/// image preloads always succeed.
#[derive(Debug, Clone)]
pub struct FilePageSource {
    dir: PathBuf,
    media_root: Option<PathBuf>,
}

impl FilePageSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            media_root: None,
        }
    }

    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media_root = Some(root.into());
        self
    }

    pub fn record_path(&self, id: PageId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_page(&self, id: PageId) -> Result<Page, EditorError> {
        let path = self.record_path(id);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| EditorError::fetch(id, format!("{}: {}", path.display(), e)))?;
        let page = Page::from_json(&json)?;
        if page.id != id {
            return Err(EditorError::fetch(
                id,
                format!("{} holds page {}", path.display(), page.id),
            ));
        }
        Ok(page)
    }

    fn check_image(&self, page_id: PageId, uri: &str) -> Result<(), EditorError> {
        let Some(root) = &self.media_root else {
            return Ok(());
        };
        let path = root.join(uri.trim_start_matches('/'));
        if path.is_file() {
            Ok(())
        } else {
            Err(EditorError::fetch(
                page_id,
                format!("image {} not found", path.display()),
            ))
        }
    }
}

impl PageSource for FilePageSource {
    fn fetch_page(&self, id: PageId) -> impl Future<Output = Result<Page, EditorError>> {
        std::future::ready(self.read_page(id))
    }

    fn preload_image(
        &self,
        page_id: PageId,
        uri: &str,
    ) -> impl Future<Output = Result<(), EditorError>> {
        std::future::ready(self.check_image(page_id, uri))
    }
}

/// Key-value entries persisted as one JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, StoredEntry>,
}

impl FileStore {
    /// Open a store; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EditorError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!("Opened panel store {:?}", path);
        Ok(Self { path, entries })
    }

    /// `<config dir>/pagesync/panels.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pagesync").join("panels.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), EditorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|e| !e.is_expired(now_ms()))
            .map(|e| e.value.clone())
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires_in: Option<Duration>,
    ) -> Result<(), EditorError> {
        let now = now_ms();
        self.entries.retain(|_, e| !e.is_expired(now));
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, expires_in));
        self.save()
    }
}

/// Address "bar" of the headless driver.
#[derive(Debug, Clone)]
pub struct LogLocation {
    href: String,
}

impl LogLocation {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

impl Location for LogLocation {
    fn href(&self) -> String {
        self.href.clone()
    }

    fn push(&mut self, url: &str) {
        log::info!("Location: {}", url);
        self.href = url.to_string();
    }
}

/// Surface that logs what it would draw.
#[derive(Debug, Clone)]
pub struct LogSurface {
    id: String,
    size: (f32, f32),
}

impl LogSurface {
    pub fn new(id: impl Into<String>, size: (f32, f32)) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }

    /// Container and toolbar surfaces for a panel.
    pub fn pair(name: &str, size: (f32, f32)) -> (Box<dyn Surface>, Box<dyn Surface>) {
        (
            Box::new(Self::new(panels::container_id(name), size)),
            Box::new(Self::new(panels::tools_id(name), (0.0, 0.0))),
        )
    }
}

impl Surface for LogSurface {
    fn show(&mut self) {
        log::debug!("{}: shown", self.id);
    }

    fn hide(&mut self) {
        log::debug!("{}: hidden", self.id);
    }

    fn size(&self) -> (f32, f32) {
        self.size
    }

    fn set_image(&mut self, uri: &str) {
        log::info!("{}: image {}", self.id, uri);
    }

    fn apply_transform(&mut self, viewport: &ViewportState) {
        log::trace!("{}: {}", self.id, viewport.css_transform());
    }

    fn draw_overlays(&mut self, overlays: &[Overlay]) {
        log::debug!("{}: {} boxes", self.id, overlays.len());
    }
}

/// Load `start`, zoom in to pull the full resolution image, then follow
/// `next` links to the end of the document. Returns the pages visited.
pub async fn walk_document<S: PageSource>(
    shell: &EditorShell<S>,
    start: PageId,
    zoom: f32,
) -> Result<Vec<PageId>, EditorError> {
    let mut visited = Vec::new();
    let mut outcome = Some(shell.load_page(start).await?);

    while let Some(LoadOutcome::Loaded(page)) = outcome {
        visited.push(page.id);
        let nav = shell.nav();
        log::info!("{} | {}", nav.title, nav.filename_label);

        if zoom > 1.0 {
            shell.slider_input(zoom);
            if let Err(e) = shell.fetch_full_resolution().await {
                log::warn!("Full resolution image for page {}: {}", page.id, e);
            }
        }
        outcome = shell.next_page().await?;
    }
    Ok(visited)
}
