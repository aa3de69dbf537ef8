//! Page (document part) record as served by the part-detail endpoint.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::LOW_RES_THUMBNAIL;

/// Stable identifier of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned box `[x1, y1, x2, y2]` in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoxRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoxRect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Translate the box by a delta.
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

impl From<[f32; 4]> for BoxRect {
    fn from(b: [f32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BoxRect> for [f32; 4] {
    fn from(b: BoxRect) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Image reference of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// Full resolution image URI
    pub uri: String,
    /// Pixel size, absent when the file is missing server-side
    #[serde(default)]
    pub size: Option<(u32, u32)>,
    /// Thumbnail alias -> URI
    #[serde(default)]
    pub thumbnails: HashMap<String, String>,
}

impl PageImage {
    pub fn new(uri: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            uri: uri.into(),
            size: Some((width, height)),
            thumbnails: HashMap::new(),
        }
    }

    /// Add a thumbnail alias.
    pub fn with_thumbnail(mut self, alias: &str, uri: impl Into<String>) -> Self {
        self.thumbnails.insert(alias.to_string(), uri.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.size.map_or(0, |(w, _)| w)
    }

    pub fn height(&self) -> u32 {
        self.size.map_or(0, |(_, h)| h)
    }

    /// URI shown before the full resolution asset is fetched.
    pub fn low_res_uri(&self) -> &str {
        self.thumbnails
            .get(LOW_RES_THUMBNAIL)
            .map(String::as_str)
            .unwrap_or(&self.uri)
    }

    /// Whether a distinct lower resolution asset exists.
    pub fn has_low_res(&self) -> bool {
        self.low_res_uri() != self.uri
    }
}

/// A segmented region grouping lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub pk: u64,
    #[serde(default)]
    pub order: u32,
    #[serde(default, rename = "box")]
    pub bbox: Option<BoxRect>,
}

/// A segmented text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub pk: u64,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub block: Option<u64>,
    #[serde(rename = "box")]
    pub bbox: BoxRect,
}

/// One document image with its layout data.
///
/// Immutable once fetched; navigation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "pk")]
    pub id: PageId,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    pub image: PageImage,
    /// Binarized rendition
    #[serde(default)]
    pub bw_image: Option<PageImage>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub previous: Option<PageId>,
    #[serde(default)]
    pub next: Option<PageId>,
}

impl Page {
    /// Create a page with the minimum set of fields.
    pub fn new(id: PageId, title: impl Into<String>, image: PageImage) -> Self {
        let filename = image
            .uri
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            order: 0,
            name: String::new(),
            title: title.into(),
            filename,
            image,
            bw_image: None,
            blocks: Vec::new(),
            lines: Vec::new(),
            previous: None,
            next: None,
        }
    }

    /// Decode a part-detail JSON record.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut page: Self = serde_json::from_str(json)?;
        if page.filename.is_empty() {
            page.filename = page
                .image
                .uri
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
        }
        Ok(page)
    }

    /// Set previous/next links.
    pub fn with_links(mut self, previous: Option<PageId>, next: Option<PageId>) -> Self {
        self.previous = previous;
        self.next = next;
        self
    }

    /// Label shown next to the title, e.g. `scan.jpg (1200x1800)`.
    pub fn filename_label(&self) -> String {
        format!(
            "{} ({}x{})",
            self.filename,
            self.image.width(),
            self.image.height()
        )
    }

    /// Lines sorted in reading order.
    pub fn lines_in_order(&self) -> Vec<&Line> {
        let mut lines: Vec<&Line> = self.lines.iter().collect();
        lines.sort_by_key(|l| l.order);
        lines
    }
}
