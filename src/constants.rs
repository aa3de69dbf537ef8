//! Global constants for the page editor

/// Smallest allowed viewport scale
pub const MIN_SCALE: f32 = 1.0;

/// Largest allowed viewport scale
pub const MAX_SCALE: f32 = 10.0;

/// Step of the zoom range input
pub const SLIDER_STEP: f32 = 0.1;

/// Maximum number of entries kept in the undo history
pub const UNDO_HISTORY_LIMIT: usize = 100;

/// Days an "open" panel flag survives in persistent storage
pub const VISIBILITY_EXPIRY_DAYS: u64 = 30;

/// Per-part API endpoint template
pub const DEFAULT_PART_ENDPOINT: &str = "/api/documents/{document}/parts/{part}/";

/// Thumbnail alias used as the low-resolution image
pub const LOW_RES_THUMBNAIL: &str = "large";

/// Registered panel names, in registration order.
pub mod panels {
    pub const SOURCE: &str = "source";
    pub const SEGMENTATION: &str = "seg";
    pub const TRANSCRIPTION: &str = "trans";

    /// Container id suffix; also the persistence key suffix.
    pub const CONTAINER_SUFFIX: &str = "-panel";
    /// Toolbar id suffix.
    pub const TOOLS_SUFFIX: &str = "-tools";

    /// Container identifier for a panel name (e.g. `source-panel`).
    pub fn container_id(name: &str) -> String {
        format!("{name}{CONTAINER_SUFFIX}")
    }

    /// Toolbar identifier for a panel name (e.g. `source-tools`).
    pub fn tools_id(name: &str) -> String {
        format!("{name}{TOOLS_SUFFIX}")
    }
}

/// DOM key codes handled by the shell.
pub mod keys {
    pub const PAGE_UP: u32 = 33;
    pub const PAGE_DOWN: u32 = 34;
}
