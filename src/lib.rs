//! pagesync - panel synchronization and viewport engine of a page editor
//!
//! Several panels show the same document page side by side (source image,
//! segmentation, transcription). They share one zoom/pan viewport, follow
//! page navigation together, and remember which of them are open.

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod image_loader;
pub mod model;
pub mod navigator;
pub mod observer;
pub mod panel;
pub mod request;
pub mod shell;
pub mod undo;
pub mod viewport;
pub mod visibility;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(test)]
mod testing;

pub use context::EditorContext;
pub use error::EditorError;
pub use shell::EditorShell;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
