//! Data models for the page editor.

mod endpoint;
mod page;

pub use endpoint::PartEndpoint;
pub use page::{Block, BoxRect, Line, Page, PageId, PageImage};
