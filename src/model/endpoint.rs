//! Per-part API endpoint template.

use crate::constants::DEFAULT_PART_ENDPOINT;
use crate::model::PageId;

/// Resolves `{document}` / `{part}` placeholders into a part URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartEndpoint {
    template: String,
    document_id: u64,
}

impl PartEndpoint {
    pub fn new(template: impl Into<String>, document_id: u64) -> Self {
        Self {
            template: template.into(),
            document_id,
        }
    }

    /// Endpoint with the default template.
    pub fn for_document(document_id: u64) -> Self {
        Self::new(DEFAULT_PART_ENDPOINT, document_id)
    }

    /// URL of one part record.
    pub fn url(&self, page_id: PageId) -> String {
        self.template
            .replace("{document}", &self.document_id.to_string())
            .replace("{part}", &page_id.to_string())
    }

    pub fn document_id(&self) -> u64 {
        self.document_id
    }
}
