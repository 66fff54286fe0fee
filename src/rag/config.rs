//! Pipeline Configuration

use std::time::Duration;

/// Separator placed between retrieved messages in the prompt
pub const DEFAULT_SEPARATOR: &str = "\n---\n";

/// Per-request pipeline settings
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Keep only the best N matches (None = all)
    pub top_k: Option<usize>,

    /// Joins retrieved messages in the prompt context
    pub separator: String,

    /// Upper bound on a whole `ask` (None = unbounded)
    pub request_timeout: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            request_timeout: None,
        }
    }
}

impl RagConfig {
    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}
