//! What a pipeline run did, including every block that could not be handled.

use log::{info, warn};
use std::time::Duration;

use crate::errors::{BlockFailure, FailureKind};

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Pages written to the output
    pub pages: u32,
    /// Text blocks found on those pages
    pub blocks: usize,
    /// Blocks whose text was replaced
    pub translated: usize,
    /// Translations answered from the cache
    pub cache_hits: usize,
    /// Blocks drawn at the minimum size and still too large for their box
    pub overflowing: usize,
    pub failures: Vec<BlockFailure>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn count(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One line per failure, for the issues log
    pub fn issues(&self) -> String {
        let mut out = String::new();
        for failure in &self.failures {
            out.push_str(&failure.to_string());
            out.push('\n');
        }
        out
    }

    /// Short human readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} page(s), {} block(s), {} translated, {} from cache, {} failed ({} translation, {} redaction, {} insertion)",
            self.pages,
            self.blocks,
            self.translated,
            self.cache_hits,
            self.failure_count(),
            self.count(FailureKind::Translation),
            self.count(FailureKind::Redaction),
            self.count(FailureKind::Insertion),
        )
    }

    pub fn log_summary(&self) {
        info!("{}", self.summary());
        if self.overflowing > 0 {
            warn!("{} block(s) overflow their box at the minimum font size", self.overflowing);
        }
        for failure in &self.failures {
            warn!("{}", failure);
        }
    }
}
