use std::ops::RangeInclusive;
use std::path::PathBuf;

use super::constants::{DEFAULT_CLIP_EXTENSION, PAGE_DIR_PREFIX};

/// Where the batch driver looks for clips and how it treats each page.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    pub base_dir: PathBuf,
    pub pages: RangeInclusive<u32>,
    pub slots: RangeInclusive<u32>,
    /// Page whose clips are retimed without mirroring.
    pub unflipped_page: u32,
    pub extension: String,
}

impl BatchConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pages: 1..=4,
            slots: 1..=4,
            unflipped_page: 1,
            extension: DEFAULT_CLIP_EXTENSION.to_string(),
        }
    }

    pub fn page_dir(&self, page: u32) -> PathBuf {
        self.base_dir.join(format!("{PAGE_DIR_PREFIX}{page}"))
    }

    pub fn flip_for(&self, page: u32) -> bool {
        page != self.unflipped_page
    }
}
