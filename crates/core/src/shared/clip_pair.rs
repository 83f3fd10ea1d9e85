use std::path::{Path, PathBuf};

use super::constants::{OUTPUT_SUFFIX, SUBJECT_SUFFIX};

/// The three files involved in one slot of a page directory.
///
/// `subject` is retimed to match `reference` and written to `output`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipPair {
    pub subject: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
}

impl ClipPair {
    /// `{slot}-GT.{ext}`, `{slot}.{ext}` and `{slot}-GT-p.{ext}` inside `dir`.
    pub fn for_slot(dir: &Path, slot: u32, extension: &str) -> Self {
        let pair = Self {
            subject: dir.join(format!("{slot}{SUBJECT_SUFFIX}.{extension}")),
            reference: dir.join(format!("{slot}.{extension}")),
            output: dir.join(format!("{slot}{OUTPUT_SUFFIX}.{extension}")),
        };
        debug_assert!(pair.paths_are_distinct());
        pair
    }

    pub fn paths_are_distinct(&self) -> bool {
        self.subject != self.reference
            && self.subject != self.output
            && self.reference != self.output
    }
}

/// File name of `path` for log lines, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
