//! Splits a normalized file list into batches that respect the snippet
//! file-count cap.

use crate::contract::{NormalizedFile, PartInfo};

/// An ordered group of `1..=limit` files destined for one target artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 0-based position among all batches of the migration.
    pub index: usize,
    pub total: usize,
    pub files: Vec<NormalizedFile>,
}

impl Batch {
    pub fn part(&self) -> PartInfo {
        PartInfo {
            index: self.index + 1,
            total: self.total,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `base` for a single batch, `"{base} (part i/n)"` otherwise.
    pub fn title(&self, base: &str) -> String {
        if self.total > 1 {
            format!("{base} (part {}/{})", self.index + 1, self.total)
        } else {
            base.to_string()
        }
    }
}

/// Consecutive batches of exactly `limit` files; the last one holds the
/// remainder. Zero files give zero batches. A `limit` of zero is treated as 1.
pub fn chunk_files(files: Vec<NormalizedFile>, limit: usize) -> Vec<Batch> {
    let limit = limit.max(1);
    let total = files.len().div_ceil(limit);

    let mut batches = Vec::with_capacity(total);
    let mut rest = files.into_iter().peekable();
    while rest.peek().is_some() {
        let files: Vec<NormalizedFile> = rest.by_ref().take(limit).collect();
        batches.push(Batch {
            index: batches.len(),
            total,
            files,
        });
    }
    batches
}
