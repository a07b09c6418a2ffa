//! Filename sanitization and deduplication.
//!
//! Gists are flat: a file name may not contain a directory separator. Snippet
//! paths may be hierarchical. Every path is flattened with `__` standing in
//! for each run of separators, the same convention used when flattening a
//! repository tree into single files.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::contract::NormalizedFile;

/// Name used when a path sanitizes to nothing.
pub const DEFAULT_FILE_NAME: &str = "file.txt";

const SEPARATOR_TOKEN: &str = "__";

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\\/]+").expect("separator pattern is valid"))
}

/// Maps a hierarchical path to a flat, non-empty file name.
pub fn sanitize_file_name(path: &str) -> String {
    let replaced = separator_runs().replace_all(path, SEPARATOR_TOKEN);
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out collision-free names across one source artifact.
///
/// The first occurrence of a name is kept as is; the Nth gets `_N` inserted
/// before its extension (`a.txt`, `a_2.txt`, `a_3.txt`). A counter is skipped
/// when the generated name was already handed out.
#[derive(Debug, Default)]
pub struct NameDeduplicator {
    seen: HashMap<String, usize>,
    assigned: HashSet<String>,
}

impl NameDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the final name for an already sanitized `name`.
    pub fn assign(&mut self, name: &str) -> String {
        let count = self.seen.entry(name.to_string()).or_insert(0);
        *count += 1;

        let mut candidate = if *count == 1 {
            name.to_string()
        } else {
            with_suffix(name, *count)
        };
        while self.assigned.contains(&candidate) {
            *count += 1;
            candidate = with_suffix(name, *count);
        }

        if candidate != name {
            debug!(original = name, renamed = %candidate, "Deduplicated colliding file name");
        }
        self.assigned.insert(candidate.clone());
        candidate
    }
}

/// `a.txt` + 2 → `a_2.txt`; `Makefile` + 2 → `Makefile_2`; `.env` + 2 → `.env_2`.
fn with_suffix(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{name}_{n}"),
    }
}

/// Sanitizes and deduplicates `(path, content)` pairs in order.
pub fn normalize_files<I, P, C>(files: I) -> Vec<NormalizedFile>
where
    I: IntoIterator<Item = (P, C)>,
    P: AsRef<str>,
    C: Into<String>,
{
    let mut names = NameDeduplicator::new();
    files
        .into_iter()
        .map(|(path, content)| NormalizedFile {
            flat_name: names.assign(&sanitize_file_name(path.as_ref())),
            content: content.into(),
        })
        .collect()
}
