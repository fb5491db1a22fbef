use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

/// Process-scoped map from module path (and basename) to source text.
///
/// Owned by the host and shared by reference; inserts overwrite.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    entries: Mutex<IndexMap<String, String>>,
}

pub(crate) fn normalize_key(raw: &str) -> String {
    let mut s = raw.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    s
}

pub(crate) fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `text` under the normalized path and under its basename.
    pub fn register(&self, path: &str, text: impl Into<String>) {
        let key = normalize_key(path);
        let text = text.into();
        let base = basename(&key).to_string();
        let mut guard = self.lock();
        if base != key {
            if let Some(prev) = guard.get(&base)
                && *prev != text
            {
                tracing::debug!(path = %key, basename = %base, "basename entry replaced");
            }
            guard.insert(base, text.clone());
        }
        guard.insert(key, text);
    }

    pub fn register_all(&self, map: IndexMap<String, String>) {
        for (path, text) in map {
            self.register(&path, text);
        }
    }

    /// Registers every `*.js` file below `dir`, keyed by its path relative to `dir`.
    pub fn register_dir(&self, dir: &Path) -> io::Result<usize> {
        let mut count = 0;
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            let mut entries = std::fs::read_dir(&current)?
                .collect::<Result<Vec<_>, _>>()?;
            entries.sort_by_key(|e| e.path());
            for entry in entries {
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().is_none_or(|ext| ext != "js") {
                    continue;
                }
                let rel = path.strip_prefix(dir).unwrap_or(&path);
                let text = std::fs::read_to_string(&path)?;
                self.register(&rel.to_string_lossy(), text);
                count += 1;
            }
        }
        tracing::debug!(dir = %dir.display(), count, "registered footprint sources");
        Ok(count)
    }

    /// Exact lookup on the normalized key.
    pub fn get(&self, path: &str) -> Option<String> {
        self.lock().get(&normalize_key(path)).cloned()
    }

    /// Lookup on the basename of `path` only.
    pub fn get_by_basename(&self, path: &str) -> Option<String> {
        let key = normalize_key(path);
        self.lock().get(basename(&key)).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(&normalize_key(path))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
