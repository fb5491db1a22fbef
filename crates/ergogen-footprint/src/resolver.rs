use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::registry::{SourceRegistry, basename};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("footprint module not found: {0}")]
    NotFound(String),
    #[error("resolver override hook is already set")]
    OverrideAlreadySet,
    #[error("could not read footprint module {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Host-supplied loader consulted after the registry and before the filesystem.
pub type OverrideHook = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Source text together with the identity it was resolved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub id: String,
    pub text: String,
}

impl ModuleSource {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

pub struct Resolver {
    sources: Arc<SourceRegistry>,
    hook: OnceLock<OverrideHook>,
    fs_fallback: bool,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("sources", &self.sources.len())
            .field("hook", &self.hook.get().is_some())
            .field("fs_fallback", &self.fs_fallback)
            .finish()
    }
}

impl Resolver {
    pub fn new(sources: Arc<SourceRegistry>) -> Self {
        Self {
            sources,
            hook: OnceLock::new(),
            fs_fallback: true,
        }
    }

    pub fn with_fs_fallback(mut self, enabled: bool) -> Self {
        self.fs_fallback = enabled;
        self
    }

    pub fn sources(&self) -> &Arc<SourceRegistry> {
        &self.sources
    }

    /// Installs the override hook. Only the first call succeeds.
    pub fn set_override(&self, hook: OverrideHook) -> Result<(), ResolveError> {
        self.hook
            .set(hook)
            .map_err(|_| ResolveError::OverrideAlreadySet)
    }

    pub fn resolve_source(&self, path: &str) -> Result<String, ResolveError> {
        self.resolve(path).map(|m| m.text)
    }

    /// Locates the source for `path`: registry by full path, registry by
    /// basename, override hook, then the filesystem.
    pub fn resolve(&self, path: &str) -> Result<ModuleSource, ResolveError> {
        let candidates = candidates(path);

        for candidate in &candidates {
            if let Some(text) = self.sources.get(candidate) {
                tracing::debug!(path, candidate = %candidate, "resolved from registry");
                return Ok(ModuleSource::new(path, text));
            }
        }
        for candidate in &candidates {
            if let Some(text) = self.sources.get_by_basename(candidate) {
                tracing::debug!(path, basename = basename(candidate), "resolved by basename");
                return Ok(ModuleSource::new(path, text));
            }
        }
        if let Some(hook) = self.hook.get() {
            tracing::debug!(path, "resolved through override hook");
            return Ok(ModuleSource::new(path, hook(path)));
        }
        if self.fs_fallback {
            for candidate in &candidates {
                let file = Path::new(candidate);
                if !file.is_file() {
                    continue;
                }
                let text = std::fs::read_to_string(file).map_err(|source| ResolveError::Io {
                    path: file.to_path_buf(),
                    source,
                })?;
                tracing::debug!(path, file = %file.display(), "resolved from filesystem");
                return Ok(ModuleSource::new(path, text));
            }
        }
        Err(ResolveError::NotFound(path.to_string()))
    }
}

fn candidates(path: &str) -> Vec<String> {
    let mut out = vec![path.to_string()];
    if Path::new(basename(path)).extension().is_none() {
        out.push(format!("{path}.js"));
    }
    out
}
