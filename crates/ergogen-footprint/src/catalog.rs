use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::FootprintError;
use crate::registry::SourceRegistry;
use crate::resolver::Resolver;
use crate::router::Router;
use crate::script::load_module;
use crate::Footprint;

type Builtin = fn() -> Box<dyn Footprint>;

/// Looks footprints up by name: native built-ins first, then script modules
/// through the resolver. Every load returns a fresh instance.
#[derive(Debug)]
pub struct Catalog {
    resolver: Resolver,
    builtins: IndexMap<&'static str, Builtin>,
}

impl Catalog {
    pub fn new(resolver: Resolver) -> Self {
        let mut builtins: IndexMap<&'static str, Builtin> = IndexMap::new();
        builtins.insert(Router::NAME, || Box::new(Router::new()) as Box<dyn Footprint>);
        Self { resolver, builtins }
    }

    pub fn with_sources(sources: Arc<SourceRegistry>) -> Self {
        Self::new(Resolver::new(sources))
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn builtin_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.keys().copied()
    }

    /// Loads `name`. Built-in names shadow registered sources of the same
    /// bare name; a shadowed script stays reachable by its path (`router.js`).
    pub fn load(&self, name: &str) -> Result<Box<dyn Footprint>, FootprintError> {
        if let Some(make) = self.builtins.get(name) {
            let sources = self.resolver.sources();
            if sources.contains(name) || sources.contains(&format!("{name}.js")) {
                tracing::debug!(footprint = name, "built-in footprint shadows registered source");
            }
            tracing::debug!(footprint = name, "using built-in footprint");
            return Ok(make());
        }
        let source = self.resolver.resolve(name)?;
        Ok(Box::new(load_module(&source)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_shadow_registered_sources() {
        let sources = Arc::new(SourceRegistry::new());
        sources.register("router.js", "module.exports.body = () => 'script';");
        sources.register("pad.js", "module.exports.body = () => 'pad';");
        let catalog = Catalog::new(Resolver::new(sources).with_fs_fallback(false));

        assert_eq!(catalog.load("router").unwrap().name(), "router");
        assert_eq!(catalog.load("router.js").unwrap().name(), "router.js");
        assert_eq!(catalog.load("pad").unwrap().name(), "pad");
        assert_eq!(catalog.builtin_names().collect::<Vec<_>>(), vec!["router"]);
    }

    #[test]
    fn unknown_names_are_not_found() {
        let catalog = Catalog::new(
            Resolver::new(Arc::new(SourceRegistry::new())).with_fs_fallback(false),
        );
        let err = catalog.load("missing").err().expect("lookup fails");
        assert!(matches!(
            err,
            FootprintError::Resolve(crate::resolver::ResolveError::NotFound(_))
        ));
    }
}
