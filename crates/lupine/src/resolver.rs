use indexmap::IndexSet;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::util::{module_path_fragment, substitute_pattern};

/// Classification of a required module name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleClass {
    /// In the configured ignore set; left unresolved for the runtime host
    Ignored,
    /// Everything else; must resolve to a file and gets inlined
    Bundled,
}

/// Probe for an existing regular file. Injectable so resolution-order tests
/// can run against a synthetic filesystem.
pub type ExistenceCheck = Box<dyn Fn(&Path) -> bool>;

pub struct ModuleResolver {
    config: Config,
    /// Cache of resolved module paths
    module_cache: HashMap<String, Option<PathBuf>>,
    /// Patterns already reported as malformed, to warn once per run
    warned_patterns: IndexSet<String>,
    exists: ExistenceCheck,
}

impl ModuleResolver {
    pub fn new(config: Config) -> Self {
        Self::with_existence_check(config, Box::new(|path: &Path| path.is_file()))
    }

    /// Create a resolver with a custom existence check (used by tests to
    /// exercise pattern ordering without touching a real filesystem).
    pub fn with_existence_check(config: Config, exists: ExistenceCheck) -> Self {
        Self {
            config,
            module_cache: HashMap::new(),
            warned_patterns: IndexSet::new(),
            exists,
        }
    }

    /// Classify a module name. Membership in the ignore set is decided
    /// before any filesystem probing happens.
    pub fn classify(&self, module_name: &str) -> ModuleClass {
        if self.config.ignored_modules.contains(module_name) {
            ModuleClass::Ignored
        } else {
            ModuleClass::Bundled
        }
    }

    /// Resolve a module name to the first existing regular file among the
    /// configured path patterns, in declared order.
    ///
    /// The winning pattern's substituted path is returned verbatim, with no
    /// normalization: when two patterns point at the same physical file the
    /// earlier pattern's spelling wins.
    pub fn resolve_module_path(&mut self, module_name: &str) -> Option<PathBuf> {
        if let Some(cached_path) = self.module_cache.get(module_name) {
            return cached_path.clone();
        }

        let resolved = self.probe_patterns(module_name);
        self.module_cache
            .insert(module_name.to_string(), resolved.clone());
        resolved
    }

    fn probe_patterns(&mut self, module_name: &str) -> Option<PathBuf> {
        let fragment = module_path_fragment(module_name);

        // Borrow patterns by clone so the malformed-pattern warning can
        // record state on self while iterating
        let patterns = self.config.src_patterns.clone();
        for pattern in &patterns {
            let Some(candidate) = substitute_pattern(pattern, &fragment) else {
                if self.warned_patterns.insert(pattern.clone()) {
                    warn!("Path pattern {:?} has no '?' placeholder; treating as non-matching", pattern);
                }
                continue;
            };
            let candidate = PathBuf::from(candidate);
            if (self.exists)(&candidate) {
                debug!("Resolved '{}' via pattern {:?}: {:?}", module_name, pattern, candidate);
                return Some(candidate);
            }
        }

        debug!("No pattern matched module '{}'", module_name);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::MAIN_SEPARATOR;

    fn resolver_with_files(config: Config, files: &[&str]) -> ModuleResolver {
        let files: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
        ModuleResolver::with_existence_check(
            config,
            Box::new(move |path: &Path| files.iter().any(|f| f == path)),
        )
    }

    fn config_with_patterns(patterns: &[&str]) -> Config {
        Config {
            src_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_matching_pattern_wins() {
        let config = config_with_patterns(&["?.lua", "src/?.lua"]);
        let existing = format!("src{}foo{}bar.lua", MAIN_SEPARATOR, MAIN_SEPARATOR);
        let mut resolver = resolver_with_files(config, &[&existing]);

        assert_eq!(
            resolver.resolve_module_path("foo.bar"),
            Some(PathBuf::from(existing))
        );
    }

    #[test]
    fn test_earlier_pattern_shadows_later_match() {
        let config = config_with_patterns(&["?.lua", "src/?.lua"]);
        let shallow = "util.lua".to_string();
        let deep = format!("src{}util.lua", MAIN_SEPARATOR);
        let mut resolver = resolver_with_files(config, &[&shallow, &deep]);

        // Both patterns match; the declared order breaks the tie
        assert_eq!(
            resolver.resolve_module_path("util"),
            Some(PathBuf::from("util.lua"))
        );
    }

    #[test]
    fn test_unresolved_module() {
        let config = config_with_patterns(&["?.lua"]);
        let mut resolver = resolver_with_files(config, &[]);

        assert_eq!(resolver.resolve_module_path("missing.module"), None);
    }

    #[test]
    fn test_malformed_pattern_is_non_matching() {
        let config = config_with_patterns(&["vendored.lua", "?.lua"]);
        let mut resolver = resolver_with_files(config, &["foo.lua", "vendored.lua"]);

        // The placeholder-less pattern is skipped even though the literal
        // path exists; the well-formed pattern still resolves
        assert_eq!(
            resolver.resolve_module_path("foo"),
            Some(PathBuf::from("foo.lua"))
        );
    }

    #[test]
    fn test_ignored_modules_classify_before_probing() {
        let mut config = config_with_patterns(&["?.lua"]);
        config.ignored_modules.insert("lib.moonloader".to_string());

        // An existence check that panics proves classification never probes
        let resolver = ModuleResolver::with_existence_check(
            config,
            Box::new(|_: &Path| panic!("ignore filter must not touch the filesystem")),
        );

        assert_eq!(resolver.classify("lib.moonloader"), ModuleClass::Ignored);
        assert_eq!(resolver.classify("lib.other"), ModuleClass::Bundled);
    }

    #[test]
    fn test_resolution_is_cached() {
        let config = config_with_patterns(&["?.lua"]);
        // Count probe invocations through a cell captured by the closure
        use std::cell::Cell;
        use std::rc::Rc;
        let counter = Rc::new(Cell::new(0));
        let counter_inner = Rc::clone(&counter);
        let mut resolver = ModuleResolver::with_existence_check(
            config,
            Box::new(move |_: &Path| {
                counter_inner.set(counter_inner.get() + 1);
                true
            }),
        );

        resolver.resolve_module_path("cached");
        let calls = counter.get();
        resolver.resolve_module_path("cached");
        assert_eq!(counter.get(), calls);
    }
}
