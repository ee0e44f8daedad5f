use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dependency_graph::{DependencyGraph, ModuleNode};
use crate::emit::CodeEmitter;
use crate::requires::extract_requires;
use crate::resolver::{ModuleClass, ModuleResolver};

/// Type alias for module processing queue
type ModuleQueue = Vec<(String, PathBuf)>;

pub struct Bundler {
    config: Config,
}

impl Bundler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Main bundling function
    pub fn bundle(&mut self, entry_path: &Path, output_path: &Path) -> Result<()> {
        info!("Starting bundle process");
        debug!("Entry: {:?}, Output: {:?}", entry_path, output_path);

        // A missing entry must fail before the output path is touched
        if !entry_path.is_file() {
            return Err(anyhow!("Entry file not found: {:?}", entry_path));
        }

        let mut resolver = ModuleResolver::new(self.config.clone());

        let entry_module_name = entry_module_name(entry_path)?;
        info!("Entry module: {}", entry_module_name);

        let graph = self.build_dependency_graph(entry_path, &entry_module_name, &mut resolver)?;

        let sorted_names = self.module_emission_order(&graph, &entry_module_name)?;
        info!("Found {} modules to bundle", sorted_names.len());

        let sorted_modules: Vec<&ModuleNode> = sorted_names
            .iter()
            .map(|name| {
                graph
                    .get_module(name)
                    .ok_or_else(|| anyhow!("Module vanished from graph: {}", name))
            })
            .collect::<Result<_>>()?;
        for (i, module) in sorted_modules.iter().enumerate() {
            debug!("Module {}: {} ({:?})", i, module.name, module.path);
        }

        let emitter = CodeEmitter::new(self.config.isolate, &self.config.lua_version);
        let bundled_code = emitter.emit_bundle(&sorted_modules, &entry_module_name)?;

        write_output(output_path, &bundled_code)?;
        info!("Bundle written to: {:?}", output_path);

        Ok(())
    }

    /// Decide emission order: dependency-first when the graph is acyclic.
    ///
    /// Cycles are not fatal: the emitted shim loads modules lazily and
    /// carries a loading placeholder, so mutually-requiring modules behave
    /// the same as they would under the host `require`. Discovery order is
    /// used instead, with a warning naming the cycle.
    fn module_emission_order(
        &self,
        graph: &DependencyGraph,
        entry_module_name: &str,
    ) -> Result<Vec<String>> {
        if graph.has_cycles() {
            for cycle in graph.find_cycle_paths() {
                warn!("Circular requires detected: {}", cycle.join(" -> "));
            }
            warn!("Emitting modules in discovery order; the lazy require shim tolerates cycles");
            let mut names: Vec<String> = vec![entry_module_name.to_string()];
            names.extend(
                graph
                    .get_modules()
                    .into_iter()
                    .map(|m| m.name.clone())
                    .filter(|name| name != entry_module_name),
            );
            return Ok(names);
        }

        Ok(graph
            .topological_sort()?
            .into_iter()
            .map(|m| m.name.clone())
            .collect())
    }

    /// Build the complete dependency graph starting from the entry module
    fn build_dependency_graph(
        &self,
        entry_path: &Path,
        entry_module_name: &str,
        resolver: &mut ModuleResolver,
    ) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut processed_modules: HashSet<String> = HashSet::new();
        let mut queued_modules: HashSet<String> = HashSet::new();
        let mut modules_to_process = ModuleQueue::new();
        modules_to_process.push((entry_module_name.to_string(), entry_path.to_path_buf()));
        queued_modules.insert(entry_module_name.to_string());

        type ModuleData = (String, PathBuf, Vec<String>);
        let mut all_modules: Vec<ModuleData> = Vec::new();

        // Phase 1: discover all modules
        while let Some((module_name, module_path)) = modules_to_process.pop() {
            debug!("Discovering module: {} ({:?})", module_name, module_path);
            if processed_modules.contains(&module_name) {
                continue;
            }

            let source = fs::read_to_string(&module_path)
                .with_context(|| format!("Failed to read module file: {:?}", module_path))?;
            let requires = extract_requires(&source);
            debug!("Extracted requires from {}: {:?}", module_name, requires);

            all_modules.push((module_name.clone(), module_path, requires.clone()));
            processed_modules.insert(module_name.clone());

            for required in requires {
                match resolver.classify(&required) {
                    ModuleClass::Ignored => {
                        debug!("'{}' is ignored; deferring to the runtime host", required);
                    }
                    ModuleClass::Bundled => {
                        let required_path =
                            resolver.resolve_module_path(&required).ok_or_else(|| {
                                anyhow!(
                                    "unresolved module '{}' (required by '{}'): \
                                     no path pattern matched",
                                    required,
                                    module_name
                                )
                            })?;
                        if !processed_modules.contains(&required)
                            && queued_modules.insert(required.clone())
                        {
                            debug!("Adding '{}' to discovery queue", required);
                            modules_to_process.push((required, required_path));
                        }
                    }
                }
            }
        }

        debug!("Discovery complete: {} modules", all_modules.len());

        // Phase 2: add modules to the graph and create dependency edges
        for (module_name, module_path, requires) in &all_modules {
            graph.add_module(ModuleNode {
                name: module_name.clone(),
                path: module_path.clone(),
                requires: requires.clone(),
            });
        }

        for (module_name, _module_path, requires) in &all_modules {
            for required in requires {
                if resolver.classify(required) == ModuleClass::Bundled {
                    // Edge runs dependency -> dependent so the emitter sees
                    // dependencies first
                    graph.add_dependency(required, module_name)?;
                }
            }
        }

        Ok(graph)
    }
}

/// Determine the name the entry script is tracked under while bundling
fn entry_module_name(entry_path: &Path) -> Result<String> {
    entry_path
        .file_stem()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| {
            anyhow!(
                "Cannot determine module name from entry path: {:?}",
                entry_path
            )
        })
}

/// Ensure the output directory exists and write the bundle, fully replacing
/// any prior file at the destination.
fn write_output(output_path: &Path, content: &str) -> Result<()> {
    if let Some(output_dir) = output_path.parent() {
        if !output_dir.as_os_str().is_empty() {
            fs::create_dir_all(output_dir)
                .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
        }
    }

    fs::write(output_path, content)
        .with_context(|| format!("Failed to write output file: {:?}", output_path))
}
