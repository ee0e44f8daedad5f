use anyhow::{Result, anyhow};
use indexmap::IndexSet;
use log::debug;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub name: String,
    pub path: PathBuf,
    pub requires: Vec<String>,
}

#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<ModuleNode, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
        }
    }

    /// Add a module to the graph, updating the payload if the name exists
    pub fn add_module(&mut self, module: ModuleNode) -> NodeIndex {
        let module_name = module.name.clone();

        if let Some(&existing_index) = self.node_indices.get(&module_name) {
            self.graph[existing_index] = module;
            return existing_index;
        }
        let index = self.graph.add_node(module);
        self.node_indices.insert(module_name, index);
        index
    }

    /// Add a dependency edge between two modules
    ///
    /// Edges run dependency -> dependent, so topological order yields
    /// dependencies before the modules that require them.
    pub fn add_dependency(&mut self, from_module: &str, to_module: &str) -> Result<()> {
        let from_index = self
            .node_indices
            .get(from_module)
            .ok_or_else(|| anyhow!("Module not found: {}", from_module))?;
        let to_index = self
            .node_indices
            .get(to_module)
            .ok_or_else(|| anyhow!("Module not found: {}", to_module))?;

        if !self.graph.contains_edge(*from_index, *to_index) {
            self.graph.add_edge(*from_index, *to_index, ());
        }

        Ok(())
    }

    /// Get topologically sorted modules (dependencies first)
    pub fn topological_sort(&self) -> Result<Vec<&ModuleNode>> {
        let sorted_indices = toposort(&self.graph, None).map_err(|cycle| {
            anyhow!(
                "Circular requires detected involving module: {}",
                self.graph[cycle.node_id()].name
            )
        })?;

        Ok(sorted_indices
            .iter()
            .map(|&index| &self.graph[index])
            .collect())
    }

    /// Get all modules in the graph
    pub fn get_modules(&self) -> Vec<&ModuleNode> {
        self.graph.node_weights().collect()
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&ModuleNode> {
        self.node_indices.get(name).map(|&index| &self.graph[index])
    }

    /// Get the dependencies of a module (modules that the given module requires)
    pub fn get_dependencies(&self, module_name: &str) -> Option<Vec<&str>> {
        let module_index = self.node_indices.get(module_name)?;

        Some(
            self.graph
                .neighbors_directed(*module_index, petgraph::Direction::Incoming)
                .map(|neighbor_index| self.graph[neighbor_index].name.as_str())
                .collect(),
        )
    }

    /// Check if the graph has cycles
    pub fn has_cycles(&self) -> bool {
        toposort(&self.graph, None).is_err()
    }

    /// Get cycle paths for diagnostics using three-color DFS
    pub fn find_cycle_paths(&self) -> Vec<Vec<String>> {
        let mut visited = HashMap::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for node_index in self.graph.node_indices() {
            visited.insert(node_index, Color::White);
        }

        for node_index in self.graph.node_indices() {
            if visited[&node_index] == Color::White {
                self.dfs_find_cycles(node_index, &mut visited, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn dfs_find_cycles(
        &self,
        node: NodeIndex,
        visited: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self
            .graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
        {
            match visited[&neighbor] {
                Color::White => {
                    self.dfs_find_cycles(neighbor, visited, path, cycles);
                }
                Color::Gray => {
                    // Back edge closes a cycle
                    if let Some(cycle_start) = path.iter().position(|&n| n == neighbor) {
                        let cycle_path: Vec<String> = path[cycle_start..]
                            .iter()
                            .map(|&idx| self.graph[idx].name.clone())
                            .collect();
                        cycles.push(cycle_path);
                    }
                }
                Color::Black => {}
            }
        }

        path.pop();
        visited.insert(node, Color::Black);
    }

    /// Filter to only include modules reachable from the given entry module
    pub fn filter_reachable_from(&self, entry_module: &str) -> Result<DependencyGraph> {
        let entry_index = self
            .node_indices
            .get(entry_module)
            .copied()
            .ok_or_else(|| anyhow!("Entry module not found: {}", entry_module))?;

        debug!("Filtering from entry module: {}", entry_module);

        let visited = self.find_reachable_modules_dfs(entry_index);
        debug!("Visited {} modules total", visited.len());

        let mut filtered_graph = DependencyGraph::new();
        for &old_index in &visited {
            filtered_graph.add_module(self.graph[old_index].clone());
        }
        for &dependent_index in &visited {
            for dependency_index in self
                .graph
                .neighbors_directed(dependent_index, petgraph::Direction::Incoming)
            {
                if visited.contains(&dependency_index) {
                    filtered_graph.add_dependency(
                        &self.graph[dependency_index].name,
                        &self.graph[dependent_index].name,
                    )?;
                }
            }
        }

        Ok(filtered_graph)
    }

    /// Find all modules reachable from the entry using DFS over dependencies
    fn find_reachable_modules_dfs(&self, entry_index: NodeIndex) -> IndexSet<NodeIndex> {
        let mut visited = IndexSet::new();
        let mut stack = vec![entry_index];

        while let Some(current_index) = stack.pop() {
            if visited.insert(current_index) {
                for neighbor_index in self
                    .graph
                    .neighbors_directed(current_index, petgraph::Direction::Incoming)
                {
                    if !visited.contains(&neighbor_index) {
                        stack.push(neighbor_index);
                    }
                }
            }
        }

        visited
    }
}

/// Color enum for three-color DFS cycle detection
#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    White, // Unvisited
    Gray,  // Currently being processed
    Black, // Completely processed
}
