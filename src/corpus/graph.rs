//! Directed dependency graph over corpus entry ids.
//!
//! Edge direction is "depends on": an Encryption Policy depending on a
//! Key Management Policy holds an edge encryption -> key-management. The
//! graph must be acyclic at every observation point; mutations run the
//! cycle check before they commit.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::errors::CorpusError;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// node -> set of nodes it depends on.
    edges: BTreeMap<Uuid, BTreeSet<Uuid>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: Uuid) {
        self.edges.entry(id).or_default();
    }

    pub fn remove_node(&mut self, id: &Uuid) {
        self.edges.remove(id);
        for deps in self.edges.values_mut() {
            deps.remove(id);
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.edges.contains_key(id)
    }

    pub fn dependencies_of(&self, id: &Uuid) -> BTreeSet<Uuid> {
        self.edges.get(id).cloned().unwrap_or_default()
    }

    /// Nodes holding an edge onto `id`.
    pub fn dependents_of(&self, id: &Uuid) -> Vec<Uuid> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(id))
            .map(|(node, _)| *node)
            .collect()
    }

    /// Replaces the dependency set of `id`, validating acyclicity. On a
    /// cycle the graph is left unchanged and the offending node reported.
    pub fn set_dependencies(
        &mut self,
        id: Uuid,
        dependencies: BTreeSet<Uuid>,
    ) -> Result<(), CorpusError> {
        let previous = self.edges.insert(id, dependencies);
        if let Some(cycle_node) = self.find_cycle() {
            match previous {
                Some(previous) => {
                    self.edges.insert(id, previous);
                }
                None => {
                    self.edges.remove(&id);
                }
            }
            return Err(CorpusError::Cycle(cycle_node));
        }
        Ok(())
    }

    /// Rewrites every edge pointing at `retired` to point at each of its
    /// `successors` instead. Fails when a dependent would be left without
    /// any successor to depend on.
    pub fn rewrite_edges(
        &mut self,
        retired: &Uuid,
        successors: &[Uuid],
    ) -> Result<(), CorpusError> {
        let dependents = self.dependents_of(retired);
        if !dependents.is_empty() && successors.is_empty() {
            return Err(CorpusError::DanglingDependency {
                retired: *retired,
                dependent: dependents[0],
            });
        }
        let snapshot = self.edges.clone();
        for dependent in &dependents {
            if let Some(deps) = self.edges.get_mut(dependent) {
                deps.remove(retired);
                for successor in successors {
                    if successor != dependent {
                        deps.insert(*successor);
                    }
                }
            }
        }
        self.edges.remove(retired);
        if let Some(cycle_node) = self.find_cycle() {
            self.edges = snapshot;
            return Err(CorpusError::Cycle(cycle_node));
        }
        Ok(())
    }

    /// All edges as (dependent, dependency) pairs, in stable order.
    pub fn edge_list(&self) -> Vec<(Uuid, Uuid)> {
        let mut list = Vec::new();
        for (node, deps) in &self.edges {
            for dep in deps {
                list.push((*node, *dep));
            }
        }
        list
    }

    /// Depth-first cycle scan; returns a node on a cycle, if any.
    pub fn find_cycle(&self) -> Option<Uuid> {
        let mut visited: BTreeSet<Uuid> = BTreeSet::new();
        let mut in_stack: BTreeSet<Uuid> = BTreeSet::new();
        for node in self.edges.keys() {
            if !visited.contains(node) {
                if let Some(found) = self.visit(*node, &mut visited, &mut in_stack) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    fn visit(
        &self,
        node: Uuid,
        visited: &mut BTreeSet<Uuid>,
        in_stack: &mut BTreeSet<Uuid>,
    ) -> Option<Uuid> {
        visited.insert(node);
        in_stack.insert(node);
        if let Some(deps) = self.edges.get(&node) {
            for dep in deps {
                if in_stack.contains(dep) {
                    return Some(*dep);
                }
                if !visited.contains(dep) {
                    if let Some(found) = self.visit(*dep, visited, in_stack) {
                        return Some(found);
                    }
                }
            }
        }
        in_stack.remove(&node);
        None
    }
}
