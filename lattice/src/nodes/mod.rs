//! Evaluation DAG
//!
//! Nodes live in an arena owned by [`Dag`] and refer to each other by
//! [`NodeId`]. Children are ordered; parents are back-edges recorded once per
//! child slot, so `x*x` gives `x` two parent edges.
//!
//! A node with at least `cache_threshold` parent edges keeps its result per
//! [`DomainId`]. Callers always receive an owned copy, never the cached
//! buffer, and are free to mutate it.

mod eval;
pub mod kind;
mod piecewise;

pub use kind::NodeKind;

use crate::domain::{Domain, DomainId};
use crate::LatticeResult;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    /// Text the node was parsed from
    pub label: String,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,
    /// This node and all of its descendants can be evaluated block by block
    pub splittable: bool,
    cache: RefCell<HashMap<DomainId, Vec<f64>>>,
}

#[derive(Debug)]
pub struct Dag {
    nodes: Vec<Node>,
    cache_threshold: usize,
}

impl Dag {
    pub fn new(cache_threshold: usize) -> Self {
        Self {
            nodes: Vec::new(),
            cache_threshold,
        }
    }

    /// Append a node whose children already exist and record the parent edges.
    pub fn add(&mut self, kind: NodeKind, label: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let splittable = kind.is_splittable(children.len())
            && children.iter().all(|child| self.nodes[child.0].splittable);
        for child in &children {
            self.nodes[child.0].parents.push(id);
        }
        self.nodes.push(Node {
            id,
            label: label.into(),
            kind,
            children,
            parents: Vec::new(),
            splittable,
            cache: RefCell::new(HashMap::new()),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cache_threshold(&self) -> usize {
        self.cache_threshold
    }

    pub fn is_splittable(&self, id: NodeId) -> bool {
        self.nodes[id.0].splittable
    }

    /// One value per domain point, owned by the caller.
    pub fn evaluate(&self, id: NodeId, domain: &Domain) -> LatticeResult<Vec<f64>> {
        let node = &self.nodes[id.0];
        if node.parents.len() < self.cache_threshold {
            return self.compute(node, domain);
        }

        let cached = node.cache.borrow().get(&domain.id()).cloned();
        if let Some(values) = cached {
            trace!(node = %node.label, domain = ?domain.id(), "cache hit");
            return Ok(values);
        }

        let values = self.compute(node, domain)?;
        node.cache
            .borrow_mut()
            .insert(domain.id(), values.clone());
        Ok(values)
    }

    pub fn is_cached(&self, id: NodeId, domain: &Domain) -> bool {
        self.nodes[id.0].cache.borrow().contains_key(&domain.id())
    }

    /// Drop cached results of `id` and everything below it.
    pub fn clear_cache(&self, id: NodeId) {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let node = &self.nodes[current.0];
            node.cache.borrow_mut().clear();
            stack.extend(node.children.iter().copied());
        }
    }

    /// Distinct parents of `id` whose kind satisfies `predicate`
    pub fn parents_of_kind<F>(&self, id: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&NodeKind) -> bool,
    {
        let mut seen = HashSet::new();
        self.nodes[id.0]
            .parents
            .iter()
            .copied()
            .filter(|parent| seen.insert(*parent))
            .filter(|parent| predicate(&self.nodes[parent.0].kind))
            .collect()
    }

    /// Substitution bound to `parameter` at a domain-transformation call site
    pub fn transformation(&self, id: NodeId, parameter: &str) -> Option<NodeId> {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::DomainTransformation { parameters, .. } if node.children.len() > 1 => {
                let position = parameters.iter().position(|p| p == parameter)?;
                node.children.get(position + 1).copied()
            }
            _ => None,
        }
    }

    /// Domain variables an expression reads
    ///
    /// Bound domain transformations are not entered; only their substitution
    /// expressions count. A bare reference to a user function contributes the
    /// function's formal parameters (or, for a function without parameters,
    /// whatever its body reads). Sampled functions contribute their
    /// independent variables.
    pub fn free_variables(&self, id: NodeId) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect_free_variables(id, &mut names, &mut visited);
        names
    }

    fn collect_free_variables(
        &self,
        id: NodeId,
        names: &mut BTreeSet<String>,
        visited: &mut HashSet<NodeId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Variable(name) => {
                names.insert(name.clone());
            }
            NodeKind::NumericFunction1D { variable, .. } => {
                names.insert(variable.clone());
            }
            NodeKind::NumericFunction2D { variables, .. } => {
                names.insert(variables.0.clone());
                names.insert(variables.1.clone());
            }
            NodeKind::DomainTransformation { parameters, .. } => {
                if node.children.len() > 1 {
                    for substitution in &node.children[1..] {
                        self.collect_free_variables(*substitution, names, visited);
                    }
                } else if !parameters.is_empty() {
                    names.extend(parameters.iter().cloned());
                } else {
                    for child in &node.children {
                        self.collect_free_variables(*child, names, visited);
                    }
                }
            }
            _ => {
                for child in &node.children {
                    self.collect_free_variables(*child, names, visited);
                }
            }
        }
    }

    /// Whether the expression at `id` reads the domain variable `name`
    pub fn references_name(&self, id: NodeId, name: &str) -> bool {
        self.free_variables(id).contains(name)
    }
}
