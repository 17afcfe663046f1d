//! Dependency graph over resolved targets.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::DiGraph;

use crate::core::target::TargetSpec;

/// Target dependency graph. Edges point from a dependency to its dependent.
pub struct TargetGraph<'a> {
    graph: DiGraph<&'a str, ()>,
}

impl<'a> TargetGraph<'a> {
    /// Build the graph, rejecting duplicate names and dangling dependencies.
    pub fn new(targets: &'a [TargetSpec]) -> Result<Self, String> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for target in targets {
            let node = graph.add_node(target.name.as_str());
            if index.insert(target.name.as_str(), node).is_some() {
                return Err(format!("duplicate target `{}`", target.name));
            }
        }

        for target in targets {
            let to = index[target.name.as_str()];
            for dep in &target.depends_on {
                let from = *index.get(dep.as_str()).ok_or_else(|| {
                    format!("target `{}` depends on unknown target `{}`", target.name, dep)
                })?;
                graph.add_edge(from, to, ());
            }
        }

        Ok(TargetGraph { graph })
    }

    /// A valid build order, or the name of a target on a cycle.
    pub fn topological_order(&self) -> Result<Vec<&'a str>, String> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| {
                format!(
                    "dependency cycle through target `{}`",
                    self.graph[cycle.node_id()]
                )
            })
    }

    /// Graphviz rendering of the graph.
    pub fn to_dot(&self) -> String {
        format!("{:?}", Dot::with_config(&self.graph, &[DotConfig::EdgeNoLabel]))
    }
}

/// Check that `targets` is a valid build order.
///
/// Names must be unique, every dependency must be present, the relation must
/// be acyclic, and no target may appear before one it depends on.
pub fn check_build_order(targets: &[TargetSpec]) -> Result<(), String> {
    let graph = TargetGraph::new(targets)?;
    graph.topological_order()?;

    let position: HashMap<&str, usize> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    for (i, target) in targets.iter().enumerate() {
        for dep in &target.depends_on {
            if position[dep.as_str()] > i {
                return Err(format!(
                    "target `{}` is ordered before its dependency `{}`",
                    target.name, dep
                ));
            }
        }
    }

    Ok(())
}

/// Predicate form of [`check_build_order`].
pub fn is_build_order(targets: &[TargetSpec]) -> bool {
    check_build_order(targets).is_ok()
}
