// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! DAG (Directed Acyclic Graph) builder for stage dependencies
//!
//! Stages depend on their predecessor (each stage is gated on the previous
//! one succeeding) and on every stage producing an artifact they consume.
//! Both kinds of dependency land on one edge per stage pair.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::errors::StackError;
use crate::model::ResourceGraph;

/// Why one stage must run before another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageEdge {
    /// The later stage is gated on the earlier one succeeding
    pub gated: bool,
    /// Artifacts flowing along the edge
    pub artifacts: Vec<String>,
}

impl StageEdge {
    fn label(&self) -> Option<String> {
        (!self.artifacts.is_empty()).then(|| self.artifacts.join(", "))
    }
}

/// Builder for stage dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<usize, StageEdge>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl DagBuilder {
    /// Create a new DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build a DAG from a resource graph
    pub fn build(resources: &ResourceGraph) -> Result<Self, StackError> {
        let mut builder = Self::new();
        let stages = &resources.pipeline.stages;

        // Add all stages as nodes
        let nodes: Vec<NodeIndex> = stages
            .iter()
            .enumerate()
            .map(|(idx, stage)| {
                let node = builder.graph.add_node(idx);
                builder.name_to_index.insert(stage.name.clone(), node);
                builder.index_to_name.insert(node, stage.name.clone());
                node
            })
            .collect();

        // Sequential gates
        for pair in nodes.windows(2) {
            builder.edge_mut(pair[0], pair[1]).gated = true;
        }

        // Artifact flow
        let producers = resources.producers();
        for (consumer_idx, stage) in stages.iter().enumerate() {
            for artifact in stage.inputs() {
                let Some(producer_idx) = producers
                    .get(artifact)
                    .and_then(|p| p.first())
                    .map(|(idx, _)| *idx)
                else {
                    return Err(StackError::UnknownArtifact {
                        stage: stage.name.clone(),
                        artifact: artifact.name().to_string(),
                    });
                };

                let edge = builder.edge_mut(nodes[producer_idx], nodes[consumer_idx]);
                if !edge.artifacts.iter().any(|a| a == artifact.name()) {
                    edge.artifacts.push(artifact.name().to_string());
                }
            }
        }

        // Validate no cycles
        builder.validate_acyclic()?;

        Ok(builder)
    }

    fn edge_mut(&mut self, from: NodeIndex, to: NodeIndex) -> &mut StageEdge {
        let edge = match self.graph.find_edge(from, to) {
            Some(e) => e,
            None => self.graph.add_edge(from, to, StageEdge::default()),
        };
        &mut self.graph[edge]
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), StackError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(StackError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            }),
        }
    }

    /// Find the stages on a cycle through `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let mut members: Vec<String> = self
            .graph
            .node_indices()
            .filter(|&n| {
                n == start
                    || (petgraph::algo::has_path_connecting(&self.graph, start, n, None)
                        && petgraph::algo::has_path_connecting(&self.graph, n, start, None))
            })
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        members.dedup();
        members
    }

    /// Get topologically sorted stage indices
    pub fn topological_order(&self) -> Result<Vec<usize>, StackError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| StackError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Get topologically sorted stage names
    pub fn topological_order_names(&self) -> Result<Vec<String>, StackError> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect()
            })
            .map_err(|cycle| StackError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Get dependencies for a stage (stages that must run before it)
    pub fn dependencies(&self, stage_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .collect();
        deps.sort();
        Some(deps.into_iter().map(|n| self.index_to_name[&n].clone()).collect())
    }

    /// Get dependents for a stage (stages that depend on it)
    pub fn dependents(&self, stage_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Outgoing)
            .collect();
        deps.sort();
        Some(deps.into_iter().map(|n| self.index_to_name[&n].clone()).collect())
    }

    /// Artifacts a stage receives, with the stage producing each
    pub fn inbound_artifacts(&self, stage_name: &str) -> Vec<(String, String)> {
        let Some(node) = self.name_to_index.get(stage_name) else {
            return Vec::new();
        };
        let mut out: Vec<(String, String)> = self
            .graph
            .edges_directed(*node, petgraph::Direction::Incoming)
            .flat_map(|e| {
                let from = self.index_to_name[&e.source()].clone();
                e.weight()
                    .artifacts
                    .iter()
                    .map(move |a| (a.clone(), from.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort();
        out
    }

    /// Check if stage A depends (directly or transitively) on stage B
    pub fn depends_on(&self, stage_a: &str, stage_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(stage_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(stage_b) else {
            return false;
        };

        node_a != node_b && petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn sorted_edges(&self) -> Vec<(String, String, &StageEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((from, to, &self.graph[e]))
            })
            .collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));
        edges
            .into_iter()
            .map(|(from, to, w)| {
                (
                    self.index_to_name[&from].clone(),
                    self.index_to_name[&to].clone(),
                    w,
                )
            })
            .collect()
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.graph.node_indices() {
            let name = &self.index_to_name[&node];
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for (from, to, edge) in self.sorted_edges() {
            match edge.label() {
                Some(label) => out.push_str(&format!("    {} -->|{}| {}\n", from, label, to)),
                None => out.push_str(&format!("    {} --> {}\n", from, to)),
            }
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=LR;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to, edge) in self.sorted_edges() {
            let mut attrs = Vec::new();
            if let Some(label) = edge.label() {
                attrs.push(format!("label=\"{}\"", label));
            }
            if !edge.gated {
                attrs.push("style=dashed".to_string());
            }
            if attrs.is_empty() {
                out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
            } else {
                out.push_str(&format!(
                    "    \"{}\" -> \"{}\" [{}];\n",
                    from,
                    to,
                    attrs.join(", ")
                ));
            }
        }

        // Add isolated nodes (no edges)
        for node in self.graph.node_indices() {
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", self.index_to_name[&node]));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, resources: &ResourceGraph) -> Result<String, StackError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let stage = &resources.pipeline.stages[*idx];
            let providers: Vec<&str> = stage.actions.iter().map(|a| a.provider()).collect();

            out.push_str(&format!("{}. {} ({})", i + 1, stage.name, providers.join(", ")));

            let inbound = self.inbound_artifacts(&stage.name);
            if !inbound.is_empty() {
                let consumes: Vec<String> = inbound
                    .iter()
                    .map(|(artifact, from)| format!("{} from {}", artifact, from))
                    .collect();
                out.push_str(&format!(" [consumes: {}]", consumes.join(", ")));
            }

            let produces: Vec<&str> = stage.outputs().map(|a| a.name()).collect();
            if !produces.is_empty() {
                out.push_str(&format!(" [produces: {}]", produces.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}
