//! File dependency graph: fetching and client-side filtering
//!
//! The server computes nodes and links; the client only narrows the graph by
//! node type and link strength and drops links left without both endpoints.

use crate::client::ProxyClient;
use crate::error::SourceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub repo: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Import,
    Export,
    Dependency,
    Reference,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_strength() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_links: usize,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraphRequest {
    pub repositories: Vec<String>,
    pub file_types: Vec<String>,
    pub max_files: usize,
    pub model: String,
}

impl DependencyGraphRequest {
    pub fn new(repositories: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            repositories,
            file_types: Vec::new(),
            max_files: 100,
            model: model.into(),
        }
    }

    pub fn with_file_types(mut self, file_types: Vec<String>) -> Self {
        self.file_types = file_types;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphFilter {
    /// Node types to keep; `None` keeps every type.
    pub node_types: Option<HashSet<String>>,
    pub min_strength: f64,
}

impl GraphFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min_strength(mut self, min_strength: f64) -> Self {
        self.min_strength = min_strength;
        self
    }
}

impl DependencyGraph {
    /// Nodes matching the filter, and links that meet the strength floor and
    /// whose endpoints both survived.
    pub fn filtered(&self, filter: &GraphFilter) -> DependencyGraph {
        let nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .filter(|node| {
                filter
                    .node_types
                    .as_ref()
                    .map_or(true, |types| types.contains(&node.node_type))
            })
            .cloned()
            .collect();

        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let links: Vec<GraphLink> = self
            .links
            .iter()
            .filter(|link| link.strength >= filter.min_strength)
            .filter(|link| kept.contains(link.source.as_str()) && kept.contains(link.target.as_str()))
            .cloned()
            .collect();

        DependencyGraph {
            metadata: GraphMetadata {
                total_files: nodes.len(),
                total_links: links.len(),
                ..self.metadata.clone()
            },
            nodes,
            links,
        }
    }

    pub fn node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .nodes
            .iter()
            .map(|n| n.node_type.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        types.sort();
        types
    }
}

#[async_trait]
pub trait DependencyGraphApi: Send + Sync {
    async fn dependency_graph(&self, request: &DependencyGraphRequest) -> SourceResult<DependencyGraph>;
}

#[async_trait]
impl DependencyGraphApi for ProxyClient {
    async fn dependency_graph(&self, request: &DependencyGraphRequest) -> SourceResult<DependencyGraph> {
        let graph: DependencyGraph = self
            .post_json("/api/dependency-graph", request, "dependency graph")
            .await?;
        info!(
            "Dependency graph for {:?}: {} nodes, {} links",
            request.repositories,
            graph.nodes.len(),
            graph.links.len()
        );
        Ok(graph)
    }
}
