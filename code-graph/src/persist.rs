//! JSONL persistence for the graph: one compact object per line.
//!
//! `nodes.jsonl` carries `{id, ...node}` rows, `edges.jsonl` carries
//! `{src, dst, label, ...}` rows, and `meta.json` the ownership marker. Ids
//! are sequential within one save and consistent between the two files.

use crate::errors::{GraphError, Result};
use crate::model::{GraphEdge, GraphNode, Ownership};
use chrono::{DateTime, Utc};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

#[derive(Serialize, Deserialize)]
struct NodeRow {
    id: usize,
    #[serde(flatten)]
    node: GraphNode,
}

#[derive(Serialize, Deserialize)]
struct EdgeRow {
    src: usize,
    dst: usize,
    #[serde(flatten)]
    edge: GraphEdge,
}

#[derive(Serialize, Deserialize)]
struct GraphMeta {
    #[serde(default)]
    ownership: Option<Ownership>,
    saved_at: DateTime<Utc>,
}

pub async fn save(
    dir: &Path,
    graph: &StableDiGraph<GraphNode, GraphEdge>,
    ownership: Option<&Ownership>,
) -> Result<()> {
    fs::create_dir_all(dir).await?;

    let mut ids: HashMap<NodeIndex, usize> = HashMap::new();
    let mut nodes = String::new();
    for (seq, idx) in graph.node_indices().enumerate() {
        ids.insert(idx, seq);
        let row = NodeRow {
            id: seq,
            node: graph[idx].clone(),
        };
        nodes.push_str(&serde_json::to_string(&row)?);
        nodes.push('\n');
    }

    let mut edges = String::new();
    for edge in graph.edge_indices() {
        let Some((a, b)) = graph.edge_endpoints(edge) else {
            continue;
        };
        let row = EdgeRow {
            src: ids[&a],
            dst: ids[&b],
            edge: graph[edge].clone(),
        };
        edges.push_str(&serde_json::to_string(&row)?);
        edges.push('\n');
    }

    let meta = GraphMeta {
        ownership: ownership.cloned(),
        saved_at: Utc::now(),
    };

    fs::write(dir.join("nodes.jsonl"), nodes).await?;
    fs::write(dir.join("edges.jsonl"), edges).await?;
    fs::write(dir.join("meta.json"), serde_json::to_vec_pretty(&meta)?).await?;

    info!(
        "graph saved: {} nodes, {} edges -> {}",
        graph.node_count(),
        graph.edge_count(),
        dir.display()
    );
    Ok(())
}

/// Load a persisted graph; `Ok(None)` when the directory holds no graph yet.
pub async fn load(
    dir: &Path,
) -> Result<Option<(StableDiGraph<GraphNode, GraphEdge>, Option<Ownership>)>> {
    let nodes_path = dir.join("nodes.jsonl");
    let Ok(nodes_raw) = fs::read_to_string(&nodes_path).await else {
        return Ok(None);
    };
    let edges_raw = fs::read_to_string(dir.join("edges.jsonl"))
        .await
        .unwrap_or_default();

    let mut graph = StableDiGraph::new();
    let mut by_id: HashMap<usize, NodeIndex> = HashMap::new();

    for line in nodes_raw.lines().filter(|l| !l.trim().is_empty()) {
        let row: NodeRow = serde_json::from_str(line)?;
        let idx = graph.add_node(row.node);
        by_id.insert(row.id, idx);
    }

    for line in edges_raw.lines().filter(|l| !l.trim().is_empty()) {
        let row: EdgeRow = serde_json::from_str(line)?;
        let src = *by_id
            .get(&row.src)
            .ok_or(GraphError::DanglingEdge(row.src))?;
        let dst = *by_id
            .get(&row.dst)
            .ok_or(GraphError::DanglingEdge(row.dst))?;
        graph.add_edge(src, dst, row.edge);
    }

    let ownership = match fs::read(dir.join("meta.json")).await {
        Ok(bytes) => serde_json::from_slice::<GraphMeta>(&bytes)
            .map(|m| m.ownership)
            .unwrap_or(None),
        Err(_) => None,
    };

    debug!(
        "graph loaded: {} nodes, {} edges from {}",
        graph.node_count(),
        graph.edge_count(),
        dir.display()
    );
    Ok(Some((graph, ownership)))
}
