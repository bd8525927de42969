//! Hierarchical projection of the edge set: warehouse -> project -> dataset -> table.
//!
//! Table nodes live in a single arena (`Graph::nodes`) and are looked up by
//! their fully-qualified name, so a table seen as a source in one edge and a
//! destination in another is one node. Clusters refer to nodes by index.
//!
//! Every edge is owned by the narrowest cluster containing both endpoints:
//! - same project and dataset -> that dataset cluster
//! - same project -> that project cluster
//! - otherwise -> the warehouse container

use crate::auditlog::TableRef;
use crate::model::lineage::EdgeSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const GRAPH_NAME: &str = "Google Cloud Platform";
pub const WAREHOUSE_CLUSTER: &str = "cluster_BigQuery";
pub const WAREHOUSE_LABEL: &str = "BigQuery";

/// Index into `Graph::nodes`.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableNode {
    /// Fully-qualified `project.dataset.table`.
    pub id: String,
    /// Bare table name; the enclosing clusters carry project and dataset.
    pub label: String,
    pub table: TableRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub destination: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterScope {
    Warehouse,
    Project { project: String },
    Dataset { project: String, dataset: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub label: String,
    pub scope: ClusterScope,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<GraphEdge>,
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    pub name: String,
    pub nodes: Vec<TableNode>,
    /// The single top-level container; project clusters hang below it.
    pub root: Cluster,
}

pub fn project_cluster_name(project: &str) -> String {
    format!("cluster_bq_project_{}", project)
}

pub fn dataset_cluster_name(project: &str, dataset: &str) -> String {
    format!("cluster_bq_dataset_{}_{}", project, dataset)
}

#[derive(Debug, Default)]
struct DatasetEntry {
    nodes: BTreeSet<NodeId>,
    edges: Vec<GraphEdge>,
}

#[derive(Debug, Default)]
struct ProjectEntry {
    edges: Vec<GraphEdge>,
    datasets: BTreeMap<String, DatasetEntry>,
}

#[derive(Debug, Default)]
struct ClusterIndex {
    nodes: Vec<TableNode>,
    node_index: BTreeMap<String, NodeId>,
    projects: BTreeMap<String, ProjectEntry>,
    top_edges: Vec<GraphEdge>,
}

impl ClusterIndex {
    /// Resolve (or create) the node for `table` and register it in its dataset cluster.
    fn place(&mut self, table: &TableRef) -> NodeId {
        let key = table.to_string();
        let id = match self.node_index.get(&key) {
            Some(&id) => id,
            None => {
                let id = self.nodes.len();
                self.nodes.push(TableNode {
                    id: key.clone(),
                    label: table.table.clone(),
                    table: table.clone(),
                });
                self.node_index.insert(key, id);
                id
            }
        };

        self.projects
            .entry(table.project.clone())
            .or_default()
            .datasets
            .entry(table.dataset.clone())
            .or_default()
            .nodes
            .insert(id);
        id
    }

    fn add_edge(&mut self, source: &TableRef, destination: &TableRef) {
        let edge = GraphEdge {
            source: self.place(source),
            destination: self.place(destination),
        };

        if source.project != destination.project {
            self.top_edges.push(edge);
            return;
        }
        let project = self.projects.entry(source.project.clone()).or_default();
        if source.dataset == destination.dataset {
            project
                .datasets
                .entry(source.dataset.clone())
                .or_default()
                .edges
                .push(edge);
        } else {
            project.edges.push(edge);
        }
    }

    fn finish(self) -> Graph {
        let clusters = self
            .projects
            .into_iter()
            .map(|(project, entry)| {
                let datasets = entry
                    .datasets
                    .into_iter()
                    .map(|(dataset, ds)| Cluster {
                        name: dataset_cluster_name(&project, &dataset),
                        label: format!("{}.{}", project, dataset),
                        scope: ClusterScope::Dataset {
                            project: project.clone(),
                            dataset,
                        },
                        nodes: ds.nodes.into_iter().collect(),
                        edges: ds.edges,
                        clusters: Vec::new(),
                    })
                    .collect();
                Cluster {
                    name: project_cluster_name(&project),
                    label: project.clone(),
                    scope: ClusterScope::Project { project },
                    nodes: Vec::new(),
                    edges: entry.edges,
                    clusters: datasets,
                }
            })
            .collect();

        Graph {
            name: GRAPH_NAME.to_string(),
            nodes: self.nodes,
            root: Cluster {
                name: WAREHOUSE_CLUSTER.to_string(),
                label: WAREHOUSE_LABEL.to_string(),
                scope: ClusterScope::Warehouse,
                nodes: Vec::new(),
                edges: self.top_edges,
                clusters,
            },
        }
    }
}

/// Build the clustered graph. Performs no filtering.
pub fn build_graph(edges: &EdgeSet) -> Graph {
    let mut index = ClusterIndex::default();
    for edge in edges {
        index.add_edge(&edge.source, &edge.destination);
    }
    index.finish()
}

impl Graph {
    pub fn node(&self, id: NodeId) -> &TableNode {
        &self.nodes[id]
    }

    /// All edges, wherever they are placed.
    pub fn edge_count(&self) -> usize {
        fn count(cluster: &Cluster) -> usize {
            cluster.edges.len() + cluster.clusters.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

// Lookups used to inspect a built graph in tests.
#[cfg(test)]
impl Graph {
    pub fn find_node(&self, qualified_name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.id == qualified_name)
    }

    pub fn project_cluster(&self, project: &str) -> Option<&Cluster> {
        self.root.clusters.iter().find(
            |c| matches!(&c.scope, ClusterScope::Project { project: p } if p == project),
        )
    }

    pub fn dataset_cluster(&self, project: &str, dataset: &str) -> Option<&Cluster> {
        self.project_cluster(project)?.clusters.iter().find(|c| {
            matches!(&c.scope, ClusterScope::Dataset { dataset: d, .. } if d == dataset)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lineage::LineageEdge;
    use pretty_assertions::assert_eq;

    fn edges(pairs: &[(&str, &str)]) -> EdgeSet {
        let parse = |s: &str| {
            let parts: Vec<&str> = s.split('.').collect();
            TableRef::new(parts[0], parts[1], parts[2])
        };
        pairs
            .iter()
            .map(|(s, d)| LineageEdge::new(parse(s), parse(d)))
            .collect()
    }

    fn edge(graph: &Graph, source: &str, destination: &str) -> GraphEdge {
        GraphEdge {
            source: graph.find_node(source).unwrap(),
            destination: graph.find_node(destination).unwrap(),
        }
    }

    #[test]
    fn same_dataset_edge_lives_in_dataset_cluster() {
        let g = build_graph(&edges(&[("p1.d1.t1", "p1.d1.t2")]));
        let ds = g.dataset_cluster("p1", "d1").unwrap();
        assert_eq!(ds.edges, vec![edge(&g, "p1.d1.t1", "p1.d1.t2")]);
        assert!(g.project_cluster("p1").unwrap().edges.is_empty());
        assert!(g.root.edges.is_empty());
    }

    #[test]
    fn cross_dataset_edge_lives_in_project_cluster() {
        let g = build_graph(&edges(&[("p1.d1.t1", "p1.d2.t2")]));
        let project = g.project_cluster("p1").unwrap();
        assert_eq!(project.edges, vec![edge(&g, "p1.d1.t1", "p1.d2.t2")]);
        assert!(g.dataset_cluster("p1", "d1").unwrap().edges.is_empty());
        assert!(g.dataset_cluster("p1", "d2").unwrap().edges.is_empty());
        assert!(g.root.edges.is_empty());
    }

    #[test]
    fn cross_project_edge_lives_at_top_level() {
        let g = build_graph(&edges(&[("p1.d1.t1", "p2.d1.t2")]));
        assert_eq!(g.root.edges, vec![edge(&g, "p1.d1.t1", "p2.d1.t2")]);
        assert!(g.project_cluster("p1").unwrap().edges.is_empty());
        assert!(g.project_cluster("p2").unwrap().edges.is_empty());
        // Same dataset name in two projects: two distinct clusters.
        assert_eq!(
            g.dataset_cluster("p2", "d1").unwrap().name,
            "cluster_bq_dataset_p2_d1"
        );
    }

    #[test]
    fn shared_table_resolves_to_one_node() {
        let g = build_graph(&edges(&[
            ("p.d.a", "p.d.b"),
            ("p.d.b", "p.e.c"),
            ("q.x.z", "p.d.b"),
        ]));
        assert_eq!(g.nodes.len(), 4);
        let b = g.find_node("p.d.b").unwrap();
        assert_eq!(g.node(b).label, "b");
        assert_eq!(g.node(b).table, TableRef::new("p", "d", "b"));

        let ds = g.dataset_cluster("p", "d").unwrap();
        let mut members: Vec<&str> = ds.nodes.iter().map(|&n| g.node(n).id.as_str()).collect();
        members.sort();
        assert_eq!(members, vec!["p.d.a", "p.d.b"]);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn clusters_nest_under_the_warehouse_container() {
        let g = build_graph(&edges(&[("p1.d1.t1", "p2.d2.t2"), ("p1.d3.t3", "p1.d1.t1")]));
        assert_eq!(g.name, GRAPH_NAME);
        assert_eq!(g.root.name, WAREHOUSE_CLUSTER);
        assert_eq!(g.root.scope, ClusterScope::Warehouse);

        let projects: Vec<&str> = g.root.clusters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(projects, vec!["p1", "p2"]);

        let p1 = g.project_cluster("p1").unwrap();
        assert_eq!(p1.name, "cluster_bq_project_p1");
        let datasets: Vec<&str> = p1.clusters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(datasets, vec!["p1.d1", "p1.d3"]);
        assert!(p1.nodes.is_empty());
    }

    #[test]
    fn empty_edge_set_builds_empty_container() {
        let g = build_graph(&EdgeSet::new());
        assert!(g.nodes.is_empty());
        assert!(g.root.clusters.is_empty());
        assert_eq!(g.edge_count(), 0);
    }
}
