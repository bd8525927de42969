use crate::model::{Cluster, ClusterScope, Graph};
use std::fmt::Write;

// Graphviz "pastel25" color scheme, outermost to innermost.
const COLOR_GRAPH: &str = "pastel25/5";
const COLOR_WAREHOUSE: &str = "pastel25/4";
const COLOR_PROJECT: &str = "pastel25/3";
const COLOR_DATASET: &str = "pastel25/2";
const COLOR_TABLE: &str = "pastel25/1";

/// Render the clustered graph as Graphviz DOT.
///
/// Each cluster writes its nodes, then its sub-clusters, then its own edges,
/// so every node is declared inside its dataset cluster before any outer
/// edge mentions it.
pub fn render_dot(graph: &Graph) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "digraph {} {{", quote(&graph.name))?;
    writeln!(out, "  color={};", quote(COLOR_GRAPH))?;
    writeln!(out, "  style=\"filled\";")?;
    writeln!(out, "  rankdir=\"LR\";")?;
    write_cluster(&mut out, graph, &graph.root, 1)?;
    writeln!(out, "}}")?;
    Ok(out)
}

fn write_cluster(out: &mut String, graph: &Graph, cluster: &Cluster, depth: usize) -> std::fmt::Result {
    let pad = "  ".repeat(depth);
    let color = match cluster.scope {
        ClusterScope::Warehouse => COLOR_WAREHOUSE,
        ClusterScope::Project { .. } => COLOR_PROJECT,
        ClusterScope::Dataset { .. } => COLOR_DATASET,
    };

    writeln!(out, "{}subgraph {} {{", pad, quote(&cluster.name))?;
    writeln!(out, "{}  label={};", pad, quote(&cluster.label))?;
    writeln!(out, "{}  color={};", pad, quote(color))?;
    writeln!(out, "{}  style=\"filled\";", pad)?;

    for &id in &cluster.nodes {
        let node = graph.node(id);
        writeln!(
            out,
            "{}  {} [label={}, shape=\"box\", color={}, style=\"filled\"];",
            pad,
            quote(&node.id),
            quote(&node.label),
            quote(COLOR_TABLE)
        )?;
    }

    for child in &cluster.clusters {
        write_cluster(out, graph, child, depth + 1)?;
    }

    for edge in &cluster.edges {
        writeln!(
            out,
            "{}  {} -> {};",
            pad,
            quote(&graph.node(edge.source).id),
            quote(&graph.node(edge.destination).id)
        )?;
    }

    writeln!(out, "{}}}", pad)
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auditlog::TableRef;
    use crate::model::lineage::LineageEdge;
    use crate::model::{EdgeSet, build_graph};
    use pretty_assertions::assert_eq;

    fn graph() -> Graph {
        let edges: EdgeSet = [
            (TableRef::new("p1", "d1", "a"), TableRef::new("p1", "d1", "b")),
            (TableRef::new("p1", "d1", "b"), TableRef::new("p2", "d9", "c")),
        ]
        .into_iter()
        .map(|(s, d)| LineageEdge::new(s, d))
        .collect();
        build_graph(&edges)
    }

    #[test]
    fn renders_nested_clusters() {
        let dot = render_dot(&graph()).unwrap();
        let expected = r#"digraph "Google Cloud Platform" {
  color="pastel25/5";
  style="filled";
  rankdir="LR";
  subgraph "cluster_BigQuery" {
    label="BigQuery";
    color="pastel25/4";
    style="filled";
    subgraph "cluster_bq_project_p1" {
      label="p1";
      color="pastel25/3";
      style="filled";
      subgraph "cluster_bq_dataset_p1_d1" {
        label="p1.d1";
        color="pastel25/2";
        style="filled";
        "p1.d1.a" [label="a", shape="box", color="pastel25/1", style="filled"];
        "p1.d1.b" [label="b", shape="box", color="pastel25/1", style="filled"];
        "p1.d1.a" -> "p1.d1.b";
      }
    }
    subgraph "cluster_bq_project_p2" {
      label="p2";
      color="pastel25/3";
      style="filled";
      subgraph "cluster_bq_dataset_p2_d9" {
        label="p2.d9";
        color="pastel25/2";
        style="filled";
        "p2.d9.c" [label="c", shape="box", color="pastel25/1", style="filled"];
      }
    }
    "p1.d1.b" -> "p2.d9.c";
  }
}
"#;
        assert_eq!(dot, expected);
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote(r#"we"ird\name"#), r#""we\"ird\\name""#);
    }
}
