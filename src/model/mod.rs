//! Lineage model: edge accumulation and the clustered graph built from it.

pub mod cluster;
pub mod lineage;

pub use cluster::{Cluster, ClusterScope, Graph, build_graph};
pub use lineage::{EdgeSet, LineageBuilder, RunSummary};
