//! Renderers for the clustered lineage graph.

pub mod dot;
pub mod html;

pub use dot::render_dot;
pub use html::render_html_report;

use crate::model::Graph;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Dot,
    Json,
    Html,
}

pub fn render(graph: &Graph, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Dot => render_dot(graph),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(graph)?),
        OutputFormat::Html => render_html_report(graph),
    }
}
