use crate::model::{Cluster, Graph};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ReportData<'a> {
    graph: &'a Graph,
    totals: TotalsView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct TotalsView {
    projects: usize,
    datasets: usize,
    tables: usize,
    edges: usize,
}

fn totals(graph: &Graph) -> TotalsView {
    let projects: &[Cluster] = &graph.root.clusters;
    TotalsView {
        projects: projects.len(),
        datasets: projects.iter().map(|p| p.clusters.len()).sum(),
        tables: graph.nodes.len(),
        edges: graph.edge_count(),
    }
}

/// Render a self-contained HTML report with the graph embedded as JSON.
///
/// The template is filled by plain string replacement since its JS uses `${..}`.
pub fn render_html_report(graph: &Graph) -> anyhow::Result<String> {
    let data = ReportData {
        graph,
        totals: totals(graph),
    };
    // "</" would close the script element early.
    let json = serde_json::to_string(&data)?.replace("</", "<\\/");

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>BigQuery Lineage</title>
<style>
  :root { --line: #d9dde3; --hover: #eef1f5; --active: #dcecff; }
  body { font: 14px/1.4 system-ui, sans-serif; margin: 0; display: grid; grid-template-rows: auto 1fr; height: 100vh; }
  #stats { display: flex; gap: 12px; padding: 10px 16px; border-bottom: 1px solid var(--line); }
  .stat { background: #f6f8fa; border-radius: 6px; padding: 3px 10px; }
  #layout { display: grid; grid-template-columns: 380px 1fr; min-height: 0; }
  #browser { border-right: 1px solid var(--line); overflow: auto; padding: 10px; }
  #details { overflow: auto; padding: 10px 20px; }
  #controls { display: flex; gap: 6px; margin-bottom: 10px; }
  #controls input { flex: 1; padding: 5px 8px; }
  .row { cursor: pointer; padding: 1px 4px; white-space: nowrap; }
  .row:hover { background: var(--hover); }
  .row.active { background: var(--active); }
  .gutter, .caret { display: inline-block; }
  .caret { width: 14px; color: #888; }
  .dim { color: #888; font-size: 12px; }
  #upstream li, #downstream li { cursor: pointer; font-family: monospace; }
</style>
</head>
<body>
<div id="stats"></div>
<div id="layout">
  <nav id="browser">
    <div id="controls">
      <input id="search" placeholder="Filter tables">
      <button id="expandAll">+</button>
      <button id="collapseAll">-</button>
    </div>
    <div id="tree"></div>
  </nav>
  <section id="details">
    <h2 id="title">No table selected</h2>
    <div id="meta" class="dim"></div>
    <h3>Reads from</h3>
    <ul id="upstream"></ul>
    <h3>Feeds</h3>
    <ul id="downstream"></ul>
  </section>
</div>

<script>
const DATA = __DATA__;
const G = DATA.graph;

const state = {
  expanded: new Set(),
  selected: null,
  search: ""
};

// node index -> [node index]
const upstream = new Map();
const downstream = new Map();
(function collectEdges(cluster) {
  for (const e of cluster.edges) {
    if (!upstream.has(e.destination)) upstream.set(e.destination, []);
    if (!downstream.has(e.source)) downstream.set(e.source, []);
    upstream.get(e.destination).push(e.source);
    downstream.get(e.source).push(e.destination);
  }
  for (const c of cluster.clusters) collectEdges(c);
})(G.root);

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  const t = DATA.totals;
  document.getElementById("stats").innerHTML = ["projects", "datasets", "tables", "edges"]
    .map((k) => `<span class="stat">${k} <b>${t[k]}</b></span>`)
    .join("");
}

function nodeMatches(id) {
  return !state.search || G.nodes[id].id.toLowerCase().includes(state.search.toLowerCase());
}

function clusterMatches(cluster) {
  return cluster.nodes.some(nodeMatches) || cluster.clusters.some(clusterMatches);
}

function row(depth, toggleText, onToggle, html, onClick, selected) {
  const el = document.createElement("div");
  el.className = "row" + (selected ? " active" : "");
  el.onclick = onClick;

  const indent = document.createElement("span");
  indent.className = "gutter";
  indent.style.width = (depth * 16) + "px";
  el.appendChild(indent);

  const toggle = document.createElement("span");
  toggle.className = "caret";
  toggle.textContent = toggleText;
  toggle.onclick = (e) => {
    e.stopPropagation();
    onToggle();
  };
  el.appendChild(toggle);

  const label = document.createElement("span");
  label.innerHTML = html;
  el.appendChild(label);
  return el;
}

function renderTree() {
  const root = document.getElementById("tree");
  root.innerHTML = "";

  function renderCluster(cluster, depth) {
    if (!clusterMatches(cluster)) return;
    const open = state.search || state.expanded.has(cluster.name);
    const flip = () => {
      if (state.expanded.has(cluster.name)) state.expanded.delete(cluster.name);
      else state.expanded.add(cluster.name);
      renderTree();
    };
    root.appendChild(row(depth, open ? "▾" : "▸", flip,
      `${escapeHtml(cluster.label)} <span class="dim">(${cluster.scope.kind})</span>`, flip, false));
    if (!open) return;

    for (const c of cluster.clusters) renderCluster(c, depth + 1);
    for (const id of cluster.nodes) {
      if (!nodeMatches(id)) continue;
      const n = G.nodes[id];
      const up = (upstream.get(id) || []).length;
      const down = (downstream.get(id) || []).length;
      root.appendChild(row(depth + 1, " ", () => {},
        `${escapeHtml(n.label)} <span class="dim">(${up} in, ${down} out)</span>`,
        () => selectNode(id), state.selected === id));
    }
  }

  for (const c of G.root.clusters) renderCluster(c, 0);
}

function fillRefs(elId, ids) {
  const list = document.getElementById(elId);
  list.innerHTML = "";
  if (!ids.length) {
    list.innerHTML = `<li class="dim">none</li>`;
    return;
  }
  for (const id of ids) {
    const li = document.createElement("li");
    li.textContent = G.nodes[id].id;
    li.onclick = () => selectNode(id);
    list.appendChild(li);
  }
}

function selectNode(id) {
  state.selected = id;
  const n = G.nodes[id];
  state.expanded.add("cluster_bq_project_" + n.table.project);
  state.expanded.add("cluster_bq_dataset_" + n.table.project + "_" + n.table.dataset);

  document.getElementById("title").textContent = n.label;
  document.getElementById("meta").textContent =
    `project: ${n.table.project} | dataset: ${n.table.dataset} | table: ${n.table.table}`;
  fillRefs("upstream", upstream.get(id) || []);
  fillRefs("downstream", downstream.get(id) || []);
  renderTree();
}

function expandAll() {
  (function walk(cluster) {
    state.expanded.add(cluster.name);
    for (const c of cluster.clusters) walk(c);
  })(G.root);
  renderTree();
}

function collapseAll() {
  state.expanded.clear();
  renderTree();
}

document.getElementById("search").addEventListener("input", (e) => {
  state.search = e.target.value || "";
  renderTree();
});

document.getElementById("expandAll").onclick = expandAll;
document.getElementById("collapseAll").onclick = collapseAll;

renderSummary();
for (const c of G.root.clusters) state.expanded.add(c.name);
renderTree();
if (G.nodes.length) selectNode(0);
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}
