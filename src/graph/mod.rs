//! Control-flow graph model: a labeled directed multigraph over the
//! pipeline's table/branch structure, plus the two analyses the evidence
//! tools need (table-depth ranking and path-constraint extraction).
//!
//! Graphs may contain cycles; every traversal here is bounded or memoized so
//! it terminates on any input. Both analyses are evidence helpers, not sound
//! reachability solvers.

pub mod dot;

use serde::Serialize;
use std::collections::BTreeMap;

/// Synthetic entry/exit markers emitted by the graph generator.
pub const START_LABEL: &str = "__START__";
pub const EXIT_LABEL: &str = "__EXIT__";

/// Cap on collected paths per path-constraint query.
pub const MAX_PATHS: usize = 3;
/// Cap on steps along any single explored path; defines the completeness vs
/// termination trade-off on cyclic graphs.
pub const MAX_STEPS: usize = 200;

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub shape: Option<String>,
}

#[derive(Debug, Clone)]
struct Edge {
    src: usize,
    dst: usize,
    label: String,
}

/// One hop of an extracted path: the node reached and the edge label taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub node: String,
    pub via: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jump {
    pub via: String,
    pub dst: String,
}

/// Node arena addressed by index; `index` maps DOT node ids to arena slots.
#[derive(Debug, Clone)]
pub struct ControlGraph {
    pub name: String,
    nodes: Vec<GraphNode>,
    index: BTreeMap<String, usize>,
    edges: Vec<Edge>,
    out: Vec<Vec<usize>>,
}

impl ControlGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: BTreeMap::new(),
            edges: Vec::new(),
            out: Vec::new(),
        }
    }

    /// Insert or update a node. Endpoints of edges are auto-created, so a
    /// later explicit declaration just fills in label/shape.
    pub fn add_node(&mut self, id: &str, label: String, shape: Option<String>) {
        match self.index.get(id) {
            Some(&i) => {
                self.nodes[i].label = label;
                self.nodes[i].shape = shape;
            }
            None => {
                let i = self.nodes.len();
                self.nodes.push(GraphNode {
                    id: id.to_string(),
                    label,
                    shape,
                });
                self.index.insert(id.to_string(), i);
                self.out.push(Vec::new());
            }
        }
    }

    pub fn add_edge(&mut self, src: &str, dst: &str, label: String) {
        let s = self.intern(src);
        let d = self.intern(dst);
        let e = self.edges.len();
        self.edges.push(Edge {
            src: s,
            dst: d,
            label,
        });
        self.out[s].push(e);
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        self.add_node(id, String::new(), None);
        self.index[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_label(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&i| self.nodes[i].label.as_str())
    }

    /// First node (in file order) carrying this exact label.
    fn find_by_label(&self, label: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.label == label)
    }

    fn start(&self) -> Option<usize> {
        self.find_by_label(START_LABEL)
    }

    fn is_table(node: &GraphNode) -> bool {
        // p4c renders tables as ellipses.
        node.shape
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("ellipse"))
            && !node.label.is_empty()
    }

    pub fn table_labels(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| Self::is_table(n))
            .map(|n| n.label.clone())
            .collect()
    }

    /// Label-level adjacency: src label -> [{via, dst label}].
    pub fn jump_dict(&self) -> BTreeMap<String, Vec<Jump>> {
        let mut out: BTreeMap<String, Vec<Jump>> = BTreeMap::new();
        for e in &self.edges {
            out.entry(self.nodes[e.src].label.clone())
                .or_default()
                .push(Jump {
                    via: e.label.clone(),
                    dst: self.nodes[e.dst].label.clone(),
                });
        }
        out
    }

    /// Table labels ranked by depth score, descending; ties keep file order.
    /// A node's score is the longest path from it to a sink, computed over
    /// everything reachable from `__START__`; unreachable nodes score 0.
    ///
    /// Depth through a cycle is not found: an edge back into the active DFS
    /// path contributes depth 0. That policy is what guarantees termination
    /// and downstream consumers rely on the resulting ordering.
    pub fn ranked_tables(&self) -> Vec<(String, u32)> {
        let Some(start) = self.start() else {
            return Vec::new();
        };
        let depth = self.longest_depths(start);

        let mut ranked: Vec<(String, u32)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| Self::is_table(n))
            .map(|(i, n)| (n.label.clone(), depth[i].unwrap_or(0)))
            .collect();
        // Stable sort keeps first-encountered order among equal depths.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Memoized longest-path DFS with an explicit two-phase stack. `None` in
    /// the result means the node was never finished from `start` (either
    /// unreachable, or only touched as an active back-edge).
    fn longest_depths(&self, start: usize) -> Vec<Option<u32>> {
        enum Frame {
            Enter(usize),
            Exit(usize),
        }

        let mut memo: Vec<Option<u32>> = vec![None; self.nodes.len()];
        let mut on_path = vec![false; self.nodes.len()];
        let mut stack = vec![Frame::Enter(start)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(i) => {
                    if memo[i].is_some() || on_path[i] {
                        continue;
                    }
                    on_path[i] = true;
                    stack.push(Frame::Exit(i));
                    for &e in &self.out[i] {
                        let d = self.edges[e].dst;
                        if memo[d].is_none() && !on_path[d] {
                            stack.push(Frame::Enter(d));
                        }
                    }
                }
                Frame::Exit(i) => {
                    let mut best = 0;
                    for &e in &self.out[i] {
                        // A still-unfinished successor is on the active path:
                        // the back-edge counts as zero additional depth.
                        best = best.max(1 + memo[self.edges[e].dst].unwrap_or(0));
                    }
                    on_path[i] = false;
                    memo[i] = Some(best);
                }
            }
        }
        memo
    }

    /// Extract weak, explainable constraints on paths from `__START__` to the
    /// node labelled `target_label`: a bounded DFS collects up to `MAX_PATHS`
    /// paths of at most `MAX_STEPS` hops, then keeps the hops whose node label
    /// looks like a validity/comparison check. If that filter empties every
    /// path, the raw first path is returned instead.
    pub fn path_constraints(&self, target_label: &str) -> Vec<PathStep> {
        let Some(start) = self.start() else {
            return Vec::new();
        };
        let Some(target) = self.find_by_label(target_label) else {
            return Vec::new();
        };

        let mut results: Vec<Vec<PathStep>> = Vec::new();
        let mut stack: Vec<(usize, Vec<PathStep>, usize)> = vec![(start, Vec::new(), 0)];

        while let Some((idx, path, steps)) = stack.pop() {
            if results.len() >= MAX_PATHS {
                break;
            }
            if steps > MAX_STEPS {
                continue;
            }
            if idx == target {
                results.push(path);
                continue;
            }
            // Reverse push keeps exploration in declared edge order.
            for &e in self.out[idx].iter().rev() {
                let edge = &self.edges[e];
                let mut next = path.clone();
                next.push(PathStep {
                    node: self.nodes[edge.dst].label.clone(),
                    via: edge.label.clone(),
                });
                stack.push((edge.dst, next, steps + 1));
            }
        }

        let simplified: Vec<Vec<PathStep>> = results
            .iter()
            .map(|p| {
                p.iter()
                    .filter(|s| is_constraint_label(&s.node))
                    .cloned()
                    .collect()
            })
            .collect();

        if !simplified.is_empty() && simplified.iter().all(Vec::is_empty) {
            return results.into_iter().next().unwrap_or_default();
        }
        simplified.into_iter().next().unwrap_or_default()
    }
}

fn is_constraint_label(label: &str) -> bool {
    label.contains("isValid") || label.contains("==") || label.contains(".hit")
}
