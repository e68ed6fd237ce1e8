use crate::closure::CallSource;
use cslice_syntax::{ByteRange, FunctionRecord};
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Whole-unit call graph (caller -> callee)
pub struct CallGraph {
    /// Directed graph over function definitions
    pub graph: DiGraph<FunctionRecord, ()>,

    /// Function name -> NodeIndex mapping for fast lookup
    pub symbol_index: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            symbol_index: HashMap::new(),
        }
    }

    /// Build a graph from `(caller, callee)` name pairs.
    ///
    /// Functions get placeholder records; useful for reasoning about call
    /// structure without a parsed unit.
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = Self::new();
        for (caller, callee) in edges {
            let from = graph.add_function(placeholder_record(caller));
            let to = graph.add_function(placeholder_record(callee));
            graph.add_call(from, to);
        }
        graph
    }

    /// Add a function node; an existing node with the same name is reused
    pub fn add_function(&mut self, record: FunctionRecord) -> NodeIndex {
        if let Some(&idx) = self.symbol_index.get(&record.name) {
            return idx;
        }

        let name = record.name.clone();
        let idx = self.graph.add_node(record);
        self.symbol_index.insert(name, idx);
        idx
    }

    /// Add a call edge (parallel edges collapse)
    pub fn add_call(&mut self, from: NodeIndex, to: NodeIndex) {
        self.graph.update_edge(from, to, ());
    }

    /// Find node by function name
    pub fn find_node(&self, name: &str) -> Option<NodeIndex> {
        self.symbol_index.get(name).copied()
    }

    /// Get node data
    pub fn get_node(&self, idx: NodeIndex) -> Option<&FunctionRecord> {
        self.graph.node_weight(idx)
    }

    /// Functions `name` calls directly, sorted
    pub fn callees(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Functions that call `name` directly, sorted
    pub fn callers(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Shortest call distance from `root` to every reachable function.
    ///
    /// The root itself is left out, even when it is reachable through a cycle.
    pub fn shortest_depths(&self, root: &str) -> BTreeMap<String, usize> {
        let Some(start) = self.find_node(root) else {
            return BTreeMap::new();
        };

        dijkstra(&self.graph, start, None, |_| 1usize)
            .into_iter()
            .filter(|(idx, _)| *idx != start)
            .filter_map(|(idx, depth)| {
                self.get_node(idx)
                    .map(|record| (record.name.clone(), depth))
            })
            .collect()
    }

    /// All edges as `(caller, callee)` pairs, sorted
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let from = self.get_node(edge.source())?;
                let to = self.get_node(edge.target())?;
                Some((from.name.clone(), to.name.clone()))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<String> {
        let Some(idx) = self.find_node(name) else {
            return Vec::new();
        };

        let mut names: Vec<_> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.get_node(n).map(|record| record.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSource for CallGraph {
    fn definition(&self, name: &str) -> Option<FunctionRecord> {
        self.find_node(name)
            .and_then(|idx| self.get_node(idx))
            .cloned()
    }

    fn calls_of(&self, function: &FunctionRecord) -> BTreeSet<String> {
        self.callees(&function.name).into_iter().collect()
    }
}

fn placeholder_record(name: &str) -> FunctionRecord {
    FunctionRecord {
        name: name.to_string(),
        signature: format!("void {name}(void)"),
        byte_range: ByteRange::new(0, 0),
        start_line: 0,
        end_line: 0,
    }
}
