use crate::graph::CallGraph;
use cslice_syntax::{CallExtractor, TranslationUnit};

/// Build a call graph from a parsed translation unit
pub struct CallGraphBuilder {
    extractor: CallExtractor,
}

impl CallGraphBuilder {
    pub fn new(extractor: CallExtractor) -> Self {
        Self { extractor }
    }

    /// Build graph from every indexed function
    pub fn build(&self, unit: &TranslationUnit) -> CallGraph {
        let mut graph = CallGraph::new();

        // Phase 1: Create nodes for all functions
        for record in unit.functions() {
            graph.add_function(record.clone());
        }

        // Phase 2: Add call edges to functions that have a body in the unit
        for record in unit.functions() {
            let Some(from) = graph.find_node(&record.name) else {
                continue;
            };

            for callee in self.extractor.calls_in(unit, record) {
                if let Some(to) = graph.find_node(&callee) {
                    graph.add_call(from, to);
                }
            }
        }

        log::info!(
            "Built call graph: {} functions, {} calls",
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }
}
