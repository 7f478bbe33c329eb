//! Static call graph of a module.
//!
//! Nodes are the functions of the module, an edge `a -> b` exists when `a`
//! contains at least one call resolving to `b`. The graph is a snapshot:
//! rebuild it after editing calls.
use petgraph::prelude::DiGraphMap;
use vxxinstr::modules::{FunctionId, Module};

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraphMap<FunctionId, ()>,
}

impl CallGraph {
    pub fn build(module: &Module) -> Self {
        let mut graph = DiGraphMap::new();
        for id in module.functions.keys() {
            graph.add_node(id);
        }

        for (caller, function) in module.functions.iter() {
            for (_, call) in function.calls() {
                let Some(callee) = call.resolved_callee() else {
                    continue;
                };
                if !module.functions.contains_key(callee) {
                    continue;
                }
                graph.add_edge(caller, callee, ());
            }
        }

        Self { graph }
    }

    /// Functions containing a call to `function`.
    pub fn callers(&self, function: FunctionId) -> impl Iterator<Item = FunctionId> + '_ {
        self.graph
            .neighbors_directed(function, petgraph::Direction::Incoming)
    }
}
