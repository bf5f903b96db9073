//! The output of a completed analysis run.

use crate::back::diagnostic::Diagnostic;
use crate::common::{Addr, Map};
use crate::front::cfg::CfgNode;
use crate::middle::liveset::LiveVars;

/// The final `LiveVars` computed for a single block, paired with enough
/// identity to locate it.
///
/// The Rust analogue of the original's `BlockResults`.
#[derive(Clone, Debug)]
pub struct BlockResult<N: CfgNode> {
    pub node: N,
    pub state: LiveVars,
}

impl<N: CfgNode> BlockResult<N> {
    pub fn addr(&self) -> Addr {
        self.node.addr()
    }

    pub fn function_addr(&self) -> Addr {
        self.node.function_address()
    }
}

/// Per-(function, block) results of a completed fixpoint run, plus any
/// diagnostics accumulated along the way.
#[derive(Clone, Debug, Default)]
pub struct AnalysisResults<N: CfgNode> {
    by_addr: Map<Addr, BlockResult<N>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<N: CfgNode> AnalysisResults<N> {
    pub fn new() -> AnalysisResults<N> {
        AnalysisResults { by_addr: Map::new(), diagnostics: Vec::new() }
    }

    pub fn insert(&mut self, node: N, state: LiveVars) {
        self.by_addr.insert(node.addr(), BlockResult { node, state });
    }

    /// All block results belonging to the function at `fn_addr`.
    pub fn results_for_function(&self, fn_addr: Addr) -> Vec<&BlockResult<N>> {
        self.by_addr.values().filter(|r| r.function_addr() == fn_addr).collect()
    }

    pub fn result_for_block(&self, addr: Addr) -> Option<&BlockResult<N>> {
        self.by_addr.get(&addr)
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }
}
