//! The base (intraprocedural) CFG, as consumed by the supergraph builder.
//!
//! This crate does not construct or normalize a CFG; it assumes one has
//! already been built (by whatever binary-analysis front end the caller
//! uses) and consumes it through these two traits.

use crate::common::{AnalysisResult, Addr};
use crate::front::ir::{Block, Jumpkind};

/// A single node of the base CFG: one basic block (or a simprocedure stand-in
/// for one, in which case `block()` is never called).
pub trait CfgNode: Clone + std::fmt::Debug + PartialEq + Eq + std::hash::Hash {
    /// The address of the block's first instruction.
    fn addr(&self) -> Addr;
    /// The address of the function this node belongs to.
    fn function_address(&self) -> Addr;
    /// Is this node an opaque stand-in for a callee (a "simprocedure")
    /// rather than a lifted block? Simprocedure nodes are never expanded by
    /// the supergraph builder; they act purely as a call target/return
    /// source.
    fn is_simprocedure(&self) -> bool;
    /// Does this node end in a `Ret` (or otherwise return control to its
    /// caller)?
    fn has_return(&self) -> bool;
    /// The lifted IR for this node. Fails if lifting the underlying bytes
    /// failed; callers of the fixpoint driver control whether that is a
    /// skip-and-diagnose or a hard failure (`fail_fast`, see spec §7).
    fn block(&self) -> AnalysisResult<Block>;
    /// The addresses of every native instruction in this node, in order.
    fn instruction_addrs(&self) -> Vec<Addr>;
    /// The address of the call instruction this node ends with, for nodes
    /// that end in a call. Defaults to the last instruction address.
    fn call_addr(&self) -> Addr {
        self.instruction_addrs()
            .last()
            .copied()
            .unwrap_or_else(|| self.addr())
    }
}

/// The base CFG: a set of nodes plus edge queries, normalized so that every
/// basic block ends at a control-transfer boundary.
pub trait Cfg {
    type Node: CfgNode;

    /// Every node in the CFG.
    fn nodes(&self) -> Vec<Self::Node>;

    /// Successors of `node`, optionally restricted to edges of the given
    /// jumpkind.
    fn successors(&self, node: &Self::Node, jumpkind: Option<&Jumpkind>) -> Vec<Self::Node>;

    /// Predecessors of `node`, optionally restricted to edges of the given
    /// jumpkind.
    fn predecessors(&self, node: &Self::Node, jumpkind: Option<&Jumpkind>) -> Vec<Self::Node>;

    /// All (successor, jumpkind) pairs for `node`, used when copying
    /// non-call edges verbatim into the supergraph.
    fn successors_and_jumpkind(&self, node: &Self::Node) -> Vec<(Self::Node, Jumpkind)>;

    /// Look up the node starting at `addr`, if any. Used to resolve call
    /// targets and function entries.
    fn node_at(&self, addr: Addr) -> Option<Self::Node> {
        self.nodes().into_iter().find(|n| n.addr() == addr)
    }
}
