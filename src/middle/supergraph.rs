//! The supergraph builder (spec component C3).
//!
//! Grounded in the reference implementation's `supergraph.py` and
//! `supergraph/__init__.py`, and in cwe_checker's interprocedural CFG
//! builder (`GraphBuilder`/`Node`/`Edge` in its `analysis::graph` module),
//! which is the idiomatic-Rust precedent for representing this kind of
//! graph with `petgraph` rather than adjacency lists.
//!
//! A supergraph augments the base (intraprocedural) CFG with explicit
//! `Call`/`Ret` dummy nodes at every call site, so that call and return
//! edges become ordinary, symmetric graph edges instead of a special case
//! the transfer function has to reason about.

use derive_more::Display;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::back::error::{AnalysisError, AnalysisResult};
use crate::common::{Addr, Map};
use crate::front::cfg::{Cfg, CfgNode};
use crate::front::ir::Jumpkind;

/// Which half of a call/return pair a dummy node stands in for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum DummyKind {
    #[display("Call")]
    Call,
    #[display("Ret")]
    Ret,
}

/// A node of the supergraph: either a real block from the base CFG, or a
/// dummy node inserted at a call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SuperNode<N> {
    Block(N),
    Dummy { parent_block: Addr, kind: DummyKind },
}

impl<N: CfgNode> SuperNode<N> {
    pub fn as_block(&self) -> Option<&N> {
        match self {
            SuperNode::Block(n) => Some(n),
            SuperNode::Dummy { .. } => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            SuperNode::Block(_) => "block",
            SuperNode::Dummy { kind: DummyKind::Call, .. } => "dummy call node",
            SuperNode::Dummy { kind: DummyKind::Ret, .. } => "dummy ret node",
        }
    }
}

/// Is `node` the entry node of its function?
pub fn node_is_entry<N: CfgNode>(node: &SuperNode<N>) -> bool {
    matches!(node, SuperNode::Block(n) if n.addr() == n.function_address())
}

/// Is `node` an exit (returning) node of its function?
pub fn node_is_exit<N: CfgNode>(node: &SuperNode<N>) -> bool {
    matches!(node, SuperNode::Block(n) if n.has_return())
}

pub fn node_is_call<N>(node: &SuperNode<N>) -> bool {
    matches!(node, SuperNode::Dummy { kind: DummyKind::Call, .. })
}

pub fn node_is_ret<N>(node: &SuperNode<N>) -> bool {
    matches!(node, SuperNode::Dummy { kind: DummyKind::Ret, .. })
}

/// An interprocedural supergraph built from a base CFG.
pub struct Supergraph<N: CfgNode> {
    graph: DiGraph<SuperNode<N>, Jumpkind>,
    block_index: Map<Addr, NodeIndex>,
    dummy_index: Map<(Addr, DummyKind), NodeIndex>,
}

impl<N: CfgNode> Supergraph<N> {
    /// Build a supergraph from every node reachable in `cfg`.
    ///
    /// Unlike the reference implementation, this never lifts a block to
    /// learn its own jumpkind; instead a node is treated as a call site iff
    /// one of its outgoing CFG edges is itself tagged `Call`. This lets
    /// supergraph construction remain infallible, leaving block lifting
    /// (and its `fail_fast` failure handling, spec §7) entirely to the
    /// transfer function.
    pub fn build<C: Cfg<Node = N>>(cfg: &C) -> Supergraph<N> {
        let nodes = cfg.nodes();

        let mut graph = DiGraph::new();
        let mut block_index = Map::new();
        for n in &nodes {
            let idx = graph.add_node(SuperNode::Block(n.clone()));
            block_index.insert(n.addr(), idx);
        }
        let mut dummy_index = Map::new();

        let mut fn_rets: Map<Addr, Vec<Addr>> = Map::new();
        for n in &nodes {
            if n.has_return() || n.is_simprocedure() {
                fn_rets.entry(n.function_address()).or_default().push(n.addr());
            }
        }

        for n in &nodes {
            if n.is_simprocedure() {
                continue;
            }

            let edges = cfg.successors_and_jumpkind(n);
            let is_call_site = edges.iter().any(|(_, jk)| *jk == Jumpkind::Call);
            let this_idx = block_index[&n.addr()];

            if is_call_site {
                let call_idx =
                    graph.add_node(SuperNode::Dummy { parent_block: n.addr(), kind: DummyKind::Call });
                let ret_idx =
                    graph.add_node(SuperNode::Dummy { parent_block: n.addr(), kind: DummyKind::Ret });
                dummy_index.insert((n.addr(), DummyKind::Call), call_idx);
                dummy_index.insert((n.addr(), DummyKind::Ret), ret_idx);

                graph.add_edge(this_idx, call_idx, Jumpkind::Boring);

                let call_targets = cfg.successors(n, Some(&Jumpkind::Call));
                for t in &call_targets {
                    graph.add_edge(call_idx, block_index[&t.addr()], Jumpkind::Call);
                }
                for r in cfg.successors(n, Some(&Jumpkind::FakeRet)) {
                    graph.add_edge(ret_idx, block_index[&r.addr()], Jumpkind::Boring);
                }
                // Wired from the callee's own returning nodes, not the
                // caller's: it's the callee's return that resumes control
                // at this call site's ret dummy.
                for t in &call_targets {
                    for r_addr in fn_rets.get(&t.function_address()).into_iter().flatten() {
                        graph.add_edge(block_index[r_addr], ret_idx, Jumpkind::Ret);
                    }
                }
            } else {
                for (s, jk) in edges {
                    if jk == Jumpkind::FakeRet {
                        continue;
                    }
                    graph.add_edge(this_idx, block_index[&s.addr()], jk);
                }
            }
        }

        Supergraph { graph, block_index, dummy_index }
    }

    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    pub fn node(&self, idx: NodeIndex) -> &SuperNode<N> {
        &self.graph[idx]
    }

    pub fn block_at(&self, addr: Addr) -> Option<NodeIndex> {
        self.block_index.get(&addr).copied()
    }

    pub fn dummy_at(&self, parent_block: Addr, kind: DummyKind) -> Option<NodeIndex> {
        self.dummy_index.get(&(parent_block, kind)).copied()
    }

    /// The dummy counterpart (`Call` <-> `Ret`) sharing `parent_block`.
    pub fn counterpart(&self, parent_block: Addr, kind: DummyKind) -> AnalysisResult<NodeIndex> {
        let other = match kind {
            DummyKind::Call => DummyKind::Ret,
            DummyKind::Ret => DummyKind::Call,
        };
        self.dummy_at(parent_block, other)
            .ok_or(AnalysisError::UnmatchedDummyPair { parent_block, kind })
    }

    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Outgoing).collect()
    }

    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).collect()
    }

    /// The block at `idx`, failing if it is a dummy node.
    pub fn require_block(&self, idx: NodeIndex) -> AnalysisResult<&N> {
        self.node(idx)
            .as_block()
            .ok_or(AnalysisError::WrongNodeKind { found: self.node(idx).describe() })
    }
}
