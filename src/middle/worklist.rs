//! The intraprocedurally-eager worklist (part of spec component C5).
//!
//! Grounded in the reference implementation's `supergraph/__init__.py`
//! (`Worklist`, `node_is_entry`/`node_is_exit`/`node_is_call`/
//! `node_is_ret`). A node is filed into one of four sub-lists by its kind;
//! nodes are popped intra-procedural-first so that a function's own body
//! reaches a fixpoint before its callers or callees are revisited.

use petgraph::graph::NodeIndex;

use crate::front::cfg::CfgNode;
use crate::middle::supergraph::{node_is_call, node_is_entry, node_is_exit, node_is_ret, SuperNode};

/// Traversal direction. Liveness is a backward analysis, so the driver uses
/// `Backward`; `Forward` exists for symmetry with the reference
/// implementation and for analyses built on the same supergraph that do
/// flow forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A worklist of supergraph nodes (identified by `NodeIndex`), with four
/// sub-lists and a direction-dependent pop order.
pub struct Worklist {
    direction: Direction,
    intra: Vec<NodeIndex>,
    fn_boundary: Vec<NodeIndex>,
    call: Vec<NodeIndex>,
    ret: Vec<NodeIndex>,
}

impl Worklist {
    pub fn new(direction: Direction) -> Worklist {
        Worklist { direction, intra: Vec::new(), fn_boundary: Vec::new(), call: Vec::new(), ret: Vec::new() }
    }

    /// File `idx` into the appropriate sub-list, classifying it by `node`.
    pub fn add<N: CfgNode>(&mut self, node: &SuperNode<N>, idx: NodeIndex) {
        if node_is_entry(node) {
            match self.direction {
                Direction::Forward => self.intra.push(idx),
                Direction::Backward => self.fn_boundary.push(idx),
            }
        } else if node_is_exit(node) {
            match self.direction {
                Direction::Forward => self.fn_boundary.push(idx),
                Direction::Backward => self.intra.push(idx),
            }
        } else if node_is_call(node) {
            self.call.push(idx);
        } else if node_is_ret(node) {
            self.ret.push(idx);
        } else {
            self.intra.push(idx);
        }
    }

    /// Remove and return the next node, or `None` if the worklist is empty.
    /// Intraprocedural and function-boundary nodes always take precedence;
    /// among call/ret nodes, forward flow prefers calls, backward flow
    /// prefers returns.
    pub fn next_node(&mut self) -> Option<NodeIndex> {
        if let Some(n) = self.intra.pop() {
            return Some(n);
        }
        if let Some(n) = self.fn_boundary.pop() {
            return Some(n);
        }

        match self.direction {
            Direction::Forward => self.call.pop().or_else(|| self.ret.pop()),
            Direction::Backward => self.ret.pop().or_else(|| self.call.pop()),
        }
    }

    pub fn len(&self) -> usize {
        self.intra.len() + self.fn_boundary.len() + self.call.len() + self.ret.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Addr;
    use crate::front::ir::Block;

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct MockNode {
        addr: Addr,
        fn_addr: Addr,
        has_return: bool,
    }

    impl CfgNode for MockNode {
        fn addr(&self) -> Addr {
            self.addr
        }
        fn function_address(&self) -> Addr {
            self.fn_addr
        }
        fn is_simprocedure(&self) -> bool {
            false
        }
        fn has_return(&self) -> bool {
            self.has_return
        }
        fn block(&self) -> crate::common::AnalysisResult<Block> {
            unimplemented!()
        }
        fn instruction_addrs(&self) -> Vec<Addr> {
            vec![self.addr]
        }
    }

    #[test]
    fn intra_nodes_pop_before_call_or_ret() {
        let mut wl = Worklist::new(Direction::Backward);
        let intra_node = SuperNode::Block(MockNode { addr: 0x20, fn_addr: 0x10, has_return: false });
        let call_node: SuperNode<MockNode> =
            SuperNode::Dummy { parent_block: 0x10, kind: crate::middle::supergraph::DummyKind::Call };

        wl.add(&call_node, NodeIndex::new(0));
        wl.add(&intra_node, NodeIndex::new(1));

        assert_eq!(wl.next_node(), Some(NodeIndex::new(1)));
        assert_eq!(wl.next_node(), Some(NodeIndex::new(0)));
        assert!(wl.is_empty());
    }

    #[test]
    fn backward_flow_prefers_ret_over_call() {
        let mut wl = Worklist::new(Direction::Backward);
        let call_node: SuperNode<MockNode> =
            SuperNode::Dummy { parent_block: 0x10, kind: crate::middle::supergraph::DummyKind::Call };
        let ret_node: SuperNode<MockNode> =
            SuperNode::Dummy { parent_block: 0x10, kind: crate::middle::supergraph::DummyKind::Ret };

        wl.add(&call_node, NodeIndex::new(0));
        wl.add(&ret_node, NodeIndex::new(1));

        assert_eq!(wl.next_node(), Some(NodeIndex::new(1)));
        assert_eq!(wl.next_node(), Some(NodeIndex::new(0)));
    }

    #[test]
    fn entry_node_is_fn_boundary_in_backward_flow() {
        let mut wl = Worklist::new(Direction::Backward);
        let entry = SuperNode::Block(MockNode { addr: 0x10, fn_addr: 0x10, has_return: false });
        wl.add(&entry, NodeIndex::new(0));
        assert_eq!(wl.fn_boundary.len(), 1);
        assert_eq!(wl.intra.len(), 0);
    }
}
