//! Supergraph construction invariants, mirroring the reference suite's
//! `test_supergraph.py`: every call site gets a matching call/ret dummy
//! pair, and non-call edges are copied through untouched.

use ctxlive::back::{AnalysisError, AnalysisResult};
use ctxlive::common::Addr;
use ctxlive::front::cfg::{Cfg, CfgNode};
use ctxlive::front::ir::{Block, Const, Expr, Jumpkind, Stmt};
use ctxlive::middle::{DummyKind, Supergraph};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Node {
    addr: Addr,
    fn_addr: Addr,
    has_return: bool,
    edges: Vec<(Addr, Jumpkind)>,
}

impl CfgNode for Node {
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
    fn block(&self) -> AnalysisResult<Block> {
        Ok(Block {
            addr: self.addr,
            statements: vec![Stmt::IMark { addr: self.addr, len: 1, delta: 0 }],
            next: Expr::Const(Const::U64(0)),
            jumpkind: Jumpkind::Boring,
        })
    }
    fn instruction_addrs(&self) -> Vec<Addr> {
        vec![self.addr]
    }
}

struct Program {
    nodes: Vec<Node>,
}

impl Cfg for Program {
    type Node = Node;

    fn nodes(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    fn successors(&self, node: &Node, jumpkind: Option<&Jumpkind>) -> Vec<Node> {
        node.edges
            .iter()
            .filter(|(_, jk)| jumpkind.map_or(true, |want| jk == want))
            .filter_map(|(addr, _)| self.nodes.iter().find(|n| n.addr == *addr).cloned())
            .collect()
    }

    fn predecessors(&self, node: &Node, jumpkind: Option<&Jumpkind>) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.edges.iter().any(|(a, jk)| *a == node.addr && jumpkind.map_or(true, |want| jk == want)))
            .cloned()
            .collect()
    }

    fn successors_and_jumpkind(&self, node: &Node) -> Vec<(Node, Jumpkind)> {
        node.edges
            .iter()
            .filter_map(|(addr, jk)| self.nodes.iter().find(|n| n.addr == *addr).map(|n| (n.clone(), jk.clone())))
            .collect()
    }
}

/// A three-block program: `main` (0x10) calls `callee` (0x100, a leaf that
/// returns), and control resumes at `main`'s post-call block (0x20).
fn call_program() -> Program {
    let caller = Node {
        addr: 0x10,
        fn_addr: 0x10,
        has_return: false,
        edges: vec![(0x100, Jumpkind::Call), (0x20, Jumpkind::FakeRet)],
    };
    let callee = Node { addr: 0x100, fn_addr: 0x100, has_return: true, edges: vec![] };
    let cont = Node { addr: 0x20, fn_addr: 0x10, has_return: true, edges: vec![] };
    Program { nodes: vec![caller, callee, cont] }
}

#[test]
fn a_call_site_gets_a_matching_call_and_ret_dummy() {
    let program = call_program();
    let sg = Supergraph::build(&program);

    let call_idx = sg.dummy_at(0x10, DummyKind::Call).expect("call dummy present");
    let ret_idx = sg.dummy_at(0x10, DummyKind::Ret).expect("ret dummy present");

    let counterpart_of_call = sg.counterpart(0x10, DummyKind::Call).unwrap();
    let counterpart_of_ret = sg.counterpart(0x10, DummyKind::Ret).unwrap();
    assert_eq!(counterpart_of_call, ret_idx);
    assert_eq!(counterpart_of_ret, call_idx);
}

#[test]
fn call_dummy_points_at_the_callee_entry() {
    let program = call_program();
    let sg = Supergraph::build(&program);

    let call_idx = sg.dummy_at(0x10, DummyKind::Call).unwrap();
    let callee_idx = sg.block_at(0x100).unwrap();
    assert!(sg.successors(call_idx).contains(&callee_idx));
}

#[test]
fn ret_dummy_is_fed_by_the_callees_returning_blocks_and_feeds_the_continuation() {
    let program = call_program();
    let sg = Supergraph::build(&program);

    let ret_idx = sg.dummy_at(0x10, DummyKind::Ret).unwrap();
    let callee_idx = sg.block_at(0x100).unwrap();
    let cont_idx = sg.block_at(0x20).unwrap();

    assert!(sg.predecessors(ret_idx).contains(&callee_idx));
    assert!(sg.successors(ret_idx).contains(&cont_idx));
}

#[test]
fn a_non_call_edge_is_copied_through_without_dummy_nodes() {
    let a = Node { addr: 0x10, fn_addr: 0x10, has_return: false, edges: vec![(0x20, Jumpkind::Boring)] };
    let b = Node { addr: 0x20, fn_addr: 0x10, has_return: true, edges: vec![] };
    let program = Program { nodes: vec![a, b] };
    let sg = Supergraph::build(&program);

    assert!(sg.dummy_at(0x10, DummyKind::Call).is_none());
    let a_idx = sg.block_at(0x10).unwrap();
    let b_idx = sg.block_at(0x20).unwrap();
    assert!(sg.successors(a_idx).contains(&b_idx));
}

#[test]
fn a_dummy_node_with_no_counterpart_is_a_programming_error() {
    let program = call_program();
    let sg = Supergraph::build(&program);
    // Every real call site in `call_program` gets both halves; ask about
    // one that was never built to exercise the error path directly.
    let err = sg.counterpart(0xdead, DummyKind::Call).unwrap_err();
    assert!(matches!(err, AnalysisError::UnmatchedDummyPair { parent_block: 0xdead, kind: DummyKind::Call }));
}
