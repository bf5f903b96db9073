//! The fixpoint driver (spec component C5): ties the supergraph, the
//! worklist, and the transfer function together into a whole-program
//! analysis, including the representative-contraction step that keeps
//! recursive call contexts bounded.
//!
//! Grounded in the reference implementation's `static_jump_resolution.py`
//! (`StaticJumpResolutionAnalysis`, `BlockResults`) for the overall
//! driver loop, and `engine.py`/`live_vars.py` for the call/ret dummy-node
//! handling (context push/pop and representative contraction).

use log::{debug, warn};
use petgraph::graph::NodeIndex;

use crate::back::diagnostic::Diagnostic;
use crate::back::error::{AnalysisError, AnalysisResult};
use crate::back::results::AnalysisResults;
use crate::common::{Addr, Map};
use crate::front::arch::Arch;
use crate::front::cfg::Cfg;
use crate::front::ir::Expr;
use crate::middle::context::{CallSite, CtxRecord};
use crate::middle::liveset::{LiveVars, QualifiedLiveSet};
use crate::middle::supergraph::{DummyKind, SuperNode, Supergraph};
use crate::middle::transfer;
use crate::middle::worklist::{Direction, Worklist};

/// A whole-program, context-sensitive, interprocedural live-variables
/// analysis over a single supergraph.
pub struct FixpointDriver<'a, C: Cfg> {
    cfg: &'a C,
    supergraph: Supergraph<C::Node>,
    arch: &'a dyn Arch,
    states: Map<NodeIndex, LiveVars>,
    tmp_cache: Map<Addr, Map<u32, Expr>>,
    diagnostics: Vec<Diagnostic>,
    fail_fast: bool,
}

impl<'a, C: Cfg> FixpointDriver<'a, C> {
    /// Build a driver over `cfg`'s supergraph.
    ///
    /// When `fail_fast` is `true`, a block that fails to lift aborts the
    /// whole run with `AnalysisError::LiftFailure`; otherwise the block is
    /// skipped, treated as having no effect, and a `Diagnostic` is recorded
    /// (spec §7).
    pub fn new(cfg: &'a C, arch: &'a dyn Arch, fail_fast: bool) -> FixpointDriver<'a, C> {
        let supergraph = Supergraph::build(cfg);
        FixpointDriver {
            cfg,
            supergraph,
            arch,
            states: Map::new(),
            tmp_cache: Map::new(),
            diagnostics: Vec::new(),
            fail_fast,
        }
    }

    pub fn supergraph(&self) -> &Supergraph<C::Node> {
        &self.supergraph
    }

    /// Run the analysis to a fixpoint and return the per-block results.
    pub fn run(mut self) -> AnalysisResult<AnalysisResults<C::Node>> {
        let mut worklist = Worklist::new(Direction::Backward);

        for idx in self.supergraph.node_indices() {
            self.states.insert(idx, LiveVars::empty(self.node_fn_addr(idx), 0, None));
            worklist.add(self.supergraph.node(idx), idx);
        }

        while let Some(idx) = worklist.next_node() {
            let new_in = self.transfer(idx)?;
            let changed = self.states.get(&idx) != Some(&new_in);

            if changed {
                debug!("state changed at node {idx:?}, requeueing predecessors");
                self.states.insert(idx, new_in);
                for pred in self.supergraph.predecessors(idx) {
                    worklist.add(self.supergraph.node(pred), pred);
                }
            }
        }

        let mut results = AnalysisResults::new();
        for idx in self.supergraph.node_indices() {
            if let SuperNode::Block(node) = self.supergraph.node(idx) {
                let state = self.states.get(&idx).cloned().ok_or_else(|| AnalysisError::MissingState {
                    node_desc: format!("0x{:x}", node.addr()),
                })?;
                results.insert(node.clone(), state);
            }
        }
        results.diagnostics = self.diagnostics;

        Ok(results)
    }

    fn node_fn_addr(&self, idx: NodeIndex) -> Addr {
        match self.supergraph.node(idx) {
            SuperNode::Block(n) => n.function_address(),
            SuperNode::Dummy { parent_block, .. } => {
                // The parent block's own function; look it up via the CFG
                // since dummy nodes don't carry one directly.
                self.cfg
                    .node_at(*parent_block)
                    .map(|n| n.function_address())
                    .unwrap_or(*parent_block)
            }
        }
    }

    /// Join the out-state of `idx` from its supergraph successors, then
    /// apply `idx`'s own transfer effect to get its in-state.
    fn transfer(&mut self, idx: NodeIndex) -> AnalysisResult<LiveVars> {
        let out_state = self.join_successors(idx);

        match self.supergraph.node(idx).clone() {
            SuperNode::Block(node) => {
                let mut state = out_state;
                match node.block() {
                    Ok(block) => {
                        let tmps = self
                            .tmp_cache
                            .entry(block.addr)
                            .or_insert_with(|| transfer::compute_tmp_map(&block, &mut self.diagnostics))
                            .clone();
                        transfer::transfer_block(&mut state, &block, &tmps, self.arch, &mut self.diagnostics);
                    }
                    Err(e) => {
                        if self.fail_fast {
                            return Err(AnalysisError::LiftFailure { addr: node.addr(), reason: e.to_string() });
                        }
                        warn!("skipping block at 0x{:x}: {e}", node.addr());
                        self.diagnostics.push(Diagnostic::skipped_block(node.addr(), e.to_string()));
                    }
                }
                Ok(state)
            }
            SuperNode::Dummy { parent_block, kind: DummyKind::Call } => {
                self.transfer_call(idx, parent_block, out_state)
            }
            SuperNode::Dummy { parent_block, kind: DummyKind::Ret } => {
                self.transfer_ret(idx, parent_block, out_state)
            }
        }
    }

    fn join_successors(&self, idx: NodeIndex) -> LiveVars {
        let fn_addr = self.node_fn_addr(idx);
        let mut joined: Option<LiveVars> = None;

        for succ in self.supergraph.successors(idx) {
            if let Some(succ_state) = self.states.get(&succ) {
                joined = Some(match joined {
                    None => succ_state.clone(),
                    Some(acc) => join(acc, succ_state),
                });
            }
        }

        joined.unwrap_or_else(|| LiveVars::empty(fn_addr, 0, None))
    }

    /// Push a new calling context onto every qualified live set flowing
    /// into a call, contracting to an existing representative context when
    /// one is already present (bounding the contexts created by recursive
    /// call cycles).
    fn transfer_call(&self, idx: NodeIndex, parent_block: Addr, out_state: LiveVars) -> AnalysisResult<LiveVars> {
        let call_addr = self
            .cfg
            .node_at(parent_block)
            .map(|n| n.call_addr())
            .unwrap_or(parent_block);
        let call_site = CallSite { parent_block, call_addr, kind: DummyKind::Call };

        let existing = self.states.get(&idx);
        let mut livesets = crate::common::Set::new();

        for ls in out_state.livesets() {
            let mut pushed = ls.clone();
            let record = CtxRecord::new(call_site, out_state.sp, out_state.bp);
            pushed.ctx.push(record);

            let contracted = existing
                .and_then(|prev| prev.representative(&pushed))
                .cloned()
                .unwrap_or(pushed);

            livesets.insert(contracted);
        }

        Ok(LiveVars::with_livesets(out_state.fn_addr, out_state.sp, out_state.bp, livesets))
    }

    /// Pop the innermost calling context off every qualified live set
    /// flowing out of a return, expanding any context that was contracted
    /// to a representative back to its full form first.
    ///
    /// A live set whose context has no call on top matching this ret's own
    /// call site (an empty context, or one whose innermost record belongs
    /// to a different call) did not arrive here via this call/ret pair and
    /// is not propagated (spec invariant: a ret dummy only forwards live
    /// sets whose context stack actually has a matching call to pop).
    fn transfer_ret(&self, idx: NodeIndex, parent_block: Addr, out_state: LiveVars) -> AnalysisResult<LiveVars> {
        let existing = self.states.get(&idx);
        let mut livesets = crate::common::Set::new();

        let matches_this_call = |ls: &QualifiedLiveSet| {
            ls.ctx.top().is_some_and(|top| top.call_site().parent_block == parent_block)
        };

        for ls in out_state.livesets() {
            let expanded = existing
                .map(|prev| prev.represented_by(ls))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| crate::common::Set::from([ls.clone()]));

            for mut e in expanded.into_iter().filter(matches_this_call) {
                e.ctx.pop();
                livesets.insert(e);
            }
        }

        Ok(LiveVars::with_livesets(out_state.fn_addr, out_state.sp, out_state.bp, livesets))
    }
}

/// The meet operator for the liveness lattice: set union over qualified
/// live sets sharing a context, union of the context sets otherwise. Two
/// `LiveVars` are joined by unioning their `QualifiedLiveSet`s outright —
/// sets with identical (ctx, uses) pairs collapse automatically since
/// `livesets` is itself a set.
fn join(a: LiveVars, b: &LiveVars) -> LiveVars {
    let mut livesets: crate::common::Set<QualifiedLiveSet> = a.livesets().clone();
    livesets.extend(b.livesets().iter().cloned());
    LiveVars::with_livesets(a.fn_addr, a.sp, a.bp, livesets)
}
