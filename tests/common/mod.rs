//! Shared test fixtures, mirroring the reference test suite's `mock_nodes.py`.

use ctxlive::common::Addr;
use ctxlive::front::ir::CodeLoc;
use ctxlive::middle::{CallSite, CallString, CtxRecord, DummyKind, ExecutionCtx, Var, VarUse};

pub const DEFAULT_SP: i64 = -24;
pub const DEFAULT_BP: i64 = -8;

/// `num` distinct dummy-call `CallSite`s, with strictly increasing addresses.
pub fn arbitrary_call_sites(num: u64) -> Vec<CallSite> {
    (0..num)
        .map(|addr| CallSite { parent_block: addr, call_addr: addr, kind: DummyKind::Call })
        .collect()
}

/// `num` distinct, arbitrary `Var`s.
pub fn arbitrary_vars(num: i64) -> Vec<Var> {
    (0..num).map(|offset| Var::register(-offset, 1)).collect()
}

/// `num` uses of each of `vars`, at arbitrary, unique addresses.
pub fn arbitrary_var_uses(vars: &[Var], num: u64) -> Vec<(Var, Vec<VarUse>)> {
    vars.iter()
        .map(|var| {
            let uses = (0..num).map(|addr: Addr| VarUse::new(var.clone(), CodeLoc::new(addr, 0))).collect();
            (var.clone(), uses)
        })
        .collect()
}

/// `num` fake context records, all with `DEFAULT_SP`/`DEFAULT_BP`.
pub fn arbitrary_records(num: u64) -> Vec<CtxRecord> {
    arbitrary_call_sites(num)
        .into_iter()
        .map(|site| CtxRecord::new(site, DEFAULT_SP, Some(DEFAULT_BP)))
        .collect()
}

pub fn arbitrary_call_string(num: u64) -> CallString {
    CallString::from_records(arbitrary_records(num))
}

pub fn arbitrary_context() -> ExecutionCtx {
    ExecutionCtx::new(128, DEFAULT_SP, Some(DEFAULT_BP), CallString::new())
}
