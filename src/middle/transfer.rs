//! The transfer function (spec component C4): tmp elimination, the
//! per-statement use/def computation, and application of both to a block's
//! worth of live state in reverse (backward liveness) order.
//!
//! Grounded in the reference implementation's `engine.py` (tmp
//! substitution, indirect-jump recognition, per-statement kill/gen order)
//! and `live_vars.py` (`vars_modified`/`vars_used`/`vars_used_expr`).

use crate::back::diagnostic::Diagnostic;
use crate::common::Map;
use crate::front::arch::Arch;
use crate::front::ir::{Block, CodeLoc, Expr, IrType, Jumpkind, Stmt};
use crate::middle::atoms::{memory_location, Var};
use crate::middle::context::ExecutionCtx;
use crate::middle::liveset::{LiveVars, VarUse};

/// Substitute every `RdTmp` in `expr` with its bound value in `tmps`,
/// recursively. An unbound tmp is a lift gap (a `WrTmp` the pre-pass missed,
/// or a tmp genuinely read before being written): the expression is
/// returned unchanged and a diagnostic is emitted, rather than panicking.
pub fn replace_tmps(expr: &Expr, tmps: &Map<u32, Expr>, diagnostics: &mut Vec<Diagnostic>) -> Expr {
    match expr {
        Expr::RdTmp(t) => match tmps.get(t) {
            Some(bound) => replace_tmps(bound, tmps, diagnostics),
            None => {
                diagnostics.push(Diagnostic::unimplemented(
                    format!("t{t} not bound while eliminating temporaries"),
                    None,
                ));
                expr.clone()
            }
        },
        Expr::Unop { op, args } => Expr::Unop {
            op: *op,
            args: args.iter().map(|e| replace_tmps(e, tmps, diagnostics)).collect(),
        },
        Expr::Binop { op, args } => Expr::Binop {
            op: *op,
            args: args.iter().map(|e| replace_tmps(e, tmps, diagnostics)).collect(),
        },
        Expr::Triop { op, args } => Expr::Triop {
            op: *op,
            args: args.iter().map(|e| replace_tmps(e, tmps, diagnostics)).collect(),
        },
        Expr::Qop { op, args } => Expr::Qop {
            op: *op,
            args: args.iter().map(|e| replace_tmps(e, tmps, diagnostics)).collect(),
        },
        Expr::Load { end, ty, addr } => Expr::Load {
            end: *end,
            ty: *ty,
            addr: Box::new(replace_tmps(addr, tmps, diagnostics)),
        },
        Expr::Ite { cond, iftrue, iffalse } => Expr::Ite {
            cond: Box::new(replace_tmps(cond, tmps, diagnostics)),
            iftrue: Box::new(replace_tmps(iftrue, tmps, diagnostics)),
            iffalse: Box::new(replace_tmps(iffalse, tmps, diagnostics)),
        },
        Expr::CCall { retty, cee, args } => Expr::CCall {
            retty: *retty,
            cee: cee.clone(),
            args: args.iter().map(|e| replace_tmps(e, tmps, diagnostics)).collect(),
        },
        Expr::Get { .. } | Expr::Const(_) | Expr::GetI { .. } => expr.clone(),
    }
}

fn replace_tmps_stmt(stmt: &Stmt, tmps: &Map<u32, Expr>, diagnostics: &mut Vec<Diagnostic>) -> Stmt {
    match stmt {
        Stmt::Put { offset, data } => {
            Stmt::Put { offset: *offset, data: replace_tmps(data, tmps, diagnostics) }
        }
        Stmt::WrTmp { .. } => Stmt::NoOp,
        Stmt::Store { addr, data, end } => Stmt::Store {
            addr: replace_tmps(addr, tmps, diagnostics),
            data: replace_tmps(data, tmps, diagnostics),
            end: *end,
        },
        Stmt::Exit { guard, dst, jumpkind, offs_ip } => Stmt::Exit {
            guard: replace_tmps(guard, tmps, diagnostics),
            dst: replace_tmps(dst, tmps, diagnostics),
            jumpkind: jumpkind.clone(),
            offs_ip: *offs_ip,
        },
        Stmt::IMark { .. } | Stmt::AbiHint { .. } | Stmt::NoOp => stmt.clone(),
    }
}

/// Scan a block's statements and record the value bound to each `WrTmp`,
/// substituting away any tmps the value itself refers to as it goes. Thanks
/// to the source IR being in SSA form for temporaries, a single left-to-right
/// pass suffices.
pub fn compute_tmp_map(block: &Block, diagnostics: &mut Vec<Diagnostic>) -> Map<u32, Expr> {
    let mut tmps = Map::new();
    for stmt in &block.statements {
        if let Stmt::WrTmp { tmp, data } = stmt {
            let resolved = replace_tmps(data, &tmps, diagnostics);
            tmps.insert(*tmp, resolved);
        }
    }
    tmps
}

/// If `block` ends in an indirect jump (a non-constant `Boring` or `Call`
/// target), the unresolved target expression.
pub fn is_indirect_jump_block(block: &Block) -> Option<&Expr> {
    match block.jumpkind {
        Jumpkind::Boring | Jumpkind::Call => match &block.next {
            Expr::Const(_) => None,
            target => Some(target),
        },
        _ => None,
    }
}

/// If `stmt` is a (possibly conditional) indirect jump, its unresolved
/// target expression.
pub fn is_indirect_jump_stmt(stmt: &Stmt) -> Option<&Expr> {
    match stmt {
        Stmt::Exit { dst, jumpkind: Jumpkind::Boring | Jumpkind::Call, .. } => match dst {
            Expr::Const(_) => None,
            target => Some(target),
        },
        _ => None,
    }
}

/// Variables read by evaluating `expr`.
pub fn vars_used_expr(expr: &Expr, ctx: &ExecutionCtx, arch: &dyn Arch) -> Vec<Var> {
    match expr {
        Expr::Get { offset, ty } if *offset != arch.sp_offset() && *offset != arch.bp_offset() => {
            vec![Var::register(*offset, arch.type_size_bytes(*ty))]
        }
        Expr::Load { ty, addr, .. } => {
            let mut out = vec![memory_location(addr, ctx, arch, *ty)];
            out.extend(vars_used_expr(addr, ctx, arch));
            out
        }
        Expr::Unop { args, .. } | Expr::Binop { args, .. } | Expr::Triop { args, .. } | Expr::Qop { args, .. } => {
            args.iter().flat_map(|e| vars_used_expr(e, ctx, arch)).collect()
        }
        Expr::Ite { cond, iftrue, iffalse } => {
            let mut out = vars_used_expr(cond, ctx, arch);
            out.extend(vars_used_expr(iffalse, ctx, arch));
            out.extend(vars_used_expr(iftrue, ctx, arch));
            out
        }
        _ => Vec::new(),
    }
}

/// Variables modified by executing `stmt`.
pub fn vars_modified(
    stmt: &Stmt,
    ctx: &ExecutionCtx,
    arch: &dyn Arch,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Var> {
    match stmt {
        Stmt::Put { offset, data } => {
            if *offset == arch.sp_offset() || *offset == arch.bp_offset() || *offset == arch.ip_offset() {
                Vec::new()
            } else {
                let ty = data.result_type().unwrap_or(IrType::I64);
                vec![Var::register(*offset, arch.type_size_bytes(ty))]
            }
        }
        Stmt::Store { addr, data, .. } => {
            let ty = data.result_type().unwrap_or(IrType::I64);
            vec![memory_location(addr, ctx, arch, ty)]
        }
        // These carry no liveness effect: `IMark` is a bookkeeping marker,
        // `AbiHint` is a redzone annotation, `NoOp` is exactly that, and a
        // conditional `Exit` only ever reads (see `vars_used`).
        Stmt::IMark { .. } | Stmt::AbiHint { .. } | Stmt::NoOp | Stmt::Exit { .. } => Vec::new(),
        Stmt::WrTmp { .. } => {
            diagnostics.push(Diagnostic::unimplemented(
                "vars_modified called on a WrTmp; tmps should have been eliminated before reaching here".to_string(),
                None,
            ));
            Vec::new()
        }
    }
}

/// Variables read by `stmt` (as opposed to the variables it writes).
pub fn vars_used(
    stmt: &Stmt,
    ctx: &ExecutionCtx,
    arch: &dyn Arch,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Var> {
    match stmt {
        Stmt::Put { data, .. } => vars_used_expr(data, ctx, arch),
        Stmt::Store { addr, data, .. } => {
            let mut out = vars_used_expr(addr, ctx, arch);
            out.extend(vars_used_expr(data, ctx, arch));
            out
        }
        // A conditional exit always reads its guard; its (possibly
        // indirect) target is handled separately and unconditionally by
        // `handle_stmt` via `is_indirect_jump_stmt`.
        Stmt::Exit { guard, .. } => vars_used_expr(guard, ctx, arch),
        Stmt::IMark { .. } | Stmt::AbiHint { .. } | Stmt::NoOp => Vec::new(),
        Stmt::WrTmp { .. } => {
            diagnostics.push(Diagnostic::unimplemented(
                "vars_used called on a WrTmp; tmps should have been eliminated before reaching here".to_string(),
                None,
            ));
            Vec::new()
        }
    }
}

/// Apply one statement's effect to every qualified live set of `live`, in
/// place. `stmt` must already have had its tmps eliminated.
///
/// Order is kill-then-gen: a write always removes prior uses of the
/// variable it defines before this statement's own operands are considered.
/// A defining statement (`Put`/`Store`) only re-generates uses of its
/// operands if the variable it defines was actually live beforehand — a
/// dead store does not make its inputs live. Indirect jump targets are the
/// one exception: their uses are always generated, live or not, since
/// resolving them is the entire point of the analysis.
fn handle_stmt(
    live: &mut LiveVars,
    stmt: &Stmt,
    codeloc: CodeLoc,
    arch: &dyn Arch,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ctx = ExecutionCtx::new(
        live.fn_addr,
        live.sp,
        live.bp,
        crate::middle::context::CallString::new(),
    );

    let used = vars_used(stmt, &ctx, arch, diagnostics);
    let modified = vars_modified(stmt, &ctx, arch, diagnostics);
    let indirect_jump_target = is_indirect_jump_stmt(stmt).map(|e| vars_used_expr(e, &ctx, arch));

    let mut new_livesets = crate::common::Set::new();
    for mut ls in std::mem::take(live.livesets_mut()).into_iter() {
        let was_live = modified.iter().any(|v| ls.uses.iter().any(|u| &u.var == v));
        ls.kill_vars(modified.iter());

        if let Some(target_vars) = &indirect_jump_target {
            ls.gen_uses(target_vars.iter().cloned().map(|v| VarUse::new(v, codeloc)));
        } else if was_live || modified.is_empty() {
            ls.gen_uses(used.iter().cloned().map(|v| VarUse::new(v, codeloc)));
        }

        new_livesets.insert(ls);
    }
    *live.livesets_mut() = new_livesets;
}

/// Apply a full block's worth of statements to `live`, processing them in
/// reverse (since liveness flows backward). `tmps` must already hold this
/// block's tmp bindings (see `compute_tmp_map`); the fixpoint driver caches
/// these per block address so they are computed once no matter how many
/// times the block is visited during the fixpoint.
///
/// If the block ends in an indirect jump, the uses needed to evaluate its
/// target are generated unconditionally before any statement is processed,
/// matching the reference engine's "unconditionally generate liveness for
/// indirect jump targets" step.
pub fn transfer_block(
    live: &mut LiveVars,
    block: &Block,
    tmps: &Map<u32, Expr>,
    arch: &dyn Arch,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(target) = is_indirect_jump_block(block) {
        let ctx = ExecutionCtx::new(live.fn_addr, live.sp, live.bp, crate::middle::context::CallString::new());
        let target_vars = vars_used_expr(target, &ctx, arch);
        let codeloc = CodeLoc::new(block.addr, block.statements.len());
        let mut new_livesets = crate::common::Set::new();
        for mut ls in std::mem::take(live.livesets_mut()).into_iter() {
            ls.gen_uses(target_vars.iter().cloned().map(|v| VarUse::new(v, codeloc)));
            new_livesets.insert(ls);
        }
        *live.livesets_mut() = new_livesets;
    }

    for (idx, stmt) in block.statements.iter().enumerate().rev() {
        if matches!(stmt, Stmt::WrTmp { .. }) {
            continue;
        }

        let resolved = replace_tmps_stmt(stmt, tmps, diagnostics);
        let codeloc = CodeLoc::new(block.addr, idx);
        handle_stmt(live, &resolved, codeloc, arch, diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::ir::{Const, Endian};

    #[derive(Debug)]
    struct TestArch;
    impl Arch for TestArch {
        fn sp_offset(&self) -> i64 {
            48
        }
        fn bp_offset(&self) -> i64 {
            56
        }
        fn ip_offset(&self) -> i64 {
            64
        }
        fn translate_register_name(&self, offset: i64, _size: u32) -> String {
            format!("r{offset}")
        }
    }

    #[test]
    fn tmp_elimination_substitutes_wrtmp_bindings() {
        let block = Block {
            addr: 0x10,
            statements: vec![
                Stmt::WrTmp { tmp: 0, data: Expr::const_u64(42) },
                Stmt::Put { offset: 16, data: Expr::RdTmp(0) },
            ],
            next: Expr::const_u64(0x20),
            jumpkind: Jumpkind::Boring,
        };
        let mut diagnostics = Vec::new();
        let tmps = compute_tmp_map(&block, &mut diagnostics);
        assert_eq!(tmps.get(&0), Some(&Expr::const_u64(42)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unbound_tmp_is_a_diagnostic_not_a_panic() {
        let mut diagnostics = Vec::new();
        let resolved = replace_tmps(&Expr::RdTmp(7), &Map::new(), &mut diagnostics);
        assert_eq!(resolved, Expr::RdTmp(7));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn store_defines_a_dead_write_does_not_make_its_address_live() {
        let arch = TestArch;
        let mut live = LiveVars::empty(0x1000, 0, None);
        let stmt = Stmt::Store {
            addr: Expr::get(48, IrType::I64),
            data: Expr::get(0, IrType::I64),
            end: Endian::Little,
        };
        let mut diagnostics = Vec::new();
        handle_stmt(&mut live, &stmt, CodeLoc::new(0x10, 0), &arch, &mut diagnostics);
        assert!(live.unqualified_uses().is_empty());
    }

    #[test]
    fn indirect_jump_target_is_generated_unconditionally() {
        let arch = TestArch;
        let mut live = LiveVars::empty(0x1000, 0, None);
        let block = Block {
            addr: 0x10,
            statements: vec![],
            next: Expr::get(0, IrType::I64),
            jumpkind: Jumpkind::Boring,
        };
        let mut diagnostics = Vec::new();
        let tmps = compute_tmp_map(&block, &mut diagnostics);
        transfer_block(&mut live, &block, &tmps, &arch, &mut diagnostics);
        assert_eq!(live.unqualified_uses().len(), 1);
    }

    #[test]
    fn put_to_ip_register_has_no_effect() {
        let arch = TestArch;
        let ctx = ExecutionCtx::new(0x1000, 0, None, crate::middle::context::CallString::new());
        let mut diagnostics = Vec::new();
        let stmt = Stmt::Put { offset: 64, data: Expr::const_u64(0x20) };
        assert!(vars_modified(&stmt, &ctx, &arch, &mut diagnostics).is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn const_next_is_not_an_indirect_jump() {
        let block = Block {
            addr: 0x10,
            statements: vec![],
            next: Expr::Const(Const::U64(0x20)),
            jumpkind: Jumpkind::Boring,
        };
        assert!(is_indirect_jump_block(&block).is_none());
    }
}
