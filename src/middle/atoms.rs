//! The variable model (spec component C1): the atoms a live-variables
//! analysis tracks.
//!
//! Grounded in the reference implementation's `vars.py`: a closed,
//! non-extensible set of three variable kinds, plus the two constructors
//! (`stack_var`, `memory_location`) that recognize a stack/base-pointer
//! relative address and fall back to an opaque `MemoryLocation` otherwise.

use crate::common::{Addr, Offset};
use crate::front::arch::Arch;
use crate::front::ir::{Const, Expr, IrType};
use crate::middle::context::ExecutionCtx;

/// A variable the analysis can track liveness for.
///
/// Closed by design (spec invariant: the variable model is not meant to be
/// extended by callers) — everything the core needs to reason about is
/// either a register-file slot, a local stack slot, or an opaque memory
/// region.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Var {
    /// A register-file slot, identified by its byte offset and size.
    Register { offset: Offset, size: u32 },
    /// A function-local stack slot. `offset` is relative to the function's
    /// stack pointer at entry, which is defined to be zero; negative offsets
    /// are locals, non-negative offsets are incoming stack arguments.
    StackVar { fn_addr: Addr, offset: Offset, size: u32 },
    /// An arbitrary memory region whose address could not be resolved to a
    /// stack-relative offset. `addr` is kept as the IR expression that
    /// computed it (the reference implementation stores the same thing)
    /// rather than an evaluated address, since the core does no concrete
    /// evaluation.
    MemoryLocation { addr: Box<Expr>, size: u32 },
}

impl Var {
    pub fn register(offset: Offset, size: u32) -> Var {
        Var::Register { offset, size }
    }

    pub fn stack_var(fn_addr: Addr, offset: Offset, size: u32) -> Var {
        Var::StackVar { fn_addr, offset, size }
    }

    pub fn memory_location(addr: Expr, size: u32) -> Var {
        Var::MemoryLocation { addr: Box::new(addr), size }
    }

    /// Do two variables denote overlapping storage?
    ///
    /// Only `StackVar`s can be partially aliased this way (registers and
    /// memory locations are compared structurally everywhere else in the
    /// core); two stack vars overlap when their byte ranges intersect within
    /// the same function's frame.
    pub fn overlaps(&self, other: &Var) -> bool {
        match (self, other) {
            (
                Var::StackVar { fn_addr: fa, offset: oa, size: sa },
                Var::StackVar { fn_addr: fb, offset: ob, size: sb },
            ) => fa == fb && *oa < ob + *sb as Offset && *ob < oa + *sa as Offset,
            _ => self == other,
        }
    }

    pub fn human_name(&self, arch: &dyn Arch) -> String {
        match self {
            Var::Register { offset, size } => arch.translate_register_name(*offset, *size),
            Var::StackVar { fn_addr, offset, size } => {
                format!("stack[0x{fn_addr:x}][{offset}:{size}]")
            }
            Var::MemoryLocation { addr, size } => format!("mem[{addr:?}:{size}]"),
        }
    }
}

/// If `addr` is a stack- or base-pointer-relative expression, the `StackVar`
/// it denotes. `None` if it isn't recognized as such (it might still be a
/// valid address; see `memory_location`).
///
/// Recognizes two shapes, matching the reference implementation exactly:
/// a bare `Get(sp|bp)`, or a `Binop(Add|Sub, Get(sp|bp), Const)` in either
/// argument order.
pub fn stack_var(addr: &Expr, ctx: &ExecutionCtx, arch: &dyn Arch, ty: IrType) -> Option<Var> {
    let size = arch.type_size_bytes(ty);

    match addr {
        Expr::Get { offset, .. } if *offset == arch.sp_offset() => {
            Some(Var::stack_var(ctx.fn_addr(), ctx.stack_ptr(), size))
        }
        Expr::Get { offset, .. } if *offset == arch.bp_offset() => {
            ctx.base_ptr().map(|bp| Var::stack_var(ctx.fn_addr(), bp, size))
        }
        Expr::Binop { op, args } if args.len() == 2 => {
            let sign: Offset = if is_add_op(op) {
                1
            } else if is_sub_op(op) {
                -1
            } else {
                return None;
            };

            let (reg, konst) = match (&args[0], &args[1]) {
                (Expr::Get { offset, .. }, Expr::Const(c)) => (*offset, c),
                (Expr::Const(c), Expr::Get { offset, .. }) => (*offset, c),
                _ => return None,
            };

            let delta = sign * konst.as_i64();

            if reg == arch.sp_offset() {
                Some(Var::stack_var(ctx.fn_addr(), ctx.stack_ptr() + delta, size))
            } else if reg == arch.bp_offset() {
                ctx.base_ptr().map(|bp| Var::stack_var(ctx.fn_addr(), bp + delta, size))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_add_op(op: &str) -> bool {
    matches!(op, "Add8" | "Add16" | "Add32" | "Add64")
}

fn is_sub_op(op: &str) -> bool {
    matches!(op, "Sub8" | "Sub16" | "Sub32" | "Sub64")
}

/// The variable denoted by interpreting `addr` as a memory address: a
/// `StackVar` if it is stack/base-pointer relative, otherwise an opaque
/// `MemoryLocation` over the unresolved address expression.
pub fn memory_location(addr: &Expr, ctx: &ExecutionCtx, arch: &dyn Arch, ty: IrType) -> Var {
    match stack_var(addr, ctx, arch, ty) {
        Some(v) => v,
        None => Var::memory_location(addr.clone(), arch.type_size_bytes(ty)),
    }
}
