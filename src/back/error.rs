//! Typed errors for programming-error conditions (spec §7).
//!
//! These are never recovered: they indicate that an invariant the core
//! relies on (a well-formed supergraph, a state of the expected kind, a
//! node present in the driver's state map) has been breached, almost
//! always by a bug in the caller or in the supergraph builder itself.
//! Contrast with "lift gaps" (an unimplemented `Stmt`/`Expr` variant, an
//! unrecognized SP/BP arithmetic pattern), which are handled by treating the
//! affected variable set as empty and emitting a `Diagnostic` (see
//! `back::diagnostic`), not by returning an `Err` here.

use crate::common::Addr;
use crate::middle::supergraph::DummyKind;
use thiserror::Error;

/// A result type for fallible core operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A dummy node's matching counterpart (call <-> ret) is missing from the
    /// supergraph. Every call-ending block must have been given both a
    /// `Call` and a `Ret` dummy node sharing the same parent block.
    #[error("dummy {kind} node for parent block 0x{parent_block:x} has no matching counterpart")]
    UnmatchedDummyPair { parent_block: Addr, kind: DummyKind },

    /// The fixpoint driver was asked to run the transfer function on a node
    /// that does not carry a basic block (a dummy node, or a simprocedure).
    #[error("expected a block-bearing node, found {found}")]
    WrongNodeKind { found: &'static str },

    /// A supergraph node the driver is visiting has no entry in the per-node
    /// state map. This can only happen if the driver was seeded with a
    /// worklist containing nodes outside the supergraph it was built from.
    #[error("no state recorded for node {node_desc}")]
    MissingState { node_desc: String },

    /// Lifting a block's bytes into IR failed. Surfaced only when the driver
    /// is constructed with `fail_fast = true`; otherwise the block is
    /// skipped and a `Diagnostic` is emitted instead (spec §7).
    #[error("failed to lift block at 0x{addr:x}: {reason}")]
    LiftFailure { addr: Addr, reason: String },
}
