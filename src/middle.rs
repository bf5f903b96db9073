//! The analysis core: variables, contexts, the supergraph, the transfer
//! function, and the fixpoint driver that ties them together.

pub mod atoms;
pub mod context;
pub mod fixpoint;
pub mod liveset;
pub mod supergraph;
pub mod transfer;
pub mod worklist;

pub use atoms::Var;
pub use context::{CallSite, CallString, CtxRecord, ExecutionCtx};
pub use fixpoint::FixpointDriver;
pub use liveset::{LiveVars, QualifiedLiveSet, VarUse};
pub use supergraph::{DummyKind, Supergraph};
