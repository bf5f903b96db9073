//! The context model (spec component C2): calling contexts used to qualify
//! live variable uses across call boundaries.
//!
//! Grounded in the reference implementation's `context.py`. `CtxRecord`'s
//! equality and hashing deliberately ignore the recorded stack/base
//! pointers — two records are the same calling context iff they denote the
//! same call site, regardless of what the frame pointers happened to be
//! when the engine passed through it. `CallString` orders primarily by
//! length (shorter first), with per-position call-site address as a
//! tiebreak, which the representative-contraction logic in
//! `middle::fixpoint` relies on to pick a canonical (shortest, lowest)
//! context among equivalent ones.

use crate::common::{Addr, Offset};
use crate::middle::supergraph::DummyKind;

/// The identity of a call site: the block that issued the call, and which
/// half of the call/return pair this record marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub parent_block: Addr,
    pub call_addr: Addr,
    pub kind: DummyKind,
}

/// One entry in a `CallString`: a call site plus the stack/base pointer
/// values recorded at the time the call was taken.
#[derive(Clone, Copy, Debug)]
pub struct CtxRecord {
    call_site: CallSite,
    sp: Offset,
    bp: Option<Offset>,
}

impl CtxRecord {
    pub fn new(call_site: CallSite, sp: Offset, bp: Option<Offset>) -> CtxRecord {
        CtxRecord { call_site, sp, bp }
    }

    pub fn call_site(&self) -> CallSite {
        self.call_site
    }

    pub fn call_addr(&self) -> Addr {
        self.call_site.call_addr
    }

    pub fn stack_ptr(&self) -> Offset {
        self.sp
    }

    pub fn base_ptr(&self) -> Option<Offset> {
        self.bp
    }
}

impl PartialEq for CtxRecord {
    fn eq(&self, other: &CtxRecord) -> bool {
        self.call_site == other.call_site
    }
}

impl Eq for CtxRecord {}

impl std::hash::Hash for CtxRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.call_site.hash(state);
    }
}

/// A full calling context: a stack of `CtxRecord`s, bottom (outermost call)
/// first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CallString {
    records: Vec<CtxRecord>,
}

impl CallString {
    pub fn new() -> CallString {
        CallString { records: Vec::new() }
    }

    pub fn from_records(records: Vec<CtxRecord>) -> CallString {
        CallString { records }
    }

    pub fn top(&self) -> Option<&CtxRecord> {
        self.records.last()
    }

    pub fn push(&mut self, record: CtxRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<CtxRecord> {
        self.records.pop()
    }

    pub fn stack(&self) -> &[CtxRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Can this call string represent `other` — i.e. is it a prefix of it?
    ///
    /// Used to contract unboundedly deep calling contexts (e.g. from
    /// recursion) down to a single representative, and conversely to expand
    /// a representative back out once the recursive call sequence unwinds
    /// (see `middle::liveset::LiveVars::representative`/`represented_by`).
    pub fn can_represent(&self, other: &CallString) -> bool {
        if other.records.len() < self.records.len() {
            return false;
        }
        self.records.iter().zip(other.records.iter()).all(|(a, b)| a == b)
    }
}

impl PartialOrd for CallString {
    fn partial_cmp(&self, other: &CallString) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CallString {
    /// Primary key is length (shorter contexts sort first); ties are broken
    /// by each position's call-site address.
    fn cmp(&self, other: &CallString) -> std::cmp::Ordering {
        match self.records.len().cmp(&other.records.len()) {
            std::cmp::Ordering::Equal => {}
            ord => return ord,
        }
        for (a, b) in self.records.iter().zip(other.records.iter()) {
            match a.call_addr().cmp(&b.call_addr()) {
                std::cmp::Ordering::Equal => continue,
                ord => return ord,
            }
        }
        std::cmp::Ordering::Equal
    }
}

/// A point in the interprocedural analysis: the function currently
/// executing, the calling context that reached it, and the current
/// frame-space values of the stack/base pointers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionCtx {
    fn_addr: Addr,
    sp: Offset,
    bp: Option<Offset>,
    callstring: CallString,
}

impl ExecutionCtx {
    pub fn new(fn_addr: Addr, sp: Offset, bp: Option<Offset>, callstring: CallString) -> ExecutionCtx {
        ExecutionCtx { fn_addr, sp, bp, callstring }
    }

    pub fn fn_addr(&self) -> Addr {
        self.fn_addr
    }

    pub fn stack_ptr(&self) -> Offset {
        self.sp
    }

    pub fn base_ptr(&self) -> Option<Offset> {
        self.bp
    }

    pub fn callstring(&self) -> &CallString {
        &self.callstring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(parent_block: Addr, kind: DummyKind) -> CallSite {
        CallSite { parent_block, call_addr: parent_block, kind }
    }

    #[test]
    fn ctx_record_equality_ignores_stack_and_base_pointers() {
        let a = CtxRecord::new(site(0x10, DummyKind::Call), -8, Some(-16));
        let b = CtxRecord::new(site(0x10, DummyKind::Call), -24, Some(0));
        assert_eq!(a, b);
    }

    #[test]
    fn ctx_record_distinguishes_call_sites() {
        let a = CtxRecord::new(site(0x10, DummyKind::Call), -8, None);
        let b = CtxRecord::new(site(0x20, DummyKind::Call), -8, None);
        assert_ne!(a, b);
    }

    #[test]
    fn can_represent_is_prefix_relation() {
        let mut short = CallString::new();
        short.push(CtxRecord::new(site(0x10, DummyKind::Call), 0, None));

        let mut long = short.clone();
        long.push(CtxRecord::new(site(0x20, DummyKind::Call), 0, None));

        assert!(short.can_represent(&long));
        assert!(!long.can_represent(&short));
        assert!(short.can_represent(&short));
    }

    #[test]
    fn ordering_is_by_length_first_then_call_addr() {
        let mut a = CallString::new();
        a.push(CtxRecord::new(
            CallSite { parent_block: 0x10, call_addr: 0x11, kind: DummyKind::Call },
            0,
            None,
        ));

        let mut b = CallString::new();
        b.push(CtxRecord::new(
            CallSite { parent_block: 0x10, call_addr: 0x22, kind: DummyKind::Call },
            0,
            None,
        ));

        // Same length: tiebreak by call-site address.
        assert!(a < b);

        // A longer context with lower-addressed call sites still sorts
        // after a shorter one: length is the primary key.
        let mut c = CallString::new();
        c.push(CtxRecord::new(
            CallSite { parent_block: 0x01, call_addr: 0x01, kind: DummyKind::Call },
            0,
            None,
        ));
        c.push(CtxRecord::new(
            CallSite { parent_block: 0x02, call_addr: 0x02, kind: DummyKind::Call },
            0,
            None,
        ));
        assert!(b < c);
    }
}
