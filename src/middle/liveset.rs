//! Per-node analysis state: a use of a variable, a live set qualified by a
//! calling context, and the full per-node state (`LiveVars`) that aggregates
//! one qualified live set per reachable calling context.
//!
//! Grounded in the reference implementation's `live_vars.py`.

use crate::common::{Addr, Offset, Set};
use crate::front::ir::CodeLoc;
use crate::middle::atoms::Var;
use crate::middle::context::CallString;

/// A use of a variable at a particular program point.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarUse {
    pub var: Var,
    pub codeloc: CodeLoc,
}

impl VarUse {
    pub fn new(var: Var, codeloc: CodeLoc) -> VarUse {
        VarUse { var, codeloc }
    }
}

/// A set of variable uses qualified by the calling context under which they
/// were observed live.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedLiveSet {
    pub ctx: CallString,
    pub uses: Set<VarUse>,
}

impl QualifiedLiveSet {
    pub fn new(ctx: CallString) -> QualifiedLiveSet {
        QualifiedLiveSet { ctx, uses: Set::new() }
    }

    pub fn with_uses(ctx: CallString, uses: Set<VarUse>) -> QualifiedLiveSet {
        QualifiedLiveSet { ctx, uses }
    }

    /// Can this `QualifiedLiveSet` represent `other`?
    ///
    /// True iff the two denote the same set of live uses and this one's
    /// context is a prefix of the other's — i.e. this is a valid (shorter or
    /// equal) stand-in for `other` under context contraction.
    pub fn can_represent(&self, other: &QualifiedLiveSet) -> bool {
        self.uses == other.uses && self.ctx.can_represent(&other.ctx)
    }

    pub fn gen_uses(&mut self, uses: impl IntoIterator<Item = VarUse>) {
        self.uses.extend(uses);
    }

    /// Remove all uses of any of `vars` from this live set.
    pub fn kill_vars<'a>(&mut self, vars: impl IntoIterator<Item = &'a Var>) {
        let vars: Vec<&Var> = vars.into_iter().collect();
        self.uses.retain(|u| !vars.iter().any(|v| *v == &u.var));
    }
}

/// The per-node state of the interprocedural liveness analysis: a set of
/// `QualifiedLiveSet`s, one per calling context under which this node has
/// been reached, plus the frame-space pointer values valid at this point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveVars {
    pub fn_addr: Addr,
    pub sp: Offset,
    pub bp: Option<Offset>,
    livesets: Set<QualifiedLiveSet>,
}

impl LiveVars {
    /// A fresh, empty state: a single empty live set under the empty calling
    /// context.
    pub fn empty(fn_addr: Addr, sp: Offset, bp: Option<Offset>) -> LiveVars {
        let mut livesets = Set::new();
        livesets.insert(QualifiedLiveSet::new(CallString::new()));
        LiveVars { fn_addr, sp, bp, livesets }
    }

    pub fn with_livesets(
        fn_addr: Addr,
        sp: Offset,
        bp: Option<Offset>,
        livesets: Set<QualifiedLiveSet>,
    ) -> LiveVars {
        LiveVars { fn_addr, sp, bp, livesets }
    }

    pub fn livesets(&self) -> &Set<QualifiedLiveSet> {
        &self.livesets
    }

    pub fn livesets_mut(&mut self) -> &mut Set<QualifiedLiveSet> {
        &mut self.livesets
    }

    /// The union of every qualified live set's uses, discarding context.
    pub fn unqualified_uses(&self) -> Set<VarUse> {
        self.livesets.iter().flat_map(|ls| ls.uses.iter().cloned()).collect()
    }

    /// Every use of `var` in this state, discarding context.
    pub fn uses_of_var(&self, var: &Var) -> Set<VarUse> {
        self.unqualified_uses().into_iter().filter(|u| &u.var == var).collect()
    }

    /// The least `QualifiedLiveSet` (by context length, then call-site
    /// address) in this state that can represent `liveset` — i.e. the
    /// canonical, shortest context among those equivalent to it. Used to
    /// bound the number and length of calling contexts created for
    /// recursive call cycles.
    pub fn representative(&self, liveset: &QualifiedLiveSet) -> Option<&QualifiedLiveSet> {
        self.livesets
            .iter()
            .filter(|ls| ls.can_represent(liveset))
            .min_by(|a, b| a.ctx.cmp(&b.ctx))
    }

    /// The set of `QualifiedLiveSet`s in this state whose context is
    /// represented by `liveset`'s, each carrying `liveset`'s uses. Used to
    /// re-expand a calling context that was contracted to a representative
    /// once the recursive call sequence that produced it unwinds.
    pub fn represented_by(&self, liveset: &QualifiedLiveSet) -> Set<QualifiedLiveSet> {
        self.livesets
            .iter()
            .filter(|ls| liveset.ctx.can_represent(&ls.ctx))
            .map(|ls| QualifiedLiveSet::with_uses(ls.ctx.clone(), liveset.uses.clone()))
            .collect()
    }
}
