//! Call frames and scopes (§4.3 "Call frames", "Scopes and lifetimes").
//!
//! A [`Frame`] is one function activation: where its result goes, the
//! bindings introduced by its parameters and `var` statements, and the
//! bookkeeping needed to unwind persistent allocations in reverse order
//! when a scope exits and to catch an ephemeral leaking past the
//! statement that produced it (§8 invariant 3).

use ahash::AHashMap;

use crate::{ast::BindingId, memory::Address};

/// A loop's `break`/`continue` targets, recorded as the persistent-
/// allocation stack depth to reclaim back to (§4.3 `While`).
pub struct LoopContext {
    pub mark: usize,
}

pub struct Frame {
    /// Where this activation's `Return` writes its value; owned by the
    /// caller, not by this frame.
    pub result_address: Address,
    pub locals: AHashMap<BindingId, Address>,
    /// Persistent allocations made since this frame started, in
    /// allocation order; deallocated in reverse on scope exit.
    pub persistent: Vec<Address>,
    /// Ephemeral allocations currently outstanding. Only ever holds at
    /// most one entry between the point an expression evaluation
    /// allocates it and the point its consumer frees it; checked empty
    /// at every statement boundary.
    pub ephemeral: Vec<Address>,
    pub loops: Vec<LoopContext>,
}

impl Frame {
    pub fn new(result_address: Address) -> Self {
        Self { result_address, locals: AHashMap::new(), persistent: Vec::new(), ephemeral: Vec::new(), loops: Vec::new() }
    }

    pub fn mark(&self) -> usize {
        self.persistent.len()
    }

    pub fn assert_ephemeral_empty(&self) {
        debug_assert!(self.ephemeral.is_empty(), "ephemeral allocation leaked past a statement boundary");
    }
}
