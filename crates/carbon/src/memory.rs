//! Address-keyed memory (§3.5).
//!
//! `Memory` is a flat arena of root slots, each holding one allocated
//! `Value` of a fixed bound [`Type`]. An [`Address`] is either a bare root
//! slot, or a root plus a chain of [`Projection`]s denoting a field,
//! positional offset, or named part of a composite value stored there.
//! Projections are free: they never allocate a new slot, they share the
//! root's lifetime, and they become invalid once the root is deallocated
//! (the type checker and interpreter together ensure no projection
//! outlives its root — see [`crate::interpret::frame`]).

use smallvec::SmallVec;

use crate::{
    ast::{FieldId, Tuple},
    types::Type,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// A tuple/struct field, by position or label.
    Field(FieldId),
    /// A choice value's discriminator (read-only; synthesized, not
    /// physically stored).
    Discriminant,
    /// A choice value's payload tuple.
    Payload,
}

/// Opaque handle to a slot, or a named part of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    root: u32,
    path: SmallVec<[Projection; 2]>,
}

impl Address {
    fn root(root: u32) -> Self {
        Self { root, path: SmallVec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether `self` and `other` were produced from the same `alloc`
    /// root, regardless of how far either has been projected into. Used
    /// by the interpreter to find the allocation backing a projection it
    /// was handed (§4.3 "freeing a projected ephemeral frees its root").
    pub(crate) fn same_root(&self, other: &Address) -> bool {
        self.root == other.root
    }

    fn extended(&self, projection: Projection) -> Self {
        let mut path = self.path.clone();
        path.push(projection);
        Self { root: self.root, path }
    }

    pub fn field(&self, id: FieldId) -> Self {
        self.extended(Projection::Field(id))
    }

    pub fn discriminant(&self) -> Self {
        self.extended(Projection::Discriminant)
    }

    pub fn payload(&self) -> Self {
        self.extended(Projection::Payload)
    }
}

struct Slot {
    ty: Type,
    mutable: bool,
    value: Value,
}

/// Internal invariant violation: memory was asked to do something a
/// correctly checked program can never trigger (§7, "Internal").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryFault {
    ReadUninitialized,
    ProjectIntoNonComposite,
    FieldNotFound(FieldId),
    DeallocateProjection,
    WrongShape,
}

pub type MemResult<T> = Result<T, MemoryFault>;

#[derive(Default)]
pub struct Memory {
    slots: Vec<Option<Slot>>,
    free: Vec<u32>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a root slot of the given type, initialized to
    /// `Value::Uninit`. Mirrors the reference interpreter's arena-with-
    /// free-list reuse (`Heap`/`Namespaces`), reusing the lowest freed
    /// index before growing the backing `Vec`.
    pub fn alloc(&mut self, ty: Type, mutable: bool) -> Address {
        let slot = Some(Slot { ty, mutable, value: Value::Uninit });
        let root = if let Some(reused) = self.free.pop() {
            self.slots[reused as usize] = slot;
            reused
        } else {
            self.slots.push(slot);
            (self.slots.len() - 1) as u32
        };
        Address::root(root)
    }

    /// Deallocates a root address. Only ever called on addresses the
    /// interpreter itself allocated and is now retiring in reverse
    /// allocation order (§4.3, "Scopes and lifetimes") — never on a
    /// projection, which shares its root's lifetime instead.
    pub fn dealloc(&mut self, addr: &Address) -> MemResult<()> {
        if !addr.is_root() {
            return Err(MemoryFault::DeallocateProjection);
        }
        self.slots[addr.root as usize] = None;
        self.free.push(addr.root);
        Ok(())
    }

    pub fn bound_type(&self, addr: &Address) -> &Type {
        &self.slot(addr).ty
    }

    pub fn is_mutable(&self, addr: &Address) -> bool {
        self.slot(addr).mutable
    }

    fn slot(&self, addr: &Address) -> &Slot {
        self.slots[addr.root as usize].as_ref().expect("use of deallocated address")
    }

    fn slot_mut(&mut self, addr: &Address) -> &mut Slot {
        self.slots[addr.root as usize].as_mut().expect("use of deallocated address")
    }

    /// Reads the value at `addr`, navigating `addr`'s projection path
    /// starting from its root's stored value.
    pub fn read(&self, addr: &Address) -> MemResult<Value> {
        let slot = self.slot(addr);
        Self::navigate(&slot.value, &addr.path).cloned()
    }

    fn navigate<'v>(root: &'v Value, path: &[Projection]) -> MemResult<&'v Value> {
        let Some((first, rest)) = path.split_first() else {
            return if root.is_uninit() { Err(MemoryFault::ReadUninitialized) } else { Ok(root) };
        };
        match (first, root) {
            (Projection::Field(id), Value::Tuple(t)) => {
                let field = t.get(*id).ok_or(MemoryFault::FieldNotFound(*id))?;
                Self::navigate(field, rest)
            }
            (Projection::Field(id), Value::Struct { payload, .. }) => {
                let field = payload.get(*id).ok_or(MemoryFault::FieldNotFound(*id))?;
                Self::navigate(field, rest)
            }
            (Projection::Field(id), Value::Choice { payload, .. }) => {
                let field = payload.get(*id).ok_or(MemoryFault::FieldNotFound(*id))?;
                Self::navigate(field, rest)
            }
            (Projection::Payload, Value::Choice { .. }) => {
                // Handled specially below since it must return an owned Tuple view.
                Err(MemoryFault::ProjectIntoNonComposite)
            }
            (Projection::Discriminant, Value::Choice { .. }) => Err(MemoryFault::ProjectIntoNonComposite),
            _ => Err(MemoryFault::ProjectIntoNonComposite),
        }
    }

    /// Writes `value` at `addr`, allocating intermediate structure lazily:
    /// writing through a field projection requires the parent already be
    /// a (possibly partially uninitialized) composite of the right shape,
    /// which every write site in [`crate::interpret`] establishes before
    /// projecting (TupleLit/struct/choice construction always initializes
    /// the destination's shape first).
    pub fn write(&mut self, addr: &Address, value: Value) -> MemResult<()> {
        let path = addr.path.clone();
        let slot = self.slot_mut(addr);
        Self::write_at(&mut slot.value, &path, value)
    }

    fn write_at(root: &mut Value, path: &[Projection], value: Value) -> MemResult<()> {
        let Some((first, rest)) = path.split_first() else {
            *root = value;
            return Ok(());
        };
        match (first, root) {
            (Projection::Field(id), Value::Tuple(t)) => {
                let field = t.get_mut(*id).ok_or(MemoryFault::FieldNotFound(*id))?;
                Self::write_at(field, rest, value)
            }
            (Projection::Field(id), Value::Struct { payload, .. }) => {
                let field = payload.get_mut(*id).ok_or(MemoryFault::FieldNotFound(*id))?;
                Self::write_at(field, rest, value)
            }
            (Projection::Field(id), Value::Choice { payload, .. }) => {
                let field = payload.get_mut(*id).ok_or(MemoryFault::FieldNotFound(*id))?;
                Self::write_at(field, rest, value)
            }
            _ => Err(MemoryFault::ProjectIntoNonComposite),
        }
    }

    /// Reads a choice value's discriminant as an ordinal, synthesized from
    /// the stored `alternative` index rather than a physically addressed
    /// sub-slot.
    pub fn read_discriminant(&self, addr: &Address) -> MemResult<u32> {
        let slot = self.slot(addr);
        let value = Self::navigate_raw(&slot.value, &addr.path)?;
        match value {
            Value::Choice { alternative, .. } => Ok(*alternative),
            _ => Err(MemoryFault::WrongShape),
        }
    }

    /// Reads a choice value's payload tuple as a fresh root-relative view
    /// (its own fields are then reached via further `Field` projections
    /// appended to `addr.payload()`).
    pub fn read_payload(&self, addr: &Address) -> MemResult<Tuple<Value>> {
        let slot = self.slot(addr);
        let value = Self::navigate_raw(&slot.value, &addr.path)?;
        match value {
            Value::Choice { payload, .. } => Ok(payload.clone()),
            _ => Err(MemoryFault::WrongShape),
        }
    }

    fn navigate_raw<'v>(root: &'v Value, path: &[Projection]) -> MemResult<&'v Value> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(root);
        };
        match (first, root) {
            (Projection::Field(id), Value::Tuple(t)) => {
                Self::navigate_raw(t.get(*id).ok_or(MemoryFault::FieldNotFound(*id))?, rest)
            }
            (Projection::Field(id), Value::Struct { payload, .. }) => {
                Self::navigate_raw(payload.get(*id).ok_or(MemoryFault::FieldNotFound(*id))?, rest)
            }
            (Projection::Field(id), Value::Choice { payload, .. }) => {
                Self::navigate_raw(payload.get(*id).ok_or(MemoryFault::FieldNotFound(*id))?, rest)
            }
            _ => Err(MemoryFault::ProjectIntoNonComposite),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TupleField;

    #[test]
    fn round_trips_an_int() {
        let mut mem = Memory::new();
        let addr = mem.alloc(Type::Int, true);
        mem.write(&addr, Value::Int(42)).unwrap();
        assert!(matches!(mem.read(&addr).unwrap(), Value::Int(42)));
    }

    #[test]
    fn reading_uninitialized_address_faults() {
        let mut mem = Memory::new();
        let addr = mem.alloc(Type::Int, true);
        assert_eq!(mem.read(&addr), Err(MemoryFault::ReadUninitialized));
    }

    #[test]
    fn projects_into_tuple_fields() {
        let mut mem = Memory::new();
        let ty = Type::Tuple(Tuple::new(vec![
            crate::ast::TupleField { id: FieldId::Position(0), value: Type::Int },
            crate::ast::TupleField { id: FieldId::Position(1), value: Type::Bool },
        ]));
        let addr = mem.alloc(ty, true);
        mem.write(
            &addr,
            Value::Tuple(Tuple::new(vec![
                TupleField { id: FieldId::Position(0), value: Value::Uninit },
                TupleField { id: FieldId::Position(1), value: Value::Uninit },
            ])),
        )
        .unwrap();
        let first = addr.field(FieldId::Position(0));
        mem.write(&first, Value::Int(7)).unwrap();
        assert!(matches!(mem.read(&first).unwrap(), Value::Int(7)));
    }

    #[test]
    fn deallocating_a_projection_is_rejected() {
        let mut mem = Memory::new();
        let addr = mem.alloc(Type::Int, true);
        let field = addr.field(FieldId::Position(0));
        assert_eq!(mem.dealloc(&field), Err(MemoryFault::DeallocateProjection));
    }

    #[test]
    fn reuses_freed_slots() {
        let mut mem = Memory::new();
        let a = mem.alloc(Type::Int, true);
        mem.dealloc(&a).unwrap();
        let b = mem.alloc(Type::Bool, true);
        assert_eq!(a.root, b.root);
    }
}
