//! Entity trait: identity that stays stable across state changes.

/// Entity marker + minimal interface.
///
/// Sales history entries are entities keyed by their order id; two entries
/// with the same id describe the same sale.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
