//! `tillbook-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no logging setup):
//! money, identifiers, the domain error model and the aggregate traits the
//! register and sales modules are written against.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{RegisterId, SessionId};
pub use money::Money;
