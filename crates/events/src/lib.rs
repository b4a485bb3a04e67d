//! Ledger events, commands and the envelope that carries them out of a service.

pub mod command;
pub mod envelope;
pub mod event;

pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
