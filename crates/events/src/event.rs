use chrono::{DateTime, Utc};

/// A fact that happened to a till or a sale.
///
/// Events are immutable and carry their own business time; the schema version
/// lets a persisted event be read back after its shape changes.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "register.cash_withdrawn").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
