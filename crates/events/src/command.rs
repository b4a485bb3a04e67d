use tillbook_core::RegisterId;

/// A request to change one register.
///
/// Commands express intent ("withdraw 30.00 for a purchase") and are either
/// turned into events or rejected with a domain error. They are never stored.
///
/// Every command names the till it targets so a service can route it to the
/// right snapshot and refuse commands meant for another drawer.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_register_id(&self) -> RegisterId;
}
