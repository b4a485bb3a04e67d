//! First-generation register document (`cashRegisterStatus_v1`).
//!
//! ```json
//! { "isOpen": true, "openedAmount": 100, "openingTimestamp": "29/07/2024, 12:30" }
//! ```
//!
//! It only knew the opening amount, so an upgraded session starts with the
//! current balance equal to it and empty totals.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use tillbook_core::{Money, SessionId};
use tillbook_register::RegisterSnapshot;

const LOCAL_FORMATS: [&str; 4] = [
    "%d/%m/%Y, %H:%M",
    "%d/%m/%Y, %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRegisterState {
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub opened_amount: Option<Money>,
    #[serde(default)]
    pub opening_timestamp: Option<String>,
}

impl LegacyRegisterState {
    /// Canonical snapshot at revision 0. An open document without a usable
    /// amount upgrades to a closed register.
    pub fn upgrade(&self, now: DateTime<Utc>) -> RegisterSnapshot {
        match self.opened_amount {
            Some(amount) if self.is_open && !amount.is_negative() => {
                let opened_at = self
                    .opening_timestamp
                    .as_deref()
                    .and_then(parse_legacy_timestamp)
                    .unwrap_or(now);
                RegisterSnapshot::open(0, SessionId::new(), amount, amount, opened_at)
            }
            _ => RegisterSnapshot::closed(0),
        }
    }
}

/// `dd/mm/yyyy, HH:MM` (wall clock, read as UTC) or RFC 3339.
pub fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
