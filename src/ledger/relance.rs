use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::Money;

/// Dunning reminder for an overdue invoice. At most one exists per
/// (invoice, level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relance {
    pub id: Uuid,
    pub invoice_id: Uuid,
    /// 1-based reminder level.
    pub level: u8,
    pub scheduled_for: NaiveDate,
    /// Balance owed when the reminder was scheduled.
    pub amount_due: Money,
    pub created_at: DateTime<Utc>,
}
