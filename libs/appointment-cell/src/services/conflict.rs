use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::warn;

use shared_database::supabase::encode_value;

use crate::models::ScheduledSlot;

/// Minimum distance between two active appointments.
pub const SLOT_MINUTES: i64 = 30;

pub fn slot_length() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// True when two start times are strictly less than one slot apart.
pub fn overlaps(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).abs() < slot_length()
}

/// Open interval `(date - slot, date + slot)` of start times that collide with `date`.
pub fn conflict_window(date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (date - slot_length(), date + slot_length())
}

/// PostgREST filter selecting active appointments inside the conflict window.
pub fn conflict_query(date: DateTime<Utc>, exclude_id: Option<i64>) -> String {
    let (lower, upper) = conflict_window(date);
    let mut query = format!(
        "select=id,appointment_date,status&appointment_date=gt.{}&appointment_date=lt.{}&status=in.(Pending,Confirmed)",
        encode_value(&lower.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        encode_value(&upper.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    );
    if let Some(id) = exclude_id {
        query.push_str(&format!("&id=neq.{}", id));
    }
    query
}

/// First active slot colliding with `requested`, ignoring `exclude_id`.
///
/// Storage filters by window and status as well; the rule is applied again here.
pub fn find_conflict(
    requested: DateTime<Utc>,
    candidates: &[ScheduledSlot],
    exclude_id: Option<i64>,
) -> Option<&ScheduledSlot> {
    let conflict = candidates.iter().find(|slot| {
        Some(slot.id) != exclude_id && slot.status.is_active() && overlaps(requested, slot.appointment_date)
    });

    if let Some(slot) = conflict {
        warn!(
            "Requested time {} collides with appointment {} at {}",
            requested, slot.id, slot.appointment_date
        );
    }
    conflict
}
