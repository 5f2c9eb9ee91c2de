use chrono::{DateTime, Utc};

use crate::models::{Appointment, AppointmentStatus, UpdateAppointmentRequest};

/// Date and status `current` ends up with once `request` is applied.
pub fn resulting_slot(current: &Appointment, request: &UpdateAppointmentRequest) -> (DateTime<Utc>, AppointmentStatus) {
    (
        request.appointment_date.unwrap_or(current.appointment_date),
        request.status.unwrap_or(current.status),
    )
}

/// Whether applying `request` to `current` must pass the conflict check again.
///
/// The result must hold a slot, and either the time moved or the appointment
/// is coming back from Completed/Canceled.
pub fn requires_conflict_check(current: &Appointment, request: &UpdateAppointmentRequest) -> bool {
    let (next_date, next_status) = resulting_slot(current, request);
    next_status.is_active() && (next_date != current.appointment_date || !current.status.is_active())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn appointment(status: AppointmentStatus) -> Appointment {
        let date = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
        Appointment {
            id: 1,
            patient_id: 1,
            appointment_date: date,
            status,
            reason: None,
            notes: None,
            created_at: date,
            updated_at: None,
            patient: None,
        }
    }

    #[test]
    fn only_transitions_into_a_held_slot_from_a_free_one_are_checked() {
        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                let request = UpdateAppointmentRequest::status_only(to);
                let expected = to.is_active() && !from.is_active();
                assert_eq!(requires_conflict_check(&appointment(from), &request), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn status_moves_between_active_states_skip_the_check() {
        let current = appointment(AppointmentStatus::Pending);
        let request = UpdateAppointmentRequest::status_only(AppointmentStatus::Confirmed);
        assert!(!requires_conflict_check(&current, &request));
    }

    #[test]
    fn moving_into_an_inactive_state_skips_the_check() {
        let current = appointment(AppointmentStatus::Confirmed);
        let request = UpdateAppointmentRequest {
            appointment_date: Some(current.appointment_date + Duration::hours(1)),
            status: Some(AppointmentStatus::Canceled),
            ..UpdateAppointmentRequest::default()
        };
        assert!(!requires_conflict_check(&current, &request));
    }

    #[test]
    fn reactivation_is_checked() {
        let current = appointment(AppointmentStatus::Canceled);
        let request = UpdateAppointmentRequest::status_only(AppointmentStatus::Pending);
        assert!(requires_conflict_check(&current, &request));
    }

    #[test]
    fn rescheduling_an_active_appointment_is_checked() {
        let current = appointment(AppointmentStatus::Pending);
        let request = UpdateAppointmentRequest {
            appointment_date: Some(current.appointment_date + Duration::minutes(45)),
            ..UpdateAppointmentRequest::default()
        };
        assert!(requires_conflict_check(&current, &request));

        let same_time = UpdateAppointmentRequest {
            appointment_date: Some(current.appointment_date),
            reason: Some("follow-up".to_string()),
            ..UpdateAppointmentRequest::default()
        };
        assert!(!requires_conflict_check(&current, &same_time));
        assert_eq!(resulting_slot(&current, &same_time), (current.appointment_date, AppointmentStatus::Pending));
    }
}
