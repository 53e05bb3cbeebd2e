use anyhow::Context;
use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::menu;
use crate::models::{Appointment, AppointmentStatus, BookingDraft, DialogueState};

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// The engine reached confirmation with a required field missing. The
    /// completeness check is defensive; a correct engine never triggers it.
    #[error("booking draft is missing {0}")]
    Incomplete(&'static str),

    #[error("the requested slot is no longer available")]
    SlotUnavailable,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Durably create one `pending` appointment from a completed draft.
///
/// The whole confirmation write runs in a single transaction: the slot
/// re-check (when slots are exclusive), the insert, and the dialogue-state
/// reset to greeting. Concurrent confirmations for the same slot can never
/// both commit.
pub fn commit(
    conn: &mut Connection,
    user_id: i64,
    draft: &BookingDraft,
    exclusive_slots: bool,
) -> Result<Appointment, CommitError> {
    let service = draft
        .service
        .as_deref()
        .ok_or(CommitError::Incomplete("service"))?;
    let date = draft.date.ok_or(CommitError::Incomplete("date"))?;
    let time = draft.time.as_deref().ok_or(CommitError::Incomplete("time"))?;
    let (start, end) = menu::split_slot(time).ok_or(CommitError::Incomplete("time"))?;

    let now = Utc::now().naive_utc();
    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        date,
        start_time: start.to_string(),
        end_time: end.to_string(),
        service: service.to_string(),
        status: AppointmentStatus::Pending,
        notes: None,
        created_at: now,
        updated_at: now,
    };

    let tx = conn
        .transaction()
        .context("failed to begin booking transaction")?;

    if exclusive_slots && !queries::check_slot_available(&tx, date, start, end)? {
        return Err(CommitError::SlotUnavailable);
    }

    queries::insert_appointment(&tx, &appointment)?;
    queries::upsert_dialogue_state(&tx, user_id, DialogueState::Greeting, &BookingDraft::default())?;

    tx.commit().context("failed to commit booking transaction")?;

    tracing::info!(
        appointment_id = %appointment.id,
        user_id,
        date = %appointment.date,
        slot = time,
        "appointment created"
    );

    Ok(appointment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::NaiveDate;

    fn setup() -> (Connection, i64) {
        let conn = db::init_db(":memory:").unwrap();
        let user = queries::create_user(&conn, "+15551110000", "Guest").unwrap();
        (conn, user.id)
    }

    fn full_draft() -> BookingDraft {
        BookingDraft {
            service: Some("Cleaning".to_string()),
            date: NaiveDate::from_ymd_opt(2030, 12, 25),
            time: Some("09:00-10:00".to_string()),
        }
    }

    #[test]
    fn test_commit_creates_pending_appointment() {
        let (mut conn, user_id) = setup();

        let appointment = commit(&mut conn, user_id, &full_draft(), false).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.start_time, "09:00");
        assert_eq!(appointment.end_time, "10:00");

        let stored = queries::get_appointment_by_id(&conn, &appointment.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.service, "Cleaning");
        assert_eq!(stored.date, NaiveDate::from_ymd_opt(2030, 12, 25).unwrap());
    }

    #[test]
    fn test_commit_resets_dialogue_state() {
        let (mut conn, user_id) = setup();
        queries::upsert_dialogue_state(&conn, user_id, DialogueState::ConfirmingBooking, &full_draft())
            .unwrap();

        commit(&mut conn, user_id, &full_draft(), false).unwrap();

        let (state, draft) = queries::get_dialogue_state(&conn, user_id).unwrap().unwrap();
        assert_eq!(state, DialogueState::Greeting);
        assert_eq!(draft, BookingDraft::default());
    }

    #[test]
    fn test_incomplete_draft_rejected() {
        let (mut conn, user_id) = setup();

        let mut draft = full_draft();
        draft.time = None;
        let err = commit(&mut conn, user_id, &draft, false).unwrap_err();
        assert!(matches!(err, CommitError::Incomplete("time")));

        let mut draft = full_draft();
        draft.service = None;
        let err = commit(&mut conn, user_id, &draft, false).unwrap_err();
        assert!(matches!(err, CommitError::Incomplete("service")));

        // Nothing was written
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_exclusive_slot_collision() {
        let (mut conn, user_id) = setup();
        let other = queries::create_user(&conn, "+15552220000", "Guest").unwrap();

        commit(&mut conn, other.id, &full_draft(), true).unwrap();
        let err = commit(&mut conn, user_id, &full_draft(), true).unwrap_err();
        assert!(matches!(err, CommitError::SlotUnavailable));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_shared_slots_allow_double_booking() {
        let (mut conn, user_id) = setup();
        let other = queries::create_user(&conn, "+15552220000", "Guest").unwrap();

        commit(&mut conn, other.id, &full_draft(), false).unwrap();
        commit(&mut conn, user_id, &full_draft(), false).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
