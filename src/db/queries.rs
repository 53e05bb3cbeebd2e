use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Appointment, AppointmentStatus, BookingDraft, DialogueState, User};

// ── Users ──

pub fn get_user_by_phone(conn: &Connection, phone: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, phone, name FROM users WHERE phone = ?1",
        params![phone],
        |row| {
            Ok(User {
                id: row.get(0)?,
                phone: row.get(1)?,
                name: row.get(2)?,
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_user(conn: &Connection, phone: &str, name: &str) -> anyhow::Result<User> {
    conn.execute(
        "INSERT INTO users (phone, name) VALUES (?1, ?2)",
        params![phone, name],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        phone: phone.to_string(),
        name: Some(name.to_string()),
    })
}

pub fn update_user_name(conn: &Connection, user_id: i64, name: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE users SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![name, user_id],
    )?;
    Ok(())
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, phone, name FROM users ORDER BY created_at DESC")?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            phone: row.get(1)?,
            name: row.get(2)?,
        })
    })?;

    let mut users = vec![];
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

// ── Dialogue states ──

/// Callers substitute `(Greeting, empty draft)` for `None`; a user with no
/// prior row is simply at the start of the conversation.
pub fn get_dialogue_state(
    conn: &Connection,
    user_id: i64,
) -> anyhow::Result<Option<(DialogueState, BookingDraft)>> {
    let result = conn.query_row(
        "SELECT state, context FROM dialogue_states WHERE user_id = ?1",
        params![user_id],
        |row| {
            let state: String = row.get(0)?;
            let context: String = row.get(1)?;
            Ok((state, context))
        },
    );

    match result {
        Ok((state, context)) => {
            // A corrupt blob degrades to an empty draft rather than failing the turn.
            let draft: BookingDraft = serde_json::from_str(&context).unwrap_or_default();
            Ok(Some((DialogueState::parse(&state), draft)))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn upsert_dialogue_state(
    conn: &Connection,
    user_id: i64,
    state: DialogueState,
    draft: &BookingDraft,
) -> anyhow::Result<()> {
    let context = serde_json::to_string(draft)?;
    conn.execute(
        "INSERT INTO dialogue_states (user_id, state, context)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
           state = excluded.state,
           context = excluded.context,
           updated_at = datetime('now')",
        params![user_id, state.as_str(), context],
    )?;
    Ok(())
}

// ── Appointments ──

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, user_id, date, start_time, end_time, service, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            appointment.id,
            appointment.user_id,
            appointment.date.format("%Y-%m-%d").to_string(),
            appointment.start_time,
            appointment.end_time,
            appointment.service,
            appointment.status.as_str(),
            appointment.notes,
            appointment.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            appointment.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

/// A slot is available when no non-cancelled appointment overlaps it on the
/// same day. Adjacent slots (end == start) do not overlap.
pub fn check_slot_available(
    conn: &Connection,
    date: NaiveDate,
    start: &str,
    end: &str,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE date = ?1 AND status != 'cancelled' AND start_time < ?2 AND end_time > ?3",
        params![date.format("%Y-%m-%d").to_string(), end, start],
        |row| row.get(0),
    )?;
    Ok(count == 0)
}

pub fn get_appointment_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        "SELECT id, user_id, date, start_time, end_time, service, status, notes, created_at, updated_at
         FROM appointments WHERE id = ?1",
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_appointments_for_user(conn: &Connection, user_id: i64) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, date, start_time, end_time, service, status, notes, created_at, updated_at
         FROM appointments WHERE user_id = ?1 ORDER BY date ASC, start_time ASC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// An appointment joined with its owner, for the admin listing.
pub struct AppointmentRecord {
    pub appointment: Appointment,
    pub patient_name: Option<String>,
    pub patient_phone: String,
}

const RECORD_COLUMNS: &str =
    "a.id, a.user_id, a.date, a.start_time, a.end_time, a.service, a.status, a.notes, a.created_at, a.updated_at, u.name, u.phone";

pub fn get_all_appointments(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<AppointmentRecord>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {RECORD_COLUMNS} FROM appointments a JOIN users u ON a.user_id = u.id
                 WHERE a.status = ?1 ORDER BY a.date DESC, a.start_time DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!(
                "SELECT {RECORD_COLUMNS} FROM appointments a JOIN users u ON a.user_id = u.id
                 ORDER BY a.date DESC, a.start_time DESC LIMIT ?1"
            ),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_record_row(row)))?;

    let mut records = vec![];
    for row in rows {
        records.push(row??);
    }
    Ok(records)
}

pub fn get_appointments_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<AppointmentRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM appointments a JOIN users u ON a.user_id = u.id
         WHERE a.date BETWEEN ?1 AND ?2 ORDER BY a.date ASC, a.start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string()
        ],
        |row| Ok(parse_record_row(row)),
    )?;

    let mut records = vec![];
    for row in rows {
        records.push(row??);
    }
    Ok(records)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, notes = ?2, updated_at = datetime('now') WHERE id = ?3",
        params![status.as_str(), notes, id],
    )?;
    Ok(count > 0)
}

pub fn delete_appointment(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Dashboard ──

pub struct DashboardStats {
    pub total_appointments: i64,
    pub today_appointments: i64,
    pub pending_appointments: i64,
    pub total_users: i64,
    pub recent: Vec<AppointmentRecord>,
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let total_appointments: i64 =
        conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;

    let today_appointments: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE date = date('now')",
        [],
        |row| row.get(0),
    )?;

    let pending_appointments: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE status = 'pending'",
        [],
        |row| row.get(0),
    )?;

    let total_users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM appointments a JOIN users u ON a.user_id = u.id
         WHERE a.date >= date('now', '-7 day')
         ORDER BY a.date DESC, a.start_time DESC LIMIT 10"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_record_row(row)))?;

    let mut recent = vec![];
    for row in rows {
        recent.push(row??);
    }

    Ok(DashboardStats {
        total_appointments,
        today_appointments,
        pending_appointments,
        total_users,
        recent,
    })
}

// ── Row parsing ──

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let id: String = row.get(0)?;
    let user_id: i64 = row.get(1)?;
    let date_str: String = row.get(2)?;
    let start_time: String = row.get(3)?;
    let end_time: String = row.get(4)?;
    let service: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let notes: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| Utc::now().date_naive());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Appointment {
        id,
        user_id,
        date,
        start_time,
        end_time,
        service,
        status: AppointmentStatus::parse(&status_str),
        notes,
        created_at,
        updated_at,
    })
}

fn parse_record_row(row: &rusqlite::Row) -> anyhow::Result<AppointmentRecord> {
    let appointment = parse_appointment_row(row)?;
    let patient_name: Option<String> = row.get(10)?;
    let patient_phone: String = row.get(11)?;

    Ok(AppointmentRecord {
        appointment,
        patient_name,
        patient_phone,
    })
}
