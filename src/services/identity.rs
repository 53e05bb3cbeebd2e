use rusqlite::Connection;

use crate::db::queries;
use crate::models::User;

/// Map a channel sender id to the durable user record, creating one with a
/// placeholder name on first contact. Exactly one insert ever happens per
/// phone number.
pub fn resolve(conn: &Connection, phone: &str) -> anyhow::Result<User> {
    if let Some(user) = queries::get_user_by_phone(conn, phone)? {
        return Ok(user);
    }

    let user = queries::create_user(conn, phone, &placeholder_name(phone))?;
    tracing::info!(phone, user_id = user.id, "created user on first contact");
    Ok(user)
}

fn placeholder_name(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail = &digits[digits.len().saturating_sub(4)..];
    format!("Guest {tail}")
}
