use std::sync::Arc;

use chrono::Utc;

use crate::db::queries;
use crate::models::menu::{self, SERVICES, TIME_SLOTS};
use crate::models::{Appointment, BookingDraft, DialogueState};
use crate::services::booking::{self, CommitError};
use crate::services::identity;
use crate::services::intent::{self, Selection};
use crate::state::AppState;

const WELCOME: &str = "👋 Welcome to Dental Care!\n\nI can help you book a dental appointment.\n\nPlease tell me your name:";

const CANCELLED: &str = "❌ Appointment cancelled.\n\nTo book a new appointment, just send \"hello\".";

const RESTART: &str =
    "Something went wrong with your booking. Let's start over - just send \"hello\".";

/// Run one turn of the booking dialogue for an inbound message and return
/// the reply text. Turns for the same sender are processed strictly one at
/// a time; the per-sender lock is held for the whole turn.
pub async fn process_message(
    state: &Arc<AppState>,
    from_phone: &str,
    message: &str,
) -> anyhow::Result<String> {
    let turn_lock = state.user_locks.for_sender(from_phone);
    let _guard = turn_lock.lock().await;

    let user = {
        let db = state.db.lock().unwrap();
        identity::resolve(&db, from_phone)?
    };

    let (current, mut draft) = {
        let db = state.db.lock().unwrap();
        queries::get_dialogue_state(&db, user.id)?
    }
    .unwrap_or_default();

    let selection = intent::classify(current, message);

    tracing::info!(
        phone = from_phone,
        state = current.as_str(),
        "processing turn"
    );

    let mut next = current;
    let reply = match (current, selection) {
        // Any text wakes the machine up, including a stray "yes" after a
        // completed booking.
        (DialogueState::Greeting, _) => {
            next = DialogueState::CollectingName;
            WELCOME.to_string()
        }

        (DialogueState::CollectingName, Selection::Text(name)) => {
            {
                let db = state.db.lock().unwrap();
                queries::update_user_name(&db, user.id, &name)?;
            }
            next = DialogueState::CollectingService;
            format!("Nice to meet you, {name}!\n\n{}", menu::service_menu())
        }

        (DialogueState::CollectingName, _) => "Please tell me your name:".to_string(),

        (DialogueState::CollectingService, Selection::Menu(idx)) => {
            let label = SERVICES[idx].label;
            draft.service = Some(label.to_string());
            next = DialogueState::CollectingDate;
            service_chosen_reply(label)
        }

        // Unmatched free text is accepted as the literal service.
        (DialogueState::CollectingService, Selection::Text(text)) => {
            let reply = service_chosen_reply(&text);
            draft.service = Some(text);
            next = DialogueState::CollectingDate;
            reply
        }

        (DialogueState::CollectingService, _) => menu::service_menu(),

        (DialogueState::CollectingDate, Selection::Date(date)) => {
            let today = Utc::now().date_naive();
            if date < today {
                format!(
                    "Please select a future date. Today is {}. Enter a valid date (DD/MM/YYYY):",
                    today.format("%d/%m/%Y")
                )
            } else {
                draft.date = Some(date);
                next = DialogueState::CollectingTime;
                format!(
                    "Perfect! Date: {}\n\n{}",
                    date.format("%d/%m/%Y"),
                    menu::time_menu()
                )
            }
        }

        (DialogueState::CollectingDate, _) => {
            "Please enter a valid date in DD/MM/YYYY format (e.g. 25/12/2030):".to_string()
        }

        (DialogueState::CollectingTime, Selection::Menu(idx)) => {
            draft.time = Some(TIME_SLOTS[idx].range_label());
            next = DialogueState::ConfirmingBooking;
            summary_reply(&draft)
        }

        (DialogueState::CollectingTime, _) => {
            format!("Please select a valid time slot (1-6):\n\n{}", menu::time_menu())
        }

        (DialogueState::ConfirmingBooking, Selection::Confirm) => {
            let result = {
                let mut db = state.db.lock().unwrap();
                booking::commit(&mut db, user.id, &draft, state.config.exclusive_slots)
            };

            match result {
                Ok(appointment) => {
                    next = DialogueState::Greeting;
                    draft = BookingDraft::default();
                    confirmed_reply(&appointment)
                }
                Err(CommitError::SlotUnavailable) => {
                    draft.time = None;
                    next = DialogueState::CollectingTime;
                    format!(
                        "Sorry, that time slot has just been taken. Please pick another one.\n\n{}",
                        menu::time_menu()
                    )
                }
                Err(CommitError::Incomplete(field)) => {
                    tracing::error!(
                        phone = from_phone,
                        field,
                        "reached confirmation with incomplete booking context"
                    );
                    next = DialogueState::Greeting;
                    draft = BookingDraft::default();
                    RESTART.to_string()
                }
                Err(CommitError::Storage(e)) => return Err(e),
            }
        }

        (DialogueState::ConfirmingBooking, _) => {
            next = DialogueState::Greeting;
            draft = BookingDraft::default();
            CANCELLED.to_string()
        }
    };

    {
        let db = state.db.lock().unwrap();
        queries::upsert_dialogue_state(&db, user.id, next, &draft)?;
    }

    Ok(reply)
}

fn service_chosen_reply(service: &str) -> String {
    format!(
        "Great! You've selected: {service}\n\nWhen would you like to come in?\nPlease enter the date (DD/MM/YYYY):"
    )
}

fn summary_reply(draft: &BookingDraft) -> String {
    format!(
        "📅 Appointment summary:\n\nService: {}\nDate: {}\nTime: {}\n\nPlease confirm your booking by replying \"YES\" or \"CONFIRM\":",
        draft.service.as_deref().unwrap_or("-"),
        draft
            .date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        draft.time.as_deref().unwrap_or("-"),
    )
}

fn confirmed_reply(appointment: &Appointment) -> String {
    format!(
        "✅ Appointment confirmed!\n\nService: {}\nDate: {}\nTime: {}-{}\n\nWe'll send you a reminder the day before.\n\nTo book another appointment, just send \"hello\".",
        appointment.service,
        appointment.date.format("%d/%m/%Y"),
        appointment.start_time,
        appointment.end_time,
    )
}
