use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The step of the booking conversation a user currently occupies.
///
/// Transitions run strictly forward until confirmation, which loops back to
/// `Greeting` on both the confirmed and declined branches so the user can
/// book again.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Greeting,
    CollectingName,
    CollectingService,
    CollectingDate,
    CollectingTime,
    ConfirmingBooking,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Greeting => "greeting",
            DialogueState::CollectingName => "collecting_name",
            DialogueState::CollectingService => "collecting_service",
            DialogueState::CollectingDate => "collecting_date",
            DialogueState::CollectingTime => "collecting_time",
            DialogueState::ConfirmingBooking => "confirming_booking",
        }
    }

    /// Unknown tags fall back to `Greeting` so a stale row can never strand
    /// a user outside the machine.
    pub fn parse(s: &str) -> Self {
        match s {
            "collecting_name" => DialogueState::CollectingName,
            "collecting_service" => DialogueState::CollectingService,
            "collecting_date" => DialogueState::CollectingDate,
            "collecting_time" => DialogueState::CollectingTime,
            "confirming_booking" => DialogueState::ConfirmingBooking,
            _ => DialogueState::Greeting,
        }
    }
}

/// Partial answers accumulated across turns for one in-progress booking.
///
/// Serialized as the dialogue-state context blob: a flat JSON mapping with
/// keys `service`, `date` (ISO 8601) and `time` (`"HH:MM-HH:MM"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        for s in [
            DialogueState::Greeting,
            DialogueState::CollectingName,
            DialogueState::CollectingService,
            DialogueState::CollectingDate,
            DialogueState::CollectingTime,
            DialogueState::ConfirmingBooking,
        ] {
            assert_eq!(DialogueState::parse(s.as_str()), s);
        }
    }

    #[test]
    fn test_unknown_state_parses_to_greeting() {
        assert_eq!(DialogueState::parse("awaiting_payment"), DialogueState::Greeting);
        assert_eq!(DialogueState::parse(""), DialogueState::Greeting);
    }

    #[test]
    fn test_draft_context_keys() {
        let draft = BookingDraft {
            service: Some("Cleaning".to_string()),
            date: chrono::NaiveDate::from_ymd_opt(2030, 12, 25),
            time: Some("09:00-10:00".to_string()),
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["service"], "Cleaning");
        assert_eq!(json["date"], "2030-12-25");
        assert_eq!(json["time"], "09:00-10:00");
    }

    #[test]
    fn test_empty_draft_serializes_empty() {
        let json = serde_json::to_string(&BookingDraft::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
