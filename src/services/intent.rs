//! Keyword classification of a raw user turn against the active dialogue
//! state. Pure and deterministic: no clock, no storage, no randomness.

use chrono::NaiveDate;

use crate::models::menu::{SERVICES, TIME_SLOTS};
use crate::models::DialogueState;

/// The logical value a turn resolves to, interpreted per state by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Zero-based index into the active menu (service or time slot).
    Menu(usize),
    Date(NaiveDate),
    Confirm,
    Decline,
    /// Free text echoed back where the state accepts it, or unmatched input
    /// where it does not.
    Text(String),
    Empty,
}

const CONFIRM_KEYWORDS: [&str; 4] = ["yes", "confirm", "ok", "sure"];

const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

pub fn classify(state: DialogueState, raw: &str) -> Selection {
    let text = raw.trim();

    match state {
        DialogueState::Greeting => Selection::Text(text.to_string()),

        DialogueState::CollectingName => {
            if text.is_empty() {
                Selection::Empty
            } else {
                Selection::Text(text.to_string())
            }
        }

        DialogueState::CollectingService => {
            let synonym_sets: Vec<&[&str]> = SERVICES.iter().map(|o| o.synonyms).collect();
            match match_option(text, &synonym_sets) {
                Some(idx) => Selection::Menu(idx),
                None if text.is_empty() => Selection::Empty,
                None => Selection::Text(text.to_string()),
            }
        }

        DialogueState::CollectingDate => match parse_date(text) {
            Some(date) => Selection::Date(date),
            None => Selection::Text(text.to_string()),
        },

        DialogueState::CollectingTime => {
            let synonym_sets: Vec<&[&str]> = TIME_SLOTS.iter().map(|o| o.synonyms).collect();
            match match_option(text, &synonym_sets) {
                Some(idx) => Selection::Menu(idx),
                None => Selection::Text(text.to_string()),
            }
        }

        DialogueState::ConfirmingBooking => {
            let lower = text.to_lowercase();
            if CONFIRM_KEYWORDS.iter().any(|k| lower.contains(k)) {
                Selection::Confirm
            } else {
                Selection::Decline
            }
        }
    }
}

/// Menu matching in priority order: an exact 1-based option number first,
/// then each option's synonyms in declaration order. Rule order decides
/// ties, not input order.
fn match_option(text: &str, synonym_sets: &[&[&str]]) -> Option<usize> {
    if let Ok(n) = text.parse::<usize>() {
        if (1..=synonym_sets.len()).contains(&n) {
            return Some(n - 1);
        }
    }

    let lower = text.to_lowercase();
    for (idx, synonyms) in synonym_sets.iter().enumerate() {
        if synonyms.iter().any(|s| lower.contains(s)) {
            return Some(idx);
        }
    }
    None
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_and_synonym_agree() {
        // "2" and "cleaning" both resolve to the Cleaning option
        assert_eq!(
            classify(DialogueState::CollectingService, "2"),
            Selection::Menu(1)
        );
        assert_eq!(
            classify(DialogueState::CollectingService, "cleaning"),
            Selection::Menu(1)
        );
        assert_eq!(
            classify(DialogueState::CollectingService, "I'd like a Cleaning please"),
            Selection::Menu(1)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        for input in ["2", "root canal", "whatever", "25/12/2030"] {
            for state in [
                DialogueState::CollectingService,
                DialogueState::CollectingDate,
                DialogueState::CollectingTime,
            ] {
                assert_eq!(classify(state, input), classify(state, input));
            }
        }
    }

    #[test]
    fn test_rule_priority_resolves_ties() {
        // "regular checkup or a cleaning" matches both option 1 and option 2;
        // option order wins.
        assert_eq!(
            classify(DialogueState::CollectingService, "regular checkup or a cleaning"),
            Selection::Menu(0)
        );
    }

    #[test]
    fn test_unmatched_service_echoes_text() {
        assert_eq!(
            classify(DialogueState::CollectingService, "Teeth whitening"),
            Selection::Text("Teeth whitening".to_string())
        );
    }

    #[test]
    fn test_out_of_range_number_is_text() {
        assert_eq!(
            classify(DialogueState::CollectingService, "7"),
            Selection::Text("7".to_string())
        );
        assert_eq!(
            classify(DialogueState::CollectingTime, "0"),
            Selection::Text("0".to_string())
        );
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2030, 12, 25).unwrap();
        for input in ["25/12/2030", "25-12-2030", "2030-12-25"] {
            assert_eq!(
                classify(DialogueState::CollectingDate, input),
                Selection::Date(expected)
            );
        }
    }

    #[test]
    fn test_malformed_date_is_text() {
        for input in ["tomorrow", "32/01/2030", "25/13/2030", ""] {
            assert!(matches!(
                classify(DialogueState::CollectingDate, input),
                Selection::Text(_)
            ));
        }
    }

    #[test]
    fn test_time_slot_digit_and_start_time() {
        assert_eq!(classify(DialogueState::CollectingTime, "1"), Selection::Menu(0));
        assert_eq!(classify(DialogueState::CollectingTime, "09:00"), Selection::Menu(0));
        assert_eq!(classify(DialogueState::CollectingTime, "2pm"), Selection::Menu(3));
    }

    #[test]
    fn test_confirmation_keywords() {
        for input in ["yes", "YES", "ok sounds good", "Sure!", "confirm"] {
            assert_eq!(
                classify(DialogueState::ConfirmingBooking, input),
                Selection::Confirm
            );
        }
        for input in ["no", "nope", "cancel", ""] {
            assert_eq!(
                classify(DialogueState::ConfirmingBooking, input),
                Selection::Decline
            );
        }
    }

    #[test]
    fn test_name_state_trims_and_rejects_empty() {
        assert_eq!(
            classify(DialogueState::CollectingName, "  Jane Doe  "),
            Selection::Text("Jane Doe".to_string())
        );
        assert_eq!(classify(DialogueState::CollectingName, "   "), Selection::Empty);
    }
}
