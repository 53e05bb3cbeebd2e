//! The fixed service and time-slot menus offered over the chat channel.

pub struct ServiceOption {
    pub label: &'static str,
    /// Substring synonyms, checked in declaration order.
    pub synonyms: &'static [&'static str],
}

pub const SERVICES: [ServiceOption; 6] = [
    ServiceOption {
        label: "Regular Checkup",
        synonyms: &["checkup", "check-up", "check up", "regular"],
    },
    ServiceOption {
        label: "Cleaning",
        synonyms: &["cleaning", "clean"],
    },
    ServiceOption {
        label: "Filling",
        synonyms: &["filling", "fill"],
    },
    ServiceOption {
        label: "Root Canal",
        synonyms: &["root canal", "root"],
    },
    ServiceOption {
        label: "Extraction",
        synonyms: &["extraction", "extract", "removal"],
    },
    ServiceOption {
        label: "Other",
        synonyms: &["other", "something else"],
    },
];

pub struct SlotOption {
    pub start: &'static str,
    pub end: &'static str,
    pub display: &'static str,
    pub synonyms: &'static [&'static str],
}

impl SlotOption {
    /// The slot label stored in the booking context, e.g. `"09:00-10:00"`.
    pub fn range_label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

pub const TIME_SLOTS: [SlotOption; 6] = [
    SlotOption {
        start: "09:00",
        end: "10:00",
        display: "09:00 AM - 10:00 AM",
        synonyms: &["09:00", "9:00", "9am", "9 am"],
    },
    SlotOption {
        start: "10:00",
        end: "11:00",
        display: "10:00 AM - 11:00 AM",
        synonyms: &["10:00", "10am", "10 am"],
    },
    SlotOption {
        start: "11:00",
        end: "12:00",
        display: "11:00 AM - 12:00 PM",
        synonyms: &["11:00", "11am", "11 am"],
    },
    SlotOption {
        start: "14:00",
        end: "15:00",
        display: "02:00 PM - 03:00 PM",
        synonyms: &["14:00", "2pm", "2 pm"],
    },
    SlotOption {
        start: "15:00",
        end: "16:00",
        display: "03:00 PM - 04:00 PM",
        synonyms: &["15:00", "3pm", "3 pm"],
    },
    SlotOption {
        start: "16:00",
        end: "17:00",
        display: "04:00 PM - 05:00 PM",
        synonyms: &["16:00", "4pm", "4 pm"],
    },
];

pub fn service_menu() -> String {
    let mut out = String::from("What type of dental service do you need?\n");
    for (i, option) in SERVICES.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, option.label));
    }
    out.push_str("\nPlease reply with the number or service name:");
    out
}

pub fn time_menu() -> String {
    let mut out = String::from("Available time slots:\n");
    for (i, slot) in TIME_SLOTS.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, slot.display));
    }
    out.push_str("\nPlease select a time slot (1-6):");
    out
}

/// Split a stored slot label back into `(start, end)`.
pub fn split_slot(range: &str) -> Option<(&str, &str)> {
    range.split_once('-')
}
