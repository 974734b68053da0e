//! Automation graph templates bundled with the binary.
//!
//! Two n8n-style graph documents with `{{token}}` placeholders in string
//! leaves. Embedded at compile time and parsed once on first use; the parsed
//! values are never mutated, injection always works on a deep copy.

use once_cell::sync::Lazy;
use serde_json::Value;

static CHECK_AVAILABILITY: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../templates/checkAvailability.json"))
        .expect("checkAvailability template is valid JSON")
});

static BOOK_APPOINTMENT: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../templates/bookAppointment.json"))
        .expect("bookAppointment template is valid JSON")
});

pub fn check_availability() -> &'static Value {
    &CHECK_AVAILABILITY
}

pub fn book_appointment() -> &'static Value {
    &BOOK_APPOINTMENT
}
