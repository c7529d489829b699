use serde::{Deserialize, Serialize};

/// A single registration as persisted by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub consent: bool,
    pub registered_at: String,
}

impl Attendee {
    /// Admin search: name and email match case-insensitively, phone verbatim.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }

        let lowered = term.to_lowercase();
        self.name.to_lowercase().contains(&lowered)
            || self.email.to_lowercase().contains(&lowered)
            || self.phone.contains(term)
    }
}

/// Submitted registration form, before an id and timestamp are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAttendee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_consent")]
    pub consent: bool,
}

fn default_consent() -> bool {
    true
}

impl NewAttendee {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        consent: bool,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            consent,
        }
    }

    /// Returns the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.email.trim().is_empty() {
            Some("email")
        } else {
            None
        }
    }
}
