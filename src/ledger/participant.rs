use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::Displayable;

const ACTING_USER_ID: &str = "you";

/// Opaque participant identifier, stable across the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Well-known id of the person operating the app.
    pub fn acting_default() -> Self {
        Self::new(ACTING_USER_ID)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Invitation lifecycle of a participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Pending,
    Active,
}

/// A person who can owe or be owed money.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status: ParticipantStatus,
    pub invited_at: DateTime<Utc>,
}

impl Participant {
    /// Creates an invited participant in `pending` status.
    pub fn invited(id: ParticipantId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: None,
            status: ParticipantStatus::Pending,
            invited_at: Utc::now(),
        }
    }

    /// Creates an already active participant, used for the acting user.
    pub fn active(id: ParticipantId, email: impl Into<String>) -> Self {
        Self {
            status: ParticipantStatus::Active,
            ..Self::invited(id, email)
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        self.display_name = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }

    /// Display name, falling back to the email address.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

impl Displayable for Participant {
    fn display_label(&self) -> String {
        match self.status {
            ParticipantStatus::Active => self.label().to_string(),
            ParticipantStatus::Pending => format!("{} (pending)", self.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_falls_back_to_email() {
        let friend = Participant::invited("f1".into(), "asha@example.com");
        assert_eq!(friend.label(), "asha@example.com");
        let named = friend.with_display_name("Asha");
        assert_eq!(named.label(), "Asha");
    }

    #[test]
    fn blank_display_name_is_ignored() {
        let friend = Participant::invited("f1".into(), "asha@example.com").with_display_name("  ");
        assert!(friend.display_name.is_none());
    }

    #[test]
    fn pending_participants_are_marked_in_labels() {
        let friend = Participant::invited("f1".into(), "ravi@example.com");
        assert_eq!(friend.display_label(), "ravi@example.com (pending)");
        assert!(!friend.is_active());
    }
}
