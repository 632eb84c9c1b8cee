use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::participant::ParticipantId;

/// Audit category written to the `activity_logs` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ParticipantInvited,
    ParticipantActivated,
    GroupCreated,
    ExpenseAdded,
    SplitSettled,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::ParticipantInvited => "participant_invited",
            ActivityKind::ParticipantActivated => "participant_activated",
            ActivityKind::GroupCreated => "group_created",
            ActivityKind::ExpenseAdded => "expense_added",
            ActivityKind::SplitSettled => "split_settled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: ParticipantId,
    pub activity_type: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(user_id: ParticipantId, kind: ActivityKind, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            activity_type: kind,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}
