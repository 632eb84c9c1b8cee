use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    activity::ActivityEntry,
    expense::Expense,
    group::Group,
    participant::{Participant, ParticipantId},
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// In-memory aggregate of everything the splitting feature knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitLedger {
    pub id: Uuid,
    /// Participant whose session owns this ledger.
    pub owner_id: ParticipantId,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "SplitLedger::schema_version_default")]
    pub schema_version: u8,
}

impl SplitLedger {
    /// Creates a ledger seeded with its owner as an active participant.
    pub fn new(owner: Participant) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner.id.clone(),
            participants: vec![owner],
            groups: Vec::new(),
            expenses: Vec::new(),
            activity: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Empty ledger used when hydrating from storage rows.
    pub fn empty(owner_id: ParticipantId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            participants: Vec::new(),
            groups: Vec::new(),
            expenses: Vec::new(),
            activity: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_participant(&mut self, participant: Participant) -> ParticipantId {
        let id = participant.id.clone();
        self.participants.push(participant);
        self.touch();
        id
    }

    pub fn add_group(&mut self, group: Group) -> Uuid {
        let id = group.id;
        self.groups.push(group);
        self.touch();
        id
    }

    pub fn add_expense(&mut self, expense: Expense) -> Uuid {
        let id = expense.id;
        self.expenses.push(expense);
        self.touch();
        id
    }

    pub fn record_activity(&mut self, entry: ActivityEntry) {
        self.activity.push(entry);
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    pub fn participant_by_email(&self, email: &str) -> Option<&Participant> {
        let needle = email.trim();
        self.participants
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(needle))
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id == id)
    }

    pub fn expense_mut(&mut self, id: Uuid) -> Option<&mut Expense> {
        self.expenses.iter_mut().find(|expense| expense.id == id)
    }

    pub fn expense_count(&self) -> usize {
        self.expenses.len()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
