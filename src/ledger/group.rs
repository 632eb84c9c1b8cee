use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{common::Displayable, participant::ParticipantId};

/// Named set of participants. Owns no money, only membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub members: BTreeSet<ParticipantId>,
    pub created_by: ParticipantId,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Builds a group; `created_by` is always part of the member set.
    pub fn new(
        name: impl Into<String>,
        created_by: ParticipantId,
        members: impl IntoIterator<Item = ParticipantId>,
    ) -> Self {
        let mut members: BTreeSet<ParticipantId> = members.into_iter().collect();
        members.insert(created_by.clone());
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            members,
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn has_member(&self, id: &ParticipantId) -> bool {
        self.members.contains(id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

impl Displayable for Group {
    fn display_label(&self) -> String {
        format!("{} ({} members)", self.name, self.member_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_is_always_a_member() {
        let group = Group::new("Goa Trip", "you".into(), vec!["f1".into(), "f2".into()]);
        assert!(group.has_member(&"you".into()));
        assert_eq!(group.member_count(), 3);
    }

    #[test]
    fn duplicate_members_collapse() {
        let group = Group::new(
            "Flat",
            "you".into(),
            vec!["f1".into(), "f1".into(), "you".into()],
        );
        assert_eq!(group.member_count(), 2);
        assert_eq!(group.display_label(), "Flat (2 members)");
    }
}
