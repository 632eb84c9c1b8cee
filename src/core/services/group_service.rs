//! Group registry: named, fixed member sets.

use uuid::Uuid;

use crate::errors::SplitError;
use crate::ledger::{Group, ParticipantId, SplitLedger};

use super::ServiceResult;

pub struct GroupService;

impl GroupService {
    /// Creates a group. The acting user joins implicitly and duplicate ids
    /// collapse. Pending participants are accepted.
    pub fn create(
        ledger: &mut SplitLedger,
        acting_user: &ParticipantId,
        name: &str,
        member_ids: &[ParticipantId],
    ) -> ServiceResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SplitError::Validation("group name is required".into()));
        }
        if member_ids.is_empty() {
            return Err(SplitError::Validation(
                "a group needs at least one member".into(),
            ));
        }
        if ledger.participant(acting_user).is_none() {
            return Err(SplitError::NotFound(format!("acting user {}", acting_user)));
        }
        for id in member_ids {
            let participant = ledger
                .participant(id)
                .ok_or_else(|| SplitError::NotFound(format!("participant {}", id)))?;
            if !participant.is_active() {
                tracing::warn!(participant = %id, group = name, "adding pending participant to group");
            }
        }

        let group = Group::new(name, acting_user.clone(), member_ids.iter().cloned());
        ledger.add_group(group.clone());
        Ok(group)
    }

    pub fn get(ledger: &SplitLedger, id: Uuid) -> ServiceResult<&Group> {
        ledger
            .group(id)
            .ok_or_else(|| SplitError::NotFound(format!("group {}", id)))
    }

    pub fn list(ledger: &SplitLedger) -> Vec<&Group> {
        ledger.groups.iter().collect()
    }

    pub fn groups_for<'a>(ledger: &'a SplitLedger, participant: &ParticipantId) -> Vec<&'a Group> {
        ledger
            .groups
            .iter()
            .filter(|group| group.has_member(participant))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::ParticipantService;
    use crate::ledger::Participant;

    fn base_ledger() -> (SplitLedger, ParticipantId) {
        let mut ledger =
            SplitLedger::new(Participant::active(ParticipantId::acting_default(), "me@example.com"));
        let friend = ParticipantService::invite(&mut ledger, "asha@example.com", None).unwrap();
        (ledger, friend.id)
    }

    #[test]
    fn create_adds_acting_user() {
        let (mut ledger, friend) = base_ledger();
        let you = ParticipantId::acting_default();
        let group = GroupService::create(&mut ledger, &you, "Flatmates", &[friend.clone()]).unwrap();
        assert!(group.has_member(&you));
        assert!(group.has_member(&friend));
        assert_eq!(GroupService::list(&ledger).len(), 1);
        assert_eq!(GroupService::groups_for(&ledger, &friend).len(), 1);
    }

    #[test]
    fn create_rejects_blank_name_and_empty_members() {
        let (mut ledger, friend) = base_ledger();
        let you = ParticipantId::acting_default();
        let err = GroupService::create(&mut ledger, &you, "  ", &[friend]).unwrap_err();
        assert!(matches!(err, SplitError::Validation(_)));
        let err = GroupService::create(&mut ledger, &you, "Trip", &[]).unwrap_err();
        assert!(matches!(err, SplitError::Validation(_)));
        assert!(ledger.groups.is_empty());
    }

    #[test]
    fn create_rejects_unknown_members() {
        let (mut ledger, _) = base_ledger();
        let you = ParticipantId::acting_default();
        let err = GroupService::create(&mut ledger, &you, "Trip", &["ghost".into()]).unwrap_err();
        assert!(matches!(err, SplitError::NotFound(_)));
        assert!(ledger.groups.is_empty());
    }

    #[test]
    fn get_unknown_group_fails() {
        let (ledger, _) = base_ledger();
        assert!(matches!(
            GroupService::get(&ledger, Uuid::new_v4()),
            Err(SplitError::NotFound(_))
        ));
    }
}
