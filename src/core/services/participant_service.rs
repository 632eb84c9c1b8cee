//! Invitations and lifecycle of the people a ledger knows about.

use uuid::Uuid;

use crate::errors::SplitError;
use crate::ledger::{Participant, ParticipantId, ParticipantStatus, SplitLedger};

use super::ServiceResult;

pub struct ParticipantService;

impl ParticipantService {
    /// Registers an invited friend in `pending` status.
    pub fn invite(
        ledger: &mut SplitLedger,
        email: &str,
        display_name: Option<&str>,
    ) -> ServiceResult<Participant> {
        let email = Self::validate_email(ledger, email)?;
        let mut participant = Participant::invited(ParticipantId::new(Uuid::new_v4().to_string()), email);
        if let Some(name) = display_name {
            participant = participant.with_display_name(name);
        }
        ledger.add_participant(participant.clone());
        tracing::debug!(participant = %participant.id, "participant invited");
        Ok(participant)
    }

    /// Moves a pending participant to `active` once the invite is accepted.
    pub fn activate(ledger: &mut SplitLedger, id: &ParticipantId) -> ServiceResult<Participant> {
        let participant = ledger
            .participant_mut(id)
            .ok_or_else(|| SplitError::NotFound(format!("participant {}", id)))?;
        if participant.is_active() {
            return Err(SplitError::NoOp(format!("participant {} is already active", id)));
        }
        participant.status = ParticipantStatus::Active;
        let activated = participant.clone();
        ledger.touch();
        Ok(activated)
    }

    pub fn get<'a>(ledger: &'a SplitLedger, id: &ParticipantId) -> ServiceResult<&'a Participant> {
        ledger
            .participant(id)
            .ok_or_else(|| SplitError::NotFound(format!("participant {}", id)))
    }

    pub fn list(ledger: &SplitLedger) -> Vec<&Participant> {
        ledger.participants.iter().collect()
    }

    /// Everyone except `reference`, i.e. the friends list of that participant.
    pub fn friends_of<'a>(ledger: &'a SplitLedger, reference: &ParticipantId) -> Vec<&'a Participant> {
        ledger
            .participants
            .iter()
            .filter(|participant| &participant.id != reference)
            .collect()
    }

    fn validate_email(ledger: &SplitLedger, candidate: &str) -> ServiceResult<String> {
        let email = candidate.trim();
        if email.is_empty() {
            return Err(SplitError::Validation("email is required".into()));
        }
        if !email.contains('@') {
            return Err(SplitError::Validation(format!(
                "`{}` is not a valid email address",
                email
            )));
        }
        if ledger.participant_by_email(email).is_some() {
            return Err(SplitError::Validation(format!(
                "participant `{}` already exists",
                email
            )));
        }
        Ok(email.to_string())
    }
}
