//! Expense ledger: validated creation and settlement of shared expenses.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::currency::{CurrencyCode, CurrencyTable};
use crate::errors::SplitError;
use crate::ledger::{Expense, ParticipantId, SplitLedger};
use crate::split::{self, SplitPolicy};

use super::ServiceResult;

/// Input for [`ExpenseService::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    pub currency: CurrencyCode,
    pub payer_id: ParticipantId,
    pub date: NaiveDate,
    /// `None` means an ad-hoc split among explicitly chosen friends.
    pub group_id: Option<Uuid>,
    /// Explicit participants. Empty with a group means "every group member".
    pub participants: Vec<ParticipantId>,
    pub policy: SplitPolicy,
}

impl NewExpense {
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        currency: impl Into<CurrencyCode>,
        payer_id: ParticipantId,
        date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            currency: currency.into(),
            payer_id,
            date,
            group_id: None,
            participants: Vec::new(),
            policy: SplitPolicy::Equal,
        }
    }

    pub fn with_participants(mut self, participants: impl IntoIterator<Item = ParticipantId>) -> Self {
        self.participants = participants.into_iter().collect();
        self
    }

    pub fn in_group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = policy;
        self
    }
}

pub struct ExpenseService;

impl ExpenseService {
    /// Validates, splits and appends a new expense. Nothing is written to the
    /// ledger unless every check passes.
    pub fn add(
        ledger: &mut SplitLedger,
        currencies: &CurrencyTable,
        acting_user: &ParticipantId,
        draft: NewExpense,
    ) -> ServiceResult<Expense> {
        let description = draft.description.trim();
        if description.is_empty() {
            return Err(SplitError::Validation("description is required".into()));
        }
        if !draft.amount.is_finite() || draft.amount <= 0.0 {
            return Err(SplitError::Validation(format!(
                "amount must be greater than zero, got {}",
                draft.amount
            )));
        }
        let currency = currencies.get(draft.currency.as_str())?.code.clone();
        if ledger.participant(acting_user).is_none() {
            return Err(SplitError::NotFound(format!("acting user {}", acting_user)));
        }
        if ledger.participant(&draft.payer_id).is_none() {
            return Err(SplitError::NotFound(format!("payer {}", draft.payer_id)));
        }

        let participants = Self::resolve_participants(ledger, &draft)?;
        let mut splits = split::calculate(draft.amount, &draft.policy, &participants)?;
        split::reconcile_within(
            draft.amount,
            &splits,
            draft.policy.tolerance(participants.len()),
        )?;

        let created_at = Utc::now();
        for split in splits.iter_mut().filter(|split| split.user_id == draft.payer_id) {
            split.mark_paid(created_at);
        }

        let expense = Expense {
            id: Uuid::new_v4(),
            description: description.to_string(),
            amount: draft.amount,
            currency,
            payer_id: draft.payer_id.clone(),
            date: draft.date,
            group_id: draft.group_id,
            split_kind: draft.policy.kind(),
            splits,
            created_by: acting_user.clone(),
            created_at,
        };
        ledger.add_expense(expense.clone());
        tracing::debug!(
            expense = %expense.id,
            participants = expense.splits.len(),
            kind = expense.split_kind.as_str(),
            "expense split"
        );
        Ok(expense)
    }

    /// Marks one participant's split as paid. Already paid splits yield
    /// `NoOp` and leave the ledger untouched.
    pub fn settle(
        ledger: &mut SplitLedger,
        expense_id: Uuid,
        participant_id: &ParticipantId,
    ) -> ServiceResult<Expense> {
        let expense = ledger
            .expense_mut(expense_id)
            .ok_or_else(|| SplitError::NotFound(format!("expense {}", expense_id)))?;
        if let Err(err) = expense.settle_split(participant_id, Utc::now()) {
            if err.is_noop() {
                tracing::warn!(expense = %expense_id, participant = %participant_id, "{}", err);
            }
            return Err(err);
        }
        let settled = expense.clone();
        ledger.touch();
        if settled.is_settled() {
            tracing::debug!(expense = %expense_id, "expense fully settled");
        } else {
            tracing::debug!(
                expense = %expense_id,
                outstanding = settled.outstanding_total(),
                "split settled"
            );
        }
        Ok(settled)
    }

    pub fn get(ledger: &SplitLedger, id: Uuid) -> ServiceResult<&Expense> {
        ledger
            .expense(id)
            .ok_or_else(|| SplitError::NotFound(format!("expense {}", id)))
    }

    pub fn list(ledger: &SplitLedger) -> Vec<&Expense> {
        ledger.expenses.iter().collect()
    }

    pub fn for_group(ledger: &SplitLedger, group_id: Uuid) -> Vec<&Expense> {
        ledger
            .expenses
            .iter()
            .filter(|expense| expense.group_id == Some(group_id))
            .collect()
    }

    pub fn involving<'a>(ledger: &'a SplitLedger, participant: &ParticipantId) -> Vec<&'a Expense> {
        ledger
            .expenses
            .iter()
            .filter(|expense| expense.involves(participant))
            .collect()
    }

    /// Expenses with at least one unpaid split.
    pub fn unsettled(ledger: &SplitLedger) -> Vec<&Expense> {
        ledger
            .expenses
            .iter()
            .filter(|expense| !expense.is_settled())
            .collect()
    }

    /// Picks the participant list: explicit ids, or the group's members when
    /// none are given. The payer is appended when missing.
    fn resolve_participants(
        ledger: &SplitLedger,
        draft: &NewExpense,
    ) -> ServiceResult<Vec<ParticipantId>> {
        let group = match draft.group_id {
            Some(id) => Some(
                ledger
                    .group(id)
                    .ok_or_else(|| SplitError::NotFound(format!("group {}", id)))?,
            ),
            None => None,
        };

        let candidates: Vec<ParticipantId> = match group {
            Some(group) if draft.participants.is_empty() => group.members.iter().cloned().collect(),
            _ => draft.participants.clone(),
        };

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(candidates.len() + 1);
        for id in candidates {
            if !seen.insert(id.clone()) {
                continue;
            }
            if ledger.participant(&id).is_none() {
                return Err(SplitError::NotFound(format!("participant {}", id)));
            }
            if let Some(group) = group {
                if !group.has_member(&id) {
                    return Err(SplitError::Validation(format!(
                        "participant {} is not a member of group `{}`",
                        id, group.name
                    )));
                }
            }
            resolved.push(id);
        }
        if seen.insert(draft.payer_id.clone()) {
            resolved.push(draft.payer_id.clone());
        }
        Ok(resolved)
    }
}
