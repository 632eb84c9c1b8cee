use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::participant::ParticipantId;
use crate::currency::CurrencyCode;
use crate::errors::{Result, SplitError};

/// Which policy produced an expense's split amounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    #[default]
    Equal,
    Exact,
    Percentage,
}

impl SplitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitKind::Equal => "equal",
            SplitKind::Exact => "exact",
            SplitKind::Percentage => "percentage",
        }
    }
}

/// One participant's share of one expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Split {
    pub user_id: ParticipantId,
    pub amount: f64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Split {
    pub fn unpaid(user_id: ParticipantId, amount: f64) -> Self {
        Self {
            user_id,
            amount,
            paid: false,
            paid_at: None,
        }
    }

    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        self.paid = true;
        self.paid_at = Some(at);
    }
}

/// A financial event paid by one participant and divided among several.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
    pub currency: CurrencyCode,
    pub payer_id: ParticipantId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub split_kind: SplitKind,
    pub splits: Vec<Split>,
    pub created_by: ParticipantId,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Settled once every split has been paid. Derived, never stored.
    pub fn is_settled(&self) -> bool {
        self.splits.iter().all(|split| split.paid)
    }

    pub fn split_for(&self, user_id: &ParticipantId) -> Option<&Split> {
        self.splits.iter().find(|split| &split.user_id == user_id)
    }

    pub fn involves(&self, user_id: &ParticipantId) -> bool {
        self.split_for(user_id).is_some()
    }

    pub fn splits_total(&self) -> f64 {
        self.splits.iter().map(|split| split.amount).sum()
    }

    /// Splits still owed to the payer.
    pub fn outstanding(&self) -> impl Iterator<Item = &Split> {
        self.splits
            .iter()
            .filter(move |split| !split.paid && split.user_id != self.payer_id)
    }

    pub fn outstanding_total(&self) -> f64 {
        self.outstanding().map(|split| split.amount).sum()
    }

    /// Flips the participant's split to paid. Paid flags never revert.
    pub fn settle_split(&mut self, user_id: &ParticipantId, at: DateTime<Utc>) -> Result<&Split> {
        let expense_id = self.id;
        let split = self
            .splits
            .iter_mut()
            .find(|split| &split.user_id == user_id)
            .ok_or_else(|| {
                SplitError::NotFound(format!(
                    "participant {} has no split in expense {}",
                    user_id, expense_id
                ))
            })?;
        if split.paid {
            return Err(SplitError::NoOp(format!(
                "split for {} in expense {} is already paid",
                user_id, expense_id
            )));
        }
        split.mark_paid(at);
        Ok(split)
    }
}
