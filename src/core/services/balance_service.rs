//! Balance reconciliation: who owes whom, derived from the full ledger.
//!
//! Everything here is recomputed from scratch on each call and never mutates
//! the ledger. Maps are ordered by participant id so repeated calls over the
//! same snapshot produce identical output.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::currency::CurrencyTable;
use crate::errors::SplitError;
use crate::ledger::{Expense, ParticipantId, SplitLedger};
use crate::split::round_to_2_decimals;

use super::ServiceResult;

/// Amount below which a balance counts as zero.
const SETTLED_EPSILON: f64 = 0.005;

/// Aggregate position of one participant across unpaid splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParticipantBalance {
    /// Owed to this participant by others.
    pub owed: f64,
    /// Owed by this participant to others.
    pub owes: f64,
}

impl ParticipantBalance {
    /// Positive when the participant is owed money overall.
    pub fn net(&self) -> f64 {
        self.owed - self.owes
    }
}

/// Debt between two specific participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PairwiseBalance {
    pub a_owes_b: f64,
    pub b_owes_a: f64,
    /// `b_owes_a - a_owes_b`; positive means the counterpart owes the
    /// reference participant.
    pub net: f64,
}

impl PairwiseBalance {
    pub fn is_settled(&self) -> bool {
        self.net.abs() < SETTLED_EPSILON
    }
}

/// Suggested settle-up payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub amount: f64,
}

pub struct BalanceService;

impl BalanceService {
    /// Per-participant `owed`/`owes` over every unpaid, non-payer split,
    /// converted into `currency`. Every known participant gets an entry.
    pub fn global_balances(
        ledger: &SplitLedger,
        currencies: &CurrencyTable,
        currency: &str,
    ) -> ServiceResult<BTreeMap<ParticipantId, ParticipantBalance>> {
        Self::accumulate(ledger, currencies, currency, ledger.expenses.iter())
    }

    /// Same as [`BalanceService::global_balances`], limited to one group's expenses.
    pub fn group_balances(
        ledger: &SplitLedger,
        currencies: &CurrencyTable,
        group_id: Uuid,
        currency: &str,
    ) -> ServiceResult<BTreeMap<ParticipantId, ParticipantBalance>> {
        if ledger.group(group_id).is_none() {
            return Err(SplitError::NotFound(format!("group {}", group_id)));
        }
        let expenses = ledger
            .expenses
            .iter()
            .filter(|expense| expense.group_id == Some(group_id));
        Self::accumulate(ledger, currencies, currency, expenses)
    }

    /// Debt between `a` and `b` from expenses where one of them paid and the
    /// other still holds an unpaid split.
    pub fn pairwise(
        ledger: &SplitLedger,
        currencies: &CurrencyTable,
        a: &ParticipantId,
        b: &ParticipantId,
        currency: &str,
    ) -> ServiceResult<PairwiseBalance> {
        currencies.get(currency)?;
        if a == b {
            return Err(SplitError::Validation(format!(
                "cannot compute a balance of {} against themselves",
                a
            )));
        }
        for id in [a, b] {
            if ledger.participant(id).is_none() {
                return Err(SplitError::NotFound(format!("participant {}", id)));
            }
        }

        let mut balance = PairwiseBalance::default();
        for expense in ledger
            .expenses
            .iter()
            .filter(|expense| expense.involves(a) && expense.involves(b))
        {
            let debtor = if &expense.payer_id == a {
                b
            } else if &expense.payer_id == b {
                a
            } else {
                continue;
            };
            let unpaid: f64 = expense
                .outstanding()
                .filter(|split| &split.user_id == debtor)
                .map(|split| split.amount)
                .sum();
            if unpaid == 0.0 {
                continue;
            }
            let converted = currencies.convert(unpaid, expense.currency.as_str(), currency)?;
            if debtor == a {
                balance.a_owes_b += converted;
            } else {
                balance.b_owes_a += converted;
            }
        }
        balance.net = balance.b_owes_a - balance.a_owes_b;
        Ok(balance)
    }

    /// Pairwise balance of `reference` against every other participant.
    pub fn friend_balances(
        ledger: &SplitLedger,
        currencies: &CurrencyTable,
        reference: &ParticipantId,
        currency: &str,
    ) -> ServiceResult<BTreeMap<ParticipantId, PairwiseBalance>> {
        let mut out = BTreeMap::new();
        for friend in ledger
            .participants
            .iter()
            .filter(|participant| &participant.id != reference)
        {
            let balance = Self::pairwise(ledger, currencies, reference, &friend.id, currency)?;
            out.insert(friend.id.clone(), balance);
        }
        Ok(out)
    }

    /// Greedy debt simplification: the largest debtor pays the largest
    /// creditor until every net position is cleared. Amounts are in cents.
    pub fn suggest_transfers(balances: &BTreeMap<ParticipantId, ParticipantBalance>) -> Vec<Transfer> {
        let mut debtors = Vec::new();
        let mut creditors = Vec::new();
        for (id, balance) in balances {
            let net = round_to_2_decimals(balance.net());
            if net <= -0.01 {
                debtors.push((id.clone(), -net));
            } else if net >= 0.01 {
                creditors.push((id.clone(), net));
            }
        }
        // Ascending by amount so the largest sits at the end; ties break on id.
        let order = |x: &(ParticipantId, f64), y: &(ParticipantId, f64)| {
            x.1.total_cmp(&y.1).then_with(|| y.0.cmp(&x.0))
        };
        debtors.sort_by(order);
        creditors.sort_by(order);

        let mut transfers = Vec::new();
        while let (Some(debtor), Some(creditor)) = (debtors.last_mut(), creditors.last_mut()) {
            let amount = round_to_2_decimals(debtor.1.min(creditor.1));
            transfers.push(Transfer {
                from: debtor.0.clone(),
                to: creditor.0.clone(),
                amount,
            });
            debtor.1 = round_to_2_decimals(debtor.1 - amount);
            creditor.1 = round_to_2_decimals(creditor.1 - amount);
            if debtor.1 < 0.01 {
                debtors.pop();
            }
            if creditor.1 < 0.01 {
                creditors.pop();
            }
        }
        transfers
    }

    fn accumulate<'a>(
        ledger: &SplitLedger,
        currencies: &CurrencyTable,
        currency: &str,
        expenses: impl Iterator<Item = &'a Expense>,
    ) -> ServiceResult<BTreeMap<ParticipantId, ParticipantBalance>> {
        currencies.get(currency)?;
        let mut balances: BTreeMap<ParticipantId, ParticipantBalance> = ledger
            .participants
            .iter()
            .map(|participant| (participant.id.clone(), ParticipantBalance::default()))
            .collect();

        for expense in expenses {
            for split in expense.outstanding() {
                let amount = currencies.convert(split.amount, expense.currency.as_str(), currency)?;
                balances.entry(split.user_id.clone()).or_default().owes += amount;
                balances.entry(expense.payer_id.clone()).or_default().owed += amount;
            }
        }
        tracing::debug!(participants = balances.len(), currency, "balances recomputed");
        Ok(balances)
    }
}
