//! Turns a total amount and a split policy into per-participant shares.
//!
//! The calculator is pure. It does not check that shares reconcile to the
//! total; [`reconcile`] does that and is applied by the expense ledger before
//! anything is stored.

use std::collections::{BTreeMap, HashSet};

use crate::errors::{Result, SplitError};
use crate::ledger::{ParticipantId, Split, SplitKind};

/// Largest gap tolerated between an expense total and the sum of its splits.
pub const SPLIT_TOLERANCE: f64 = 0.01;

/// How an expense total is divided.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitPolicy {
    /// Same share for everyone, rounded to cents. The rounding remainder is
    /// not redistributed, so shares may drift from the total by up to
    /// `0.01 * (n - 1)`.
    Equal,
    /// Caller-supplied amounts. Participants without an entry owe nothing.
    Exact(BTreeMap<ParticipantId, f64>),
    /// Caller-supplied percentages of the total. They are not required to
    /// add up to 100 here.
    Percentage(BTreeMap<ParticipantId, f64>),
}

impl SplitPolicy {
    pub fn kind(&self) -> SplitKind {
        match self {
            SplitPolicy::Equal => SplitKind::Equal,
            SplitPolicy::Exact(_) => SplitKind::Exact,
            SplitPolicy::Percentage(_) => SplitKind::Percentage,
        }
    }

    /// Largest acceptable gap between the total and the splits for `n`
    /// participants. Equal splits carry their documented rounding drift;
    /// every other policy gets [`SPLIT_TOLERANCE`].
    pub fn tolerance(&self, n: usize) -> f64 {
        tolerance_for(self.kind(), n)
    }

    fn inputs(&self) -> Option<&BTreeMap<ParticipantId, f64>> {
        match self {
            SplitPolicy::Equal => None,
            SplitPolicy::Exact(inputs) | SplitPolicy::Percentage(inputs) => Some(inputs),
        }
    }
}

/// Tolerance applied to stored expenses, where only the split kind survives.
pub fn tolerance_for(kind: SplitKind, n: usize) -> f64 {
    match kind {
        SplitKind::Equal => SPLIT_TOLERANCE.max(SPLIT_TOLERANCE * n.saturating_sub(1) as f64),
        SplitKind::Exact | SplitKind::Percentage => SPLIT_TOLERANCE,
    }
}

pub fn round_to_2_decimals(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Produces one unpaid split per participant, in the order given.
pub fn calculate(
    amount: f64,
    policy: &SplitPolicy,
    participants: &[ParticipantId],
) -> Result<Vec<Split>> {
    if participants.is_empty() {
        return Err(SplitError::Validation(
            "at least one participant is required".into(),
        ));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SplitError::Validation(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    if let Some(inputs) = policy.inputs() {
        validate_inputs(inputs, participants)?;
    }

    let splits = match policy {
        SplitPolicy::Equal => {
            let share = round_to_2_decimals(amount / participants.len() as f64);
            participants
                .iter()
                .map(|id| Split::unpaid(id.clone(), share))
                .collect()
        }
        SplitPolicy::Exact(amounts) => participants
            .iter()
            .map(|id| Split::unpaid(id.clone(), amounts.get(id).copied().unwrap_or(0.0)))
            .collect(),
        SplitPolicy::Percentage(percentages) => participants
            .iter()
            .map(|id| {
                let pct = percentages.get(id).copied().unwrap_or(0.0);
                Split::unpaid(id.clone(), amount * pct / 100.0)
            })
            .collect(),
    };
    Ok(splits)
}

/// Fails with `SplitMismatch` when the splits miss `amount` by more than
/// [`SPLIT_TOLERANCE`].
pub fn reconcile(amount: f64, splits: &[Split]) -> Result<()> {
    reconcile_within(amount, splits, SPLIT_TOLERANCE)
}

/// Same as [`reconcile`] with an explicit tolerance.
pub fn reconcile_within(amount: f64, splits: &[Split], tolerance: f64) -> Result<()> {
    let total: f64 = splits.iter().map(|split| split.amount).sum();
    // Epsilon absorbs float noise on values that sit exactly on the boundary.
    if (total - amount).abs() > tolerance + 1e-9 {
        return Err(SplitError::SplitMismatch {
            expected: amount,
            actual: total,
        });
    }
    Ok(())
}

fn validate_inputs(
    inputs: &BTreeMap<ParticipantId, f64>,
    participants: &[ParticipantId],
) -> Result<()> {
    let known: HashSet<&ParticipantId> = participants.iter().collect();
    for (id, value) in inputs {
        if !known.contains(id) {
            return Err(SplitError::Validation(format!(
                "split input for {} who is not part of this expense",
                id
            )));
        }
        if !value.is_finite() || *value < 0.0 {
            return Err(SplitError::Validation(format!(
                "split input for {} must be a non-negative number, got {}",
                id, value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people(ids: &[&str]) -> Vec<ParticipantId> {
        ids.iter().map(|id| ParticipantId::new(*id)).collect()
    }

    fn amounts(split: &[Split]) -> Vec<f64> {
        split.iter().map(|s| s.amount).collect()
    }

    #[test]
    fn equal_split_divides_evenly() {
        let splits = calculate(3600.0, &SplitPolicy::Equal, &people(&["you", "f1", "f2"])).unwrap();
        assert_eq!(amounts(&splits), vec![1200.0, 1200.0, 1200.0]);
        assert!(splits.iter().all(|s| !s.paid));
    }

    #[test]
    fn equal_split_keeps_rounding_drift() {
        let splits = calculate(100.0, &SplitPolicy::Equal, &people(&["a", "b", "c"])).unwrap();
        assert_eq!(amounts(&splits), vec![33.33, 33.33, 33.33]);
        reconcile(100.0, &splits).expect("drift within tolerance");
    }

    #[test]
    fn equal_split_holds_within_tolerance_across_many_inputs() {
        for n in 1..=4 {
            let ids: Vec<ParticipantId> = (0..n).map(|i| ParticipantId::new(format!("p{i}"))).collect();
            for cents in (1..20_000).step_by(37) {
                let amount = cents as f64 / 100.0;
                let splits = calculate(amount, &SplitPolicy::Equal, &ids).unwrap();
                let drift = (splits.iter().map(|s| s.amount).sum::<f64>() - amount).abs();
                assert!(
                    drift <= 0.01 * (n as f64 - 1.0) + 1e-9,
                    "amount {amount} over {n} drifted by {drift}"
                );
            }
        }
    }

    #[test]
    fn equal_tolerance_grows_with_participants() {
        assert_eq!(SplitPolicy::Equal.tolerance(1), SPLIT_TOLERANCE);
        assert_eq!(SplitPolicy::Equal.tolerance(2), SPLIT_TOLERANCE);
        assert!((SplitPolicy::Equal.tolerance(5) - 0.04).abs() < 1e-12);
        assert_eq!(SplitPolicy::Exact(BTreeMap::new()).tolerance(5), SPLIT_TOLERANCE);
        assert_eq!(tolerance_for(SplitKind::Equal, 5), SplitPolicy::Equal.tolerance(5));
        assert_eq!(tolerance_for(SplitKind::Percentage, 5), SPLIT_TOLERANCE);
    }

    #[test]
    fn four_way_equal_split_reconciles_within_drift_allowance() {
        let ids = people(&["a", "b", "c", "d"]);
        let splits = calculate(0.06, &SplitPolicy::Equal, &ids).unwrap();
        reconcile_within(0.06, &splits, SplitPolicy::Equal.tolerance(ids.len())).unwrap();
    }

    #[test]
    fn percentage_split_scales_total() {
        let mut pct = BTreeMap::new();
        pct.insert(ParticipantId::new("you"), 50.0);
        pct.insert(ParticipantId::new("f1"), 30.0);
        pct.insert(ParticipantId::new("f2"), 20.0);
        let splits = calculate(
            1000.0,
            &SplitPolicy::Percentage(pct),
            &people(&["you", "f1", "f2"]),
        )
        .unwrap();
        assert_eq!(amounts(&splits), vec![500.0, 300.0, 200.0]);
    }

    #[test]
    fn percentage_short_of_hundred_is_caught_by_reconcile() {
        let mut pct = BTreeMap::new();
        pct.insert(ParticipantId::new("you"), 50.0);
        pct.insert(ParticipantId::new("f1"), 40.0);
        let splits = calculate(200.0, &SplitPolicy::Percentage(pct), &people(&["you", "f1"])).unwrap();
        let err = reconcile(200.0, &splits).unwrap_err();
        assert!(matches!(err, SplitError::SplitMismatch { actual, .. } if (actual - 180.0).abs() < 1e-9));
    }

    #[test]
    fn exact_split_passes_amounts_through() {
        let mut exact = BTreeMap::new();
        exact.insert(ParticipantId::new("you"), 12.5);
        exact.insert(ParticipantId::new("f1"), 7.25);
        let splits = calculate(19.75, &SplitPolicy::Exact(exact), &people(&["you", "f1", "f2"])).unwrap();
        assert_eq!(amounts(&splits), vec![12.5, 7.25, 0.0]);
        reconcile(19.75, &splits).unwrap();
    }

    #[test]
    fn rejects_empty_participants_and_bad_amounts() {
        assert!(matches!(
            calculate(10.0, &SplitPolicy::Equal, &[]),
            Err(SplitError::Validation(_))
        ));
        assert!(matches!(
            calculate(0.0, &SplitPolicy::Equal, &people(&["a"])),
            Err(SplitError::Validation(_))
        ));
        assert!(matches!(
            calculate(-5.0, &SplitPolicy::Equal, &people(&["a"])),
            Err(SplitError::Validation(_))
        ));
    }

    #[test]
    fn rejects_inputs_for_outsiders_and_negative_values() {
        let mut exact = BTreeMap::new();
        exact.insert(ParticipantId::new("stranger"), 10.0);
        let err = calculate(10.0, &SplitPolicy::Exact(exact), &people(&["a"])).unwrap_err();
        assert!(matches!(err, SplitError::Validation(ref m) if m.contains("stranger")));

        let mut pct = BTreeMap::new();
        pct.insert(ParticipantId::new("a"), -10.0);
        let err = calculate(10.0, &SplitPolicy::Percentage(pct), &people(&["a"])).unwrap_err();
        assert!(matches!(err, SplitError::Validation(_)));
    }

    #[test]
    fn reconcile_accepts_boundary_and_rejects_beyond() {
        let splits = vec![Split::unpaid("a".into(), 50.0), Split::unpaid("b".into(), 49.99)];
        reconcile(100.0, &splits).unwrap();
        let splits = vec![Split::unpaid("a".into(), 50.0), Split::unpaid("b".into(), 49.98)];
        assert!(reconcile(100.0, &splits).is_err());
    }
}
