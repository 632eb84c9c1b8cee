use std::collections::BTreeMap;
use std::path::Path;

use uuid::Uuid;

use crate::config::Config;
use crate::core::services::{
    BalanceService, ExpenseService, GroupService, NewExpense, PairwiseBalance, ParticipantBalance,
    ParticipantService, Transfer,
};
use crate::currency::CurrencyTable;
use crate::errors::{Result, SplitError};
use crate::ledger::{
    ActivityEntry, ActivityKind, Displayable, Expense, Group, Participant, ParticipantId,
    SplitLedger,
};
use crate::storage::records::{self, RowWrite};
use crate::storage::StorageBackend;
use crate::utils::persistence;

/// Outcome of a mutation run against a working copy of the ledger.
struct Staged<T> {
    value: T,
    writes: Vec<RowWrite>,
    activity: (ActivityKind, String),
}

/// Facade that coordinates the split ledger, its services, and persistence.
///
/// Mutations run on a working copy. The copy replaces the live ledger only
/// after every row write has been accepted by the storage collaborator, so a
/// persistence failure leaves in-memory state untouched.
pub struct LedgerManager {
    ledger: SplitLedger,
    currencies: CurrencyTable,
    config: Config,
    storage: Box<dyn StorageBackend>,
}

impl LedgerManager {
    pub fn new(
        storage: Box<dyn StorageBackend>,
        ledger: SplitLedger,
        currencies: CurrencyTable,
        config: Config,
    ) -> Self {
        Self {
            ledger,
            currencies,
            config,
            storage,
        }
    }

    /// Hydrates the signed-in user's ledger from storage using the default
    /// currency table.
    pub fn load(storage: Box<dyn StorageBackend>, config: Config) -> Result<Self> {
        Self::load_with_currencies(storage, CurrencyTable::default(), config)
    }

    /// Hydrates from storage. The owner is the session user, falling back to
    /// the configured acting user; a missing owner row is created.
    pub fn load_with_currencies(
        storage: Box<dyn StorageBackend>,
        currencies: CurrencyTable,
        config: Config,
    ) -> Result<Self> {
        config.validate(&currencies)?;
        let (owner_id, owner_email) = match storage.current_user()? {
            Some(user) => (user.id, user.email),
            None => (config.acting_user.clone(), config.acting_email.clone()),
        };
        let ledger = records::hydrate_ledger(storage.as_ref(), &owner_id)?;
        let mut manager = Self::new(storage, ledger, currencies, config);
        if manager.ledger.participant(&owner_id).is_none() {
            let owner = Participant::active(owner_id.clone(), owner_email);
            manager.persist(&records::participant_writes(&owner_id, &owner)?)?;
            manager.ledger.add_participant(owner);
            tracing::info!(owner = %owner_id, "bootstrapped ledger owner");
        }
        tracing::info!(
            owner = %owner_id,
            participants = manager.ledger.participants.len(),
            groups = manager.ledger.groups.len(),
            expenses = manager.ledger.expense_count(),
            "ledger loaded"
        );
        Ok(manager)
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    pub fn ledger(&self) -> &SplitLedger {
        &self.ledger
    }

    pub fn currencies(&self) -> &CurrencyTable {
        &self.currencies
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn owner_id(&self) -> &ParticipantId {
        &self.ledger.owner_id
    }

    pub fn activity(&self) -> &[ActivityEntry] {
        &self.ledger.activity
    }

    // Participants

    pub fn add_participant(
        &mut self,
        acting_user: &ParticipantId,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<Participant> {
        self.ensure_known(acting_user)?;
        let owner = self.ledger.owner_id.clone();
        self.mutate(acting_user, |ledger| {
            let participant = ParticipantService::invite(ledger, email, display_name)?;
            Ok(Staged {
                writes: records::participant_writes(&owner, &participant)?,
                activity: (
                    ActivityKind::ParticipantInvited,
                    format!("Invited {}", participant.display_label()),
                ),
                value: participant,
            })
        })
    }

    pub fn activate_participant(
        &mut self,
        acting_user: &ParticipantId,
        id: &ParticipantId,
    ) -> Result<Participant> {
        self.ensure_known(acting_user)?;
        self.mutate(acting_user, |ledger| {
            let participant = ParticipantService::activate(ledger, id)?;
            Ok(Staged {
                writes: vec![records::participant_status_write(&participant)?],
                activity: (
                    ActivityKind::ParticipantActivated,
                    format!("{} joined", participant.label()),
                ),
                value: participant,
            })
        })
    }

    pub fn participant(&self, id: &ParticipantId) -> Result<&Participant> {
        ParticipantService::get(&self.ledger, id)
    }

    pub fn participants(&self) -> Vec<&Participant> {
        ParticipantService::list(&self.ledger)
    }

    pub fn friends_of(&self, reference: &ParticipantId) -> Vec<&Participant> {
        ParticipantService::friends_of(&self.ledger, reference)
    }

    // Groups

    pub fn create_group(
        &mut self,
        acting_user: &ParticipantId,
        name: &str,
        member_ids: &[ParticipantId],
    ) -> Result<Group> {
        let owner = self.ledger.owner_id.clone();
        self.mutate(acting_user, |ledger| {
            let group = GroupService::create(ledger, acting_user, name, member_ids)?;
            Ok(Staged {
                writes: records::group_writes(&owner, &group)?,
                activity: (
                    ActivityKind::GroupCreated,
                    format!("Created group {}", group.display_label()),
                ),
                value: group,
            })
        })
    }

    pub fn group(&self, id: Uuid) -> Result<&Group> {
        GroupService::get(&self.ledger, id)
    }

    pub fn groups(&self) -> Vec<&Group> {
        GroupService::list(&self.ledger)
    }

    pub fn groups_for(&self, participant: &ParticipantId) -> Vec<&Group> {
        GroupService::groups_for(&self.ledger, participant)
    }

    // Expenses

    pub fn add_expense(&mut self, acting_user: &ParticipantId, draft: NewExpense) -> Result<Expense> {
        let owner = self.ledger.owner_id.clone();
        let currencies = self.currencies.clone();
        self.mutate(acting_user, |ledger| {
            let expense = ExpenseService::add(ledger, &currencies, acting_user, draft)?;
            let summary = currencies.format_amount(expense.amount, expense.currency.as_str())?;
            Ok(Staged {
                writes: records::expense_writes(&owner, &expense)?,
                activity: (
                    ActivityKind::ExpenseAdded,
                    format!("Added {} ({})", expense.description, summary),
                ),
                value: expense,
            })
        })
    }

    /// Marks `participant_id`'s split as paid. Settling an already paid
    /// split returns `NoOp` without touching storage.
    pub fn settle_split(
        &mut self,
        acting_user: &ParticipantId,
        expense_id: Uuid,
        participant_id: &ParticipantId,
    ) -> Result<Expense> {
        self.ensure_known(acting_user)?;
        self.mutate(acting_user, |ledger| {
            let expense = ExpenseService::settle(ledger, expense_id, participant_id)?;
            let label = ledger
                .participant(participant_id)
                .map(|participant| participant.label().to_string())
                .unwrap_or_else(|| participant_id.to_string());
            Ok(Staged {
                writes: records::settlement_writes(&expense, participant_id)?,
                activity: (
                    ActivityKind::SplitSettled,
                    format!("{} settled {}", label, expense.description),
                ),
                value: expense,
            })
        })
    }

    pub fn expense(&self, id: Uuid) -> Result<&Expense> {
        ExpenseService::get(&self.ledger, id)
    }

    pub fn expenses(&self) -> Vec<&Expense> {
        ExpenseService::list(&self.ledger)
    }

    pub fn expenses_for_group(&self, group_id: Uuid) -> Vec<&Expense> {
        ExpenseService::for_group(&self.ledger, group_id)
    }

    pub fn expenses_involving(&self, participant: &ParticipantId) -> Vec<&Expense> {
        ExpenseService::involving(&self.ledger, participant)
    }

    pub fn unsettled_expenses(&self) -> Vec<&Expense> {
        ExpenseService::unsettled(&self.ledger)
    }

    // Balances

    pub fn global_balances(&self, currency: &str) -> Result<BTreeMap<ParticipantId, ParticipantBalance>> {
        BalanceService::global_balances(&self.ledger, &self.currencies, currency)
    }

    pub fn group_balances(
        &self,
        group_id: Uuid,
        currency: &str,
    ) -> Result<BTreeMap<ParticipantId, ParticipantBalance>> {
        BalanceService::group_balances(&self.ledger, &self.currencies, group_id, currency)
    }

    pub fn pairwise_balance(
        &self,
        a: &ParticipantId,
        b: &ParticipantId,
        currency: &str,
    ) -> Result<PairwiseBalance> {
        BalanceService::pairwise(&self.ledger, &self.currencies, a, b, currency)
    }

    pub fn friend_balances(
        &self,
        reference: &ParticipantId,
        currency: &str,
    ) -> Result<BTreeMap<ParticipantId, PairwiseBalance>> {
        BalanceService::friend_balances(&self.ledger, &self.currencies, reference, currency)
    }

    /// Settle-up plan over the global balances, in `currency`.
    pub fn suggest_transfers(&self, currency: &str) -> Result<Vec<Transfer>> {
        let balances = self.global_balances(currency)?;
        Ok(BalanceService::suggest_transfers(&balances))
    }

    // Currency

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        self.currencies.convert(amount, from, to)
    }

    pub fn format_amount(&self, amount: f64, currency: &str) -> Result<String> {
        self.currencies.format_amount(amount, currency)
    }

    /// Amount rendered in the configured display currency.
    pub fn format_in_display_currency(&self, amount: f64, from: &str) -> Result<String> {
        let display = self.config.display_currency.as_str();
        let converted = self.currencies.convert(amount, from, display)?;
        self.currencies.format_amount(converted, display)
    }

    // Snapshots

    pub fn export_snapshot(&self, path: &Path) -> Result<()> {
        persistence::save_ledger_to_file(&self.ledger, path)?;
        tracing::info!(path = %path.display(), "ledger snapshot written");
        Ok(())
    }

    fn ensure_known(&self, acting_user: &ParticipantId) -> Result<()> {
        if self.ledger.participant(acting_user).is_none() {
            return Err(SplitError::NotFound(format!("acting user {}", acting_user)));
        }
        Ok(())
    }

    fn mutate<T, F>(&mut self, acting_user: &ParticipantId, op: F) -> Result<T>
    where
        F: FnOnce(&mut SplitLedger) -> Result<Staged<T>>,
    {
        let mut working = self.ledger.clone();
        let Staged {
            value,
            writes,
            activity: (kind, description),
        } = op(&mut working)?;
        self.persist(&writes)?;
        self.ledger = working;
        tracing::info!(actor = %acting_user, activity = kind.as_str(), "{}", description);
        self.log_activity(acting_user, kind, description);
        Ok(value)
    }

    fn log_activity(&mut self, acting_user: &ParticipantId, kind: ActivityKind, description: String) {
        let entry = ActivityEntry::new(acting_user.clone(), kind, description);
        let written = records::activity_write(&self.ledger.owner_id, &entry)
            .and_then(|write| self.persist(std::slice::from_ref(&write)));
        match written {
            Ok(()) => self.ledger.record_activity(entry),
            Err(err) => {
                tracing::warn!(activity = kind.as_str(), error = %err, "activity log write failed");
            }
        }
    }

    fn persist(&self, writes: &[RowWrite]) -> Result<()> {
        for write in writes {
            self.apply_with_retry(write)?;
        }
        Ok(())
    }

    fn apply_with_retry(&self, write: &RowWrite) -> Result<()> {
        let max_attempts = self.config.persistence.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match write.apply(self.storage.as_ref()) {
                Ok(_) => return Ok(()),
                Err(err) if err.is_persistence() && attempt < max_attempts => {
                    tracing::warn!(
                        table = %write.table(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "storage write failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) if err.is_persistence() => return Err(err),
                Err(err) => {
                    return Err(SplitError::Storage(format!(
                        "write to `{}` rejected: {}",
                        write.table(),
                        err
                    )))
                }
            }
        }
    }
}
