//! Row shapes for each table and their mapping to the domain model.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::errors::{Result, SplitError};
use crate::ledger::{
    ActivityEntry, ActivityKind, Expense, Group, Participant, ParticipantId, ParticipantStatus,
    Split, SplitKind, SplitLedger,
};
use crate::split;

use super::{Record, RowFilter, StorageBackend, Table};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantRow {
    pub id: ParticipantId,
    pub user_id: ParticipantId,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub status: ParticipantStatus,
    pub invited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRow {
    pub id: Uuid,
    pub user_id: ParticipantId,
    pub name: String,
    pub created_by: ParticipantId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMemberRow {
    pub id: String,
    pub user_id: ParticipantId,
    pub group_id: Uuid,
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseRow {
    pub id: Uuid,
    pub user_id: ParticipantId,
    pub description: String,
    pub amount: f64,
    pub currency: CurrencyCode,
    pub payer_id: ParticipantId,
    pub date: NaiveDate,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    pub split_type: SplitKind,
    /// Computed from the split rows; kept for readers that only see this table.
    #[serde(default)]
    pub settled: bool,
    pub created_by: ParticipantId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseSplitRow {
    pub id: String,
    pub user_id: ParticipantId,
    pub expense_id: Uuid,
    pub participant_id: ParticipantId,
    pub position: usize,
    pub amount: f64,
    pub paid: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRow {
    pub id: Uuid,
    pub user_id: ParticipantId,
    /// Participant who performed the action; `user_id` is the ledger owner.
    pub actor_id: ParticipantId,
    pub activity_type: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One pending write against the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RowWrite {
    Insert(Table, Record),
    Update(Table, String, Record),
}

impl RowWrite {
    pub fn table(&self) -> Table {
        match self {
            RowWrite::Insert(table, _) | RowWrite::Update(table, _, _) => *table,
        }
    }

    pub fn apply(&self, storage: &dyn StorageBackend) -> Result<Record> {
        match self {
            RowWrite::Insert(table, record) => storage.insert_row(*table, record.clone()),
            RowWrite::Update(table, id, patch) => storage.update_row(*table, id, patch.clone()),
        }
    }
}

pub fn to_record<T: Serialize>(row: &T) -> Result<Record> {
    match serde_json::to_value(row)? {
        Value::Object(map) => Ok(map),
        other => Err(SplitError::Storage(format!(
            "row serialized to non-object value: {}",
            other
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub fn split_row_id(expense_id: Uuid, participant: &ParticipantId) -> String {
    format!("{}:{}", expense_id, participant)
}

fn member_row_id(group_id: Uuid, participant: &ParticipantId) -> String {
    format!("{}:{}", group_id, participant)
}

pub fn participant_writes(owner: &ParticipantId, participant: &Participant) -> Result<Vec<RowWrite>> {
    let row = ParticipantRow {
        id: participant.id.clone(),
        user_id: owner.clone(),
        email: participant.email.clone(),
        display_name: participant.display_name.clone(),
        status: participant.status,
        invited_at: participant.invited_at,
    };
    Ok(vec![RowWrite::Insert(Table::Participants, to_record(&row)?)])
}

pub fn participant_status_write(participant: &Participant) -> Result<RowWrite> {
    let mut patch = Record::new();
    patch.insert("status".into(), serde_json::to_value(participant.status)?);
    Ok(RowWrite::Update(
        Table::Participants,
        participant.id.to_string(),
        patch,
    ))
}

/// Member rows first, group row last: an interrupted write leaves only
/// orphaned members, which hydration drops.
pub fn group_writes(owner: &ParticipantId, group: &Group) -> Result<Vec<RowWrite>> {
    let row = GroupRow {
        id: group.id,
        user_id: owner.clone(),
        name: group.name.clone(),
        created_by: group.created_by.clone(),
        created_at: group.created_at,
    };
    let mut writes = Vec::with_capacity(group.members.len() + 1);
    for member in &group.members {
        let member_row = GroupMemberRow {
            id: member_row_id(group.id, member),
            user_id: owner.clone(),
            group_id: group.id,
            participant_id: member.clone(),
        };
        writes.push(RowWrite::Insert(Table::GroupMembers, to_record(&member_row)?));
    }
    writes.push(RowWrite::Insert(Table::Groups, to_record(&row)?));
    Ok(writes)
}

/// Split rows first, expense row last, so no expense row exists without
/// its splits.
pub fn expense_writes(owner: &ParticipantId, expense: &Expense) -> Result<Vec<RowWrite>> {
    let row = ExpenseRow {
        id: expense.id,
        user_id: owner.clone(),
        description: expense.description.clone(),
        amount: expense.amount,
        currency: expense.currency.clone(),
        payer_id: expense.payer_id.clone(),
        date: expense.date,
        group_id: expense.group_id,
        split_type: expense.split_kind,
        settled: expense.is_settled(),
        created_by: expense.created_by.clone(),
        created_at: expense.created_at,
    };
    let mut writes = Vec::with_capacity(expense.splits.len() + 1);
    for (position, split) in expense.splits.iter().enumerate() {
        let split_row = ExpenseSplitRow {
            id: split_row_id(expense.id, &split.user_id),
            user_id: owner.clone(),
            expense_id: expense.id,
            participant_id: split.user_id.clone(),
            position,
            amount: split.amount,
            paid: split.paid,
            paid_at: split.paid_at,
        };
        writes.push(RowWrite::Insert(Table::ExpenseSplits, to_record(&split_row)?));
    }
    writes.push(RowWrite::Insert(Table::Expenses, to_record(&row)?));
    Ok(writes)
}

/// Writes persisting a settled split, plus the expense's `settled` column.
pub fn settlement_writes(expense: &Expense, participant: &ParticipantId) -> Result<Vec<RowWrite>> {
    let split = expense.split_for(participant).ok_or_else(|| {
        SplitError::NotFound(format!(
            "participant {} has no split in expense {}",
            participant, expense.id
        ))
    })?;
    let mut patch = Record::new();
    patch.insert("paid".into(), Value::Bool(split.paid));
    patch.insert("paid_at".into(), serde_json::to_value(split.paid_at)?);

    let mut expense_patch = Record::new();
    expense_patch.insert("settled".into(), Value::Bool(expense.is_settled()));
    Ok(vec![
        RowWrite::Update(
            Table::ExpenseSplits,
            split_row_id(expense.id, participant),
            patch,
        ),
        RowWrite::Update(Table::Expenses, expense.id.to_string(), expense_patch),
    ])
}

pub fn activity_write(owner: &ParticipantId, entry: &ActivityEntry) -> Result<RowWrite> {
    let row = ActivityRow {
        id: entry.id,
        user_id: owner.clone(),
        actor_id: entry.user_id.clone(),
        activity_type: entry.activity_type,
        description: entry.description.clone(),
        created_at: entry.created_at,
    };
    Ok(RowWrite::Insert(Table::ActivityLogs, to_record(&row)?))
}

fn select<T: DeserializeOwned>(
    storage: &dyn StorageBackend,
    table: Table,
    owner: &ParticipantId,
) -> Result<Vec<T>> {
    storage
        .select_rows(table, &RowFilter::all().eq("user_id", owner.as_str()))?
        .into_iter()
        .map(from_record::<T>)
        .collect()
}

/// Rebuilds the owner's ledger from every table.
pub fn hydrate_ledger(storage: &dyn StorageBackend, owner: &ParticipantId) -> Result<SplitLedger> {
    let mut ledger = SplitLedger::empty(owner.clone());

    for row in select::<ParticipantRow>(storage, Table::Participants, owner)? {
        ledger.participants.push(Participant {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            status: row.status,
            invited_at: row.invited_at,
        });
    }

    let mut members: HashMap<Uuid, BTreeSet<ParticipantId>> = HashMap::new();
    for row in select::<GroupMemberRow>(storage, Table::GroupMembers, owner)? {
        members.entry(row.group_id).or_default().insert(row.participant_id);
    }
    for row in select::<GroupRow>(storage, Table::Groups, owner)? {
        let group = Group {
            id: row.id,
            name: row.name,
            members: members.remove(&row.id).unwrap_or_default(),
            created_by: row.created_by,
            created_at: row.created_at,
        };
        if !group.has_member(&group.created_by) {
            tracing::warn!(group = %group.id, "skipping group without its creator among members");
            continue;
        }
        ledger.groups.push(group);
    }
    if !members.is_empty() {
        tracing::warn!(orphans = members.len(), "member rows reference unknown groups");
    }

    let mut splits: HashMap<Uuid, Vec<ExpenseSplitRow>> = HashMap::new();
    for row in select::<ExpenseSplitRow>(storage, Table::ExpenseSplits, owner)? {
        splits.entry(row.expense_id).or_default().push(row);
    }
    for row in select::<ExpenseRow>(storage, Table::Expenses, owner)? {
        let mut rows = splits.remove(&row.id).unwrap_or_default();
        rows.sort_by_key(|split| split.position);
        let expense = Expense {
            id: row.id,
            description: row.description,
            amount: row.amount,
            currency: row.currency,
            payer_id: row.payer_id,
            date: row.date,
            group_id: row.group_id,
            split_kind: row.split_type,
            splits: rows
                .into_iter()
                .map(|split| Split {
                    user_id: split.participant_id,
                    amount: split.amount,
                    paid: split.paid,
                    paid_at: split.paid_at,
                })
                .collect(),
            created_by: row.created_by,
            created_at: row.created_at,
        };
        if let Err(reason) = check_expense(&expense) {
            tracing::warn!(expense = %expense.id, "skipping stored expense: {}", reason);
            continue;
        }
        if row.settled != expense.is_settled() {
            tracing::warn!(expense = %expense.id, "stored settled flag disagrees with split rows");
        }
        ledger.expenses.push(expense);
    }
    if !splits.is_empty() {
        tracing::warn!(orphans = splits.len(), "split rows reference unknown expenses");
    }

    for row in select::<ActivityRow>(storage, Table::ActivityLogs, owner)? {
        ledger.activity.push(ActivityEntry {
            id: row.id,
            user_id: row.actor_id,
            activity_type: row.activity_type,
            description: row.description,
            created_at: row.created_at,
        });
    }
    Ok(ledger)
}

/// Re-applies the invariants every accepted expense satisfies.
fn check_expense(expense: &Expense) -> Result<()> {
    let payer_splits = expense
        .splits
        .iter()
        .filter(|split| split.user_id == expense.payer_id)
        .count();
    if payer_splits != 1 {
        return Err(SplitError::Validation(format!(
            "expected one payer split, found {}",
            payer_splits
        )));
    }
    split::reconcile_within(
        expense.amount,
        &expense.splits,
        split::tolerance_for(expense.split_kind, expense.splits.len()),
    )
}
