mod common;

use std::fs;
use std::sync::Arc;

use budgetwise_core::{
    config::Config,
    core::services::NewExpense,
    ledger::ActivityKind,
    storage::{json_backend::JsonStorage, MemoryStorage, SessionUser, StorageBackend, Table},
    utils::persistence::{load_ledger_from_file, save_ledger_to_file},
    LedgerManager,
};
use chrono::NaiveDate;

use common::{me, memory_manager, open_json, setup_test_env};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[test]
fn json_storage_reloads_full_ledger() {
    let (mut manager, config_manager, base) = setup_test_env();
    let friend = manager
        .add_participant(&me(), "asha@example.com", Some("Asha"))
        .unwrap();
    let group = manager
        .create_group(&me(), "Flat", &[friend.id.clone()])
        .unwrap();
    let expense = manager
        .add_expense(
            &me(),
            NewExpense::new("Electricity", 1500.0, "INR", me(), date()).in_group(group.id),
        )
        .unwrap();
    manager.settle_split(&me(), expense.id, &friend.id).unwrap();

    let reopened = open_json(&base, config_manager.load().unwrap());
    assert_eq!(reopened.participants().len(), 2);
    assert_eq!(reopened.participant(&friend.id).unwrap().label(), "Asha");
    assert_eq!(reopened.group(group.id).unwrap().members, group.members);
    let restored = reopened.expense(expense.id).unwrap();
    assert!(restored.is_settled());
    assert_eq!(restored, manager.expense(expense.id).unwrap());
    let kinds: Vec<_> = reopened
        .activity()
        .iter()
        .map(|entry| entry.activity_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ActivityKind::ParticipantInvited,
            ActivityKind::GroupCreated,
            ActivityKind::ExpenseAdded,
            ActivityKind::SplitSettled
        ]
    );
}

#[test]
fn session_user_owns_the_ledger() {
    let base = common::temp_base();
    let storage = JsonStorage::new(Some(base.clone())).unwrap();
    storage
        .set_session_user(Some(&SessionUser {
            id: "u-99".into(),
            email: "me@example.com".into(),
        }))
        .unwrap();

    let manager = open_json(&base, Config::default());
    assert_eq!(manager.owner_id().as_str(), "u-99");
    let rows = storage
        .select_rows(Table::Participants, &Default::default())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("user_id").and_then(|v| v.as_str()), Some("u-99"));
}

#[test]
fn failed_write_leaves_ledger_untouched() {
    let (mut manager, storage) = memory_manager();
    let friend = manager.add_participant(&me(), "asha@example.com", None).unwrap();
    let snapshot = manager.ledger().clone();

    storage.fail_next_writes(3).unwrap();
    let err = manager
        .create_group(&me(), "Trip", &[friend.id.clone()])
        .unwrap_err();
    assert!(err.is_persistence());
    assert!(manager.groups().is_empty());
    assert_eq!(manager.activity().len(), snapshot.activity.len());
    assert_eq!(storage.row_count(Table::Groups).unwrap(), 0);

    // Storage is healthy again: the same request succeeds.
    manager
        .create_group(&me(), "Trip", &[friend.id.clone()])
        .unwrap();
    assert_eq!(manager.groups().len(), 1);
}

fn reload(storage: &Arc<MemoryStorage>) -> LedgerManager {
    LedgerManager::load(Box::new(Arc::clone(storage)), Config::default()).unwrap()
}

#[test]
fn interrupted_expense_write_does_not_reload_as_settled() {
    for table in [Table::ExpenseSplits, Table::Expenses] {
        let (mut manager, storage) = memory_manager();
        let friend = manager.add_participant(&me(), "asha@example.com", None).unwrap();

        storage.set_read_only(Some(table)).unwrap();
        let err = manager
            .add_expense(
                &me(),
                NewExpense::new("Dinner", 900.0, "INR", me(), date())
                    .with_participants(vec![friend.id.clone()]),
            )
            .unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(storage.row_count(Table::Expenses).unwrap(), 0, "{table}");
        storage.set_read_only(None).unwrap();

        let reopened = reload(&storage);
        assert!(reopened.expenses().is_empty(), "{table}");
        let balances = reopened.global_balances("INR").unwrap();
        assert_eq!(balances.get(&friend.id).map_or(0.0, |b| b.owes), 0.0);
    }
}

#[test]
fn interrupted_group_write_does_not_reload_without_members() {
    for table in [Table::GroupMembers, Table::Groups] {
        let (mut manager, storage) = memory_manager();
        let friend = manager.add_participant(&me(), "asha@example.com", None).unwrap();

        storage.set_read_only(Some(table)).unwrap();
        assert!(manager
            .create_group(&me(), "Trip", &[friend.id.clone()])
            .unwrap_err()
            .is_persistence());
        storage.set_read_only(None).unwrap();

        let reopened = reload(&storage);
        assert!(reopened.groups().is_empty(), "{table}");
        assert!(reopened.groups_for(&me()).is_empty());
    }
}

#[test]
fn failed_settlement_keeps_split_unpaid() {
    let (mut manager, storage) = memory_manager();
    let friend = manager.add_participant(&me(), "asha@example.com", None).unwrap();
    let expense = manager
        .add_expense(
            &me(),
            NewExpense::new("Cab", 250.0, "INR", me(), date()).with_participants(vec![friend.id.clone()]),
        )
        .unwrap();

    storage.fail_next_writes(3).unwrap();
    assert!(manager
        .settle_split(&me(), expense.id, &friend.id)
        .unwrap_err()
        .is_persistence());
    assert!(!manager.expense(expense.id).unwrap().split_for(&friend.id).unwrap().paid);
    let balances = manager.global_balances("INR").unwrap();
    assert_eq!(balances[&friend.id].owes, 125.0);
}

#[test]
fn snapshot_export_roundtrip() {
    let (mut manager, _config, base) = setup_test_env();
    let friend = manager.add_participant(&me(), "asha@example.com", None).unwrap();
    manager
        .add_expense(
            &me(),
            NewExpense::new("Movie", 600.0, "INR", me(), date()).with_participants(vec![friend.id]),
        )
        .unwrap();

    let path = base.join("snapshots").join("ledger.json");
    manager.export_snapshot(&path).unwrap();
    let loaded = load_ledger_from_file(&path).unwrap();
    assert_eq!(loaded.expenses, manager.ledger().expenses);
    assert_eq!(loaded.owner_id, *manager.owner_id());
}

#[test]
fn failed_snapshot_save_preserves_original_file() {
    let (manager, _config, base) = setup_test_env();
    let path = base.join("ledger.json");
    save_ledger_to_file(manager.ledger(), &path).unwrap();
    let original = fs::read_to_string(&path).unwrap();

    // A directory squatting on the temp file name makes the staged write fail.
    fs::create_dir_all(base.join("ledger.json.tmp")).unwrap();
    assert!(save_ledger_to_file(manager.ledger(), &path).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}
