//! Split ledger domain models and persistence-friendly types.

pub mod activity;
pub mod common;
pub mod expense;
pub mod group;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod participant;

pub use activity::{ActivityEntry, ActivityKind};
pub use common::Displayable;
pub use expense::{Expense, Split, SplitKind};
pub use group::Group;
pub use ledger::{SplitLedger, CURRENT_SCHEMA_VERSION};
pub use participant::{Participant, ParticipantId, ParticipantStatus};
