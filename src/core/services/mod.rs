pub mod balance_service;
pub mod expense_service;
pub mod group_service;
pub mod participant_service;

pub use balance_service::{BalanceService, PairwiseBalance, ParticipantBalance, Transfer};
pub use expense_service::{ExpenseService, NewExpense};
pub use group_service::GroupService;
pub use participant_service::ParticipantService;

pub type ServiceResult<T> = crate::errors::Result<T>;
