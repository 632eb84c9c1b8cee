#![doc(test(attr(deny(warnings))))]

//! BudgetWise split ledger: participants, groups, shared expenses, split
//! calculation, and balance reconciliation across currencies.

pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod split;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use crate::core::LedgerManager;
pub use errors::{Result, SplitError};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("BudgetWise split ledger tracing initialized.");
    });
}

/// Like [`init`], with the filter taken from configuration.
pub fn init_with_config(config: &config::Config) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing_with(&config.log_filter);
        tracing::info!(filter = %config.log_filter, "BudgetWise split ledger tracing initialized.");
    });
}
