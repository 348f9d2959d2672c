//! Core business logic - store-agnostic economy operations.
//!
//! `selector` and `valuation` are pure. `ledger` is the transactional engine and
//! only runs inside a caller-provided transaction. `service` wraps the engine
//! with identifier validation, pre-checks, timeouts and retries.

/// Account opening, balance reads and ledger reconciliation
pub mod account;
/// Catalog reads and drop table draws
pub mod catalog;
/// Ledger history queries
pub mod history;
/// Inventory and unopened container views
pub mod inventory;
/// Transactional engine for balance-affecting operations
pub mod ledger;
/// Weighted random selection over drop tables
pub mod selector;
/// Orchestration entry point for the request layer
pub mod service;
/// Wear-based item valuation
pub mod valuation;
