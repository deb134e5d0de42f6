//! # Fiscal Core
//!
//! Double-entry accounting engine for small-business management: journal
//! entries with a draft/posted/reversed lifecycle, fiscal periods with
//! terminal year locking, ledger projection and financial statements, bank
//! reconciliation rules, partner current accounts and periodic tax
//! declarations.
//!
//! ## Features
//!
//! - **Double-entry journal**: balanced entries validated before any write,
//!   reversal by mirror entry, drafts invisible to the ledger
//! - **Fiscal periods**: monthly periods moving open → closed → locked,
//!   with the year's net result computed at lock time
//! - **Financial statements**: trial balance, balance sheet, income
//!   statement and cash flow, all recomputed from posted entries
//! - **Bank reconciliation**: prioritized first-match-wins rule engine with
//!   exact, substring and regex matching
//! - **Partner accounts**: capital and loan movements with atomically
//!   maintained running balances
//! - **Fiscal declarations**: pluggable per-type calculators (Spanish
//!   modelo 303 VAT built in)
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use fiscal_core::{AccountingEngine, MemoryStorage, Account, AccountType};
//! use fiscal_core::journal::entry::{LineInput, NewEntry};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), fiscal_core::CoreError> {
//! let mut engine = AccountingEngine::new(MemoryStorage::new());
//! engine.save_account(&Account::new("570000", "Caja", AccountType::Asset)).await?;
//! engine.save_account(&Account::new("700000", "Ventas", AccountType::Income)).await?;
//! engine.create_year(2025).await?;
//!
//! let entry = engine
//!     .create_entry(NewEntry::new(
//!         NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
//!         "Venta al contado",
//!         vec![
//!             LineInput::debit("570000", BigDecimal::from(100)),
//!             LineInput::credit("700000", BigDecimal::from(100)),
//!         ],
//!     ))
//!     .await?;
//! engine.post_entry(entry.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod declarations;
pub mod engine;
pub mod journal;
pub mod ledger;
pub mod partners;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use api::{dispatch, ActionRequest, ActionResponse};
pub use declarations::{DeclarationCalculator, DeclarationManager, Modelo303Calculator};
pub use engine::{AccountingEngine, Dashboard};
pub use journal::{FiscalPeriodManager, JournalEntryStore};
pub use ledger::{LedgerProjector, StatementGenerator};
pub use partners::PartnerLedger;
pub use reconciliation::{ReconciliationEngine, ReconciliationOutcome};
pub use traits::JournalStorage;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;
