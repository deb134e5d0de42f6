//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the accounting engine
///
/// This trait lets the engine work with any transactional backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.). Each engine operation maps
/// to a single logical transaction; implementations backed by a relational
/// store should wrap the corresponding writes in one database transaction so
/// a crash midway leaves no partially-applied state.
#[async_trait]
pub trait JournalStorage: Send + Sync {
    // --- Chart of accounts (read-mostly; maintained externally) ---

    /// Save an account to storage
    async fn save_account(&mut self, account: &Account) -> CoreResult<()>;

    /// Get an account by code
    async fn get_account(&self, code: &str) -> CoreResult<Option<Account>>;

    /// List all accounts, optionally filtered by type
    async fn list_accounts(&self, account_type: Option<AccountType>) -> CoreResult<Vec<Account>>;

    // --- Fiscal periods ---

    /// Save a fiscal period
    async fn save_period(&mut self, period: &FiscalPeriod) -> CoreResult<()>;

    /// Get a fiscal period by id
    async fn get_period(&self, id: Uuid) -> CoreResult<Option<FiscalPeriod>>;

    /// Find the period covering a date, if any
    async fn find_period_for_date(&self, date: NaiveDate) -> CoreResult<Option<FiscalPeriod>>;

    /// List all periods of a fiscal year, ordered by start date
    async fn list_periods(&self, fiscal_year: i32) -> CoreResult<Vec<FiscalPeriod>>;

    /// Update a period (status transitions)
    async fn update_period(&mut self, period: &FiscalPeriod) -> CoreResult<()>;

    // --- Journal entries ---

    /// Save a journal entry together with its lines
    async fn save_entry(&mut self, entry: &JournalEntry) -> CoreResult<()>;

    /// Get a journal entry by id
    async fn get_entry(&self, id: Uuid) -> CoreResult<Option<JournalEntry>>;

    /// Update a journal entry (status transitions; drafts may be edited)
    async fn update_entry(&mut self, entry: &JournalEntry) -> CoreResult<()>;

    /// Delete a draft entry and its lines
    async fn delete_entry(&mut self, id: Uuid) -> CoreResult<()>;

    /// Atomically insert a reversal entry and persist the reversed
    /// original's status flip. Both writes commit together or not at all;
    /// a mirror must never exist without its original marked reversed.
    async fn apply_reversal(
        &mut self,
        reversal: &JournalEntry,
        original: &JournalEntry,
    ) -> CoreResult<()>;

    /// List entries belonging to a fiscal period, any status
    async fn list_entries_for_period(&self, period_id: Uuid) -> CoreResult<Vec<JournalEntry>>;

    /// List posted (and reversed-original) entries in a date window.
    /// Draft entries are never returned; their lines are invisible to
    /// the ledger.
    async fn list_posted_entries(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CoreResult<Vec<JournalEntry>>;

    /// Count draft entries inside a period
    async fn count_draft_entries(&self, period_id: Uuid) -> CoreResult<usize>;

    // --- Bank reconciliation ---

    /// Save a bank transaction
    async fn save_bank_transaction(&mut self, transaction: &BankTransaction) -> CoreResult<()>;

    /// List unreconciled transactions for a bank account, oldest first
    async fn list_unreconciled(&self, bank_account_id: Uuid) -> CoreResult<Vec<BankTransaction>>;

    /// Update a bank transaction (reconciliation stamp)
    async fn update_bank_transaction(&mut self, transaction: &BankTransaction) -> CoreResult<()>;

    /// Save a reconciliation rule
    async fn save_rule(&mut self, rule: &ReconciliationRule) -> CoreResult<()>;

    /// List active rules ordered by ascending priority, then creation time
    async fn list_active_rules(&self) -> CoreResult<Vec<ReconciliationRule>>;

    /// Update a rule (activation changes)
    async fn update_rule(&mut self, rule: &ReconciliationRule) -> CoreResult<()>;

    /// Atomically persist a reconciliation: the transaction's stamp and the
    /// matched rule's bumped counter commit together, never as two
    /// independent writes.
    async fn apply_reconciliation(
        &mut self,
        transaction: &BankTransaction,
        rule: &ReconciliationRule,
    ) -> CoreResult<()>;

    // --- Partners ---

    /// Save a partner
    async fn save_partner(&mut self, partner: &Partner) -> CoreResult<()>;

    /// Get a partner by id
    async fn get_partner(&self, id: Uuid) -> CoreResult<Option<Partner>>;

    /// List all partners
    async fn list_partners(&self) -> CoreResult<Vec<Partner>>;

    /// Atomically insert a partner transaction and set the partner's new
    /// current-account balance. Both effects commit together or not at all;
    /// the balance must never drift from the transaction log.
    async fn apply_partner_transaction(
        &mut self,
        transaction: &PartnerTransaction,
        updated_partner: &Partner,
    ) -> CoreResult<()>;

    /// List transactions for a partner, oldest first
    async fn list_partner_transactions(
        &self,
        partner_id: Uuid,
    ) -> CoreResult<Vec<PartnerTransaction>>;

    // --- Fiscal declarations ---

    /// Insert or replace a declaration keyed by (fiscal_period_id, type)
    async fn upsert_declaration(&mut self, declaration: &FiscalDeclaration) -> CoreResult<()>;

    /// Get the declaration for a period and type, if any
    async fn get_declaration(
        &self,
        fiscal_period_id: Uuid,
        declaration_type: DeclarationType,
    ) -> CoreResult<Option<FiscalDeclaration>>;

    /// List declarations with a given status
    async fn list_declarations(
        &self,
        status: Option<DeclarationStatus>,
    ) -> CoreResult<Vec<FiscalDeclaration>>;
}
