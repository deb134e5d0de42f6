//! Main accounting engine that coordinates journal, ledger, reconciliation,
//! partner and declaration operations over one shared storage backend

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::declarations::DeclarationManager;
use crate::journal::entry::{JournalEntryStore, NewEntry};
use crate::journal::period::{FiscalPeriodManager, YearCloseResult};
use crate::ledger::projection::{AccountProjection, LedgerProjector};
use crate::ledger::statements::{
    BalanceSheet, CashFlowStatement, IncomeStatement, StatementGenerator, TrialBalance,
};
use crate::partners::PartnerLedger;
use crate::reconciliation::{ReconciliationEngine, ReconciliationOutcome};
use crate::traits::JournalStorage;
use crate::types::*;

/// Snapshot of the business state for a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub as_of_date: NaiveDate,
    /// Period containing `as_of_date`, if one exists
    pub current_period: Option<FiscalPeriod>,
    pub fiscal_year: i32,
    /// Income accumulated over the fiscal year, posted entries only
    pub total_income: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_result: BigDecimal,
    /// The ten most recently posted entries of the year
    pub recent_entries: Vec<JournalEntry>,
    /// Unreconciled transactions for the requested bank account
    pub unreconciled_transactions: Vec<BankTransaction>,
    /// Declarations not yet filed, nearest due date first
    pub pending_declarations: Vec<FiscalDeclaration>,
    pub partners: Vec<Partner>,
}

/// Main engine that orchestrates all accounting operations. Every manager
/// shares the same storage backend, so changes made through one are
/// immediately visible to the others.
pub struct AccountingEngine<S: JournalStorage + Clone> {
    storage: S,
    entries: JournalEntryStore<S>,
    periods: FiscalPeriodManager<S>,
    statements: StatementGenerator<S>,
    reconciliation: ReconciliationEngine<S>,
    partners: PartnerLedger<S>,
    declarations: DeclarationManager<S>,
}

impl<S: JournalStorage + Clone> AccountingEngine<S> {
    /// Create a new engine with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            entries: JournalEntryStore::new(storage.clone()),
            periods: FiscalPeriodManager::new(storage.clone()),
            statements: StatementGenerator::new(storage.clone()),
            reconciliation: ReconciliationEngine::new(storage.clone()),
            partners: PartnerLedger::new(storage.clone()),
            declarations: DeclarationManager::new(storage.clone()),
            storage,
        }
    }

    // Chart of accounts
    /// Register (or replace) an account in the chart
    pub async fn save_account(&mut self, account: &Account) -> CoreResult<()> {
        self.storage.save_account(account).await
    }

    /// Get an account by code
    pub async fn get_account(&self, code: &str) -> CoreResult<Option<Account>> {
        self.storage.get_account(code).await
    }

    /// List accounts, optionally filtered by type
    pub async fn list_accounts(&self, account_type: Option<AccountType>) -> CoreResult<Vec<Account>> {
        self.storage.list_accounts(account_type).await
    }

    // Journal operations
    /// Create a draft journal entry
    pub async fn create_entry(&mut self, input: NewEntry) -> CoreResult<JournalEntry> {
        self.entries.create(input).await
    }

    /// Post a draft entry, making it visible to the ledger
    pub async fn post_entry(&mut self, entry_id: Uuid) -> CoreResult<JournalEntry> {
        self.entries.post(entry_id).await
    }

    /// Reverse a posted entry with a mirror entry
    pub async fn reverse_entry(
        &mut self,
        entry_id: Uuid,
        reversal_date: NaiveDate,
        reason: Option<String>,
    ) -> CoreResult<JournalEntry> {
        self.entries.reverse(entry_id, reversal_date, reason).await
    }

    /// Delete a draft entry
    pub async fn delete_draft(&mut self, entry_id: Uuid) -> CoreResult<()> {
        self.entries.delete_draft(entry_id).await
    }

    /// Get an entry by id
    pub async fn get_entry(&self, entry_id: Uuid) -> CoreResult<Option<JournalEntry>> {
        self.entries.get(entry_id).await
    }

    // Fiscal periods
    /// Seed the twelve monthly periods of a fiscal year
    pub async fn create_year(&mut self, fiscal_year: i32) -> CoreResult<Vec<FiscalPeriod>> {
        self.periods.create_year(fiscal_year).await
    }

    /// Get a period by id
    pub async fn get_period(&self, period_id: Uuid) -> CoreResult<Option<FiscalPeriod>> {
        self.periods.get(period_id).await
    }

    /// The periods of a fiscal year, ordered by start date
    pub async fn list_periods(&self, fiscal_year: i32) -> CoreResult<Vec<FiscalPeriod>> {
        self.storage.list_periods(fiscal_year).await
    }

    /// Close a period; fails while draft entries remain inside it
    pub async fn close_period(&mut self, period_id: Uuid) -> CoreResult<FiscalPeriod> {
        self.periods.close(period_id).await
    }

    /// Lock every period of a fiscal year and compute its net result
    pub async fn lock_year(&mut self, fiscal_year: i32) -> CoreResult<YearCloseResult> {
        self.periods.lock_year(fiscal_year).await
    }

    // Ledger and statements
    /// Project an account's movements and running balance over a window
    pub async fn project_account(
        &self,
        account_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CoreResult<AccountProjection> {
        LedgerProjector::new(self.storage.clone())
            .project_account(account_code, start_date, end_date)
            .await
    }

    /// Trial balance for a fiscal period
    pub async fn trial_balance(&self, period_id: Uuid) -> CoreResult<TrialBalance> {
        self.statements.trial_balance(period_id).await
    }

    /// Balance sheet as of a date
    pub async fn balance_sheet(&self, as_of_date: NaiveDate) -> CoreResult<BalanceSheet> {
        self.statements.balance_sheet(as_of_date).await
    }

    /// Income statement over a date range
    pub async fn income_statement(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CoreResult<IncomeStatement> {
        self.statements.income_statement(start_date, end_date).await
    }

    /// Cash flow statement over a date range
    pub async fn cash_flow(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CoreResult<CashFlowStatement> {
        self.statements.cash_flow(start_date, end_date).await
    }

    // Bank reconciliation
    /// Import a bank transaction for later reconciliation
    pub async fn save_bank_transaction(&mut self, transaction: &BankTransaction) -> CoreResult<()> {
        self.storage.save_bank_transaction(transaction).await
    }

    /// Register a categorization rule
    pub async fn save_rule(&mut self, rule: &ReconciliationRule) -> CoreResult<()> {
        self.storage.save_rule(rule).await
    }

    /// Auto-categorize the unreconciled transactions of a bank account
    pub async fn auto_reconcile(
        &mut self,
        bank_account_id: Uuid,
    ) -> CoreResult<ReconciliationOutcome> {
        self.reconciliation.auto_reconcile(bank_account_id).await
    }

    // Partners
    /// Register a partner
    pub async fn add_partner(&mut self, name: impl Into<String>) -> CoreResult<Partner> {
        self.partners.add_partner(name).await
    }

    /// Record a partner movement and update their current-account balance
    pub async fn record_partner_transaction(
        &mut self,
        partner_id: Uuid,
        transaction_type: PartnerTransactionType,
        amount: BigDecimal,
        transaction_date: NaiveDate,
        description: Option<String>,
    ) -> CoreResult<PartnerTransaction> {
        self.partners
            .record_transaction(partner_id, transaction_type, amount, transaction_date, description)
            .await
    }

    // Declarations
    /// Compute (or recompute) a declaration for a period
    pub async fn generate_declaration(
        &mut self,
        declaration_type: DeclarationType,
        period_id: Uuid,
    ) -> CoreResult<FiscalDeclaration> {
        self.declarations.generate(declaration_type, period_id).await
    }

    /// Aggregate the state of the business as of a date. `bank_account_id`
    /// selects whose unreconciled transactions appear; pass `None` to skip
    /// that section.
    pub async fn get_dashboard(
        &self,
        as_of_date: NaiveDate,
        bank_account_id: Option<Uuid>,
    ) -> CoreResult<Dashboard> {
        let fiscal_year = as_of_date.year();
        let current_period = self.storage.find_period_for_date(as_of_date).await?;

        let year_start = NaiveDate::from_ymd_opt(fiscal_year, 1, 1)
            .ok_or_else(|| CoreError::Validation(format!("invalid fiscal year {fiscal_year}")))?;
        let income = self
            .statements
            .income_statement(year_start, as_of_date)
            .await?;

        let mut recent_entries = self
            .storage
            .list_posted_entries(Some(year_start), Some(as_of_date))
            .await?;
        recent_entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date).then(b.created_at.cmp(&a.created_at)));
        recent_entries.truncate(10);

        let unreconciled_transactions = match bank_account_id {
            Some(id) => self.storage.list_unreconciled(id).await?,
            None => Vec::new(),
        };

        let pending_declarations = self
            .storage
            .list_declarations(None)
            .await?
            .into_iter()
            .filter(|d| d.status != DeclarationStatus::Filed)
            .collect();

        let partners = self.storage.list_partners().await?;

        Ok(Dashboard {
            as_of_date,
            current_period,
            fiscal_year,
            total_income: income.total_income.clone(),
            total_expenses: income.total_expenses.clone(),
            net_result: income.net_profit,
            recent_entries,
            unreconciled_transactions,
            pending_declarations,
            partners,
        })
    }
}
