//! Core types and data structures for the accounting engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Receivables, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Payables, VAT due, etc.)
    Liability,
    /// Equity - owners' interest in the business (Capital, Reserves, etc.)
    Equity,
    /// Income/Revenue - money earned by the business
    Income,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    /// Assets and Expenses normally carry debit balances;
    /// Liabilities, Equity, and Income normally carry credit balances.
    pub fn normal_balance(&self) -> BalanceSide {
        match self {
            AccountType::Asset | AccountType::Expense => BalanceSide::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => {
                BalanceSide::Credit
            }
        }
    }
}

/// The two sides of double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSide {
    Debit,
    Credit,
}

/// A chart-of-accounts record.
///
/// Account codes are hierarchical by leading digits (Plan General Contable
/// layout): the first digit is the account group, subgroup 57 holds cash
/// accounts, group 6 expenses, group 7 income. Only detail accounts can be
/// posted to; summary accounts exist for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account code, e.g. "570000"
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Leading digit of the code, 1-7
    pub account_group: u8,
    /// Normal balance side
    pub normal_balance: BalanceSide,
    /// Leaf account that journal lines may reference; summary otherwise
    pub is_detail: bool,
    /// Inactive accounts are kept for history but hidden from new postings
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Create a new detail account. The account group and normal balance
    /// side are derived from the code and type.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        let code = code.into();
        let account_group = code
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0) as u8;
        Self {
            code,
            name: name.into(),
            account_type,
            account_group,
            normal_balance: account_type.normal_balance(),
            is_detail: true,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Mark this account as a summary (aggregation-only) account.
    pub fn summary(mut self) -> Self {
        self.is_detail = false;
        self
    }
}

/// Fiscal period lifecycle: open, then closed, then locked. Transitions
/// only ever advance; there is no unlock path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Open,
    Closed,
    Locked,
}

/// A non-overlapping date range within a fiscal year. Every journal entry
/// date must fall inside exactly one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub id: Uuid,
    pub fiscal_year: i32,
    /// Display name, e.g. "Enero 2025"
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub closed_at: Option<NaiveDateTime>,
}

impl FiscalPeriod {
    pub fn new(
        fiscal_year: i32,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fiscal_year,
            name: name.into(),
            start_date,
            end_date,
            status: PeriodStatus::Open,
            closed_at: None,
        }
    }

    /// Whether a date falls inside this period (inclusive bounds).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Journal entry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Editable, invisible to the ledger
    Draft,
    /// Irreversibly visible to the ledger; may only be reversed
    Posted,
    /// A posted mirror entry cancels this one; its lines remain history
    Reversed,
}

/// An atomic, dated group of debit/credit lines representing one business
/// event. Total debits always equal total credits within tolerance; this is
/// checked at creation and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub description: String,
    pub fiscal_period_id: Uuid,
    pub status: EntryStatus,
    /// Optional link to the originating document ("invoice", "payroll", ...)
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub source_document: Option<String>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// True when this entry exists to cancel another
    pub is_reversing: bool,
    /// Back-reference to the entry this one reverses
    pub reversed_entry_id: Option<Uuid>,
    pub lines: Vec<JournalEntryLine>,
    pub created_at: NaiveDateTime,
    pub posted_at: Option<NaiveDateTime>,
}

/// A single debit or credit against one detail account. Owned exclusively
/// by its journal entry; exactly one of the amount pair is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub id: Uuid,
    /// 1-based position within the entry; defines processing order
    pub line_number: u32,
    pub account_code: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub description: Option<String>,
    pub tax_code: Option<String>,
}

/// A single ledger delta derived from a posted journal line, with the
/// running balance after folding it in. Never stored; always recomputed
/// from the posted-entry log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub entry_id: Uuid,
    pub entry_date: NaiveDate,
    pub line_number: u32,
    pub description: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    /// Balance after this movement, folded as debit - credit
    pub running_balance: BigDecimal,
}

/// How a reconciliation rule compares its pattern against a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive equality
    Exact,
    /// Case-insensitive substring
    Contains,
    /// Case-insensitive regular expression
    Regex,
}

/// A prioritized auto-categorization rule for bank transactions.
/// Lower priority sorts first; rules created earlier win ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRule {
    pub id: Uuid,
    pub priority: i32,
    /// Transaction field the pattern is tested against ("description", "amount")
    pub match_field: String,
    pub match_type: MatchType,
    pub match_value: String,
    pub target_category: String,
    pub is_active: bool,
    /// Incremented on every successful match, for observability
    pub matches_count: u64,
    pub created_at: NaiveDateTime,
}

impl ReconciliationRule {
    pub fn new(
        priority: i32,
        match_field: impl Into<String>,
        match_type: MatchType,
        match_value: impl Into<String>,
        target_category: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            match_field: match_field.into(),
            match_type,
            match_value: match_value.into(),
            target_category: target_category.into(),
            is_active: true,
            matches_count: 0,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// An imported bank statement line. Transitions from unreconciled to
/// reconciled exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: Uuid,
    pub bank_account_id: Uuid,
    pub transaction_date: NaiveDate,
    pub description: String,
    /// Signed amount: positive inflow, negative outflow
    pub amount: BigDecimal,
    pub is_reconciled: bool,
    pub category: Option<String>,
    pub reconciled_at: Option<NaiveDateTime>,
}

impl BankTransaction {
    pub fn new(
        bank_account_id: Uuid,
        transaction_date: NaiveDate,
        description: impl Into<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bank_account_id,
            transaction_date,
            description: description.into(),
            amount,
            is_reconciled: false,
            category: None,
            reconciled_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    Active,
    Inactive,
}

/// A shareholder with a running current-account balance maintained
/// transactionally alongside each movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub status: PartnerStatus,
    pub current_account_balance: BigDecimal,
    pub created_at: NaiveDateTime,
}

impl Partner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: PartnerStatus::Active,
            current_account_balance: BigDecimal::from(0),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Kinds of partner current-account movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerTransactionType {
    CapitalContribution,
    LoanToCompany,
    Withdrawal,
    LoanRepayment,
    Distribution,
}

impl PartnerTransactionType {
    /// Direction of the balance update: contributions and loans to the
    /// company increase the partner's balance, withdrawals decrease it.
    pub fn sign(&self) -> i8 {
        match self {
            PartnerTransactionType::CapitalContribution
            | PartnerTransactionType::LoanToCompany => 1,
            PartnerTransactionType::Withdrawal
            | PartnerTransactionType::LoanRepayment
            | PartnerTransactionType::Distribution => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerTransactionStatus {
    Pending,
    Posted,
    Cancelled,
}

/// A single partner current-account movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerTransaction {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub transaction_type: PartnerTransactionType,
    pub amount: BigDecimal,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub status: PartnerTransactionStatus,
    pub created_at: NaiveDateTime,
}

/// Supported periodic tax filings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationType {
    /// Spanish periodic VAT return
    Modelo303,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationStatus {
    Pending,
    Calculated,
    Filed,
}

/// A computed periodic tax filing, unique per (fiscal period, type).
/// Regenerating overwrites the prior calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalDeclaration {
    pub id: Uuid,
    pub declaration_type: DeclarationType,
    pub fiscal_period_id: Uuid,
    /// Human-readable period label, e.g. "Enero 2025"
    pub declaration_period: String,
    pub due_date: NaiveDate,
    pub status: DeclarationStatus,
    /// Figures computed by the type's calculation strategy
    pub calculated_data: serde_json::Value,
    pub total_amount: BigDecimal,
    pub calculated_at: NaiveDateTime,
}

/// Errors surfaced by the accounting engine
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("entry is not balanced: debits = {debits}, credits = {credits}")]
    ImbalancedEntry {
        debits: BigDecimal,
        credits: BigDecimal,
    },
    #[error("no fiscal period covers date {0}")]
    NoFiscalPeriod(NaiveDate),
    #[error("fiscal period '{0}' is locked")]
    PeriodLocked(String),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("account '{0}' is a summary account and cannot be posted to")]
    NotPostable(String),
    #[error("journal entry {0} is not a draft")]
    NotDraft(Uuid),
    #[error("journal entry {0} is not posted")]
    NotPosted(Uuid),
    #[error("cannot close period '{period}': {count} draft entries remain")]
    DraftEntriesRemain { period: String, count: usize },
    #[error("cannot lock fiscal year {year}: {count} periods are not closed")]
    OpenPeriodsRemain { year: i32, count: usize },
    #[error("journal entry not found: {0}")]
    EntryNotFound(Uuid),
    #[error("fiscal period not found: {0}")]
    PeriodNotFound(Uuid),
    #[error("partner not found: {0}")]
    PartnerNotFound(Uuid),
    #[error("no calculator registered for declaration type {0:?}")]
    DeclarationTypeUnknown(DeclarationType),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_balance_sides() {
        assert_eq!(AccountType::Asset.normal_balance(), BalanceSide::Debit);
        assert_eq!(AccountType::Expense.normal_balance(), BalanceSide::Debit);
        assert_eq!(AccountType::Liability.normal_balance(), BalanceSide::Credit);
        assert_eq!(AccountType::Equity.normal_balance(), BalanceSide::Credit);
        assert_eq!(AccountType::Income.normal_balance(), BalanceSide::Credit);
    }

    #[test]
    fn test_account_group_from_code() {
        let cash = Account::new("570000", "Caja", AccountType::Asset);
        assert_eq!(cash.account_group, 5);
        let sales = Account::new("700000", "Ventas", AccountType::Income);
        assert_eq!(sales.account_group, 7);
    }

    #[test]
    fn test_period_contains_inclusive_bounds() {
        let period = FiscalPeriod::new(
            2025,
            "Enero 2025",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        assert!(period.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(period.contains(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
    }

    #[test]
    fn test_partner_transaction_signs() {
        assert_eq!(PartnerTransactionType::CapitalContribution.sign(), 1);
        assert_eq!(PartnerTransactionType::LoanToCompany.sign(), 1);
        assert_eq!(PartnerTransactionType::Withdrawal.sign(), -1);
        assert_eq!(PartnerTransactionType::LoanRepayment.sign(), -1);
        assert_eq!(PartnerTransactionType::Distribution.sign(), -1);
    }
}
