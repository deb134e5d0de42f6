//! Journal entry lifecycle: create, post, reverse

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::traits::JournalStorage;
use crate::types::*;
use crate::utils::validation::{
    validate_account_code, validate_description, validate_line_amounts, within_tolerance,
};

/// Prefix applied to reversal entry descriptions
pub const REVERSAL_MARKER: &str = "ANULACION";

/// One line of a new journal entry, as supplied by the caller.
/// Line numbers are assigned from the position in the input vector.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub account_code: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub description: Option<String>,
    pub tax_code: Option<String>,
}

impl LineInput {
    /// A debit line against an account
    pub fn debit(account_code: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit_amount: amount,
            credit_amount: BigDecimal::from(0),
            description: None,
            tax_code: None,
        }
    }

    /// A credit line against an account
    pub fn credit(account_code: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit_amount: BigDecimal::from(0),
            credit_amount: amount,
            description: None,
            tax_code: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tax_code(mut self, tax_code: impl Into<String>) -> Self {
        self.tax_code = Some(tax_code.into());
        self
    }
}

/// Parameters for creating a journal entry
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub entry_date: NaiveDate,
    pub description: String,
    pub lines: Vec<LineInput>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub source_document: Option<String>,
}

impl NewEntry {
    pub fn new(entry_date: NaiveDate, description: impl Into<String>, lines: Vec<LineInput>) -> Self {
        Self {
            entry_date,
            description: description.into(),
            lines,
            reference_type: None,
            reference_id: None,
            source_document: None,
        }
    }

    pub fn with_reference(mut self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        self.reference_type = Some(kind.into());
        self.reference_id = Some(id.into());
        self
    }
}

/// Journal entry store handling the draft/posted/reversed lifecycle
pub struct JournalEntryStore<S: JournalStorage> {
    storage: S,
}

impl<S: JournalStorage> JournalEntryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a draft journal entry.
    ///
    /// All validation happens before any write: debit/credit totals must
    /// balance within tolerance, the entry date must resolve to exactly one
    /// fiscal period that is not locked, and every line must reference an
    /// active detail account. A rejected entry leaves no rows behind.
    pub async fn create(&mut self, input: NewEntry) -> CoreResult<JournalEntry> {
        validate_description(&input.description)?;

        if input.lines.len() < 2 {
            return Err(CoreError::Validation(
                "Entry must have at least two lines for double-entry bookkeeping".to_string(),
            ));
        }

        for line in &input.lines {
            validate_account_code(&line.account_code)?;
            validate_line_amounts(&line.debit_amount, &line.credit_amount)?;
        }

        let total_debit: BigDecimal = input.lines.iter().map(|l| &l.debit_amount).sum();
        let total_credit: BigDecimal = input.lines.iter().map(|l| &l.credit_amount).sum();

        if !within_tolerance(&total_debit, &total_credit) {
            return Err(CoreError::ImbalancedEntry {
                debits: total_debit,
                credits: total_credit,
            });
        }

        let period = self.resolve_open_period(input.entry_date).await?;

        for line in &input.lines {
            let account = self
                .storage
                .get_account(&line.account_code)
                .await?
                .ok_or_else(|| CoreError::UnknownAccount(line.account_code.clone()))?;
            if !account.is_detail {
                return Err(CoreError::NotPostable(account.code));
            }
            if !account.is_active {
                return Err(CoreError::Validation(format!(
                    "Account '{}' is inactive",
                    account.code
                )));
            }
        }

        let lines = input
            .lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| JournalEntryLine {
                id: Uuid::new_v4(),
                line_number: idx as u32 + 1,
                account_code: line.account_code,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                description: line.description,
                tax_code: line.tax_code,
            })
            .collect();

        let entry = JournalEntry {
            id: Uuid::new_v4(),
            entry_date: input.entry_date,
            description: input.description,
            fiscal_period_id: period.id,
            status: EntryStatus::Draft,
            reference_type: input.reference_type,
            reference_id: input.reference_id,
            source_document: input.source_document,
            total_debit,
            total_credit,
            is_reversing: false,
            reversed_entry_id: None,
            lines,
            created_at: chrono::Utc::now().naive_utc(),
            posted_at: None,
        };

        self.storage.save_entry(&entry).await?;
        debug!(entry_id = %entry.id, period = %period.name, "journal entry created as draft");

        Ok(entry)
    }

    /// Post a draft entry, making its lines visible to the ledger.
    ///
    /// The covering period is re-checked at post time: a draft created
    /// before its period was locked can no longer be posted.
    pub async fn post(&mut self, entry_id: Uuid) -> CoreResult<JournalEntry> {
        let mut entry = self.get_required(entry_id).await?;

        if entry.status != EntryStatus::Draft {
            return Err(CoreError::NotDraft(entry_id));
        }

        let period = self
            .storage
            .get_period(entry.fiscal_period_id)
            .await?
            .ok_or(CoreError::PeriodNotFound(entry.fiscal_period_id))?;
        if period.status == PeriodStatus::Locked {
            return Err(CoreError::PeriodLocked(period.name));
        }

        entry.status = EntryStatus::Posted;
        entry.posted_at = Some(chrono::Utc::now().naive_utc());
        self.storage.update_entry(&entry).await?;
        info!(entry_id = %entry.id, "journal entry posted");

        Ok(entry)
    }

    /// Reverse a posted entry with an exact mirror entry.
    ///
    /// The mirror swaps each line's debit and credit amounts, preserving
    /// account and line order, and is posted immediately; the original
    /// transitions to `Reversed`. Both effects go through one atomic
    /// storage call, and every failure path fires before that write.
    pub async fn reverse(
        &mut self,
        entry_id: Uuid,
        reversal_date: NaiveDate,
        reason: Option<String>,
    ) -> CoreResult<JournalEntry> {
        let mut original = self.get_required(entry_id).await?;

        if original.status != EntryStatus::Posted {
            return Err(CoreError::NotPosted(entry_id));
        }

        let period = self.resolve_open_period(reversal_date).await?;

        let mirror_lines: Vec<JournalEntryLine> = original
            .lines
            .iter()
            .map(|line| JournalEntryLine {
                id: Uuid::new_v4(),
                line_number: line.line_number,
                account_code: line.account_code.clone(),
                debit_amount: line.credit_amount.clone(),
                credit_amount: line.debit_amount.clone(),
                description: line.description.clone(),
                tax_code: line.tax_code.clone(),
            })
            .collect();

        let description = match reason {
            Some(reason) => format!("{REVERSAL_MARKER}: {} ({reason})", original.description),
            None => format!("{REVERSAL_MARKER}: {}", original.description),
        };

        let now = chrono::Utc::now().naive_utc();
        let reversal = JournalEntry {
            id: Uuid::new_v4(),
            entry_date: reversal_date,
            description,
            fiscal_period_id: period.id,
            status: EntryStatus::Posted,
            reference_type: original.reference_type.clone(),
            reference_id: original.reference_id.clone(),
            source_document: None,
            total_debit: original.total_credit.clone(),
            total_credit: original.total_debit.clone(),
            is_reversing: true,
            reversed_entry_id: Some(original.id),
            lines: mirror_lines,
            created_at: now,
            posted_at: Some(now),
        };

        original.status = EntryStatus::Reversed;
        // Single atomic write: mirror insert + status flip commit together
        self.storage.apply_reversal(&reversal, &original).await?;
        info!(
            entry_id = %original.id,
            reversal_id = %reversal.id,
            "journal entry reversed"
        );

        Ok(reversal)
    }

    /// Delete a draft entry together with its lines. Posted entries are
    /// immutable history and cannot be deleted.
    pub async fn delete_draft(&mut self, entry_id: Uuid) -> CoreResult<()> {
        let entry = self.get_required(entry_id).await?;

        if entry.status != EntryStatus::Draft {
            return Err(CoreError::NotDraft(entry_id));
        }

        self.storage.delete_entry(entry_id).await
    }

    /// Get an entry by id
    pub async fn get(&self, entry_id: Uuid) -> CoreResult<Option<JournalEntry>> {
        self.storage.get_entry(entry_id).await
    }

    async fn get_required(&self, entry_id: Uuid) -> CoreResult<JournalEntry> {
        self.storage
            .get_entry(entry_id)
            .await?
            .ok_or(CoreError::EntryNotFound(entry_id))
    }

    /// Resolve a date to its covering period, rejecting locked periods.
    /// Closed periods still accept new drafts; only the year-lock freezes
    /// a period for good.
    async fn resolve_open_period(&self, date: NaiveDate) -> CoreResult<FiscalPeriod> {
        let period = self
            .storage
            .find_period_for_date(date)
            .await?
            .ok_or(CoreError::NoFiscalPeriod(date))?;

        if period.status == PeriodStatus::Locked {
            return Err(CoreError::PeriodLocked(period.name));
        }

        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::NaiveDate;

    async fn setup() -> (MemoryStorage, FiscalPeriod) {
        let mut storage = MemoryStorage::new();
        storage
            .save_account(&Account::new("570000", "Caja", AccountType::Asset))
            .await
            .unwrap();
        storage
            .save_account(&Account::new("700000", "Ventas", AccountType::Income))
            .await
            .unwrap();

        let period = FiscalPeriod::new(
            2025,
            "Enero 2025",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        storage.save_period(&period).await.unwrap();
        (storage, period)
    }

    #[tokio::test]
    async fn test_create_balanced_entry() {
        let (storage, period) = setup().await;
        let mut store = JournalEntryStore::new(storage);

        let entry = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Venta al contado",
                vec![
                    LineInput::debit("570000", BigDecimal::from(100)),
                    LineInput::credit("700000", BigDecimal::from(100)),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(entry.status, EntryStatus::Draft);
        assert_eq!(entry.fiscal_period_id, period.id);
        assert_eq!(entry.total_debit, BigDecimal::from(100));
        assert_eq!(entry.total_credit, BigDecimal::from(100));
        assert_eq!(entry.lines[0].line_number, 1);
        assert_eq!(entry.lines[1].line_number, 2);
    }

    #[tokio::test]
    async fn test_imbalanced_entry_rejected() {
        let (storage, _) = setup().await;
        let mut store = JournalEntryStore::new(storage);

        let result = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Descuadre",
                vec![
                    LineInput::debit("570000", BigDecimal::from(50)),
                    LineInput::credit("700000", BigDecimal::from(40)),
                ],
            ))
            .await;

        assert!(matches!(result, Err(CoreError::ImbalancedEntry { .. })));
    }

    #[tokio::test]
    async fn test_no_fiscal_period() {
        let (storage, _) = setup().await;
        let mut store = JournalEntryStore::new(storage);

        let result = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                "Fuera de periodo",
                vec![
                    LineInput::debit("570000", BigDecimal::from(10)),
                    LineInput::credit("700000", BigDecimal::from(10)),
                ],
            ))
            .await;

        assert!(matches!(result, Err(CoreError::NoFiscalPeriod(_))));
    }

    #[tokio::test]
    async fn test_unknown_and_summary_accounts_rejected() {
        let (mut storage, _) = setup().await;
        storage
            .save_account(&Account::new("700", "Ventas (resumen)", AccountType::Income).summary())
            .await
            .unwrap();
        let mut store = JournalEntryStore::new(storage);

        let unknown = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                "Cuenta desconocida",
                vec![
                    LineInput::debit("999999", BigDecimal::from(10)),
                    LineInput::credit("700000", BigDecimal::from(10)),
                ],
            ))
            .await;
        assert!(matches!(unknown, Err(CoreError::UnknownAccount(_))));

        let summary = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                "Cuenta resumen",
                vec![
                    LineInput::debit("570000", BigDecimal::from(10)),
                    LineInput::credit("700", BigDecimal::from(10)),
                ],
            ))
            .await;
        assert!(matches!(summary, Err(CoreError::NotPostable(_))));
    }

    #[tokio::test]
    async fn test_malformed_account_code_rejected() {
        let (storage, _) = setup().await;
        let mut store = JournalEntryStore::new(storage);

        let result = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Codigo invalido",
                vec![
                    LineInput::debit("cash-01", BigDecimal::from(10)),
                    LineInput::credit("700000", BigDecimal::from(10)),
                ],
            ))
            .await;

        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_post_and_reverse_mirror() {
        let (storage, _) = setup().await;
        let mut store = JournalEntryStore::new(storage);

        let entry = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Venta",
                vec![
                    LineInput::debit("570000", BigDecimal::from(100)),
                    LineInput::credit("700000", BigDecimal::from(100)),
                ],
            ))
            .await
            .unwrap();

        let posted = store.post(entry.id).await.unwrap();
        assert_eq!(posted.status, EntryStatus::Posted);
        assert!(posted.posted_at.is_some());

        // Posting twice is rejected
        assert!(matches!(
            store.post(entry.id).await,
            Err(CoreError::NotDraft(_))
        ));

        let reversal = store
            .reverse(entry.id, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(), None)
            .await
            .unwrap();

        assert!(reversal.is_reversing);
        assert_eq!(reversal.reversed_entry_id, Some(entry.id));
        assert_eq!(reversal.status, EntryStatus::Posted);
        assert_eq!(reversal.total_debit, entry.total_credit);
        assert_eq!(reversal.total_credit, entry.total_debit);
        assert_eq!(reversal.lines[0].credit_amount, BigDecimal::from(100));
        assert!(reversal.description.starts_with(REVERSAL_MARKER));

        let original = store.get(entry.id).await.unwrap().unwrap();
        assert_eq!(original.status, EntryStatus::Reversed);

        // A reversed entry cannot be reversed again
        assert!(matches!(
            store
                .reverse(entry.id, NaiveDate::from_ymd_opt(2025, 1, 21).unwrap(), None)
                .await,
            Err(CoreError::NotPosted(_))
        ));
    }

    #[tokio::test]
    async fn test_locked_period_blocks_creation() {
        let (mut storage, mut period) = setup().await;
        period.status = PeriodStatus::Locked;
        storage.update_period(&period).await.unwrap();
        let mut store = JournalEntryStore::new(storage);

        let result = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Periodo bloqueado",
                vec![
                    LineInput::debit("570000", BigDecimal::from(10)),
                    LineInput::credit("700000", BigDecimal::from(10)),
                ],
            ))
            .await;

        assert!(matches!(result, Err(CoreError::PeriodLocked(_))));
    }

    #[tokio::test]
    async fn test_delete_draft_only() {
        let (storage, _) = setup().await;
        let mut store = JournalEntryStore::new(storage);

        let entry = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Borrador",
                vec![
                    LineInput::debit("570000", BigDecimal::from(10)),
                    LineInput::credit("700000", BigDecimal::from(10)),
                ],
            ))
            .await
            .unwrap();

        store.delete_draft(entry.id).await.unwrap();
        assert!(store.get(entry.id).await.unwrap().is_none());
    }
}
