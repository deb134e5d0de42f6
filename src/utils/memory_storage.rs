//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::JournalStorage;
use crate::types::*;

/// In-memory `JournalStorage` backed by shared hash maps. Handy for tests
/// and demos; every clone shares the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    periods: Arc<RwLock<HashMap<Uuid, FiscalPeriod>>>,
    entries: Arc<RwLock<HashMap<Uuid, JournalEntry>>>,
    bank_transactions: Arc<RwLock<HashMap<Uuid, BankTransaction>>>,
    rules: Arc<RwLock<HashMap<Uuid, ReconciliationRule>>>,
    partners: Arc<RwLock<HashMap<Uuid, Partner>>>,
    partner_transactions: Arc<RwLock<Vec<PartnerTransaction>>>,
    declarations: Arc<RwLock<HashMap<(Uuid, DeclarationType), FiscalDeclaration>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.accounts.write().unwrap().clear();
        self.periods.write().unwrap().clear();
        self.entries.write().unwrap().clear();
        self.bank_transactions.write().unwrap().clear();
        self.rules.write().unwrap().clear();
        self.partners.write().unwrap().clear();
        self.partner_transactions.write().unwrap().clear();
        self.declarations.write().unwrap().clear();
    }
}

#[async_trait]
impl JournalStorage for MemoryStorage {
    async fn save_account(&mut self, account: &Account) -> CoreResult<()> {
        self.accounts
            .write()
            .unwrap()
            .insert(account.code.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, code: &str) -> CoreResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(code).cloned())
    }

    async fn list_accounts(&self, account_type: Option<AccountType>) -> CoreResult<Vec<Account>> {
        let accounts = self.accounts.read().unwrap();
        let mut filtered: Vec<Account> = accounts
            .values()
            .filter(|a| account_type.is_none_or(|t| a.account_type == t))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(filtered)
    }

    async fn save_period(&mut self, period: &FiscalPeriod) -> CoreResult<()> {
        self.periods
            .write()
            .unwrap()
            .insert(period.id, period.clone());
        Ok(())
    }

    async fn get_period(&self, id: Uuid) -> CoreResult<Option<FiscalPeriod>> {
        Ok(self.periods.read().unwrap().get(&id).cloned())
    }

    async fn find_period_for_date(&self, date: NaiveDate) -> CoreResult<Option<FiscalPeriod>> {
        Ok(self
            .periods
            .read()
            .unwrap()
            .values()
            .find(|p| p.contains(date))
            .cloned())
    }

    async fn list_periods(&self, fiscal_year: i32) -> CoreResult<Vec<FiscalPeriod>> {
        let periods = self.periods.read().unwrap();
        let mut result: Vec<FiscalPeriod> = periods
            .values()
            .filter(|p| p.fiscal_year == fiscal_year)
            .cloned()
            .collect();
        result.sort_by_key(|p| p.start_date);
        Ok(result)
    }

    async fn update_period(&mut self, period: &FiscalPeriod) -> CoreResult<()> {
        let mut periods = self.periods.write().unwrap();
        if periods.contains_key(&period.id) {
            periods.insert(period.id, period.clone());
            Ok(())
        } else {
            Err(CoreError::PeriodNotFound(period.id))
        }
    }

    async fn save_entry(&mut self, entry: &JournalEntry) -> CoreResult<()> {
        self.entries
            .write()
            .unwrap()
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> CoreResult<Option<JournalEntry>> {
        Ok(self.entries.read().unwrap().get(&id).cloned())
    }

    async fn update_entry(&mut self, entry: &JournalEntry) -> CoreResult<()> {
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&entry.id) {
            entries.insert(entry.id, entry.clone());
            Ok(())
        } else {
            Err(CoreError::EntryNotFound(entry.id))
        }
    }

    async fn delete_entry(&mut self, id: Uuid) -> CoreResult<()> {
        if self.entries.write().unwrap().remove(&id).is_some() {
            Ok(())
        } else {
            Err(CoreError::EntryNotFound(id))
        }
    }

    async fn apply_reversal(
        &mut self,
        reversal: &JournalEntry,
        original: &JournalEntry,
    ) -> CoreResult<()> {
        // One lock scope: the mirror and the status flip land together
        let mut entries = self.entries.write().unwrap();
        if !entries.contains_key(&original.id) {
            return Err(CoreError::EntryNotFound(original.id));
        }
        entries.insert(reversal.id, reversal.clone());
        entries.insert(original.id, original.clone());
        Ok(())
    }

    async fn list_entries_for_period(&self, period_id: Uuid) -> CoreResult<Vec<JournalEntry>> {
        let entries = self.entries.read().unwrap();
        let mut result: Vec<JournalEntry> = entries
            .values()
            .filter(|e| e.fiscal_period_id == period_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then(a.created_at.cmp(&b.created_at)));
        Ok(result)
    }

    async fn list_posted_entries(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CoreResult<Vec<JournalEntry>> {
        let entries = self.entries.read().unwrap();
        let mut result: Vec<JournalEntry> = entries
            .values()
            .filter(|e| e.status != EntryStatus::Draft)
            .filter(|e| start_date.is_none_or(|s| e.entry_date >= s))
            .filter(|e| end_date.is_none_or(|d| e.entry_date <= d))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then(a.created_at.cmp(&b.created_at)));
        Ok(result)
    }

    async fn count_draft_entries(&self, period_id: Uuid) -> CoreResult<usize> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.fiscal_period_id == period_id && e.status == EntryStatus::Draft)
            .count())
    }

    async fn save_bank_transaction(&mut self, transaction: &BankTransaction) -> CoreResult<()> {
        self.bank_transactions
            .write()
            .unwrap()
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn list_unreconciled(&self, bank_account_id: Uuid) -> CoreResult<Vec<BankTransaction>> {
        let transactions = self.bank_transactions.read().unwrap();
        let mut result: Vec<BankTransaction> = transactions
            .values()
            .filter(|t| t.bank_account_id == bank_account_id && !t.is_reconciled)
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(result)
    }

    async fn update_bank_transaction(&mut self, transaction: &BankTransaction) -> CoreResult<()> {
        let mut transactions = self.bank_transactions.write().unwrap();
        if transactions.contains_key(&transaction.id) {
            transactions.insert(transaction.id, transaction.clone());
            Ok(())
        } else {
            Err(CoreError::Storage(format!(
                "bank transaction {} not found",
                transaction.id
            )))
        }
    }

    async fn save_rule(&mut self, rule: &ReconciliationRule) -> CoreResult<()> {
        self.rules.write().unwrap().insert(rule.id, rule.clone());
        Ok(())
    }

    async fn list_active_rules(&self) -> CoreResult<Vec<ReconciliationRule>> {
        let rules = self.rules.read().unwrap();
        let mut result: Vec<ReconciliationRule> =
            rules.values().filter(|r| r.is_active).cloned().collect();
        result.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(result)
    }

    async fn update_rule(&mut self, rule: &ReconciliationRule) -> CoreResult<()> {
        let mut rules = self.rules.write().unwrap();
        if rules.contains_key(&rule.id) {
            rules.insert(rule.id, rule.clone());
            Ok(())
        } else {
            Err(CoreError::Storage(format!("rule {} not found", rule.id)))
        }
    }

    async fn apply_reconciliation(
        &mut self,
        transaction: &BankTransaction,
        rule: &ReconciliationRule,
    ) -> CoreResult<()> {
        let mut transactions = self.bank_transactions.write().unwrap();
        let mut rules = self.rules.write().unwrap();
        if !transactions.contains_key(&transaction.id) {
            return Err(CoreError::Storage(format!(
                "bank transaction {} not found",
                transaction.id
            )));
        }
        if !rules.contains_key(&rule.id) {
            return Err(CoreError::Storage(format!("rule {} not found", rule.id)));
        }
        transactions.insert(transaction.id, transaction.clone());
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn save_partner(&mut self, partner: &Partner) -> CoreResult<()> {
        self.partners
            .write()
            .unwrap()
            .insert(partner.id, partner.clone());
        Ok(())
    }

    async fn get_partner(&self, id: Uuid) -> CoreResult<Option<Partner>> {
        Ok(self.partners.read().unwrap().get(&id).cloned())
    }

    async fn list_partners(&self) -> CoreResult<Vec<Partner>> {
        let partners = self.partners.read().unwrap();
        let mut result: Vec<Partner> = partners.values().cloned().collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(result)
    }

    async fn apply_partner_transaction(
        &mut self,
        transaction: &PartnerTransaction,
        updated_partner: &Partner,
    ) -> CoreResult<()> {
        // Both locks held together: the insert and the balance update
        // become visible as one step
        let mut partners = self.partners.write().unwrap();
        let mut transactions = self.partner_transactions.write().unwrap();

        if !partners.contains_key(&updated_partner.id) {
            return Err(CoreError::PartnerNotFound(updated_partner.id));
        }
        transactions.push(transaction.clone());
        partners.insert(updated_partner.id, updated_partner.clone());
        Ok(())
    }

    async fn list_partner_transactions(
        &self,
        partner_id: Uuid,
    ) -> CoreResult<Vec<PartnerTransaction>> {
        Ok(self
            .partner_transactions
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.partner_id == partner_id)
            .cloned()
            .collect())
    }

    async fn upsert_declaration(&mut self, declaration: &FiscalDeclaration) -> CoreResult<()> {
        self.declarations.write().unwrap().insert(
            (declaration.fiscal_period_id, declaration.declaration_type),
            declaration.clone(),
        );
        Ok(())
    }

    async fn get_declaration(
        &self,
        fiscal_period_id: Uuid,
        declaration_type: DeclarationType,
    ) -> CoreResult<Option<FiscalDeclaration>> {
        Ok(self
            .declarations
            .read()
            .unwrap()
            .get(&(fiscal_period_id, declaration_type))
            .cloned())
    }

    async fn list_declarations(
        &self,
        status: Option<DeclarationStatus>,
    ) -> CoreResult<Vec<FiscalDeclaration>> {
        let declarations = self.declarations.read().unwrap();
        let mut result: Vec<FiscalDeclaration> = declarations
            .values()
            .filter(|d| status.is_none_or(|s| d.status == s))
            .cloned()
            .collect();
        result.sort_by_key(|d| d.due_date);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn test_account_round_trip() {
        let mut storage = MemoryStorage::new();
        let account = Account::new("570000", "Caja", AccountType::Asset);
        storage.save_account(&account).await.unwrap();

        let loaded = storage.get_account("570000").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Caja");
        assert!(storage.get_account("999999").await.unwrap().is_none());

        let assets = storage
            .list_accounts(Some(AccountType::Asset))
            .await
            .unwrap();
        assert_eq!(assets.len(), 1);
        let income = storage
            .list_accounts(Some(AccountType::Income))
            .await
            .unwrap();
        assert!(income.is_empty());
    }

    #[tokio::test]
    async fn test_find_period_for_date() {
        let mut storage = MemoryStorage::new();
        let period = FiscalPeriod::new(
            2025,
            "Enero 2025",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        storage.save_period(&period).await.unwrap();

        let found = storage
            .find_period_for_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id), Some(period.id));

        let missing = storage
            .find_period_for_date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    fn bare_entry(period_id: Uuid, status: EntryStatus) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            entry_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            description: "Asiento".to_string(),
            fiscal_period_id: period_id,
            status,
            reference_type: None,
            reference_id: None,
            source_document: None,
            total_debit: BigDecimal::from(0),
            total_credit: BigDecimal::from(0),
            is_reversing: false,
            reversed_entry_id: None,
            lines: Vec::new(),
            created_at: chrono::Utc::now().naive_utc(),
            posted_at: None,
        }
    }

    #[tokio::test]
    async fn test_apply_reversal_commits_both_entries() {
        let mut storage = MemoryStorage::new();
        let period_id = Uuid::new_v4();
        let original = bare_entry(period_id, EntryStatus::Posted);
        storage.save_entry(&original).await.unwrap();

        let mut flipped = original.clone();
        flipped.status = EntryStatus::Reversed;
        let mut mirror = bare_entry(period_id, EntryStatus::Posted);
        mirror.is_reversing = true;
        mirror.reversed_entry_id = Some(original.id);

        storage.apply_reversal(&mirror, &flipped).await.unwrap();

        let stored_original = storage.get_entry(original.id).await.unwrap().unwrap();
        assert_eq!(stored_original.status, EntryStatus::Reversed);
        let stored_mirror = storage.get_entry(mirror.id).await.unwrap().unwrap();
        assert_eq!(stored_mirror.reversed_entry_id, Some(original.id));
    }

    #[tokio::test]
    async fn test_apply_reversal_requires_original() {
        let mut storage = MemoryStorage::new();
        let period_id = Uuid::new_v4();
        let ghost = bare_entry(period_id, EntryStatus::Reversed);
        let mirror = bare_entry(period_id, EntryStatus::Posted);

        let result = storage.apply_reversal(&mirror, &ghost).await;
        assert!(matches!(result, Err(CoreError::EntryNotFound(_))));
        // The failed call must not leave the mirror behind
        assert!(storage.get_entry(mirror.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_reconciliation_commits_stamp_and_counter() {
        let mut storage = MemoryStorage::new();
        let bank = Uuid::new_v4();
        let transaction = BankTransaction::new(
            bank,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "NOMINA ENERO",
            BigDecimal::from(-2000),
        );
        let rule =
            ReconciliationRule::new(1, "description", MatchType::Exact, "NOMINA ENERO", "Personal");
        storage.save_bank_transaction(&transaction).await.unwrap();
        storage.save_rule(&rule).await.unwrap();

        let mut stamped = transaction.clone();
        stamped.is_reconciled = true;
        stamped.category = Some(rule.target_category.clone());
        stamped.reconciled_at = Some(chrono::Utc::now().naive_utc());
        let mut bumped = rule.clone();
        bumped.matches_count += 1;

        storage.apply_reconciliation(&stamped, &bumped).await.unwrap();

        assert!(storage.list_unreconciled(bank).await.unwrap().is_empty());
        let rules = storage.list_active_rules().await.unwrap();
        assert_eq!(rules[0].matches_count, 1);
    }

    #[tokio::test]
    async fn test_apply_partner_transaction_requires_partner() {
        let mut storage = MemoryStorage::new();
        let ghost = Partner::new("Fantasma");
        let transaction = PartnerTransaction {
            id: Uuid::new_v4(),
            partner_id: ghost.id,
            transaction_type: PartnerTransactionType::CapitalContribution,
            amount: BigDecimal::from(100),
            transaction_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            description: None,
            status: PartnerTransactionStatus::Pending,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let result = storage.apply_partner_transaction(&transaction, &ghost).await;
        assert!(matches!(result, Err(CoreError::PartnerNotFound(_))));
        assert!(storage
            .list_partner_transactions(ghost.id)
            .await
            .unwrap()
            .is_empty());
    }
}
