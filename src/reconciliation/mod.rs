//! Bank reconciliation rule engine
//!
//! Matches unreconciled bank transactions against an ordered, prioritized
//! rule list and auto-categorizes them. First match wins; transactions no
//! rule matches are returned untouched for manual handling.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::traits::JournalStorage;
use crate::types::*;

/// Result of one auto-reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// Transactions matched and marked reconciled, with their category set
    pub reconciled: Vec<BankTransaction>,
    /// Transactions no rule matched; not an error, just manual work
    pub unmatched: Vec<BankTransaction>,
}

/// Rule-based auto-categorizer for bank transactions
pub struct ReconciliationEngine<S: JournalStorage> {
    storage: S,
}

impl<S: JournalStorage> ReconciliationEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Run every active rule against every unreconciled transaction of a
    /// bank account. Rules are evaluated in ascending priority order
    /// (creation order breaks ties); the first matching rule categorizes
    /// the transaction and bumps its own match counter. Running again with
    /// no new transactions is a no-op.
    pub async fn auto_reconcile(
        &mut self,
        bank_account_id: Uuid,
    ) -> CoreResult<ReconciliationOutcome> {
        let transactions = self.storage.list_unreconciled(bank_account_id).await?;
        let mut rules = self.storage.list_active_rules().await?;
        rules.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
        });

        let mut reconciled = Vec::new();
        let mut unmatched = Vec::new();

        for mut transaction in transactions {
            let hit = rules
                .iter_mut()
                .find(|rule| rule_matches(rule, &transaction));

            match hit {
                Some(rule) => {
                    transaction.is_reconciled = true;
                    transaction.category = Some(rule.target_category.clone());
                    transaction.reconciled_at = Some(chrono::Utc::now().naive_utc());
                    rule.matches_count += 1;

                    // Single atomic write: stamp + counter bump commit together
                    self.storage.apply_reconciliation(&transaction, rule).await?;
                    debug!(
                        transaction_id = %transaction.id,
                        rule_id = %rule.id,
                        category = %rule.target_category,
                        "bank transaction reconciled"
                    );
                    reconciled.push(transaction);
                }
                None => unmatched.push(transaction),
            }
        }

        Ok(ReconciliationOutcome {
            reconciled,
            unmatched,
        })
    }
}

/// Test one rule against one transaction. Comparisons are case-insensitive;
/// an invalid regex is logged and treated as a non-match, never an error.
fn rule_matches(rule: &ReconciliationRule, transaction: &BankTransaction) -> bool {
    let Some(value) = field_value(rule.match_field.as_str(), transaction) else {
        return false;
    };

    match rule.match_type {
        MatchType::Exact => value.eq_ignore_ascii_case(&rule.match_value),
        MatchType::Contains => value
            .to_lowercase()
            .contains(&rule.match_value.to_lowercase()),
        MatchType::Regex => match RegexBuilder::new(&rule.match_value)
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re.is_match(&value),
            Err(err) => {
                warn!(rule_id = %rule.id, %err, "rule evaluation skipped: invalid regex");
                false
            }
        },
    }
}

/// Resolve the transaction field a rule matches against. Unknown fields
/// never match.
fn field_value(field: &str, transaction: &BankTransaction) -> Option<String> {
    match field {
        "description" => Some(transaction.description.clone()),
        "amount" => Some(transaction.amount.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn tx(bank_account_id: Uuid, description: &str, amount: i64) -> BankTransaction {
        BankTransaction::new(
            bank_account_id,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            description,
            BigDecimal::from(amount),
        )
    }

    #[tokio::test]
    async fn test_first_match_by_priority_wins() {
        let mut storage = MemoryStorage::new();
        let bank = Uuid::new_v4();

        let broad = ReconciliationRule::new(10, "description", MatchType::Contains, "AMAZON", "Compras online");
        let narrow = ReconciliationRule::new(1, "description", MatchType::Contains, "AMAZON WEB", "Infraestructura");
        storage.save_rule(&broad).await.unwrap();
        storage.save_rule(&narrow).await.unwrap();
        storage
            .save_bank_transaction(&tx(bank, "AMAZON WEB SERVICES EMEA", -120))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let outcome = engine.auto_reconcile(bank).await.unwrap();

        assert_eq!(outcome.reconciled.len(), 1);
        assert_eq!(
            outcome.reconciled[0].category.as_deref(),
            Some("Infraestructura")
        );

        let rules = storage.list_active_rules().await.unwrap();
        let narrow_after = rules.iter().find(|r| r.id == narrow.id).unwrap();
        let broad_after = rules.iter().find(|r| r.id == broad.id).unwrap();
        assert_eq!(narrow_after.matches_count, 1);
        assert_eq!(broad_after.matches_count, 0);
    }

    #[tokio::test]
    async fn test_contains_is_case_insensitive_substring() {
        let mut storage = MemoryStorage::new();
        let bank = Uuid::new_v4();

        // "AWS" is not a substring of the description; "AMAZON" is
        let miss = ReconciliationRule::new(1, "description", MatchType::Contains, "AWS", "Nube");
        let hit = ReconciliationRule::new(2, "description", MatchType::Contains, "amazon", "Compras");
        storage.save_rule(&miss).await.unwrap();
        storage.save_rule(&hit).await.unwrap();
        storage
            .save_bank_transaction(&tx(bank, "AMAZON WEB SERVICES", -50))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let outcome = engine.auto_reconcile(bank).await.unwrap();

        assert_eq!(outcome.reconciled[0].category.as_deref(), Some("Compras"));
        let rules = storage.list_active_rules().await.unwrap();
        assert_eq!(
            rules.iter().find(|r| r.id == miss.id).unwrap().matches_count,
            0
        );
        assert_eq!(
            rules.iter().find(|r| r.id == hit.id).unwrap().matches_count,
            1
        );
    }

    #[tokio::test]
    async fn test_invalid_regex_is_skipped_not_fatal() {
        let mut storage = MemoryStorage::new();
        let bank = Uuid::new_v4();

        let broken = ReconciliationRule::new(1, "description", MatchType::Regex, "(unclosed", "X");
        let fallback = ReconciliationRule::new(2, "description", MatchType::Regex, "iberdrola|endesa", "Suministros");
        storage.save_rule(&broken).await.unwrap();
        storage.save_rule(&fallback).await.unwrap();
        storage
            .save_bank_transaction(&tx(bank, "Recibo ENDESA energia", -80))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage);
        let outcome = engine.auto_reconcile(bank).await.unwrap();

        assert_eq!(outcome.reconciled.len(), 1);
        assert_eq!(
            outcome.reconciled[0].category.as_deref(),
            Some("Suministros")
        );
    }

    #[tokio::test]
    async fn test_unmatched_left_untouched_and_idempotent() {
        let mut storage = MemoryStorage::new();
        let bank = Uuid::new_v4();

        let rule = ReconciliationRule::new(1, "description", MatchType::Exact, "NOMINA", "Personal");
        storage.save_rule(&rule).await.unwrap();
        storage
            .save_bank_transaction(&tx(bank, "nomina", -2000))
            .await
            .unwrap();
        storage
            .save_bank_transaction(&tx(bank, "Cargo desconocido", -15))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let first = engine.auto_reconcile(bank).await.unwrap();
        assert_eq!(first.reconciled.len(), 1);
        assert_eq!(first.unmatched.len(), 1);
        assert!(!first.unmatched[0].is_reconciled);

        // Second run sees no new work; counters stay put
        let second = engine.auto_reconcile(bank).await.unwrap();
        assert!(second.reconciled.is_empty());
        assert_eq!(second.unmatched.len(), 1);
        let rules = storage.list_active_rules().await.unwrap();
        assert_eq!(rules[0].matches_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_field_never_matches() {
        let mut storage = MemoryStorage::new();
        let bank = Uuid::new_v4();

        let rule = ReconciliationRule::new(1, "counterparty", MatchType::Contains, "X", "Y");
        storage.save_rule(&rule).await.unwrap();
        storage
            .save_bank_transaction(&tx(bank, "X something", -1))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage);
        let outcome = engine.auto_reconcile(bank).await.unwrap();
        assert!(outcome.reconciled.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
    }
}
