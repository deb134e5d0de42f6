//! Partner current-account ledger
//!
//! Records shareholder capital/loan movements and keeps each partner's
//! running balance consistent with its transaction log: the insert and the
//! balance update always commit together.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::traits::JournalStorage;
use crate::types::*;
use crate::utils::validation::validate_non_negative;

/// Manager for partner current accounts
pub struct PartnerLedger<S: JournalStorage> {
    storage: S,
}

impl<S: JournalStorage> PartnerLedger<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Register a partner
    pub async fn add_partner(&mut self, name: impl Into<String>) -> CoreResult<Partner> {
        let partner = Partner::new(name);
        self.storage.save_partner(&partner).await?;
        Ok(partner)
    }

    /// Get a partner by id
    pub async fn get_partner(&self, partner_id: Uuid) -> CoreResult<Option<Partner>> {
        self.storage.get_partner(partner_id).await
    }

    /// List all partners
    pub async fn list_partners(&self) -> CoreResult<Vec<Partner>> {
        self.storage.list_partners().await
    }

    /// Record a partner movement as `pending` and update the partner's
    /// current-account balance by `amount * sign(type)`. Promotion to a
    /// posted journal entry is an external responsibility.
    pub async fn record_transaction(
        &mut self,
        partner_id: Uuid,
        transaction_type: PartnerTransactionType,
        amount: BigDecimal,
        transaction_date: NaiveDate,
        description: Option<String>,
    ) -> CoreResult<PartnerTransaction> {
        validate_non_negative(&amount, "Partner transaction amount")?;
        if amount == BigDecimal::from(0) {
            return Err(CoreError::Validation(
                "Partner transaction amount must be positive".to_string(),
            ));
        }

        let mut partner = self
            .storage
            .get_partner(partner_id)
            .await?
            .ok_or(CoreError::PartnerNotFound(partner_id))?;

        let delta = match transaction_type.sign() {
            1 => amount.clone(),
            _ => -amount.clone(),
        };
        partner.current_account_balance += &delta;

        let transaction = PartnerTransaction {
            id: Uuid::new_v4(),
            partner_id,
            transaction_type,
            amount,
            transaction_date,
            description,
            status: PartnerTransactionStatus::Pending,
            created_at: chrono::Utc::now().naive_utc(),
        };

        // Single atomic write: insert + balance update commit together
        self.storage
            .apply_partner_transaction(&transaction, &partner)
            .await?;
        debug!(
            partner_id = %partner_id,
            ?transaction_type,
            balance = %partner.current_account_balance,
            "partner transaction recorded"
        );

        Ok(transaction)
    }

    /// A partner's movement history, oldest first
    pub async fn transactions(&self, partner_id: Uuid) -> CoreResult<Vec<PartnerTransaction>> {
        self.storage.list_partner_transactions(partner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn test_balance_follows_transaction_signs() {
        let storage = MemoryStorage::new();
        let mut ledger = PartnerLedger::new(storage);
        let partner = ledger.add_partner("Ana Garcia").await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        ledger
            .record_transaction(
                partner.id,
                PartnerTransactionType::CapitalContribution,
                BigDecimal::from(5000),
                date,
                None,
            )
            .await
            .unwrap();
        ledger
            .record_transaction(
                partner.id,
                PartnerTransactionType::LoanToCompany,
                BigDecimal::from(2000),
                date,
                None,
            )
            .await
            .unwrap();
        ledger
            .record_transaction(
                partner.id,
                PartnerTransactionType::Withdrawal,
                BigDecimal::from(1500),
                date,
                Some("Retirada parcial".to_string()),
            )
            .await
            .unwrap();

        let updated = ledger.get_partner(partner.id).await.unwrap().unwrap();
        assert_eq!(updated.current_account_balance, BigDecimal::from(5500));

        let history = ledger.transactions(partner.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history
            .iter()
            .all(|t| t.status == PartnerTransactionStatus::Pending));
    }

    #[tokio::test]
    async fn test_unknown_partner_rejected_without_writes() {
        let storage = MemoryStorage::new();
        let mut ledger = PartnerLedger::new(storage);

        let result = ledger
            .record_transaction(
                Uuid::new_v4(),
                PartnerTransactionType::CapitalContribution,
                BigDecimal::from(100),
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                None,
            )
            .await;

        assert!(matches!(result, Err(CoreError::PartnerNotFound(_))));
    }

    #[tokio::test]
    async fn test_zero_or_negative_amount_rejected() {
        let storage = MemoryStorage::new();
        let mut ledger = PartnerLedger::new(storage);
        let partner = ledger.add_partner("Luis").await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        for amount in [BigDecimal::from(0), BigDecimal::from(-5)] {
            let result = ledger
                .record_transaction(
                    partner.id,
                    PartnerTransactionType::Withdrawal,
                    amount,
                    date,
                    None,
                )
                .await;
            assert!(result.is_err());
        }

        let unchanged = ledger.get_partner(partner.id).await.unwrap().unwrap();
        assert_eq!(unchanged.current_account_balance, BigDecimal::from(0));
    }
}
