//! Fiscal declaration calculator
//!
//! Each declaration type carries its own calculation strategy; the manager
//! resolves the strategy, feeds it the period's posted entries, and upserts
//! the result keyed by (fiscal period, type).

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::traits::JournalStorage;
use crate::types::*;

/// PGC subgroup for VAT charged on sales (IVA repercutido)
pub const OUTPUT_VAT_PREFIX: &str = "477";
/// PGC subgroup for deductible VAT on purchases (IVA soportado)
pub const INPUT_VAT_PREFIX: &str = "472";

/// Figures produced by a calculation strategy
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationFigures {
    pub data: serde_json::Value,
    pub total_amount: BigDecimal,
}

/// Pluggable per-type calculation strategy. Strategies are pure: they see
/// the period's posted entries and return figures, never touching storage.
pub trait DeclarationCalculator: Send + Sync {
    fn declaration_type(&self) -> DeclarationType;
    fn calculate(&self, entries: &[JournalEntry]) -> CoreResult<DeclarationFigures>;
}

/// Computed VAT figures for a modelo 303 return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatFigures {
    /// Credit movements on output VAT accounts (477x)
    pub output_vat: BigDecimal,
    /// Debit movements on input VAT accounts (472x)
    pub input_vat: BigDecimal,
    /// output - input
    pub result: BigDecimal,
    /// Payable when the result is positive
    pub a_ingresar: BigDecimal,
    /// Carry-forward credit when the result is negative
    pub a_compensar: BigDecimal,
}

/// Spanish periodic VAT return (modelo 303)
pub struct Modelo303Calculator;

impl DeclarationCalculator for Modelo303Calculator {
    fn declaration_type(&self) -> DeclarationType {
        DeclarationType::Modelo303
    }

    fn calculate(&self, entries: &[JournalEntry]) -> CoreResult<DeclarationFigures> {
        let zero = BigDecimal::from(0);
        let mut output_vat = zero.clone();
        let mut input_vat = zero.clone();

        for entry in entries {
            for line in &entry.lines {
                if line.account_code.starts_with(OUTPUT_VAT_PREFIX) {
                    output_vat += &line.credit_amount;
                } else if line.account_code.starts_with(INPUT_VAT_PREFIX) {
                    input_vat += &line.debit_amount;
                }
            }
        }

        let result = &output_vat - &input_vat;
        let a_ingresar = if result > zero {
            result.clone()
        } else {
            zero.clone()
        };
        let a_compensar = if result < zero {
            result.abs()
        } else {
            zero.clone()
        };

        let figures = VatFigures {
            output_vat,
            input_vat,
            result: result.clone(),
            a_ingresar,
            a_compensar,
        };
        let data = serde_json::to_value(&figures)
            .map_err(|e| CoreError::Validation(format!("cannot encode figures: {e}")))?;

        Ok(DeclarationFigures {
            data,
            total_amount: result,
        })
    }
}

/// Declaration manager: resolves strategies and manages due dates
pub struct DeclarationManager<S: JournalStorage> {
    storage: S,
    calculators: Vec<Box<dyn DeclarationCalculator>>,
}

impl<S: JournalStorage> DeclarationManager<S> {
    /// Manager with the built-in strategies registered
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            calculators: vec![Box::new(Modelo303Calculator)],
        }
    }

    /// Register an additional calculation strategy
    pub fn register(&mut self, calculator: Box<dyn DeclarationCalculator>) {
        self.calculators.push(calculator);
    }

    /// Compute (or recompute) the declaration for a period. Regenerating
    /// overwrites the prior calculation; the (period, type) key stays
    /// unique. Zero data produces an all-zero declaration, not an error.
    pub async fn generate(
        &mut self,
        declaration_type: DeclarationType,
        period_id: Uuid,
    ) -> CoreResult<FiscalDeclaration> {
        let period = self
            .storage
            .get_period(period_id)
            .await?
            .ok_or(CoreError::PeriodNotFound(period_id))?;

        let calculator = self
            .calculators
            .iter()
            .find(|c| c.declaration_type() == declaration_type)
            .ok_or(CoreError::DeclarationTypeUnknown(declaration_type))?;

        let entries: Vec<JournalEntry> = self
            .storage
            .list_entries_for_period(period_id)
            .await?
            .into_iter()
            .filter(|e| e.status != EntryStatus::Draft)
            .collect();

        let figures = calculator.calculate(&entries)?;
        let due_date = due_date_after(period.end_date)?;

        // Keep the existing id on regeneration so callers holding it stay valid
        let id = self
            .storage
            .get_declaration(period_id, declaration_type)
            .await?
            .map(|d| d.id)
            .unwrap_or_else(Uuid::new_v4);

        let declaration = FiscalDeclaration {
            id,
            declaration_type,
            fiscal_period_id: period_id,
            declaration_period: period.name.clone(),
            due_date,
            status: DeclarationStatus::Calculated,
            calculated_data: figures.data,
            total_amount: figures.total_amount,
            calculated_at: chrono::Utc::now().naive_utc(),
        };

        self.storage.upsert_declaration(&declaration).await?;
        info!(
            ?declaration_type,
            period = %period.name,
            total = %declaration.total_amount,
            "fiscal declaration calculated"
        );

        Ok(declaration)
    }

    /// Get the declaration for a period and type, if generated
    pub async fn get(
        &self,
        period_id: Uuid,
        declaration_type: DeclarationType,
    ) -> CoreResult<Option<FiscalDeclaration>> {
        self.storage.get_declaration(period_id, declaration_type).await
    }
}

/// Filing deadline: the 20th of the month following the period's end
fn due_date_after(period_end: NaiveDate) -> CoreResult<NaiveDate> {
    let (year, month) = if period_end.month() == 12 {
        (period_end.year() + 1, 1)
    } else {
        (period_end.year(), period_end.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 20)
        .ok_or_else(|| CoreError::Validation(format!("cannot derive due date after {period_end}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::entry::{JournalEntryStore, LineInput, NewEntry};
    use crate::journal::period::FiscalPeriodManager;
    use crate::utils::memory_storage::MemoryStorage;

    async fn seeded() -> (MemoryStorage, Vec<FiscalPeriod>) {
        let mut storage = MemoryStorage::new();
        for (code, name, kind) in [
            ("430000", "Clientes", AccountType::Asset),
            ("570000", "Caja", AccountType::Asset),
            ("477000", "IVA repercutido", AccountType::Liability),
            ("472000", "IVA soportado", AccountType::Asset),
            ("700000", "Ventas", AccountType::Income),
            ("600000", "Compras", AccountType::Expense),
        ] {
            storage
                .save_account(&Account::new(code, name, kind))
                .await
                .unwrap();
        }
        let mut manager = FiscalPeriodManager::new(storage.clone());
        let periods = manager.create_year(2025).await.unwrap();
        (storage, periods)
    }

    #[test]
    fn test_due_date_is_20th_of_next_month() {
        assert_eq!(
            due_date_after(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 20).unwrap()
        );
        assert_eq!(
            due_date_after(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
        );
    }

    #[tokio::test]
    async fn test_vat_payable_and_upsert() {
        let (storage, periods) = seeded().await;
        let january = periods[0].clone();
        let mut store = JournalEntryStore::new(storage.clone());

        // Sale: 1000 + 210 output VAT
        let sale = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                "Factura emitida",
                vec![
                    LineInput::debit("430000", BigDecimal::from(1210)),
                    LineInput::credit("700000", BigDecimal::from(1000)),
                    LineInput::credit("477000", BigDecimal::from(210)),
                ],
            ))
            .await
            .unwrap();
        store.post(sale.id).await.unwrap();

        // Purchase: 400 + 84 input VAT
        let purchase = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Factura recibida",
                vec![
                    LineInput::debit("600000", BigDecimal::from(400)),
                    LineInput::debit("472000", BigDecimal::from(84)),
                    LineInput::credit("570000", BigDecimal::from(484)),
                ],
            ))
            .await
            .unwrap();
        store.post(purchase.id).await.unwrap();

        let mut manager = DeclarationManager::new(storage.clone());
        let declaration = manager
            .generate(DeclarationType::Modelo303, january.id)
            .await
            .unwrap();

        assert_eq!(declaration.status, DeclarationStatus::Calculated);
        assert_eq!(declaration.total_amount, BigDecimal::from(126));
        assert_eq!(
            declaration.due_date,
            NaiveDate::from_ymd_opt(2025, 2, 20).unwrap()
        );

        let figures: VatFigures =
            serde_json::from_value(declaration.calculated_data.clone()).unwrap();
        assert_eq!(figures.output_vat, BigDecimal::from(210));
        assert_eq!(figures.input_vat, BigDecimal::from(84));
        assert_eq!(figures.a_ingresar, BigDecimal::from(126));
        assert_eq!(figures.a_compensar, BigDecimal::from(0));

        // Regenerating replaces, never duplicates, and keeps the id
        let again = manager
            .generate(DeclarationType::Modelo303, january.id)
            .await
            .unwrap();
        assert_eq!(again.id, declaration.id);
        let all = storage.list_declarations(None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_vat_carry_forward_when_negative() {
        let (storage, periods) = seeded().await;
        let mut store = JournalEntryStore::new(storage.clone());

        let purchase = store
            .create(NewEntry::new(
                NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
                "Compra con IVA",
                vec![
                    LineInput::debit("600000", BigDecimal::from(1000)),
                    LineInput::debit("472000", BigDecimal::from(210)),
                    LineInput::credit("570000", BigDecimal::from(1210)),
                ],
            ))
            .await
            .unwrap();
        store.post(purchase.id).await.unwrap();

        let mut manager = DeclarationManager::new(storage);
        let declaration = manager
            .generate(DeclarationType::Modelo303, periods[1].id)
            .await
            .unwrap();

        let figures: VatFigures =
            serde_json::from_value(declaration.calculated_data.clone()).unwrap();
        assert_eq!(figures.a_ingresar, BigDecimal::from(0));
        assert_eq!(figures.a_compensar, BigDecimal::from(210));
        assert_eq!(declaration.total_amount, BigDecimal::from(-210));
    }

    #[tokio::test]
    async fn test_empty_period_yields_zero_declaration() {
        let (storage, periods) = seeded().await;
        let mut manager = DeclarationManager::new(storage);

        let declaration = manager
            .generate(DeclarationType::Modelo303, periods[5].id)
            .await
            .unwrap();
        assert_eq!(declaration.total_amount, BigDecimal::from(0));
        assert_eq!(declaration.status, DeclarationStatus::Calculated);
    }
}
