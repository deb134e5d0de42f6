//! Fiscal period state machine: open -> closed -> locked

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::traits::JournalStorage;
use crate::types::*;

/// Spanish month names used for generated period labels
const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Outcome of locking a fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCloseResult {
    pub fiscal_year: i32,
    /// Net profit: income (group 7, credit - debit) minus expenses
    /// (group 6, debit - credit) over the full year's posted entries
    pub net_result: BigDecimal,
    pub periods_locked: usize,
}

/// Fiscal period manager enforcing the monotonic locking sequence
pub struct FiscalPeriodManager<S: JournalStorage> {
    storage: S,
}

impl<S: JournalStorage> FiscalPeriodManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Seed a calendar year with twelve contiguous monthly periods.
    pub async fn create_year(&mut self, fiscal_year: i32) -> CoreResult<Vec<FiscalPeriod>> {
        if !self.storage.list_periods(fiscal_year).await?.is_empty() {
            return Err(CoreError::Validation(format!(
                "Fiscal year {fiscal_year} already has periods"
            )));
        }

        let mut periods = Vec::with_capacity(12);
        for month in 1..=12u32 {
            let start = NaiveDate::from_ymd_opt(fiscal_year, month, 1).ok_or_else(|| {
                CoreError::Validation(format!("Invalid fiscal year {fiscal_year}"))
            })?;
            let end = last_day_of_month(fiscal_year, month).ok_or_else(|| {
                CoreError::Validation(format!("Invalid fiscal year {fiscal_year}"))
            })?;
            let name = format!("{} {}", MONTH_NAMES[month as usize - 1], fiscal_year);

            let period = FiscalPeriod::new(fiscal_year, name, start, end);
            self.storage.save_period(&period).await?;
            periods.push(period);
        }

        info!(fiscal_year, "fiscal year seeded with monthly periods");
        Ok(periods)
    }

    /// Get a period by id
    pub async fn get(&self, period_id: Uuid) -> CoreResult<Option<FiscalPeriod>> {
        self.storage.get_period(period_id).await
    }

    /// Close a period. Fails while draft entries remain inside it; closing
    /// an already-closed period is a no-op, a locked period is final.
    pub async fn close(&mut self, period_id: Uuid) -> CoreResult<FiscalPeriod> {
        let mut period = self
            .storage
            .get_period(period_id)
            .await?
            .ok_or(CoreError::PeriodNotFound(period_id))?;

        match period.status {
            PeriodStatus::Locked => return Err(CoreError::PeriodLocked(period.name)),
            PeriodStatus::Closed => return Ok(period),
            PeriodStatus::Open => {}
        }

        let drafts = self.storage.count_draft_entries(period_id).await?;
        if drafts > 0 {
            return Err(CoreError::DraftEntriesRemain {
                period: period.name,
                count: drafts,
            });
        }

        period.status = PeriodStatus::Closed;
        period.closed_at = Some(chrono::Utc::now().naive_utc());
        self.storage.update_period(&period).await?;
        info!(period = %period.name, "fiscal period closed");

        Ok(period)
    }

    /// Lock every period of a fiscal year and compute the year's net
    /// result. All periods must already be closed and free of drafts;
    /// this is terminal, no unlock path exists.
    pub async fn lock_year(&mut self, fiscal_year: i32) -> CoreResult<YearCloseResult> {
        let periods = self.storage.list_periods(fiscal_year).await?;
        if periods.is_empty() {
            return Err(CoreError::Validation(format!(
                "Fiscal year {fiscal_year} has no periods"
            )));
        }

        let open = periods
            .iter()
            .filter(|p| p.status == PeriodStatus::Open)
            .count();
        if open > 0 {
            return Err(CoreError::OpenPeriodsRemain {
                year: fiscal_year,
                count: open,
            });
        }

        // Closed periods still accept drafts until the year lock; locking
        // over one would strand it unpostable forever
        for period in &periods {
            let drafts = self.storage.count_draft_entries(period.id).await?;
            if drafts > 0 {
                return Err(CoreError::DraftEntriesRemain {
                    period: period.name.clone(),
                    count: drafts,
                });
            }
        }

        let year_start = periods.iter().map(|p| p.start_date).min();
        let year_end = periods.iter().map(|p| p.end_date).max();
        let net_result = self.compute_net_result(year_start, year_end).await?;

        let mut locked = 0;
        for mut period in periods {
            if period.status == PeriodStatus::Locked {
                continue;
            }
            period.status = PeriodStatus::Locked;
            self.storage.update_period(&period).await?;
            locked += 1;
        }

        info!(fiscal_year, %net_result, "fiscal year locked");
        Ok(YearCloseResult {
            fiscal_year,
            net_result,
            periods_locked: locked,
        })
    }

    /// Net profit over a window: income accounts (group 7) contribute
    /// credit - debit, expense accounts (group 6) debit - credit.
    async fn compute_net_result(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> CoreResult<BigDecimal> {
        let entries = self.storage.list_posted_entries(start, end).await?;

        let mut income = BigDecimal::from(0);
        let mut expense = BigDecimal::from(0);
        for entry in &entries {
            for line in &entry.lines {
                match line.account_code.chars().next() {
                    Some('7') => income += &line.credit_amount - &line.debit_amount,
                    Some('6') => expense += &line.debit_amount - &line.credit_amount,
                    _ => {}
                }
            }
        }

        Ok(income - expense)
    }
}

/// Last calendar day of a month, None for out-of-range input
fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month.and_then(|d| d.pred_opt())
}
