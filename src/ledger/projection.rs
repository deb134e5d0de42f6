//! Ledger projection: replaying posted lines into ordered movements
//!
//! Balances are always a pure function of the posted-entry log. Drafts are
//! invisible; reversed originals stay included because a reversal adds
//! offsetting lines instead of erasing history.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::traits::JournalStorage;
use crate::types::*;

/// Movements and totals for one account over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProjection {
    pub account_code: String,
    /// Movements in entry-date order, ties broken by line number then
    /// entry creation order
    pub movements: Vec<LedgerMovement>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// Opening balance the fold was seeded with
    pub opening_balance: BigDecimal,
    /// opening + sum(debit - credit) over the window
    pub closing_balance: BigDecimal,
}

/// Read-side projector over posted journal entries
pub struct LedgerProjector<S: JournalStorage> {
    storage: S,
}

impl<S: JournalStorage> LedgerProjector<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Project an account over a window, folding a running balance from 0.
    /// Callers wanting an opening balance project the range before the
    /// window and seed the fold via [`project_with_opening`].
    ///
    /// [`project_with_opening`]: LedgerProjector::project_with_opening
    pub async fn project_account(
        &self,
        account_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CoreResult<AccountProjection> {
        self.project_with_opening(account_code, start_date, end_date, BigDecimal::from(0))
            .await
    }

    /// Project an account seeding the fold with an opening balance.
    /// The sign convention is always debit - credit; the account's normal
    /// balance side only matters for presentation.
    pub async fn project_with_opening(
        &self,
        account_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        opening_balance: BigDecimal,
    ) -> CoreResult<AccountProjection> {
        let entries = self.storage.list_posted_entries(start_date, end_date).await?;

        // (entry_date, line_number, created_at) gives the fold order
        let mut lines: Vec<(&JournalEntry, &JournalEntryLine)> = entries
            .iter()
            .flat_map(|e| e.lines.iter().map(move |l| (e, l)))
            .filter(|(_, l)| l.account_code == account_code)
            .collect();
        lines.sort_by(|(ea, la), (eb, lb)| {
            ea.entry_date
                .cmp(&eb.entry_date)
                .then(la.line_number.cmp(&lb.line_number))
                .then(ea.created_at.cmp(&eb.created_at))
        });

        let mut running = opening_balance.clone();
        let mut total_debit = BigDecimal::from(0);
        let mut total_credit = BigDecimal::from(0);
        let mut movements = Vec::with_capacity(lines.len());

        for (entry, line) in lines {
            running += &line.debit_amount - &line.credit_amount;
            total_debit += &line.debit_amount;
            total_credit += &line.credit_amount;
            movements.push(LedgerMovement {
                entry_id: entry.id,
                entry_date: entry.entry_date,
                line_number: line.line_number,
                description: line
                    .description
                    .clone()
                    .unwrap_or_else(|| entry.description.clone()),
                debit_amount: line.debit_amount.clone(),
                credit_amount: line.credit_amount.clone(),
                running_balance: running.clone(),
            });
        }

        Ok(AccountProjection {
            account_code: account_code.to_string(),
            movements,
            total_debit,
            total_credit,
            opening_balance,
            closing_balance: running,
        })
    }

    /// Cumulative balance (debit - credit) up to and including a date
    pub async fn balance_as_of(
        &self,
        account_code: &str,
        as_of_date: NaiveDate,
    ) -> CoreResult<BigDecimal> {
        let projection = self
            .project_account(account_code, None, Some(as_of_date))
            .await?;
        Ok(projection.closing_balance)
    }

    /// Cumulative balance strictly before a date
    pub async fn balance_before(
        &self,
        account_code: &str,
        date: NaiveDate,
    ) -> CoreResult<BigDecimal> {
        match date.pred_opt() {
            Some(day_before) => self.balance_as_of(account_code, day_before).await,
            None => Ok(BigDecimal::from(0)),
        }
    }
}
