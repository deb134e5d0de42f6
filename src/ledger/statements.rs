//! Statement generators: trial balance, balance sheet, income statement,
//! cash flow. Pure aggregations over the ledger projection; nothing here
//! writes.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::projection::LedgerProjector;
use crate::traits::JournalStorage;
use crate::types::*;
use crate::utils::validation::within_tolerance;

/// Account code prefix of the cash subgroup (PGC 57x)
pub const CASH_ACCOUNT_PREFIX: &str = "57";

/// One account row of a trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// Net balance shown in the debit column when positive
    pub balance_debit: BigDecimal,
    /// Net balance shown in the credit column when negative
    pub balance_credit: BigDecimal,
}

/// Trial balance over one fiscal period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub fiscal_period_id: Uuid,
    pub period_name: String,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub balance_debit_total: BigDecimal,
    pub balance_credit_total: BigDecimal,
    /// Data-integrity signal, not an error: debit and credit columns agree
    /// within tolerance
    pub balanced: bool,
}

/// One classified line of a balance sheet or income statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub account_code: String,
    pub account_name: String,
    pub balance: BigDecimal,
}

/// Balance sheet as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub assets: Vec<StatementLine>,
    pub liabilities: Vec<StatementLine>,
    pub equity: Vec<StatementLine>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    /// Period result rolled into equity as "Resultado del ejercicio"
    pub net_result: BigDecimal,
    pub balanced: bool,
}

/// Income statement over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub income: Vec<StatementLine>,
    pub expenses: Vec<StatementLine>,
    pub total_income: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_profit: BigDecimal,
}

/// Per-account cash flow detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowAccount {
    pub account_code: String,
    pub account_name: String,
    pub opening_balance: BigDecimal,
    pub inflows: BigDecimal,
    pub outflows: BigDecimal,
    pub closing_balance: BigDecimal,
}

/// Cash flow over a window, restricted to the cash subgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub accounts: Vec<CashFlowAccount>,
    pub opening_balance: BigDecimal,
    pub inflows: BigDecimal,
    pub outflows: BigDecimal,
    pub closing_balance: BigDecimal,
}

/// Generator for the four standard statements
pub struct StatementGenerator<S: JournalStorage> {
    storage: S,
}

impl<S: JournalStorage + Clone> StatementGenerator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn projector(&self) -> LedgerProjector<S> {
        LedgerProjector::new(self.storage.clone())
    }

    /// Trial balance over one fiscal period: per detail account, summed
    /// posted debits and credits; net balance split into a debit or credit
    /// presentation column by sign. Accounts without movements are omitted.
    pub async fn trial_balance(&self, period_id: Uuid) -> CoreResult<TrialBalance> {
        let period = self
            .storage
            .get_period(period_id)
            .await?
            .ok_or(CoreError::PeriodNotFound(period_id))?;

        let entries = self.storage.list_entries_for_period(period_id).await?;
        let zero = BigDecimal::from(0);

        // account code -> (debit, credit); BTreeMap keeps code order stable
        let mut sums: BTreeMap<String, (BigDecimal, BigDecimal)> = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.status != EntryStatus::Draft) {
            for line in &entry.lines {
                let slot = sums
                    .entry(line.account_code.clone())
                    .or_insert_with(|| (zero.clone(), zero.clone()));
                slot.0 += &line.debit_amount;
                slot.1 += &line.credit_amount;
            }
        }

        let mut rows = Vec::with_capacity(sums.len());
        let mut total_debit = zero.clone();
        let mut total_credit = zero.clone();
        let mut balance_debit_total = zero.clone();
        let mut balance_credit_total = zero.clone();

        for (code, (debit, credit)) in sums {
            if debit == zero && credit == zero {
                continue;
            }
            let account = self
                .storage
                .get_account(&code)
                .await?
                .ok_or_else(|| CoreError::UnknownAccount(code.clone()))?;

            let net = &debit - &credit;
            let (balance_debit, balance_credit) = if net >= zero {
                (net.clone(), zero.clone())
            } else {
                (zero.clone(), net.abs())
            };

            total_debit += &debit;
            total_credit += &credit;
            balance_debit_total += &balance_debit;
            balance_credit_total += &balance_credit;

            rows.push(TrialBalanceRow {
                account_code: code,
                account_name: account.name,
                total_debit: debit,
                total_credit: credit,
                balance_debit,
                balance_credit,
            });
        }

        let balanced = within_tolerance(&balance_debit_total, &balance_credit_total);

        Ok(TrialBalance {
            fiscal_period_id: period.id,
            period_name: period.name,
            rows,
            total_debit,
            total_credit,
            balance_debit_total,
            balance_credit_total,
            balanced,
        })
    }

    /// Balance sheet at a date. Asset/liability/equity balances are
    /// oriented by the account's normal side; the cumulative net result
    /// (income - expense to date) joins equity as a synthetic line so the
    /// statement can balance before the year is closed.
    pub async fn balance_sheet(&self, as_of_date: NaiveDate) -> CoreResult<BalanceSheet> {
        let accounts = self.storage.list_accounts(None).await?;
        let projector = self.projector();
        let zero = BigDecimal::from(0);

        let mut assets = Vec::new();
        let mut liabilities = Vec::new();
        let mut equity = Vec::new();
        let mut net_result = zero.clone();

        for account in accounts.iter().filter(|a| a.is_detail) {
            let net = projector.balance_as_of(&account.code, as_of_date).await?;
            if net == zero {
                continue;
            }
            let oriented = match account.normal_balance {
                BalanceSide::Debit => net.clone(),
                BalanceSide::Credit => -net.clone(),
            };
            let line = StatementLine {
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                balance: oriented.clone(),
            };
            match account.account_type {
                AccountType::Asset => assets.push(line),
                AccountType::Liability => liabilities.push(line),
                AccountType::Equity => equity.push(line),
                AccountType::Income => net_result += -net,
                AccountType::Expense => net_result -= net,
            }
        }

        if net_result != zero {
            equity.push(StatementLine {
                account_code: String::new(),
                account_name: "Resultado del ejercicio".to_string(),
                balance: net_result.clone(),
            });
        }

        let total_assets: BigDecimal = assets.iter().map(|l| &l.balance).sum();
        let total_liabilities: BigDecimal = liabilities.iter().map(|l| &l.balance).sum();
        let total_equity: BigDecimal = equity.iter().map(|l| &l.balance).sum();
        let balanced = within_tolerance(&total_assets, &(&total_liabilities + &total_equity));

        Ok(BalanceSheet {
            as_of_date,
            assets,
            liabilities,
            equity,
            total_assets,
            total_liabilities,
            total_equity,
            net_result,
            balanced,
        })
    }

    /// Income statement over a window: income accounts (group 7) net
    /// credit - debit, expense accounts (group 6) net debit - credit.
    pub async fn income_statement(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CoreResult<IncomeStatement> {
        let accounts = self.storage.list_accounts(None).await?;
        let projector = self.projector();
        let zero = BigDecimal::from(0);

        let mut income = Vec::new();
        let mut expenses = Vec::new();

        for account in accounts.iter().filter(|a| a.is_detail) {
            let projection = projector
                .project_account(&account.code, Some(start_date), Some(end_date))
                .await?;
            match account.account_group {
                7 => {
                    let net = &projection.total_credit - &projection.total_debit;
                    if net != zero {
                        income.push(StatementLine {
                            account_code: account.code.clone(),
                            account_name: account.name.clone(),
                            balance: net,
                        });
                    }
                }
                6 => {
                    let net = &projection.total_debit - &projection.total_credit;
                    if net != zero {
                        expenses.push(StatementLine {
                            account_code: account.code.clone(),
                            account_name: account.name.clone(),
                            balance: net,
                        });
                    }
                }
                _ => {}
            }
        }

        let total_income: BigDecimal = income.iter().map(|l| &l.balance).sum();
        let total_expenses: BigDecimal = expenses.iter().map(|l| &l.balance).sum();
        let net_profit = &total_income - &total_expenses;

        Ok(IncomeStatement {
            start_date,
            end_date,
            income,
            expenses,
            total_income,
            total_expenses,
            net_profit,
        })
    }

    /// Cash flow over a window, restricted to accounts in the cash
    /// subgroup. Opening balances are projected strictly before the
    /// window; closing = opening + (inflows - outflows).
    pub async fn cash_flow(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CoreResult<CashFlowStatement> {
        let accounts = self.storage.list_accounts(None).await?;
        let projector = self.projector();

        let mut details = Vec::new();
        let mut opening_total = BigDecimal::from(0);
        let mut inflows_total = BigDecimal::from(0);
        let mut outflows_total = BigDecimal::from(0);

        for account in accounts
            .iter()
            .filter(|a| a.is_detail && a.code.starts_with(CASH_ACCOUNT_PREFIX))
        {
            let opening = projector.balance_before(&account.code, start_date).await?;
            let window = projector
                .project_account(&account.code, Some(start_date), Some(end_date))
                .await?;

            let closing = &opening + (&window.total_debit - &window.total_credit);
            opening_total += &opening;
            inflows_total += &window.total_debit;
            outflows_total += &window.total_credit;

            details.push(CashFlowAccount {
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                opening_balance: opening,
                inflows: window.total_debit,
                outflows: window.total_credit,
                closing_balance: closing,
            });
        }

        let closing_balance = &opening_total + (&inflows_total - &outflows_total);

        Ok(CashFlowStatement {
            start_date,
            end_date,
            accounts: details,
            opening_balance: opening_total,
            inflows: inflows_total,
            outflows: outflows_total,
            closing_balance,
        })
    }
}
