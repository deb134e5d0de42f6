//! Action-dispatch boundary
//!
//! The engine is driven through `{action, params}` requests that map to
//! engine operations. Every outcome, including unknown actions and
//! malformed params, comes back as an `ActionResponse`; dispatch never
//! panics and never returns `Err`.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::engine::AccountingEngine;
use crate::journal::entry::{LineInput, NewEntry};
use crate::traits::JournalStorage;
use crate::types::*;

/// A request against the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

/// The uniform response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl ActionResponse {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LineParams {
    account_code: String,
    #[serde(default)]
    debit_amount: Option<BigDecimal>,
    #[serde(default)]
    credit_amount: Option<BigDecimal>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tax_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateEntryParams {
    entry_date: NaiveDate,
    description: String,
    lines: Vec<LineParams>,
    #[serde(default)]
    reference_type: Option<String>,
    #[serde(default)]
    reference_id: Option<String>,
    #[serde(default)]
    source_document: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntryIdParams {
    entry_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ReverseEntryParams {
    entry_id: Uuid,
    reversal_date: NaiveDate,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PeriodIdParams {
    period_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct FiscalYearParams {
    fiscal_year: i32,
}

#[derive(Debug, Deserialize)]
struct AsOfDateParams {
    as_of_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct DateRangeParams {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct AutoReconcileParams {
    bank_account_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PartnerTransactionParams {
    partner_id: Uuid,
    transaction_type: PartnerTransactionType,
    amount: BigDecimal,
    transaction_date: NaiveDate,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateDeclarationParams {
    declaration_type: DeclarationType,
    period_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct DashboardParams {
    as_of_date: NaiveDate,
    #[serde(default)]
    bank_account_id: Option<Uuid>,
}

impl From<LineParams> for LineInput {
    fn from(p: LineParams) -> Self {
        let zero = BigDecimal::from(0);
        LineInput {
            account_code: p.account_code,
            debit_amount: p.debit_amount.unwrap_or_else(|| zero.clone()),
            credit_amount: p.credit_amount.unwrap_or(zero),
            description: p.description,
            tax_code: p.tax_code,
        }
    }
}

/// Dispatch a request against the engine. Errors are folded into the
/// response envelope.
pub async fn dispatch<S: JournalStorage + Clone>(
    engine: &mut AccountingEngine<S>,
    request: ActionRequest,
) -> ActionResponse {
    debug!(action = %request.action, "dispatching action");
    match request.action.as_str() {
        "create_entry" => {
            with_params(request.params, |p: CreateEntryParams| async move {
                let input = NewEntry {
                    entry_date: p.entry_date,
                    description: p.description,
                    lines: p.lines.into_iter().map(LineInput::from).collect(),
                    reference_type: p.reference_type,
                    reference_id: p.reference_id,
                    source_document: p.source_document,
                };
                engine.create_entry(input).await
            })
            .await
        }
        "post_entry" => {
            with_params(request.params, |p: EntryIdParams| async move {
                engine.post_entry(p.entry_id).await
            })
            .await
        }
        "reverse_entry" => {
            with_params(request.params, |p: ReverseEntryParams| async move {
                engine
                    .reverse_entry(p.entry_id, p.reversal_date, p.reason)
                    .await
            })
            .await
        }
        "delete_draft" => {
            with_params(request.params, |p: EntryIdParams| async move {
                engine.delete_draft(p.entry_id).await
            })
            .await
        }
        "close_period" => {
            with_params(request.params, |p: PeriodIdParams| async move {
                engine.close_period(p.period_id).await
            })
            .await
        }
        "lock_year" => {
            with_params(request.params, |p: FiscalYearParams| async move {
                engine.lock_year(p.fiscal_year).await
            })
            .await
        }
        "trial_balance" => {
            with_params(request.params, |p: PeriodIdParams| async move {
                engine.trial_balance(p.period_id).await
            })
            .await
        }
        "balance_sheet" => {
            with_params(request.params, |p: AsOfDateParams| async move {
                engine.balance_sheet(p.as_of_date).await
            })
            .await
        }
        "income_statement" => {
            with_params(request.params, |p: DateRangeParams| async move {
                engine.income_statement(p.start_date, p.end_date).await
            })
            .await
        }
        "cash_flow" => {
            with_params(request.params, |p: DateRangeParams| async move {
                engine.cash_flow(p.start_date, p.end_date).await
            })
            .await
        }
        "auto_reconcile" => {
            with_params(request.params, |p: AutoReconcileParams| async move {
                engine.auto_reconcile(p.bank_account_id).await
            })
            .await
        }
        "record_partner_transaction" => {
            with_params(request.params, |p: PartnerTransactionParams| async move {
                engine
                    .record_partner_transaction(
                        p.partner_id,
                        p.transaction_type,
                        p.amount,
                        p.transaction_date,
                        p.description,
                    )
                    .await
            })
            .await
        }
        "generate_declaration" => {
            with_params(request.params, |p: GenerateDeclarationParams| async move {
                engine.generate_declaration(p.declaration_type, p.period_id).await
            })
            .await
        }
        "get_dashboard" => {
            with_params(request.params, |p: DashboardParams| async move {
                engine.get_dashboard(p.as_of_date, p.bank_account_id).await
            })
            .await
        }
        other => ActionResponse::err(format!("unknown action: {other}")),
    }
}

/// Deserialize params, run the handler, encode the result. Bad params and
/// engine errors both become `success: false` responses.
async fn with_params<P, T, F, Fut>(params: Value, handler: F) -> ActionResponse
where
    P: serde::de::DeserializeOwned,
    T: Serialize,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = CoreResult<T>>,
{
    let parsed: P = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(err) => return ActionResponse::err(format!("invalid params: {err}")),
    };

    match handler(parsed).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(data) => ActionResponse::ok(data),
            Err(err) => ActionResponse::err(format!("cannot encode response: {err}")),
        },
        Err(err) => ActionResponse::err(err.to_string()),
    }
}
