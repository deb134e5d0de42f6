//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Balance tolerance: 0.01 currency unit, computed exactly. Absorbs
/// rounding noise from upstream systems that worked in floats.
pub fn balance_tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Whether two totals are equal within the balance tolerance
pub fn within_tolerance(a: &BigDecimal, b: &BigDecimal) -> bool {
    (a - b).abs() <= balance_tolerance()
}

/// Validate that an amount is non-negative
pub fn validate_non_negative(amount: &BigDecimal, what: &str) -> CoreResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(CoreError::Validation(format!(
            "{what} must not be negative"
        )))
    } else {
        Ok(())
    }
}

/// Validate that an account code is well formed
pub fn validate_account_code(code: &str) -> CoreResult<()> {
    if code.trim().is_empty() {
        return Err(CoreError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 20 {
        return Err(CoreError::Validation(
            "Account code cannot exceed 20 characters".to_string(),
        ));
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::Validation(
            "Account code can only contain digits".to_string(),
        ));
    }

    Ok(())
}

/// Validate an entry description
pub fn validate_description(description: &str) -> CoreResult<()> {
    if description.trim().is_empty() {
        return Err(CoreError::Validation(
            "Description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(CoreError::Validation(
            "Description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate one journal line input: amounts non-negative and exactly one
/// side non-zero.
pub fn validate_line_amounts(debit: &BigDecimal, credit: &BigDecimal) -> CoreResult<()> {
    validate_non_negative(debit, "Debit amount")?;
    validate_non_negative(credit, "Credit amount")?;

    let zero = BigDecimal::from(0);
    let debit_set = *debit > zero;
    let credit_set = *credit > zero;

    if debit_set == credit_set {
        return Err(CoreError::Validation(
            "Each line must carry exactly one of debit or credit".to_string(),
        ));
    }

    Ok(())
}
