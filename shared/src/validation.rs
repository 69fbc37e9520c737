//! Validation utilities for the Production Management backend

use rust_decimal::Decimal;

use crate::error::DomainError;

// ============================================================================
// Production and Money Validations
// ============================================================================

/// Quantities moved through the pipeline are whole positive units
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Payments, expenses and withdrawals must move a positive amount of cash
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Catalogue prices may be zero but never negative
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Runs a check and tags its failure with the offending field
pub fn check_field(
    field: &str,
    result: Result<(), &'static str>,
) -> Result<(), DomainError> {
    result.map_err(|message| DomainError::validation(field, message))
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Usernames are 3-50 characters of letters, digits, dot, dash or underscore
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 50 {
        return Err("Username must be at most 50 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Username may only contain letters, digits, '.', '-' and '_'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Phone numbers: digits with an optional leading '+', spaces and dashes ignored
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);

    if digits.len() < 6 || digits.len() > 15 {
        return Err("Phone number must have 6 to 15 digits");
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number may only contain digits");
    }
    Ok(())
}
