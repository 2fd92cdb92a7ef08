//! Currency and amount validation
//!
//! Pure checks, invoked before any ledger mutation.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::LedgerError;

/// Maximum fractional digits of a transfer amount
pub const AMOUNT_SCALE: u32 = 2;

/// Largest value a `NUMERIC(20, 2)` balance or amount column holds
/// (999999999999999999.99)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 0x5, false, 2);

// ============================================================================
// CurrencyCode - Validated ISO-4217 Code (Private Field)
// ============================================================================

/// Validated ISO-4217 currency code (three uppercase ASCII letters)
///
/// Field is private to force validation through `parse()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code.
    ///
    /// No case folding: `eur` is rejected so that stored codes stay
    /// bit-identical to what clients send.
    ///
    /// # Examples
    /// ```
    /// use tenant_ledger::ledger::CurrencyCode;
    ///
    /// assert_eq!(CurrencyCode::parse("EUR").unwrap().as_str(), "EUR");
    /// assert!(CurrencyCode::parse("eur").is_err());
    /// assert!(CurrencyCode::parse("EURO").is_err());
    /// ```
    pub fn parse(code: &str) -> Result<Self, LedgerError> {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(LedgerError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::parse(s)
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Every code supplied for one transfer must equal `expected` exactly
pub fn currencies_match<'a>(
    expected: &CurrencyCode,
    others: impl IntoIterator<Item = &'a CurrencyCode>,
) -> Result<(), LedgerError> {
    for other in others {
        if other != expected {
            return Err(LedgerError::CurrencyMismatch {
                expected: expected.to_string(),
                found: other.to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Amounts
// ============================================================================

/// Parse and validate a client-supplied transfer amount.
///
/// # Rules
/// - Plain decimal notation only (`.5`, `5.`, `+5`, `1e3` rejected)
/// - Strictly positive
/// - At most two decimal places once trailing zeros are dropped
/// - No larger than [`MAX_AMOUNT`]
///
/// # Examples
/// ```
/// use tenant_ledger::ledger::validate_amount;
///
/// assert!(validate_amount("200").is_ok());
/// assert!(validate_amount("10.50").is_ok());
/// assert!(validate_amount("10.505").is_err());
/// assert!(validate_amount("0").is_err());
/// ```
pub fn validate_amount(raw: &str) -> Result<Decimal, LedgerError> {
    let s = raw.trim();

    if s.is_empty() {
        return Err(LedgerError::InvalidAmount("amount cannot be empty".into()));
    }
    if s.starts_with('.') || s.ends_with('.') || s.starts_with('+') {
        return Err(LedgerError::InvalidAmount(format!(
            "'{}' is not a plain decimal",
            raw
        )));
    }
    if s.contains('e') || s.contains('E') {
        return Err(LedgerError::InvalidAmount(
            "scientific notation not allowed".into(),
        ));
    }

    let amount = Decimal::from_str(s)
        .map_err(|_| LedgerError::InvalidAmount(format!("'{}' is not numeric", raw)))?;

    ensure_positive(amount)?;

    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "'{}' exceeds the maximum of {}",
            raw, MAX_AMOUNT
        )));
    }

    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "'{}' has more than {} decimal places",
            raw, AMOUNT_SCALE
        )));
    }

    Ok(amount)
}

/// Amount must be strictly positive
pub fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "{} must be greater than zero",
            amount
        )));
    }
    Ok(())
}

/// Balance after crediting `amount`, bounded by [`MAX_AMOUNT`]
pub fn credited_balance(balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(amount)
        .filter(|after| *after <= MAX_AMOUNT)
        .ok_or_else(|| balance_limit_exceeded(amount))
}

pub fn balance_limit_exceeded(amount: Decimal) -> LedgerError {
    LedgerError::InvalidAmount(format!(
        "crediting {} would exceed the balance limit of {}",
        amount, MAX_AMOUNT
    ))
}

// ============================================================================
// Tests
// ============================================================================
