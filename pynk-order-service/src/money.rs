//! Prices cross the service boundary in euros and are stored as integer cents.

use crate::errors::OrderError;

pub fn euros_to_cents(euros: f64) -> Result<i32, OrderError> {
    if !euros.is_finite() {
        return Err(OrderError::validation("price must be a finite number"));
    }
    if euros < 0.0 {
        return Err(OrderError::validation("price must not be negative"));
    }
    // f64::round rounds half away from zero.
    let cents = (euros * 100.0).round();
    if cents > i32::MAX as f64 {
        return Err(OrderError::validation("price is too large"));
    }
    Ok(cents as i32)
}

pub fn format_euros(cents: i32) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = (cents as i64).abs();
    format!("{sign}€{}.{:02}", abs / 100, abs % 100)
}
