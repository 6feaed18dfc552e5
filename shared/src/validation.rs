//! Format checks for values echoed back by the simulator

use crate::errors::{SharedError, SharedResult};
use crate::kind::TransactionKind;
use crate::outcome::APPROVED_CODE;

fn failed(field: &str, reason: impl Into<String>) -> SharedError {
    SharedError::ValidationFailed {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn is_digits(value: &str, lengths: std::ops::RangeInclusive<usize>) -> bool {
    lengths.contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

/// 13 to 19 digits
pub fn check_pan(pan: &str) -> SharedResult<()> {
    if is_digits(pan, 13..=19) {
        Ok(())
    } else {
        Err(failed("pan", format!("expected 13-19 digits, got {} characters", pan.len())))
    }
}

/// Exactly six digits
pub fn check_stan(stan: &str) -> SharedResult<()> {
    if is_digits(stan, 6..=6) {
        Ok(())
    } else {
        Err(failed("stan", format!("expected 6 digits, got '{stan}'")))
    }
}

/// Four digits, optionally starting with `prefix`
pub fn check_mti(mti: &str, prefix: Option<&str>) -> SharedResult<()> {
    if !is_digits(mti, 4..=4) {
        return Err(failed("mti", format!("expected 4 digits, got '{mti}'")));
    }
    match prefix {
        Some(prefix) if !mti.starts_with(prefix) => Err(failed("mti", format!("'{mti}' does not start with '{prefix}'"))),
        _ => Ok(()),
    }
}

/// Two characters; `00` exactly when an approval is expected
pub fn check_response_code(code: &str, expect_approval: bool) -> SharedResult<()> {
    if code.len() != 2 {
        return Err(failed("responseCode", format!("expected 2 characters, got '{code}'")));
    }
    if (code == APPROVED_CODE) != expect_approval {
        let wanted = if expect_approval { "an approval" } else { "a decline" };
        return Err(failed("responseCode", format!("expected {wanted}, got '{code}'")));
    }
    Ok(())
}

/// Leading two digits of the processing code a kind must carry
pub fn processing_code_prefix(kind: TransactionKind) -> &'static str {
    &kind.default_processing_code()[..2]
}

/// Six digits starting with the kind's transaction-type prefix
pub fn check_processing_code(code: &str, kind: TransactionKind) -> SharedResult<()> {
    if !is_digits(code, 6..=6) {
        return Err(failed("processingCode", format!("expected 6 digits, got '{code}'")));
    }
    let prefix = processing_code_prefix(kind);
    if code.starts_with(prefix) {
        Ok(())
    } else {
        Err(failed(
            "processingCode",
            format!("'{code}' does not start with '{prefix}' for {kind}"),
        ))
    }
}

/// Strictly below `max_ms`; a missing time never passes
pub fn check_response_time(response_time: Option<u64>, max_ms: u64) -> SharedResult<()> {
    match response_time {
        Some(ms) if ms < max_ms => Ok(()),
        Some(ms) => Err(failed("responseTime", format!("{ms}ms is not below {max_ms}ms"))),
        None => Err(failed("responseTime", "no response time recorded")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_length_bounds() {
        assert!(check_pan("4218281008687").is_ok());
        assert!(check_pan("4218281008687192123").is_ok());
        assert!(check_pan("421828100868").is_err());
        assert!(check_pan("42182810086871921234").is_err());
        assert!(check_pan("4218-2810-0868-7192").is_err());
    }

    #[test]
    fn test_stan_is_six_digits() {
        assert!(check_stan("000042").is_ok());
        assert!(check_stan("42").is_err());
        assert!(check_stan("00004A").is_err());
        assert_eq!(
            check_stan("1234567").unwrap_err().to_string(),
            "Validation failed for stan: expected 6 digits, got '1234567'"
        );
    }

    #[test]
    fn test_mti_prefix() {
        assert!(check_mti("0210", Some("02")).is_ok());
        assert!(check_mti("0110", None).is_ok());
        assert!(check_mti("0110", Some("02")).is_err());
        assert!(check_mti("210", None).is_err());
    }

    #[test]
    fn test_response_code_direction() {
        assert!(check_response_code("00", true).is_ok());
        assert!(check_response_code("51", false).is_ok());
        assert!(check_response_code("00", false).is_err());
        assert!(check_response_code("05", true).is_err());
        assert!(check_response_code("0", true).is_err());
    }

    #[test]
    fn test_processing_code_follows_kind() {
        assert!(check_processing_code("300000", TransactionKind::BalanceInquiry).is_ok());
        assert!(check_processing_code("011000", TransactionKind::CashAdvance).is_ok());
        assert!(check_processing_code("400000", TransactionKind::Transfer).is_ok());
        assert!(check_processing_code("210000", TransactionKind::Deposit).is_ok());
        assert!(check_processing_code("000000", TransactionKind::BalanceInquiry).is_err());
        assert!(check_processing_code("30000", TransactionKind::BalanceInquiry).is_err());
        assert_eq!(processing_code_prefix(TransactionKind::Cashback), "09");
    }

    #[test]
    fn test_response_time_is_strictly_below_max() {
        assert!(check_response_time(Some(499), 500).is_ok());
        assert!(check_response_time(Some(500), 500).is_err());
        assert!(check_response_time(None, 500).is_err());
    }
}
