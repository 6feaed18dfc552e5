//! Normalised result of one transaction attempt
//!
//! Outcomes are built either from the simulator's JSON reply or synthetically
//! when a request never reached the simulator, so a caller always has a
//! well-formed value to assert on.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{SharedError, SharedResult};
use crate::fields::FieldSet;
use crate::kind::TransactionKind;
use crate::validation;

pub const APPROVED_CODE: &str = "00";
pub const INVALID_REQUEST_CODE: &str = "30";
pub const SYSTEM_ERROR_CODE: &str = "96";

/// Classification carried in the reply's `errorType` tag
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    InvalidRequest,
    UnsupportedKind,
    ParseError,
    SystemError,
    Timeout,
    Other(String),
}

impl ErrorClass {
    pub fn tag(&self) -> &str {
        match self {
            ErrorClass::InvalidRequest => "INVALID_REQUEST",
            ErrorClass::UnsupportedKind => "UNSUPPORTED_KIND",
            ErrorClass::ParseError => "PARSE_ERROR",
            ErrorClass::SystemError => "SYSTEM_ERROR",
            ErrorClass::Timeout => "TIMEOUT",
            ErrorClass::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "INVALID_REQUEST" => ErrorClass::InvalidRequest,
            "UNSUPPORTED_KIND" => ErrorClass::UnsupportedKind,
            "PARSE_ERROR" => ErrorClass::ParseError,
            "SYSTEM_ERROR" => ErrorClass::SystemError,
            "TIMEOUT" => ErrorClass::Timeout,
            _ => ErrorClass::Other(tag.to_string()),
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Accept strings, numbers and booleans for text fields
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text),
            other => Some(other.to_string()),
        })
        .collect())
}

/// Booleans, `"true"`/`"false"` strings and numbers; anything else is false
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(flag)) => flag,
        Some(serde_json::Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(serde_json::Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// Non-negative whole number from an integer, a float (truncated) or a numeric string
fn whole_number(value: Option<serde_json::Value>) -> Option<u64> {
    let from_float = |n: f64| (n.is_finite() && n >= 0.0).then(|| n.trunc() as u64);
    match value? {
        serde_json::Value::Number(number) => number.as_u64().or_else(|| number.as_f64().and_then(from_float)),
        serde_json::Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(whole_number(Option::deserialize(deserializer)?))
}

fn lenient_u16<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    Ok(whole_number(Option::deserialize(deserializer)?).and_then(|n| u16::try_from(n).ok()))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionOutcome {
    #[serde(rename = "successful", deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub stan: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub mti: Option<String>,
    pub fields: FieldSet,
    #[serde(deserialize_with = "lenient_list")]
    pub validation_errors: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub validation_warnings: Vec<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(deserialize_with = "lenient_u64", skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(deserialize_with = "lenient_u16", skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub approval_code: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub retrieval_reference_number: Option<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub private_data: Option<String>,
}

impl TransactionOutcome {
    /// Read a simulator reply body; only a JSON object is an outcome
    pub fn from_reply_body(body: &str) -> SharedResult<Self> {
        let value: serde_json::Value = serde_json::from_str(body).map_err(|e| SharedError::DeserializationError {
            message: e.to_string(),
        })?;
        if !value.is_object() {
            return Err(SharedError::DeserializationError {
                message: "reply body is not a JSON object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| SharedError::DeserializationError { message: e.to_string() })
    }

    fn synthetic(code: &str, class: ErrorClass, message: impl Into<String>, http_status: Option<u16>) -> Self {
        let message = message.into();
        Self {
            success: false,
            response_code: Some(code.to_string()),
            response_message: Some(message.clone()),
            validation_errors: vec![message],
            error_type: Some(class.tag().to_string()),
            http_status_code: http_status,
            ..Default::default()
        }
    }

    /// Request failed local validation and was never sent
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::synthetic(INVALID_REQUEST_CODE, ErrorClass::InvalidRequest, reason, None)
    }

    /// Reply arrived but its body could not be read as an outcome
    pub fn parse_error(message: impl Into<String>, http_status: u16) -> Self {
        Self::synthetic(SYSTEM_ERROR_CODE, ErrorClass::ParseError, message, Some(http_status))
    }

    /// Transport failed before any reply was read
    pub fn system_error(message: impl Into<String>) -> Self {
        Self::synthetic(SYSTEM_ERROR_CODE, ErrorClass::SystemError, message, Some(500))
    }

    pub fn response_code(&self) -> &str {
        self.response_code.as_deref().unwrap_or("")
    }

    pub fn response_message(&self) -> &str {
        self.response_message.as_deref().unwrap_or("")
    }

    pub fn is_approved(&self) -> bool {
        self.response_code() == APPROVED_CODE
    }

    pub fn is_timeout(&self) -> bool {
        self.error_type
            .as_deref()
            .is_some_and(|tag| tag.eq_ignore_ascii_case("TIMEOUT"))
    }

    pub fn classification(&self) -> Option<ErrorClass> {
        self.error_type.as_deref().map(ErrorClass::from_tag)
    }

    /// Force the success flag to follow the approval code
    ///
    /// A remote flag that disagrees with the code is kept as a warning.
    pub fn reconcile_success(&mut self) {
        let approved = self.is_approved();
        if self.success != approved {
            self.validation_warnings.push(format!(
                "successful flag {} disagrees with response code '{}'",
                self.success,
                self.response_code()
            ));
        }
        self.success = approved;
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    pub fn has_validation_warnings(&self) -> bool {
        !self.validation_warnings.is_empty()
    }

    pub fn has_mti(&self, expected: &str) -> bool {
        self.mti.as_deref() == Some(expected)
    }

    pub fn mti_has_prefix(&self, prefix: &str) -> bool {
        self.mti.as_deref().is_some_and(|mti| mti.starts_with(prefix))
    }

    /// ISO field present in the reply's field map
    pub fn has_field(&self, number: u16) -> bool {
        self.fields.has_iso(number)
    }

    pub fn validate_stan(&self) -> SharedResult<()> {
        validation::check_stan(self.stan.as_deref().unwrap_or(""))
    }

    pub fn validate_mti(&self, prefix: Option<&str>) -> SharedResult<()> {
        validation::check_mti(self.mti.as_deref().unwrap_or(""), prefix)
    }

    pub fn validate_response_code(&self, expect_approval: bool) -> SharedResult<()> {
        validation::check_response_code(self.response_code(), expect_approval)
    }

    /// Processing code echoed in field 3 must match the kind
    pub fn validate_processing_code(&self, kind: TransactionKind) -> SharedResult<()> {
        validation::check_processing_code(self.fields.get_iso(3).unwrap_or(""), kind)
    }

    pub fn validate_response_time(&self, max_ms: u64) -> SharedResult<()> {
        validation::check_response_time(self.response_time, max_ms)
    }

    pub fn rrn(&self) -> Option<&str> {
        self.retrieval_reference_number.as_deref()
    }

    pub fn is_http_success(&self) -> bool {
        self.http_status_code.is_some_and(|status| (200..300).contains(&status))
    }

    pub fn error_message(&self) -> String {
        if self.has_validation_errors() {
            return self.validation_errors.join(", ");
        }
        match self.error_type.as_deref() {
            Some(tag) => format!("{}: {}", tag, self.response_message()),
            None => self.response_message().to_string(),
        }
    }

    /// Key used to group failures in coverage reports
    pub fn error_key(&self) -> String {
        format!("{}: {}", self.response_code(), self.response_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_parses_with_unknown_fields() {
        let outcome: TransactionOutcome = serde_json::from_str(
            r#"{
                "successful": true,
                "responseCode": "00",
                "responseMessage": "Approved",
                "stan": 123456,
                "mti": "0210",
                "fields": {"39": "00", "38": "ABC123"},
                "responseTime": 42,
                "balance": 1500.25,
                "unexpected": {"nested": true}
            }"#,
        )
        .unwrap();

        assert!(outcome.is_approved());
        assert_eq!(outcome.stan.as_deref(), Some("123456"));
        assert_eq!(outcome.balance.as_deref(), Some("1500.25"));
        assert_eq!(outcome.fields.get_iso(38), Some("ABC123"));
        assert_eq!(outcome.response_time, Some(42));
        assert!(outcome.has_mti("0210"));
    }

    #[test]
    fn test_missing_fields_default() {
        let outcome: TransactionOutcome = serde_json::from_str("{}").unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.response_code(), "");
        assert!(outcome.fields.is_empty());
        assert!(outcome.classification().is_none());
    }

    #[test]
    fn test_reconcile_success_follows_code() {
        let mut outcome = TransactionOutcome {
            success: true,
            response_code: Some("51".to_string()),
            ..Default::default()
        };
        outcome.reconcile_success();

        assert!(!outcome.success);
        assert!(outcome.has_validation_warnings());

        let mut approved = TransactionOutcome {
            success: true,
            response_code: Some("00".to_string()),
            ..Default::default()
        };
        approved.reconcile_success();
        assert!(approved.success);
        assert!(!approved.has_validation_warnings());
    }

    #[test]
    fn test_synthetic_outcomes() {
        let invalid = TransactionOutcome::invalid_request("missing required fields: pan");
        assert_eq!(invalid.response_code(), "30");
        assert_eq!(invalid.classification(), Some(ErrorClass::InvalidRequest));
        assert_eq!(invalid.http_status_code, None);

        let parse = TransactionOutcome::parse_error("bad json", 502);
        assert_eq!(parse.response_code(), "96");
        assert_eq!(parse.http_status_code, Some(502));

        let system = TransactionOutcome::system_error("connection refused");
        assert_eq!(system.classification(), Some(ErrorClass::SystemError));
        assert_eq!(system.http_status_code, Some(500));
        assert!(!system.success);
        assert!(!system.is_http_success());
    }

    #[test]
    fn test_timeout_tag_is_case_insensitive() {
        let outcome = TransactionOutcome {
            error_type: Some("timeout".to_string()),
            ..Default::default()
        };
        assert!(outcome.is_timeout());
        assert_eq!(outcome.classification(), Some(ErrorClass::Timeout));
    }

    #[test]
    fn test_error_message_prefers_validation_errors() {
        let outcome = TransactionOutcome {
            response_code: Some("05".to_string()),
            response_message: Some("Do not honor".to_string()),
            error_type: Some("DECLINED".to_string()),
            ..Default::default()
        };
        assert_eq!(outcome.error_message(), "DECLINED: Do not honor");
        assert_eq!(outcome.error_key(), "05: Do not honor");

        let invalid = TransactionOutcome::invalid_request("missing pan");
        assert_eq!(invalid.error_message(), "missing pan");
    }

    #[test]
    fn test_array_body_is_not_an_outcome() {
        let err = TransactionOutcome::from_reply_body(r#"[true, "00"]"#).unwrap_err();
        assert!(matches!(err, SharedError::DeserializationError { .. }));

        assert!(TransactionOutcome::from_reply_body("Service Unavailable").is_err());
        assert!(TransactionOutcome::from_reply_body("null").is_err());
    }

    #[test]
    fn test_reply_body_object_parses() {
        let outcome = TransactionOutcome::from_reply_body(r#"{"successful": true, "responseCode": "00"}"#).unwrap();
        assert!(outcome.success);
        assert!(outcome.is_approved());
    }

    #[test]
    fn test_null_success_flag_defaults_to_false() {
        let mut outcome =
            TransactionOutcome::from_reply_body(r#"{"successful": null, "responseCode": "00"}"#).unwrap();
        assert!(!outcome.success);

        outcome.reconcile_success();
        assert!(outcome.success);
    }

    #[test]
    fn test_success_flag_accepts_strings() {
        let outcome = TransactionOutcome::from_reply_body(r#"{"successful": "TRUE"}"#).unwrap();
        assert!(outcome.success);
        let outcome = TransactionOutcome::from_reply_body(r#"{"successful": "false"}"#).unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn test_numeric_scalars_are_coerced() {
        let outcome = TransactionOutcome::from_reply_body(
            r#"{"responseCode": "00", "responseTime": 12.5, "httpStatusCode": "200"}"#,
        )
        .unwrap();
        assert_eq!(outcome.response_time, Some(12));
        assert_eq!(outcome.http_status_code, Some(200));

        let outcome = TransactionOutcome::from_reply_body(r#"{"responseTime": "87"}"#).unwrap();
        assert_eq!(outcome.response_time, Some(87));
    }

    #[test]
    fn test_unusable_numbers_become_none() {
        let outcome = TransactionOutcome::from_reply_body(
            r#"{"responseTime": -5, "httpStatusCode": 70000}"#,
        )
        .unwrap();
        assert_eq!(outcome.response_time, None);
        assert_eq!(outcome.http_status_code, None);

        let outcome = TransactionOutcome::from_reply_body(r#"{"responseTime": null, "httpStatusCode": "n/a"}"#).unwrap();
        assert_eq!(outcome.response_time, None);
        assert_eq!(outcome.http_status_code, None);
    }

    #[test]
    fn test_reply_format_checks() {
        let outcome = TransactionOutcome::from_reply_body(
            r#"{
                "responseCode": "00",
                "stan": "000042",
                "mti": "0210",
                "fields": {"3": "300000", "39": "00"},
                "responseTime": 120
            }"#,
        )
        .unwrap();

        assert!(outcome.validate_stan().is_ok());
        assert!(outcome.validate_mti(Some("02")).is_ok());
        assert!(outcome.mti_has_prefix("021"));
        assert!(!outcome.mti_has_prefix("01"));
        assert!(outcome.validate_response_code(true).is_ok());
        assert!(outcome.validate_processing_code(TransactionKind::BalanceInquiry).is_ok());
        assert!(outcome.validate_processing_code(TransactionKind::Purchase).is_err());
        assert!(outcome.validate_response_time(500).is_ok());
        assert!(outcome.validate_response_time(100).is_err());
        assert!(outcome.has_field(39));
        assert!(!outcome.has_field(38));
    }

    #[test]
    fn test_missing_stan_fails_validation() {
        let outcome = TransactionOutcome::default();
        assert!(matches!(
            outcome.validate_stan(),
            Err(SharedError::ValidationFailed { ref field, .. }) if field == "stan"
        ));
        assert!(outcome.validate_mti(None).is_err());
    }
}
