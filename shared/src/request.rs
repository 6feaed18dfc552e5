//! Transaction requests and their builder
//!
//! A request is immutable once built. Building never fails: a request missing
//! mandatory data is still representable so the execution pipeline can
//! classify it instead of the scenario aborting.

use serde::{Deserialize, Serialize};

use crate::errors::{SharedError, SharedResult};
use crate::kind::TransactionKind;

/// Card and merchant data used to seed builders when a scenario leaves them unset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestDataDefaults {
    pub pan: String,
    pub track2: String,
    pub terminal_id: String,
    pub card_acceptor_id: String,
    pub account: String,
    pub amount: String,
    pub currency_code: String,
}

impl Default for TestDataDefaults {
    fn default() -> Self {
        Self {
            pan: "4218281008687192".to_string(),
            track2: "4218281008687192D2709101123456789".to_string(),
            terminal_id: "ATM001LP".to_string(),
            card_acceptor_id: "409911000001234".to_string(),
            account: "1310672399".to_string(),
            amount: "10000".to_string(),
            currency_code: "068".to_string(),
        }
    }
}

/// Immutable transaction request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionRequest {
    kind: Option<TransactionKind>,
    pan: Option<String>,
    track2: Option<String>,
    amount: Option<String>,
    terminal_id: Option<String>,
    card_acceptor_id: Option<String>,
    card_acceptor_name: Option<String>,
    currency_code: Option<String>,
    processing_code: Option<String>,
    account: Option<String>,
    target_account: Option<String>,
    billing_amount: Option<String>,
    billing_currency: Option<String>,
    acquiring_country: Option<String>,
    acquiring_institution: Option<String>,
    merchant_type: Option<String>,
    pos_entry_mode: Option<String>,
    pin_data: Option<String>,
    private_use_fields: Option<String>,
    cashback_amount: Option<String>,
    mti: Option<String>,
}

/// JSON body accepted by the simulator's transaction endpoints
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pan: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track2: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    terminal_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_acceptor_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_acceptor_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processing_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_account: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    billing_amount: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    billing_currency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquiring_country: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquiring_institution: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pos_entry_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin_data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_use_fields: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cashback_amount: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mti: Option<&'a str>,
}

macro_rules! text_accessors {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(&self) -> Option<&str> {
                self.$field.as_deref()
            }
        )*
    };
}

macro_rules! text_setters {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(&mut self, value: impl Into<String>) -> &mut Self {
                self.draft.$field = Some(value.into());
                self
            }
        )*
    };
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl TransactionRequest {
    pub fn builder() -> TransactionRequestBuilder {
        TransactionRequestBuilder::new()
    }

    pub fn kind(&self) -> Option<TransactionKind> {
        self.kind
    }

    text_accessors!(
        pan,
        track2,
        amount,
        terminal_id,
        card_acceptor_id,
        card_acceptor_name,
        currency_code,
        processing_code,
        account,
        target_account,
        billing_amount,
        billing_currency,
        acquiring_country,
        acquiring_institution,
        merchant_type,
        pos_entry_mode,
        pin_data,
        private_use_fields,
        cashback_amount,
        mti,
    );

    /// PAN, track 2, terminal and card acceptor are all present
    pub fn has_required_fields(&self) -> bool {
        present(&self.pan)
            && present(&self.track2)
            && present(&self.terminal_id)
            && present(&self.card_acceptor_id)
    }

    pub fn is_valid(&self) -> bool {
        self.kind.is_some() && self.has_required_fields()
    }

    /// Check the request can be sent, returning its kind
    pub fn validate(&self) -> SharedResult<TransactionKind> {
        let kind = self.kind.ok_or_else(|| SharedError::InvalidRequest {
            reason: "transaction kind is required".to_string(),
        })?;

        let missing: Vec<&str> = [
            ("pan", &self.pan),
            ("track2", &self.track2),
            ("terminalId", &self.terminal_id),
            ("cardAcceptorId", &self.card_acceptor_id),
        ]
        .into_iter()
        .filter(|(_, value)| !present(value))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(SharedError::InvalidRequest {
                reason: format!("missing required fields: {}", missing.join(", ")),
            });
        }

        Ok(kind)
    }

    /// PAN safe for logs: first and last four digits only
    pub fn masked_pan(&self) -> String {
        match self.pan.as_deref() {
            Some(pan) if pan.len() >= 10 && pan.is_ascii() => {
                format!("{}********{}", &pan[..4], &pan[pan.len() - 4..])
            }
            _ => "****".to_string(),
        }
    }

    pub fn masked_track2(&self) -> String {
        match self.track2.as_deref() {
            Some(track2) if track2.len() >= 10 && track2.is_ascii() => format!("{}********", &track2[..4]),
            _ => "****".to_string(),
        }
    }

    /// Short description for logging
    pub fn description(&self) -> String {
        format!(
            "{} - PAN: {}, Amount: {}",
            self.kind.map(|k| k.code()).unwrap_or("UNKNOWN"),
            self.masked_pan(),
            self.amount.as_deref().unwrap_or("N/A")
        )
    }

    /// JSON body with only the fields that are set
    ///
    /// The generic processing endpoint needs the kind inside the body; the
    /// per-kind endpoints infer it from the path.
    pub fn to_wire_body(&self, include_kind: bool) -> SharedResult<serde_json::Value> {
        let body = WireBody {
            transaction_type: if include_kind { self.kind.map(|k| k.code()) } else { None },
            pan: self.pan.as_deref(),
            track2: self.track2.as_deref(),
            amount: self.amount.as_deref(),
            terminal_id: self.terminal_id.as_deref(),
            card_acceptor_id: self.card_acceptor_id.as_deref(),
            card_acceptor_name: self.card_acceptor_name.as_deref(),
            currency_code: self.currency_code.as_deref(),
            processing_code: self.processing_code.as_deref(),
            account: self.account.as_deref(),
            target_account: self.target_account.as_deref(),
            billing_amount: self.billing_amount.as_deref(),
            billing_currency: self.billing_currency.as_deref(),
            acquiring_country: self.acquiring_country.as_deref(),
            acquiring_institution: self.acquiring_institution.as_deref(),
            merchant_type: self.merchant_type.as_deref(),
            pos_entry_mode: self.pos_entry_mode.as_deref(),
            pin_data: self.pin_data.as_deref(),
            private_use_fields: self.private_use_fields.as_deref(),
            cashback_amount: self.cashback_amount.as_deref(),
            mti: self.mti.as_deref(),
        };

        serde_json::to_value(body).map_err(|e| SharedError::SerializationError { message: e.to_string() })
    }
}

/// Mutable builder producing immutable [`TransactionRequest`]s
#[derive(Clone, Debug, Default)]
pub struct TransactionRequestBuilder {
    draft: TransactionRequest,
}

impl TransactionRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&mut self, kind: TransactionKind) -> &mut Self {
        self.draft.kind = Some(kind);
        self
    }

    pub fn current_kind(&self) -> Option<TransactionKind> {
        self.draft.kind
    }

    text_setters!(
        pan,
        track2,
        amount,
        terminal_id,
        card_acceptor_id,
        card_acceptor_name,
        currency_code,
        processing_code,
        account,
        target_account,
        billing_amount,
        billing_currency,
        acquiring_country,
        acquiring_institution,
        merchant_type,
        pos_entry_mode,
        pin_data,
        private_use_fields,
        cashback_amount,
        mti,
    );

    /// Fill merchant data the simulator always expects
    pub fn apply_defaults(&mut self) -> &mut Self {
        let draft = &mut self.draft;
        draft.terminal_id.get_or_insert_with(|| "TERM0001".to_string());
        draft.card_acceptor_id.get_or_insert_with(|| "123456789012345".to_string());
        draft.card_acceptor_name.get_or_insert_with(|| "TEST MERCHANT LOCATION".to_string());
        draft.currency_code.get_or_insert_with(|| "068".to_string());
        self
    }

    /// Fill unset card and merchant data from configured test data
    pub fn seed_from(&mut self, defaults: &TestDataDefaults) -> &mut Self {
        let draft = &mut self.draft;
        draft.pan.get_or_insert_with(|| defaults.pan.clone());
        draft.track2.get_or_insert_with(|| defaults.track2.clone());
        draft.terminal_id.get_or_insert_with(|| defaults.terminal_id.clone());
        draft.card_acceptor_id.get_or_insert_with(|| defaults.card_acceptor_id.clone());
        draft.account.get_or_insert_with(|| defaults.account.clone());
        draft.amount.get_or_insert_with(|| defaults.amount.clone());
        draft.currency_code.get_or_insert_with(|| defaults.currency_code.clone());
        self
    }

    /// Processing code for the current kind, unless one is already set
    pub fn apply_kind_defaults(&mut self) -> &mut Self {
        if let Some(kind) = self.draft.kind {
            self.draft
                .processing_code
                .get_or_insert_with(|| kind.default_processing_code().to_string());
        }
        self
    }

    pub fn build(&self) -> TransactionRequest {
        self.draft.clone()
    }
}
