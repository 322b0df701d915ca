//! Turns a verified response document into a flat caller-facing outcome.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::soap::Element;
use crate::soap::wsse::{Verification, body_fault, envelope_body};
use crate::token::Token;

/// Flat string mapping used for both request arguments and response fields
pub type FieldMapping = BTreeMap<String, String>;

pub const RESPONSE_CODE_FIELD: &str = "responseCode";
pub const TOKEN_FIELD: &str = "token";
pub const USER_ID_FIELD: &str = "tbkUser";
pub const ORDER_FIELD: &str = "buyOrder";
pub const SUCCESS_CODE: &str = "0";

pub const UNTRUSTED_MESSAGE: &str = "Response digest verification failed";
pub const UNKNOWN_FAULT_MESSAGE: &str = "Unknown fault";

/// How the remote party's answer was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// A trusted body with a `return` node
    Answered,
    /// A SOAP fault or a body without a `return` node
    Fault,
    /// The body digest did not match; no fields are exposed
    Untrusted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub fields: FieldMapping,
    pub kind: OutcomeKind,
}

impl Outcome {
    pub fn untrusted() -> Self {
        Self {
            success: false,
            message: UNTRUSTED_MESSAGE.to_owned(),
            fields: FieldMapping::new(),
            kind: OutcomeKind::Untrusted,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The combined user token, when the service issued a user id
    pub fn token(&self) -> Option<&str> {
        self.field(USER_ID_FIELD)
    }
}

/// What the caller sent, needed to complete the response fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub order_id: Option<String>,
    pub username: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Classify a response document and extract its fields.
///
/// Only the envelope body the verifier checked is read. A fault body yields
/// the fault and nothing else. Fails only when a server-issued user id
/// cannot be combined into a token.
pub fn translate(
    document: &Element,
    verification: Verification,
    request: &RequestContext,
) -> Result<Outcome> {
    let Some(body) = envelope_body(document).filter(|_| verification.is_trusted()) else {
        return Ok(Outcome::untrusted());
    };
    let body = body.element;

    let fault_element = body_fault(body);
    let mut outcome = if verification == Verification::Fault || fault_element.is_some() {
        fault(fault_element)
    } else {
        match body.find("return") {
            None => fault(None),
            Some(ret) => match boolean_literal(ret) {
                Some(success) => Outcome {
                    success,
                    message: String::new(),
                    fields: FieldMapping::new(),
                    kind: OutcomeKind::Answered,
                },
                None => answered(ret),
            },
        }
    };

    if let Some(order_id) = &request.order_id {
        outcome
            .fields
            .entry(ORDER_FIELD.to_owned())
            .or_insert_with(|| order_id.clone());
    }

    if let (Some(opaque), Some(username)) = (outcome.fields.get(USER_ID_FIELD), &request.username)
    {
        let token = Token::new(opaque.as_str(), username.as_str()).encode()?;
        outcome.fields.insert(USER_ID_FIELD.to_owned(), token);
    }

    tracing::debug!(
        success = outcome.success,
        kind = ?outcome.kind,
        code = ?outcome.field(RESPONSE_CODE_FIELD),
        "Translated response"
    );
    Ok(outcome)
}

fn fault(fault_element: Option<&Element>) -> Outcome {
    let message = fault_element
        .and_then(|e| e.child("faultstring"))
        .map(|e| e.text().trim().to_owned())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| UNKNOWN_FAULT_MESSAGE.to_owned());

    Outcome {
        success: false,
        message,
        fields: FieldMapping::new(),
        kind: OutcomeKind::Fault,
    }
}

fn boolean_literal(ret: &Element) -> Option<bool> {
    if ret.elements().next().is_some() {
        return None;
    }
    match ret.text().trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn answered(ret: &Element) -> Outcome {
    let fields: FieldMapping = ret
        .elements()
        .filter(|child| !child.local_name().is_empty())
        .map(|child| (child.local_name().to_owned(), child.text().trim().to_owned()))
        .collect();

    let code = fields.get(RESPONSE_CODE_FIELD).map(String::as_str);
    let success = fields.contains_key(TOKEN_FIELD) || code == Some(SUCCESS_CODE);
    let message = code.map(response_message).unwrap_or_default().to_owned();

    Outcome {
        success,
        message,
        fields,
        kind: OutcomeKind::Answered,
    }
}

/// Human-readable text for a service response code
pub fn response_message(code: &str) -> &'static str {
    match code {
        "0" => "Success",
        "-1" => "Transaction rejected",
        "-2" => "Transaction must be retried",
        "-3" => "Error processing the transaction",
        "-4" => "Transaction rejected by the card issuer",
        "-5" => "Transaction rejected due to rate error",
        "-6" => "Maximum monthly quota exceeded",
        "-7" => "Maximum daily limit per transaction exceeded",
        "-8" => "Card category not authorized",
        "-97" => "Maximum daily number of payments exceeded",
        "-98" => "Maximum payment amount exceeded",
        "-99" => "Maximum daily payment amount exceeded",
        _ => "Unknown response code",
    }
}
