use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Receiver block as declared on the slip by the recognition vendor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlipReceiver {
    pub name_th: Option<String>,
    pub name_en: Option<String>,
    pub account_number: Option<String>,
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlipSender {
    pub name_th: Option<String>,
    pub name_en: Option<String>,
    pub account_number: Option<String>,
}

/// Typed result of one slip-recognition call.
#[derive(Debug, Clone, PartialEq)]
pub struct SlipVerificationResult {
    pub reference: String,
    pub amount: BigDecimal,
    pub receiver: SlipReceiver,
    pub sender: SlipSender,
    pub raw_payload: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlipParseError {
    /// The vendor rejected the image or answered with something that is not a slip result.
    #[error("slip vendor response is not a slip result: {0}")]
    Malformed(String),
    /// The vendor recognised a slip but left out a field the ledger needs.
    #[error("slip vendor response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: Option<bool>,
    message: Option<String>,
    data: Option<RawSlip>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlip {
    #[serde(alias = "transRef", alias = "transaction_reference")]
    transaction_reference: Option<String>,
    amount: Option<Value>,
    receiver: Option<RawParty>,
    sender: Option<RawParty>,
}

#[derive(Debug, Default, Deserialize)]
struct RawParty {
    name: Option<RawName>,
    account: Option<RawAccount>,
}

#[derive(Debug, Default, Deserialize)]
struct RawName {
    th: Option<String>,
    en: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAccount {
    #[serde(alias = "value")]
    number: Option<String>,
    #[serde(rename = "type")]
    type_: Option<String>,
}

/// Parses a vendor body into a [`SlipVerificationResult`].
///
/// The body may be the bare slip object or wrapped as `{ success, data }`. An
/// explicit `success: false`, or a body that carries neither a reference nor a
/// receiver, is [`SlipParseError::Malformed`].
pub fn parse_slip_response(raw: &Value) -> Result<SlipVerificationResult, SlipParseError> {
    if !raw.is_object() {
        return Err(SlipParseError::Malformed("body is not a JSON object".to_string()));
    }

    let slip = match serde_json::from_value::<RawEnvelope>(raw.clone()) {
        Ok(RawEnvelope {
            success: Some(false),
            message,
            ..
        }) => {
            return Err(SlipParseError::Malformed(
                message.unwrap_or_else(|| "vendor reported failure".to_string()),
            ));
        }
        Ok(RawEnvelope { data: Some(data), .. }) => data,
        _ => serde_json::from_value::<RawSlip>(raw.clone())
            .map_err(|err| SlipParseError::Malformed(err.to_string()))?,
    };

    if slip.transaction_reference.is_none() && slip.receiver.is_none() {
        return Err(SlipParseError::Malformed(
            "neither reference nor receiver present".to_string(),
        ));
    }

    let reference = slip
        .transaction_reference
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(SlipParseError::MissingField("transactionReference"))?;

    let amount = slip
        .amount
        .as_ref()
        .and_then(decimal_from_json)
        .ok_or(SlipParseError::MissingField("amount"))?;

    let receiver = slip.receiver.ok_or(SlipParseError::MissingField("receiver"))?;
    let sender = slip.sender.unwrap_or_default();

    Ok(SlipVerificationResult {
        reference,
        amount,
        receiver: SlipReceiver {
            name_th: receiver.name.as_ref().and_then(|n| non_empty(&n.th)),
            name_en: receiver.name.as_ref().and_then(|n| non_empty(&n.en)),
            account_number: receiver.account.as_ref().and_then(|a| non_empty(&a.number)),
            account_type: receiver.account.as_ref().and_then(|a| non_empty(&a.type_)),
        },
        sender: SlipSender {
            name_th: sender.name.as_ref().and_then(|n| non_empty(&n.th)),
            name_en: sender.name.as_ref().and_then(|n| non_empty(&n.en)),
            account_number: sender.account.as_ref().and_then(|a| non_empty(&a.number)),
        },
        raw_payload: raw.clone(),
    })
}

/// Accepts JSON numbers and numeric strings ("1,500.00" included).
pub fn decimal_from_json(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(number) => BigDecimal::from_str(&number.to_string()).ok(),
        Value::String(text) => BigDecimal::from_str(&text.trim().replace(',', "")).ok(),
        _ => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
