use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRail {
    Bank,
    Qr,
    Card,
}

impl PaymentRail {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRail::Bank => "bank",
            PaymentRail::Qr => "qr",
            PaymentRail::Card => "card",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "bank" => Some(PaymentRail::Bank),
            "qr" => Some(PaymentRail::Qr),
            "card" => Some(PaymentRail::Card),
            _ => None,
        }
    }

    /// Label shown on the donor's history when the rail gives us nothing better.
    pub fn default_status_label(&self) -> &'static str {
        match self {
            PaymentRail::Bank => "Bank transfer (slip verified)",
            PaymentRail::Qr => "PromptPay QR",
            PaymentRail::Card => "Card payment",
        }
    }
}

impl Display for PaymentRail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
