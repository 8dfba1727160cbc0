use serde::{Deserialize, Serialize};

use super::slip_verifications::SlipReceiver;

/// The foundation's own payee identity, used to check who a slip was paid to.
///
/// Matching is deliberately permissive because OCR output is noisy: a slip is
/// accepted when the receiver NAME matches, OR when the receiver ACCOUNT
/// matches (number plus account-type tag). Either side alone is enough.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifiedReceiverIdentity {
    /// Full payee names, Thai and English.
    pub names: Vec<String>,
    /// Fragments that a truncated or OCR-mangled name still contains.
    pub partial_names: Vec<String>,
    pub account_numbers: Vec<String>,
    /// Digit runs that survive masking such as `xxx-x-x1965-x`.
    pub account_fragments: Vec<String>,
    pub account_type: String,
}

impl VerifiedReceiverIdentity {
    pub fn matches(&self, receiver: &SlipReceiver) -> bool {
        self.name_matches(receiver) || self.account_matches(receiver)
    }

    pub fn name_matches(&self, receiver: &SlipReceiver) -> bool {
        [receiver.name_th.as_deref(), receiver.name_en.as_deref()]
            .into_iter()
            .flatten()
            .map(normalize_name)
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| {
                self.names
                    .iter()
                    .any(|known| normalize_name(known) == candidate)
                    || self
                        .partial_names
                        .iter()
                        .map(|partial| normalize_name(partial))
                        .any(|partial| !partial.is_empty() && candidate.contains(&partial))
            })
    }

    pub fn account_matches(&self, receiver: &SlipReceiver) -> bool {
        let type_matches = receiver
            .account_type
            .as_deref()
            .is_some_and(|tag| tag.trim().eq_ignore_ascii_case(self.account_type.trim()));
        if !type_matches {
            return false;
        }

        let Some(number) = receiver.account_number.as_deref() else {
            return false;
        };
        let declared = digits(number);
        if declared.is_empty() {
            return false;
        }

        self.account_numbers
            .iter()
            .any(|known| digits(known) == declared)
            || self
                .account_fragments
                .iter()
                .map(|fragment| digits(fragment))
                .any(|fragment| !fragment.is_empty() && declared.contains(&fragment))
    }
}

fn normalize_name(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}
