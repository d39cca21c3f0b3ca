//! Messages sent to the background worker by the settings UI and the
//! challenge page.

use log::debug;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use sb_core::overrides::parse_expiry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    /// Lists or settings changed; recompile.
    #[serde(rename = "updateRules")]
    UpdateRules,
    /// A challenge was passed for `domain`.
    #[serde(rename = "setTempUnblock", rename_all = "camelCase")]
    SetTempUnblock {
        domain: String,
        /// Epoch ms; JS may send a fractional number.
        #[serde(deserialize_with = "deserialize_expiry")]
        unblock_until: i64,
    },
}

/// Same leniency as expiries read back from storage.
fn deserialize_expiry<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_expiry(&value).ok_or_else(|| de::Error::custom(format!("invalid expiry {value}")))
}

impl Message {
    /// Decode a raw message. Unknown actions and malformed payloads yield
    /// `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| debug!("Ignoring message {value}: {e}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_messages() {
        assert_eq!(
            Message::from_value(&json!({ "action": "updateRules" })),
            Some(Message::UpdateRules)
        );
        assert_eq!(
            Message::from_value(&json!({
                "action": "setTempUnblock",
                "domain": "example.com",
                "unblockUntil": 1_700_000_600_000i64
            })),
            Some(Message::SetTempUnblock {
                domain: "example.com".into(),
                unblock_until: 1_700_000_600_000,
            })
        );
    }

    #[test]
    fn test_fractional_expiry_accepted() {
        assert_eq!(
            Message::from_value(&json!({
                "action": "setTempUnblock",
                "domain": "example.com",
                "unblockUntil": 1_718_798_430_000.5
            })),
            Some(Message::SetTempUnblock {
                domain: "example.com".into(),
                unblock_until: 1_718_798_430_000,
            })
        );
        assert_eq!(
            Message::from_value(&json!({
                "action": "setTempUnblock",
                "domain": "example.com",
                "unblockUntil": "soon"
            })),
            None
        );
    }

    #[test]
    fn test_unknown_or_malformed() {
        assert_eq!(Message::from_value(&json!({ "action": "getQuestions" })), None);
        assert_eq!(Message::from_value(&json!({ "action": "setTempUnblock" })), None);
        assert_eq!(Message::from_value(&json!("updateRules")), None);
    }
}
