//! Declarative rule definitions
//!
//! A rule is a disposable artifact: the whole set is regenerated on every
//! compile and serialized in the shape the browser's declarative
//! navigation API expects.

use serde::{Serialize, Serializer};

// =============================================================================
// Resource Types
// =============================================================================

bitflags::bitflags! {
    /// Resource types a rule applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceType: u8 {
        const MAIN_FRAME = 1 << 0;
        const SUB_FRAME = 1 << 1;

        /// Document navigations (main_frame + sub_frame)
        const DOCUMENT = Self::MAIN_FRAME.bits() | Self::SUB_FRAME.bits();
    }
}

impl ResourceType {
    const WIRE_NAMES: [(ResourceType, &'static str); 2] =
        [(Self::MAIN_FRAME, "main_frame"), (Self::SUB_FRAME, "sub_frame")];

    /// Browser names of the contained types.
    pub fn names(self) -> Vec<&'static str> {
        Self::WIRE_NAMES
            .iter()
            .filter(|(ty, _)| self.contains(*ty))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

// =============================================================================
// Declarative Rule
// =============================================================================

/// One static redirect rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarativeRule {
    pub id: u32,
    pub priority: u32,
    /// Host-anchored filter, e.g. `||example.com`.
    pub url_filter: String,
    pub resource_types: ResourceType,
    pub redirect_target: String,
}

#[derive(Serialize)]
struct WireRule<'a> {
    id: u32,
    priority: u32,
    action: WireAction<'a>,
    condition: WireCondition<'a>,
}

#[derive(Serialize)]
struct WireAction<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    redirect: WireRedirect<'a>,
}

#[derive(Serialize)]
struct WireRedirect<'a> {
    url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCondition<'a> {
    url_filter: &'a str,
    resource_types: ResourceType,
}

impl Serialize for DeclarativeRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRule {
            id: self.id,
            priority: self.priority,
            action: WireAction {
                kind: "redirect",
                redirect: WireRedirect {
                    url: &self.redirect_target,
                },
            },
            condition: WireCondition {
                url_filter: &self.url_filter,
                resource_types: self.resource_types,
            },
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_type_names() {
        assert_eq!(ResourceType::MAIN_FRAME.names(), vec!["main_frame"]);
        assert_eq!(ResourceType::DOCUMENT.names(), vec!["main_frame", "sub_frame"]);
    }

    #[test]
    fn test_rule_wire_shape() {
        let rule = DeclarativeRule {
            id: 3,
            priority: 1,
            url_filter: "||example.com".into(),
            resource_types: ResourceType::MAIN_FRAME,
            redirect_target: "chrome-extension://id/blocked-strict.html".into(),
        };
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "id": 3,
                "priority": 1,
                "action": {
                    "type": "redirect",
                    "redirect": { "url": "chrome-extension://id/blocked-strict.html" }
                },
                "condition": {
                    "urlFilter": "||example.com",
                    "resourceTypes": ["main_frame"]
                }
            })
        );
    }
}
