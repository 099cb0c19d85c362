//! Response decoding: pull one logical payload out of a result envelope.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DecodeError, HarnessError, Result};
use crate::mcp::{ContentItem, ToolCallResult};

impl ContentItem {
    /// Inner text of an embedded text resource; `None` for other items and
    /// for binary resources.
    pub fn resource_text(&self) -> Option<&str> {
        match self {
            ContentItem::Resource { resource } => resource_text(resource),
            _ => None,
        }
    }
}

/// `textResourceContents.text`, falling back to the flat wire form `text`.
fn resource_text(resource: &Value) -> Option<&str> {
    resource
        .get("textResourceContents")
        .unwrap_or(resource)
        .get("text")
        .and_then(Value::as_str)
}

impl ToolCallResult {
    /// Raw text of the single content item.
    pub fn decode_text(&self) -> std::result::Result<&str, DecodeError> {
        self.expect_len(1)?;
        match &self.content[0] {
            ContentItem::Text { text } => Ok(text),
            other => Err(DecodeError::ContentKind {
                index: 0,
                expected: "text",
                actual: other.kind(),
            }),
        }
    }

    /// Parse the single text item as JSON into `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> std::result::Result<T, DecodeError> {
        let text = self.decode_text()?;
        Ok(serde_json::from_str(text)?)
    }

    /// Inner text of the embedded resource in a two-item result.
    ///
    /// Accepts `resource.textResourceContents.text` and the flat MCP wire
    /// form `resource.text`.
    pub fn embedded_text_resource(&self) -> std::result::Result<&str, DecodeError> {
        self.expect_len(2)?;
        let resource = match &self.content[1] {
            ContentItem::Resource { resource } => resource,
            other => {
                return Err(DecodeError::ContentKind {
                    index: 1,
                    expected: "resource",
                    actual: other.kind(),
                })
            }
        };

        resource_text(resource)
            .ok_or_else(|| DecodeError::MissingField("resource.textResourceContents.text".into()))
    }

    /// The single text item must equal `expected`.
    pub fn assert_text_eq(&self, expected: &str) -> Result<()> {
        let text = self.decode_text()?;
        if text != expected {
            return Err(HarnessError::Assertion(format!(
                "expected text content to match: expected {expected:?}, got {text:?}"
            )));
        }
        Ok(())
    }

    /// The single text item must contain `needle`.
    pub fn assert_contains(&self, needle: &str) -> Result<()> {
        let text = self.decode_text()?;
        if !text.contains(needle) {
            return Err(HarnessError::Assertion(format!(
                "expected content to contain {needle:?}"
            )));
        }
        Ok(())
    }

    /// The single text item must be a JSON array of `expected` elements.
    pub fn assert_array_len(&self, expected: usize) -> Result<()> {
        let items: Vec<Value> = self.decode_json()?;
        if items.len() != expected {
            return Err(HarnessError::Assertion(format!(
                "expected array to have {expected} element(s), got {}",
                items.len()
            )));
        }
        Ok(())
    }

    fn expect_len(&self, expected: usize) -> std::result::Result<(), DecodeError> {
        if self.content.len() != expected {
            return Err(DecodeError::ContentCount {
                expected,
                actual: self.content.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct User {
        login: String,
    }

    #[test]
    fn decode_json_single_item() {
        let result = ToolCallResult::json(&json!({"login": "octocat", "id": 1}));
        let user: User = result.decode_json().unwrap();
        assert_eq!(user.login, "octocat");
    }

    #[test]
    fn decode_json_rejects_two_items() {
        let result = ToolCallResult::with_text_resource("ok", "repo://f", "body");
        let err = result.decode_json::<User>().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ContentCount {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn decode_json_rejects_invalid_json() {
        let result = ToolCallResult::text("not json");
        assert!(matches!(
            result.decode_json::<User>(),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn decode_text_rejects_resource_item() {
        let result = ToolCallResult {
            content: vec![ContentItem::Resource {
                resource: json!({"text": "x"}),
            }],
            is_error: false,
        };
        assert!(matches!(
            result.decode_text(),
            Err(DecodeError::ContentKind { index: 0, .. })
        ));
    }

    #[test]
    fn embedded_resource_nested_shape() {
        let result = ToolCallResult {
            content: vec![
                ContentItem::Text { text: "ok".into() },
                ContentItem::Resource {
                    resource: json!({"textResourceContents": {"uri": "repo://f", "text": "nested"}}),
                },
            ],
            is_error: false,
        };
        assert_eq!(result.embedded_text_resource().unwrap(), "nested");
    }

    #[test]
    fn embedded_resource_flat_shape() {
        let result = ToolCallResult::with_text_resource("ok", "repo://f", "flat body\n");
        assert_eq!(result.embedded_text_resource().unwrap(), "flat body\n");
    }

    #[test]
    fn embedded_resource_missing_text_is_contract_violation() {
        let result = ToolCallResult {
            content: vec![
                ContentItem::Text { text: "ok".into() },
                ContentItem::Resource {
                    resource: json!({"uri": "repo://f", "blob": "AAAA"}),
                },
            ],
            is_error: false,
        };
        assert!(matches!(
            result.embedded_text_resource(),
            Err(DecodeError::MissingField(_))
        ));
    }

    #[test]
    fn resource_text_reads_both_shapes() {
        let nested = ContentItem::Resource {
            resource: json!({"textResourceContents": {"uri": "repo://f", "text": "nested"}}),
        };
        let flat = ContentItem::Resource {
            resource: json!({"uri": "repo://f", "text": "flat"}),
        };
        let blob = ContentItem::Resource {
            resource: json!({"uri": "repo://f", "blob": "AAAA"}),
        };
        assert_eq!(nested.resource_text(), Some("nested"));
        assert_eq!(flat.resource_text(), Some("flat"));
        assert_eq!(blob.resource_text(), None);
        assert_eq!(ContentItem::Text { text: "t".into() }.resource_text(), None);
    }

    #[test]
    fn embedded_resource_requires_resource_kind() {
        let result = ToolCallResult {
            content: vec![
                ContentItem::Text { text: "a".into() },
                ContentItem::Text { text: "b".into() },
            ],
            is_error: false,
        };
        assert!(matches!(
            result.embedded_text_resource(),
            Err(DecodeError::ContentKind { index: 1, .. })
        ));
    }

    #[test]
    fn assertion_helpers() {
        let result = ToolCallResult::json(&json!([1, 2, 3]));
        result.assert_array_len(3).unwrap();
        assert!(result.assert_array_len(2).is_err());
        result.assert_contains("2,").unwrap();
        assert!(ToolCallResult::text("hi").assert_text_eq("hi").is_ok());
        assert!(ToolCallResult::text("hi").assert_text_eq("ho").is_err());
    }
}
