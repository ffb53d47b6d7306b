//! Outbound message bodies for the Messaging API.

use serde::{Deserialize, Serialize};

/// One message in a reply, push, or multicast request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    Sticker {
        #[serde(rename = "packageId")]
        package_id: String,
        #[serde(rename = "stickerId")]
        sticker_id: String,
    },
    Template {
        #[serde(rename = "altText")]
        alt_text: String,
        template: Template,
    },
}

impl OutboundMessage {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn sticker(package_id: impl Into<String>, sticker_id: impl Into<String>) -> Self {
        Self::Sticker {
            package_id: package_id.into(),
            sticker_id: sticker_id.into(),
        }
    }

    #[must_use]
    pub fn buttons(alt_text: impl Into<String>, text: impl Into<String>, actions: Vec<Action>) -> Self {
        Self::Template {
            alt_text: alt_text.into(),
            template: Template::Buttons {
                title: None,
                text: text.into(),
                actions,
            },
        }
    }

    /// Text body, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Template {
    Buttons {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
        actions: Vec<Action>,
    },
}

/// Tap action attached to a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Message { label: String, text: String },
    Postback {
        label: String,
        data: String,
        #[serde(
            rename = "displayText",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        display_text: Option<String>,
    },
    Uri { label: String, uri: String },
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn text_wire_shape() {
        let value = serde_json::to_value(OutboundMessage::text("hi")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn sticker_wire_shape() {
        let value = serde_json::to_value(OutboundMessage::sticker("1", "1")).unwrap();
        assert_eq!(
            value,
            json!({"type": "sticker", "packageId": "1", "stickerId": "1"})
        );
    }

    #[test]
    fn buttons_template_wire_shape() {
        let message = OutboundMessage::buttons("menu", "Pick one", vec![
            Action::Message {
                label: "Hello".into(),
                text: "hello".into(),
            },
            Action::Postback {
                label: "Buy".into(),
                data: "action=buy".into(),
                display_text: None,
            },
            Action::Uri {
                label: "Docs".into(),
                uri: "https://developers.line.biz".into(),
            },
        ]);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "template");
        assert_eq!(value["altText"], "menu");
        assert_eq!(value["template"]["type"], "buttons");
        assert!(value["template"].get("title").is_none());
        assert_eq!(value["template"]["actions"][1], json!({
            "type": "postback", "label": "Buy", "data": "action=buy"
        }));
        assert_eq!(value["template"]["actions"][2]["type"], "uri");
    }
}
