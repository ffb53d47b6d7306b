use std::sync::Arc;

use {
    linebot_line::{
        DeliveryRequest, Event, MessageContent, OutboundMessage, Source, redact::mask_id,
    },
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use linebot_metrics::{counter, labels, responder as responder_metrics};

use crate::{
    clock::{Clock, SystemClock},
    commands::CommandTable,
};

pub const FOLLOW_GREETING: &str = "歡迎使用 LINE Bot！";
pub const JOIN_GREETING: &str = "大家好！我是你們的 LINE Bot 助手！";
pub const STICKER_ACK: &str = "收到貼圖！";
pub const IMAGE_ACK: &str = "收到圖片！";
pub const MESSAGE_ACK: &str = "收到訊息！";
pub const INVALID_TEXT_REPLY: &str = "抱歉，您的訊息包含無效內容。";
pub const POSTBACK_ACK_PREFIX: &str = "收到 postback: ";

/// Inbound texts longer than this (in characters) are refused.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 1000;

/// Maps one inbound event to at most one reply.
///
/// Holds no per-event state: the same event and clock reading always yield
/// the same request.
pub struct Responder {
    table: CommandTable,
    clock: Arc<dyn Clock>,
    max_text_length: usize,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(CommandTable::default(), Arc::new(SystemClock))
    }
}

impl Responder {
    pub fn new(table: CommandTable, clock: Arc<dyn Clock>) -> Self {
        Self {
            table,
            clock,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }

    #[must_use]
    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    /// `None` when the event carries no reply token (unfollow, leave,
    /// unknown, standby-mode events).
    pub fn respond(&self, event: &Event) -> Option<DeliveryRequest> {
        let Some(reply_token) = event.reply_token() else {
            debug!(event_type = event.event_type(), "event has no reply token, nothing to send");
            return None;
        };

        let (rule, message) = match event {
            Event::Message(e) => self.answer_message(&e.message),
            Event::Follow(_) => ("follow", OutboundMessage::text(FOLLOW_GREETING)),
            Event::Join(_) => ("join", OutboundMessage::text(JOIN_GREETING)),
            Event::Postback(e) => (
                "postback",
                OutboundMessage::text(format!("{POSTBACK_ACK_PREFIX}{}", e.postback.data)),
            ),
            Event::Unfollow(_) | Event::Leave(_) | Event::Unknown(_) => return None,
        };

        debug!(
            event_type = event.event_type(),
            rule,
            source = event.source().map(Source::kind).unwrap_or_default(),
            user = %event.source().and_then(Source::user_id).map(mask_id).unwrap_or_default(),
            "reply selected"
        );
        #[cfg(feature = "metrics")]
        counter!(responder_metrics::REPLIES_TOTAL, labels::RULE => rule).increment(1);

        Some(DeliveryRequest::reply(reply_token.clone(), vec![message]))
    }

    fn answer_message(&self, content: &MessageContent) -> (&'static str, OutboundMessage) {
        match content {
            MessageContent::Text(m) => {
                if let Err(reason) = self.check_text(&m.text) {
                    warn!(reason, "refusing inbound text");
                    return ("invalid_text", OutboundMessage::text(INVALID_TEXT_REPLY));
                }
                let resolution = self.table.resolve(&m.text, self.clock.now());
                (resolution.rule, resolution.message)
            },
            MessageContent::Sticker(m) => {
                debug!(package_id = %m.package_id, sticker_id = %m.sticker_id, "sticker received");
                ("sticker_ack", OutboundMessage::text(STICKER_ACK))
            },
            MessageContent::Image(_) => ("image_ack", OutboundMessage::text(IMAGE_ACK)),
            MessageContent::Other(m) => {
                debug!(message_type = %m.raw_type, "unmodelled message type");
                ("message_ack", OutboundMessage::text(MESSAGE_ACK))
            },
        }
    }

    fn check_text(&self, text: &str) -> Result<(), &'static str> {
        if text.is_empty() {
            return Err("empty");
        }
        if text.chars().count() > self.max_text_length {
            return Err("too_long");
        }
        if text
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err("control_characters");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("table", &self.table)
            .field("max_text_length", &self.max_text_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::clock::FixedClock,
        chrono::{TimeZone, Utc},
        linebot_line::{ReplyToken, decode},
        serde_json::{Value, json},
    };

    fn responder() -> Responder {
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        Responder::new(CommandTable::default(), Arc::new(FixedClock(instant)))
    }

    fn event(value: Value) -> Event {
        let body = json!({"destination": "U1", "events": [value]}).to_string();
        decode(body.as_bytes()).unwrap().events.remove(0)
    }

    fn text_event(text: &str) -> Event {
        event(json!({
            "type": "message",
            "replyToken": "rt1",
            "message": {"type": "text", "text": text},
            "source": {"type": "user", "userId": "U1"}
        }))
    }

    fn reply(text: &str) -> Option<DeliveryRequest> {
        Some(DeliveryRequest::reply(ReplyToken::new("rt1"), vec![
            OutboundMessage::text(text),
        ]))
    }

    #[test]
    fn hello_scenario() {
        assert_eq!(
            responder().respond(&text_event("hello")),
            reply("你好！有什麼可以幫助你的嗎？")
        );
    }

    #[test]
    fn echo_scenario() {
        assert_eq!(responder().respond(&text_event("echo abc")), reply("回音：abc"));
    }

    #[test]
    fn time_reads_injected_clock() {
        assert_eq!(
            responder().respond(&text_event("時間")),
            reply("目前時間：2024-01-02 03:04:05 UTC")
        );
    }

    #[test]
    fn respond_is_pure() {
        let responder = responder();
        for text in ["hello", "time", "echo x", "sticker", "anything", ""] {
            let event = text_event(text);
            assert_eq!(responder.respond(&event), responder.respond(&event));
        }
    }

    #[test]
    fn every_text_gets_exactly_one_reply() {
        let responder = responder();
        for text in ["", " ", "?", "hello", "echo", "x".repeat(5000).as_str()] {
            let request = responder.respond(&text_event(text)).unwrap();
            assert_eq!(request.messages().len(), 1, "{text:?}");
            assert_eq!(request.api_name(), "reply");
        }
    }

    #[test]
    fn invalid_text_is_refused_before_commands() {
        let responder = responder().with_max_text_length(10);
        assert_eq!(
            responder.respond(&text_event("hello\u{0007}")),
            reply(INVALID_TEXT_REPLY)
        );
        assert_eq!(
            responder.respond(&text_event("echo 0123456789")),
            reply(INVALID_TEXT_REPLY)
        );
        assert_eq!(responder.respond(&text_event("")), reply(INVALID_TEXT_REPLY));
        // Newlines and tabs are fine.
        assert_eq!(responder.respond(&text_event("\thello\n")), reply(GREETING));
    }

    const GREETING: &str = crate::commands::GREETING_REPLY;

    #[test]
    fn follow_and_join_greet() {
        let source = json!({"type": "user", "userId": "U1"});
        assert_eq!(
            responder().respond(&event(
                json!({"type": "follow", "replyToken": "rt1", "source": source})
            )),
            reply(FOLLOW_GREETING)
        );
        assert_eq!(
            responder().respond(&event(json!({
                "type": "join", "replyToken": "rt1",
                "source": {"type": "group", "groupId": "G1"}
            }))),
            reply(JOIN_GREETING)
        );
    }

    #[test]
    fn acknowledgements() {
        let source = json!({"type": "user", "userId": "U1"});
        let cases = [
            (json!({"type": "sticker", "packageId": "11537", "stickerId": "52002734"}), STICKER_ACK),
            (json!({"type": "image", "id": "1", "contentProvider": {"type": "line"}}), IMAGE_ACK),
            (json!({"type": "audio", "id": "2", "duration": 60000}), MESSAGE_ACK),
        ];
        for (message, expected) in cases {
            let e = event(json!({
                "type": "message", "replyToken": "rt1", "message": message, "source": source
            }));
            assert_eq!(responder().respond(&e), reply(expected));
        }
    }

    #[test]
    fn postback_echoes_data() {
        let e = event(json!({
            "type": "postback", "replyToken": "rt1",
            "postback": {"data": "action=buy&itemid=111"},
            "source": {"type": "user", "userId": "U1"}
        }));
        assert_eq!(
            responder().respond(&e),
            reply("收到 postback: action=buy&itemid=111")
        );
    }

    #[test]
    fn events_without_token_produce_nothing() {
        let source = json!({"type": "user", "userId": "U1"});
        for value in [
            json!({"type": "unfollow", "source": source}),
            json!({"type": "leave", "source": {"type": "group", "groupId": "G1"}}),
            json!({"type": "memberJoined", "replyToken": "rt1"}),
            json!({"type": "message", "mode": "standby", "source": source,
                   "message": {"type": "text", "text": "hello"}}),
        ] {
            assert_eq!(responder().respond(&event(value.clone())), None, "{value}");
        }
    }
}
