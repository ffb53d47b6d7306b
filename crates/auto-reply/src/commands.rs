//! Ordered text-command table.
//!
//! Rules are tried in insertion order and the first match wins. The fallback
//! is supplied at construction, so resolution is total over every input.

use {
    chrono::{DateTime, Utc},
    linebot_line::OutboundMessage,
};

pub const GREETING_REPLY: &str = "你好！有什麼可以幫助你的嗎？";
pub const HELP_REPLY: &str = "可用指令：\n• hello - 打招呼\n• help - 顯示說明\n• time - 顯示目前時間\n• sticker - 發送貼圖";
pub const FALLBACK_REPLY: &str = "我不太理解你的意思，試試輸入 'help' 查看可用指令。";
pub const ECHO_LABEL: &str = "回音：";

/// Sticker sent for the sticker command.
pub const STICKER_PACKAGE_ID: &str = "1";
pub const STICKER_ID: &str = "1";

/// What a producer sees when its rule fires.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// The trimmed message text.
    pub text: &'a str,
    /// Captured argument: the remainder after a prefix, or the whole text.
    pub argument: &'a str,
    pub now: DateTime<Utc>,
}

type Matcher = Box<dyn for<'t> Fn(&'t str) -> Option<&'t str> + Send + Sync>;
type Producer = Box<dyn Fn(&Invocation<'_>) -> OutboundMessage + Send + Sync>;

/// A named (predicate, response) pair.
pub struct Rule {
    name: &'static str,
    matcher: Matcher,
    producer: Producer,
}

impl Rule {
    pub fn new<M, P>(name: &'static str, matcher: M, producer: P) -> Self
    where
        M: for<'t> Fn(&'t str) -> Option<&'t str> + Send + Sync + 'static,
        P: Fn(&Invocation<'_>) -> OutboundMessage + Send + Sync + 'static,
    {
        Self {
            name,
            matcher: Box::new(matcher),
            producer: Box::new(producer),
        }
    }

    /// Fires when the text equals one of `aliases`, ignoring case.
    pub fn aliases<P>(name: &'static str, aliases: &'static [&'static str], producer: P) -> Self
    where
        P: Fn(&Invocation<'_>) -> OutboundMessage + Send + Sync + 'static,
    {
        Self::new(
            name,
            move |text| {
                let lowered = text.to_lowercase();
                aliases
                    .iter()
                    .any(|alias| alias.to_lowercase() == lowered)
                    .then_some(text)
            },
            producer,
        )
    }

    /// Fires when the text starts with one of `prefixes` (ASCII case ignored);
    /// the remainder becomes the argument.
    pub fn prefixes<P>(name: &'static str, prefixes: &'static [&'static str], producer: P) -> Self
    where
        P: Fn(&Invocation<'_>) -> OutboundMessage + Send + Sync + 'static,
    {
        Self::new(
            name,
            move |text| prefixes.iter().find_map(|prefix| strip_prefix_ignore_case(text, prefix)),
            producer,
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Outcome of resolving one text against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Name of the rule that fired, `"fallback"` when none did.
    pub rule: &'static str,
    pub message: OutboundMessage,
}

pub struct CommandTable {
    rules: Vec<Rule>,
    fallback: Producer,
}

impl CommandTable {
    pub fn new<P>(fallback: P) -> Self
    where
        P: Fn(&Invocation<'_>) -> OutboundMessage + Send + Sync + 'static,
    {
        Self {
            rules: Vec::new(),
            fallback: Box::new(fallback),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(Rule::name)
    }

    /// Resolve `text` (trimmed here) to exactly one reply message.
    #[must_use]
    pub fn resolve(&self, text: &str, now: DateTime<Utc>) -> Resolution {
        let text = text.trim();
        for rule in &self.rules {
            if let Some(argument) = (rule.matcher)(text) {
                let invocation = Invocation {
                    text,
                    argument,
                    now,
                };
                return Resolution {
                    rule: rule.name,
                    message: (rule.producer)(&invocation),
                };
            }
        }
        let invocation = Invocation {
            text,
            argument: text,
            now,
        };
        Resolution {
            rule: "fallback",
            message: (self.fallback)(&invocation),
        }
    }
}

impl Default for CommandTable {
    /// Greeting, help, time, sticker, echo, then fallback.
    fn default() -> Self {
        Self::new(|_| OutboundMessage::text(FALLBACK_REPLY))
            .with_rule(Rule::aliases(
                "greeting",
                &["hello", "hi", "你好", "哈囉"],
                |_| OutboundMessage::text(GREETING_REPLY),
            ))
            .with_rule(Rule::aliases("help", &["help", "幫助", "說明"], |_| {
                OutboundMessage::text(HELP_REPLY)
            }))
            .with_rule(Rule::aliases("time", &["time", "時間"], |inv| {
                OutboundMessage::text(format!(
                    "目前時間：{}",
                    inv.now.format("%Y-%m-%d %H:%M:%S UTC")
                ))
            }))
            .with_rule(Rule::aliases("sticker", &["sticker", "貼圖"], |_| {
                OutboundMessage::sticker(STICKER_PACKAGE_ID, STICKER_ID)
            }))
            .with_rule(Rule::prefixes("echo", &["echo ", "回音 "], |inv| {
                OutboundMessage::text(format!("{ECHO_LABEL}{}", inv.argument))
            }))
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
