use flashtrans_types::{ChatPrompt, ChatRole};
use serde::Serialize;

const TRANSLATE_SYSTEM: &str = "You are a professional translator. Return only the translation.";
const CHAT_SYSTEM: &str =
    "You are a helpful assistant. Answer in Chinese unless the user explicitly requests another language.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    fn new(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub(crate) fn translation_messages(text: &str, to: &str) -> Vec<Message> {
    let mut system = TRANSLATE_SYSTEM.to_string();
    if !to.is_empty() && to != "auto" {
        system.push_str(&format!(" Target language: {}.", to));
    }
    vec![Message::new("system", system), Message::new("user", text)]
}

pub(crate) fn chat_messages(prompt: &ChatPrompt) -> Vec<Message> {
    let mut system = CHAT_SYSTEM.to_string();
    let context = prompt.context.as_deref().map(str::trim).unwrap_or_default();
    if !context.is_empty() {
        system.push_str("\n\n[Context]\n");
        system.push_str(context);
    }

    let mut messages = vec![Message::new("system", system)];
    messages.extend(prompt.history.iter().map(|turn| {
        let role = match turn.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        Message::new(role, turn.content.clone())
    }));
    messages.push(Message::new("user", prompt.question.trim()));
    messages
}

/// Remove `<think>...</think>` blocks emitted by reasoning models
pub fn strip_think(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let lower = rest.to_ascii_lowercase();
        let Some(start) = lower.find("<think>") else {
            out.push_str(rest);
            break;
        };
        let Some(end) = lower[start..].find("</think>") else {
            // Unterminated block is kept as-is
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + end + "</think>".len()..];
    }

    out.trim().to_string()
}

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Hides `<think>...</think>` spans from a stream of answer fragments
///
/// Tags may be split across fragments; a possible tag prefix at the end of a
/// fragment is held back until the next one decides it.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    inside: bool,
    pending: String,
}

impl ThinkFilter {
    /// Visible text of `fragment`
    pub fn push(&mut self, fragment: &str) -> String {
        self.pending.push_str(fragment);
        let mut visible = String::new();

        loop {
            let tag = if self.inside { THINK_CLOSE } else { THINK_OPEN };
            let lower = self.pending.to_ascii_lowercase();

            if let Some(pos) = lower.find(tag) {
                if !self.inside {
                    visible.push_str(&self.pending[..pos]);
                }
                self.pending.drain(..pos + tag.len());
                self.inside = !self.inside;
                continue;
            }

            let split = self.pending.len() - tag_prefix_len(&lower, tag);
            if !self.inside {
                visible.push_str(&self.pending[..split]);
            }
            self.pending.drain(..split);
            return visible;
        }
    }

    /// Text held back when the stream ends
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        if self.inside { String::new() } else { rest }
    }

    pub fn is_thinking(&self) -> bool {
        self.inside
    }
}

/// Length of the longest proper prefix of `tag` that `text` ends with
fn tag_prefix_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| text.ends_with(&tag[..n]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use flashtrans_types::ChatTurn;

    use super::*;

    #[test]
    fn test_strip_think() {
        assert_eq!(strip_think("<think>hmm\nok</think>\n你好"), "你好");
        assert_eq!(strip_think("a <THINK>x</THINK> b"), "a  b");
        assert_eq!(strip_think("plain"), "plain");
        assert_eq!(strip_think("<think>open"), "<think>open");
    }

    fn filtered(fragments: &[&str]) -> Vec<String> {
        let mut filter = ThinkFilter::default();
        let mut out: Vec<String> = fragments.iter().map(|f| filter.push(f)).collect();
        out.push(filter.finish());
        out
    }

    #[test]
    fn test_think_filter_hides_whole_spans() {
        assert_eq!(
            filtered(&["<think>", "plan", "</think>", "answer"]),
            vec!["", "", "", "answer", ""]
        );
        assert_eq!(
            filtered(&["a <THINK>x</THINK> b"]).concat(),
            "a  b"
        );
    }

    #[test]
    fn test_think_filter_handles_split_tags() {
        let out = filtered(&["ok <th", "ink>sec", "ret</thi", "nk> done <", "3"]);
        assert_eq!(out, vec!["ok ", "", "", " done ", "<3", ""]);
    }

    #[test]
    fn test_think_filter_drops_unterminated_span() {
        let mut filter = ThinkFilter::default();
        assert_eq!(filter.push("hi <think>still going"), "hi ");
        assert!(filter.is_thinking());
        assert_eq!(filter.finish(), "");
    }

    #[test]
    fn test_translation_messages_target() {
        let messages = translation_messages("hello", "zh");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.ends_with("Target language: zh."));
        assert_eq!(messages[1].content, "hello");

        let auto = translation_messages("hello", "auto");
        assert_eq!(auto[0].content, TRANSLATE_SYSTEM);
    }

    #[test]
    fn test_chat_messages_include_context_and_history() {
        let prompt = ChatPrompt {
            question: " why? ".into(),
            context: Some("[Source] 你好\n[Translation] hello".into()),
            history: vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")],
        };
        let messages = chat_messages(&prompt);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert!(messages[0].content.contains("[Context]\n[Source] 你好"));
        assert_eq!(messages[3].content, "why?");
    }
}
