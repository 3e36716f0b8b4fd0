use unicode_normalization::UnicodeNormalization;

use crate::language::is_cjk;

pub trait Preprocessor {
    // Default: line endings, whitespace runs, NFC
    fn process(&self, text: &str) -> String {
        let text = unify_line_endings(text);

        let lines: Vec<String> = text
            .split('\n')
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();

        lines.join("\n").trim().nfc().collect()
    }
}

/// Selected or typed text
pub struct TextPreprocessor;
impl Preprocessor for TextPreprocessor {}

/// Recognizer output: wrapped lines are rejoined, paragraph breaks kept
pub struct OcrPreprocessor;

impl Preprocessor for OcrPreprocessor {
    fn process(&self, text: &str) -> String {
        let text = unify_line_endings(text);

        let mut out = String::with_capacity(text.len());
        let mut paragraph_break = false;

        for line in text.split('\n') {
            let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if line.is_empty() {
                paragraph_break = !out.is_empty();
                continue;
            }

            if !out.is_empty() {
                if paragraph_break {
                    out.push('\n');
                } else if !joins_tightly(out.chars().last(), line.chars().next()) {
                    out.push(' ');
                }
            }
            out.push_str(&line);
            paragraph_break = false;
        }

        out.nfc().collect()
    }
}

fn unify_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// CJK text has no spaces between words
fn joins_tightly(prev: Option<char>, next: Option<char>) -> bool {
    matches!((prev, next), (Some(a), Some(b)) if is_cjk(a) && is_cjk(b))
}

/// Cleanup of translator output: stray spacing around CJK text
pub fn tidy_translation(text: &str) -> String {
    let text = text.replace('\u{00a0}', " ");
    let chars: Vec<char> = text.chars().collect();

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == ' ' || ch == '\t' {
            let start = i;
            while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                i += 1;
            }
            let prev = start.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i).copied();
            if !joins_tightly(prev, next) {
                out.push(' ');
            }
            continue;
        }
        out.push(ch);
        i += 1;
    }

    out.trim().to_string()
}
