use flashtrans_types::{LanguageCode, TargetLanguage};

/// CJK unified ideographs (basic block and extension A)
pub fn is_cjk(ch: char) -> bool {
    matches!(ch, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}')
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Resolve `Auto` against the text being translated
///
/// Chinese text goes to English, anything else to Chinese.
pub fn resolve_target(target: &TargetLanguage, text: &str) -> LanguageCode {
    match target {
        TargetLanguage::Fixed(code) => code.clone(),
        TargetLanguage::Auto if contains_cjk(text) => "en".to_string(),
        TargetLanguage::Auto => "zh".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_target() {
        assert_eq!(resolve_target(&TargetLanguage::Auto, "hello"), "zh");
        assert_eq!(resolve_target(&TargetLanguage::Auto, "你好 world"), "en");
        assert_eq!(resolve_target(&TargetLanguage::Auto, "こんにちは"), "zh");
    }

    #[test]
    fn test_fixed_target_wins() {
        let target = TargetLanguage::Fixed("ja".into());
        assert_eq!(resolve_target(&target, "你好"), "ja");
    }
}
