#![forbid(unsafe_code)]

use std::sync::OnceLock;

use mm_kernel_contracts::scenario::ResponseLabel;
use regex::Regex;

struct CasePatterns {
    case_1: Regex,
    case_2: Regex,
}

fn patterns() -> &'static CasePatterns {
    static PATTERNS: OnceLock<CasePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| CasePatterns {
        case_1: Regex::new(r"(?i)case\s?1").expect("case 1 pattern is a valid regex"),
        case_2: Regex::new(r"(?i)case\s?2").expect("case 2 pattern is a valid regex"),
    })
}

/// Maps a decision-maker reply to the case it names.
///
/// A reply naming exactly one case selects it; naming both or neither is
/// unparseable. An absent reply (decision-maker failure) is unparseable too.
pub fn classify(response: Option<&str>) -> ResponseLabel {
    match response {
        Some(text) => classify_text(text),
        None => ResponseLabel::Unparseable,
    }
}

pub fn classify_text(text: &str) -> ResponseLabel {
    let p = patterns();
    match (p.case_1.is_match(text), p.case_2.is_match(text)) {
        (true, false) => ResponseLabel::CaseOne,
        (false, true) => ResponseLabel::CaseTwo,
        _ => ResponseLabel::Unparseable,
    }
}
