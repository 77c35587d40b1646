//! Order-number detection in free customer text.
//!
//! Detection is a prioritized list of [`IntentRule`]s; the first rule that yields a digit run
//! wins. Vocabulary is bilingual (Arabic and English) regardless of the configured locale.
//!
//! Rules anchored on explicit order vocabulary accept runs of 4+ digits. The vocabulary
//! fallback only accepts standalone runs of 5+ digits, so that prices, dates and short phone
//! fragments in unrelated questions are not mistaken for order numbers.

use std::borrow::Cow;

use regex::Regex;

pub const ANCHORED_MIN_DIGITS: usize = 4;
pub const FALLBACK_MIN_DIGITS: usize = 5;

const EXPLICIT_CUE: &str = r"(?i)(?:رقم\s*طلب(?:ي)?|طلب\s*(?:رقم|#)?|رقم\s*(?:ال)?طلب|\border\s*(?:number|num\.?|no\.?)?\s*#?|\btracking\s*(?:number|no\.?)?\s*#?|#)\s*([0-9]{4,})";
const ORDER_WORD: &str = r"(?i)(?:طلبي|طلب|\bmy\s+order|\border)\s+([0-9]{4,})";
const TRACKING_PHRASE: &str = r"(?i)(?:متابعة|تتبع|حالة|\bfollow[\s-]*up(?:\s+on)?|\btrack(?:ing)?|\bstatus(?:\s+of)?)\s+(?:(?:my\s+|the\s+)?(?:طلب|order)\s*)?#?\s*([0-9]{4,})";
const ORDER_VOCABULARY: &str = r"(?i)طلب|order|متابعة|تتبع|حالة|track|status|follow[\s-]*up";
const DIGIT_RUN: &str = r"[0-9]+";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    OrderLookup { order_number: String },
    FreeForm,
}

#[derive(Clone, Debug)]
enum RuleMatcher {
    /// Capture group 1 is the order number.
    Capture(Regex),
    /// Vocabulary anywhere in the text plus a standalone digit run of at least `min_digits`.
    Contextual { vocabulary: Regex, digit_run: Regex, min_digits: usize },
}

#[derive(Clone, Debug)]
pub struct IntentRule {
    name: &'static str,
    matcher: RuleMatcher,
}

impl IntentRule {
    /// "order number 1234", "رقم طلبي 1234", "order #1234", "tracking 1234", "#1234".
    pub fn explicit_cue() -> Self {
        Self::capture("explicit_cue", EXPLICIT_CUE)
    }

    /// "my order 1234", "طلبي 1234", "طلب 1234".
    pub fn order_word() -> Self {
        Self::capture("order_word", ORDER_WORD)
    }

    /// "follow up on order #1234", "status of 1234", "متابعة طلب 1234".
    pub fn tracking_phrase() -> Self {
        Self::capture("tracking_phrase", TRACKING_PHRASE)
    }

    /// Order vocabulary somewhere in the text plus a standalone 5+ digit run anywhere.
    pub fn vocabulary_fallback() -> Self {
        Self {
            name: "vocabulary_fallback",
            matcher: RuleMatcher::Contextual {
                vocabulary: compile(ORDER_VOCABULARY),
                digit_run: compile(DIGIT_RUN),
                min_digits: FALLBACK_MIN_DIGITS,
            },
        }
    }

    fn capture(name: &'static str, pattern: &str) -> Self {
        Self { name, matcher: RuleMatcher::Capture(compile(pattern)) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs this rule alone. Expects ASCII digits; see [`normalize_digits`].
    pub fn find(&self, text: &str) -> Option<String> {
        match &self.matcher {
            RuleMatcher::Capture(pattern) => pattern
                .captures(text)
                .and_then(|captures| captures.get(1))
                .map(|digits| digits.as_str().to_string()),
            RuleMatcher::Contextual { vocabulary, digit_run, min_digits } => {
                if !vocabulary.is_match(text) {
                    return None;
                }
                digit_run
                    .find_iter(text)
                    .filter(|run| run.as_str().len() >= *min_digits)
                    .find(|run| standalone(text, run.start(), run.end()))
                    .map(|run| run.as_str().to_string())
            }
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("intent rule patterns are valid")
}

/// Word-boundary check on ASCII word characters only, so Arabic letters glued to a number
/// still count as a boundary.
fn standalone(text: &str, start: usize, end: usize) -> bool {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}

/// Maps Arabic-Indic and Extended Arabic-Indic digits to ASCII.
pub fn normalize_digits(text: &str) -> Cow<'_, str> {
    let ascii = |c: char| match c {
        '\u{0660}'..='\u{0669}' => char::from_u32(c as u32 - 0x0660 + u32::from(b'0')),
        '\u{06F0}'..='\u{06F9}' => char::from_u32(c as u32 - 0x06F0 + u32::from(b'0')),
        _ => None,
    };

    if !text.chars().any(|c| ascii(c).is_some()) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().map(|c| ascii(c).unwrap_or(c)).collect())
}

#[derive(Clone, Debug)]
pub struct IntentExtractor {
    rules: Vec<IntentRule>,
}

impl Default for IntentExtractor {
    fn default() -> Self {
        Self::with_rules(vec![
            IntentRule::explicit_cue(),
            IntentRule::order_word(),
            IntentRule::tracking_phrase(),
            IntentRule::vocabulary_fallback(),
        ])
    }
}

impl IntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn extract_order_number(&self, text: &str) -> Option<String> {
        self.matching_rule(text).map(|(_, order_number)| order_number)
    }

    /// Like [`Self::extract_order_number`] but also names the rule that fired.
    pub fn matching_rule(&self, text: &str) -> Option<(&'static str, String)> {
        if text.trim().is_empty() {
            return None;
        }
        let normalized = normalize_digits(text);
        self.rules
            .iter()
            .find_map(|rule| rule.find(&normalized).map(|order_number| (rule.name(), order_number)))
    }

    pub fn classify(&self, text: &str) -> Intent {
        match self.extract_order_number(text) {
            Some(order_number) => Intent::OrderLookup { order_number },
            None => Intent::FreeForm,
        }
    }
}
