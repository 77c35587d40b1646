use regex::Regex;

use crate::locale::{Chip, Locale};

const SERVICE_VOCABULARY: &str =
    r"(?i)خدم|سعر|تكلف|كم|باقة|عرض|service|pric|cost|how\s+much|package|offer";
const ORDER_VOCABULARY: &str = r"(?i)طلب|متابع|تتبع|order|track|follow[\s-]*up";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickReplySet {
    ResolvedOrder,
    ServiceInquiry,
    OrderInquiry,
    OrderNotFound,
}

impl QuickReplySet {
    pub fn chips(&self) -> &'static [Chip] {
        use Chip::*;

        match self {
            Self::ResolvedOrder => &[FollowUpOrder, ContactSupport, ReturnPolicy],
            Self::ServiceInquiry => &[Requirements, TurnaroundTime, DeliveryMethod],
            Self::OrderInquiry => &[FollowUpOrder, ContactSupport],
            Self::OrderNotFound => &[ContactSupport, FollowUpOrder],
        }
    }

    pub fn labels(&self, locale: Locale) -> Vec<String> {
        self.chips().iter().map(|chip| locale.chip(*chip).to_string()).collect()
    }
}

/// Picks follow-up chips for a reply. `None` means the widget keeps its default chips.
#[derive(Clone, Debug)]
pub struct QuickReplySelector {
    locale: Locale,
    service: Regex,
    order: Regex,
}

impl QuickReplySelector {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            service: Regex::new(SERVICE_VOCABULARY).expect("service vocabulary is valid"),
            order: Regex::new(ORDER_VOCABULARY).expect("order vocabulary is valid"),
        }
    }

    pub fn classify(&self, text: &str, resolved_order: bool) -> Option<QuickReplySet> {
        if resolved_order {
            Some(QuickReplySet::ResolvedOrder)
        } else if self.service.is_match(text) {
            Some(QuickReplySet::ServiceInquiry)
        } else if self.order.is_match(text) {
            Some(QuickReplySet::OrderInquiry)
        } else {
            None
        }
    }

    pub fn select(&self, text: &str, resolved_order: bool) -> Option<Vec<String>> {
        self.classify(text, resolved_order).map(|set| set.labels(self.locale))
    }

    pub fn labels(&self, set: QuickReplySet) -> Vec<String> {
        set.labels(self.locale)
    }
}

#[cfg(test)]
mod tests {
    use crate::locale::Locale;

    use super::{QuickReplySelector, QuickReplySet};

    #[test]
    fn resolved_order_always_gets_the_order_triple() {
        let selector = QuickReplySelector::new(Locale::Arabic);
        let expected = vec![
            "متابعة الطلب".to_string(),
            "التواصل مع الدعم".to_string(),
            "سياسة الاسترجاع".to_string(),
        ];
        for text in ["كم سعر الخدمة؟", "hello", "", "order 12345"] {
            assert_eq!(selector.select(text, true), Some(expected.clone()));
        }
    }

    #[test]
    fn pricing_questions_get_service_chips() {
        let selector = QuickReplySelector::new(Locale::Arabic);
        assert_eq!(
            selector.select("كم سعر الخدمة؟", false),
            Some(vec![
                "وش المتطلبات؟".to_string(),
                "مدة التنفيذ".to_string(),
                "طريقة التسليم".to_string(),
            ])
        );
        assert_eq!(
            selector.classify("How much does the logo package cost?", false),
            Some(QuickReplySet::ServiceInquiry)
        );
    }

    #[test]
    fn service_vocabulary_takes_priority_over_order_vocabulary() {
        let selector = QuickReplySelector::new(Locale::English);
        assert_eq!(
            selector.classify("what is the price to track my order", false),
            Some(QuickReplySet::ServiceInquiry)
        );
    }

    #[test]
    fn order_questions_get_order_chips() {
        let selector = QuickReplySelector::new(Locale::English);
        assert_eq!(
            selector.select("I want to follow up on my order", false),
            Some(vec!["Follow up on order".to_string(), "Contact support".to_string()])
        );
        assert_eq!(selector.classify("وين وصل طلبي", false), Some(QuickReplySet::OrderInquiry));
    }

    #[test]
    fn unrelated_text_defers_to_widget_defaults() {
        let selector = QuickReplySelector::new(Locale::English);
        assert_eq!(selector.select("hello there", false), None);
    }

    #[test]
    fn not_found_set_leads_with_support() {
        assert_eq!(
            QuickReplySet::OrderNotFound.labels(Locale::Arabic),
            vec!["التواصل مع الدعم".to_string(), "متابعة الطلب".to_string()]
        );
    }
}
