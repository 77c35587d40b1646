//! Grounding instructions sent as the completion service's system block.

use crate::domain::chat::PageContext;
use crate::locale::Locale;

pub const DEFAULT_MAX_EXCERPT_CHARS: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptBuilder {
    locale: Locale,
    store_name: String,
    max_excerpt_chars: usize,
}

impl PromptBuilder {
    pub fn new(locale: Locale, store_name: impl Into<String>) -> Self {
        Self { locale, store_name: store_name.into(), max_excerpt_chars: DEFAULT_MAX_EXCERPT_CHARS }
    }

    pub fn with_max_excerpt_chars(mut self, max_excerpt_chars: usize) -> Self {
        self.max_excerpt_chars = max_excerpt_chars;
        self
    }

    pub fn build(&self, page: &PageContext<'_>) -> String {
        let url = page.url.unwrap_or(self.locale.unspecified());
        let title = page.title.unwrap_or(self.locale.unspecified());
        let excerpt = match page.excerpt {
            Some(excerpt) => truncate_chars(excerpt, self.max_excerpt_chars),
            None => self.locale.no_page_content().to_string(),
        };
        let store = self.store_name.as_str();

        match self.locale {
            Locale::Arabic => format!(
                "أنت \"مساعد {store}\"، مساعد خدمة عملاء لمتجر {store}.

## قواعد صارمة:
1. المصدر الوحيد لأي معلومة عن الخدمات والأسعار والمدد هو \"سياق الصفحة\" أدناه. لا تخترع أي سعر أو مدة أو تفصيل غير مذكور فيه.
2. إذا لم تجد المعلومة، اسأل سؤال توضيح واحد فقط أو وجّه العميل للتواصل مع الدعم بدل التخمين. مثال: \"ممكن توضح لي أكثر وش تحتاج بالضبط؟ 😊\"
3. الرد مختصر: من 3 إلى 6 أسطر كحد أقصى، بدون فلسفة.
4. استخدم النقاط (•) فقط عند سرد 3 عناصر أو أكثر.
5. لا ترحب بالعميل في كل رد، ادخل في الموضوع مباشرة.
6. لا تذكر أبداً أنك تقرأ من سياق أو صفحة مرفقة، ولا تستخدم عبارات مثل \"حسب الصفحة\" أو \"بناءً على المحتوى\".
7. اللهجة: سعودية ودّية محترمة، مع إيموجي خفيف عند اللزوم فقط (1-2 بالكثير).
8. لو سأل العميل عن شيء خارج نطاق المتجر، وجّهه بلطف للتواصل مع الدعم.

## سياق الصفحة:
- الرابط: {url}
- عنوان الصفحة: {title}
- محتوى الصفحة:
{excerpt}
"
            ),
            Locale::English => format!(
                "You are \"{store} Assistant\", the customer service assistant for the {store} store.

## Strict rules:
1. The only source for any fact about services, prices and durations is the \"Page context\" below. Never invent a price, duration or detail that is not stated there.
2. If the information is missing, ask exactly one clarifying question or direct the customer to human support instead of guessing.
3. Keep replies short: 3 to 6 lines at most.
4. Use bullet points (•) only when listing 3 or more items.
5. Do not greet the customer in every reply; get straight to the point.
6. Never reveal that you are reading from a supplied context or page, and never say things like \"based on the page\" or \"according to the content\".
7. Tone: friendly and respectful, with at most 1-2 emoji when they help.
8. If the customer asks about something outside the store's scope, politely point them to human support.

## Page context:
- URL: {url}
- Page title: {title}
- Page content:
{excerpt}
"
            ),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::chat::PageContext;
    use crate::locale::Locale;

    use super::PromptBuilder;

    #[test]
    fn page_fields_are_embedded() {
        let prompt = PromptBuilder::new(Locale::English, "Waarfe").build(&PageContext {
            url: Some("https://waarfe.com/logo"),
            title: Some("Logo design"),
            excerpt: Some("Logo design package: 3 concepts, 5 days, 300 SAR"),
        });

        assert!(prompt.contains("Waarfe Assistant"));
        assert!(prompt.contains("https://waarfe.com/logo"));
        assert!(prompt.contains("Logo design package: 3 concepts, 5 days, 300 SAR"));
    }

    #[test]
    fn every_behavioral_rule_is_present() {
        let prompt = PromptBuilder::new(Locale::English, "Waarfe").build(&PageContext::default());

        assert!(prompt.contains("Never invent a price"));
        assert!(prompt.contains("exactly one clarifying question"));
        assert!(prompt.contains("3 to 6 lines"));
        assert!(prompt.contains("only when listing 3 or more items"));
        assert!(prompt.contains("Do not greet"));
        assert!(prompt.contains("Never reveal"));
    }

    #[test]
    fn missing_fields_use_localized_placeholders() {
        let prompt = PromptBuilder::new(Locale::Arabic, "وارف").build(&PageContext::default());

        assert!(prompt.contains("مساعد وارف"));
        assert!(prompt.contains("- الرابط: غير محدد"));
        assert!(prompt.contains("- عنوان الصفحة: غير محدد"));
        assert!(prompt.contains("لا يوجد محتوى متاح"));
        assert!(prompt.contains("لا تذكر أبداً أنك تقرأ من سياق"));
    }

    #[test]
    fn long_excerpts_are_truncated_on_char_boundaries() {
        let excerpt = "خدمة ".repeat(50);
        let prompt = PromptBuilder::new(Locale::Arabic, "وارف")
            .with_max_excerpt_chars(12)
            .build(&PageContext { excerpt: Some(&excerpt), ..PageContext::default() });

        assert!(prompt.contains("خدمة خدمة خد…"));
        assert!(!prompt.contains(&excerpt));
    }
}
