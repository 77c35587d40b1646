//! Customer-facing copy for the two languages the storefront speaks.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl std::str::FromStr for Locale {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ar" | "arabic" => Ok(Self::Arabic),
            "en" | "english" => Ok(Self::English),
            other => Err(ConfigError::Validation(format!(
                "unsupported chat locale `{other}` (expected ar|en)"
            ))),
        }
    }
}

/// Quick-reply chip labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip {
    FollowUpOrder,
    ContactSupport,
    ReturnPolicy,
    Requirements,
    TurnaroundTime,
    DeliveryMethod,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Arabic => "ar",
            Self::English => "en",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            Self::Arabic => "مرحباً! كيف أقدر أساعدك؟ 😊",
            Self::English => "Hi there! How can I help you? 😊",
        }
    }

    pub fn order_not_found(&self, order_number: &str) -> String {
        match self {
            Self::Arabic => format!(
                "ما لقيت طلب بالرقم {order_number} 🤔\nتأكد من الرقم وحاول مرة ثانية، أو تواصل مع الدعم."
            ),
            Self::English => format!(
                "I couldn't find an order with the number {order_number} 🤔\nPlease check the number and try again, or contact support."
            ),
        }
    }

    pub fn technical_apology(&self) -> &'static str {
        match self {
            Self::Arabic => "عذراً، صار خطأ تقني. حاول مرة ثانية أو تواصل مع الدعم 🙏",
            Self::English => {
                "Sorry, something went wrong on our side. Please try again or contact support 🙏"
            }
        }
    }

    pub fn chip(&self, chip: Chip) -> &'static str {
        match (self, chip) {
            (Self::Arabic, Chip::FollowUpOrder) => "متابعة الطلب",
            (Self::Arabic, Chip::ContactSupport) => "التواصل مع الدعم",
            (Self::Arabic, Chip::ReturnPolicy) => "سياسة الاسترجاع",
            (Self::Arabic, Chip::Requirements) => "وش المتطلبات؟",
            (Self::Arabic, Chip::TurnaroundTime) => "مدة التنفيذ",
            (Self::Arabic, Chip::DeliveryMethod) => "طريقة التسليم",
            (Self::English, Chip::FollowUpOrder) => "Follow up on order",
            (Self::English, Chip::ContactSupport) => "Contact support",
            (Self::English, Chip::ReturnPolicy) => "Return policy",
            (Self::English, Chip::Requirements) => "What are the requirements?",
            (Self::English, Chip::TurnaroundTime) => "Turnaround time",
            (Self::English, Chip::DeliveryMethod) => "Delivery method",
        }
    }

    pub fn order_heading(&self, order_id: &str) -> String {
        match self {
            Self::Arabic => format!("📦 طلبك رقم #{order_id}:"),
            Self::English => format!("📦 Your order #{order_id}:"),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Arabic => "الحالة",
            Self::English => "Status",
        }
    }

    pub fn amount_label(&self) -> &'static str {
        match self {
            Self::Arabic => "المبلغ",
            Self::English => "Amount",
        }
    }

    pub fn date_label(&self) -> &'static str {
        match self {
            Self::Arabic => "التاريخ",
            Self::English => "Date",
        }
    }

    pub fn currency(&self) -> &'static str {
        match self {
            Self::Arabic => "ريال",
            Self::English => "SAR",
        }
    }

    pub fn unspecified(&self) -> &'static str {
        match self {
            Self::Arabic => "غير محدد",
            Self::English => "Not specified",
        }
    }

    pub fn no_page_content(&self) -> &'static str {
        match self {
            Self::Arabic => "لا يوجد محتوى متاح",
            Self::English => "No content available",
        }
    }

    pub fn order_closing(&self) -> &'static str {
        match self {
            Self::Arabic => "إذا تحتاج أي شيء ثاني، أنا هنا 😊",
            Self::English => "If you need anything else, I'm here 😊",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Chip, Locale};

    #[test]
    fn parses_codes_and_names() {
        assert_eq!("ar".parse::<Locale>().ok(), Some(Locale::Arabic));
        assert_eq!(" English ".parse::<Locale>().ok(), Some(Locale::English));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn not_found_text_echoes_the_number() {
        assert!(Locale::Arabic.order_not_found("55555").contains("55555"));
        assert!(Locale::English.order_not_found("55555").contains("55555"));
    }

    #[test]
    fn arabic_is_the_default() {
        assert_eq!(Locale::default(), Locale::Arabic);
        assert_eq!(Locale::default().chip(Chip::ContactSupport), "التواصل مع الدعم");
    }
}
