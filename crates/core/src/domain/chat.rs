use serde::{Deserialize, Serialize};

/// One inbound customer message plus whatever the widget knows about the page it sits on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub page_excerpt: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn trimmed_message(&self) -> &str {
        self.message.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed_message().is_empty()
    }

    pub fn page(&self) -> PageContext<'_> {
        PageContext {
            url: non_blank(self.page_url.as_deref()),
            title: non_blank(self.page_title.as_deref()),
            excerpt: non_blank(self.page_excerpt.as_deref()),
        }
    }
}

/// Borrowed page fields with blank values already collapsed to `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageContext<'a> {
    pub url: Option<&'a str>,
    pub title: Option<&'a str>,
    pub excerpt: Option<&'a str>,
}

/// `quick_replies: None` tells the widget to show its own default chips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<String>>,
}

impl ChatResponse {
    pub fn new(reply: impl Into<String>, quick_replies: Option<Vec<String>>) -> Self {
        Self { reply: reply.into(), quick_replies }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
