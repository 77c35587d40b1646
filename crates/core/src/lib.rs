pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod locale;
pub mod prompt;
pub mod quick_replies;
pub mod reply;

pub use domain::chat::{ChatRequest, ChatResponse, PageContext};
pub use domain::order::OrderRecord;
pub use errors::{AuthError, OrderLookup, UpstreamError, UpstreamErrorKind, UpstreamService};
pub use intent::{Intent, IntentExtractor, IntentRule};
pub use locale::{Chip, Locale};
pub use prompt::PromptBuilder;
pub use quick_replies::{QuickReplySelector, QuickReplySet};
pub use reply::format_order_reply;
