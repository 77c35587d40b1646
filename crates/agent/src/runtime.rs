use std::sync::Arc;

use storechat_core::config::ChatConfig;
use storechat_core::domain::chat::{ChatRequest, ChatResponse};
use storechat_core::errors::OrderLookup;
use storechat_core::intent::{Intent, IntentExtractor};
use storechat_core::locale::Locale;
use storechat_core::prompt::PromptBuilder;
use storechat_core::quick_replies::{QuickReplySelector, QuickReplySet};
use storechat_core::reply::format_order_reply;
use storechat_orders::OrderDirectory;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::CompletionClient;

/// Terminal state a chat request ended in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRoute {
    Greeting,
    OrderFound,
    OrderNotFound,
    OrderLookupFailed,
    Completion,
    CompletionFailed,
}

impl ChatRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::OrderFound => "order_found",
            Self::OrderNotFound => "order_not_found",
            Self::OrderLookupFailed => "order_lookup_failed",
            Self::Completion => "completion",
            Self::CompletionFailed => "completion_failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOutcome {
    pub route: ChatRoute,
    pub response: ChatResponse,
}

impl ChatOutcome {
    fn new(route: ChatRoute, reply: impl Into<String>, quick_replies: Option<Vec<String>>) -> Self {
        Self { route, response: ChatResponse::new(reply, quick_replies) }
    }
}

/// Turns one customer message into one reply. Every upstream failure is absorbed here, so callers
/// always get a user-facing answer.
pub struct ChatOrchestrator {
    locale: Locale,
    extractor: IntentExtractor,
    quick_replies: QuickReplySelector,
    prompts: PromptBuilder,
    orders: Arc<dyn OrderDirectory>,
    completion: Arc<dyn CompletionClient>,
}

impl ChatOrchestrator {
    pub fn new(
        locale: Locale,
        prompts: PromptBuilder,
        orders: Arc<dyn OrderDirectory>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            locale,
            extractor: IntentExtractor::default(),
            quick_replies: QuickReplySelector::new(locale),
            prompts,
            orders,
            completion,
        }
    }

    pub fn from_config(
        config: &ChatConfig,
        orders: Arc<dyn OrderDirectory>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        let prompts = PromptBuilder::new(config.locale, config.store_name.clone())
            .with_max_excerpt_chars(config.max_excerpt_chars);
        Self::new(config.locale, prompts, orders, completion)
    }

    pub fn with_extractor(mut self, extractor: IntentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn orders(&self) -> &Arc<dyn OrderDirectory> {
        &self.orders
    }

    pub async fn handle(&self, request: &ChatRequest) -> ChatResponse {
        let correlation_id = Uuid::new_v4().to_string();
        self.respond(request, &correlation_id).await.response
    }

    pub async fn respond(&self, request: &ChatRequest, correlation_id: &str) -> ChatOutcome {
        let outcome = self.route(request, correlation_id).await;
        info!(
            event_name = "agent.chat.responded",
            correlation_id = %correlation_id,
            route = outcome.route.as_str(),
            quick_replies = outcome.response.quick_replies.as_ref().map_or(0, Vec::len),
            "chat request answered"
        );
        outcome
    }

    async fn route(&self, request: &ChatRequest, correlation_id: &str) -> ChatOutcome {
        if request.is_blank() {
            return ChatOutcome::new(ChatRoute::Greeting, self.locale.greeting(), None);
        }

        let message = request.trimmed_message();
        debug!(
            event_name = "agent.chat.received",
            correlation_id = %correlation_id,
            message = %message,
            "chat message received"
        );

        match self.extractor.classify(message) {
            Intent::OrderLookup { order_number } => {
                self.answer_order(&order_number, message, correlation_id).await
            }
            Intent::FreeForm => self.answer_free_form(request, message, correlation_id).await,
        }
    }

    async fn answer_order(
        &self,
        order_number: &str,
        message: &str,
        correlation_id: &str,
    ) -> ChatOutcome {
        info!(
            event_name = "agent.chat.order_intent",
            correlation_id = %correlation_id,
            order_number = %order_number,
            "order number detected"
        );

        let not_found_chips = || Some(self.quick_replies.labels(QuickReplySet::OrderNotFound));
        match self.orders.find_order(order_number).await {
            Ok(OrderLookup::Found(order)) => ChatOutcome::new(
                ChatRoute::OrderFound,
                format_order_reply(&order, self.locale),
                self.quick_replies.select(message, true),
            ),
            Ok(OrderLookup::NotFound) => ChatOutcome::new(
                ChatRoute::OrderNotFound,
                self.locale.order_not_found(order_number),
                not_found_chips(),
            ),
            Err(error) => {
                warn!(
                    event_name = "agent.chat.order_lookup_failed",
                    correlation_id = %correlation_id,
                    order_number = %order_number,
                    error = %error,
                    "order lookup failed; answering as not found"
                );
                ChatOutcome::new(
                    ChatRoute::OrderLookupFailed,
                    self.locale.order_not_found(order_number),
                    not_found_chips(),
                )
            }
        }
    }

    async fn answer_free_form(
        &self,
        request: &ChatRequest,
        message: &str,
        correlation_id: &str,
    ) -> ChatOutcome {
        let instructions = self.prompts.build(&request.page());
        let quick_replies = self.quick_replies.select(message, false);

        match self.completion.complete(message, &instructions).await {
            Ok(text) => ChatOutcome::new(ChatRoute::Completion, text, quick_replies),
            Err(error) => {
                warn!(
                    event_name = "agent.chat.completion_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "completion failed; answering with apology"
                );
                ChatOutcome::new(
                    ChatRoute::CompletionFailed,
                    self.locale.technical_apology(),
                    quick_replies,
                )
            }
        }
    }
}
