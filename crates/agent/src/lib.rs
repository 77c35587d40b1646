//! Chat orchestration for the storefront assistant.
//!
//! A message is routed one of three ways:
//! 1. **Greeting** - blank input gets the canned greeting.
//! 2. **Order status** - an order number found by `IntentExtractor` is resolved through an
//!    [`storechat_orders::OrderDirectory`] and answered with a formatted status card.
//! 3. **Free form** - everything else goes to a [`llm::CompletionClient`] with grounding
//!    instructions built from the page the customer is on.
//!
//! The model only phrases answers. Order facts come from the order backend and never from
//! generated text.

pub mod llm;
pub mod runtime;

pub use llm::{
    completion_client_from_config, AnthropicClient, CompletionClient, GenerationSettings,
    OpenAiClient,
};
pub use runtime::{ChatOrchestrator, ChatOutcome, ChatRoute};
