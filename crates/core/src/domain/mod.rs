pub mod chat;
pub mod order;
