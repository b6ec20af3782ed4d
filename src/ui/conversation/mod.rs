//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;

pub use manager::{ConversationAction, ConversationManager};
