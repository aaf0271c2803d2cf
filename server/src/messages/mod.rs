//! Direct messages: history, sidebar list, and send-then-deliver.

pub mod handlers;
pub mod store;
