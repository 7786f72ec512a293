pub mod api_keys;
pub mod auth;
pub mod catalog;
pub mod prompts;
