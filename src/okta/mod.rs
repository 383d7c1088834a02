pub mod api_responses;
pub mod authenticator;
pub mod client;
pub mod dsso;
pub mod session_cache;
