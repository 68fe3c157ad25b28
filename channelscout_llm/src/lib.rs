mod client;
mod errors;
pub mod types;
pub use self::client::{Client, DEFAULT_BASE_URL};
pub use self::errors::Error;
pub use self::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat, Role};
