mod chat;
pub use self::chat::{
    ChatMessage, ChatRequest, ChatResponse, Choice, ResponseFormat, ResponseMessage, Role,
};
