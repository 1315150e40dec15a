pub mod http;
pub mod abort;
mod body;

pub use http::HttpChatTransport;
