// ABOUTME: Translation between host rich text and Slack message markup
// ABOUTME: encode handles outgoing text, decode handles incoming text and message JSON

pub mod decode;
pub mod encode;

pub use decode::{json_to_html, message_to_html};
pub use encode::html_to_message;
