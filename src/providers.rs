pub mod base;
pub mod chat;
pub mod client;
pub mod configs;
pub mod google;
pub mod openai;
pub mod responses;
pub mod utils;
pub mod variant;
