pub mod client;
pub mod gemini;
pub mod tier;

pub use client::GenerationClient;
pub use gemini::GeminiHttpTransport;
pub use tier::Tier;
