pub mod client;
pub mod content;

pub use client::{
    GeminiClient, GeminiClientError, GeminiClientErrorKind, GeminiClientOption, GeminiKey,
    GeminiModel, Result,
};
pub use content::Generation;
