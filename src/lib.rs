pub mod cli;
pub mod config;
pub mod gemini;
pub mod prompt;
pub mod reader;
pub mod repl;
