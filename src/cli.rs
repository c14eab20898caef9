use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::{load_env_file, Config, ConfigError},
    gemini::{GeminiClient, GeminiClientError, GeminiModel},
    prompt::{PromptError, PromptTemplate},
    repl::{Dialogue, GeminiRepl, ReplError, SessionEnd},
};

/// Ask Gemini for a secret gadget that solves your writing troubles.
///
/// Type your text, finish it with an empty line, and type `exit` to quit.
#[derive(Parser, Debug)]
#[clap(name = "term-gemini", version)]
pub struct Cli {
    /// Model to use, overrides GEMINI_MODEL
    #[clap(short = 'm', long = "model")]
    model: Option<GeminiModel>,
    /// Env file to load instead of ./.env
    #[clap(long = "env-file")]
    env_file: Option<PathBuf>,
    /// Prompt template file containing an {input} placeholder
    #[clap(short = 't', long = "template")]
    template: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Error creating Gemini client: {0}")]
    Client(#[from] GeminiClientError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Repl(#[from] ReplError),
}

impl Cli {
    pub fn new() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<SessionEnd, RunError> {
        load_env_file(self.env_file.as_deref())?;
        let config = self.config()?;
        let template = self.template()?;
        let client = GeminiClient::from_config(&config)?;
        tracing::info!(model = %client.model(), "starting session");

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut repl = GeminiRepl::new(client, stdin.lock(), stdout.lock())
            .with_template(template)
            .with_dialogue(Dialogue::new(
                config.assistant_name.as_str(),
                config.user_name.as_str(),
            ));
        Ok(repl.repl()?)
    }
    fn config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::from_env()?;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        Ok(config)
    }
    fn template(&self) -> Result<PromptTemplate, PromptError> {
        match &self.template {
            Some(path) => PromptTemplate::from_file(path),
            None => Ok(PromptTemplate::default()),
        }
    }
}
