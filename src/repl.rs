use std::io::{self, BufRead, Write};

use crate::{
    gemini::{GeminiClient, GeminiClientError, Generation},
    prompt::PromptTemplate,
    reader::RecordReader,
};

/// Something that turns a prompt into generated text.
pub trait Generator {
    type Error: std::error::Error;
    fn generate(&mut self, prompt: &str) -> Result<Generation, Self::Error>;
}

impl Generator for GeminiClient {
    type Error = GeminiClientError;
    fn generate(&mut self, prompt: &str) -> Result<Generation, Self::Error> {
        self.generate_content(prompt)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplError {
    #[error("Error reading input: {0}")]
    Read(#[source] io::Error),
    #[error("Error writing output: {0}")]
    Write(#[source] io::Error),
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exit,
    EndOfInput,
}

enum Step {
    Continue,
    Stop(SessionEnd),
}

/// Lines the assistant says during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialogue {
    assistant: String,
    user: String,
}
impl Dialogue {
    pub fn new(assistant: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            assistant: assistant.into(),
            user: user.into(),
        }
    }
    fn say(&self, line: &str) -> String {
        format!("{}: {}", self.assistant, line)
    }
    pub fn greeting(&self) -> String {
        self.say(&format!("どうしたんだい？{}", self.user))
    }
    pub fn farewell(&self) -> String {
        "終了します。".to_string()
    }
    pub fn pardon(&self) -> String {
        self.say(&format!("なんだって？{}", self.user))
    }
    pub fn fanfare(&self) -> String {
        "\nテレテテッテレーン!".to_string()
    }
    pub fn apology(&self) -> String {
        self.say("うーん、何か問題が発生したみたいだよ。もう一度試してみてね。")
    }
    pub fn nothing_returned(&self) -> String {
        self.say("うーん、何も返ってこなかったみたいだよ。もう一度試してみてね。")
    }
    pub fn follow_up(&self) -> String {
        self.say(&format!("何か他に悩みはないかい？{}", self.user))
    }
}
impl Default for Dialogue {
    fn default() -> Self {
        Self::new("◯えもん", "の▫太くん")
    }
}

/// Read-eval-print loop: one blank-line terminated record in, one generated
/// answer out, until the user types `exit` or the input runs out.
pub struct GeminiRepl<G: Generator, R: BufRead, W: Write> {
    generator: G,
    reader: RecordReader<R>,
    out: W,
    template: PromptTemplate,
    dialogue: Dialogue,
}

impl<G: Generator, R: BufRead, W: Write> GeminiRepl<G, R, W> {
    pub fn new(generator: G, input: R, out: W) -> Self {
        Self {
            generator,
            reader: RecordReader::new(input),
            out,
            template: PromptTemplate::default(),
            dialogue: Dialogue::default(),
        }
    }
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }
    pub fn with_dialogue(mut self, dialogue: Dialogue) -> Self {
        self.dialogue = dialogue;
        self
    }
    pub fn generator(&self) -> &G {
        &self.generator
    }
    pub fn output(&self) -> &W {
        &self.out
    }
    /// Runs the session. A read fault ends it with an error; generation
    /// failures are reported to the user and the loop goes on.
    pub fn repl(&mut self) -> Result<SessionEnd, ReplError> {
        let greeting = self.dialogue.greeting();
        self.print(&greeting)?;
        loop {
            let record = self.reader.read_record().map_err(ReplError::Read)?;
            if let Step::Stop(end) = self.step(&record)? {
                tracing::debug!(?end, "session finished");
                return Ok(end);
            }
        }
    }
    fn step(&mut self, record: &[String]) -> Result<Step, ReplError> {
        let text = record.join("\n");
        if Self::is_exit(&text) {
            let farewell = self.dialogue.farewell();
            self.print(&farewell)?;
            return Ok(Step::Stop(SessionEnd::Exit));
        }
        if text.trim().is_empty() {
            if self.reader.is_exhausted() {
                let farewell = self.dialogue.farewell();
                self.print(&farewell)?;
                return Ok(Step::Stop(SessionEnd::EndOfInput));
            }
            let pardon = self.dialogue.pardon();
            self.print(&pardon)?;
            return Ok(Step::Continue);
        }
        let fanfare = self.dialogue.fanfare();
        self.print(&fanfare)?;

        let prompt = self.template.render(record);
        match self.generator.generate(&prompt) {
            Ok(generation) if generation.is_empty() => {
                let nothing = self.dialogue.nothing_returned();
                self.print(&nothing)?;
            }
            Ok(generation) => {
                for part in generation.parts() {
                    self.print(part)?;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error generating content");
                let apology = self.dialogue.apology();
                self.print(&apology)?;
                return Ok(Step::Continue);
            }
        }
        let follow_up = self.dialogue.follow_up();
        self.print(&follow_up)?;
        Ok(Step::Continue)
    }
    fn is_exit(text: &str) -> bool {
        text.trim().to_lowercase() == "exit"
    }
    fn print(&mut self, line: &str) -> Result<(), ReplError> {
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(ReplError::Write)
    }
}
