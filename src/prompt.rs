use std::path::Path;

/// Placeholder replaced by the user's text.
pub const INPUT_PLACEHOLDER: &str = "{input}";

const SECRET_GADGET_TEMPLATE: &str =
    "文章の悩みを解決するようなドラえもんの秘密道具を考えてください。
返信はまずに、以下のフォーマットでお願いします。
「秘密道具名 !!!」

ドラえもんっぽい口調で、秘密道具の機能の説明だけをしてください。

文章:
{input}

添削結果:
";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt template does not contain the {{input}} placeholder")]
    MissingPlaceholder,
    #[error("failed to read prompt template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, PromptError> {
        let template = template.into();
        if !template.contains(INPUT_PLACEHOLDER) {
            return Err(PromptError::MissingPlaceholder);
        }
        Ok(Self { template })
    }
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let template = std::fs::read_to_string(path).map_err(|source| PromptError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(template)
    }
    /// Joins the record with newlines and substitutes it into the template.
    pub fn render(&self, lines: &[String]) -> String {
        self.template.replace(INPUT_PLACEHOLDER, &lines.join("\n"))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: SECRET_GADGET_TEMPLATE.to_string(),
        }
    }
}
