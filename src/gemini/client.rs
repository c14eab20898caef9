use std::{
    fmt::{Debug, Display},
    str::FromStr,
    time::Duration,
};

use reqwest::{
    blocking::{Client, ClientBuilder},
    Certificate, Proxy, StatusCode,
};

use super::content::{
    ApiErrorResponse, GenerateContentRequest, GenerateContentResponse, Generation,
};
use crate::config::Config;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct GeminiClientOption {
    pub proxy: Option<String>,
    pub ca_path: Option<String>,
    pub timeout: Duration,
}
impl Default for GeminiClientOption {
    fn default() -> Self {
        Self {
            proxy: None,
            ca_path: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    key: GeminiKey,
    model: GeminiModel,
    http: Client,
}
impl GeminiClient {
    const BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    const API_KEY_HEADER: &'static str = "x-goog-api-key";

    pub fn new(key: GeminiKey, model: GeminiModel, option: GeminiClientOption) -> Result<Self> {
        let mut builder = Client::builder().timeout(option.timeout);
        if let Some(proxy) = option.proxy {
            builder = Self::with_proxy(builder, proxy)?;
        }
        if let Some(ca) = option.ca_path {
            builder = Self::with_root_ca(builder, ca)?;
        }
        let http = builder.build().map_err(|e| {
            GeminiClientError::new(
                "failed to build http client".to_string(),
                GeminiClientErrorKind::RequestError(e.to_string()),
            )
        })?;
        Ok(Self { key, model, http })
    }
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.client_option.clone(),
        )
    }
    pub fn model(&self) -> &GeminiModel {
        &self.model
    }
    /// Sends a single prompt and waits for the whole answer.
    pub fn generate_content(&self, prompt: &str) -> Result<Generation> {
        let url = self.url();
        tracing::debug!(
            model = self.model.as_str(),
            prompt_len = prompt.len(),
            "sending generateContent request"
        );
        let response = self
            .http
            .post(&url)
            .header(Self::API_KEY_HEADER, self.key.key())
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .map_err(|e| {
                GeminiClientError::new(
                    "Cause Error at GeminiClient::generate_content".to_string(),
                    GeminiClientErrorKind::RequestError(e.to_string()),
                )
            })?;
        let status = response.status();
        let body = response.text().map_err(|e| {
            GeminiClientError::new(
                "failed to read response body".to_string(),
                GeminiClientErrorKind::ReadStreamError(e.to_string()),
            )
        })?;
        Self::generation_from(status, &body)
    }
    fn generation_from(status: StatusCode, body: &str) -> Result<Generation> {
        if !status.is_success() {
            return Err(Self::error_from_body(status, body));
        }
        let response = serde_json::from_str::<GenerateContentResponse>(body).map_err(|e| {
            GeminiClientError::new(
                format!("Failed to parse generateContent response: {}", e),
                GeminiClientErrorKind::ResponseDeserializeError(body.to_string()),
            )
        })?;
        if let Some(reason) = response.block_reason() {
            tracing::warn!(reason, "prompt was blocked");
        }
        tracing::debug!(
            finish_reason = ?response.finish_reason(),
            "received generateContent response"
        );
        Ok(Generation::from(response))
    }
    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            Self::BASE_URL,
            self.model.as_str()
        )
    }
    fn error_from_body(status: StatusCode, body: &str) -> GeminiClientError {
        match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(res) => GeminiClientError::new(
                res.error.message.clone(),
                GeminiClientErrorKind::ResponseError(format!(
                    "{} {}",
                    res.error.code, res.error.status
                )),
            ),
            Err(_) => GeminiClientError::new(
                body.to_string(),
                GeminiClientErrorKind::ResponseError(status.to_string()),
            ),
        }
    }
    fn with_proxy(builder: ClientBuilder, proxy: String) -> Result<ClientBuilder> {
        let proxy = Proxy::all(&proxy).map_err(|_e| {
            GeminiClientError::new(
                "invalid proxy url".to_string(),
                GeminiClientErrorKind::InvalidUrl(proxy.clone()),
            )
        })?;
        Ok(builder.proxy(proxy))
    }
    fn with_root_ca(builder: ClientBuilder, ca: String) -> Result<ClientBuilder> {
        let not_found = |ca: &str| {
            GeminiClientError::new(
                "invalid ca".to_string(),
                GeminiClientErrorKind::NotFoundCAFile(ca.to_string()),
            )
        };
        let pem = std::fs::read(&ca).map_err(|_e| not_found(&ca))?;
        let cert = Certificate::from_pem(&pem).map_err(|_e| not_found(&ca))?;
        Ok(builder.add_root_certificate(cert))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeminiKey(String);

impl GeminiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
    fn key(&self) -> &str {
        self.0.as_str()
    }
}
impl Debug for GeminiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", "x".repeat(self.0.len()))
    }
}
impl Display for GeminiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", "x".repeat(self.0.len()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeminiModel {
    #[default]
    Gemini15Flash,
    Gemini15Pro,
    Gemini20Flash,
    Other(String),
}
impl GeminiModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gemini15Flash => "gemini-1.5-flash",
            Self::Gemini15Pro => "gemini-1.5-pro",
            Self::Gemini20Flash => "gemini-2.0-flash",
            Self::Other(name) => name.as_str(),
        }
    }
}
impl FromStr for GeminiModel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("model name is empty".to_string()),
            "gemini-1.5-flash" | "flash" => Ok(Self::Gemini15Flash),
            "gemini-1.5-pro" | "pro" => Ok(Self::Gemini15Pro),
            "gemini-2.0-flash" => Ok(Self::Gemini20Flash),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}
impl Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("kind : {kind}\n message : {message}")]
pub struct GeminiClientError {
    message: String,
    pub kind: GeminiClientErrorKind,
}
impl GeminiClientError {
    pub fn new(message: String, kind: GeminiClientErrorKind) -> Self {
        Self { message, kind }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum GeminiClientErrorKind {
    #[error("Not found CA File. File is : {0}")]
    NotFoundCAFile(String),
    #[error("Invalid Url. Url is : {0}")]
    InvalidUrl(String),
    #[error("Not Read Stream. Error is : {0}")]
    ReadStreamError(String),
    #[error("Request Error. Error is : {0}")]
    RequestError(String),
    #[error("Not Deserialize response. Response is :  {0}")]
    ResponseDeserializeError(String),
    #[error("Response Error. Error is : {0}")]
    ResponseError(String),
}
pub type Result<T> = std::result::Result<T, GeminiClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: GeminiModel) -> GeminiClient {
        GeminiClient::new(GeminiKey::new("key"), model, GeminiClientOption::default()).unwrap()
    }

    #[test]
    #[ignore = "実際に通信するので、CIでのテストは行わない"]
    fn geminiと実際の通信を行うことが可能() {
        let config = Config::from_env().unwrap();
        let client = GeminiClient::from_config(&config).unwrap();

        let generation = client.generate_content("hello").unwrap();

        assert!(!generation.is_empty());
    }
    #[test]
    fn モデルごとのエンドポイントに送信する() {
        assert_eq!(
            client(GeminiModel::default()).url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            client(GeminiModel::Other("gemini-exp".to_string())).url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-exp:generateContent"
        );
    }
    #[test]
    fn api_keyは表示時に伏せられる() {
        let key = GeminiKey::new("secret");

        assert_eq!(format!("{}", key), "xxxxxx");
        assert_eq!(format!("{:?}", key), "xxxxxx");
    }
    #[test]
    fn モデル名は別名からも解釈できる() {
        assert_eq!(
            "flash".parse::<GeminiModel>().unwrap(),
            GeminiModel::Gemini15Flash
        );
        assert_eq!(
            "gemini-1.5-pro".parse::<GeminiModel>().unwrap(),
            GeminiModel::Gemini15Pro
        );
        assert_eq!(
            "gemini-2.0-flash".parse::<GeminiModel>().unwrap(),
            GeminiModel::Gemini20Flash
        );
        assert_eq!(
            "gemini-2.5-pro".parse::<GeminiModel>().unwrap(),
            GeminiModel::Other("gemini-2.5-pro".to_string())
        );
        assert!("  ".parse::<GeminiModel>().is_err());
    }
    #[test]
    fn apiのエラーレスポンスからエラーを作る() {
        let body =
            r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;

        let error = GeminiClient::error_from_body(StatusCode::FORBIDDEN, body);

        assert_eq!(
            error,
            GeminiClientError::new(
                "Permission denied".to_string(),
                GeminiClientErrorKind::ResponseError("403 PERMISSION_DENIED".to_string())
            )
        );
    }
    #[test]
    fn エラーレスポンスが読めなければステータスを使う() {
        let error =
            GeminiClient::error_from_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");

        assert_eq!(
            error.kind,
            GeminiClientErrorKind::ResponseError("502 Bad Gateway".to_string())
        );
    }
    #[test]
    fn 存在しないca_fileはエラーになる() {
        let result = GeminiClient::new(
            GeminiKey::new("key"),
            GeminiModel::default(),
            GeminiClientOption {
                ca_path: Some("./this/ca/does/not/exist.pem".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            result.err().map(|e| e.kind),
            Some(GeminiClientErrorKind::NotFoundCAFile(
                "./this/ca/does/not/exist.pem".to_string()
            ))
        );
    }
    #[test]
    fn 不正なproxyはエラーになる() {
        let result = GeminiClient::new(
            GeminiKey::new("key"),
            GeminiModel::default(),
            GeminiClientOption {
                proxy: Some("not a url".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            result.err().map(|e| e.kind),
            Some(GeminiClientErrorKind::InvalidUrl("not a url".to_string()))
        );
    }
    #[test]
    fn 成功レスポンスから生成結果を取り出す() {
        let body = r#"{
            "candidates": [
                {
                    "content": { "role": "model", "parts": [{ "text": "「まとめるペン !!!」" }] },
                    "finishReason": "STOP"
                }
            ]
        }"#;

        let generation = GeminiClient::generation_from(StatusCode::OK, body).unwrap();

        assert_eq!(generation, Generation::from_text("「まとめるペン !!!」"));
    }
    #[test]
    fn ブロックされたプロンプトは空の生成結果になる() {
        let body = r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#;

        let generation = GeminiClient::generation_from(StatusCode::OK, body).unwrap();

        assert!(generation.is_empty());
    }
    #[test]
    fn jsonでない成功レスポンスはデシリアライズエラーになる() {
        let error = GeminiClient::generation_from(StatusCode::OK, "not json").unwrap_err();

        assert_eq!(
            error.kind,
            GeminiClientErrorKind::ResponseDeserializeError("not json".to_string())
        );
    }
    #[test]
    fn 失敗ステータスはapiのエラーとして返す() {
        let body =
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;

        let error =
            GeminiClient::generation_from(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();

        assert_eq!(
            error,
            GeminiClientError::new(
                "Quota exceeded".to_string(),
                GeminiClientErrorKind::ResponseError("429 RESOURCE_EXHAUSTED".to_string())
            )
        );
    }
    #[test]
    fn リクエストエラーの表示にエラー内容を含める() {
        let kind = GeminiClientErrorKind::RequestError("connection refused".to_string());

        assert_eq!(kind.to_string(), "Request Error. Error is : connection refused");
    }
}
