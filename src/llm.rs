// src/llm.rs
//! Chat-completion client: provider abstraction over an OpenAI-compatible
//! endpoint (Groq) plus a scriptable mock for tests. Transport failures
//! surface as errors here; callers wrap them into [`Outcome`] fallbacks so
//! the pipeline never stalls on a model problem.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Result of an external-call wrapper: either a live value from the remote
/// capability, or the documented fallback together with the reason the call
/// degraded. Both arms are successes for the pipeline; tests and callers can
/// tell them apart without inspecting logs.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Live(T),
    Fallback { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Live(v) => v,
            Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Live(v) => v,
            Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Outcome::Live(_))
    }
}

pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, req: ChatRequest<'_>) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Groq chat-completions provider (OpenAI wire shape).
pub struct GroqChat {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqChat {
    pub fn new(api_key: String, cfg: &ChatConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-radar/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: cfg.model.clone(),
        }
    }

    /// Build from the environment; `None` when no API key is configured so
    /// callers fall back to keyword-only behavior.
    pub fn from_env(cfg: &ChatConfig) -> Option<Self> {
        let key = std::env::var(crate::config::ENV_CHAT_API_KEY).unwrap_or_default();
        if key.trim().is_empty() {
            tracing::warn!("{} not set; model-assisted passes disabled", crate::config::ENV_CHAT_API_KEY);
            return None;
        }
        Some(Self::new(key, cfg))
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}
#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait]
impl ChatModel for GroqChat {
    async fn complete(&self, req: ChatRequest<'_>) -> Result<String> {
        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: req.system,
                },
                Msg {
                    role: "user",
                    content: req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let resp = self
            .http
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("chat completion returned status {status}");
        }
        let parsed: Resp = resp.json().await.context("chat completion body")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            anyhow::bail!("chat completion returned empty content");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}

/// Scriptable mock: pops queued responses in order; errors when exhausted.
pub struct MockChat {
    responses: Mutex<VecDeque<Result<String, String>>>,
}

impl MockChat {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
        }
    }

    /// Mock that fails every call (exercises fallback paths).
    pub fn failing(reason: &str) -> Self {
        let mut q = VecDeque::new();
        // A generous supply; each call pops one.
        for _ in 0..64 {
            q.push_back(Err(reason.to_string()));
        }
        Self {
            responses: Mutex::new(q),
        }
    }
}

#[async_trait]
impl ChatModel for MockChat {
    async fn complete(&self, _req: ChatRequest<'_>) -> Result<String> {
        let next = self
            .responses
            .lock()
            .expect("mock chat mutex poisoned")
            .pop_front();
        match next {
            Some(Ok(s)) => Ok(s),
            Some(Err(reason)) => anyhow::bail!("{reason}"),
            None => anyhow::bail!("mock chat exhausted"),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Strip a surrounding markdown code fence (``` or ```json) if present;
/// models wrap JSON payloads this way often enough that every JSON parse
/// site goes through here first.
pub fn strip_code_fence(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest).trim()
}
