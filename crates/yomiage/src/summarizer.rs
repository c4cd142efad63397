use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

use crate::policy::Language;
use crate::ratelimit::TokenRateLimiter;
use crate::segment::segment;

/// Largest piece of page text sent in one map request
const WINDOW_CHARS: usize = 30_000;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// How long the summary should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
    /// Roughly this many characters
    Chars(usize),
    Unspecified,
}

impl SummaryLength {
    /// Accepts `short`/`brief`, `medium`/`normal`, `long`/`detailed`, or a number
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "short" | "brief" => SummaryLength::Short,
            "medium" | "normal" => SummaryLength::Medium,
            "long" | "detailed" => SummaryLength::Long,
            other => other
                .parse::<usize>()
                .map(SummaryLength::Chars)
                .unwrap_or(SummaryLength::Unspecified),
        }
    }

    pub fn instruction(&self, language: Language) -> String {
        match language {
            Language::Ja => match self {
                SummaryLength::Short => "簡潔に2-3文で要約してください。".to_string(),
                SummaryLength::Medium => "適度な長さ（5-8文程度）で要約してください。".to_string(),
                SummaryLength::Long => "詳細に10-15文程度で要約してください。".to_string(),
                SummaryLength::Chars(n) => format!("約{}文字程度で要約してください。", n),
                SummaryLength::Unspecified => "適度な長さで要約してください。".to_string(),
            },
            Language::En => match self {
                SummaryLength::Short => "Summarize briefly in 2-3 sentences.".to_string(),
                SummaryLength::Medium => "Summarize in a moderate length of 5-8 sentences.".to_string(),
                SummaryLength::Long => "Summarize in detail in 10-15 sentences.".to_string(),
                SummaryLength::Chars(n) => format!("Summarize in about {} characters.", n),
                SummaryLength::Unspecified => "Summarize in a moderate length.".to_string(),
            },
        }
    }
}

fn map_prompt(instruction: &str, text: &str, language: Language) -> String {
    match language {
        Language::Ja => format!("{}\n\nテキスト: {}\n\n要約:", instruction, text),
        Language::En => format!("{}\n\nText: {}\n\nSummary:", instruction, text),
    }
}

fn combine_prompt(instruction: &str, partials: &[String], language: Language) -> String {
    let joined = partials.join("\n\n");
    match language {
        Language::Ja => format!("{}\n\n要約リスト:\n{}\n\n最終要約:", instruction, joined),
        Language::En => format!("{}\n\nSummaries:\n{}\n\nFinal summary:", instruction, joined),
    }
}

/// Split page text into map windows of at most `WINDOW_CHARS`.
///
/// Windows are cut at sentence boundaries and do not overlap; only a single
/// sentence longer than a window is cut mid-sentence.
fn map_windows(text: &str) -> Vec<String> {
    NonZeroUsize::new(WINDOW_CHARS)
        .map(|window| segment(text, window))
        .unwrap_or_default()
}

/// Rough token estimate for rate limiting: a quarter of the character count
/// plus the reserved output budget
fn estimate_tokens(prompt: &str) -> u64 {
    (prompt.chars().count() as u64).div_ceil(4) + MAX_OUTPUT_TOKENS as u64
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

fn response_text(response: ClaudeResponse) -> Result<String> {
    let text = response
        .content
        .into_iter()
        .map(|c| c.text)
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Claude API returned an empty summary");
    }
    Ok(text.to_string())
}

pub struct ClaudeSummarizer {
    client: Client,
    api_key: String,
    model: String,
    limiter: Mutex<TokenRateLimiter>,
}

impl ClaudeSummarizer {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model: "claude-3-5-haiku-20241022".to_string(),
            limiter: Mutex::new(TokenRateLimiter::default()),
        })
    }

    /// Map-reduce summary: each window of the text is summarized, then the
    /// partial summaries are combined. Short text takes a single request.
    pub async fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
        language: Language,
    ) -> Result<String> {
        let windows = map_windows(text);
        if windows.is_empty() {
            anyhow::bail!("Nothing to summarize");
        }

        let instruction = length.instruction(language);
        if windows.len() == 1 {
            return self.complete(&map_prompt(&instruction, &windows[0], language)).await;
        }

        tracing::info!(
            "Text split into {} windows, {} requests expected",
            windows.len(),
            windows.len() + 1
        );

        let mut partials = Vec::with_capacity(windows.len());
        for (i, piece) in windows.iter().enumerate() {
            tracing::info!("Summarizing window {}/{}", i + 1, windows.len());
            partials.push(self.complete(&map_prompt(&instruction, piece, language)).await?);
        }

        self.complete(&combine_prompt(&instruction, &partials, language))
            .await
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.limiter
            .lock()
            .await
            .wait_if_needed(estimate_tokens(prompt))
            .await;

        for attempt in 0..5u32 {
            match self.try_complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if attempt == 4 {
                        return Err(e.context("Summarization failed after 5 attempts"));
                    }

                    let is_rate_limit = e.to_string().contains("rate_limit");
                    let backoff = if is_rate_limit {
                        std::time::Duration::from_secs(15 * (attempt + 1) as u64)
                    } else {
                        std::time::Duration::from_millis(1000 * (2_u64.pow(attempt)))
                    };

                    if is_rate_limit {
                        tracing::warn!("Rate limit hit, waiting {:?} before retry", backoff);
                    } else {
                        tracing::warn!("Summarization attempt {} failed: {}", attempt + 1, e);
                    }

                    tokio::time::sleep(backoff).await;
                }
            }
        }

        anyhow::bail!("Max retries reached")
    }

    async fn try_complete(&self, prompt: &str) -> Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Claude API error: {}", error_text);
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .context("Failed to parse Claude API response")?;

        response_text(claude_response)
    }
}
