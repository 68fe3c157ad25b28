//! Outreach email drafts for channels with a contact address.
//!
//! Each target's email is picked from its contact column, a prompt is built
//! from the channel's stats and sent to an OpenAI-compatible chat endpoint.
//! A JSON answer is requested first; when that fails or comes back empty the
//! draft is requested again as plain text and split heuristically.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use channelscout_llm::{ChatMessage, ChatRequest, Client};
use serde::{Deserialize, Serialize};

use crate::contact::is_email;
use crate::db::DbChannelRow;
use crate::export::ExportedRow;
use crate::pacing::{parsed_var, RetryConfig};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GOAL: &str = "A short, friendly email proposing a quick call, no spam";
pub const DEFAULT_OUTREACH_OUTPUT: &str = "outreach_output.csv";

const SYSTEM_PROMPT: &str = "You write concise, friendly outreach emails without fluff or spam.";
const PLAIN_TEXT_SUFFIX: &str =
    "\nReturn the subject on the first line, then a blank line, then the email body.";
const NO_EMAIL_MESSAGE: &str = "contact is missing or not an email";

#[derive(thiserror::Error, Debug)]
pub enum OutreachError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("LLM request failed: {0}")]
    Llm(#[from] channelscout_llm::Error),
    #[error("LLM returned an empty draft")]
    EmptyDraft,
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for a drafting run, read from `OPENAI_*` and `OUTREACH_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct OutreachConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub goal: String,
    pub output: PathBuf,
    pub limit: Option<usize>,
    pub retry: RetryConfig,
}

impl OutreachConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: channelscout_llm::DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 500,
            goal: DEFAULT_GOAL.to_string(),
            output: PathBuf::from(DEFAULT_OUTREACH_OUTPUT),
            limit: None,
            retry: RetryConfig::default(),
        }
    }

    /// Environment settings after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, OutreachError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, OutreachError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = non_empty("OPENAI_API_KEY").ok_or(OutreachError::MissingApiKey)?;
        let mut config = Self::new(&api_key);
        if let Some(base_url) = non_empty("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = non_empty("OPENAI_MODEL").or_else(|| non_empty("OUTREACH_MODEL")) {
            config.model = model;
        }
        config.temperature = parsed_var(&lookup, "OUTREACH_TEMPERATURE", config.temperature);
        config.max_tokens = parsed_var(&lookup, "OUTREACH_MAX_TOKENS", config.max_tokens);
        if let Some(goal) = non_empty("OUTREACH_GOAL") {
            config.goal = goal;
        }
        if let Some(output) = non_empty("OUTREACH_OUTPUT") {
            config.output = PathBuf::from(output);
        }
        config.limit = non_empty("OUTREACH_LIMIT").and_then(|v| v.parse().ok());
        config.retry = RetryConfig::from_lookup(&lookup);
        Ok(config)
    }
}

/// A channel to write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutreachTarget {
    pub channel_link: String,
    /// `;`-joined contact members as stored by the export.
    pub contact_info: String,
    pub country: String,
    pub subscribers: u64,
}

impl From<&DbChannelRow> for OutreachTarget {
    fn from(row: &DbChannelRow) -> Self {
        Self {
            channel_link: row.channel_link.clone(),
            contact_info: row.contact_info.clone(),
            country: row.country.clone(),
            subscribers: row.subscribers.max(0) as u64,
        }
    }
}

impl From<&ExportedRow> for OutreachTarget {
    fn from(row: &ExportedRow) -> Self {
        Self {
            channel_link: row.channel_link.clone(),
            contact_info: row.contact_info.clone(),
            country: row.country.clone(),
            subscribers: row.subscribers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachStatus {
    Ok,
    SkippedNoEmail,
    Error,
}

impl OutreachStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::SkippedNoEmail => "skipped_no_email",
            Self::Error => "error",
        }
    }
}

/// One row of the outreach CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachResult {
    pub status: OutreachStatus,
    pub error: String,
    pub contact: String,
    pub channel_link: String,
    pub subject: String,
    pub body: String,
}

impl OutreachResult {
    fn failed(target: &OutreachTarget, status: OutreachStatus, contact: &str, error: String) -> Self {
        Self {
            status,
            error,
            contact: contact.to_string(),
            channel_link: target.channel_link.clone(),
            subject: String::new(),
            body: String::new(),
        }
    }
}

/// The first member of `contact_info` that is a whole email address.
pub fn pick_email(contact_info: &str) -> Option<String> {
    contact_info
        .split(';')
        .map(str::trim)
        .find(|member| is_email(member))
        .map(String::from)
}

pub fn build_prompt(target: &OutreachTarget, email: &str, goal: &str) -> String {
    let mut context = Vec::new();
    if !target.channel_link.is_empty() {
        context.push(format!("Channel: {}", target.channel_link));
    }
    if !target.country.is_empty() {
        context.push(format!("Country: {}", target.country));
    }
    if target.subscribers > 0 {
        context.push(format!("Subscribers: {}", target.subscribers));
    }

    format!(
        "Generate a personalized outreach email in English.\n\
         Return strictly in JSON with fields: subject, body.\n\
         Requirements:\n\
         - Subject up to 8 words, no clickbait.\n\
         - Polite, concrete tone; no fluff or marketing clichés.\n\
         - 3 to 6 short sentences, with a clear single CTA.\n\
         - Plain text only, no HTML.\n\
         Goal: {}\n\
         Recipient email: {}\n\
         Context (if any):\n{}\n",
        goal,
        email,
        context.join("\n")
    )
}

#[derive(Deserialize)]
struct JsonDraft {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// Subject and body from a JSON answer; `None` unless both are non-empty.
fn parse_json_draft(content: &str) -> Option<(String, String)> {
    let draft: JsonDraft = serde_json::from_str(content).ok()?;
    let subject = draft.subject.unwrap_or_default().trim().to_string();
    let body = draft.body.unwrap_or_default().trim().to_string();
    if subject.is_empty() || body.is_empty() {
        None
    } else {
        Some((subject, body))
    }
}

/// First paragraph as subject, the rest as body. Without a second paragraph
/// the whole answer is the body.
fn parse_plain_draft(content: &str) -> (String, String) {
    let content = content.trim();
    let (first, rest) = content.split_once("\n\n").unwrap_or((content, ""));
    let subject = first
        .trim()
        .replace("Subject:", "")
        .replace("Тема:", "")
        .trim()
        .to_string();
    let rest = rest.trim();
    let body = if rest.is_empty() { content } else { rest };
    (subject, body.to_string())
}

pub type OutreachProgressFn<'a> = Box<dyn FnMut(usize, usize, &OutreachResult) + Send + 'a>;

pub struct OutreachGenerator {
    client: Client,
    config: OutreachConfig,
}

impl OutreachGenerator {
    pub fn new(config: OutreachConfig) -> Self {
        let client = Client::with_base_url(&config.base_url, &config.api_key);
        Self { client, config }
    }

    pub fn config(&self) -> &OutreachConfig {
        &self.config
    }

    fn request(&self, prompt: String) -> ChatRequest {
        ChatRequest::new(
            &self.config.model,
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
    }

    /// Send `request`, retrying rate limits and server errors with backoff.
    async fn chat(&self, request: &ChatRequest) -> Result<String, OutreachError> {
        let mut attempt = 0;
        loop {
            match self.client.chat(request).await {
                Ok(response) => return Ok(response.content().unwrap_or_default().to_string()),
                Err(e) if e.is_transient() && attempt < self.config.retry.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        "LLM request failed ({}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.config.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Draft a subject and body for `email`.
    pub async fn draft(&self, target: &OutreachTarget, email: &str) -> Result<(String, String), OutreachError> {
        let prompt = build_prompt(target, email, &self.config.goal);

        let json_request = self.request(prompt.clone()).with_json_output();
        match self.chat(&json_request).await {
            Ok(content) => {
                if let Some(draft) = parse_json_draft(&content) {
                    return Ok(draft);
                }
                tracing::debug!("JSON draft for {} incomplete, asking for plain text", email);
            }
            Err(e) => tracing::debug!("JSON draft for {} failed ({}), asking for plain text", email, e),
        }

        let plain_request = self.request(format!("{}{}", prompt, PLAIN_TEXT_SUFFIX));
        let content = self.chat(&plain_request).await?;
        if content.trim().is_empty() {
            return Err(OutreachError::EmptyDraft);
        }
        Ok(parse_plain_draft(&content))
    }

    /// Result for one target. Never fails: problems land in the row.
    pub async fn process(&self, target: &OutreachTarget) -> OutreachResult {
        let Some(email) = pick_email(&target.contact_info) else {
            return OutreachResult::failed(
                target,
                OutreachStatus::SkippedNoEmail,
                &target.contact_info,
                NO_EMAIL_MESSAGE.to_string(),
            );
        };
        match self.draft(target, &email).await {
            Ok((subject, body)) => OutreachResult {
                status: OutreachStatus::Ok,
                error: String::new(),
                contact: email,
                channel_link: target.channel_link.clone(),
                subject,
                body,
            },
            Err(e) => {
                tracing::warn!("Outreach draft for {} failed: {}", target.channel_link, e);
                OutreachResult::failed(target, OutreachStatus::Error, &email, e.to_string())
            }
        }
    }

    /// Process `targets` in order, honouring the configured limit.
    pub async fn run(
        &self,
        targets: &[OutreachTarget],
        mut progress: Option<OutreachProgressFn<'_>>,
    ) -> Vec<OutreachResult> {
        let count = self.config.limit.map_or(targets.len(), |l| l.min(targets.len()));
        let mut results = Vec::with_capacity(count);
        for (i, target) in targets.iter().take(count).enumerate() {
            let result = self.process(target).await;
            if let Some(ref mut progress) = progress {
                progress(i + 1, count, &result);
            }
            results.push(result);
        }
        results
    }
}

/// Counts per status, as `(ok, skipped, errors)`.
pub fn outreach_summary(results: &[OutreachResult]) -> (usize, usize, usize) {
    results.iter().fold((0, 0, 0), |(ok, skipped, errors), r| match r.status {
        OutreachStatus::Ok => (ok + 1, skipped, errors),
        OutreachStatus::SkippedNoEmail => (ok, skipped + 1, errors),
        OutreachStatus::Error => (ok, skipped, errors + 1),
    })
}

pub fn export_outreach_csv<W: Write>(results: &[OutreachResult], writer: W) -> Result<(), OutreachError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in results {
        wtr.serialize(result)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_outreach_to_path(results: &[OutreachResult], path: &Path) -> Result<(), OutreachError> {
    let file = File::create(path)?;
    export_outreach_csv(results, file)?;
    tracing::info!("wrote {} outreach rows to {}", results.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(contact: &str) -> OutreachTarget {
        OutreachTarget {
            channel_link: "https://www.youtube.com/@cook".to_string(),
            contact_info: contact.to_string(),
            country: "Россия".to_string(),
            subscribers: 12_000,
        }
    }

    #[test]
    fn pick_email_skips_profiles() {
        assert_eq!(
            pick_email("instagram.com/cook; cook@mail.ru"),
            Some("cook@mail.ru".to_string())
        );
        assert_eq!(pick_email("a@b.co;c@d.org"), Some("a@b.co".to_string()));
        assert_eq!(pick_email("instagram.com/cook"), None);
        assert_eq!(pick_email(""), None);
        assert_eq!(pick_email("write me at cook@mail.ru"), None);
    }

    #[test]
    fn target_from_exported_row() {
        let row = ExportedRow {
            channel_link: "https://www.youtube.com/@cook".to_string(),
            contact_info: "cook@mail.ru".to_string(),
            country: "Россия".to_string(),
            subscribers: 12_000,
            videos: 76,
            views: 3_734_972,
            scraped_at: None,
        };
        assert_eq!(OutreachTarget::from(&row), target("cook@mail.ru"));
    }

    #[test]
    fn prompt_carries_goal_email_and_context() {
        let prompt = build_prompt(&target("cook@mail.ru"), "cook@mail.ru", "Sponsor a video");
        assert!(prompt.contains("Goal: Sponsor a video\n"));
        assert!(prompt.contains("Recipient email: cook@mail.ru\n"));
        assert!(prompt.contains("Channel: https://www.youtube.com/@cook"));
        assert!(prompt.contains("Country: Россия"));
        assert!(prompt.contains("Subscribers: 12000"));
        assert!(prompt.contains("Return strictly in JSON with fields: subject, body."));
    }

    #[test]
    fn prompt_omits_empty_context() {
        let mut t = target("x@y.io");
        t.country.clear();
        t.subscribers = 0;
        let prompt = build_prompt(&t, "x@y.io", DEFAULT_GOAL);
        assert!(!prompt.contains("Country:"));
        assert!(!prompt.contains("Subscribers:"));
    }

    #[test]
    fn json_draft_needs_both_fields() {
        assert_eq!(
            parse_json_draft(r#"{"subject":" Hi ","body":" Hello there "}"#),
            Some(("Hi".to_string(), "Hello there".to_string()))
        );
        assert_eq!(parse_json_draft(r#"{"subject":"Hi","body":""}"#), None);
        assert_eq!(parse_json_draft(r#"{"subject":"Hi"}"#), None);
        assert_eq!(parse_json_draft("Subject: Hi"), None);
    }

    #[test]
    fn plain_draft_splits_on_blank_line() {
        assert_eq!(
            parse_plain_draft("Subject: Quick call?\n\nHello,\nshall we talk?"),
            ("Quick call?".to_string(), "Hello,\nshall we talk?".to_string())
        );
        assert_eq!(
            parse_plain_draft("Тема: Созвон\n\nПривет"),
            ("Созвон".to_string(), "Привет".to_string())
        );
    }

    #[test]
    fn plain_draft_without_body_keeps_whole_answer() {
        assert_eq!(
            parse_plain_draft("  Just one paragraph  "),
            ("Just one paragraph".to_string(), "Just one paragraph".to_string())
        );
    }

    #[test]
    fn config_requires_api_key() {
        let err = OutreachConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, OutreachError::MissingApiKey));
        let err = OutreachConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, OutreachError::MissingApiKey));
    }

    #[test]
    fn config_reads_environment() {
        let config = OutreachConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_BASE_URL" => Some("http://localhost:8080/v1".to_string()),
            "OUTREACH_MODEL" => Some("local-model".to_string()),
            "OUTREACH_TEMPERATURE" => Some("0.2".to_string()),
            "OUTREACH_MAX_TOKENS" => Some("300".to_string()),
            "OUTREACH_LIMIT" => Some("5".to_string()),
            "OUTREACH_OUTPUT" => Some("drafts.csv".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 300);
        assert_eq!(config.limit, Some(5));
        assert_eq!(config.output, PathBuf::from("drafts.csv"));
        assert_eq!(config.goal, DEFAULT_GOAL);
    }

    #[test]
    fn openai_model_wins_over_outreach_model() {
        let config = OutreachConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("k".to_string()),
            "OPENAI_MODEL" => Some("gpt-4o".to_string()),
            "OUTREACH_MODEL" => Some("other".to_string()),
            "OUTREACH_LIMIT" => Some("all".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.limit, None);
    }

    #[test]
    fn summary_counts_statuses() {
        let t = target("");
        let results = vec![
            OutreachResult::failed(&t, OutreachStatus::SkippedNoEmail, "", String::new()),
            OutreachResult::failed(&t, OutreachStatus::Error, "a@b.co", "boom".to_string()),
            OutreachResult {
                status: OutreachStatus::Ok,
                error: String::new(),
                contact: "a@b.co".to_string(),
                channel_link: t.channel_link.clone(),
                subject: "Hi".to_string(),
                body: "Hello".to_string(),
            },
        ];
        assert_eq!(outreach_summary(&results), (1, 1, 1));
    }

    #[test]
    fn csv_has_header_and_snake_case_status() {
        let t = target("");
        let results = vec![OutreachResult::failed(
            &t,
            OutreachStatus::SkippedNoEmail,
            "instagram.com/cook",
            NO_EMAIL_MESSAGE.to_string(),
        )];
        let mut buf = Vec::new();
        export_outreach_csv(&results, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("status,error,contact,channel_link,subject,body")
        );
        assert_eq!(
            lines.next(),
            Some("skipped_no_email,contact is missing or not an email,instagram.com/cook,https://www.youtube.com/@cook,,")
        );
    }
}
