//! AI review of a rendered plan through an Azure OpenAI deployment

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

const DEFAULT_DEPLOYMENT: &str = "gpt-4";
const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Plan text beyond this many characters is cut before sending
pub const MAX_PLAN_CHARS: usize = 10_000;

/// Upper bound for the saved report, header included
pub const MAX_REPORT_CHARS: usize = 4_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.1;

const CRITICAL_KEYWORDS: &[&str] = &[
    "critical",
    "severe",
    "high risk",
    "security vulnerability",
    "exposed",
];

const SYSTEM_PROMPT: &str = "You are an Azure infrastructure expert and security analyst.
Review the provided execution plan for an Azure VM topology and report on:

1. SECURITY ANALYSIS:
   - Vulnerabilities or misconfigurations
   - Network security rules and exposure
   - Access control and authentication mode
   - Password and secret handling

2. COST OPTIMIZATION:
   - VM sizing
   - Cost-saving opportunities
   - Over-provisioned resources

3. BEST PRACTICES:
   - Azure-specific recommendations
   - Resource naming and tagging

4. RISK ASSESSMENT:
   - High-risk changes such as replacements and deletions
   - Potential downtime
   - Dependencies and impact

5. RECOMMENDATIONS:
   - Specific actionable improvements
   - Alternative approaches

Answer in clear sections with bullet points. Be concise but thorough and focus on
actionable insights for a deployment review. Keep the response under 3500 characters.
Use plain text only, no markdown.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0} is not set")]
    MissingSetting(&'static str),

    #[error("analysis request failed: {message}")]
    Http { message: String, status: Option<u16> },

    #[error("analysis response contained no message")]
    EmptyResponse,
}

impl From<ureq::Error> for AnalysisError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Connection settings for the chat-completions deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

impl AnalysisSettings {
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup; key and endpoint are required
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY).ok_or(AnalysisError::MissingSetting(ENV_API_KEY))?;
        let endpoint = get(ENV_ENDPOINT).ok_or(AnalysisError::MissingSetting(ENV_ENDPOINT))?;

        Ok(Self {
            api_key,
            endpoint: normalize_endpoint(&endpoint),
            deployment: get(ENV_DEPLOYMENT).unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            api_version: get(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

/// Force `https://` and drop trailing slashes
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let endpoint = if endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };
    endpoint.trim_end_matches('/').to_string()
}

// ============================================================================
// Request / Response
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Cut plan text to [`MAX_PLAN_CHARS`]; returns whether it was cut
pub fn truncate_plan(plan: &str) -> (String, bool) {
    if plan.chars().count() <= MAX_PLAN_CHARS {
        return (plan.to_string(), false);
    }
    let head: String = plan.chars().take(MAX_PLAN_CHARS).collect();
    (format!("{head}\n... (truncated for analysis)"), true)
}

fn build_request(plan: &str) -> ChatRequest<'static> {
    ChatRequest {
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!(
                    "Please analyze this execution plan for an Azure VM deployment:\n\n```\n{plan}\n```\n\nFollow the structure requested in the system prompt."
                ),
            },
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

/// Client for the chat-completions deployment
pub struct Analyzer {
    agent: ureq::Agent,
    settings: AnalysisSettings,
}

impl Analyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self { agent, settings }
    }

    /// Send the (already truncated) plan and return the model's answer
    pub fn analyze(&self, plan: &str) -> Result<String, AnalysisError> {
        let url = self.settings.completions_url();
        log::debug!("Posting plan analysis request to {url}");

        let response: ChatResponse = self
            .agent
            .post(&url)
            .header("api-key", &self.settings.api_key)
            .header("Content-Type", "application/json")
            .send_json(build_request(plan))?
            .body_mut()
            .read_json()?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }
}

// ============================================================================
// Report
// ============================================================================

/// Report file content, limited to [`MAX_REPORT_CHARS`] in total
pub fn report(analysis: &str, generated: DateTime<Local>) -> String {
    let header = format!(
        "Topology Plan Analysis\n\nGenerated: {}\n\n",
        generated.format("%a %b %e %H:%M:%S %Z %Y")
    );
    let budget = MAX_REPORT_CHARS.saturating_sub(header.chars().count());

    let body = if analysis.chars().count() > budget {
        let kept: String = analysis.chars().take(budget.saturating_sub(50)).collect();
        format!("{kept}\n\n[Content truncated to fit 4000 character limit]")
    } else {
        analysis.to_string()
    };

    format!("{header}{body}")
}

/// Whether the analysis mentions anything that warrants a closer look
pub fn has_critical_findings(analysis: &str) -> bool {
    let lower = analysis.to_lowercase();
    CRITICAL_KEYWORDS.iter().any(|k| lower.contains(k))
}
