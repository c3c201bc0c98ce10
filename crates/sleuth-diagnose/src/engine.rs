use std::time::Duration;

use serde::{Deserialize, Serialize};
use sleuth_core::{AiSettings, Credential};

use crate::error::{DiagnoseError, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Send one chat-completion request and return the assistant's reply text.
pub async fn generate(
    settings: &AiSettings,
    credential: &Credential,
    system: &str,
    user_msg: &str,
) -> Result<String> {
    let mut builder = reqwest::Client::builder();
    // 0 means no client timeout, same as unset
    if let Some(secs) = settings.timeout_secs.filter(|secs| *secs > 0) {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;

    let body = ChatRequest {
        model: &settings.model,
        response_format: ResponseFormat {
            kind: "json_object",
        },
        messages: [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user_msg,
            },
        ],
    };

    let response = client
        .post(settings.endpoint.as_str())
        .bearer_auth(credential.expose())
        .header("HTTP-Referer", settings.referer.as_str())
        .header("X-Title", settings.app_title.as_str())
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        // The status is the failure; an unreadable body only loses the detail.
        let text = response.text().await.unwrap_or_default();
        return Err(DiagnoseError::Api {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            message: api_error_message(&text),
        });
    }

    let text = response.text().await?;
    let envelope: ChatResponse = serde_json::from_str(&text).map_err(DiagnoseError::Envelope)?;
    extract_content(envelope)
}

/// Best-effort `error.message` from an error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Unknown error".to_string())
}

fn extract_content(envelope: ChatResponse) -> Result<String> {
    match envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
    {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(DiagnoseError::EmptyResponse),
    }
}
