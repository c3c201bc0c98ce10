pub mod engine;
pub mod error;
mod parse;
mod prompt;

use sleuth_core::{contract, AiSettings, BugInput, Credential, DiagnosisResult};

pub use error::{DiagnoseError, ErrorKind, ParseError, Result};
pub use parse::normalize;
pub use prompt::{system_prompt, user_message};

/// Diagnose a bug report with the credential from `OPENROUTER_API_KEY`.
///
/// A missing credential or blank input fails before any network activity.
pub async fn analyze(input: &BugInput, settings: &AiSettings) -> Result<DiagnosisResult> {
    run(input, settings, Credential::from_env()).await
}

/// Same as [`analyze`] with an explicit credential.
pub async fn analyze_with(
    input: &BugInput,
    settings: &AiSettings,
    credential: &Credential,
) -> Result<DiagnosisResult> {
    run(input, settings, Some(credential.clone())).await
}

#[tracing::instrument(
    name = "analyze",
    skip_all,
    fields(model = %settings.model, prompt_version = contract::PROMPT_VERSION)
)]
async fn run(
    input: &BugInput,
    settings: &AiSettings,
    credential: Option<Credential>,
) -> Result<DiagnosisResult> {
    let outcome = diagnose(input, settings, credential).await;
    match &outcome {
        Ok(result) => tracing::info!(
            severity = %result.severity,
            classification = %result.classification,
            confidence = result.confidence_score,
            "diagnosis complete"
        ),
        Err(e) => tracing::error!(kind = %e.kind(), error = %e, "diagnosis failed"),
    }
    outcome
}

async fn diagnose(
    input: &BugInput,
    settings: &AiSettings,
    credential: Option<Credential>,
) -> Result<DiagnosisResult> {
    let credential = credential.ok_or(DiagnoseError::MissingCredential)?;
    if input.is_blank() {
        return Err(DiagnoseError::EmptyInput);
    }

    let user_msg = prompt::user_message(input);
    tracing::debug!(endpoint = %settings.endpoint, "sending bug report");

    let raw = engine::generate(settings, &credential, prompt::system_prompt(), &user_msg).await?;
    tracing::debug!(raw = %raw, "raw model output");

    Ok(parse::normalize(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use sleuth_core::Severity;

    const PATH: &str = "/api/v1/chat/completions";

    fn settings_for(server: &ServerGuard) -> AiSettings {
        AiSettings {
            endpoint: format!("{}{}", server.url(), PATH),
            ..AiSettings::default()
        }
    }

    fn key() -> Credential {
        Credential::new("sk-or-test").unwrap()
    }

    fn input() -> BugInput {
        BugInput::new("TypeError: Cannot read properties of undefined (reading 'map')").unwrap()
    }

    fn envelope(content: &str) -> String {
        json!({
            "id": "gen-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    fn diagnosis_json() -> serde_json::Value {
        json!({
            "title": "Mapping over undefined list",
            "severity": "High",
            "classification": "Type Error",
            "root_cause": "`items` is undefined on first render.",
            "explanation": "The data arrives asynchronously.",
            "suggested_fix": "Default to an empty array.",
            "reproduction_steps": ["Open the page", "Watch the console"],
            "prevention_strategy": "Type the API response.",
            "confidence_score": 88
        })
    }

    #[tokio::test]
    async fn sends_contract_request_and_returns_parsed_diagnosis() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer sk-or-test")
            .match_header("content-type", "application/json")
            .match_header("http-referer", sleuth_core::DEFAULT_REFERER)
            .match_header("x-title", sleuth_core::DEFAULT_APP_TITLE)
            .match_body(Matcher::PartialJson(json!({
                "model": sleuth_core::DEFAULT_MODEL,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": contract::SYSTEM_PROMPT },
                    { "role": "user", "content": user_message(&input()) }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(&diagnosis_json().to_string()))
            .expect(1)
            .create_async()
            .await;

        let result = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(result.title, "Mapping over undefined list");
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.root_cause, "`items` is undefined on first render.");
        assert_eq!(result.reproduction_steps, vec!["Open the page", "Watch the console"]);
        assert_eq!(result.confidence_score, 88.0);
    }

    #[tokio::test]
    async fn fenced_reply_is_normalized() {
        let mut server = Server::new_async().await;
        let fenced = format!("```json\n{}\n```", diagnosis_json());
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(envelope(&fenced))
            .create_async()
            .await;

        let result = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap();
        assert_eq!(result.classification, "Type Error");
    }

    #[tokio::test]
    async fn unauthorized_reports_status_and_remote_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(401)
            .with_body(r#"{"error":{"message":"No auth credentials found","code":401}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap_err();
        mock.assert_async().await;

        assert!(matches!(err, DiagnoseError::Api { status: 401, .. }));
        assert_eq!(err.kind(), ErrorKind::Network);
        let msg = err.to_string();
        assert!(msg.contains("401"), "{msg}");
        assert!(msg.contains("No auth credentials found"), "{msg}");
    }

    #[tokio::test]
    async fn error_status_with_diagnosis_body_is_not_parsed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(500)
            .with_body(envelope(&diagnosis_json().to_string()))
            .create_async()
            .await;

        let err = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap_err();
        match err {
            DiagnoseError::Api { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Unknown error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Answer one request with `head` and the start of a body, then hang up.
    async fn serve_truncated_once(head: &'static str, partial_body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(partial_body.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });
        format!("http://{addr}{PATH}")
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&request[..head_end]);
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= head_end + 4 + length
    }

    #[tokio::test]
    async fn unreadable_error_body_keeps_the_status() {
        let endpoint = serve_truncated_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n",
            r#"{"error""#,
        )
        .await;
        let settings = AiSettings {
            endpoint,
            ..AiSettings::default()
        };

        let err = analyze_with(&input(), &settings, &key()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(
            err.to_string(),
            "API Error: 401 Unauthorized - Unknown error"
        );
    }

    #[tokio::test]
    async fn zero_timeout_means_no_client_timeout() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(envelope(&diagnosis_json().to_string()))
            .expect(1)
            .create_async()
            .await;
        let settings = AiSettings {
            timeout_secs: Some(0),
            ..settings_for(&server)
        };

        let result = analyze_with(&input(), &settings, &key()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.title, "Mapping over undefined list");
    }

    #[tokio::test]
    async fn configured_timeout_still_allows_prompt_replies() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(envelope(&diagnosis_json().to_string()))
            .create_async()
            .await;
        let settings = AiSettings {
            timeout_secs: Some(30),
            ..settings_for(&server)
        };

        let result = analyze_with(&input(), &settings, &key()).await.unwrap();
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn empty_content_is_a_protocol_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#)
            .create_async()
            .await;

        let err = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap_err();
        assert!(matches!(err, DiagnoseError::EmptyResponse));
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), "No content received from AI.");
    }

    #[tokio::test]
    async fn non_json_envelope_is_a_protocol_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap_err();
        assert!(matches!(err, DiagnoseError::Envelope(_)));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn prose_without_json_is_a_parsing_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(envelope("I am unable to help with that."))
            .create_async()
            .await;

        let err = analyze_with(&input(), &settings_for(&server), &key())
            .await
            .unwrap_err();
        assert!(matches!(err, DiagnoseError::Parse(ParseError::NoJsonObject)));
        assert_eq!(err.kind(), ErrorKind::Parsing);
    }

    #[tokio::test]
    async fn unrelated_request_comes_back_as_a_rejection() {
        let mut server = Server::new_async().await;
        let reply = json!({
            "title": "Not a bug",
            "severity": "Low",
            "classification": "Unrelated Request",
            "explanation": "This looks like a cooking question.",
            "reproduction_steps": [],
            "confidence_score": 100
        });
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(envelope(&reply.to_string()))
            .create_async()
            .await;

        let result = analyze_with(
            &BugInput::new("How do I bake sourdough?").unwrap(),
            &settings_for(&server),
            &key(),
        )
        .await
        .unwrap();
        assert!(result.is_unrelated());
        assert_eq!(
            result.verdict(),
            sleuth_core::Verdict::Rejected {
                explanation: "This looks like a cooking question."
            }
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = run(&input(), &settings_for(&server), None).await.unwrap_err();
        mock.assert_async().await;

        assert!(matches!(err, DiagnoseError::MissingCredential));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn blank_input_fails_before_any_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let blank = BugInput {
            error_message: "   ".to_string(),
        };
        let err = analyze_with(&blank, &settings_for(&server), &key())
            .await
            .unwrap_err();
        mock.assert_async().await;
        assert!(matches!(err, DiagnoseError::EmptyInput));
    }
}
