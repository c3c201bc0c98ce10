use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use sleuth_core::{contract, BugInput, DiagnosisResult, Verdict};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct DiagnoseBugRequest {
    /// The error message, stack trace, or bug description to diagnose. Pass it verbatim; do not summarize.
    error_message: String,
}

// --- Server ---

#[derive(Clone)]
pub struct SleuthServer {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SleuthServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Diagnose a bug from an error message or stack trace. Returns a JSON object with title, severity (Low|Medium|High|Critical), classification, root_cause, explanation, suggested_fix, reproduction_steps, prevention_strategy and confidence_score (0-100). Input that is not about a software bug is rejected with an explanation instead of a diagnosis."
    )]
    async fn diagnose_bug(
        &self,
        Parameters(req): Parameters<DiagnoseBugRequest>,
    ) -> Result<CallToolResult, McpError> {
        let Some(input) = BugInput::new(req.error_message) else {
            return Ok(CallToolResult::error(vec![Content::text(
                "error_message must not be empty",
            )]));
        };

        let settings = sleuth_core::read_settings();
        match sleuth_diagnose::analyze(&input, &settings).await {
            Ok(result) => Ok(CallToolResult::success(vec![Content::text(
                render_outcome(&result),
            )])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Analysis failed: {e}"
            ))])),
        }
    }

    #[tool(description = "Get the output contract (system prompt) sent to the diagnosis model, with its version")]
    fn get_output_contract(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Prompt version: {}\n\n{}",
            contract::PROMPT_VERSION,
            contract::SYSTEM_PROMPT
        ))]))
    }

    #[tool(description = "Get the JSON Schema of a diagnosis result")]
    fn get_diagnosis_schema(&self) -> Result<CallToolResult, McpError> {
        let json = serde_json::to_string_pretty(&sleuth_core::diagnosis_schema())
            .unwrap_or_else(|e| format!("Serialization error: {}", e));
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for SleuthServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

/// Diagnoses come back as JSON; rejections as a plain notice so the calling
/// agent does not mistake them for a diagnosis.
fn render_outcome(result: &DiagnosisResult) -> String {
    match result.verdict() {
        Verdict::Rejected { explanation } => {
            format!("Rejected: the input does not look like a bug report.\n{explanation}")
        }
        Verdict::Diagnosed(result) => serde_json::to_string_pretty(result)
            .unwrap_or_else(|e| format!("Serialization error: {}", e)),
    }
}

const INSTRUCTIONS: &str = r#"Sleuth diagnoses software bugs from error messages and stack traces.

Call `diagnose_bug` with the raw error output (compiler errors, runtime exceptions, stack traces, or a description of the misbehavior). Each call makes exactly one request to the configured model; nothing is cached and failed calls are not retried.
Call `get_diagnosis_schema` for the exact shape of the returned JSON and `get_output_contract` for the instructions the model receives.

The model endpoint and model name come from ~/.sleuth/settings.json. The API key is read from OPENROUTER_API_KEY (environment, ~/.sleuth/env, or the project's .env)."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sleuth_core::load_env();
    sleuth_core::telemetry::init_tracing(false, tracing::Level::WARN);

    let service = SleuthServer::new()
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
