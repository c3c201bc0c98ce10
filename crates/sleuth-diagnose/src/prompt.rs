use sleuth_core::{contract, BugInput};

pub fn system_prompt() -> &'static str {
    contract::SYSTEM_PROMPT
}

/// Frame the raw bug report for the model. The report itself is passed through untouched.
pub fn user_message(input: &BugInput) -> String {
    format!(
        "\nAnalyze the following bug report, error message, or stack trace. \
Generate a title and determine the severity, then provide the full diagnosis:\n\n{}\n",
        input.error_message
    )
}
