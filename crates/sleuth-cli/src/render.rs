//! Terminal rendering of diagnosis outcomes.
//!
//! `console` handles colors and turns them off for pipes and `NO_COLOR`.

use console::{style, StyledObject};
use sleuth_core::{ConfidenceBand, DiagnosisResult, Severity};

const BAR_WIDTH: usize = 20;

pub fn diagnosis(result: &DiagnosisResult) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str(&format!(
        "{} {}\n",
        severity_badge(result.severity),
        style(&result.title).bold()
    ));
    out.push_str(&format!(
        "{} {}\n",
        style("Classification:").dim(),
        result.classification
    ));
    out.push_str(&confidence_line(result.confidence_score));
    out.push('\n');

    section(&mut out, "Root cause", &result.root_cause);
    section(&mut out, "Explanation", &result.explanation);
    section(&mut out, "Suggested fix", &result.suggested_fix);

    if !result.reproduction_steps.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n", style("Reproduction steps").cyan().bold()));
        for (i, step) in result.reproduction_steps.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, step));
        }
    }

    section(&mut out, "Prevention", &result.prevention_strategy);
    out
}

pub fn rejection(explanation: &str) -> String {
    format!(
        "{} {}\n{}\n",
        style("!").yellow(),
        style("Not a bug report").yellow().bold(),
        explanation
    )
}

pub fn failure(message: &str) -> String {
    format!(
        "{} {}\n{}\n",
        style("✗").red(),
        style("Analysis failed").red().bold(),
        message
    )
}

fn section(out: &mut String, heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(&format!("{}\n", style(heading).cyan().bold()));
    for line in body.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
}

fn severity_badge(severity: Severity) -> StyledObject<String> {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::Critical => style(label).red().bold(),
        Severity::High => style(label).red(),
        Severity::Medium => style(label).yellow(),
        Severity::Low => style(label).green(),
    }
}

fn confidence_line(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
    let bar = match ConfidenceBand::from_score(score) {
        ConfidenceBand::Low => style(bar).red(),
        ConfidenceBand::Moderate => style(bar).yellow(),
        ConfidenceBand::High => style(bar).green(),
    };
    format!("{} {} {}%", style("Confidence:").dim(), bar, score)
}
