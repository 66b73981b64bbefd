use std::path::Path;

use chrono::{DateTime, Local};
use replay::{
    domain::{
        request::RequestDescriptor,
        response::{Outcome, RequestFailure, RequestOutcome},
        summary::RunSummary,
    },
    RunEvent,
};
use serde_json::Value;

const RULE_WIDTH: usize = 70;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(max).collect();
        clipped.push_str("...");
        clipped
    }
}

fn field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::from("N/A"),
    }
}

pub fn banner(api_url: &str, requests_file: &Path, started_at: DateTime<Local>) -> String {
    [
        rule(),
        String::from("🧪 Plant Analysis API Test Request Sender"),
        rule(),
        format!("API URL: {}", api_url),
        format!("Test requests file: {}", requests_file.display()),
        format!("Started: {}", started_at.format("%Y-%m-%d %H:%M:%S")),
    ]
    .join("\n")
}

pub fn loaded(count: usize) -> String {
    format!("📋 Loaded {} test requests", count)
}

pub fn sending(index: usize, total: usize, descriptor: &RequestDescriptor) -> String {
    let reading = descriptor.reading();
    let target = match &descriptor.date {
        Some(date) => format!("for {}", date),
        None => format!("#{}", index),
    };
    [
        format!("[{}/{}] 📤 Sending request {}...", index, total, target),
        format!(
            "   Plant: {} ({})",
            reading.plant_id().unwrap_or("N/A"),
            reading.plant_type().unwrap_or("N/A")
        ),
        format!(
            "   Data: humidity={}%, light={} lux, temp={}°C",
            field(reading.humidity()),
            field(reading.light()),
            field(reading.temperature())
        ),
    ]
    .join("\n")
}

pub fn completed(total: usize, outcome: &RequestOutcome) -> String {
    let lines = match &outcome.outcome {
        Outcome::Success {
            analysis: Some(analysis),
        } => vec![
            format!(
                "✅ Response received: {} - {}",
                analysis.status,
                clip(&analysis.message, 50)
            ),
            format!("   Action: {}", clip(&analysis.action, 60)),
        ],
        Outcome::Success { analysis: None } => vec![format!(
            "✅ Response received: HTTP {}",
            outcome
                .http_status
                .map(|status| status.to_string())
                .unwrap_or_default()
        )],
        Outcome::Failure(RequestFailure::InvalidDescriptor(reason)) => vec![format!(
            "[{}/{}] ⚠️  Skipping request {}: {}",
            outcome.index, total, outcome.label, reason
        )],
        Outcome::Failure(RequestFailure::Network(message)) => {
            vec![format!("❌ Error: {}", message)]
        }
        Outcome::Failure(RequestFailure::UnexpectedStatus { status, detail }) => {
            let mut lines = vec![format!("❌ Error: HTTP {}", status)];
            if let Some(detail) = detail {
                lines.push(format!("   Details: {}", detail));
            }
            lines
        }
    };
    let mut block = lines.join("\n");
    block.push('\n');
    block
}

pub fn run_header() -> String {
    format!("🚀 Starting to send requests...\n{}\n", rule())
}

pub fn summary(summary: &RunSummary) -> String {
    let mut lines = vec![
        rule(),
        String::from("📊 Summary"),
        rule(),
        format!("Total requests: {}", summary.total),
        format!("✅ Successful: {}", summary.successful),
        format!("❌ Failed: {}", summary.failed),
    ];
    if !summary.failed_labels.is_empty() {
        lines.push(format!(
            "   Failed requests: {}",
            summary.failed_labels.join(", ")
        ));
    }
    if summary.interrupted {
        lines.push(format!("⏭️  Not attempted: {}", summary.not_attempted));
    }
    lines.push(format!(
        "⏱️  Total time: {:.2} seconds",
        summary.elapsed.as_secs_f64()
    ));
    if let Some(average) = summary.average_per_request() {
        lines.push(format!(
            "📈 Average time per request: {:.2} seconds",
            average.as_secs_f64()
        ));
    }
    lines.push(String::new());
    lines.push(verdict(summary));
    lines.join("\n")
}

fn verdict(summary: &RunSummary) -> String {
    if summary.interrupted {
        format!(
            "🛑 Run interrupted: {} request(s) were not sent.",
            summary.not_attempted
        )
    } else if summary.all_succeeded() {
        String::from("🎉 All requests completed successfully!")
    } else {
        format!(
            "⚠️  {} request(s) failed. Check the errors above.",
            summary.failed
        )
    }
}

/// Prints run events to stdout as they happen.
pub fn print_event(event: RunEvent<'_>) {
    match event {
        RunEvent::Started { .. } => println!("{}", run_header()),
        RunEvent::Sending {
            index,
            total,
            descriptor,
        } => println!("{}", sending(index, total, descriptor)),
        RunEvent::Completed { total, outcome } => println!("{}", completed(total, outcome)),
        RunEvent::Finished(run_summary) => println!("{}", summary(run_summary)),
    }
}
