//! Completion reporting for launcher scripts: `authflow report`.

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use std::time::Duration;

use authflow::channel::{CompletionKind, CompletionMessage};

pub async fn cmd_report(service: &str, error: Option<&str>, callback_url: &str) -> Result<()> {
    let message = match error {
        Some(error) => CompletionMessage::error(service, error),
        None => CompletionMessage::success(service),
    };
    let endpoint = format!("{}/message", callback_url.trim_end_matches('/'));

    let response = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?
        .post(&endpoint)
        .json(&message)
        .send()
        .await
        .with_context(|| format!("Failed to reach running flow at {}", endpoint))?;

    match response.status() {
        StatusCode::OK => {
            println!("Reported {} for {}", message_label(&message), service);
            Ok(())
        }
        StatusCode::ACCEPTED => bail!("Flow at {} ignored the report", endpoint),
        status => bail!("Flow at {} rejected the report: {}", endpoint, status),
    }
}

fn message_label(message: &CompletionMessage) -> &'static str {
    match message.kind {
        CompletionKind::Success => "success",
        CompletionKind::Error => "error",
    }
}
