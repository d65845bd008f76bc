//! Terminal output helpers.

use evoapp_publish::{PublishEvent, UploadQuote};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Human-readable byte count (`B`, `KB`, `MB`, `GB`, two decimals above bytes).
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.2} GB", b as f64 / GB as f64),
    }
}

pub fn describe_quote(quote: &UploadQuote) -> String {
    format!(
        "{} files ({}) will cost {} AR",
        quote.files,
        format_bytes(quote.bytes),
        quote.price.to_ar_string()
    )
}

fn describe_event(event: &PublishEvent) -> Option<String> {
    match event {
        PublishEvent::FileUploaded {
            path,
            id,
            cached,
            done,
            total,
        } => Some(format!(
            "  [{done}/{total}] {path} -> {id}{}",
            if *cached { " (cached)" } else { "" }
        )),
        PublishEvent::StageStarted { stage } => {
            tracing::debug!(%stage, "stage started");
            None
        }
        PublishEvent::StageCompleted { stage } => {
            tracing::debug!(%stage, "stage completed");
            None
        }
    }
}

/// Prints publish progress until the publisher is dropped.
pub fn spawn_progress(mut events: mpsc::Receiver<PublishEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(line) = describe_event(&event) {
                println!("{line}");
            }
        }
    })
}
