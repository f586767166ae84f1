use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{ModelResult, ProviderConfig};
use crate::services::IngestReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub trait Formatter {
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_ingest(&self, summary: &IngestSummary) -> String;
    fn format_providers(&self, providers: &[ProviderConfig]) -> String;
    fn format_usage(&self, usage: &UsageInfo) -> String;
    fn format_message(&self, message: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub id: String,
    pub source: String,
    pub model_provider: String,
    pub embedding_provider: String,
    pub vectors: usize,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub database_path: Option<String>,
    pub providers: usize,
    pub stores: Vec<StoreStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub store: String,
    pub refreshed: bool,
    pub report: IngestReport,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageInfo {
    pub model: String,
    pub store: String,
    pub passages: Vec<(String, f32)>,
    pub result: ModelResult,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Status");
        let _ = writeln!(output, "------");
        let _ = writeln!(
            output,
            "Config:     {}",
            status.config_path.as_deref().unwrap_or("(none)")
        );
        let _ = writeln!(
            output,
            "Database:   {}",
            status.database_path.as_deref().unwrap_or("(none)")
        );
        let _ = writeln!(output, "Providers:  {}", status.providers);
        let _ = writeln!(output);

        if status.stores.is_empty() {
            let _ = writeln!(output, "No stores configured.");
            return output;
        }
        let _ = writeln!(output, "Stores:");
        for store in &status.stores {
            let marker = if store.is_default { " (default)" } else { "" };
            let _ = writeln!(output, "  {}{}", store.id, marker);
            let _ = writeln!(output, "    Source:     {}", store.source);
            let _ = writeln!(output, "    Model:      {}", or_default(&store.model_provider));
            let _ = writeln!(
                output,
                "    Embedding:  {}",
                or_default(&store.embedding_provider)
            );
            let _ = writeln!(output, "    Vectors:    {}", store.vectors);
        }
        output
    }

    fn format_ingest(&self, summary: &IngestSummary) -> String {
        let mut output = String::new();
        let verb = if summary.refreshed {
            "Refreshed"
        } else {
            "Ingested"
        };
        let _ = writeln!(output, "{} store {}", verb, summary.store);
        let _ = writeln!(output, "  Files:    {}", summary.report.files);
        let _ = writeln!(output, "  Chunks:   {}", summary.report.chunks);
        let _ = writeln!(output, "  Vectors:  {}", summary.report.vectors);
        let _ = writeln!(output, "  Duration: {}ms", summary.duration_ms);
        output
    }

    fn format_providers(&self, providers: &[ProviderConfig]) -> String {
        if providers.is_empty() {
            return "No providers configured.\n".to_string();
        }
        let mut output = String::new();
        for p in providers {
            let marker = if p.is_default { " *" } else { "" };
            let _ = writeln!(
                output,
                "{:<24} {:<10} {:<14} {}{}",
                p.id(),
                p.category,
                p.provider_type,
                p.sub_type,
                marker
            );
        }
        output
    }

    fn format_usage(&self, usage: &UsageInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "---");
        let _ = writeln!(output, "Store:    {}", usage.store);
        let _ = writeln!(output, "Model:    {}", usage.model);
        for (i, (name, score)) in usage.passages.iter().enumerate() {
            let _ = writeln!(output, "Source {}: {} [Score: {:.3}]", i + 1, name, score);
        }
        let r = &usage.result;
        let _ = writeln!(
            output,
            "Tokens:   {} prompt + {} response = {}",
            r.prompt_token_count, r.response_token_count, r.total_token_count
        );
        if r.image_count > 0 {
            let _ = writeln!(output, "Images:   {}", r.image_count);
        }
        let _ = writeln!(output, "Price:    {:.6} {}", r.total_price, r.currency);
        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

fn or_default(name: &str) -> &str {
    if name.is_empty() { "(default)" } else { name }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut s = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        s.push('\n');
        s
    }
}

impl Formatter for JsonFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_ingest(&self, summary: &IngestSummary) -> String {
        self.render(summary)
    }

    fn format_providers(&self, providers: &[ProviderConfig]) -> String {
        let redacted: Vec<serde_json::Value> = providers
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id(),
                    "category": p.category,
                    "type": p.provider_type,
                    "sub_type": p.sub_type,
                    "is_default": p.is_default,
                })
            })
            .collect();
        self.render(&redacted)
    }

    fn format_usage(&self, usage: &UsageInfo) -> String {
        self.render(usage)
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
