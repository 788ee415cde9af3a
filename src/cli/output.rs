//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, TesseraArgs};
use crate::content_store::ContentId;
use crate::error::Result;

/// Result of storing files.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreResult {
    pub stored: Vec<StoredFile>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredFile {
    pub path: String,
    pub id: ContentId,
    pub chars: usize,
}

/// A retrieved document or character range.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResult {
    pub id: ContentId,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResult {
    pub id: ContentId,
}

/// Store statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreInfo {
    pub path: String,
    pub documents: usize,
    pub next_id: ContentId,
    pub data_files: u32,
    pub block_size_chars: usize,
    pub data_file_size_hint: u64,
    pub total_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryInfo>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryInfo {
    pub id: ContentId,
    pub chars: usize,
}

/// Print a result in the selected format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &TesseraArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Print retrieved text as-is in human mode.
pub fn output_text(result: &GetResult, args: &TesseraArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            println!("{}", result.text);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &TesseraArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                println!("{key}: {}", format_value(&val));
            }
        }
        other => println!("{}", format_value(&other)),
    }
    Ok(())
}

fn output_json<T: Serialize>(result: &T, args: &TesseraArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Format a JSON value for human-readable output.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted}]")
        }
        serde_json::Value::Object(obj) => {
            let formatted = obj
                .iter()
                .map(|(k, v)| format!("{k}={}", format_value(v)))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{{{formatted}}}")
        }
        serde_json::Value::Null => "null".to_string(),
    }
}
