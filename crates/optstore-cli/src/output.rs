//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeMap;

use serde_json::Value;

use optstore_core::OptionRecord;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single resolved value
    pub fn print_value(&self, value: &Value) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", format_value(value)),
            OutputFormat::Json => println!("{}", pretty(value)),
        }
    }

    /// Print a key → value listing
    pub fn print_options(&self, options: &BTreeMap<String, Value>) {
        match self.format {
            OutputFormat::Human => {
                if options.is_empty() {
                    println!("No options found.");
                    return;
                }
                for (key, value) in options {
                    println!("{} = {}", key, truncate(&format_value(value), 60));
                }
                println!("\n{} option(s)", options.len());
            }
            OutputFormat::Json => println!("{}", pretty(options)),
            OutputFormat::Quiet => {
                for key in options.keys() {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print the stored row of an option
    pub fn print_record(&self, record: &OptionRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("Key:       {}", record.key);
                println!("Value:     {}", record.value);
                println!("Auto-load: {}", if record.auto_load { "yes" } else { "no" });
                println!(
                    "Extension: {}",
                    record.extension.as_deref().unwrap_or("(none)")
                );
            }
            OutputFormat::Json => println!("{}", pretty(record)),
            OutputFormat::Quiet => println!("{}", record.value),
        }
    }

    /// Print whether an option exists
    pub fn print_exists(&self, key: &str, exists: bool) {
        match self.format {
            OutputFormat::Human => {
                if exists {
                    println!("{} exists", key);
                } else {
                    println!("{} does not exist", key);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"key": key, "exists": exists}));
            }
            OutputFormat::Quiet => println!("{}", exists),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Strings print bare, everything else as compact JSON
fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
