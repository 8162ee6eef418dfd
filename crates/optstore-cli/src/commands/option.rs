//! Option command handlers

use anyhow::{bail, Result};
use serde_json::Value;

use optstore_core::{Options, StoredValue};

use crate::output::Output;

/// Print a resolved option value
pub fn get(
    options: &mut Options,
    key: String,
    default: Option<String>,
    output: &Output,
) -> Result<()> {
    let default = default
        .map(|d| parse_value(&d))
        .unwrap_or(StoredValue::Typed(Value::Null));
    let value = options.get(&key, default);
    output.print_value(&value);
    Ok(())
}

/// Show the stored row of an option
pub fn show(options: &Options, key: String, output: &Output) -> Result<()> {
    let record = options
        .describe(&key)
        .ok_or_else(|| anyhow::anyhow!("Option not found: {}", key))?;

    output.print_record(&record);
    Ok(())
}

/// Save an option, optionally changing its auto-load flag
pub fn set(
    options: &mut Options,
    key: String,
    value: String,
    auto_load: Option<bool>,
    extension: Option<String>,
    output: &Output,
) -> Result<()> {
    let stored = parse_value(&value);
    let saved = match auto_load {
        Some(auto_load) => options.save(&key, stored, auto_load, extension.as_deref()),
        None => options.set(&key, stored, extension.as_deref()),
    };

    if !saved {
        bail!("Failed to save option '{}'", key);
    }

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Create a new option
pub fn create(
    options: &mut Options,
    key: String,
    value: String,
    auto_load: bool,
    extension: Option<String>,
    output: &Output,
) -> Result<()> {
    if !options.create_option(&key, parse_value(&value), auto_load, extension.as_deref()) {
        if options.has(&key) {
            bail!("Option already exists: {}", key);
        }
        bail!("Failed to create option '{}'", key);
    }

    output.success(&format!("Created {} = {}", key, value));
    Ok(())
}

/// Report whether an option exists
pub fn has(options: &Options, key: String, output: &Output) -> Result<()> {
    let exists = options.has(&key);
    output.print_exists(&key, exists);
    Ok(())
}

/// Remove options by key and/or extension
pub fn remove(
    options: &mut Options,
    key: Option<String>,
    extension: Option<String>,
    output: &Output,
) -> Result<()> {
    if key.is_none() && extension.is_none() {
        bail!("Specify --key, --extension, or both");
    }

    if options.remove_options(key.as_deref(), extension.as_deref()) {
        output.success("Removed matching options");
    } else if !output.is_quiet() {
        output.message("No options removed.");
    }
    Ok(())
}

/// Search options by key prefix
pub fn search(options: &Options, prefix: String, compact: bool, output: &Output) -> Result<()> {
    let found = options.search_options(&prefix, compact);
    output.print_value(&found);
    Ok(())
}

/// List options owned by an extension
pub fn extension(options: &Options, name: String, output: &Output) -> Result<()> {
    output.print_options(&options.get_extension_options(&name));
    Ok(())
}

/// List the auto-load set
pub fn list(options: &mut Options, output: &Output) -> Result<()> {
    output.print_options(&options.to_array());
    Ok(())
}

/// Interpret a command-line value
///
/// JSON arrays and objects are stored as composite values; everything else
/// is stored as the literal text.
fn parse_value(raw: &str) -> StoredValue {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => StoredValue::Typed(value),
        _ => StoredValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_composites() {
        assert_eq!(parse_value("[1,2,3]"), StoredValue::Typed(json!([1, 2, 3])));
        assert_eq!(
            parse_value(r#"{"host": "localhost"}"#),
            StoredValue::Typed(json!({"host": "localhost"}))
        );
    }

    #[test]
    fn test_parse_value_scalars_stay_text() {
        assert_eq!(parse_value("42"), StoredValue::from("42"));
        assert_eq!(parse_value("true"), StoredValue::from("true"));
        assert_eq!(parse_value("Demo"), StoredValue::from("Demo"));
        assert_eq!(parse_value("[broken"), StoredValue::from("[broken"));
    }
}
