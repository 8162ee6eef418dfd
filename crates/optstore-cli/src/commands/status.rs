//! Status command handler

use anyhow::Result;

use optstore_core::{Config, Options};

use crate::output::{Output, OutputFormat};

/// Show database location and option counts
pub fn show(options: &mut Options, config: &Config, output: &Output) -> Result<()> {
    let total = options.count();
    let auto_load = options.to_array().len();
    let db_path = config.sqlite_path();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": db_path,
                    "cache_ttl_secs": config.cache_ttl_secs,
                    "counts": {
                        "options": total,
                        "auto_load": auto_load
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", total);
        }
        OutputFormat::Human => {
            println!("optstore Status");
            println!("===============");
            println!();
            println!("Database:  {}", db_path.display());
            println!("Cache TTL: {}s", config.cache_ttl_secs);
            println!();
            println!("Options:   {}", total);
            println!("Auto-load: {}", auto_load);
        }
    }

    Ok(())
}
