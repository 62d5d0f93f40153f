//! Record subcommands shared by every category

mod handler;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};

use crate::entity::FieldMap;

pub use handler::handle_record_command;

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// List records page by page
    List {
        /// Page number, starting at 1
        #[arg(long)]
        page: Option<u32>,
        /// Records per page
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Show one record
    Get { id: i64 },
    /// Create a record
    Add {
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Overwrite the given fields of a record
    Update {
        id: i64,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a record
    Delete { id: i64 },
    /// Upsert every row of an .xlsx file
    Import { file: PathBuf },
    /// Write the category's report to an .xlsx file
    Export {
        /// Output directory (default: config export.output_dir, else current dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Field values given either as a JSON object or as repeated `--set`
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    /// JSON object, e.g. '{"name": "Park A", "area": "East"}'
    #[arg(long)]
    pub json: Option<String>,

    /// field=value, repeatable; applied after --json
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,
}

impl FieldArgs {
    pub fn into_fields(self) -> Result<FieldMap> {
        let mut fields = FieldMap::new();

        if let Some(json) = self.json {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("--json is not valid JSON")?;
            let serde_json::Value::Object(object) = value else {
                bail!("--json must be a JSON object");
            };
            for (name, value) in object {
                let text = match value {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => bail!("field '{}' must be a string", name),
                };
                fields.insert(name, text);
            }
        }

        fields.extend(self.set);

        if fields.is_empty() {
            bail!("no fields given, use --json or --set");
        }
        Ok(fields)
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got '{}'", s)),
    }
}
