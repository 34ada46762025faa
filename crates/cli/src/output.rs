use anyhow::{Context, Result};
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

/// `[1, "abc"]`-style rendering of bind params.
pub fn format_params<T: std::fmt::Display>(params: &[T]) -> String {
    let items: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}
