use anyhow::{bail, Result};
use sessiondeck_core::{build_tag_filter_query, build_tag_filter_query_strict};
use sessiondeck_local_db::LocalDb;
use std::path::Path;

use crate::expr_input::read_expression;
use crate::output::{format_params, print_json, OutputFormat};

#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    pub strict: bool,
    pub validate: bool,
}

/// Run the `compile` command.
pub fn run_compile(expr: &str, strict: bool, format: &OutputFormat) -> Result<()> {
    let expr = read_expression(expr)?;
    let compiled = if strict {
        build_tag_filter_query_strict(&expr)?
    } else {
        build_tag_filter_query(&expr)
    };

    match format {
        OutputFormat::Json => print_json(&compiled)?,
        OutputFormat::Text => {
            println!("{}", compiled.where_clause);
            println!("params: {}", format_params(&compiled.params));
        }
    }
    Ok(())
}

/// Run the `validate` command.
pub fn run_validate(db_path: &Path, expr: &str, format: &OutputFormat) -> Result<()> {
    let expr = read_expression(expr)?;
    let db = LocalDb::open_path(db_path)?;
    let validation = db.validate_tag_filter(&expr)?;

    match format {
        OutputFormat::Json => print_json(&validation)?,
        OutputFormat::Text => {
            if validation.valid {
                println!("valid");
            } else {
                println!("missing tag ids: {}", format_params(&validation.missing_ids));
            }
        }
    }
    Ok(())
}

/// Run the `filter` command.
pub fn run_filter(
    db_path: &Path,
    expr: &str,
    options: FilterOptions,
    format: &OutputFormat,
) -> Result<()> {
    let expr = read_expression(expr)?;
    let db = LocalDb::open_path(db_path)?;

    if options.validate {
        let validation = db.validate_tag_filter(&expr)?;
        if !validation.valid {
            tracing::warn!(missing = ?validation.missing_ids, "filter references unknown tags");
            bail!(
                "unknown tag ids {} (pass --no-validate to run anyway)",
                format_params(&validation.missing_ids)
            );
        }
    }

    let ids = if options.strict {
        db.filter_sessions_strict(&expr)?
    } else {
        db.filter_sessions(&expr)?
    };

    match format {
        OutputFormat::Json => print_json(&ids)?,
        OutputFormat::Text => {
            for id in &ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}
