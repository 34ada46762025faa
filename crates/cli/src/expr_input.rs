use anyhow::{Context, Result};
use sessiondeck_core::TagFilterExpression;
use std::io::Read;

/// Read an expression from a literal JSON argument, `@path`, or `-` (stdin).
pub fn read_expression(arg: &str) -> Result<TagFilterExpression> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read expression from stdin")?;
        buf
    } else if let Some(path) = arg.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("read expression from {path}"))?
    } else {
        arg.to_string()
    };

    text.trim()
        .parse()
        .context("parse tag filter expression")
}
