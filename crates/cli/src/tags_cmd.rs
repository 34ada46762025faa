use anyhow::{bail, Result};
use serde::Serialize;
use sessiondeck_local_db::{LocalDb, SessionRow, Tag};
use std::path::Path;

use crate::output::{print_json, OutputFormat};
use crate::{SessionsAction, TagsAction};

/// Run a `tags` subcommand.
pub fn run_tags(db_path: &Path, action: TagsAction) -> Result<()> {
    let db = LocalDb::open_path(db_path)?;

    match action {
        TagsAction::List { format } => {
            let tags = db.list_tags()?;
            match format {
                OutputFormat::Json => print_json(&tags)?,
                OutputFormat::Text => {
                    if tags.is_empty() {
                        eprintln!("No tags yet. Create one with `sessiondeck tags add <NAME>`.");
                    }
                    for tag in &tags {
                        println!("{:>4}  {:<24} {}", tag.id, tag.name, tag.color);
                    }
                }
            }
        }
        TagsAction::Add { name, color } => {
            let tag = db.create_tag(&name, color.as_deref())?;
            println!("{}", tag.id);
        }
        TagsAction::Rm { id } => {
            if !db.delete_tag(id)? {
                bail!("tag {id} not found");
            }
        }
        TagsAction::Rename { id, name } => {
            if db.update_tag(id, Some(&name), None)?.is_none() {
                bail!("tag {id} not found");
            }
        }
        TagsAction::Assign { session, tag_id } => {
            if db.get_session(&session)?.is_none() {
                bail!("session {session} not found");
            }
            if db.get_tag(tag_id)?.is_none() {
                bail!("tag {tag_id} not found");
            }
            if !db.add_tag_to_session(&session, tag_id)? {
                tracing::info!(session = %session, tag_id, "session already tagged");
            }
        }
        TagsAction::Unassign { session, tag_id } => {
            db.remove_tag_from_session(&session, tag_id)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct SessionListing {
    #[serde(flatten)]
    session: SessionRow,
    tags: Vec<Tag>,
}

/// Run a `sessions` subcommand.
pub fn run_sessions(db_path: &Path, action: SessionsAction) -> Result<()> {
    let db = LocalDb::open_path(db_path)?;

    match action {
        SessionsAction::Add { id, title, project } => {
            let created_at = db
                .get_session(&id)?
                .map(|existing| existing.created_at)
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
            db.upsert_session(&SessionRow {
                id,
                title,
                project,
                created_at,
            })?;
        }
        SessionsAction::List { format } => {
            let mut listings = Vec::new();
            for session in db.list_sessions()? {
                let tags = db.tags_for_session(&session.id)?;
                listings.push(SessionListing { session, tags });
            }
            match format {
                OutputFormat::Json => print_json(&listings)?,
                OutputFormat::Text => {
                    for listing in &listings {
                        let names: Vec<&str> =
                            listing.tags.iter().map(|t| t.name.as_str()).collect();
                        println!(
                            "{}  {}  [{}]",
                            listing.session.id,
                            listing.session.title.as_deref().unwrap_or("-"),
                            names.join(", ")
                        );
                    }
                }
            }
        }
        SessionsAction::Rm { id } => {
            if !db.delete_session(&id)? {
                bail!("session {id} not found");
            }
        }
    }
    Ok(())
}
