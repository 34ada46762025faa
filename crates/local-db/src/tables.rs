//! Column identifiers for the local schema.

use sea_query::Iden;

#[derive(Iden)]
pub enum Sessions {
    Table,
    Id,
    Title,
    Project,
    CreatedAt,
}

#[derive(Iden)]
pub enum Tags {
    Table,
    Id,
    Name,
    Color,
    CreatedAt,
}

#[derive(Iden)]
pub enum SessionTags {
    Table,
    SessionId,
    TagId,
}
