//! Field checks shared by the ledgers, the user directory and the record
//! decoder. Every value that reaches a store must survive a round trip
//! through the comma-separated line format.

use crate::error::EngineError;
use crate::limits::*;
use crate::model::ResourceAttrs;

fn has_line_break(s: &str) -> bool {
    s.contains('\n') || s.contains('\r')
}

fn check_plain(value: &str, field: &'static str, max_len: usize) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidField { field, reason: "must not be empty" });
    }
    if value.len() > max_len {
        return Err(EngineError::InvalidField { field, reason: "too long" });
    }
    if value.contains(',') || has_line_break(value) {
        return Err(EngineError::InvalidField {
            field,
            reason: "must not contain commas or line breaks",
        });
    }
    Ok(())
}

pub fn resource_id(id: &str) -> Result<(), EngineError> {
    check_plain(id, "resource id", MAX_ID_LEN)?;
    if id.trim() != id {
        return Err(EngineError::InvalidField {
            field: "resource id",
            reason: "must not start or end with whitespace",
        });
    }
    Ok(())
}

pub fn title(title: &str) -> Result<(), EngineError> {
    if title.trim().is_empty() {
        return Err(EngineError::InvalidField { field: "title", reason: "must not be empty" });
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(EngineError::InvalidField { field: "title", reason: "too long" });
    }
    if has_line_break(title) {
        return Err(EngineError::InvalidField {
            field: "title",
            reason: "must not contain line breaks",
        });
    }
    Ok(())
}

pub fn author(author: &str) -> Result<(), EngineError> {
    check_plain(author, "author", MAX_AUTHOR_LEN)
}

pub fn attrs(attrs: &ResourceAttrs) -> Result<(), EngineError> {
    match attrs {
        ResourceAttrs::Room | ResourceAttrs::Laptop => Ok(()),
        ResourceAttrs::Book { title: t, author: a } => {
            title(t)?;
            author(a)
        }
    }
}

pub fn username(username: &str) -> Result<(), EngineError> {
    check_plain(username, "username", MAX_USERNAME_LEN)
}

pub fn password(password: &str) -> Result<(), EngineError> {
    if password.is_empty() {
        return Err(EngineError::InvalidField { field: "password", reason: "must not be empty" });
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(EngineError::InvalidField { field: "password", reason: "too long" });
    }
    if password.contains(',') || has_line_break(password) {
        return Err(EngineError::InvalidField {
            field: "password",
            reason: "must not contain commas or line breaks",
        });
    }
    Ok(())
}
