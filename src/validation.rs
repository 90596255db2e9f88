//! Field rules for tasks and the title hash used for duplicate detection.

use sha2::{Digest, Sha256};
use std::fmt;

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// SHA-256 of the trimmed title, hex encoded.
///
/// Titles that are equal after trimming always hash equal.
pub fn compute_title_hash(title: &str) -> String {
    let digest = Sha256::digest(title.trim().as_bytes());
    format!("{:x}", digest)
}

/// Every rule a task failed, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first violation, used as the headline message.
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Check an already-trimmed title.
pub fn check_title(title: &str, errors: &mut ValidationErrors) {
    let len = title.chars().count();
    if len == 0 {
        errors.push("Title is required");
    } else if len < TITLE_MIN_CHARS {
        errors.push(format!(
            "Title needs to be at least {} characters",
            TITLE_MIN_CHARS
        ));
    } else if len > TITLE_MAX_CHARS {
        errors.push(format!("Title cannot exceed {} characters", TITLE_MAX_CHARS));
    }
}

/// Check an already-trimmed description.
pub fn check_description(description: &str, errors: &mut ValidationErrors) {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push(format!(
            "Description cannot exceed {} characters",
            DESCRIPTION_MAX_CHARS
        ));
    }
}

/// Trim and validate the fields of a new task, returning the normalized pair.
pub fn normalize_new(
    title: &str,
    description: Option<&str>,
) -> Result<(String, Option<String>), ValidationErrors> {
    let title = title.trim().to_string();
    let description = description.map(|d| d.trim().to_string());

    let mut errors = ValidationErrors::new();
    check_title(&title, &mut errors);
    if let Some(ref d) = description {
        check_description(d, &mut errors);
    }
    errors.into_result()?;

    Ok((title, description))
}
