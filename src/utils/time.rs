use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};

/// Parse an RFC 3339 timestamp as stored in the database.
pub fn parse_utc(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| AppError::validation("时间格式非法"))
}

/// Validate an optional RFC 3339 input string, trimming it on the way in.
pub fn normalize_optional_utc(value: Option<String>) -> AppResult<Option<String>> {
    match value {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_utc(trimmed)?;
            Ok(Some(trimmed.to_string()))
        }
        None => Ok(None),
    }
}
