//! Pure business rules shared by the directory, the catalog and the asset manager.

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::images::ImageUpload;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 100;
pub const PASSWORD_TOO_LONG: &str = "Password must be at most 100 characters long.";
pub const PASSWORD_REQUIREMENTS: &str =
    "Password must be at least 8 characters long and contain an uppercase letter, a lowercase letter and a digit.";

pub const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

pub const EMAIL_MAX_LEN: usize = 255;
pub const NAME_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 255;
pub const SHORT_DESCRIPTION_MAX_LEN: usize = 512;

pub fn is_password_valid(password: &str) -> bool {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return false;
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    has_upper && has_lower && has_digit
}

pub fn is_password_within_limit(password: &str) -> bool {
    password.chars().count() <= PASSWORD_MAX_LEN
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Strict: an event that ends the instant it starts is rejected.
pub fn is_date_range_valid(start: OffsetDateTime, end: OffsetDateTime) -> bool {
    end > start
}

/// Extension of the last path segment, including the leading dot.
pub fn file_extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let dot = base.rfind('.')?;
    let ext = &base[dot..];
    (ext.len() > 1).then_some(ext)
}

/// Checks presence, size and extension. Content is not sniffed.
pub fn is_valid_image(upload: Option<&ImageUpload>, max_bytes: u64) -> bool {
    let Some(upload) = upload else {
        return false;
    };
    let len = upload.body.len() as u64;
    if len == 0 || len > max_bytes {
        return false;
    }
    match file_extension(&upload.file_name) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Random name that keeps only the original extension, so nothing the client
/// sent ends up in the stored path.
pub fn unique_file_name(original: &str) -> String {
    let ext = file_extension(original).unwrap_or("");
    format!("{}{}", Uuid::new_v4(), ext)
}

pub fn require_text(field: &str, value: &str, max_len: usize) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{field} is required.")));
    }
    limit_text(field, Some(value), max_len)
}

pub fn limit_text(field: &str, value: Option<&str>, max_len: usize) -> ServiceResult<()> {
    match value {
        Some(v) if v.chars().count() > max_len => Err(ServiceError::validation(format!(
            "{field} must be at most {max_len} characters."
        ))),
        _ => Ok(()),
    }
}
