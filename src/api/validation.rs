//! Purpose: Validate phone keys and address payloads before any store access.
//! Exports: `validate_phone`, `validate_address`, `ADDRESS_MAX_LEN`.
//! Role: Shared precondition checks for the HTTP layer.
//! Invariants: A failed validation means no store call was made for the request.
//! Invariants: Phone keys match `+79XXXXXXXXX` (12 chars) or `89XXXXXXXXX` (11 chars).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{Error, ErrorKind};

pub const ADDRESS_MAX_LEN: usize = 500;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+79\d{9}|89\d{9})$").expect("phone pattern compiles"));

pub fn validate_phone(phone: &str) -> Result<(), Error> {
    if PHONE_PATTERN.is_match(phone) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Invalid)
            .with_message("phone must match +79XXXXXXXXX or 89XXXXXXXXX")
            .with_key(phone))
    }
}

pub fn validate_address(address: &str) -> Result<(), Error> {
    if address.is_empty() {
        return Err(Error::new(ErrorKind::Invalid).with_message("address must not be empty"));
    }
    if address.chars().count() > ADDRESS_MAX_LEN {
        return Err(Error::new(ErrorKind::Invalid)
            .with_message(format!("address exceeds {ADDRESS_MAX_LEN} characters")));
    }
    Ok(())
}
