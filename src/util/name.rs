//! Name validation for tables, columns, and indexes.
//!
//! Names are 1-1023 bytes; the first byte is `[A-Za-z0-9]`, the rest are
//! `[A-Za-z0-9_]`. Every `create_*`/`rename_*` entry point calls
//! [`validate`] and surfaces `Error::InvalidName` on violation.

use crate::error::{Error, Result};

const MAX_LEN: usize = 1023;

pub fn validate(name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_LEN {
        return Err(Error::InvalidName(name.to_string()));
    }
    if !bytes[0].is_ascii_alphanumeric() {
        return Err(Error::InvalidName(name.to_string()));
    }
    if bytes[1..]
        .iter()
        .any(|&b| !(b.is_ascii_alphanumeric() || b == b'_'))
    {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(validate("a").is_ok());
        assert!(validate("Column_1").is_ok());
        assert!(validate("0x").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(validate("").is_err());
    }

    #[test]
    fn rejects_leading_underscore() {
        assert!(validate("_col").is_err());
    }

    #[test]
    fn rejects_bad_interior_byte() {
        assert!(validate("col-1").is_err());
        assert!(validate("col.1").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_LEN + 1);
        assert!(validate(&long).is_err());
    }

    #[test]
    fn accepts_max_len() {
        let name = "a".repeat(MAX_LEN);
        assert!(validate(&name).is_ok());
    }
}
