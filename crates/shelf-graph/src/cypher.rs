//! Cypher identifier validation.
//!
//! Labels, property names, and relationship types come from
//! configuration and are interpolated into query text (Cypher has no
//! parameter slots for them), so they are validated first.

use anyhow::{bail, Result};

/// Accept a configured name as a Cypher identifier:
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn ident(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        bail!("'{name}' is not a valid Cypher identifier");
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(ident("Book").is_ok());
        assert!(ident("_id").is_ok());
        assert!(ident("HAS_GENRE").is_ok());
        assert!(ident("author_id2").is_ok());
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(ident("").is_err());
        assert!(ident("Book) DETACH DELETE (n").is_err());
        assert!(ident("2fast").is_err());
        assert!(ident("has-genre").is_err());
        assert!(ident("n.name").is_err());
    }
}
