use crate::error::{Error, Result};

/// Quote a single Postgres identifier.
///
/// Rejects empty names and names containing NUL, which Postgres cannot store.
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a possibly schema-qualified name such as `app.students`.
pub fn quote_qualified(name: &str) -> Result<String> {
    let parts = name
        .split('.')
        .map(quote_ident)
        .collect::<Result<Vec<_>>>()
        .map_err(|_| Error::InvalidIdentifier(name.to_string()))?;
    Ok(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_and_qualified_names() {
        assert_eq!(quote_ident("grades").unwrap(), "\"grades\"");
        assert_eq!(quote_ident("odd\"name").unwrap(), "\"odd\"\"name\"");
        assert_eq!(
            quote_qualified("app.students").unwrap(),
            "\"app\".\"students\""
        );
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(quote_ident("").is_err());
        assert!(quote_qualified("app.").is_err());
    }
}
