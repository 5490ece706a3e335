//! Portable segment name validation.

use crate::Error;
use crate::error::Result;

/// Checks that `name` matches the portable form: a leading `/` followed by
/// one or more bytes, none of which is `/` or NUL.
///
/// UTF-8 bodies are accepted; whether non-ASCII names work end to end
/// depends on the host OS.
pub(crate) fn validate(name: &str) -> Result<()> {
    let Some(body) = name.strip_prefix('/') else {
        return Err(invalid(name, "must start with '/'"));
    };

    if body.is_empty() {
        return Err(invalid(name, "must have a non-empty body after '/'"));
    }

    if body.contains('/') {
        return Err(invalid(name, "only the leading '/' is allowed"));
    }

    if body.contains('\0') {
        return Err(invalid(name, "must not contain NUL bytes"));
    }

    Ok(())
}

fn invalid(name: &str, problem: &'static str) -> Error {
    Error::InvalidName {
        name: name.to_string(),
        problem,
    }
}
