//! Validation of the interface, member, error, and bus name grammars.

use std::error;
use std::fmt;

/// An error constructing an interface, member, error, or bus name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameError {
    /// An interface or error name had fewer than two `.`-separated elements.
    TooFewElements,
    /// An element did not match `[A-Za-z_][A-Za-z0-9_]*`.
    InvalidElement,
    /// A member name contained a `.`.
    MemberHasDot,
    /// The name was empty.
    Empty,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::TooFewElements => write!(f, "name must have at least two elements"),
            NameError::InvalidElement => write!(f, "name element has an invalid character"),
            NameError::MemberHasDot => write!(f, "member names may not contain '.'"),
            NameError::Empty => write!(f, "name must not be empty"),
        }
    }
}

impl error::Error for NameError {}

fn is_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn valid_element(elem: &[u8]) -> bool {
    matches!(elem, [first, rest @ ..] if is_start(*first) && rest.iter().all(|&b| is_cont(b)))
}

/// Validate an interface name or an error name: two or more `.`-separated
/// elements, each matching `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_interface(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    let elements: Vec<&[u8]> = name.as_bytes().split(|&b| b == b'.').collect();

    if elements.len() < 2 {
        return Err(NameError::TooFewElements);
    }

    if elements.iter().any(|e| !valid_element(e)) {
        return Err(NameError::InvalidElement);
    }

    Ok(())
}

/// Validate a member (method or signal) name: `[A-Za-z_][A-Za-z0-9_]*`, no dots.
pub fn validate_member(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    if name.as_bytes().contains(&b'.') {
        return Err(NameError::MemberHasDot);
    }

    if !valid_element(name.as_bytes()) {
        return Err(NameError::InvalidElement);
    }

    Ok(())
}

/// Validate a bus name: either a unique name (`:` followed by two or more
/// `.`-separated, possibly-empty-start elements) or a well-known name
/// (interface-name rules).
pub fn validate_bus_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    if let Some(rest) = name.strip_prefix(':') {
        let elements: Vec<&[u8]> = rest.as_bytes().split(|&b| b == b'.').collect();

        if elements.len() < 2 {
            return Err(NameError::TooFewElements);
        }

        // Unique name elements allow a leading digit, unlike interface
        // elements, but must still be non-empty and otherwise alphanumeric.
        if elements
            .iter()
            .any(|e| e.is_empty() || !e.iter().all(|&b| is_cont(b)))
        {
            return Err(NameError::InvalidElement);
        }

        return Ok(());
    }

    validate_interface(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_names() {
        assert!(validate_interface("org.freedesktop.DBus").is_ok());
        assert!(validate_interface("org.freedesktop.DBus.Properties").is_ok());
        assert!(validate_interface("single").is_err());
        assert!(validate_interface("org.1bad").is_err());
        assert!(validate_interface("").is_err());
    }

    #[test]
    fn member_names() {
        assert!(validate_member("Get").is_ok());
        assert!(validate_member("NameAcquired").is_ok());
        assert!(validate_member("bad.name").is_err());
        assert!(validate_member("1bad").is_err());
    }

    #[test]
    fn bus_names() {
        assert!(validate_bus_name(":1.66").is_ok());
        assert!(validate_bus_name(":1.42.7").is_ok());
        assert!(validate_bus_name("org.freedesktop.NetworkManager").is_ok());
        assert!(validate_bus_name(":solo").is_err());
        assert!(validate_bus_name("solo").is_err());
    }
}
