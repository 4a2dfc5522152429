//! Resource identifiers.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use thiserror::Error;

use crate::protocol::{Decode, Encode};

/// A string guaranteed to be a valid resource identifier.
///
/// A resource identifier is divided into a "namespace" part and a "path"
/// part, as in `minecraft:apple`. A string must match the regex
/// `^([a-z0-9_.-]+:)?[a-z0-9_.-/]+$` to be successfully parsed. If the
/// namespace (the part before and including the colon) is left off,
/// `minecraft:` is inserted at the beginning of the string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    string: String,
}

/// The error type created when an [`Ident`] cannot be parsed from a string.
/// Contains the string that failed to parse.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("invalid resource identifier \"{0}\"")]
pub struct IdentError(pub String);

impl Ident {
    pub fn new(string: impl Into<String>) -> Result<Self, IdentError> {
        let string = string.into();

        let check_namespace = |s: &str| {
            !s.is_empty()
                && s.bytes()
                    .all(|c| matches!(c, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-'))
        };
        let check_path = |s: &str| {
            !s.is_empty()
                && s.bytes()
                    .all(|c| matches!(c, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'/'))
        };

        match string.split_once(':') {
            Some((namespace, path)) if check_namespace(namespace) && check_path(path) => {
                Ok(Self { string })
            }
            None if check_path(&string) => Ok(Self {
                string: format!("minecraft:{string}"),
            }),
            _ => Err(IdentError(string)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// The part before the colon.
    pub fn namespace(&self) -> &str {
        self.string.split_once(':').expect("invalid ident").0
    }

    /// The part after the colon.
    pub fn path(&self) -> &str {
        self.string.split_once(':').expect("invalid ident").1
    }

    pub fn into_inner(self) -> String {
        self.string
    }
}

impl FromStr for Ident {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.string
    }
}

/// Map lookups by plain `&str` key.
impl std::borrow::Borrow<str> for Ident {
    fn borrow(&self) -> &str {
        &self.string
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.string.fmt(f)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.string.fmt(f)
    }
}

impl Encode for Ident {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.string.encode(w)
    }
}

impl Decode<'_> for Ident {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Ident::new(<&str>::decode(r)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        for s in ["minecraft:apple", "apple", "frobnicator:foo/bar", "a.b-c_d"] {
            let ident = Ident::new(s).unwrap();
            assert!(ident.as_str().contains(':'));
        }

        assert_eq!(Ident::new("apple").unwrap().as_str(), "minecraft:apple");
        assert_eq!(Ident::new("minecraft:apple").unwrap().namespace(), "minecraft");
        assert_eq!(Ident::new("minecraft:apple").unwrap().path(), "apple");
    }

    #[test]
    fn parse_invalid() {
        for s in ["", ":", "s p a c e s", "CAPS:lock", "minecraft:", "a:b:c"] {
            assert!(Ident::new(s).is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn round_trip() {
        let ident = Ident::new("minecraft:dimension_type").unwrap();
        let mut buf = vec![];
        ident.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(Ident::decode(&mut slice).unwrap(), ident);
    }
}
