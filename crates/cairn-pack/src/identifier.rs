//! Namespaced identifiers for packs and assets
//!
//! An identifier is written `namespace:name`, optionally followed by `@version`
//! for pack identifiers. Stripping the version yields the *generic* identifier
//! that groups every version of the same pack.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier parse errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid identifier '{0}': expected 'namespace:name'")]
    Format(String),

    #[error("Invalid version in identifier '{input}': {reason}")]
    Version { input: String, reason: String },
}

/// Namespaced identifier with an optional version
///
/// Ordering is namespace, then name, then version. An unversioned identifier
/// sorts before every versioned one with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    namespace: String,
    name: String,
    version: Option<Version>,
}

impl Identifier {
    /// Create an unversioned identifier
    pub fn new(namespace: &str, name: &str) -> Result<Self, IdentifierError> {
        if !is_valid_segment(namespace) || !is_valid_segment(name) {
            return Err(IdentifierError::Format(format!("{namespace}:{name}")));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: None,
        })
    }

    /// Create a versioned identifier
    pub fn versioned(namespace: &str, name: &str, version: Version) -> Result<Self, IdentifierError> {
        Ok(Self::new(namespace, name)?.with_version(version))
    }

    /// Parse from `namespace:name` or `namespace:name@version`
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        input.parse()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_generic(&self) -> bool {
        self.version.is_none()
    }

    /// Same namespace and name, carrying `version`
    pub fn with_version(&self, version: Version) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            version: Some(version),
        }
    }

    /// Version-stripped identifier used to group sibling versions
    pub fn generic(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            version: None,
        }
    }

    /// Whether both identifiers name the same entity, ignoring versions
    pub fn compatible(&self, other: &Identifier) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| c == ':' || c == '@' || c.is_whitespace())
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (path, version) = match input.split_once('@') {
            Some((path, version)) => {
                let version = Version::parse(version).map_err(|e| IdentifierError::Version {
                    input: input.to_string(),
                    reason: e.to_string(),
                })?;
                (path, Some(version))
            }
            None => (input, None),
        };

        let (namespace, name) = path
            .split_once(':')
            .ok_or_else(|| IdentifierError::Format(input.to_string()))?;

        let mut identifier =
            Self::new(namespace, name).map_err(|_| IdentifierError::Format(input.to_string()))?;
        identifier.version = version;
        Ok(identifier)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_generic() {
        let id = Identifier::parse("core:zombie").unwrap();
        assert_eq!(id.namespace(), "core");
        assert_eq!(id.name(), "zombie");
        assert!(id.is_generic());
        assert_eq!(id.to_string(), "core:zombie");
    }

    #[test]
    fn test_parse_versioned() {
        let id = Identifier::parse("core:base@1.2.0").unwrap();
        assert_eq!(id.version(), Some(&Version::new(1, 2, 0)));
        assert_eq!(id.to_string(), "core:base@1.2.0");
    }

    #[rstest]
    #[case("zombie")]
    #[case(":zombie")]
    #[case("core:")]
    #[case("core:zom bie")]
    #[case("a:b:c")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            Identifier::parse(input),
            Err(IdentifierError::Format(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        assert!(matches!(
            Identifier::parse("core:base@one"),
            Err(IdentifierError::Version { .. })
        ));
    }

    #[test]
    fn test_generic_and_compatible() {
        let v1 = Identifier::parse("core:base@1.0.0").unwrap();
        let v2 = Identifier::parse("core:base@2.0.0").unwrap();
        let other = Identifier::parse("mod:base@1.0.0").unwrap();

        assert_eq!(v1.generic(), v2.generic());
        assert!(v1.compatible(&v2));
        assert!(!v1.compatible(&other));
    }

    #[test]
    fn test_ordering_puts_generic_first() {
        let generic = Identifier::parse("core:base").unwrap();
        let v1 = Identifier::parse("core:base@1.0.0").unwrap();
        let v2 = Identifier::parse("core:base@2.0.0").unwrap();

        let mut ids = vec![v2.clone(), generic.clone(), v1.clone()];
        ids.sort();
        assert_eq!(ids, vec![generic, v1, v2]);
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            id: Identifier,
        }

        let holder: Holder = toml::from_str(r#"id = "core:base@1.0.0""#).unwrap();
        assert_eq!(holder.id.to_string(), "core:base@1.0.0");

        let bad: Result<Holder, _> = toml::from_str(r#"id = "nonsense""#);
        assert!(bad.is_err());
    }
}
