//! Entity identifiers.
//!
//! An identifier is a kind discriminant (`Q` for items, `P` for properties)
//! followed by a positive decimal number, e.g. `Q42` or `P31`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Property,
}

impl EntityKind {
    pub const fn discriminant(self) -> char {
        match self {
            EntityKind::Item => 'Q',
            EntityKind::Property => 'P',
        }
    }

    pub fn from_discriminant(c: char) -> Option<Self> {
        match c {
            'Q' => Some(EntityKind::Item),
            'P' => Some(EntityKind::Property),
            _ => None,
        }
    }

    /// Name used by the Wikibase JSON `entity-type` field.
    pub const fn type_name(self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Property => "property",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("empty entity id")]
    Empty,
    #[error("unknown entity id discriminant '{found}' in \"{input}\"")]
    UnknownDiscriminant { input: String, found: char },
    #[error("invalid entity number in \"{0}\"")]
    InvalidNumber(String),
}

/// Typed, kind-discriminated entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    kind: EntityKind,
    number: u64,
}

impl EntityId {
    /// Panics if `number` is zero.
    pub fn new(kind: EntityKind, number: u64) -> Self {
        assert!(number > 0, "entity numbers start at 1");
        Self { kind, number }
    }

    pub fn item(number: u64) -> Self {
        Self::new(EntityKind::Item, number)
    }

    pub fn property(number: u64) -> Self {
        Self::new(EntityKind::Property, number)
    }

    pub fn parse(serialization: &str) -> Result<Self, IdParseError> {
        let kind = kind_of(serialization)?;
        let digits = &serialization[1..];
        let valid = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !digits.starts_with('0');
        if !valid {
            return Err(IdParseError::InvalidNumber(serialization.to_string()));
        }
        let number = digits
            .parse::<u64>()
            .map_err(|_| IdParseError::InvalidNumber(serialization.to_string()))?;
        Ok(Self { kind, number })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn is_item(&self) -> bool {
        self.kind == EntityKind::Item
    }

    pub fn is_property(&self) -> bool {
        self.kind == EntityKind::Property
    }
}

/// Kind of a serialized id, decided by its leading character only.
pub fn kind_of(serialization: &str) -> Result<EntityKind, IdParseError> {
    let first = serialization.chars().next().ok_or(IdParseError::Empty)?;
    EntityKind::from_discriminant(first).ok_or_else(|| IdParseError::UnknownDiscriminant {
        input: serialization.to_string(),
        found: first,
    })
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.discriminant(), self.number)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_items_and_properties() {
        assert_eq!(EntityId::parse("Q42").unwrap(), EntityId::item(42));
        assert_eq!(EntityId::parse("P31").unwrap(), EntityId::property(31));
        assert_eq!(kind_of("P1000000").unwrap(), EntityKind::Property);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(EntityId::parse(""), Err(IdParseError::Empty));
        assert!(matches!(
            EntityId::parse("L12"),
            Err(IdParseError::UnknownDiscriminant { found: 'L', .. })
        ));
        for bad in ["Q", "Q0", "Q012", "Q12a", "q12", "Q-1", "Q99999999999999999999999"] {
            assert!(EntityId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn kind_is_only_the_leading_character() {
        // The number part is not inspected.
        assert_eq!(kind_of("Qxyz").unwrap(), EntityKind::Item);
        assert!(EntityId::parse("Qxyz").is_err());
    }

    #[test]
    fn serde_uses_the_string_form() {
        let json = serde_json::to_string(&EntityId::item(5)).unwrap();
        assert_eq!(json, "\"Q5\"");
        let back: EntityId = serde_json::from_str("\"P18\"").unwrap();
        assert_eq!(back, EntityId::property(18));
        assert!(serde_json::from_str::<EntityId>("\"X1\"").is_err());
    }

    proptest! {
        #[test]
        fn display_parse_agree(is_item in any::<bool>(), number in 1u64..u64::MAX) {
            let kind = if is_item { EntityKind::Item } else { EntityKind::Property };
            let id = EntityId::new(kind, number);
            prop_assert_eq!(EntityId::parse(&id.to_string()).unwrap(), id);
        }
    }
}
