//! Data model for Wikibase entity import.
//!
//! Identifiers, items, properties, statements and the typed data values
//! they carry, plus the Wikibase JSON codec used to read remote entities
//! and to persist local ones.

pub mod entity;
pub mod id;
pub mod json;
pub mod statement;
pub mod value;

pub use entity::{Entity, Fingerprint, Item, Property, SiteLink};
pub use id::{kind_of, EntityId, EntityKind, IdParseError};
pub use statement::{Rank, Reference, Snak, Statement, StatementList};
pub use value::{DataValue, QuantityValue, TimeValue, UNITLESS};
