//! Snaks, statements and statement lists.

use crate::id::EntityId;
use crate::value::DataValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::json::RawSnak", into = "crate::json::RawSnak")]
pub enum Snak {
    Value {
        property: EntityId,
        value: DataValue,
        /// Property datatype as reported by the source, if any.
        datatype: Option<String>,
    },
    SomeValue {
        property: EntityId,
    },
    NoValue {
        property: EntityId,
    },
}

impl Snak {
    pub fn value(property: EntityId, value: DataValue) -> Self {
        Snak::Value {
            property,
            value,
            datatype: None,
        }
    }

    pub fn property(&self) -> &EntityId {
        match self {
            Snak::Value { property, .. }
            | Snak::SomeValue { property }
            | Snak::NoValue { property } => property,
        }
    }

    pub fn data_value(&self) -> Option<&DataValue> {
        match self {
            Snak::Value { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub hash: Option<String>,
    pub snaks: Vec<Snak>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::json::RawStatement", into = "crate::json::RawStatement")]
pub struct Statement {
    /// Statement GUID assigned by the repository that owns it.
    pub id: Option<String>,
    pub main_snak: Snak,
    pub qualifiers: Vec<Snak>,
    pub references: Vec<Reference>,
    pub rank: Rank,
}

impl Statement {
    pub fn new(main_snak: Snak) -> Self {
        Self {
            id: None,
            main_snak,
            qualifiers: Vec::new(),
            references: Vec::new(),
            rank: Rank::Normal,
        }
    }

    pub fn with_qualifier(mut self, qualifier: Snak) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn property(&self) -> &EntityId {
        self.main_snak.property()
    }

    /// Main snak, then qualifiers, then every reference snak.
    pub fn all_snaks(&self) -> impl Iterator<Item = &Snak> {
        std::iter::once(&self.main_snak)
            .chain(self.qualifiers.iter())
            .chain(self.references.iter().flat_map(|r| r.snaks.iter()))
    }
}

/// Ordered statements of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementList(Vec<Statement>);

impl StatementList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.0.push(statement);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.0.iter()
    }

    pub fn all_snaks(&self) -> impl Iterator<Item = &Snak> {
        self.0.iter().flat_map(Statement::all_snaks)
    }

    /// Statements whose main snak uses `property`.
    pub fn by_property(&self, property: &EntityId) -> impl Iterator<Item = &Statement> {
        let property = *property;
        self.0.iter().filter(move |s| *s.property() == property)
    }

    pub fn contains_main_snak(&self, snak: &Snak) -> bool {
        self.0.iter().any(|s| &s.main_snak == snak)
    }

    pub fn into_vec(self) -> Vec<Statement> {
        self.0
    }
}

impl From<Vec<Statement>> for StatementList {
    fn from(statements: Vec<Statement>) -> Self {
        Self(statements)
    }
}

impl FromIterator<Statement> for StatementList {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for StatementList {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a StatementList {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
