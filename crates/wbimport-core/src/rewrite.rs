//! Localizing statements once their dependencies are mapped.
//!
//! Quantity units pointing into the source graph are rebuilt against the
//! local concept base URI. Entity-valued data and snak properties keep
//! their remote ids unless `rewrite_entity_values` is enabled.
//!
//! Everything here is pure: inputs are borrowed, new statements are
//! returned, and values that cannot be localized are reported instead of
//! failing the statement.

use crate::ports::MappingStore;
use crate::references::unit_entity_suffix;
use tracing::warn;
use wbimport_model::{DataValue, EntityId, Reference, Snak, Statement, StatementList};

/// A value left untouched because its dependency has no local mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub property: EntityId,
    pub remote: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewritten {
    pub statements: StatementList,
    pub unresolved: Vec<Unresolved>,
}

pub struct Rewriter<'a> {
    mappings: &'a dyn MappingStore,
    source_base_uri: &'a str,
    local_base_uri: &'a str,
    rewrite_entity_values: bool,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        mappings: &'a dyn MappingStore,
        source_base_uri: &'a str,
        local_base_uri: &'a str,
    ) -> Self {
        Self {
            mappings,
            source_base_uri,
            local_base_uri,
            rewrite_entity_values: false,
        }
    }

    pub fn rewrite_entity_values(mut self, enabled: bool) -> Self {
        self.rewrite_entity_values = enabled;
        self
    }

    pub fn rewrite_statements(&self, statements: &StatementList) -> Rewritten {
        let mut unresolved = Vec::new();
        let statements = statements
            .iter()
            .map(|s| self.rewrite_statement(s, &mut unresolved))
            .collect();
        Rewritten {
            statements,
            unresolved,
        }
    }

    /// Main snak and qualifiers are localized; rank, statement id and
    /// references are carried over unchanged, except that reference snak
    /// properties follow the entity-value setting.
    pub fn rewrite_statement(&self, statement: &Statement, unresolved: &mut Vec<Unresolved>) -> Statement {
        let references = if self.rewrite_entity_values {
            statement
                .references
                .iter()
                .map(|r| Reference {
                    hash: r.hash.clone(),
                    snaks: r.snaks.iter().map(|s| self.rewrite_snak(s, unresolved)).collect(),
                })
                .collect()
        } else {
            statement.references.clone()
        };

        Statement {
            id: statement.id.clone(),
            main_snak: self.rewrite_snak(&statement.main_snak, unresolved),
            qualifiers: statement
                .qualifiers
                .iter()
                .map(|q| self.rewrite_snak(q, unresolved))
                .collect(),
            references,
            rank: statement.rank,
        }
    }

    pub fn rewrite_snak(&self, snak: &Snak, unresolved: &mut Vec<Unresolved>) -> Snak {
        let property = self.localize_property(snak.property(), unresolved);
        match snak {
            Snak::Value {
                value, datatype, ..
            } => Snak::Value {
                property,
                value: self.rewrite_value(snak.property(), value, unresolved),
                datatype: datatype.clone(),
            },
            Snak::SomeValue { .. } => Snak::SomeValue { property },
            Snak::NoValue { .. } => Snak::NoValue { property },
        }
    }

    fn localize_property(&self, property: &EntityId, unresolved: &mut Vec<Unresolved>) -> EntityId {
        if !self.rewrite_entity_values {
            return *property;
        }
        self.lookup(property, property, unresolved).unwrap_or(*property)
    }

    fn rewrite_value(
        &self,
        property: &EntityId,
        value: &DataValue,
        unresolved: &mut Vec<Unresolved>,
    ) -> DataValue {
        match value {
            DataValue::Quantity(quantity) => {
                let Some(suffix) = unit_entity_suffix(&quantity.unit, self.source_base_uri) else {
                    return value.clone();
                };
                let local = match EntityId::parse(suffix) {
                    Ok(remote) => self.lookup(property, &remote, unresolved),
                    Err(err) => {
                        warn!(unit = %quantity.unit, error = %err, "leaving malformed unit as is");
                        None
                    }
                };
                match local {
                    Some(local) => DataValue::Quantity(
                        quantity.with_unit(format!("{}{}", self.local_base_uri, local)),
                    ),
                    None => value.clone(),
                }
            }
            DataValue::EntityId(remote) if self.rewrite_entity_values => self
                .lookup(property, remote, unresolved)
                .map(DataValue::EntityId)
                .unwrap_or_else(|| value.clone()),
            DataValue::EntityId(_)
            | DataValue::String(_)
            | DataValue::MonolingualText { .. }
            | DataValue::Time(_)
            | DataValue::Other { .. } => value.clone(),
        }
    }

    fn lookup(
        &self,
        property: &EntityId,
        remote: &EntityId,
        unresolved: &mut Vec<Unresolved>,
    ) -> Option<EntityId> {
        match self.mappings.local_id(remote) {
            Ok(Some(local)) => Some(local),
            Ok(None) => {
                warn!(remote = %remote, property = %property, "no local mapping, value left unchanged");
                unresolved.push(Unresolved {
                    property: *property,
                    remote: remote.to_string(),
                });
                None
            }
            Err(err) => {
                warn!(remote = %remote, error = %err, "mapping lookup failed, value left unchanged");
                unresolved.push(Unresolved {
                    property: *property,
                    remote: remote.to_string(),
                });
                None
            }
        }
    }
}
