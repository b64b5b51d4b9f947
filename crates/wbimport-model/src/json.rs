//! Wikibase JSON codec.
//!
//! The model types implement serde through the raw shapes below, which
//! mirror the canonical JSON emitted by `wbgetentities` and entity dumps:
//! terms keyed by language, statements grouped by property under `claims`,
//! qualifiers grouped by property with a separate `qualifiers-order`.
//!
//! PHP serializes empty maps as `[]`, so every map field also accepts an
//! empty list.

use crate::entity::{Entity, Fingerprint, Item, Property, SiteLink};
use crate::id::{EntityId, EntityKind, IdParseError};
use crate::statement::{Rank, Reference, Snak, Statement, StatementList};
use crate::value::{DataValue, QuantityValue, TimeValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Id(#[from] IdParseError),
    #[error("malformed {what}: {message}")]
    Malformed { what: &'static str, message: String },
}

impl CodecError {
    fn malformed(what: &'static str, message: impl Into<String>) -> Self {
        CodecError::Malformed {
            what,
            message: message.into(),
        }
    }
}

/// Decode one entity from its JSON text.
pub fn parse_entity(text: &str) -> Result<Entity, serde_json::Error> {
    serde_json::from_str(text)
}

/// Pretty JSON for one entity.
pub fn entity_to_string(entity: &Entity) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entity)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList<T> {
    Map(BTreeMap<String, T>),
    List(Vec<Value>),
}

fn lenient_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match MapOrList::<T>::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(list) if list.is_empty() => Ok(BTreeMap::new()),
        MapOrList::List(_) => Err(serde::de::Error::custom(
            "expected an object or an empty list",
        )),
    }
}

// ============================================================================
// Data values
// ============================================================================

#[doc(hidden)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDataValue {
    pub value: Value,
    #[serde(rename = "type")]
    pub value_type: String,
}

#[derive(Deserialize)]
struct RawEntityIdValue {
    id: Option<String>,
    #[serde(rename = "entity-type")]
    entity_type: Option<String>,
    #[serde(rename = "numeric-id")]
    numeric_id: Option<u64>,
}

fn decode<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, CodecError> {
    serde_json::from_value(value).map_err(|e| CodecError::malformed(what, e.to_string()))
}

impl TryFrom<RawDataValue> for DataValue {
    type Error = CodecError;

    fn try_from(raw: RawDataValue) -> Result<Self, Self::Error> {
        match raw.value_type.as_str() {
            "wikibase-entityid" => {
                let v: RawEntityIdValue = decode("entity id value", raw.value)?;
                let id = match (v.id, v.entity_type, v.numeric_id) {
                    (Some(id), _, _) => EntityId::parse(&id)?,
                    (None, Some(t), Some(n)) if n > 0 => match t.as_str() {
                        "item" => EntityId::item(n),
                        "property" => EntityId::property(n),
                        other => {
                            return Err(CodecError::malformed(
                                "entity id value",
                                format!("unsupported entity-type {other}"),
                            ))
                        }
                    },
                    _ => {
                        return Err(CodecError::malformed(
                            "entity id value",
                            "neither id nor entity-type/numeric-id",
                        ))
                    }
                };
                Ok(DataValue::EntityId(id))
            }
            "quantity" => Ok(DataValue::Quantity(decode::<QuantityValue>(
                "quantity value",
                raw.value,
            )?)),
            "string" => match raw.value {
                Value::String(s) => Ok(DataValue::String(s)),
                other => Err(CodecError::malformed(
                    "string value",
                    format!("expected a string, got {other}"),
                )),
            },
            "monolingualtext" => {
                #[derive(Deserialize)]
                struct Mono {
                    text: String,
                    language: String,
                }
                let m: Mono = decode("monolingual text value", raw.value)?;
                Ok(DataValue::MonolingualText {
                    language: m.language,
                    text: m.text,
                })
            }
            "time" => Ok(DataValue::Time(decode::<TimeValue>("time value", raw.value)?)),
            _ => Ok(DataValue::Other {
                value_type: raw.value_type,
                value: raw.value,
            }),
        }
    }
}

impl From<DataValue> for RawDataValue {
    fn from(value: DataValue) -> Self {
        let value_type = value.value_type().to_string();
        let value = match value {
            DataValue::EntityId(id) => json!({
                "entity-type": id.kind().type_name(),
                "numeric-id": id.number(),
                "id": id.to_string(),
            }),
            DataValue::Quantity(q) => {
                let mut v = json!({ "amount": q.amount, "unit": q.unit });
                if let Some(upper) = q.upper_bound {
                    v["upperBound"] = Value::String(upper);
                }
                if let Some(lower) = q.lower_bound {
                    v["lowerBound"] = Value::String(lower);
                }
                v
            }
            DataValue::String(s) => Value::String(s),
            DataValue::MonolingualText { language, text } => {
                json!({ "text": text, "language": language })
            }
            DataValue::Time(t) => json!({
                "time": t.time,
                "timezone": t.timezone,
                "before": t.before,
                "after": t.after,
                "precision": t.precision,
                "calendarmodel": t.calendarmodel,
            }),
            DataValue::Other { value, .. } => value,
        };
        RawDataValue { value, value_type }
    }
}

// ============================================================================
// Snaks and statements
// ============================================================================

#[doc(hidden)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSnak {
    pub snaktype: String,
    pub property: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datavalue: Option<DataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl TryFrom<RawSnak> for Snak {
    type Error = CodecError;

    fn try_from(raw: RawSnak) -> Result<Self, Self::Error> {
        match raw.snaktype.as_str() {
            "value" => {
                let value = raw
                    .datavalue
                    .ok_or_else(|| CodecError::malformed("snak", "value snak without datavalue"))?;
                Ok(Snak::Value {
                    property: raw.property,
                    value,
                    datatype: raw.datatype,
                })
            }
            "somevalue" => Ok(Snak::SomeValue {
                property: raw.property,
            }),
            "novalue" => Ok(Snak::NoValue {
                property: raw.property,
            }),
            other => Err(CodecError::malformed(
                "snak",
                format!("unknown snaktype {other}"),
            )),
        }
    }
}

impl From<Snak> for RawSnak {
    fn from(snak: Snak) -> Self {
        match snak {
            Snak::Value {
                property,
                value,
                datatype,
            } => RawSnak {
                snaktype: "value".to_string(),
                property,
                datavalue: Some(value),
                datatype,
            },
            Snak::SomeValue { property } => RawSnak {
                snaktype: "somevalue".to_string(),
                property,
                datavalue: None,
                datatype: None,
            },
            Snak::NoValue { property } => RawSnak {
                snaktype: "novalue".to_string(),
                property,
                datavalue: None,
                datatype: None,
            },
        }
    }
}

/// Flatten `{P: [snak..]}` in `order`, then any properties the order omits.
fn ordered_snaks(mut grouped: BTreeMap<String, Vec<Snak>>, order: &[String]) -> Vec<Snak> {
    let mut out = Vec::new();
    for property in order {
        if let Some(snaks) = grouped.remove(property) {
            out.extend(snaks);
        }
    }
    for (_, snaks) in grouped {
        out.extend(snaks);
    }
    out
}

fn grouped_snaks(snaks: Vec<Snak>) -> (BTreeMap<String, Vec<Snak>>, Vec<String>) {
    let mut grouped: BTreeMap<String, Vec<Snak>> = BTreeMap::new();
    let mut order = Vec::new();
    for snak in snaks {
        let key = snak.property().to_string();
        if !grouped.contains_key(&key) {
            order.push(key.clone());
        }
        grouped.entry(key).or_default().push(snak);
    }
    (grouped, order)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    snaks: BTreeMap<String, Vec<Snak>>,
    #[serde(rename = "snaks-order", default)]
    snaks_order: Vec<String>,
}

#[doc(hidden)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    mainsnak: Snak,
    #[serde(rename = "type", default = "statement_type")]
    statement_type: String,
    #[serde(default, deserialize_with = "lenient_map", skip_serializing_if = "BTreeMap::is_empty")]
    qualifiers: BTreeMap<String, Vec<Snak>>,
    #[serde(rename = "qualifiers-order", default, skip_serializing_if = "Vec::is_empty")]
    qualifiers_order: Vec<String>,
    #[serde(default)]
    rank: Rank,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<RawReference>,
}

fn statement_type() -> String {
    "statement".to_string()
}

impl TryFrom<RawStatement> for Statement {
    type Error = CodecError;

    fn try_from(raw: RawStatement) -> Result<Self, Self::Error> {
        let qualifiers = ordered_snaks(raw.qualifiers, &raw.qualifiers_order);
        let references = raw
            .references
            .into_iter()
            .map(|r| Reference {
                hash: r.hash,
                snaks: ordered_snaks(r.snaks, &r.snaks_order),
            })
            .collect();
        Ok(Statement {
            id: raw.id,
            main_snak: raw.mainsnak,
            qualifiers,
            references,
            rank: raw.rank,
        })
    }
}

impl From<Statement> for RawStatement {
    fn from(statement: Statement) -> Self {
        let (qualifiers, qualifiers_order) = grouped_snaks(statement.qualifiers);
        let references = statement
            .references
            .into_iter()
            .map(|r| {
                let (snaks, snaks_order) = grouped_snaks(r.snaks);
                RawReference {
                    hash: r.hash,
                    snaks,
                    snaks_order,
                }
            })
            .collect();
        RawStatement {
            id: statement.id,
            mainsnak: statement.main_snak,
            statement_type: statement_type(),
            qualifiers,
            qualifiers_order,
            rank: statement.rank,
            references,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTerm {
    language: String,
    value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSiteLink {
    site: String,
    title: String,
    #[serde(default)]
    badges: Vec<EntityId>,
}

#[doc(hidden)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    labels: BTreeMap<String, RawTerm>,
    #[serde(default, deserialize_with = "lenient_map")]
    descriptions: BTreeMap<String, RawTerm>,
    #[serde(default, deserialize_with = "lenient_map")]
    aliases: BTreeMap<String, Vec<RawTerm>>,
    #[serde(default, deserialize_with = "lenient_map", skip_serializing_if = "BTreeMap::is_empty")]
    sitelinks: BTreeMap<String, RawSiteLink>,
    #[serde(default, alias = "statements", deserialize_with = "lenient_map")]
    claims: BTreeMap<String, Vec<Statement>>,
}

fn terms(raw: BTreeMap<String, RawTerm>) -> BTreeMap<String, String> {
    raw.into_iter().map(|(lang, t)| (lang, t.value)).collect()
}

fn raw_terms(terms: BTreeMap<String, String>) -> BTreeMap<String, RawTerm> {
    terms
        .into_iter()
        .map(|(language, value)| {
            (
                language.clone(),
                RawTerm { language, value },
            )
        })
        .collect()
}

impl TryFrom<RawEntity> for Entity {
    type Error = CodecError;

    fn try_from(raw: RawEntity) -> Result<Self, Self::Error> {
        let fingerprint = Fingerprint {
            labels: terms(raw.labels),
            descriptions: terms(raw.descriptions),
            aliases: raw
                .aliases
                .into_iter()
                .map(|(lang, list)| (lang, list.into_iter().map(|t| t.value).collect()))
                .collect(),
        };
        let statements: StatementList = raw.claims.into_values().flatten().collect();

        if let Some(id) = &raw.id {
            let expected = match raw.entity_type.as_str() {
                "item" => Some(EntityKind::Item),
                "property" => Some(EntityKind::Property),
                _ => None,
            };
            if expected.is_some_and(|k| k != id.kind()) {
                return Err(CodecError::malformed(
                    "entity",
                    format!("{} is not a valid {} id", id, raw.entity_type),
                ));
            }
        }

        match raw.entity_type.as_str() {
            "item" => Ok(Entity::Item(Item {
                id: raw.id,
                fingerprint,
                site_links: raw
                    .sitelinks
                    .into_values()
                    .map(|s| SiteLink {
                        site: s.site,
                        title: s.title,
                        badges: s.badges,
                    })
                    .collect(),
                statements,
            })),
            "property" => {
                let datatype = raw
                    .datatype
                    .ok_or_else(|| CodecError::malformed("property", "missing datatype"))?;
                Ok(Entity::Property(Property {
                    id: raw.id,
                    fingerprint,
                    datatype,
                    statements,
                }))
            }
            other => Err(CodecError::malformed(
                "entity",
                format!("unsupported entity type {other}"),
            )),
        }
    }
}

impl From<Entity> for RawEntity {
    fn from(entity: Entity) -> Self {
        let (entity_type, id, datatype, fingerprint, site_links, statements) = match entity {
            Entity::Item(item) => (
                EntityKind::Item,
                item.id,
                None,
                item.fingerprint,
                item.site_links,
                item.statements,
            ),
            Entity::Property(p) => (
                EntityKind::Property,
                p.id,
                Some(p.datatype),
                p.fingerprint,
                Vec::new(),
                p.statements,
            ),
        };

        let mut claims: BTreeMap<String, Vec<Statement>> = BTreeMap::new();
        for statement in statements {
            claims
                .entry(statement.property().to_string())
                .or_default()
                .push(statement);
        }

        RawEntity {
            entity_type: entity_type.type_name().to_string(),
            id,
            datatype,
            labels: raw_terms(fingerprint.labels),
            descriptions: raw_terms(fingerprint.descriptions),
            aliases: fingerprint
                .aliases
                .into_iter()
                .map(|(language, values)| {
                    let list = values
                        .into_iter()
                        .map(|value| RawTerm {
                            language: language.clone(),
                            value,
                        })
                        .collect();
                    (language, list)
                })
                .collect(),
            sitelinks: site_links
                .into_iter()
                .map(|s| {
                    (
                        s.site.clone(),
                        RawSiteLink {
                            site: s.site,
                            title: s.title,
                            badges: s.badges,
                        },
                    )
                })
                .collect(),
            claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOUGLAS_ADAMS: &str = r#"{
        "type": "item",
        "id": "Q42",
        "labels": { "en": { "language": "en", "value": "Douglas Adams" } },
        "descriptions": [],
        "aliases": { "en": [ { "language": "en", "value": "DNA" } ] },
        "sitelinks": {
            "enwiki": { "site": "enwiki", "title": "Douglas Adams", "badges": ["Q17437798"] }
        },
        "claims": {
            "P2048": [{
                "mainsnak": {
                    "snaktype": "value",
                    "property": "P2048",
                    "datavalue": {
                        "value": { "amount": "+1.96", "unit": "http://www.wikidata.org/entity/Q11573" },
                        "type": "quantity"
                    },
                    "datatype": "quantity"
                },
                "type": "statement",
                "qualifiers": {
                    "P585": [{ "snaktype": "somevalue", "property": "P585" }],
                    "P1480": [{
                        "snaktype": "value",
                        "property": "P1480",
                        "datavalue": {
                            "value": { "entity-type": "item", "numeric-id": 5727902 },
                            "type": "wikibase-entityid"
                        }
                    }]
                },
                "qualifiers-order": ["P585", "P1480"],
                "rank": "preferred",
                "references": [{
                    "hash": "abc",
                    "snaks": {
                        "P248": [{
                            "snaktype": "value",
                            "property": "P248",
                            "datavalue": { "value": { "id": "Q36578" }, "type": "wikibase-entityid" }
                        }]
                    },
                    "snaks-order": ["P248"]
                }]
            }],
            "P31": [{
                "mainsnak": {
                    "snaktype": "value",
                    "property": "P31",
                    "datavalue": { "value": { "id": "Q5" }, "type": "wikibase-entityid" }
                },
                "rank": "normal"
            }]
        },
        "lastrevid": 123
    }"#;

    #[test]
    fn decodes_a_wikidata_item() {
        let entity = parse_entity(DOUGLAS_ADAMS).unwrap();
        assert_eq!(entity.kind(), EntityKind::Item);
        assert_eq!(entity.id(), Some(&EntityId::item(42)));
        assert_eq!(entity.fingerprint().label("en"), Some("Douglas Adams"));
        assert!(entity.fingerprint().descriptions.is_empty());

        let links = entity.site_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].badges, vec![EntityId::item(17437798)]);

        assert_eq!(entity.statements().len(), 2);
        let height = entity
            .statements()
            .by_property(&EntityId::property(2048))
            .next()
            .unwrap();
        assert_eq!(height.rank, Rank::Preferred);
        let quantity = height.main_snak.data_value().unwrap().as_quantity().unwrap();
        assert_eq!(quantity.unit, "http://www.wikidata.org/entity/Q11573");

        let qualifier_props: Vec<String> =
            height.qualifiers.iter().map(|q| q.property().to_string()).collect();
        assert_eq!(qualifier_props, vec!["P585", "P1480"]);
        assert_eq!(
            height.qualifiers[1].data_value().unwrap().as_entity_id(),
            Some(&EntityId::item(5727902))
        );
        assert_eq!(height.references[0].snaks.len(), 1);
        assert_eq!(height.all_snaks().count(), 4);
    }

    #[test]
    fn encoding_keeps_what_decoding_reads() {
        let entity = parse_entity(DOUGLAS_ADAMS).unwrap();
        let text = entity_to_string(&entity).unwrap();
        assert_eq!(parse_entity(&text).unwrap(), entity);
    }

    #[test]
    fn properties_need_a_datatype() {
        let ok = parse_entity(r#"{"type":"property","id":"P31","datatype":"wikibase-item","labels":{}}"#)
            .unwrap();
        assert!(matches!(ok, Entity::Property(ref p) if p.datatype == "wikibase-item"));

        let err = parse_entity(r#"{"type":"property","id":"P31"}"#).unwrap_err();
        assert!(err.to_string().contains("missing datatype"));
    }

    #[test]
    fn rejects_id_of_the_wrong_kind() {
        assert!(parse_entity(r#"{"type":"item","id":"P31"}"#).is_err());
        assert!(parse_entity(r#"{"type":"lexeme","id":"Q1"}"#).is_err());
    }

    #[test]
    fn unknown_value_kinds_are_kept_raw() {
        let raw = r#"{"value":{"latitude":52.5,"longitude":13.4,"precision":0.1,"globe":"http://www.wikidata.org/entity/Q2"},"type":"globecoordinate"}"#;
        let value: DataValue = serde_json::from_str(raw).unwrap();
        assert!(matches!(value, DataValue::Other { ref value_type, .. } if value_type == "globecoordinate"));
        let back = serde_json::to_value(&value).unwrap();
        assert_eq!(back["type"], "globecoordinate");
        assert_eq!(back["value"]["latitude"], 52.5);
    }
}
