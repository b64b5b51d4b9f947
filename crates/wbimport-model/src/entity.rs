//! Items and properties.

use crate::id::{EntityId, EntityKind};
use crate::statement::StatementList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels, descriptions and aliases keyed by language code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub labels: BTreeMap<String, String>,
    pub descriptions: BTreeMap<String, String>,
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Fingerprint {
    pub fn with_label(mut self, language: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(language.into(), label.into());
        self
    }

    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(String::as_str)
    }

    pub fn description(&self, language: &str) -> Option<&str> {
        self.descriptions.get(language).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLink {
    pub site: String,
    pub title: String,
    pub badges: Vec<EntityId>,
}

impl SiteLink {
    pub fn new(site: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            title: title.into(),
            badges: Vec::new(),
        }
    }

    pub fn with_badge(mut self, badge: EntityId) -> Self {
        self.badges.push(badge);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub id: Option<EntityId>,
    pub fingerprint: Fingerprint,
    pub site_links: Vec<SiteLink>,
    pub statements: StatementList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: Option<EntityId>,
    pub fingerprint: Fingerprint,
    pub datatype: String,
    pub statements: StatementList,
}

impl Property {
    pub fn new(datatype: impl Into<String>) -> Self {
        Self {
            id: None,
            fingerprint: Fingerprint::default(),
            datatype: datatype.into(),
            statements: StatementList::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::json::RawEntity", into = "crate::json::RawEntity")]
pub enum Entity {
    Item(Item),
    Property(Property),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Item(_) => EntityKind::Item,
            Entity::Property(_) => EntityKind::Property,
        }
    }

    pub fn id(&self) -> Option<&EntityId> {
        match self {
            Entity::Item(item) => item.id.as_ref(),
            Entity::Property(property) => property.id.as_ref(),
        }
    }

    pub fn set_id(&mut self, id: Option<EntityId>) {
        match self {
            Entity::Item(item) => item.id = id,
            Entity::Property(property) => property.id = id,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Entity::Item(item) => &item.fingerprint,
            Entity::Property(property) => &property.fingerprint,
        }
    }

    pub fn statements(&self) -> &StatementList {
        match self {
            Entity::Item(item) => &item.statements,
            Entity::Property(property) => &property.statements,
        }
    }

    pub fn statements_mut(&mut self) -> &mut StatementList {
        match self {
            Entity::Item(item) => &mut item.statements,
            Entity::Property(property) => &mut property.statements,
        }
    }

    pub fn set_statements(&mut self, statements: StatementList) {
        *self.statements_mut() = statements;
    }

    /// Site links; always empty for properties.
    pub fn site_links(&self) -> &[SiteLink] {
        match self {
            Entity::Item(item) => &item.site_links,
            Entity::Property(_) => &[],
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Entity::Item(item) => Some(item),
            Entity::Property(_) => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut Item> {
        match self {
            Entity::Item(item) => Some(item),
            Entity::Property(_) => None,
        }
    }
}

impl From<Item> for Entity {
    fn from(item: Item) -> Self {
        Entity::Item(item)
    }
}

impl From<Property> for Entity {
    fn from(property: Property) -> Self {
        Entity::Property(property)
    }
}
