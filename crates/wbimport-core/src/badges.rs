//! Site-link badges are entities too and must exist locally before an item
//! linking to them is persisted.

use crate::ports::FetchedEntities;

/// Badge ids of every fetched item, in site-link order. Duplicates across
/// items are kept; the import filters them.
pub fn badge_ids(entities: &FetchedEntities) -> Vec<String> {
    entities
        .iter()
        .filter_map(|(_, entity)| entity.as_item())
        .flat_map(|item| item.site_links.iter())
        .flat_map(|link| link.badges.iter())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbimport_model::{Entity, EntityId, Item, Property, SiteLink};

    #[test]
    fn collects_badges_from_items_only() {
        let item = Item {
            id: Some(EntityId::item(42)),
            site_links: vec![
                SiteLink::new("enwiki", "Douglas Adams").with_badge(EntityId::item(17437798)),
                SiteLink::new("dewiki", "Douglas Adams")
                    .with_badge(EntityId::item(17437796))
                    .with_badge(EntityId::item(17437798)),
            ],
            ..Item::default()
        };
        let other = Item {
            id: Some(EntityId::item(1)),
            site_links: vec![SiteLink::new("frwiki", "Univers").with_badge(EntityId::item(17437796))],
            ..Item::default()
        };
        let fetched = vec![
            ("Q42".to_string(), Entity::Item(item)),
            ("P31".to_string(), Entity::Property(Property::new("wikibase-item"))),
            ("Q1".to_string(), Entity::Item(other)),
        ];

        assert_eq!(
            badge_ids(&fetched),
            vec!["Q17437798", "Q17437796", "Q17437798", "Q17437796"]
        );
    }
}
