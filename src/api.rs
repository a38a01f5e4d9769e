//! Wire-side value types shared by the DOM and the service model.
//!
//! These are the schema's primary notions in plain Rust: links,
//! relationships, resource identifiers, version objects, and open
//! `meta` content. Domain objects carry them directly; the DOM layer
//! produces and consumes them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Open JSON object content (`meta`, `attributes` bodies).
///
/// `serde_json`'s map preserves member order under the
/// `preserve_order` feature, which this crate relies on for faithful
/// round-trips.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// `type` + `id`: the lightweight reference form of a resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub api_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(api_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            api_type: api_type.into(),
            id: id.into(),
        }
    }
}

/// One link: an href plus optional meta.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Link {
    pub fn href(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            meta: None,
        }
    }
}

/// Named link collection, order-preserving.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(pub IndexMap<String, Link>);

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rel: impl Into<String>, link: Link) {
        self.0.insert(rel.into(), link);
    }

    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.0.get(rel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Link)> {
        self.0.iter()
    }
}

/// Resource linkage carried by a relationship's `data` member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    ToOne(Option<ResourceIdentifier>),
    ToMany(Vec<ResourceIdentifier>),
}

/// One named relationship: optional links, linkage data, meta.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Relationship {
    pub fn to_one(identifier: Option<ResourceIdentifier>) -> Self {
        Self {
            data: Some(Linkage::ToOne(identifier)),
            ..Self::default()
        }
    }

    pub fn to_many(identifiers: Vec<ResourceIdentifier>) -> Self {
        Self {
            data: Some(Linkage::ToMany(identifiers)),
            ..Self::default()
        }
    }
}

/// Named relationship collection, order-preserving.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relationships(pub IndexMap<String, Relationship>);

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rel: impl Into<String>, relationship: Relationship) {
        self.0.insert(rel.into(), relationship);
    }

    pub fn get(&self, rel: &str) -> Option<&Relationship> {
        self.0.get(rel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Relationship)> {
        self.0.iter()
    }
}

/// The `jsonapi` document member.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonApiVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_serializes_with_type_member() {
        let ident = ResourceIdentifier::new("articles", "24");
        let json = serde_json::to_value(&ident).unwrap();
        assert_eq!(json, serde_json::json!({"type": "articles", "id": "24"}));
    }

    #[test]
    fn linkage_round_trips_both_cardinalities() {
        let one = Linkage::ToOne(Some(ResourceIdentifier::new("people", "9")));
        let many = Linkage::ToMany(vec![
            ResourceIdentifier::new("comments", "5"),
            ResourceIdentifier::new("comments", "12"),
        ]);
        for linkage in [one, many] {
            let json = serde_json::to_value(&linkage).unwrap();
            let back: Linkage = serde_json::from_value(json).unwrap();
            assert_eq!(back, linkage);
        }
    }

    #[test]
    fn links_preserve_insertion_order() {
        let mut links = Links::new();
        links.insert("self", Link::href("http://example.com/articles/1"));
        links.insert("related", Link::href("http://example.com/articles/1/author"));
        let rels: Vec<&String> = links.iter().map(|(rel, _)| rel).collect();
        assert_eq!(rels, vec!["self", "related"]);
    }
}
