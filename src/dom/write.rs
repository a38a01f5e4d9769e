//! DOM to JSON serialization.
//!
//! The inverse of `read`: walk a tree, emit `serde_json::Value`, then
//! text. Member order follows child order, so parse→write round-trips
//! preserve the original member order. Null emission is policy-driven
//! through [`WriteSettings`]; scalar leaves honor the per-type
//! nullability captured at construction.

use serde_json::Value;

use crate::error::Result;
use crate::node::NodeId;

use super::{property_value, DomData, DomLink, DomObjectKind, DomTree};

/// What to do with a member whose value is null.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NullValueHandling {
    /// Write the member with a JSON null value.
    #[default]
    Include,
    /// Leave the member out entirely.
    Ignore,
}

/// Serialization policy for one write pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteSettings {
    pub null_value_handling: NullValueHandling,
}

impl WriteSettings {
    pub fn ignore_null() -> Self {
        Self {
            null_value_handling: NullValueHandling::Ignore,
        }
    }

    fn writes_null(self) -> bool {
        self.null_value_handling == NullValueHandling::Include
    }
}

/// Serialize a document subtree to a JSON value.
pub fn write_document(tree: &DomTree, root: NodeId, settings: WriteSettings) -> Value {
    node_to_json(tree, root, settings)
}

/// Compact JSON text.
pub fn to_json_string(tree: &DomTree, root: NodeId, settings: WriteSettings) -> String {
    node_to_json(tree, root, settings).to_string()
}

/// Pretty-printed JSON text.
pub fn to_json_string_pretty(
    tree: &DomTree,
    root: NodeId,
    settings: WriteSettings,
) -> Result<String> {
    Ok(serde_json::to_string_pretty(&node_to_json(
        tree, root, settings,
    ))?)
}

/// Serialize a document subtree directly to an output stream.
pub fn write_json_to<W: std::io::Write>(
    writer: W,
    tree: &DomTree,
    root: NodeId,
    settings: WriteSettings,
) -> Result<()> {
    Ok(serde_json::to_writer(
        writer,
        &node_to_json(tree, root, settings),
    )?)
}

/// Serialize any DOM node.
pub fn node_to_json(tree: &DomTree, node: NodeId, settings: WriteSettings) -> Value {
    match tree.data(node) {
        DomData::Object(DomObjectKind::Link) => link_to_json(tree, node, settings),
        DomData::Object(_) => object_to_json(tree, node, settings),
        DomData::Array { .. } => {
            let items = tree
                .children(node)
                .iter()
                .map(|&item| match tree.children(item).first() {
                    Some(&child) => node_to_json(tree, child, settings),
                    None => Value::Null,
                })
                .collect();
            Value::Array(items)
        }
        DomData::Item { .. } => match tree.children(node).first() {
            Some(&child) => node_to_json(tree, child, settings),
            None => Value::Null,
        },
        DomData::Property { .. } => match property_value(tree, node) {
            Some(child) => node_to_json(tree, child, settings),
            None => Value::Null,
        },
        DomData::Value(scalar) => match &scalar.value {
            // a non-nullable scalar always carries its value; a
            // nullable one without a value is document null
            Some(value) => value.to_json(),
            None => Value::Null,
        },
        DomData::Null => Value::Null,
    }
}

fn object_to_json(tree: &DomTree, node: NodeId, settings: WriteSettings) -> Value {
    let mut members = serde_json::Map::new();
    for &property in tree.children(node) {
        if let Some(value) = member_json(tree, property, settings) {
            members.insert(tree.name(property).to_owned(), value);
        }
    }
    Value::Object(members)
}

/// One member's value, or `None` when the settings elide it.
fn member_json(tree: &DomTree, property: NodeId, settings: WriteSettings) -> Option<Value> {
    let null_member = || settings.writes_null().then_some(Value::Null);
    match property_value(tree, property) {
        None => null_member(),
        Some(child) => match tree.data(child) {
            DomData::Null => null_member(),
            DomData::Value(scalar) if scalar.value.is_none() => null_member(),
            _ => Some(node_to_json(tree, child, settings)),
        },
    }
}

/// The link shorthand: a link with an href and no effective meta
/// writes as the bare href string; otherwise as a full object. The
/// meta side of the decision respects the active null handling: a
/// null meta that the settings would elide does not force the object
/// form.
fn link_to_json(tree: &DomTree, node: NodeId, settings: WriteSettings) -> Value {
    let view = DomLink::new(tree, node);
    let href = view.href();
    let meta_written = view
        .meta_property()
        .is_some_and(|meta| member_json(tree, meta, settings).is_some());
    match href {
        Some(href) if !meta_written => Value::String(href),
        _ => object_to_json(tree, node, settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::read::parse_document;
    use crate::dom::{
        new_null, new_object, new_property, new_value, subtree_eq, ApiMemberKind, DomObjectKind,
        DomScalar,
    };
    use serde_json::json;

    fn link_tree(href: Option<&str>, meta: LinkMeta) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let mut properties = Vec::new();
        if let Some(href) = href {
            let value = new_value(&mut tree, DomScalar::of(href.to_owned()));
            properties.push(new_property(
                &mut tree,
                ApiMemberKind::HRef,
                "href",
                Some(value),
            ));
        }
        match meta {
            LinkMeta::Absent => {}
            LinkMeta::Null => {
                let null = new_null(&mut tree);
                properties.push(new_property(&mut tree, ApiMemberKind::Meta, "meta", Some(null)));
            }
            LinkMeta::Object => {
                let count = new_value(&mut tree, DomScalar::of(10i64));
                let count_prop = new_property(&mut tree, ApiMemberKind::None, "count", Some(count));
                let meta_obj = new_object(&mut tree, DomObjectKind::Object, vec![count_prop]);
                properties.push(new_property(
                    &mut tree,
                    ApiMemberKind::Meta,
                    "meta",
                    Some(meta_obj),
                ));
            }
        }
        let link = new_object(&mut tree, DomObjectKind::Link, properties);
        (tree, link)
    }

    enum LinkMeta {
        Absent,
        Null,
        Object,
    }

    #[test]
    fn link_without_meta_writes_bare_string() {
        let (tree, link) = link_tree(Some("http://x"), LinkMeta::Absent);
        let json = node_to_json(&tree, link, WriteSettings::default());
        assert_eq!(json, json!("http://x"));
    }

    #[test]
    fn link_with_meta_writes_full_object() {
        let (tree, link) = link_tree(Some("http://x"), LinkMeta::Object);
        let json = node_to_json(&tree, link, WriteSettings::default());
        assert_eq!(json, json!({"href": "http://x", "meta": {"count": 10}}));
    }

    #[test]
    fn null_meta_collapses_only_under_ignore() {
        let (tree, link) = link_tree(Some("http://x"), LinkMeta::Null);
        // Include writes the null meta, forcing the object form
        let json = node_to_json(&tree, link, WriteSettings::default());
        assert_eq!(json, json!({"href": "http://x", "meta": null}));
        // Ignore elides the meta, so the shorthand applies
        let json = node_to_json(&tree, link, WriteSettings::ignore_null());
        assert_eq!(json, json!("http://x"));
    }

    #[test]
    fn hrefless_link_never_collapses() {
        let (tree, link) = link_tree(None, LinkMeta::Object);
        let json = node_to_json(&tree, link, WriteSettings::default());
        assert_eq!(json, json!({"meta": {"count": 10}}));
    }

    #[test]
    fn ignore_elides_null_attributes() {
        let doc = parse_document(
            r#"{"data": {
                "type": "articles",
                "id": "1",
                "attributes": {"title": "X", "subtitle": null}
            }}"#,
        )
        .unwrap();
        let json = write_document(&doc.tree, doc.root, WriteSettings::ignore_null());
        assert_eq!(
            json,
            json!({"data": {
                "type": "articles",
                "id": "1",
                "attributes": {"title": "X"}
            }})
        );
        let json = write_document(&doc.tree, doc.root, WriteSettings::default());
        assert_eq!(
            json["data"]["attributes"],
            json!({"title": "X", "subtitle": null})
        );
    }

    #[test]
    fn parse_write_parse_is_identity() {
        let text = r#"{
            "jsonapi": {"version": "1.0"},
            "links": {"self": "http://example.com/articles/24"},
            "data": {
                "type": "articles",
                "id": "24",
                "attributes": {"title": "X", "rating": 4.5},
                "relationships": {
                    "author": {"data": {"type": "people", "id": "9"}},
                    "comments": {"data": [
                        {"type": "comments", "id": "5"},
                        {"type": "comments", "id": "12"}
                    ]}
                }
            },
            "meta": {"copyright": "Example 2024"}
        }"#;
        let first = parse_document(text).unwrap();
        let emitted = to_json_string(&first.tree, first.root, WriteSettings::default());
        let second = parse_document(&emitted).unwrap();
        assert!(subtree_eq(&first.tree, first.root, &second.tree, second.root));
    }

    #[test]
    fn errors_document_round_trips() {
        let text = r#"{"errors": [
            {"status": "404", "title": "not found", "source": {"pointer": "/data"}},
            {"status": "422", "title": "invalid", "detail": "title is required"}
        ]}"#;
        let first = parse_document(text).unwrap();
        let emitted = to_json_string(&first.tree, first.root, WriteSettings::default());
        let second = parse_document(&emitted).unwrap();
        assert!(subtree_eq(&first.tree, first.root, &second.tree, second.root));
        assert_eq!(second.document().errors().len(), 2);
    }

    #[test]
    fn member_order_survives_round_trip() {
        let text = r#"{"data":{"type":"articles","id":"24","attributes":{"b":1,"a":2}}}"#;
        let doc = parse_document(text).unwrap();
        assert_eq!(
            to_json_string(&doc.tree, doc.root, WriteSettings::default()),
            text
        );
    }
}
