//! Service-model-driven bridge between DOM trees and domain objects.
//!
//! Two directions:
//! - `build_*`: walk a domain object through its resource type's
//!   compiled getters and assemble the resource subtree (identity,
//!   attributes with nested complex decomposition, relationships,
//!   links, meta).
//! - `extract_*`: walk a parsed resource node and pour its members
//!   into a freshly constructed domain object through the compiled
//!   setters. Extraction is best-effort per member, matching the
//!   `set_clr_*` contract: members without metadata are skipped.

use std::any::Any;

use tracing::debug;

use crate::api::{Link, Linkage, Links, Meta, Relationship, Relationships, ResourceIdentifier};
use crate::dom::read::{read_any, ParsedDocument, ReadContext};
use crate::dom::{
    new_array, new_item, new_null, new_object, new_property, new_value, property_value,
    ApiMemberKind, DomData, DomObjectKind, DomResource, DomScalar, DomTree,
};
use crate::error::{Error, Result};
use crate::model::{AttributeInfo, AttributeKind, ClrValue, ComplexType, ServiceModel};
use crate::node::NodeId;

// ------------------------- Domain object → DOM ---------------------------- //

/// Assemble a resource subtree for `obj` inside `tree`.
pub fn build_resource<T: Any>(
    model: &ServiceModel,
    tree: &mut DomTree,
    obj: &T,
) -> Result<NodeId> {
    let resource_type = model.resource_type::<T>()?;
    let obj: &dyn Any = obj;
    let mut properties = Vec::new();

    let type_value = new_value(tree, DomScalar::of(resource_type.api_type().to_owned()));
    properties.push(new_property(tree, ApiMemberKind::Type, "type", Some(type_value)));

    // an unassigned id is omitted rather than emitted as a sentinel
    if !resource_type.is_clr_id_null(obj) {
        if let Some(api_id) = resource_type.api_id(obj) {
            let id_value = new_value(tree, DomScalar::of(api_id));
            properties.push(new_property(tree, ApiMemberKind::Id, "id", Some(id_value)));
        }
    }

    if !resource_type.attributes().is_empty() {
        let mut attribute_properties = Vec::with_capacity(resource_type.attributes().len());
        for attribute in resource_type.attributes().iter() {
            let value = attribute.get(obj);
            let node = clr_value_to_node(model, tree, attribute, value)?;
            attribute_properties.push(new_property(
                tree,
                ApiMemberKind::None,
                attribute.api_name(),
                Some(node),
            ));
        }
        let attributes = new_object(tree, DomObjectKind::Object, attribute_properties);
        properties.push(new_property(
            tree,
            ApiMemberKind::Attributes,
            "attributes",
            Some(attributes),
        ));
    }

    if let Ok(Some(relationships)) = resource_type.clr_relationships(obj) {
        if !relationships.is_empty() {
            let node = relationships_to_node(tree, &relationships);
            properties.push(new_property(
                tree,
                ApiMemberKind::Relationships,
                "relationships",
                Some(node),
            ));
        }
    }

    if let Ok(Some(links)) = resource_type.clr_links(obj) {
        if !links.is_empty() {
            let node = links_to_node(tree, &links);
            properties.push(new_property(tree, ApiMemberKind::Links, "links", Some(node)));
        }
    }

    if let Ok(Some(meta)) = resource_type.clr_meta(obj) {
        let node = meta_to_node(tree, &meta);
        properties.push(new_property(tree, ApiMemberKind::Meta, "meta", Some(node)));
    }

    debug!(api_type = resource_type.api_type(), "resource built");
    Ok(new_object(tree, DomObjectKind::Resource, properties))
}

/// Assemble a single-resource document for `obj`.
pub fn build_resource_document<T: Any>(
    model: &ServiceModel,
    obj: &T,
) -> Result<ParsedDocument> {
    let mut tree = DomTree::new();
    let resource = build_resource(model, &mut tree, obj)?;
    let data = new_property(&mut tree, ApiMemberKind::Data, "data", Some(resource));
    let root = new_object(&mut tree, DomObjectKind::Document, vec![data]);
    Ok(ParsedDocument { tree, root })
}

/// The identifier subtree for `obj`, or `None` while its id is
/// unassigned.
pub fn build_resource_identifier<T: Any>(
    model: &ServiceModel,
    tree: &mut DomTree,
    obj: &T,
) -> Result<Option<NodeId>> {
    let resource_type = model.resource_type::<T>()?;
    Ok(resource_type
        .api_resource_identifier(obj)
        .map(|identifier| identifier_to_node(tree, &identifier)))
}

fn clr_value_to_node(
    model: &ServiceModel,
    tree: &mut DomTree,
    attribute: &AttributeInfo,
    value: ClrValue,
) -> Result<NodeId> {
    match value {
        ClrValue::Null => Ok(new_null(tree)),
        ClrValue::Scalar(scalar) => Ok(new_value(
            tree,
            DomScalar {
                kind: scalar.kind(),
                nullable: attribute.is_nullable(),
                value: Some(scalar),
            },
        )),
        ClrValue::List(items) => {
            let mut dom_items = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let child = match item {
                    ClrValue::Null => None,
                    ClrValue::Scalar(scalar) => {
                        Some(new_value(tree, DomScalar::from_value(scalar)))
                    }
                    _ => {
                        return Err(Error::Unsupported {
                            detail: format!(
                                "attribute `{}` holds a list of non-scalar values",
                                attribute.api_name()
                            ),
                        });
                    }
                };
                dom_items.push(new_item(tree, index, child));
            }
            Ok(new_array(tree, dom_items))
        }
        ClrValue::Complex(boxed) => {
            let index = attribute.complex_index().ok_or_else(|| Error::Model {
                detail: format!(
                    "attribute `{}` used before the service model was initialized",
                    attribute.api_name()
                ),
            })?;
            let complex_type = model.complex_type_at(index);
            complex_to_node(model, tree, complex_type, &*boxed)
        }
    }
}

fn complex_to_node(
    model: &ServiceModel,
    tree: &mut DomTree,
    complex_type: &ComplexType,
    obj: &dyn Any,
) -> Result<NodeId> {
    let mut properties = Vec::with_capacity(complex_type.attributes().len());
    for attribute in complex_type.attributes().iter() {
        let value = attribute.get(obj);
        let node = clr_value_to_node(model, tree, attribute, value)?;
        properties.push(new_property(
            tree,
            ApiMemberKind::None,
            attribute.api_name(),
            Some(node),
        ));
    }
    Ok(new_object(tree, DomObjectKind::Object, properties))
}

fn identifier_to_node(tree: &mut DomTree, identifier: &ResourceIdentifier) -> NodeId {
    let type_value = new_value(tree, DomScalar::of(identifier.api_type.clone()));
    let type_property = new_property(tree, ApiMemberKind::Type, "type", Some(type_value));
    let id_value = new_value(tree, DomScalar::of(identifier.id.clone()));
    let id_property = new_property(tree, ApiMemberKind::Id, "id", Some(id_value));
    new_object(
        tree,
        DomObjectKind::ResourceIdentifier,
        vec![type_property, id_property],
    )
}

fn linkage_to_node(tree: &mut DomTree, linkage: &Linkage) -> NodeId {
    match linkage {
        Linkage::ToOne(None) => new_null(tree),
        Linkage::ToOne(Some(identifier)) => identifier_to_node(tree, identifier),
        Linkage::ToMany(identifiers) => {
            let mut items = Vec::with_capacity(identifiers.len());
            for (index, identifier) in identifiers.iter().enumerate() {
                let child = identifier_to_node(tree, identifier);
                items.push(new_item(tree, index, Some(child)));
            }
            new_array(tree, items)
        }
    }
}

fn relationship_to_node(tree: &mut DomTree, relationship: &Relationship) -> NodeId {
    let mut properties = Vec::new();
    if let Some(links) = &relationship.links {
        let node = links_to_node(tree, links);
        properties.push(new_property(tree, ApiMemberKind::Links, "links", Some(node)));
    }
    if let Some(linkage) = &relationship.data {
        let node = linkage_to_node(tree, linkage);
        properties.push(new_property(tree, ApiMemberKind::Data, "data", Some(node)));
    }
    if let Some(meta) = &relationship.meta {
        let node = meta_to_node(tree, meta);
        properties.push(new_property(tree, ApiMemberKind::Meta, "meta", Some(node)));
    }
    new_object(tree, DomObjectKind::Relationship, properties)
}

fn relationships_to_node(tree: &mut DomTree, relationships: &Relationships) -> NodeId {
    let mut properties = Vec::with_capacity(relationships.len());
    for (rel, relationship) in relationships.iter() {
        let node = relationship_to_node(tree, relationship);
        properties.push(new_property(
            tree,
            ApiMemberKind::Relationship,
            rel,
            Some(node),
        ));
    }
    new_object(tree, DomObjectKind::Relationships, properties)
}

fn link_to_node(tree: &mut DomTree, link: &Link) -> NodeId {
    let mut properties = Vec::new();
    if let Some(href) = &link.href {
        let value = new_value(tree, DomScalar::of(href.clone()));
        properties.push(new_property(tree, ApiMemberKind::HRef, "href", Some(value)));
    }
    if let Some(meta) = &link.meta {
        let node = meta_to_node(tree, meta);
        properties.push(new_property(tree, ApiMemberKind::Meta, "meta", Some(node)));
    }
    new_object(tree, DomObjectKind::Link, properties)
}

fn links_to_node(tree: &mut DomTree, links: &Links) -> NodeId {
    let mut properties = Vec::with_capacity(links.len());
    for (rel, link) in links.iter() {
        let node = link_to_node(tree, link);
        properties.push(new_property(tree, ApiMemberKind::Link, rel, Some(node)));
    }
    new_object(tree, DomObjectKind::Links, properties)
}

fn meta_to_node(tree: &mut DomTree, meta: &Meta) -> NodeId {
    let value = serde_json::Value::Object(meta.clone());
    let mut ctx = ReadContext::new();
    read_any(tree, &mut ctx, &value).expect("open content readers do not fail")
}

// ------------------------- DOM → domain object ---------------------------- //

/// Pour a parsed resource node into a fresh `T`.
pub fn extract_resource<T: Any>(
    model: &ServiceModel,
    tree: &DomTree,
    resource: NodeId,
) -> Result<T> {
    let resource_type = model.resource_type::<T>()?;
    let view = DomResource::new(tree, resource);
    let mut object = resource_type.create_clr_object();

    if let Some(api_id) = view.api_id() {
        if let Ok(clr_id) = resource_type.identity().to_clr_id(&api_id) {
            resource_type.set_clr_id(&mut *object, &clr_id);
        }
    }

    if let Some(attributes) = view.attributes_node() {
        for &property in tree.children(attributes) {
            let Some(attribute) = resource_type.try_attribute(tree.name(property)) else {
                continue;
            };
            let value = match property_value(tree, property) {
                None => ClrValue::Null,
                Some(child) => node_to_clr_value(model, tree, attribute, child)?,
            };
            attribute.set(&mut *object, value);
        }
    }

    if let Some(relationships) = view.relationships() {
        resource_type.set_clr_relationships(&mut *object, relationships.to_relationships());
    }
    if let Some(links) = view.links() {
        resource_type.set_clr_links(&mut *object, links.to_links());
    }
    if let Some(meta) = view.meta() {
        resource_type.set_clr_meta(&mut *object, meta);
    }

    let object = object
        .downcast::<T>()
        .expect("factory builds the registered type");
    Ok(*object)
}

fn node_to_clr_value(
    model: &ServiceModel,
    tree: &DomTree,
    attribute: &AttributeInfo,
    node: NodeId,
) -> Result<ClrValue> {
    match tree.data(node) {
        DomData::Null => Ok(ClrValue::Null),
        DomData::Value(scalar) => Ok(match &scalar.value {
            Some(value) => ClrValue::Scalar(value.clone()),
            None => ClrValue::Null,
        }),
        DomData::Array { .. } => {
            let mut items = Vec::with_capacity(tree.children(node).len());
            for &item in tree.children(node) {
                let value = match tree.children(item).first() {
                    None => ClrValue::Null,
                    Some(&child) => match tree.data(child) {
                        DomData::Value(scalar) => match &scalar.value {
                            Some(value) => ClrValue::Scalar(value.clone()),
                            None => ClrValue::Null,
                        },
                        _ => ClrValue::Null,
                    },
                };
                items.push(value);
            }
            Ok(ClrValue::List(items))
        }
        DomData::Object(DomObjectKind::Object) => {
            let AttributeKind::Complex(_) = attribute.kind() else {
                return Ok(ClrValue::Null);
            };
            let index = attribute.complex_index().ok_or_else(|| Error::Model {
                detail: format!(
                    "attribute `{}` used before the service model was initialized",
                    attribute.api_name()
                ),
            })?;
            let complex_type = model.complex_type_at(index);
            extract_complex(model, tree, complex_type, node)
        }
        _ => Ok(ClrValue::Null),
    }
}

fn extract_complex(
    model: &ServiceModel,
    tree: &DomTree,
    complex_type: &ComplexType,
    node: NodeId,
) -> Result<ClrValue> {
    let mut object = complex_type.create_clr_object();
    for &property in tree.children(node) {
        let Some(attribute) = complex_type
            .attributes()
            .try_by_api_name(tree.name(property))
        else {
            continue;
        };
        let value = match property_value(tree, property) {
            None => ClrValue::Null,
            Some(child) => node_to_clr_value(model, tree, attribute, child)?,
        };
        attribute.set(&mut *object, value);
    }
    Ok(ClrValue::Complex(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::read::parse_document;
    use crate::dom::write::{to_json_string, WriteSettings};
    use crate::model::{ComplexType, ResourceType};
    use serde_json::json;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Rating {
        average: f64,
        votes: i64,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Article {
        id: String,
        title: String,
        subtitle: Option<String>,
        tags: Vec<String>,
        rating: Option<Rating>,
        relationships: Option<Relationships>,
    }

    fn model() -> ServiceModel {
        let rating = ComplexType::builder::<Rating>()
            .attribute("average", "average", |r: &Rating| r.average, |r, v| r.average = v)
            .attribute("votes", "votes", |r: &Rating| r.votes, |r, v| r.votes = v)
            .build();
        let article = ResourceType::builder::<Article>("articles")
            .identity("id", |a| a.id.clone(), |a, id| a.id = id)
            .attribute("title", "title", |a: &Article| a.title.clone(), |a, v| a.title = v)
            .attribute(
                "subtitle",
                "subtitle",
                |a: &Article| a.subtitle.clone(),
                |a, v| a.subtitle = v,
            )
            .scalar_list_attribute("tags", "tags", |a: &Article| a.tags.clone(), |a, v| a.tags = v)
            .complex_attribute("rating", "rating", |a: &Article| a.rating.clone(), |a, v| {
                a.rating = v
            })
            .to_one::<Article>("author")
            .relationships(
                |a| a.relationships.clone(),
                |a, v| a.relationships = Some(v),
            )
            .build();
        ServiceModel::builder()
            .complex_type(rating)
            .resource_type(article)
            .build()
            .unwrap()
    }

    fn sample_article() -> Article {
        let mut relationships = Relationships::new();
        relationships.insert(
            "author",
            Relationship::to_one(Some(ResourceIdentifier::new("people", "9"))),
        );
        Article {
            id: "24".into(),
            title: "X".into(),
            subtitle: None,
            tags: vec!["tech".into(), "rust".into()],
            rating: Some(Rating {
                average: 4.5,
                votes: 12,
            }),
            relationships: Some(relationships),
        }
    }

    #[test]
    fn built_resource_serializes_to_expected_json() {
        let model = model();
        let doc = build_resource_document(&model, &sample_article()).unwrap();
        let json = crate::dom::write::write_document(
            &doc.tree,
            doc.root,
            WriteSettings::ignore_null(),
        );
        assert_eq!(
            json,
            json!({
                "data": {
                    "type": "articles",
                    "id": "24",
                    "attributes": {
                        "title": "X",
                        "tags": ["tech", "rust"],
                        "rating": {"average": 4.5, "votes": 12}
                    },
                    "relationships": {
                        "author": {"data": {"type": "people", "id": "9"}}
                    }
                }
            })
        );
    }

    #[test]
    fn build_serialize_parse_extract_round_trips() {
        let model = model();
        let original = sample_article();
        let doc = build_resource_document(&model, &original).unwrap();
        let text = to_json_string(&doc.tree, doc.root, WriteSettings::default());

        let parsed = parse_document(&text).unwrap();
        let document = parsed.document();
        let resource = document.data_resource().unwrap();
        assert_eq!(resource.api_type().as_deref(), Some("articles"));
        assert_eq!(resource.api_id().as_deref(), Some("24"));

        let extracted: Article =
            extract_resource(&model, &parsed.tree, resource.node()).unwrap();
        assert_eq!(extracted, original);
    }

    #[test]
    fn extraction_skips_unknown_attributes() {
        let model = model();
        let parsed = parse_document(
            r#"{"data": {
                "type": "articles",
                "id": "1",
                "attributes": {"title": "Y", "unmapped": "ignored"}
            }}"#,
        )
        .unwrap();
        let resource = parsed.document().data_resource().unwrap();
        let article: Article = extract_resource(&model, &parsed.tree, resource.node()).unwrap();
        assert_eq!(article.title, "Y");
    }

    #[test]
    fn unassigned_id_builds_no_identifier() {
        let model = model();
        let mut tree = DomTree::new();
        let blank = Article::default();
        assert_eq!(
            build_resource_identifier(&model, &mut tree, &blank).unwrap(),
            None
        );
        let assigned = Article {
            id: "7".into(),
            ..Article::default()
        };
        let node = build_resource_identifier(&model, &mut tree, &assigned)
            .unwrap()
            .unwrap();
        assert_eq!(
            *tree.data(node),
            DomData::Object(DomObjectKind::ResourceIdentifier)
        );
    }

    #[test]
    fn null_subtitle_round_trips_under_include() {
        let model = model();
        let doc = build_resource_document(&model, &sample_article()).unwrap();
        let json = crate::dom::write::write_document(&doc.tree, doc.root, WriteSettings::default());
        assert_eq!(json["data"]["attributes"]["subtitle"], json!(null));
    }
}
