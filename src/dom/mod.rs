//! The document object model.
//!
//! One parsed document becomes one [`DomTree`]: a closed set of node
//! variants ([`DomData`]) stored in the generic tree arena. Concrete
//! schema shapes (document, resource, relationship, link, ...) are
//! typed *views* over a node: construction partitions the node's
//! member properties by [`ApiMemberKind`] into named slots for O(1)
//! access. Every view has a fixed set of member kinds it accepts;
//! any other kind reaching a partition is a converter defect and
//! panics.
//!
//! Trees are short-lived and exclusively owned: each parse produces a
//! fresh tree consumed by one logical operation.

pub mod read;
pub mod write;

use std::fmt;

use crate::api::{
    Link, Linkage, Links, Meta, Relationship, Relationships, ResourceIdentifier, JsonApiVersion,
};
use crate::coerce::{ApiScalar, ScalarKind, ScalarValue};
use crate::error::ApiError;
use crate::node::{NodeArena, NodeId};

/// A document tree: the generic arena specialized to DOM payloads.
pub type DomTree = NodeArena<DomData>;

// ------------------------------ Tag sets ---------------------------------- //

/// The closed tag set identifying which schema member role a property
/// node fulfills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiMemberKind {
    /// Open content member (inside `meta` / `attributes` bodies).
    None,
    Id,
    Type,
    Meta,
    Attributes,
    Relationships,
    Relationship,
    Links,
    Link,
    HRef,
    Data,
    Errors,
    JsonApi,
    Version,
    Status,
    Code,
    Title,
    Detail,
    Source,
}

impl ApiMemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiMemberKind::None => "none",
            ApiMemberKind::Id => "id",
            ApiMemberKind::Type => "type",
            ApiMemberKind::Meta => "meta",
            ApiMemberKind::Attributes => "attributes",
            ApiMemberKind::Relationships => "relationships",
            ApiMemberKind::Relationship => "relationship",
            ApiMemberKind::Links => "links",
            ApiMemberKind::Link => "link",
            ApiMemberKind::HRef => "href",
            ApiMemberKind::Data => "data",
            ApiMemberKind::Errors => "errors",
            ApiMemberKind::JsonApi => "jsonapi",
            ApiMemberKind::Version => "version",
            ApiMemberKind::Status => "status",
            ApiMemberKind::Code => "code",
            ApiMemberKind::Title => "title",
            ApiMemberKind::Detail => "detail",
            ApiMemberKind::Source => "source",
        }
    }
}

impl fmt::Display for ApiMemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which schema shape an object node was partitioned as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomObjectKind {
    /// Open object (generic `meta` / `attributes` content).
    Object,
    Document,
    Resource,
    ResourceIdentifier,
    Relationships,
    Relationship,
    Links,
    Link,
    JsonApi,
    Error,
}

impl DomObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DomObjectKind::Object => "Object",
            DomObjectKind::Document => "Document",
            DomObjectKind::Resource => "Resource",
            DomObjectKind::ResourceIdentifier => "ResourceIdentifier",
            DomObjectKind::Relationships => "Relationships",
            DomObjectKind::Relationship => "Relationship",
            DomObjectKind::Links => "Links",
            DomObjectKind::Link => "Link",
            DomObjectKind::JsonApi => "JsonApi",
            DomObjectKind::Error => "Error",
        }
    }
}

/// What a whole document turned out to hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// No `data` and no `errors`; meta/jsonapi only.
    Document,
    /// `data` is an empty collection.
    EmptyDocument,
    /// `data` is literal null.
    NullDocument,
    ResourceDocument,
    ResourceCollectionDocument,
    ResourceIdentifierDocument,
    ResourceIdentifierCollectionDocument,
    ErrorsDocument,
}

// ------------------------------ Node data --------------------------------- //

/// One scalar leaf.
///
/// `kind` and `nullable` are captured once at construction (from the
/// [`ApiScalar`] facts when built from typed values) and drive the
/// null-vs-value emission policy: a non-nullable scalar always writes
/// its value; a nullable one writes null when the value is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomScalar {
    pub kind: ScalarKind,
    pub nullable: bool,
    pub value: Option<ScalarValue>,
}

impl DomScalar {
    /// Capture a typed value together with its per-type facts.
    pub fn of<T: ApiScalar>(value: T) -> Self {
        Self {
            kind: T::KIND,
            nullable: T::NULLABLE,
            value: value.into_scalar(),
        }
    }

    /// Wrap an already-typed scalar (parsed wire values).
    pub fn from_value(value: ScalarValue) -> Self {
        Self {
            kind: value.kind(),
            nullable: false,
            value: Some(value),
        }
    }
}

/// The closed set of DOM node variants.
#[derive(Clone, Debug, PartialEq)]
pub enum DomData {
    Object(DomObjectKind),
    Array { count: usize },
    Item { index: usize },
    Property { kind: ApiMemberKind },
    Value(DomScalar),
    /// A literal JSON null token.
    Null,
}

impl fmt::Display for DomData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomData::Object(kind) => write!(f, "object:{}", kind.as_str()),
            DomData::Array { count } => write!(f, "array({count})"),
            DomData::Item { index } => write!(f, "item[{index}]"),
            DomData::Property { kind } => write!(f, "property:{kind}"),
            DomData::Value(scalar) => match &scalar.value {
                Some(v) => write!(f, "value:{}={}", scalar.kind, v.format()),
                None => write!(f, "value:{}=null", scalar.kind),
            },
            DomData::Null => f.write_str("null"),
        }
    }
}

// --------------------------- Tree construction ---------------------------- //

pub fn new_object(tree: &mut DomTree, kind: DomObjectKind, properties: Vec<NodeId>) -> NodeId {
    tree.insert(kind.as_str(), DomData::Object(kind), properties)
}

pub fn new_property(
    tree: &mut DomTree,
    kind: ApiMemberKind,
    name: &str,
    value: Option<NodeId>,
) -> NodeId {
    let children = value.into_iter().collect();
    tree.insert(name, DomData::Property { kind }, children)
}

pub fn new_value(tree: &mut DomTree, scalar: DomScalar) -> NodeId {
    tree.insert("Value", DomData::Value(scalar), vec![])
}

pub fn new_null(tree: &mut DomTree) -> NodeId {
    tree.insert("Null", DomData::Null, vec![])
}

pub fn new_item(tree: &mut DomTree, index: usize, child: Option<NodeId>) -> NodeId {
    let children = child.into_iter().collect();
    tree.insert(format!("[{index}]"), DomData::Item { index }, children)
}

pub fn new_array(tree: &mut DomTree, items: Vec<NodeId>) -> NodeId {
    let count = items.len();
    tree.insert("Array", DomData::Array { count }, items)
}

/// The at-most-one child a property node wraps.
pub fn property_value(tree: &DomTree, property: NodeId) -> Option<NodeId> {
    tree.children(property).first().copied()
}

fn property_kind(tree: &DomTree, property: NodeId) -> ApiMemberKind {
    match tree.data(property) {
        DomData::Property { kind } => *kind,
        other => panic!("expected a property node, found {other}"),
    }
}

fn scalar_text(tree: &DomTree, node: NodeId) -> Option<String> {
    match tree.data(node) {
        DomData::Value(scalar) => scalar.value.as_ref().map(ScalarValue::format),
        _ => None,
    }
}

fn property_scalar_text(tree: &DomTree, property: Option<NodeId>) -> Option<String> {
    let value = property_value(tree, property?)?;
    scalar_text(tree, value)
}

fn property_meta(tree: &DomTree, property: Option<NodeId>) -> Option<Meta> {
    let value = property_value(tree, property?)?;
    match write::node_to_json(tree, value, write::WriteSettings::default()) {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

// ------------------------- Structural equality ---------------------------- //

/// Structural subtree equality, ignoring object member order and
/// scalar representation details (a value matches if it is equal or
/// renders to the same canonical text).
pub fn subtree_eq(a: &DomTree, a_id: NodeId, b: &DomTree, b_id: NodeId) -> bool {
    match (a.data(a_id), b.data(b_id)) {
        (DomData::Object(ka), DomData::Object(kb)) => {
            if ka != kb {
                return false;
            }
            let a_props = a.children(a_id);
            let b_props = b.children(b_id);
            if a_props.len() != b_props.len() {
                return false;
            }
            a_props.iter().all(|&ap| {
                b_props
                    .iter()
                    .find(|&&bp| b.name(bp) == a.name(ap))
                    .is_some_and(|&bp| subtree_eq(a, ap, b, bp))
            })
        }
        (DomData::Array { count: ca }, DomData::Array { count: cb }) => {
            ca == cb
                && a.children(a_id)
                    .iter()
                    .zip(b.children(b_id))
                    .all(|(&ai, &bi)| subtree_eq(a, ai, b, bi))
        }
        (DomData::Item { index: ia }, DomData::Item { index: ib }) => {
            ia == ib && child_eq(a, a_id, b, b_id)
        }
        (DomData::Property { kind: ka }, DomData::Property { kind: kb }) => {
            ka == kb && a.name(a_id) == b.name(b_id) && child_eq(a, a_id, b, b_id)
        }
        (DomData::Value(va), DomData::Value(vb)) => match (&va.value, &vb.value) {
            (None, None) => true,
            (Some(x), Some(y)) => x == y || x.format() == y.format(),
            _ => false,
        },
        (DomData::Null, DomData::Null) => true,
        // a nullable scalar holding no value and a literal null are
        // the same document content
        (DomData::Null, DomData::Value(v)) | (DomData::Value(v), DomData::Null) => {
            v.value.is_none()
        }
        _ => false,
    }
}

fn child_eq(a: &DomTree, a_id: NodeId, b: &DomTree, b_id: NodeId) -> bool {
    match (a.children(a_id).first(), b.children(b_id).first()) {
        (None, None) => true,
        (Some(&ac), Some(&bc)) => subtree_eq(a, ac, b, bc),
        _ => false,
    }
}

// ------------------------------ Typed views ------------------------------- //

macro_rules! expect_object {
    ($tree:expr, $node:expr, $kind:path, $view:literal) => {
        match $tree.data($node) {
            DomData::Object(k) if *k == $kind => {}
            other => panic!(concat!($view, " view over non-", $view, " node: {}"), other),
        }
    };
}

/// Typed view over a document node.
#[derive(Clone, Copy)]
pub struct DomDocument<'a> {
    tree: &'a DomTree,
    node: NodeId,
    jsonapi: Option<NodeId>,
    meta: Option<NodeId>,
    links: Option<NodeId>,
    data: Option<NodeId>,
    errors: Option<NodeId>,
}

impl<'a> DomDocument<'a> {
    /// Partition a document node's members into named slots.
    ///
    /// The member kinds a document accepts are fixed; anything else
    /// here means the converter produced a malformed tree.
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Document, "document");
        let mut view = Self {
            tree,
            node,
            jsonapi: None,
            meta: None,
            links: None,
            data: None,
            errors: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::JsonApi => view.jsonapi = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                ApiMemberKind::Links => view.links = Some(property),
                ApiMemberKind::Data => view.data = Some(property),
                ApiMemberKind::Errors => view.errors = Some(property),
                other => panic!("document partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn jsonapi_version(&self) -> Option<JsonApiVersion> {
        let value = property_value(self.tree, self.jsonapi?)?;
        Some(DomJsonApiVersion::new(self.tree, value).to_version())
    }

    pub fn meta(&self) -> Option<Meta> {
        property_meta(self.tree, self.meta)
    }

    pub fn links(&self) -> Option<Links> {
        let value = property_value(self.tree, self.links?)?;
        Some(DomLinks::new(self.tree, value).to_links())
    }

    /// The node under the `data` member, whatever its shape.
    pub fn data_node(&self) -> Option<NodeId> {
        property_value(self.tree, self.data?)
    }

    pub fn data_resource(&self) -> Option<DomResource<'a>> {
        let data = self.data_node()?;
        match self.tree.data(data) {
            DomData::Object(DomObjectKind::Resource) => Some(DomResource::new(self.tree, data)),
            _ => None,
        }
    }

    pub fn data_resource_identifier(&self) -> Option<DomResourceIdentifier<'a>> {
        let data = self.data_node()?;
        match self.tree.data(data) {
            DomData::Object(DomObjectKind::ResourceIdentifier) => {
                Some(DomResourceIdentifier::new(self.tree, data))
            }
            _ => None,
        }
    }

    pub fn data_collection(&self) -> Vec<DomResource<'a>> {
        self.collection_of(DomObjectKind::Resource)
            .into_iter()
            .map(|id| DomResource::new(self.tree, id))
            .collect()
    }

    pub fn data_identifier_collection(&self) -> Vec<DomResourceIdentifier<'a>> {
        self.collection_of(DomObjectKind::ResourceIdentifier)
            .into_iter()
            .map(|id| DomResourceIdentifier::new(self.tree, id))
            .collect()
    }

    fn collection_of(&self, kind: DomObjectKind) -> Vec<NodeId> {
        let Some(data) = self.data_node() else {
            return Vec::new();
        };
        let DomData::Array { .. } = self.tree.data(data) else {
            return Vec::new();
        };
        self.tree
            .children(data)
            .iter()
            .filter_map(|&item| self.tree.children(item).first().copied())
            .filter(|&child| matches!(self.tree.data(child), DomData::Object(k) if *k == kind))
            .collect()
    }

    pub fn errors(&self) -> Vec<ApiError> {
        let Some(errors) = self.errors.and_then(|p| property_value(self.tree, p)) else {
            return Vec::new();
        };
        self.tree
            .children(errors)
            .iter()
            .filter_map(|&item| self.tree.children(item).first().copied())
            .map(|err| DomErrorObject::new(self.tree, err).to_api_error())
            .collect()
    }

    /// Classify what this document holds.
    pub fn document_kind(&self) -> DocumentKind {
        if self.errors.is_some() {
            return DocumentKind::ErrorsDocument;
        }
        let Some(data) = self.data_node() else {
            if self.data.is_some() {
                // `data` member present with no child: parsed null
                return DocumentKind::NullDocument;
            }
            return DocumentKind::Document;
        };
        match self.tree.data(data) {
            DomData::Null => DocumentKind::NullDocument,
            DomData::Object(DomObjectKind::Resource) => DocumentKind::ResourceDocument,
            DomData::Object(DomObjectKind::ResourceIdentifier) => {
                DocumentKind::ResourceIdentifierDocument
            }
            DomData::Array { count: 0 } => DocumentKind::EmptyDocument,
            DomData::Array { .. } => {
                let first = self.tree.children(data)[0];
                let inner = self.tree.children(first).first().copied();
                match inner.map(|id| self.tree.data(id)) {
                    Some(DomData::Object(DomObjectKind::ResourceIdentifier)) => {
                        DocumentKind::ResourceIdentifierCollectionDocument
                    }
                    _ => DocumentKind::ResourceCollectionDocument,
                }
            }
            _ => DocumentKind::Document,
        }
    }
}

/// Typed view over a resource node.
#[derive(Clone, Copy)]
pub struct DomResource<'a> {
    tree: &'a DomTree,
    node: NodeId,
    type_: Option<NodeId>,
    id: Option<NodeId>,
    meta: Option<NodeId>,
    attributes: Option<NodeId>,
    relationships: Option<NodeId>,
    links: Option<NodeId>,
}

impl<'a> DomResource<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Resource, "resource");
        let mut view = Self {
            tree,
            node,
            type_: None,
            id: None,
            meta: None,
            attributes: None,
            relationships: None,
            links: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::Type => view.type_ = Some(property),
                ApiMemberKind::Id => view.id = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                ApiMemberKind::Attributes => view.attributes = Some(property),
                ApiMemberKind::Relationships => view.relationships = Some(property),
                ApiMemberKind::Links => view.links = Some(property),
                other => panic!("resource partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn api_type(&self) -> Option<String> {
        property_scalar_text(self.tree, self.type_)
    }

    pub fn api_id(&self) -> Option<String> {
        property_scalar_text(self.tree, self.id)
    }

    /// `type` + `id`, or `None` when the id is absent or blank (a
    /// degenerate identifier is worse than none).
    pub fn api_resource_identifier(&self) -> Option<ResourceIdentifier> {
        let api_type = self.api_type()?;
        let id = self.api_id()?;
        if id.trim().is_empty() {
            return None;
        }
        Some(ResourceIdentifier::new(api_type, id))
    }

    /// The open `attributes` object node.
    pub fn attributes_node(&self) -> Option<NodeId> {
        property_value(self.tree, self.attributes?)
    }

    /// One attribute's value node, looked up by API name.
    pub fn attribute(&self, api_name: &str) -> Option<NodeId> {
        let attributes = self.attributes_node()?;
        self.tree
            .children(attributes)
            .iter()
            .find(|&&p| self.tree.name(p) == api_name)
            .and_then(|&p| property_value(self.tree, p))
    }

    pub fn attributes(&self) -> Option<Meta> {
        property_meta(self.tree, self.attributes)
    }

    pub fn relationships(&self) -> Option<DomRelationships<'a>> {
        let value = property_value(self.tree, self.relationships?)?;
        Some(DomRelationships::new(self.tree, value))
    }

    pub fn links(&self) -> Option<DomLinks<'a>> {
        let value = property_value(self.tree, self.links?)?;
        Some(DomLinks::new(self.tree, value))
    }

    pub fn meta(&self) -> Option<Meta> {
        property_meta(self.tree, self.meta)
    }
}

/// Typed view over a resource-identifier node.
#[derive(Clone, Copy)]
pub struct DomResourceIdentifier<'a> {
    tree: &'a DomTree,
    node: NodeId,
    type_: Option<NodeId>,
    id: Option<NodeId>,
    meta: Option<NodeId>,
}

impl<'a> DomResourceIdentifier<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(
            tree,
            node,
            DomObjectKind::ResourceIdentifier,
            "resource identifier"
        );
        let mut view = Self {
            tree,
            node,
            type_: None,
            id: None,
            meta: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::Type => view.type_ = Some(property),
                ApiMemberKind::Id => view.id = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                other => panic!("resource identifier partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn api_type(&self) -> Option<String> {
        property_scalar_text(self.tree, self.type_)
    }

    pub fn api_id(&self) -> Option<String> {
        property_scalar_text(self.tree, self.id)
    }

    pub fn meta(&self) -> Option<Meta> {
        property_meta(self.tree, self.meta)
    }

    pub fn to_identifier(&self) -> Option<ResourceIdentifier> {
        Some(ResourceIdentifier::new(self.api_type()?, self.api_id()?))
    }
}

/// Typed view over a relationships container node.
#[derive(Clone, Copy)]
pub struct DomRelationships<'a> {
    tree: &'a DomTree,
    node: NodeId,
}

impl<'a> DomRelationships<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Relationships, "relationships");
        Self { tree, node }
    }

    pub fn relationship(&self, rel: &str) -> Option<DomRelationship<'a>> {
        self.tree
            .children(self.node)
            .iter()
            .find(|&&p| self.tree.name(p) == rel)
            .and_then(|&p| property_value(self.tree, p))
            .map(|value| DomRelationship::new(self.tree, value))
    }

    pub fn to_relationships(&self) -> Relationships {
        let mut out = Relationships::new();
        for &property in self.tree.children(self.node) {
            let rel = self.tree.name(property).to_owned();
            if let Some(value) = property_value(self.tree, property) {
                out.insert(rel, DomRelationship::new(self.tree, value).to_relationship());
            }
        }
        out
    }
}

/// Typed view over a single relationship node.
#[derive(Clone, Copy)]
pub struct DomRelationship<'a> {
    tree: &'a DomTree,
    node: NodeId,
    links: Option<NodeId>,
    data: Option<NodeId>,
    meta: Option<NodeId>,
}

impl<'a> DomRelationship<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Relationship, "relationship");
        let mut view = Self {
            tree,
            node,
            links: None,
            data: None,
            meta: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::Links => view.links = Some(property),
                ApiMemberKind::Data => view.data = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                other => panic!("relationship partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn links(&self) -> Option<Links> {
        let value = property_value(self.tree, self.links?)?;
        Some(DomLinks::new(self.tree, value).to_links())
    }

    pub fn meta(&self) -> Option<Meta> {
        property_meta(self.tree, self.meta)
    }

    /// The `data` linkage: empty to-one, a single identifier, or a
    /// list of identifiers.
    pub fn linkage(&self) -> Option<Linkage> {
        let data = property_value(self.tree, self.data?)?;
        match self.tree.data(data) {
            DomData::Null => Some(Linkage::ToOne(None)),
            DomData::Object(DomObjectKind::ResourceIdentifier) => Some(Linkage::ToOne(
                DomResourceIdentifier::new(self.tree, data).to_identifier(),
            )),
            DomData::Array { .. } => {
                let identifiers = self
                    .tree
                    .children(data)
                    .iter()
                    .filter_map(|&item| self.tree.children(item).first().copied())
                    .filter_map(|child| match self.tree.data(child) {
                        DomData::Object(DomObjectKind::ResourceIdentifier) => {
                            DomResourceIdentifier::new(self.tree, child).to_identifier()
                        }
                        _ => None,
                    })
                    .collect();
                Some(Linkage::ToMany(identifiers))
            }
            _ => None,
        }
    }

    pub fn to_relationship(&self) -> Relationship {
        Relationship {
            links: self.links(),
            data: self.linkage(),
            meta: self.meta(),
        }
    }
}

/// Typed view over a links container node.
#[derive(Clone, Copy)]
pub struct DomLinks<'a> {
    tree: &'a DomTree,
    node: NodeId,
}

impl<'a> DomLinks<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Links, "links");
        Self { tree, node }
    }

    pub fn link(&self, rel: &str) -> Option<DomLink<'a>> {
        self.tree
            .children(self.node)
            .iter()
            .find(|&&p| self.tree.name(p) == rel)
            .and_then(|&p| property_value(self.tree, p))
            .map(|value| DomLink::new(self.tree, value))
    }

    pub fn to_links(&self) -> Links {
        let mut out = Links::new();
        for &property in self.tree.children(self.node) {
            let rel = self.tree.name(property).to_owned();
            if let Some(value) = property_value(self.tree, property) {
                out.insert(rel, DomLink::new(self.tree, value).to_link());
            }
        }
        out
    }
}

/// Typed view over a single link node.
#[derive(Clone, Copy)]
pub struct DomLink<'a> {
    tree: &'a DomTree,
    node: NodeId,
    href: Option<NodeId>,
    meta: Option<NodeId>,
}

impl<'a> DomLink<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Link, "link");
        let mut view = Self {
            tree,
            node,
            href: None,
            meta: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::HRef => view.href = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                other => panic!("link partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn href(&self) -> Option<String> {
        property_scalar_text(self.tree, self.href)
    }

    pub fn meta(&self) -> Option<Meta> {
        property_meta(self.tree, self.meta)
    }

    pub(crate) fn meta_property(&self) -> Option<NodeId> {
        self.meta
    }

    pub fn to_link(&self) -> Link {
        Link {
            href: self.href(),
            meta: self.meta(),
        }
    }
}

/// Typed view over the `jsonapi` version node.
#[derive(Clone, Copy)]
pub struct DomJsonApiVersion<'a> {
    tree: &'a DomTree,
    version: Option<NodeId>,
    meta: Option<NodeId>,
}

impl<'a> DomJsonApiVersion<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::JsonApi, "jsonapi");
        let mut view = Self {
            tree,
            version: None,
            meta: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::Version => view.version = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                other => panic!("jsonapi partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn to_version(&self) -> JsonApiVersion {
        JsonApiVersion {
            version: property_scalar_text(self.tree, self.version),
            meta: property_meta(self.tree, self.meta),
        }
    }
}

/// Typed view over one entry of the `errors` member.
#[derive(Clone, Copy)]
pub struct DomErrorObject<'a> {
    tree: &'a DomTree,
    id: Option<NodeId>,
    links: Option<NodeId>,
    status: Option<NodeId>,
    code: Option<NodeId>,
    title: Option<NodeId>,
    detail: Option<NodeId>,
    source: Option<NodeId>,
    meta: Option<NodeId>,
}

impl<'a> DomErrorObject<'a> {
    pub fn new(tree: &'a DomTree, node: NodeId) -> Self {
        expect_object!(tree, node, DomObjectKind::Error, "error");
        let mut view = Self {
            tree,
            id: None,
            links: None,
            status: None,
            code: None,
            title: None,
            detail: None,
            source: None,
            meta: None,
        };
        for &property in tree.children(node) {
            match property_kind(tree, property) {
                ApiMemberKind::Id => view.id = Some(property),
                ApiMemberKind::Links => view.links = Some(property),
                ApiMemberKind::Status => view.status = Some(property),
                ApiMemberKind::Code => view.code = Some(property),
                ApiMemberKind::Title => view.title = Some(property),
                ApiMemberKind::Detail => view.detail = Some(property),
                ApiMemberKind::Source => view.source = Some(property),
                ApiMemberKind::Meta => view.meta = Some(property),
                other => panic!("error partition: unexpected member kind `{other}`"),
            }
        }
        view
    }

    pub fn status(&self) -> Option<String> {
        property_scalar_text(self.tree, self.status)
    }

    pub fn code(&self) -> Option<String> {
        property_scalar_text(self.tree, self.code)
    }

    pub fn title(&self) -> Option<String> {
        property_scalar_text(self.tree, self.title)
    }

    pub fn detail(&self) -> Option<String> {
        property_scalar_text(self.tree, self.detail)
    }

    /// Collapse to the crate's diagnostic record. The wire `source`
    /// object contributes its `pointer` member when present.
    pub fn to_api_error(&self) -> ApiError {
        let pointer = self
            .source
            .and_then(|p| property_value(self.tree, p))
            .and_then(|source| {
                self.tree
                    .children(source)
                    .iter()
                    .find(|&&p| self.tree.name(p) == "pointer")
                    .and_then(|&p| property_value(self.tree, p))
                    .and_then(|v| scalar_text(self.tree, v))
            })
            .unwrap_or_default();
        ApiError::new(
            self.title().unwrap_or_default(),
            self.detail().unwrap_or_default(),
            pointer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_tree() -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let type_value = new_value(&mut tree, DomScalar::of("articles".to_owned()));
        let type_prop = new_property(&mut tree, ApiMemberKind::Type, "type", Some(type_value));
        let id_value = new_value(&mut tree, DomScalar::of("24".to_owned()));
        let id_prop = new_property(&mut tree, ApiMemberKind::Id, "id", Some(id_value));
        let title = new_value(&mut tree, DomScalar::of("X".to_owned()));
        let title_prop = new_property(&mut tree, ApiMemberKind::None, "title", Some(title));
        let attrs = new_object(&mut tree, DomObjectKind::Object, vec![title_prop]);
        let attrs_prop =
            new_property(&mut tree, ApiMemberKind::Attributes, "attributes", Some(attrs));
        let resource = new_object(
            &mut tree,
            DomObjectKind::Resource,
            vec![type_prop, id_prop, attrs_prop],
        );
        (tree, resource)
    }

    #[test]
    fn resource_partition_gives_typed_access() {
        let (tree, resource) = article_tree();
        let view = DomResource::new(&tree, resource);
        assert_eq!(view.api_type().as_deref(), Some("articles"));
        assert_eq!(view.api_id().as_deref(), Some("24"));
        assert_eq!(
            view.api_resource_identifier(),
            Some(ResourceIdentifier::new("articles", "24"))
        );
        let title = view.attribute("title").unwrap();
        assert_eq!(scalar_text(&tree, title).as_deref(), Some("X"));
    }

    #[test]
    fn blank_id_yields_no_identifier() {
        let mut tree = DomTree::new();
        let type_value = new_value(&mut tree, DomScalar::of("articles".to_owned()));
        let type_prop = new_property(&mut tree, ApiMemberKind::Type, "type", Some(type_value));
        let id_value = new_value(&mut tree, DomScalar::of("   ".to_owned()));
        let id_prop = new_property(&mut tree, ApiMemberKind::Id, "id", Some(id_value));
        let resource = new_object(&mut tree, DomObjectKind::Resource, vec![type_prop, id_prop]);
        let view = DomResource::new(&tree, resource);
        assert_eq!(view.api_resource_identifier(), None);
    }

    #[test]
    #[should_panic(expected = "resource partition")]
    fn unknown_member_kind_aborts_partition() {
        let mut tree = DomTree::new();
        let stray = new_property(&mut tree, ApiMemberKind::Version, "version", None);
        let resource = new_object(&mut tree, DomObjectKind::Resource, vec![stray]);
        let _ = DomResource::new(&tree, resource);
    }

    #[test]
    fn subtree_eq_ignores_member_order() {
        let (a, a_root) = article_tree();

        let mut b = DomTree::new();
        let title = new_value(&mut b, DomScalar::of("X".to_owned()));
        let title_prop = new_property(&mut b, ApiMemberKind::None, "title", Some(title));
        let attrs = new_object(&mut b, DomObjectKind::Object, vec![title_prop]);
        let attrs_prop = new_property(&mut b, ApiMemberKind::Attributes, "attributes", Some(attrs));
        let id_value = new_value(&mut b, DomScalar::of("24".to_owned()));
        let id_prop = new_property(&mut b, ApiMemberKind::Id, "id", Some(id_value));
        let type_value = new_value(&mut b, DomScalar::of("articles".to_owned()));
        let type_prop = new_property(&mut b, ApiMemberKind::Type, "type", Some(type_value));
        let b_root = new_object(
            &mut b,
            DomObjectKind::Resource,
            vec![attrs_prop, id_prop, type_prop],
        );

        assert!(subtree_eq(&a, a_root, &b, b_root));
    }

    #[test]
    fn tree_string_names_the_shape() {
        let (tree, resource) = article_tree();
        let rendered = tree.to_tree_string(resource);
        assert!(rendered.starts_with("<Resource object:Resource>"));
        assert!(rendered.contains("property:type"));
        assert!(rendered.contains("value:string=articles"));
    }
}
