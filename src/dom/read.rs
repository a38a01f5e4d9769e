//! JSON to DOM converters.
//!
//! One converter per node variant, all driven by the shape of the
//! incoming `serde_json::Value`:
//! - `null` for an object-shaped variant is a null result, never an
//!   error.
//! - Member names dispatch through an exhaustive match over the
//!   variant's closed member set; an unknown name is a schema error.
//! - Schema errors accumulate in a [`ReadContext`] across the whole
//!   attempt and surface together in one [`Error::Document`]; callers
//!   get the complete list, not just the first.
//! - Open bodies (`meta`, `attributes`) recurse generically by token
//!   type instead of by name.

use serde_json::Value;
use tracing::{debug, warn};

use crate::coerce::ScalarValue;
use crate::error::{ApiError, Error, Result};
use crate::node::NodeId;

use super::{
    new_array, new_item, new_null, new_object, new_property, new_value, ApiMemberKind,
    DomDocument, DomObjectKind, DomScalar, DomTree,
};

// ------------------------------ Entry points ------------------------------ //

/// A freshly parsed document: the tree plus its root node.
#[derive(Debug)]
pub struct ParsedDocument {
    pub tree: DomTree,
    pub root: NodeId,
}

impl ParsedDocument {
    pub fn document(&self) -> DomDocument<'_> {
        DomDocument::new(&self.tree, self.root)
    }
}

/// Parse JSON text into a document tree.
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    let value: Value = serde_json::from_str(text)?;
    document_from_value(&value)
}

/// Build a document tree from already-parsed JSON.
pub fn document_from_value(value: &Value) -> Result<ParsedDocument> {
    let mut tree = DomTree::new();
    let mut ctx = ReadContext::new();
    let read = read_document(&mut tree, &mut ctx, value)?;
    let root = match read {
        DomRead::Node(root) => Some(root),
        DomRead::Null | DomRead::Invalid => {
            if matches!(read, DomRead::Null) {
                ctx.error(
                    "invalid document",
                    "a document must be a JSON object, found null".to_owned(),
                );
            }
            None
        }
    };
    if !ctx.errors.is_empty() {
        warn!(errors = ctx.errors.len(), "document rejected");
    }
    ctx.finish()?;
    let root = root.expect("a document with no accumulated errors has a root");
    debug!(nodes = tree.len(), "document parsed");
    Ok(ParsedDocument { tree, root })
}

// ------------------------------ Read context ------------------------------ //

/// Outcome of one converter call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomRead {
    Node(NodeId),
    /// The token was literal null; legal, produces no node.
    Null,
    /// The token did not fit; diagnostics were accumulated.
    Invalid,
}

impl DomRead {
    pub fn node(self) -> Option<NodeId> {
        match self {
            DomRead::Node(id) => Some(id),
            _ => None,
        }
    }
}

/// Per-parse error accumulation plus the JSON-pointer path into the
/// document being walked.
pub struct ReadContext {
    pointer: Vec<String>,
    errors: Vec<ApiError>,
}

impl Default for ReadContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadContext {
    pub fn new() -> Self {
        Self {
            pointer: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn push(&mut self, segment: impl ToString) {
        self.pointer.push(segment.to_string());
    }

    fn pop(&mut self) {
        self.pointer.pop();
    }

    fn pointer(&self) -> String {
        if self.pointer.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        for segment in &self.pointer {
            out.push('/');
            out.push_str(segment);
        }
        out
    }

    fn error(&mut self, title: &str, detail: String) {
        self.errors
            .push(ApiError::new(title, detail, self.pointer()));
    }

    fn unknown_member(&mut self, owner: &'static str, name: &str, value: &Value) {
        self.error(
            "unknown member",
            format!("{owner} object does not allow member `{name}` (near {})", snippet(value)),
        );
    }

    fn invalid_shape(&mut self, expected: &'static str, value: &Value) {
        self.error(
            "invalid token",
            format!("expected {expected}, found {}", snippet(value)),
        );
    }

    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    /// Raise every accumulated diagnostic as one error, or nothing.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Document(self.errors))
        }
    }
}

/// Compact rendering of the offending JSON, bounded for messages.
fn snippet(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 60 {
        let mut cut = 60;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}

// ----------------------------- Member tables ------------------------------ //

enum DocumentMember {
    JsonApi,
    Meta,
    Links,
    Data,
    Errors,
}

impl DocumentMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "jsonapi" => Some(Self::JsonApi),
            "meta" => Some(Self::Meta),
            "links" => Some(Self::Links),
            "data" => Some(Self::Data),
            "errors" => Some(Self::Errors),
            _ => None,
        }
    }
}

enum ResourceMember {
    Type,
    Id,
    Meta,
    Attributes,
    Relationships,
    Links,
}

impl ResourceMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "type" => Some(Self::Type),
            "id" => Some(Self::Id),
            "meta" => Some(Self::Meta),
            "attributes" => Some(Self::Attributes),
            "relationships" => Some(Self::Relationships),
            "links" => Some(Self::Links),
            _ => None,
        }
    }
}

enum IdentifierMember {
    Type,
    Id,
    Meta,
}

impl IdentifierMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "type" => Some(Self::Type),
            "id" => Some(Self::Id),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

enum RelationshipMember {
    Links,
    Data,
    Meta,
}

impl RelationshipMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "links" => Some(Self::Links),
            "data" => Some(Self::Data),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

enum LinkMember {
    HRef,
    Meta,
}

impl LinkMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "href" => Some(Self::HRef),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

enum VersionMember {
    Version,
    Meta,
}

impl VersionMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "version" => Some(Self::Version),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

enum ErrorMember {
    Id,
    Links,
    Status,
    Code,
    Title,
    Detail,
    Source,
    Meta,
}

impl ErrorMember {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "links" => Some(Self::Links),
            "status" => Some(Self::Status),
            "code" => Some(Self::Code),
            "title" => Some(Self::Title),
            "detail" => Some(Self::Detail),
            "source" => Some(Self::Source),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

// --------------------------- Object discrimination ------------------------ //

/// What an object token inside a data position looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ObjectShape {
    Open,
    Resource,
    ResourceIdentifier,
}

fn object_shape(members: &serde_json::Map<String, Value>) -> ObjectShape {
    let resource_only = ["attributes", "relationships", "links"];
    if resource_only.iter().any(|m| members.contains_key(*m)) {
        return ObjectShape::Resource;
    }
    let identifier_members = ["type", "id", "meta"];
    if members.contains_key("type")
        && members.keys().all(|k| identifier_members.contains(&k.as_str()))
    {
        return ObjectShape::ResourceIdentifier;
    }
    ObjectShape::Open
}

// ------------------------------- Converters ------------------------------- //

type MemberReader = fn(&mut DomTree, &mut ReadContext, &Value) -> Result<DomRead>;

/// Build one property node for a member: null becomes a null child,
/// a readable token becomes the child, an invalid token leaves the
/// property childless (the context already carries the diagnostics).
fn member(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    kind: ApiMemberKind,
    name: &str,
    value: &Value,
    read: MemberReader,
) -> Result<NodeId> {
    if value.is_null() {
        let null = new_null(tree);
        return Ok(new_property(tree, kind, name, Some(null)));
    }
    let child = read(tree, ctx, value)?.node();
    Ok(new_property(tree, kind, name, child))
}

/// A member whose value must be a scalar token.
fn scalar_member(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    kind: ApiMemberKind,
    name: &str,
    value: &Value,
) -> NodeId {
    if value.is_null() {
        let null = new_null(tree);
        return new_property(tree, kind, name, Some(null));
    }
    match try_scalar_from_json(value) {
        Some(scalar) => {
            let child = new_value(tree, DomScalar::from_value(scalar));
            new_property(tree, kind, name, Some(child))
        }
        None => {
            ctx.invalid_shape("a scalar", value);
            new_property(tree, kind, name, None)
        }
    }
}

pub fn read_document(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a document object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match DocumentMember::parse(name) {
            Some(DocumentMember::JsonApi) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::JsonApi,
                name,
                member_value,
                read_jsonapi_version,
            )?),
            Some(DocumentMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            Some(DocumentMember::Links) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Links,
                name,
                member_value,
                read_links,
            )?),
            Some(DocumentMember::Data) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Data,
                name,
                member_value,
                read_document_data,
            )?),
            Some(DocumentMember::Errors) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Errors,
                name,
                member_value,
                read_errors,
            )?),
            None => ctx.unknown_member("document", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Document,
        properties,
    )))
}

/// The document `data` member: a resource, a resource identifier, or
/// a collection of either.
fn read_document_data(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    match value {
        Value::Null => Ok(DomRead::Null),
        Value::Object(members) => match object_shape(members) {
            ObjectShape::ResourceIdentifier => read_resource_identifier(tree, ctx, value),
            _ => read_resource(tree, ctx, value),
        },
        Value::Array(items) => Ok(DomRead::Node(read_array(tree, ctx, items, true)?)),
        other => {
            ctx.invalid_shape("a resource, resource identifier, or collection", other);
            Ok(DomRead::Invalid)
        }
    }
}

pub fn read_resource(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a resource object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match ResourceMember::parse(name) {
            Some(ResourceMember::Type) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Type, name, member_value));
            }
            Some(ResourceMember::Id) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Id, name, member_value));
            }
            Some(ResourceMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            Some(ResourceMember::Attributes) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Attributes,
                name,
                member_value,
                read_open_object,
            )?),
            Some(ResourceMember::Relationships) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Relationships,
                name,
                member_value,
                read_relationships,
            )?),
            Some(ResourceMember::Links) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Links,
                name,
                member_value,
                read_links,
            )?),
            None => ctx.unknown_member("resource", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Resource,
        properties,
    )))
}

pub fn read_resource_identifier(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    value: &Value,
) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a resource identifier object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match IdentifierMember::parse(name) {
            Some(IdentifierMember::Type) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Type, name, member_value));
            }
            Some(IdentifierMember::Id) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Id, name, member_value));
            }
            Some(IdentifierMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            None => ctx.unknown_member("resource identifier", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::ResourceIdentifier,
        properties,
    )))
}

/// A relationships container: every member is a relationship named by
/// its rel.
pub fn read_relationships(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    value: &Value,
) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a relationships object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (rel, member_value) in members {
        ctx.push(rel);
        properties.push(member(
            tree,
            ctx,
            ApiMemberKind::Relationship,
            rel,
            member_value,
            read_relationship,
        )?);
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Relationships,
        properties,
    )))
}

pub fn read_relationship(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    value: &Value,
) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a relationship object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match RelationshipMember::parse(name) {
            Some(RelationshipMember::Links) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Links,
                name,
                member_value,
                read_links,
            )?),
            Some(RelationshipMember::Data) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Data,
                name,
                member_value,
                read_linkage,
            )?),
            Some(RelationshipMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            None => ctx.unknown_member("relationship", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Relationship,
        properties,
    )))
}

/// Relationship `data`: one identifier or an identifier collection.
/// Full resource objects are not legal linkage.
fn read_linkage(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    match value {
        Value::Null => Ok(DomRead::Null),
        Value::Object(_) => read_resource_identifier(tree, ctx, value),
        Value::Array(items) => Ok(DomRead::Node(read_array(tree, ctx, items, false)?)),
        other => {
            ctx.invalid_shape("resource linkage", other);
            Ok(DomRead::Invalid)
        }
    }
}

/// A links container: every member is a link named by its rel.
pub fn read_links(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a links object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (rel, member_value) in members {
        ctx.push(rel);
        properties.push(member(
            tree,
            ctx,
            ApiMemberKind::Link,
            rel,
            member_value,
            read_link,
        )?);
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Links,
        properties,
    )))
}

/// A link is either a bare href string or an object with `href` and
/// `meta` members.
pub fn read_link(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::String(href) => {
            let scalar = new_value(tree, DomScalar::of(href.clone()));
            let href_property = new_property(tree, ApiMemberKind::HRef, "href", Some(scalar));
            return Ok(DomRead::Node(new_object(
                tree,
                DomObjectKind::Link,
                vec![href_property],
            )));
        }
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a link string or object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match LinkMember::parse(name) {
            Some(LinkMember::HRef) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::HRef, name, member_value));
            }
            Some(LinkMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            None => ctx.unknown_member("link", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Link,
        properties,
    )))
}

/// The `errors` member: an array of error objects.
pub fn read_errors(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<DomRead> {
    let items = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Array(items) => items,
        other => {
            ctx.invalid_shape("an array of error objects", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut dom_items = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        ctx.push(index);
        let child = read_error_object(tree, ctx, item)?.node();
        dom_items.push(new_item(tree, index, child));
        ctx.pop();
    }
    Ok(DomRead::Node(new_array(tree, dom_items)))
}

pub fn read_error_object(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    value: &Value,
) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("an error object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match ErrorMember::parse(name) {
            Some(ErrorMember::Id) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Id, name, member_value));
            }
            Some(ErrorMember::Status) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Status, name, member_value));
            }
            Some(ErrorMember::Code) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Code, name, member_value));
            }
            Some(ErrorMember::Title) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Title, name, member_value));
            }
            Some(ErrorMember::Detail) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Detail, name, member_value));
            }
            Some(ErrorMember::Links) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Links,
                name,
                member_value,
                read_links,
            )?),
            Some(ErrorMember::Source) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Source,
                name,
                member_value,
                read_open_object,
            )?),
            Some(ErrorMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            None => ctx.unknown_member("error", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Error,
        properties,
    )))
}

pub fn read_jsonapi_version(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    value: &Value,
) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("a jsonapi object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        match VersionMember::parse(name) {
            Some(VersionMember::Version) => {
                properties.push(scalar_member(tree, ctx, ApiMemberKind::Version, name, member_value));
            }
            Some(VersionMember::Meta) => properties.push(member(
                tree,
                ctx,
                ApiMemberKind::Meta,
                name,
                member_value,
                read_open_object,
            )?),
            None => ctx.unknown_member("jsonapi", name, member_value),
        }
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::JsonApi,
        properties,
    )))
}

/// Fully open object (`meta`/`attributes` bodies): members recurse
/// generically by token type; nothing is rejected by name.
pub fn read_open_object(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    value: &Value,
) -> Result<DomRead> {
    let members = match value {
        Value::Null => return Ok(DomRead::Null),
        Value::Object(members) => members,
        other => {
            ctx.invalid_shape("an object", other);
            return Ok(DomRead::Invalid);
        }
    };
    let mut properties = Vec::with_capacity(members.len());
    for (name, member_value) in members {
        ctx.push(name);
        let child = read_any(tree, ctx, member_value)?;
        properties.push(new_property(tree, ApiMemberKind::None, name, Some(child)));
        ctx.pop();
    }
    Ok(DomRead::Node(new_object(
        tree,
        DomObjectKind::Object,
        properties,
    )))
}

/// Open content: any token becomes a node.
pub(crate) fn read_any(tree: &mut DomTree, ctx: &mut ReadContext, value: &Value) -> Result<NodeId> {
    match value {
        Value::Null => Ok(new_null(tree)),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(new_value(tree, DomScalar::from_value(scalar_from_json(value))))
        }
        Value::Array(items) => {
            let mut dom_items = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                ctx.push(index);
                let child = read_any(tree, ctx, item)?;
                dom_items.push(new_item(tree, index, Some(child)));
                ctx.pop();
            }
            Ok(new_array(tree, dom_items))
        }
        Value::Object(_) => Ok(read_open_object(tree, ctx, value)?
            .node()
            .expect("object token always builds a node")),
    }
}

/// Positional array parsing for data positions. Items are tagged by
/// index; objects branch on their discriminated shape. A full
/// resource object is only legal when `allow_resources` (document
/// `data` collections); inside bare arrays it stays an explicit
/// unsupported case.
pub fn read_array(
    tree: &mut DomTree,
    ctx: &mut ReadContext,
    items: &[Value],
    allow_resources: bool,
) -> Result<NodeId> {
    let mut dom_items = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        ctx.push(index);
        let child = match item {
            Value::Null => None,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Some(new_value(tree, DomScalar::from_value(scalar_from_json(item))))
            }
            Value::Object(members) => match object_shape(members) {
                ObjectShape::ResourceIdentifier => read_resource_identifier(tree, ctx, item)?.node(),
                ObjectShape::Resource if allow_resources => read_resource(tree, ctx, item)?.node(),
                ObjectShape::Resource => {
                    return Err(Error::Unsupported {
                        detail: format!(
                            "resource object at index {index} inside a bare array; \
                             only resource identifiers are supported here"
                        ),
                    });
                }
                ObjectShape::Open => read_open_object(tree, ctx, item)?.node(),
            },
            other => {
                ctx.invalid_shape("an array item", other);
                None
            }
        };
        dom_items.push(new_item(tree, index, child));
        ctx.pop();
    }
    Ok(new_array(tree, dom_items))
}

// ------------------------------ Scalar leaves ----------------------------- //

fn try_scalar_from_json(value: &Value) -> Option<ScalarValue> {
    match value {
        Value::Bool(b) => Some(ScalarValue::Bool(*b)),
        Value::String(s) => Some(ScalarValue::String(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ScalarValue::Int(i))
            } else if let Some(u) = n.as_u64() {
                Some(ScalarValue::Uint(u))
            } else {
                n.as_f64().map(ScalarValue::float)
            }
        }
        _ => None,
    }
}

/// Convert a scalar token to its typed value.
///
/// Receiving a non-scalar here is a converter defect, not a data
/// error: every caller has already branched on token shape.
pub fn scalar_from_json(value: &Value) -> ScalarValue {
    match try_scalar_from_json(value) {
        Some(scalar) => scalar,
        None => panic!("scalar converter received a non-scalar token: {}", snippet(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DocumentKind, DomData};
    use serde_json::json;

    #[test]
    fn resource_document_parses_and_partitions() {
        let doc = parse_document(
            r#"{
                "data": {
                    "type": "articles",
                    "id": "24",
                    "attributes": { "title": "X" },
                    "relationships": {
                        "author": { "data": { "type": "people", "id": "9" } }
                    }
                }
            }"#,
        )
        .unwrap();
        let document = doc.document();
        assert_eq!(document.document_kind(), DocumentKind::ResourceDocument);
        let resource = document.data_resource().unwrap();
        assert_eq!(resource.api_type().as_deref(), Some("articles"));
        assert_eq!(resource.api_id().as_deref(), Some("24"));
        let relationships = resource.relationships().unwrap();
        let author = relationships.relationship("author").unwrap();
        assert_eq!(
            author.linkage(),
            Some(crate::api::Linkage::ToOne(Some(
                crate::api::ResourceIdentifier::new("people", "9")
            )))
        );
    }

    #[test]
    fn unknown_member_is_rejected_with_its_name() {
        let err = parse_document(r#"{"data": {"type": "articles", "id": "1", "bogus": true}}"#)
            .unwrap_err();
        let errors = err.document_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].detail.contains("`bogus`"));
        assert_eq!(errors[0].source, "/data/bogus");
    }

    #[test]
    fn errors_accumulate_across_the_whole_document() {
        let err = parse_document(
            r#"{
                "bogus_top": 1,
                "data": {"type": "articles", "id": "1", "bogus_inner": true},
                "links": {"self": 42}
            }"#,
        )
        .unwrap_err();
        let errors = err.document_errors().unwrap();
        assert_eq!(errors.len(), 3);
        let sources: Vec<&str> = errors.iter().map(|e| e.source.as_str()).collect();
        assert!(sources.contains(&"/bogus_top"));
        assert!(sources.contains(&"/data/bogus_inner"));
        assert!(sources.contains(&"/links/self"));
    }

    #[test]
    fn null_propagates_through_object_converters() {
        let mut tree = DomTree::new();
        let mut ctx = ReadContext::new();
        let null = Value::Null;
        assert_eq!(read_link(&mut tree, &mut ctx, &null).unwrap(), DomRead::Null);
        assert_eq!(read_links(&mut tree, &mut ctx, &null).unwrap(), DomRead::Null);
        assert_eq!(
            read_relationship(&mut tree, &mut ctx, &null).unwrap(),
            DomRead::Null
        );
        assert_eq!(
            read_open_object(&mut tree, &mut ctx, &null).unwrap(),
            DomRead::Null
        );
        assert_eq!(
            read_resource(&mut tree, &mut ctx, &null).unwrap(),
            DomRead::Null
        );
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn array_items_are_index_tagged() {
        let mut tree = DomTree::new();
        let mut ctx = ReadContext::new();
        let items = vec![
            json!(null),
            json!(42),
            json!({"type": "articles", "id": "1"}),
        ];
        let array = read_array(&mut tree, &mut ctx, &items, false).unwrap();
        assert!(ctx.errors().is_empty());
        assert_eq!(*tree.data(array), DomData::Array { count: 3 });
        let children = tree.children(array);
        for (expected, &item) in children.iter().enumerate() {
            assert_eq!(*tree.data(item), DomData::Item { index: expected });
        }
        // null item has no child; scalar and identifier do
        assert!(tree.children(children[0]).is_empty());
        assert!(!tree.children(children[1]).is_empty());
        let ident = tree.children(children[2])[0];
        assert_eq!(
            *tree.data(ident),
            DomData::Object(DomObjectKind::ResourceIdentifier)
        );
    }

    #[test]
    fn resource_in_bare_array_stays_unsupported() {
        let mut tree = DomTree::new();
        let mut ctx = ReadContext::new();
        let items = vec![json!({
            "type": "articles",
            "id": "1",
            "attributes": {"title": "X"}
        })];
        let err = read_array(&mut tree, &mut ctx, &items, false).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn link_accepts_string_and_object_shapes() {
        let doc = parse_document(
            r#"{
                "links": {
                    "self": "http://example.com/articles",
                    "related": {
                        "href": "http://example.com/articles/1/author",
                        "meta": {"count": 10}
                    }
                }
            }"#,
        )
        .unwrap();
        let links = doc.document().links().unwrap();
        assert_eq!(
            links.get("self").unwrap().href.as_deref(),
            Some("http://example.com/articles")
        );
        let related = links.get("related").unwrap();
        assert_eq!(
            related.href.as_deref(),
            Some("http://example.com/articles/1/author")
        );
        assert_eq!(
            related.meta.as_ref().unwrap().get("count"),
            Some(&json!(10))
        );
    }

    #[test]
    fn null_data_member_classifies_as_null_document() {
        let doc = parse_document(r#"{"data": null}"#).unwrap();
        assert_eq!(doc.document().document_kind(), DocumentKind::NullDocument);
    }

    #[test]
    fn empty_collection_classifies_as_empty_document() {
        let doc = parse_document(r#"{"data": []}"#).unwrap();
        assert_eq!(doc.document().document_kind(), DocumentKind::EmptyDocument);
    }

    #[test]
    fn identifier_collection_document() {
        let doc = parse_document(
            r#"{"data": [
                {"type": "comments", "id": "5"},
                {"type": "comments", "id": "12"}
            ]}"#,
        )
        .unwrap();
        let document = doc.document();
        assert_eq!(
            document.document_kind(),
            DocumentKind::ResourceIdentifierCollectionDocument
        );
        assert_eq!(document.data_identifier_collection().len(), 2);
    }

    #[test]
    fn errors_document_round_trips_diagnostics() {
        let doc = parse_document(
            r#"{"errors": [
                {
                    "status": "404",
                    "title": "not found",
                    "detail": "no article 99",
                    "source": {"pointer": "/data"}
                }
            ]}"#,
        )
        .unwrap();
        let document = doc.document();
        assert_eq!(document.document_kind(), DocumentKind::ErrorsDocument);
        let errors = document.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title, "not found");
        assert_eq!(errors[0].source, "/data");
    }

    #[test]
    fn whole_document_null_is_rejected_at_entry() {
        let err = parse_document("null").unwrap_err();
        let errors = err.document_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].detail.contains("found null"));
    }

    #[test]
    #[should_panic(expected = "non-scalar token")]
    fn non_scalar_leaf_is_a_converter_defect() {
        let _ = scalar_from_json(&json!({"not": "a scalar"}));
    }
}
