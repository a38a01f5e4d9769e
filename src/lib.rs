//! Document object model and type-metadata registry for a JSON
//! hypermedia format (resource-and-relationship graphs with typed
//! members: `type`, `id`, `attributes`, `relationships`, `links`,
//! `meta`).
//!
//! Two subsystems:
//! - The **DOM**: a polymorphic node tree mirroring the wire schema,
//!   with converters in both directions. Parsing enforces the closed
//!   member sets (unknown members are rejected with JSON-pointer
//!   diagnostics, accumulated over the whole attempt); serialization
//!   applies the schema's null-handling policy and link shorthand.
//! - The **service model**: per-domain-type metadata (identity,
//!   attributes, relationships, links, meta) with accessor closures
//!   compiled once at registration and invoked many times, keyed by
//!   `TypeId` and by API type name.
//!
//! Design goals:
//! - Build once, read many: service models are immutable and
//!   shareable after initialization; DOM trees are per-parse and
//!   exclusively owned.
//! - Closed world: every schema shape has a fixed member set; the
//!   converters reject the rest instead of dropping it.
//! - Complete diagnostics: a malformed document surfaces every
//!   problem found, not just the first.

pub mod api;
pub mod bind;
pub mod coerce;
pub mod dom;
pub mod error;
pub mod model;
pub mod node;

pub use api::{
    JsonApiVersion, Link, Linkage, Links, Meta, Relationship, Relationships, ResourceIdentifier,
};
pub use bind::{
    build_resource, build_resource_document, build_resource_identifier, extract_resource,
};
pub use coerce::{ApiScalar, ScalarKind, ScalarValue};
pub use dom::read::{parse_document, document_from_value, ParsedDocument};
pub use dom::write::{
    to_json_string, to_json_string_pretty, write_document, write_json_to, NullValueHandling,
    WriteSettings,
};
pub use dom::{
    ApiMemberKind, DocumentKind, DomData, DomDocument, DomLink, DomLinks, DomObjectKind,
    DomRelationship, DomRelationships, DomResource, DomResourceIdentifier, DomScalar, DomTree,
};
pub use error::{ApiError, Error, Result};
pub use model::{
    AttributeInfo, AttributeKind, AttributesInfo, ClrValue, ComplexType, LinkInfo, LinksInfo,
    MetaInfo, RelationshipCardinality, RelationshipInfo, RelationshipsInfo, ResourceIdentityInfo,
    ResourceType, ServiceModel, ServiceModelBuilder,
};
pub use node::{NodeArena, NodeId};
