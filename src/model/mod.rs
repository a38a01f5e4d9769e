//! The service model: per-domain-type metadata compiled once and read
//! for the lifetime of the process.
//!
//! Each registered type carries accessor closures (built by the typed
//! builders, invoked through `&dyn Any`) and its attribute set;
//! resource types additionally carry identity, relationship, link,
//! and meta metadata.
//! Reading through missing metadata is an error with the owner and the
//! requested key in the message; the `set_clr_*` family is best-effort
//! and silently does nothing when the backing metadata or its setter
//! is absent.

mod attribute;
mod identity;
mod link;
mod relationship;
mod service;

pub use attribute::{AttributeInfo, AttributeKind, AttributesInfo, ClrValue};
pub use identity::ResourceIdentityInfo;
pub use link::{LinkInfo, LinksInfo};
pub use relationship::{RelationshipCardinality, RelationshipInfo, RelationshipsInfo};
pub use service::{ServiceModel, ServiceModelBuilder};

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::api::{Links, Meta, Relationships, ResourceIdentifier};
use crate::coerce::{ApiScalar, ScalarValue};
use crate::error::{Error, Result};

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

type Factory = Box<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

type MetaGetter = Box<dyn Fn(&dyn Any) -> Option<Meta> + Send + Sync>;
type MetaSetter = Box<dyn Fn(&mut dyn Any, Meta) + Send + Sync>;

/// Accessor pair for a domain property holding open `meta` content.
pub struct MetaInfo {
    getter: MetaGetter,
    setter: Option<MetaSetter>,
}

impl MetaInfo {
    fn new<T: Any>(
        declaring: &'static str,
        get: impl Fn(&T) -> Option<Meta> + Send + Sync + 'static,
        set: impl Fn(&mut T, Meta) + Send + Sync + 'static,
    ) -> Self {
        let getter: MetaGetter = Box::new(move |obj| {
            let Some(target) = obj.downcast_ref::<T>() else {
                panic!("meta accessor of `{declaring}` received another type");
            };
            get(target)
        });
        let setter: MetaSetter = Box::new(move |obj, value| {
            let Some(target) = obj.downcast_mut::<T>() else {
                panic!("meta accessor of `{declaring}` received another type");
            };
            set(target, value);
        });
        Self {
            getter,
            setter: Some(setter),
        }
    }

    pub fn get_clr(&self, obj: &dyn Any) -> Option<Meta> {
        (self.getter)(obj)
    }

    pub fn set_clr(&self, obj: &mut dyn Any, value: Meta) {
        if let Some(setter) = &self.setter {
            setter(obj, value);
        }
    }
}

// ------------------------------ Complex type ------------------------------ //

/// Metadata for a nested (non-resource) domain type: attributes only.
pub struct ComplexType {
    clr_type: TypeId,
    clr_type_name: &'static str,
    factory: Factory,
    attributes: AttributesInfo,
}

impl ComplexType {
    pub fn builder<T>() -> ComplexTypeBuilder<T>
    where
        T: Any + Send + Sync + Default,
    {
        ComplexTypeBuilder {
            attributes: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn clr_type(&self) -> TypeId {
        self.clr_type
    }

    pub fn clr_type_name(&self) -> &'static str {
        self.clr_type_name
    }

    pub fn create_clr_object(&self) -> Box<dyn Any + Send + Sync> {
        (self.factory)()
    }

    pub fn attributes(&self) -> &AttributesInfo {
        &self.attributes
    }

    pub fn attribute(&self, api_name: &str) -> Result<&AttributeInfo> {
        self.attributes.by_api_name(api_name)
    }

    pub fn try_attribute(&self, api_name: &str) -> Option<&AttributeInfo> {
        self.attributes.try_by_api_name(api_name)
    }

    pub(crate) fn initialize(&mut self, registry: &HashMap<TypeId, usize>) -> Result<()> {
        self.attributes.initialize(registry)
    }
}

/// Typed builder for [`ComplexType`].
pub struct ComplexTypeBuilder<T> {
    attributes: Vec<AttributeInfo>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComplexTypeBuilder<T>
where
    T: Any + Send + Sync + Default,
{
    pub fn attribute<V>(
        mut self,
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: ApiScalar + 'static,
    {
        self.attributes
            .push(AttributeInfo::scalar(clr_name, api_name, get, set));
        self
    }

    pub fn complex_attribute<C>(
        mut self,
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> Option<C> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<C>) + Send + Sync + 'static,
    ) -> Self
    where
        C: Any + Send + Sync,
    {
        self.attributes
            .push(AttributeInfo::complex(clr_name, api_name, get, set));
        self
    }

    pub fn build(self) -> ComplexType {
        ComplexType {
            clr_type: TypeId::of::<T>(),
            clr_type_name: type_name::<T>(),
            factory: Box::new(|| Box::new(T::default())),
            attributes: AttributesInfo::new(type_name::<T>(), self.attributes),
        }
    }
}

// ------------------------------ Resource type ----------------------------- //

/// Metadata for one addressable resource type.
pub struct ResourceType {
    clr_type: TypeId,
    clr_type_name: &'static str,
    owner: String,
    factory: Factory,
    identity: ResourceIdentityInfo,
    attributes: AttributesInfo,
    relationships: Option<RelationshipsInfo>,
    links: Option<LinksInfo>,
    meta: Option<MetaInfo>,
    home: bool,
}

impl ResourceType {
    pub fn builder<T>(api_type: &str) -> ResourceTypeBuilder<T>
    where
        T: Any + Send + Sync + Default,
    {
        ResourceTypeBuilder {
            api_type: api_type.to_owned(),
            identity: None,
            attributes: Vec::new(),
            relationships: None,
            links: None,
            meta: None,
            home: false,
            _marker: PhantomData,
        }
    }

    pub fn clr_type(&self) -> TypeId {
        self.clr_type
    }

    pub fn clr_type_name(&self) -> &'static str {
        self.clr_type_name
    }

    pub fn api_type(&self) -> &str {
        self.identity.api_type()
    }

    pub fn is_home(&self) -> bool {
        self.home
    }

    pub fn create_clr_object(&self) -> Box<dyn Any + Send + Sync> {
        (self.factory)()
    }

    pub fn identity(&self) -> &ResourceIdentityInfo {
        &self.identity
    }

    pub fn attributes(&self) -> &AttributesInfo {
        &self.attributes
    }

    // --- identity operations ---

    /// The wire id of a domain object; `None` when the id is null.
    pub fn api_id(&self, obj: &dyn Any) -> Option<String> {
        let id = self.identity.clr_id(obj)?;
        Some(self.identity.to_api_id(&id))
    }

    /// `type` + `id`, or `None` when the id is unassigned or blank.
    pub fn api_resource_identifier(&self, obj: &dyn Any) -> Option<ResourceIdentifier> {
        let id = self.identity.clr_id(obj);
        if self.identity.is_clr_id_null(id.as_ref()) {
            return None;
        }
        let api_id = self.identity.to_api_id(&id.expect("non-null id"));
        if api_id.trim().is_empty() {
            return None;
        }
        Some(ResourceIdentifier::new(self.api_type(), api_id))
    }

    pub fn clr_id(&self, obj: &dyn Any) -> Option<ScalarValue> {
        self.identity.clr_id(obj)
    }

    /// Best-effort id assignment.
    pub fn set_clr_id(&self, obj: &mut dyn Any, id: &ScalarValue) -> bool {
        self.identity.set_clr_id(obj, id)
    }

    pub fn is_clr_id_null(&self, obj: &dyn Any) -> bool {
        let id = self.identity.clr_id(obj);
        self.identity.is_clr_id_null(id.as_ref())
    }

    // --- attribute operations ---

    pub fn attribute(&self, api_name: &str) -> Result<&AttributeInfo> {
        self.attributes.by_api_name(api_name)
    }

    pub fn try_attribute(&self, api_name: &str) -> Option<&AttributeInfo> {
        self.attributes.try_by_api_name(api_name)
    }

    pub fn attribute_by_clr_name(&self, clr_name: &str) -> Result<&AttributeInfo> {
        self.attributes.by_clr_name(clr_name)
    }

    pub fn try_attribute_by_clr_name(&self, clr_name: &str) -> Option<&AttributeInfo> {
        self.attributes.try_by_clr_name(clr_name)
    }

    // --- relationship operations ---

    pub fn relationship_info(&self, rel: &str) -> Result<&RelationshipInfo> {
        self.relationships_metadata()?.get(rel)
    }

    pub fn try_relationship_info(&self, rel: &str) -> Option<&RelationshipInfo> {
        self.relationships.as_ref()?.try_get(rel)
    }

    pub fn clr_relationships(&self, obj: &dyn Any) -> Result<Option<Relationships>> {
        self.relationships_metadata()?.get_clr(obj)
    }

    /// Best-effort store; no relationships metadata means no effect.
    pub fn set_clr_relationships(&self, obj: &mut dyn Any, value: Relationships) {
        if let Some(info) = &self.relationships {
            info.set_clr(obj, value);
        }
    }

    fn relationships_metadata(&self) -> Result<&RelationshipsInfo> {
        self.relationships.as_ref().ok_or_else(|| Error::MetadataMissing {
            owner: self.owner.clone(),
            what: "relationships",
        })
    }

    // --- link operations ---

    pub fn link_info(&self, rel: &str) -> Result<&LinkInfo> {
        self.links_metadata()?.get(rel)
    }

    pub fn try_link_info(&self, rel: &str) -> Option<&LinkInfo> {
        self.links.as_ref()?.try_get(rel)
    }

    pub fn clr_links(&self, obj: &dyn Any) -> Result<Option<Links>> {
        self.links_metadata()?.get_clr(obj)
    }

    /// Best-effort store; no links metadata means no effect.
    pub fn set_clr_links(&self, obj: &mut dyn Any, value: Links) {
        if let Some(info) = &self.links {
            info.set_clr(obj, value);
        }
    }

    fn links_metadata(&self) -> Result<&LinksInfo> {
        self.links.as_ref().ok_or_else(|| Error::MetadataMissing {
            owner: self.owner.clone(),
            what: "links",
        })
    }

    // --- meta operations ---

    pub fn clr_meta(&self, obj: &dyn Any) -> Result<Option<Meta>> {
        match &self.meta {
            Some(info) => Ok(info.get_clr(obj)),
            None => Err(Error::MetadataMissing {
                owner: self.owner.clone(),
                what: "meta",
            }),
        }
    }

    /// Best-effort store; no meta metadata means no effect.
    pub fn set_clr_meta(&self, obj: &mut dyn Any, value: Meta) {
        if let Some(info) = &self.meta {
            info.set_clr(obj, value);
        }
    }

    pub(crate) fn initialize(&mut self, registry: &HashMap<TypeId, usize>) -> Result<()> {
        self.attributes.initialize(registry)
    }
}

/// Typed builder for [`ResourceType`].
pub struct ResourceTypeBuilder<T> {
    api_type: String,
    identity: Option<ResourceIdentityInfo>,
    attributes: Vec<AttributeInfo>,
    relationships: Option<RelationshipsInfo>,
    links: Option<LinksInfo>,
    meta: Option<MetaInfo>,
    home: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceTypeBuilder<T>
where
    T: Any + Send + Sync + Default,
{
    /// Declare the id property. Required before `build`.
    pub fn identity<V>(
        mut self,
        clr_name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: ApiScalar + 'static,
    {
        self.identity = Some(ResourceIdentityInfo::new(&self.api_type, clr_name, get, set));
        self
    }

    pub fn attribute<V>(
        mut self,
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: ApiScalar + 'static,
    {
        self.attributes
            .push(AttributeInfo::scalar(clr_name, api_name, get, set));
        self
    }

    pub fn scalar_list_attribute<V>(
        mut self,
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> Vec<V> + Send + Sync + 'static,
        set: impl Fn(&mut T, Vec<V>) + Send + Sync + 'static,
    ) -> Self
    where
        V: ApiScalar + 'static,
    {
        self.attributes
            .push(AttributeInfo::scalar_list(clr_name, api_name, get, set));
        self
    }

    pub fn complex_attribute<C>(
        mut self,
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> Option<C> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<C>) + Send + Sync + 'static,
    ) -> Self
    where
        C: Any + Send + Sync,
    {
        self.attributes
            .push(AttributeInfo::complex(clr_name, api_name, get, set));
        self
    }

    /// Declare a to-one relationship to `R`.
    pub fn to_one<R: Any>(mut self, rel: &str) -> Self {
        self.relationships_entry()
            .push(RelationshipInfo::new::<R>(rel, RelationshipCardinality::ToOne));
        self
    }

    /// Declare a to-many relationship to `R`.
    pub fn to_many<R: Any>(mut self, rel: &str) -> Self {
        self.relationships_entry()
            .push(RelationshipInfo::new::<R>(rel, RelationshipCardinality::ToMany));
        self
    }

    /// Wire the domain property that stores received relationships.
    pub fn relationships(
        mut self,
        get: impl Fn(&T) -> Option<Relationships> + Send + Sync + 'static,
        set: impl Fn(&mut T, Relationships) + Send + Sync + 'static,
    ) -> Self {
        self.relationships_entry().bind_accessors(get, set);
        self
    }

    fn relationships_entry(&mut self) -> &mut RelationshipsInfo {
        self.relationships
            .get_or_insert_with(|| RelationshipsInfo::new(type_name::<T>()))
    }

    /// Declare a link rel.
    pub fn link(mut self, rel: &str) -> Self {
        self.links_entry().push(LinkInfo::new(rel));
        self
    }

    /// Wire the domain property that stores received links.
    pub fn links(
        mut self,
        get: impl Fn(&T) -> Option<Links> + Send + Sync + 'static,
        set: impl Fn(&mut T, Links) + Send + Sync + 'static,
    ) -> Self {
        self.links_entry().bind_accessors(get, set);
        self
    }

    fn links_entry(&mut self) -> &mut LinksInfo {
        self.links.get_or_insert_with(|| LinksInfo::new(type_name::<T>()))
    }

    /// Wire the domain property that stores received meta.
    pub fn meta(
        mut self,
        get: impl Fn(&T) -> Option<Meta> + Send + Sync + 'static,
        set: impl Fn(&mut T, Meta) + Send + Sync + 'static,
    ) -> Self {
        self.meta = Some(MetaInfo::new(type_name::<T>(), get, set));
        self
    }

    /// Designate this resource type as the model's home type.
    pub fn home(mut self) -> Self {
        self.home = true;
        self
    }

    /// Finish the type. Identity metadata is required; building
    /// without it is a model-configuration defect.
    pub fn build(self) -> ResourceType {
        let Some(identity) = self.identity else {
            panic!(
                "resource type `{}` ({}) built without identity metadata",
                self.api_type,
                type_name::<T>()
            );
        };
        ResourceType {
            clr_type: TypeId::of::<T>(),
            clr_type_name: type_name::<T>(),
            owner: format!("ResourceType<{}>", short_type_name::<T>()),
            factory: Box::new(|| Box::new(T::default())),
            identity,
            attributes: AttributesInfo::new(type_name::<T>(), self.attributes),
            relationships: self.relationships,
            links: self.links,
            meta: self.meta,
            home: self.home,
        }
    }
}
