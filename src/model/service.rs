//! The aggregate service model: every registered complex and resource
//! type plus the precomputed lookup maps.
//!
//! Two states: raw (lists only) and initialized (maps built, nested
//! complex types wired). The transition runs once, synchronously, in
//! `build`; `reinitialize` is the explicit re-entry hook for a model
//! reassembled from its flat lists. After initialization the model is
//! immutable and safe to read from many threads.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};

use super::{ComplexType, ResourceType};

/// All registered metadata, with O(1) lookup by CLR type or API name.
pub struct ServiceModel {
    complex_types: Vec<ComplexType>,
    resource_types: Vec<ResourceType>,
    by_clr_complex: HashMap<TypeId, usize>,
    by_clr_resource: HashMap<TypeId, usize>,
    by_api_resource: HashMap<String, usize>,
    initialized: bool,
}

impl fmt::Debug for ServiceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceModel")
            .field("complex_types", &self.complex_types.len())
            .field("resource_types", &self.resource_types.len())
            .field("by_clr_complex", &self.by_clr_complex)
            .field("by_clr_resource", &self.by_clr_resource)
            .field("by_api_resource", &self.by_api_resource)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Accumulates registrations, then builds an initialized model.
#[derive(Default)]
pub struct ServiceModelBuilder {
    complex_types: Vec<ComplexType>,
    resource_types: Vec<ResourceType>,
}

impl ServiceModelBuilder {
    pub fn complex_type(mut self, complex_type: ComplexType) -> Self {
        self.complex_types.push(complex_type);
        self
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_types.push(resource_type);
        self
    }

    pub fn build(self) -> Result<ServiceModel> {
        let mut model = ServiceModel {
            complex_types: self.complex_types,
            resource_types: self.resource_types,
            by_clr_complex: HashMap::new(),
            by_clr_resource: HashMap::new(),
            by_api_resource: HashMap::new(),
            initialized: false,
        };
        model.initialize()?;
        Ok(model)
    }
}

impl ServiceModel {
    pub fn builder() -> ServiceModelBuilder {
        ServiceModelBuilder::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Rebuild lookup maps and re-wire nested complex types.
    ///
    /// The maps are derived state; a model reassembled from its flat
    /// type lists must pass through here before first use. Must not
    /// run while other threads are reading the model.
    pub fn reinitialize(&mut self) -> Result<()> {
        self.initialize()
    }

    fn initialize(&mut self) -> Result<()> {
        self.by_clr_complex.clear();
        self.by_clr_resource.clear();
        self.by_api_resource.clear();

        for (index, complex_type) in self.complex_types.iter().enumerate() {
            let previous = self.by_clr_complex.insert(complex_type.clr_type(), index);
            if previous.is_some() {
                return Err(Error::Model {
                    detail: format!(
                        "complex type `{}` registered more than once",
                        complex_type.clr_type_name()
                    ),
                });
            }
        }
        for (index, resource_type) in self.resource_types.iter().enumerate() {
            let previous = self.by_clr_resource.insert(resource_type.clr_type(), index);
            if previous.is_some() {
                return Err(Error::Model {
                    detail: format!(
                        "resource type `{}` registered more than once",
                        resource_type.clr_type_name()
                    ),
                });
            }
            let previous = self
                .by_api_resource
                .insert(resource_type.api_type().to_owned(), index);
            if previous.is_some() {
                return Err(Error::Model {
                    detail: format!(
                        "API type `{}` registered more than once",
                        resource_type.api_type()
                    ),
                });
            }
        }

        // nested complex-type resolution, transitively: every
        // attribute that references a complex type gets its index
        // wired before first use
        let registry = self.by_clr_complex.clone();
        for complex_type in &mut self.complex_types {
            complex_type.initialize(&registry)?;
        }
        for resource_type in &mut self.resource_types {
            resource_type.initialize(&registry)?;
        }

        self.initialized = true;
        debug!(
            complex_types = self.complex_types.len(),
            resource_types = self.resource_types.len(),
            "service model initialized"
        );
        Ok(())
    }

    // ------------------------------ Lookup -------------------------------- //

    pub fn complex_types(&self) -> &[ComplexType] {
        &self.complex_types
    }

    pub fn resource_types(&self) -> &[ResourceType] {
        &self.resource_types
    }

    pub(crate) fn complex_type_at(&self, index: usize) -> &ComplexType {
        &self.complex_types[index]
    }

    pub fn try_complex_type_of(&self, clr_type: TypeId) -> Option<&ComplexType> {
        self.by_clr_complex
            .get(&clr_type)
            .map(|&index| &self.complex_types[index])
    }

    pub fn complex_type_of(&self, clr_type: TypeId) -> Result<&ComplexType> {
        self.try_complex_type_of(clr_type)
            .ok_or_else(|| Error::ModelLookup {
                kind: "complex type",
                key: format!("{clr_type:?}"),
            })
    }

    pub fn try_complex_type<T: Any>(&self) -> Option<&ComplexType> {
        self.try_complex_type_of(TypeId::of::<T>())
    }

    pub fn complex_type<T: Any>(&self) -> Result<&ComplexType> {
        self.try_complex_type::<T>().ok_or_else(|| Error::ModelLookup {
            kind: "complex type",
            key: format!("CLR type `{}`", type_name::<T>()),
        })
    }

    pub fn try_resource_type_of(&self, clr_type: TypeId) -> Option<&ResourceType> {
        self.by_clr_resource
            .get(&clr_type)
            .map(|&index| &self.resource_types[index])
    }

    pub fn resource_type_of(&self, clr_type: TypeId) -> Result<&ResourceType> {
        self.try_resource_type_of(clr_type)
            .ok_or_else(|| Error::ModelLookup {
                kind: "resource type",
                key: format!("{clr_type:?}"),
            })
    }

    pub fn try_resource_type<T: Any>(&self) -> Option<&ResourceType> {
        self.try_resource_type_of(TypeId::of::<T>())
    }

    pub fn resource_type<T: Any>(&self) -> Result<&ResourceType> {
        self.try_resource_type::<T>().ok_or_else(|| Error::ModelLookup {
            kind: "resource type",
            key: format!("CLR type `{}`", type_name::<T>()),
        })
    }

    pub fn try_resource_type_by_api_type(&self, api_type: &str) -> Option<&ResourceType> {
        self.by_api_resource
            .get(api_type)
            .map(|&index| &self.resource_types[index])
    }

    pub fn resource_type_by_api_type(&self, api_type: &str) -> Result<&ResourceType> {
        self.try_resource_type_by_api_type(api_type)
            .ok_or_else(|| Error::ModelLookup {
                kind: "resource type",
                key: format!("API type `{api_type}`"),
            })
    }

    /// The single designated home resource type. Zero or several
    /// designations is a model-configuration error.
    pub fn home_resource_type(&self) -> Result<&ResourceType> {
        let mut homes = self.resource_types.iter().filter(|rt| rt.is_home());
        match (homes.next(), homes.next()) {
            (Some(home), None) => Ok(home),
            (None, _) => Err(Error::Model {
                detail: "expected exactly one home resource type, found none".to_owned(),
            }),
            (Some(_), Some(_)) => Err(Error::Model {
                detail: "expected exactly one home resource type, found several".to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Relationships;
    use crate::coerce::ScalarValue;
    use crate::model::{AttributeKind, ComplexType, ResourceType};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Address {
        street: String,
        city: String,
    }

    #[derive(Debug, Default)]
    struct Person {
        id: i64,
        name: String,
        address: Option<Address>,
        relationships: Option<Relationships>,
    }

    #[derive(Debug, Default)]
    struct Article {
        id: String,
        title: String,
    }

    fn person_type() -> ResourceType {
        ResourceType::builder::<Person>("people")
            .identity("id", |p| p.id, |p, id| p.id = id)
            .attribute("name", "name", |p: &Person| p.name.clone(), |p, v| p.name = v)
            .complex_attribute(
                "address",
                "address",
                |p: &Person| p.address.clone(),
                |p, v| p.address = v,
            )
            .to_many::<Article>("articles")
            .relationships(|p| p.relationships.clone(), |p, v| p.relationships = Some(v))
            .home()
            .build()
    }

    fn article_type() -> ResourceType {
        ResourceType::builder::<Article>("articles")
            .identity("id", |a| a.id.clone(), |a, id| a.id = id)
            .attribute("title", "title", |a: &Article| a.title.clone(), |a, v| a.title = v)
            .build()
    }

    fn address_type() -> ComplexType {
        ComplexType::builder::<Address>()
            .attribute("street", "street", |a: &Address| a.street.clone(), |a, v| a.street = v)
            .attribute("city", "city", |a: &Address| a.city.clone(), |a, v| a.city = v)
            .build()
    }

    fn model() -> ServiceModel {
        ServiceModel::builder()
            .complex_type(address_type())
            .resource_type(person_type())
            .resource_type(article_type())
            .build()
            .unwrap()
    }

    #[test]
    fn lookups_by_clr_type_and_api_name_agree() {
        let model = model();
        for resource_type in model.resource_types() {
            let by_clr = model.resource_type_of(resource_type.clr_type()).unwrap();
            let by_api = model
                .resource_type_by_api_type(resource_type.api_type())
                .unwrap();
            assert!(std::ptr::eq(by_clr, by_api));
            assert!(std::ptr::eq(by_clr, resource_type));
        }
    }

    #[test]
    fn missing_lookups_throw_and_try_variants_do_not() {
        #[derive(Default)]
        struct Unregistered;
        let model = model();
        assert!(model.resource_type::<Unregistered>().is_err());
        assert!(model.try_resource_type::<Unregistered>().is_none());
        assert!(model.resource_type_by_api_type("nope").is_err());
        assert!(model.try_resource_type_by_api_type("nope").is_none());
    }

    #[test]
    fn nested_complex_types_are_wired_on_initialize() {
        let model = model();
        let person = model.resource_type::<Person>().unwrap();
        let address = person.attribute("address").unwrap();
        assert!(matches!(address.kind(), AttributeKind::Complex(_)));
        assert!(address.complex_index().is_some());
    }

    #[test]
    fn dangling_complex_reference_fails_initialization() {
        let err = ServiceModel::builder()
            .resource_type(person_type())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unregistered complex type"));
    }

    #[test]
    fn duplicate_api_type_fails_initialization() {
        #[derive(Default)]
        struct Other {
            id: i64,
        }
        let duplicate = ResourceType::builder::<Other>("articles")
            .identity("id", |o: &Other| o.id, |o, id| o.id = id)
            .build();
        let err = ServiceModel::builder()
            .resource_type(article_type())
            .resource_type(duplicate)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("`articles`"));
    }

    #[test]
    fn home_resource_type_is_strictly_singular() {
        let model = model();
        assert_eq!(model.home_resource_type().unwrap().api_type(), "people");

        let none = ServiceModel::builder()
            .resource_type(article_type())
            .build()
            .unwrap();
        assert!(none.home_resource_type().is_err());

        let second_home = ResourceType::builder::<Article>("articles")
            .identity("id", |a: &Article| a.id.clone(), |a, id| a.id = id)
            .home()
            .build();
        let both = ServiceModel::builder()
            .complex_type(address_type())
            .resource_type(person_type())
            .resource_type(second_home)
            .build()
            .unwrap();
        assert!(both.home_resource_type().is_err());
    }

    #[test]
    fn reading_missing_metadata_errs_but_setting_noops() {
        let model = model();
        let article_rt = model.resource_type::<Article>().unwrap();
        let mut article = Article::default();

        // reads demand the schema be wired
        assert!(article_rt.clr_relationships(&article).is_err());
        assert!(article_rt.clr_links(&article).is_err());
        assert!(article_rt.clr_meta(&article).is_err());
        assert!(article_rt.relationship_info("author").is_err());
        assert!(article_rt.try_relationship_info("author").is_none());

        // sets are best-effort
        article_rt.set_clr_relationships(&mut article, Relationships::new());
        article_rt.set_clr_links(&mut article, crate::api::Links::new());
        article_rt.set_clr_meta(&mut article, crate::api::Meta::new());
    }

    #[test]
    fn relationship_metadata_lookup() {
        let model = model();
        let person_rt = model.resource_type::<Person>().unwrap();
        let articles = person_rt.relationship_info("articles").unwrap();
        assert_eq!(
            articles.cardinality(),
            crate::model::RelationshipCardinality::ToMany
        );
        assert_eq!(articles.related_clr_type(), TypeId::of::<Article>());
        let err = person_rt.relationship_info("missing").unwrap_err();
        assert!(err.to_string().contains("`missing`"));
    }

    #[test]
    fn id_assignment_round_trips() {
        let model = model();
        let person_rt = model.resource_type::<Person>().unwrap();
        let mut person = Person::default();
        assert!(person_rt.is_clr_id_null(&person));
        let id = person_rt.identity().to_clr_id("42").unwrap();
        assert!(person_rt.set_clr_id(&mut person, &id));
        assert_eq!(person.id, 42);
        assert!(!person_rt.is_clr_id_null(&person));
        assert_eq!(person_rt.api_id(&person).as_deref(), Some("42"));
        assert_eq!(
            person_rt.clr_id(&person),
            Some(ScalarValue::Int(42))
        );
    }

    #[test]
    fn unassigned_id_yields_no_identifier() {
        let model = model();
        let person_rt = model.resource_type::<Person>().unwrap();
        let person = Person::default();
        assert_eq!(person_rt.api_resource_identifier(&person), None);
        let person = Person {
            id: 7,
            ..Person::default()
        };
        assert_eq!(
            person_rt.api_resource_identifier(&person),
            Some(crate::api::ResourceIdentifier::new("people", "7"))
        );
    }

    #[test]
    fn reinitialize_rebuilds_lookup_state() {
        let mut model = model();
        assert!(model.is_initialized());
        model.reinitialize().unwrap();
        assert!(model.is_initialized());
        assert!(model.resource_type::<Person>().is_ok());
    }
}
