//! Relationship metadata: the declared rels of a resource type plus
//! the accessor pair for the domain property that stores received
//! relationship values.

use std::any::{type_name, Any, TypeId};

use crate::api::Relationships;
use crate::error::{Error, Result};

/// To-one or to-many.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationshipCardinality {
    ToOne,
    ToMany,
}

/// One declared relationship: rel name, related CLR type, cardinality.
#[derive(Clone, Debug)]
pub struct RelationshipInfo {
    rel: String,
    related_clr_type: TypeId,
    related_clr_name: &'static str,
    cardinality: RelationshipCardinality,
}

impl RelationshipInfo {
    pub fn new<R: Any>(rel: &str, cardinality: RelationshipCardinality) -> Self {
        Self {
            rel: rel.to_owned(),
            related_clr_type: TypeId::of::<R>(),
            related_clr_name: type_name::<R>(),
            cardinality,
        }
    }

    pub fn rel(&self) -> &str {
        &self.rel
    }

    pub fn related_clr_type(&self) -> TypeId {
        self.related_clr_type
    }

    pub fn related_clr_name(&self) -> &'static str {
        self.related_clr_name
    }

    pub fn cardinality(&self) -> RelationshipCardinality {
        self.cardinality
    }
}

type RelationshipsGetter = Box<dyn Fn(&dyn Any) -> Option<Relationships> + Send + Sync>;
type RelationshipsSetter = Box<dyn Fn(&mut dyn Any, Relationships) + Send + Sync>;

/// All relationship metadata of one resource type.
pub struct RelationshipsInfo {
    declaring: &'static str,
    relationships: Vec<RelationshipInfo>,
    getter: Option<RelationshipsGetter>,
    setter: Option<RelationshipsSetter>,
}

impl RelationshipsInfo {
    pub(crate) fn new(declaring: &'static str) -> Self {
        Self {
            declaring,
            relationships: Vec::new(),
            getter: None,
            setter: None,
        }
    }

    pub(crate) fn push(&mut self, info: RelationshipInfo) {
        self.relationships.push(info);
    }

    pub(crate) fn bind_accessors<T: Any>(
        &mut self,
        get: impl Fn(&T) -> Option<Relationships> + Send + Sync + 'static,
        set: impl Fn(&mut T, Relationships) + Send + Sync + 'static,
    ) {
        let declaring = self.declaring;
        self.getter = Some(Box::new(move |obj| {
            let Some(target) = obj.downcast_ref::<T>() else {
                panic!("relationships accessor of `{declaring}` received another type");
            };
            get(target)
        }));
        self.setter = Some(Box::new(move |obj, value| {
            let Some(target) = obj.downcast_mut::<T>() else {
                panic!("relationships accessor of `{declaring}` received another type");
            };
            set(target, value);
        }));
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationshipInfo> {
        self.relationships.iter()
    }

    pub fn try_get(&self, rel: &str) -> Option<&RelationshipInfo> {
        self.relationships.iter().find(|r| r.rel == rel)
    }

    pub fn get(&self, rel: &str) -> Result<&RelationshipInfo> {
        self.try_get(rel).ok_or_else(|| Error::MemberMissing {
            owner: self.declaring.to_owned(),
            what: "relationship",
            name: rel.to_owned(),
        })
    }

    /// Read the stored relationships of a domain object; requires the
    /// accessor to be wired.
    pub fn get_clr(&self, obj: &dyn Any) -> Result<Option<Relationships>> {
        match &self.getter {
            Some(getter) => Ok(getter(obj)),
            None => Err(Error::MetadataMissing {
                owner: self.declaring.to_owned(),
                what: "relationships accessor",
            }),
        }
    }

    /// Best-effort store; silently does nothing without a setter.
    pub fn set_clr(&self, obj: &mut dyn Any, value: Relationships) {
        if let Some(setter) = &self.setter {
            setter(obj, value);
        }
    }
}
