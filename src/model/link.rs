//! Link metadata: declared link rels plus the accessor pair for the
//! domain property storing received links.

use std::any::Any;

use crate::api::Links;
use crate::error::{Error, Result};

/// One declared link rel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    rel: String,
}

impl LinkInfo {
    pub fn new(rel: &str) -> Self {
        Self { rel: rel.to_owned() }
    }

    pub fn rel(&self) -> &str {
        &self.rel
    }
}

type LinksGetter = Box<dyn Fn(&dyn Any) -> Option<Links> + Send + Sync>;
type LinksSetter = Box<dyn Fn(&mut dyn Any, Links) + Send + Sync>;

/// All link metadata of one resource type.
pub struct LinksInfo {
    declaring: &'static str,
    links: Vec<LinkInfo>,
    getter: Option<LinksGetter>,
    setter: Option<LinksSetter>,
}

impl LinksInfo {
    pub(crate) fn new(declaring: &'static str) -> Self {
        Self {
            declaring,
            links: Vec::new(),
            getter: None,
            setter: None,
        }
    }

    pub(crate) fn push(&mut self, info: LinkInfo) {
        self.links.push(info);
    }

    pub(crate) fn bind_accessors<T: Any>(
        &mut self,
        get: impl Fn(&T) -> Option<Links> + Send + Sync + 'static,
        set: impl Fn(&mut T, Links) + Send + Sync + 'static,
    ) {
        let declaring = self.declaring;
        self.getter = Some(Box::new(move |obj| {
            let Some(target) = obj.downcast_ref::<T>() else {
                panic!("links accessor of `{declaring}` received another type");
            };
            get(target)
        }));
        self.setter = Some(Box::new(move |obj, value| {
            let Some(target) = obj.downcast_mut::<T>() else {
                panic!("links accessor of `{declaring}` received another type");
            };
            set(target, value);
        }));
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkInfo> {
        self.links.iter()
    }

    pub fn try_get(&self, rel: &str) -> Option<&LinkInfo> {
        self.links.iter().find(|l| l.rel == rel)
    }

    pub fn get(&self, rel: &str) -> Result<&LinkInfo> {
        self.try_get(rel).ok_or_else(|| Error::MemberMissing {
            owner: self.declaring.to_owned(),
            what: "link",
            name: rel.to_owned(),
        })
    }

    pub fn get_clr(&self, obj: &dyn Any) -> Result<Option<Links>> {
        match &self.getter {
            Some(getter) => Ok(getter(obj)),
            None => Err(Error::MetadataMissing {
                owner: self.declaring.to_owned(),
                what: "links accessor",
            }),
        }
    }

    /// Best-effort store; silently does nothing without a setter.
    pub fn set_clr(&self, obj: &mut dyn Any, value: Links) {
        if let Some(setter) = &self.setter {
            setter(obj, value);
        }
    }
}
