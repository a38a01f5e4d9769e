//! Attribute metadata: one entry per declared attribute, carrying the
//! API name, the CLR-side name, and accessor closures built once at
//! registration and invoked many times. The closures are type-erased
//! over `&dyn Any`; the typed constructors guarantee they only ever
//! see the type they were built for.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::coerce::{ApiScalar, ScalarKind, ScalarValue};
use crate::error::{Error, Result};

/// A value moving through attribute accessors.
pub enum ClrValue {
    Null,
    Scalar(ScalarValue),
    /// A nested domain value whose own attributes are described by a
    /// registered complex type.
    Complex(Box<dyn Any + Send + Sync>),
    List(Vec<ClrValue>),
}

impl fmt::Debug for ClrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClrValue::Null => f.write_str("Null"),
            ClrValue::Scalar(v) => write!(f, "Scalar({})", v.format()),
            ClrValue::Complex(_) => f.write_str("Complex(..)"),
            ClrValue::List(items) => f.debug_tuple("List").field(&items.len()).finish(),
        }
    }
}

/// What shape an attribute's value takes on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Scalar(ScalarKind),
    ScalarList(ScalarKind),
    Complex(TypeId),
}

type AttributeGetter = Box<dyn Fn(&dyn Any) -> ClrValue + Send + Sync>;
type AttributeSetter = Box<dyn Fn(&mut dyn Any, ClrValue) -> bool + Send + Sync>;

/// Metadata for one attribute.
pub struct AttributeInfo {
    clr_name: &'static str,
    api_name: String,
    kind: AttributeKind,
    nullable: bool,
    getter: AttributeGetter,
    setter: Option<AttributeSetter>,
    /// Resolved index of the nested complex type, wired during model
    /// initialization.
    complex_index: Option<usize>,
    complex_clr_name: Option<&'static str>,
}

fn bound_to<'a, T>(obj: &'a dyn Any, clr_name: &'static str) -> &'a T
where
    T: Any,
{
    match obj.downcast_ref::<T>() {
        Some(target) => target,
        None => panic!(
            "accessor for `{clr_name}` is bound to {}, received another type",
            type_name::<T>()
        ),
    }
}

fn bound_to_mut<'a, T>(obj: &'a mut dyn Any, clr_name: &'static str) -> &'a mut T
where
    T: Any,
{
    if !obj.is::<T>() {
        panic!(
            "accessor for `{clr_name}` is bound to {}, received another type",
            type_name::<T>()
        );
    }
    obj.downcast_mut::<T>().expect("type checked above")
}

impl AttributeInfo {
    /// A scalar attribute. Kind and nullability come from `V`'s
    /// compile-time facts.
    pub fn scalar<T, V>(
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Any,
        V: ApiScalar + 'static,
    {
        let getter: AttributeGetter = Box::new(move |obj| {
            match get(bound_to::<T>(obj, clr_name)).into_scalar() {
                Some(value) => ClrValue::Scalar(value),
                None => ClrValue::Null,
            }
        });
        let setter: AttributeSetter = Box::new(move |obj, value| {
            let target = bound_to_mut::<T>(obj, clr_name);
            let parsed = match value {
                ClrValue::Null => V::from_null(),
                ClrValue::Scalar(scalar) => V::from_scalar(scalar),
                _ => None,
            };
            match parsed {
                Some(v) => {
                    set(target, v);
                    true
                }
                None => false,
            }
        });
        Self {
            clr_name,
            api_name: api_name.to_owned(),
            kind: AttributeKind::Scalar(V::KIND),
            nullable: V::NULLABLE,
            getter,
            setter: Some(setter),
            complex_index: None,
            complex_clr_name: None,
        }
    }

    /// An attribute holding a homogeneous list of scalars.
    pub fn scalar_list<T, V>(
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> Vec<V> + Send + Sync + 'static,
        set: impl Fn(&mut T, Vec<V>) + Send + Sync + 'static,
    ) -> Self
    where
        T: Any,
        V: ApiScalar + 'static,
    {
        let getter: AttributeGetter = Box::new(move |obj| {
            let items = get(bound_to::<T>(obj, clr_name))
                .into_iter()
                .map(|v| match v.into_scalar() {
                    Some(value) => ClrValue::Scalar(value),
                    None => ClrValue::Null,
                })
                .collect();
            ClrValue::List(items)
        });
        let setter: AttributeSetter = Box::new(move |obj, value| {
            let target = bound_to_mut::<T>(obj, clr_name);
            let ClrValue::List(items) = value else {
                return false;
            };
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                let v = match item {
                    ClrValue::Null => V::from_null(),
                    ClrValue::Scalar(scalar) => V::from_scalar(scalar),
                    _ => None,
                };
                match v {
                    Some(v) => parsed.push(v),
                    None => return false,
                }
            }
            set(target, parsed);
            true
        });
        Self {
            clr_name,
            api_name: api_name.to_owned(),
            kind: AttributeKind::ScalarList(V::KIND),
            nullable: false,
            getter,
            setter: Some(setter),
            complex_index: None,
            complex_clr_name: None,
        }
    }

    /// An attribute whose value is a registered complex type.
    pub fn complex<T, C>(
        clr_name: &'static str,
        api_name: &str,
        get: impl Fn(&T) -> Option<C> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<C>) + Send + Sync + 'static,
    ) -> Self
    where
        T: Any,
        C: Any + Send + Sync,
    {
        let getter: AttributeGetter = Box::new(move |obj| {
            match get(bound_to::<T>(obj, clr_name)) {
                Some(value) => ClrValue::Complex(Box::new(value)),
                None => ClrValue::Null,
            }
        });
        let setter: AttributeSetter = Box::new(move |obj, value| {
            let target = bound_to_mut::<T>(obj, clr_name);
            match value {
                ClrValue::Null => {
                    set(target, None);
                    true
                }
                ClrValue::Complex(boxed) => match boxed.downcast::<C>() {
                    Ok(nested) => {
                        set(target, Some(*nested));
                        true
                    }
                    Err(_) => false,
                },
                _ => false,
            }
        });
        Self {
            clr_name,
            api_name: api_name.to_owned(),
            kind: AttributeKind::Complex(TypeId::of::<C>()),
            nullable: true,
            getter,
            setter: Some(setter),
            complex_index: None,
            complex_clr_name: Some(type_name::<C>()),
        }
    }

    pub fn clr_name(&self) -> &'static str {
        self.clr_name
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn get(&self, obj: &dyn Any) -> ClrValue {
        (self.getter)(obj)
    }

    /// Best-effort set: `false` when there is no setter or the value
    /// does not fit.
    pub fn set(&self, obj: &mut dyn Any, value: ClrValue) -> bool {
        match &self.setter {
            Some(setter) => setter(obj, value),
            None => false,
        }
    }

    pub(crate) fn complex_index(&self) -> Option<usize> {
        self.complex_index
    }
}

/// The ordered attribute set of one registered type.
pub struct AttributesInfo {
    declaring: &'static str,
    attributes: Vec<AttributeInfo>,
}

impl AttributesInfo {
    pub(crate) fn new(declaring: &'static str, attributes: Vec<AttributeInfo>) -> Self {
        Self {
            declaring,
            attributes,
        }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeInfo> {
        self.attributes.iter()
    }

    pub fn try_by_api_name(&self, api_name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.api_name == api_name)
    }

    pub fn try_by_clr_name(&self, clr_name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.clr_name == clr_name)
    }

    pub fn by_api_name(&self, api_name: &str) -> Result<&AttributeInfo> {
        self.try_by_api_name(api_name)
            .ok_or_else(|| Error::MemberMissing {
                owner: self.declaring.to_owned(),
                what: "attribute",
                name: api_name.to_owned(),
            })
    }

    pub fn by_clr_name(&self, clr_name: &str) -> Result<&AttributeInfo> {
        self.try_by_clr_name(clr_name)
            .ok_or_else(|| Error::MemberMissing {
                owner: self.declaring.to_owned(),
                what: "attribute",
                name: clr_name.to_owned(),
            })
    }

    /// Resolve nested complex-type references against the registry.
    pub(crate) fn initialize(&mut self, registry: &HashMap<TypeId, usize>) -> Result<()> {
        for attribute in &mut self.attributes {
            if let AttributeKind::Complex(clr_type) = attribute.kind {
                match registry.get(&clr_type) {
                    Some(&index) => attribute.complex_index = Some(index),
                    None => {
                        return Err(Error::Model {
                            detail: format!(
                                "attribute `{}` on `{}` references unregistered complex type `{}`",
                                attribute.api_name,
                                self.declaring,
                                attribute.complex_clr_name.unwrap_or("?"),
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
