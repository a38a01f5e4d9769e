//! Resource identity metadata: the API type name, the id accessor,
//! and the cached "empty" id sentinel used for null testing. The
//! sentinel matters because id types may be value types; an `i64` id
//! of `0` is as unassigned as a missing string.

use std::any::Any;

use crate::coerce::{
    coerce, default_scalar, parse_scalar, ApiScalar, ScalarKind, ScalarValue,
};
use crate::error::Result;

use super::attribute::{AttributeInfo, ClrValue};

/// Identity metadata for one resource type.
pub struct ResourceIdentityInfo {
    api_type: String,
    id_kind: ScalarKind,
    default_id: ScalarValue,
    accessor: AttributeInfo,
}

impl ResourceIdentityInfo {
    /// Build identity metadata over the id property of `T`.
    pub fn new<T, V>(
        api_type: &str,
        clr_name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Any,
        V: ApiScalar + 'static,
    {
        Self {
            api_type: api_type.to_owned(),
            id_kind: V::KIND,
            default_id: default_scalar(V::KIND),
            accessor: AttributeInfo::scalar(clr_name, "id", get, set),
        }
    }

    pub fn api_type(&self) -> &str {
        &self.api_type
    }

    pub fn id_kind(&self) -> ScalarKind {
        self.id_kind
    }

    /// The typed id of a domain object; `None` is an explicit null.
    pub fn clr_id(&self, obj: &dyn Any) -> Option<ScalarValue> {
        match self.accessor.get(obj) {
            ClrValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Best-effort id assignment.
    pub fn set_clr_id(&self, obj: &mut dyn Any, id: &ScalarValue) -> bool {
        self.accessor.set(obj, ClrValue::Scalar(id.clone()))
    }

    /// Whether `id` is the type's "unassigned" value. Compares against
    /// the cached default for the id's kind, not merely against null.
    pub fn is_clr_id_null(&self, id: Option<&ScalarValue>) -> bool {
        match id {
            None => true,
            Some(value) => match coerce(value, self.id_kind) {
                Ok(normalized) => normalized == self.default_id,
                Err(_) => false,
            },
        }
    }

    /// Canonical wire form of a typed id.
    pub fn to_api_id(&self, id: &ScalarValue) -> String {
        id.format()
    }

    /// Parse a wire id back into the id's CLR kind.
    pub fn to_clr_id(&self, api_id: &str) -> Result<ScalarValue> {
        parse_scalar(api_id, self.id_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Widget {
        id: i64,
    }

    #[derive(Default)]
    struct Tag {
        id: Option<String>,
    }

    fn widget_identity() -> ResourceIdentityInfo {
        ResourceIdentityInfo::new::<Widget, i64>(
            "widgets",
            "id",
            |w| w.id,
            |w, id| w.id = id,
        )
    }

    #[test]
    fn integer_default_counts_as_null() {
        let identity = widget_identity();
        assert!(identity.is_clr_id_null(Some(&ScalarValue::Int(0))));
        assert!(!identity.is_clr_id_null(Some(&ScalarValue::Int(5))));
        assert!(identity.is_clr_id_null(None));
    }

    #[test]
    fn reference_null_counts_as_null() {
        let identity = ResourceIdentityInfo::new::<Tag, Option<String>>(
            "tags",
            "id",
            |t| t.id.clone(),
            |t, id| t.id = id,
        );
        let mut tag = Tag::default();
        assert!(identity.is_clr_id_null(identity.clr_id(&tag).as_ref()));
        tag.id = Some("seven".into());
        assert!(!identity.is_clr_id_null(identity.clr_id(&tag).as_ref()));
    }

    #[test]
    fn id_round_trips_through_text() {
        let identity = widget_identity();
        let mut widget = Widget::default();
        let parsed = identity.to_clr_id("24").unwrap();
        assert!(identity.set_clr_id(&mut widget, &parsed));
        assert_eq!(widget.id, 24);
        assert_eq!(
            identity.to_api_id(&identity.clr_id(&widget).unwrap()),
            "24"
        );
    }
}
