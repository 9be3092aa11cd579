//! Registration form payloads.

use serde_json::{Map, Value};

use crate::intake::sanitize::{sanitize, EMAIL_MAX, NAME_MAX, PHONE_MAX, REGION_MAX};

/// The body of `POST /save` as received. Any field may be absent or non-text.
///
/// Built only from a JSON object; a derived `Deserialize` would also accept
/// a positional array.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    pub name: Option<Value>,
    pub phone: Option<Value>,
    pub email: Option<Value>,
    pub region: Option<Value>,
}

impl RawForm {
    /// Convenience constructor for text-only forms.
    pub fn new(name: &str, phone: &str, email: &str, region: &str) -> Self {
        Self {
            name: Some(Value::from(name)),
            phone: Some(Value::from(phone)),
            email: Some(Value::from(email)),
            region: Some(Value::from(region)),
        }
    }

    /// Take the form fields out of a JSON object. Unknown keys are ignored.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        Self {
            name: object.remove("name"),
            phone: object.remove("phone"),
            email: object.remove("email"),
            region: object.remove("region"),
        }
    }

    /// Sanitize every field to its bounded text form.
    pub fn sanitize(&self) -> SanitizedForm {
        SanitizedForm {
            name: sanitize(self.name.as_ref(), NAME_MAX),
            phone: sanitize(self.phone.as_ref(), PHONE_MAX),
            email: sanitize(self.email.as_ref(), EMAIL_MAX),
            region: sanitize(self.region.as_ref(), REGION_MAX),
        }
    }
}

impl From<Map<String, Value>> for RawForm {
    fn from(object: Map<String, Value>) -> Self {
        Self::from_object(object)
    }
}

/// Trimmed, length-bounded fields. Empty means missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub region: String,
}

impl SanitizedForm {
    /// True when any required field is empty.
    pub fn has_missing_fields(&self) -> bool {
        self.name.is_empty()
            || self.phone.is_empty()
            || self.email.is_empty()
            || self.region.is_empty()
    }
}
