//! Borrowed, typed views over a FHIR bundle held as `serde_json::Value`.
//!
//! Every accessor returns `Option` or an empty slice when a key is absent or has the
//! wrong JSON type, so validators never have to guard against malformed input.

use serde_json::Value;

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn codings_of(concept: Option<&Value>) -> Vec<Coding<'_>> {
    concept
        .map(|c| array_at(c, "coding"))
        .unwrap_or(&[])
        .iter()
        .map(Coding::new)
        .collect()
}

/// Render a possibly absent JSON value the way error messages report it.
pub fn describe(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Top-level bundle envelope.
#[derive(Debug, Clone, Copy)]
pub struct Bundle<'a> {
    value: &'a Value,
}

impl<'a> Bundle<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn raw(&self) -> &'a Value {
        self.value
    }

    pub fn resource_type(&self) -> Option<&'a str> {
        str_at(self.value, "resourceType")
    }

    /// `meta.profile`, skipping non-string members.
    pub fn profiles(&self) -> Vec<&'a str> {
        self.value
            .get("meta")
            .map(|m| array_at(m, "profile"))
            .unwrap_or(&[])
            .iter()
            .filter_map(|p| p.as_str())
            .collect()
    }

    /// Bundle `type` (the aggregation semantics).
    pub fn bundle_type(&self) -> Option<&'a str> {
        str_at(self.value, "type")
    }

    pub fn entries(&self) -> &'a [Value] {
        array_at(self.value, "entry")
    }

    /// Resources of every entry, in document order.
    pub fn resources(self) -> impl Iterator<Item = Resource<'a>> + 'a {
        self.entries()
            .iter()
            .map(|entry| entry.get("resource").map(Resource::new).unwrap_or(Resource::Other))
    }

    /// Observation resources, in document order.
    pub fn observations(self) -> impl Iterator<Item = Observation<'a>> + 'a {
        self.resources().filter_map(|r| match r {
            Resource::Observation(obs) => Some(obs),
            _ => None,
        })
    }
}

/// A resource, narrowed to the kinds the hemogram profile inspects.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Observation(Observation<'a>),
    Specimen(Specimen<'a>),
    Other,
}

impl<'a> Resource<'a> {
    pub fn new(value: &'a Value) -> Self {
        match str_at(value, "resourceType") {
            Some("Observation") => Resource::Observation(Observation { value }),
            Some("Specimen") => Resource::Specimen(Specimen { value }),
            _ => Resource::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coding<'a> {
    pub system: Option<&'a str>,
    pub code: Option<&'a str>,
}

impl<'a> Coding<'a> {
    fn new(value: &'a Value) -> Self {
        Self {
            system: str_at(value, "system"),
            code: str_at(value, "code"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier<'a> {
    pub system: Option<&'a str>,
    pub value: Option<&'a str>,
}

impl<'a> Identifier<'a> {
    fn new(value: &'a Value) -> Self {
        Self {
            system: str_at(value, "system"),
            value: str_at(value, "value"),
        }
    }

    /// The identifier value if it belongs to `system`.
    pub fn value_in(&self, system: &str) -> Option<&'a str> {
        (self.system == Some(system)).then(|| self.value.unwrap_or(""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Performer<'a> {
    pub id: Option<&'a str>,
    pub identifier: Option<Identifier<'a>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    value: &'a Value,
}

impl<'a> Observation<'a> {
    pub fn raw(&self) -> &'a Value {
        self.value
    }

    /// `code.coding`
    pub fn codings(&self) -> Vec<Coding<'a>> {
        codings_of(self.value.get("code"))
    }

    /// Code of the first coding, regardless of system.
    pub fn first_code(&self) -> Option<&'a str> {
        self.value
            .get("code")
            .map(|c| array_at(c, "coding"))
            .and_then(|codings| codings.first())
            .and_then(|c| str_at(c, "code"))
    }

    /// Codes of every coding in `system`.
    pub fn codes_in<'s>(self, system: &'s str) -> impl Iterator<Item = &'a str> + 's
    where
        'a: 's,
    {
        self.codings()
            .into_iter()
            .filter(move |c| c.system == Some(system))
            .filter_map(|c| c.code)
    }

    /// `subject.identifier`
    pub fn subject_identifier(&self) -> Option<Identifier<'a>> {
        self.value
            .get("subject")
            .and_then(|s| s.get("identifier"))
            .filter(|i| i.is_object())
            .map(Identifier::new)
    }

    pub fn performers(&self) -> Vec<Performer<'a>> {
        array_at(self.value, "performer")
            .iter()
            .map(|p| Performer {
                id: str_at(p, "id"),
                identifier: p
                    .get("identifier")
                    .filter(|i| i.is_object())
                    .map(Identifier::new),
            })
            .collect()
    }

    pub fn has_member(&self) -> &'a [Value] {
        array_at(self.value, "hasMember")
    }

    /// `specimen.reference`, absent when missing or not a string.
    pub fn specimen_reference(&self) -> Option<&'a str> {
        self.value.get("specimen").and_then(|s| str_at(s, "reference"))
    }

    /// Raw `specimen.reference`, for error reporting.
    pub fn specimen_reference_raw(&self) -> Option<&'a Value> {
        self.value.get("specimen").and_then(|s| s.get("reference"))
    }

    pub fn contained(self) -> impl Iterator<Item = Resource<'a>> + 'a {
        array_at(self.value, "contained").iter().map(Resource::new)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Specimen<'a> {
    value: &'a Value,
}

impl<'a> Specimen<'a> {
    pub fn id(&self) -> Option<&'a str> {
        str_at(self.value, "id")
    }

    /// First coding of `type`, if the specimen is typed at all.
    pub fn type_coding(&self) -> Option<Coding<'a>> {
        codings_of(self.value.get("type")).into_iter().next()
    }

    /// `collection.collectedDateTime`, treating an empty string as absent.
    pub fn collected_date_time(&self) -> Option<&'a str> {
        self.value
            .get("collection")
            .and_then(|c| str_at(c, "collectedDateTime"))
            .filter(|s| !s.is_empty())
    }
}
