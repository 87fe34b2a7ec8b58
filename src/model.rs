// src/model.rs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single sheet row keyed by header name, plus the synthetic `_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Name of the positional id injected at fetch time.
    pub const ID_FIELD: &'static str = "_id";

    /// Build the row found at `index` of a fetched payload.
    ///
    /// The positional id goes in first and the original fields are applied
    /// on top, so a sheet column literally named `_id` wins.
    pub fn from_position(index: usize, fields: Map<String, Value>) -> Self {
        let mut map = Map::with_capacity(fields.len() + 1);
        map.insert(Self::ID_FIELD.to_string(), Value::String(index.to_string()));
        map.extend(fields);
        Row(map)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(Self::ID_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Value::String(value.into()));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Cell text for `header`. Missing and null cells are empty.
    pub fn cell(&self, header: &str) -> String {
        match self.0.get(header) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Lay the row out positionally in `headers` order.
    pub fn project(&self, headers: &[String]) -> Vec<String> {
        headers.iter().map(|h| self.cell(h)).collect()
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    }
}

/// Headers plus rows as returned by one fetch. Always replaced whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Display roles of a listing card and the headers that fill each of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMap {
    pub title: Vec<String>,
    pub address: Vec<String>,
    pub services: Vec<String>,
    pub cost: Vec<String>,
    pub funding: Vec<String>,
    pub logo: Vec<String>,
    pub url: Vec<String>,
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

static DEFAULT_CARD_MAP: Lazy<CardMap> = Lazy::new(|| CardMap {
    title: headers(&["Organization Name"]),
    address: headers(&["Region", "Country"]),
    services: headers(&["Services / Resources"]),
    cost: headers(&["Scope"]),
    funding: headers(&["Type", "Population Served"]),
    logo: Vec::new(),
    url: headers(&["Website"]),
});

impl Default for CardMap {
    fn default() -> Self {
        DEFAULT_CARD_MAP.clone()
    }
}

/// Whether a form field holds one value or a set of selections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Single,
    Multi,
}

/// The fixed set of inputs on the submission form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    OrganizationName,
    Country,
    Scope,
    Region,
    Type,
    PopulationServed,
    Services,
    Website,
    Other,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        FormField::OrganizationName,
        FormField::Country,
        FormField::Scope,
        FormField::Region,
        FormField::Type,
        FormField::PopulationServed,
        FormField::Services,
        FormField::Website,
        FormField::Other,
    ];

    pub fn kind(&self) -> FieldKind {
        match self {
            FormField::Type | FormField::PopulationServed | FormField::Services => FieldKind::Multi,
            _ => FieldKind::Single,
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, FormField::Website | FormField::Other)
    }

    /// Human label, also the backend header this field maps to by default.
    pub fn label(&self) -> &'static str {
        match self {
            FormField::OrganizationName => "Organization Name",
            FormField::Country => "Country",
            FormField::Scope => "Scope",
            FormField::Region => "Region",
            FormField::Type => "Type",
            FormField::PopulationServed => "Population Served",
            FormField::Services => "Services / Resources",
            FormField::Website => "Website",
            FormField::Other => "Other",
        }
    }
}

/// Form field → backend header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap(BTreeMap<FormField, String>);

impl FieldMap {
    pub fn header(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: FormField, header: impl Into<String>) {
        self.0.insert(field, header.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(f, h)| (*f, h.as_str()))
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        FieldMap(
            FormField::ALL
                .iter()
                .map(|f| (*f, f.label().to_string()))
                .collect(),
        )
    }
}
