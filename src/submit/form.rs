// src/submit/form.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    sync::{Mutex, PoisonError},
};

use super::FormInputSource;
use crate::model::FormField;

/// A form value as written in a JSON form file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    One(String),
    Many(Vec<String>),
}

/// JSON form file: `{ "organization_name": "...", "type": ["..."], ... }`.
pub type FormDocument = BTreeMap<FormField, FormValue>;

/// Form input backed by an in-memory document, usually read from a file.
#[derive(Debug, Default)]
pub struct JsonFormSource {
    doc: Mutex<FormDocument>,
}

impl JsonFormSource {
    pub fn new(doc: FormDocument) -> Self {
        Self {
            doc: Mutex::new(doc),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading form {:?}", path))?;
        let doc: FormDocument =
            serde_json::from_str(&text).with_context(|| format!("parsing form {:?}", path))?;
        Ok(Self::new(doc))
    }

    pub fn document(&self) -> FormDocument {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn value(&self, field: FormField) -> Option<FormValue> {
        self.doc
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field)
            .cloned()
    }
}

impl FormInputSource for JsonFormSource {
    fn text(&self, field: FormField) -> Option<String> {
        match self.value(field)? {
            FormValue::One(s) => Some(s),
            FormValue::Many(v) => Some(v.join(", ")),
        }
    }

    fn selections(&self, field: FormField) -> Vec<String> {
        match self.value(field) {
            Some(FormValue::Many(v)) => {
                v.into_iter().filter(|s| !s.trim().is_empty()).collect()
            }
            Some(FormValue::One(s)) if !s.trim().is_empty() => vec![s],
            _ => Vec::new(),
        }
    }

    fn reset(&self) {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
