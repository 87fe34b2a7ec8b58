// src/submit/mod.rs

use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::fetch::{append_row, AppendReceipt};
use crate::model::{FieldKind, FieldMap, FormField, Row};
use crate::surface::RenderingSurface;
use crate::sync::SyncCoordinator;

pub mod form;

pub use form::{FormDocument, FormValue, JsonFormSource};

/// Column flagging a row as not yet reviewed.
pub const VERIFIED_HEADER: &str = "Entry verified";
pub const UNVERIFIED: &str = "False";

/// Typed read access to the submission form.
pub trait FormInputSource {
    fn text(&self, field: FormField) -> Option<String>;
    fn selections(&self, field: FormField) -> Vec<String>;
    /// Put every input back to its empty default.
    fn reset(&self);
}

/// The status line and the submit button.
pub trait SubmitControls {
    fn show_status(&self, status: &SubmitStatus);
    fn set_submit_enabled(&self, enabled: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Sending,
    Submitted,
    Invalid(Vec<String>),
    Failed(String),
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStatus::Sending => f.write_str("Sending..."),
            SubmitStatus::Submitted => {
                f.write_str("Thank you! Your entry was submitted and is pending review.")
            }
            SubmitStatus::Invalid(missing) => write!(f, "Please fill in: {}", missing.join(", ")),
            SubmitStatus::Failed(msg) => write!(f, "Error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(Option<String>),
    Multi(Vec<String>),
}

/// Values read off the form at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState(BTreeMap<FormField, FieldValue>);

impl FormState {
    pub fn collect<F: FormInputSource + ?Sized>(form: &F) -> Self {
        FormState(
            FormField::ALL
                .iter()
                .map(|&field| {
                    let value = match field.kind() {
                        FieldKind::Single => FieldValue::Text(form.text(field)),
                        FieldKind::Multi => FieldValue::Multi(form.selections(field)),
                    };
                    (field, value)
                })
                .collect(),
        )
    }

    pub fn with_text(mut self, field: FormField, value: impl Into<String>) -> Self {
        self.0.insert(field, FieldValue::Text(Some(value.into())));
        self
    }

    pub fn with_selections<I, T>(mut self, field: FormField, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.0.insert(
            field,
            FieldValue::Multi(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Required fields that are blank or have nothing but blanks selected.
    pub fn missing_required(&self) -> Vec<FormField> {
        FormField::ALL
            .iter()
            .copied()
            .filter(|f| f.is_required())
            .filter(|f| match self.0.get(f) {
                Some(FieldValue::Text(Some(s))) => s.trim().is_empty(),
                Some(FieldValue::Multi(v)) => v.iter().all(|s| s.trim().is_empty()),
                _ => true,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Validation {
                missing: missing.iter().map(|f| f.label().to_string()).collect(),
            })
        }
    }

    /// Build the row to append: one cell per mapped header, selections
    /// joined with `", "`, plus the unverified flag.
    pub fn to_row(&self, fields: &FieldMap) -> Row {
        let mut row: Row = fields
            .iter()
            .map(|(field, header)| {
                let cell = match self.0.get(&field) {
                    Some(FieldValue::Text(v)) => v.clone().unwrap_or_default(),
                    Some(FieldValue::Multi(v)) => v.join(", "),
                    None => String::new(),
                };
                (header.to_string(), cell)
            })
            .collect();
        row.insert(VERIFIED_HEADER, UNVERIFIED);
        row
    }
}

/// Appends one row from the form, then re-syncs.
pub struct SubmissionHandler<S> {
    coordinator: Arc<SyncCoordinator<S>>,
    fields: FieldMap,
    range: String,
}

impl<S: RenderingSurface> SubmissionHandler<S> {
    pub fn new(coordinator: Arc<SyncCoordinator<S>>, range: impl Into<String>) -> Self {
        Self {
            coordinator,
            fields: FieldMap::default(),
            range: range.into(),
        }
    }

    pub fn with_field_map(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }

    /// Validate, append and refresh.
    ///
    /// An invalid form never reaches the network and is left as typed.
    /// The submit control is re-enabled once the append settles, before the
    /// follow-up refresh, and also if this future is dropped mid-flight.
    /// No retry and no idempotency key: resubmitting after a timeout may
    /// append the same row twice.
    #[instrument(level = "info", skip_all, fields(range = %self.range))]
    pub async fn submit<F, C>(&self, form: &F, controls: &C) -> Result<Row>
    where
        F: FormInputSource + ?Sized,
        C: SubmitControls + ?Sized,
    {
        let state = FormState::collect(form);
        if let Err(e) = state.validate() {
            if let SyncError::Validation { missing } = &e {
                controls.show_status(&SubmitStatus::Invalid(missing.clone()));
            }
            warn!(error = %e, "submission rejected");
            return Err(e);
        }

        controls.show_status(&SubmitStatus::Sending);
        controls.set_submit_enabled(false);
        let reenable = ReenableOnDrop(controls);

        let row = state.to_row(&self.fields);
        let sent = match self.append(&row).await {
            Ok(receipt) => {
                info!(reply = receipt.message().unwrap_or_default(), "entry submitted");
                form.reset();
                controls.show_status(&SubmitStatus::Submitted);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "submission failed");
                controls.show_status(&SubmitStatus::Failed(e.to_string()));
                Err(e)
            }
        };
        drop(reenable);
        sent?;

        // the row is stored already; a failed refresh only delays showing it
        if let Err(e) = self.coordinator.refresh().await {
            warn!(error = %e, "refresh after submit failed");
        }
        Ok(row)
    }

    async fn append(&self, row: &Row) -> Result<AppendReceipt> {
        let headers = self.coordinator.cache().headers();
        if headers.is_empty() {
            warn!("no cached headers; appending an empty row");
        }
        let cells = row.project(&headers);
        append_row(
            self.coordinator.client(),
            self.coordinator.endpoint(),
            &self.range,
            cells,
        )
        .await
    }
}

/// Turns the submit control back on when dropped.
struct ReenableOnDrop<'a, C: SubmitControls + ?Sized>(&'a C);

impl<C: SubmitControls + ?Sized> Drop for ReenableOnDrop<'_, C> {
    fn drop(&mut self) {
        self.0.set_submit_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::surface::ChannelSurface;
    use crate::sync::SnapshotCache;
    use crate::test_support::{Canned, MockSheet};
    use reqwest::Client;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingControls {
        events: Mutex<Vec<String>>,
    }

    impl RecordingControls {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl SubmitControls for RecordingControls {
        fn show_status(&self, status: &SubmitStatus) {
            self.events.lock().unwrap().push(format!("status: {}", status));
        }

        fn set_submit_enabled(&self, enabled: bool) {
            self.events.lock().unwrap().push(format!("enabled: {}", enabled));
        }
    }

    fn filled_form() -> JsonFormSource {
        let doc: FormDocument = serde_json::from_value(json!({
            "organization_name": "Y",
            "country": "CA",
            "scope": "National",
            "region": "Ontario",
            "type": ["Nonprofit"],
            "population_served": ["Youth", "Seniors"],
            "services": ["Food"]
        }))
        .unwrap();
        JsonFormSource::new(doc)
    }

    async fn handler(mock: &MockSheet) -> SubmissionHandler<ChannelSurface> {
        let (surface, _rx) = ChannelSurface::new();
        let cfg = SyncConfig::new(mock.endpoint());
        let coord = Arc::new(SyncCoordinator::new(
            Client::new(),
            &cfg,
            SnapshotCache::new(),
            Arc::new(surface),
        ));
        coord.refresh().await.unwrap();
        SubmissionHandler::new(coord, &cfg.append_range)
    }

    #[test]
    fn test_multi_select_joined() {
        let state = FormState::default()
            .with_text(FormField::OrganizationName, "Y")
            .with_selections(FormField::Type, ["A", "B"])
            .with_selections(FormField::Services, Vec::<String>::new());
        let row = state.to_row(&FieldMap::default());

        assert_eq!(row.cell("Type"), "A, B");
        assert_eq!(row.cell("Services / Resources"), "");
        assert_eq!(row.cell("Website"), "");
        assert_eq!(row.cell(VERIFIED_HEADER), "False");
    }

    #[test]
    fn test_missing_required_fields() {
        let state = FormState::default()
            .with_text(FormField::OrganizationName, "   ")
            .with_text(FormField::Country, "CA")
            .with_selections(FormField::Type, ["A"]);
        assert_eq!(
            state.missing_required(),
            vec![
                FormField::OrganizationName,
                FormField::Scope,
                FormField::Region,
                FormField::PopulationServed,
                FormField::Services,
            ]
        );
        assert!(matches!(state.validate(), Err(SyncError::Validation { .. })));

        // blank selections count as nothing selected
        let state = state
            .with_selections(FormField::Type, [""])
            .with_selections(FormField::PopulationServed, [" ", "\t"])
            .with_selections(FormField::Services, ["", "Food"]);
        assert_eq!(
            state.missing_required(),
            vec![
                FormField::OrganizationName,
                FormField::Scope,
                FormField::Region,
                FormField::Type,
                FormField::PopulationServed,
            ]
        );
    }

    #[test]
    fn test_custom_field_map() {
        let mut fields = FieldMap::default();
        fields.set(FormField::Other, "Notes");
        let row = FormState::default()
            .with_text(FormField::Other, "walk-ins welcome")
            .to_row(&fields);
        assert_eq!(row.cell("Notes"), "walk-ins welcome");
        assert_eq!(row.cell("Other"), "");
    }

    #[tokio::test]
    async fn test_submit_projects_onto_cached_headers() {
        let mock = MockSheet::start().await;
        mock.push_get(Canned::json(json!({
            "headers": ["Organization Name", "Country"],
            "rows": [{"Organization Name": "X", "Country": "US"}]
        })));
        let handler = handler(&mock).await;
        let form = filled_form();
        let controls = RecordingControls::default();

        let row = handler.submit(&form, &controls).await.unwrap();

        assert_eq!(row.cell("Organization Name"), "Y");
        assert_eq!(row.cell("Population Served"), "Youth, Seniors");
        assert_eq!(
            mock.posts(),
            vec![json!({"range": "Sheet1!A:Z", "value": [["Y", "CA"]]})]
        );
        // startup refresh plus the one after submitting
        assert_eq!(mock.gets().len(), 2);
        assert!(form.document().is_empty());
        assert_eq!(
            controls.events(),
            vec![
                "status: Sending...",
                "enabled: false",
                "status: Thank you! Your entry was submitted and is pending review.",
                "enabled: true",
            ]
        );
    }

    #[tokio::test]
    async fn test_header_order_drives_projection() {
        let mock = MockSheet::start().await;
        mock.push_get(Canned::json(json!({
            "headers": ["Country", "Entry verified", "Unmapped", "Organization Name"],
            "rows": []
        })));
        let handler = handler(&mock).await;

        handler
            .submit(&filled_form(), &RecordingControls::default())
            .await
            .unwrap();
        assert_eq!(mock.posts()[0]["value"], json!([["CA", "False", "", "Y"]]));
    }

    #[tokio::test]
    async fn test_invalid_form_never_sent() {
        let mock = MockSheet::start().await;
        mock.push_get(Canned::json(json!({"headers": ["Organization Name"], "rows": []})));
        let handler = handler(&mock).await;

        let mut doc = filled_form().document();
        doc.remove(&FormField::Services);
        doc.insert(FormField::Country, FormValue::One(" ".into()));
        let form = JsonFormSource::new(doc.clone());
        let controls = RecordingControls::default();

        let err = handler.submit(&form, &controls).await.unwrap_err();
        match err {
            SyncError::Validation { missing } => {
                assert_eq!(missing, vec!["Country", "Services / Resources"])
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(mock.posts().is_empty());
        assert_eq!(form.document(), doc);
        assert_eq!(
            controls.events(),
            vec!["status: Please fill in: Country, Services / Resources"]
        );
    }

    #[tokio::test]
    async fn test_abandoned_submit_reenables_control() {
        let mock = MockSheet::start().await;
        mock.push_get(Canned::json(json!({"headers": ["Organization Name"], "rows": []})));
        mock.set_post_reply(
            Canned::json(json!({"updates": {}})).delayed(std::time::Duration::from_secs(5)),
        );
        let handler = handler(&mock).await;
        let form = filled_form();
        let controls = RecordingControls::default();

        let pending = handler.submit(&form, &controls);
        let res = tokio::time::timeout(std::time::Duration::from_millis(200), pending).await;
        assert!(res.is_err());

        assert!(!form.document().is_empty());
        assert_eq!(
            controls.events(),
            vec!["status: Sending...", "enabled: false", "enabled: true"]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_reenables_submit() {
        let mock = MockSheet::start().await;
        mock.push_get(Canned::json(json!({"headers": ["Organization Name"], "rows": []})));
        mock.set_post_reply(Canned::text(500, "Google Sheets API error"));
        let handler = handler(&mock).await;
        let form = filled_form();
        let controls = RecordingControls::default();

        let err = handler.submit(&form, &controls).await.unwrap_err();
        assert!(matches!(err, SyncError::Http { status: 500, .. }));

        assert!(!form.document().is_empty());
        assert_eq!(mock.gets().len(), 1);
        assert_eq!(
            controls.events(),
            vec![
                "status: Sending...".to_string(),
                "enabled: false".to_string(),
                "status: Error: HTTP 500: Google Sheets API error".to_string(),
                "enabled: true".to_string(),
            ]
        );
    }
}
