//! Survey/appointment field → CRM field mapping.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{normalize_phone, RecordId, RecordType};

/// A record translated into the remote system's field names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRecord {
    pub record_type: RecordType,
    pub record_id: RecordId,
    /// Normalized natural key (phone digits) used for duplicate detection
    pub natural_key: Option<String>,
    /// Remote field name → value
    pub fields: Map<String, Value>,
}

/// Which local fields are copied to which remote fields, per record type.
///
/// When the configuration omits a mapping the default one is used:
///
/// | survey       | remote        | appointment      | remote          |
/// |--------------|---------------|------------------|-----------------|
/// | first_name   | FirstName     | subject          | Subject         |
/// | last_name    | LastName      | start_time       | StartDateTime   |
/// | phone        | Phone         | end_time         | EndDateTime     |
/// | email        | Email         | address          | Location        |
/// | address      | Street        | phone            | Phone__c        |
/// | city         | City          | notes            | Description     |
/// | state        | State         |                  |                 |
/// | zip          | PostalCode    |                  |                 |
/// | company      | Company       |                  |                 |
/// | notes        | Description   |                  |                 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    #[serde(default = "default_survey_fields")]
    pub survey: BTreeMap<String, String>,
    #[serde(default = "default_appointment_fields")]
    pub appointment: BTreeMap<String, String>,
    /// Local field holding the natural key
    #[serde(default = "default_natural_key_field")]
    pub natural_key_field: String,
    /// Constant fields added to every survey (e.g. `LeadSource`)
    #[serde(default = "default_survey_constants")]
    pub survey_constants: BTreeMap<String, String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            survey: default_survey_fields(),
            appointment: default_appointment_fields(),
            natural_key_field: default_natural_key_field(),
            survey_constants: default_survey_constants(),
        }
    }
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(local, remote)| ((*local).to_string(), (*remote).to_string()))
        .collect()
}

fn default_survey_fields() -> BTreeMap<String, String> {
    pairs(&[
        ("first_name", "FirstName"),
        ("last_name", "LastName"),
        ("phone", "Phone"),
        ("email", "Email"),
        ("address", "Street"),
        ("city", "City"),
        ("state", "State"),
        ("zip", "PostalCode"),
        ("company", "Company"),
        ("notes", "Description"),
    ])
}

fn default_appointment_fields() -> BTreeMap<String, String> {
    pairs(&[
        ("subject", "Subject"),
        ("start_time", "StartDateTime"),
        ("end_time", "EndDateTime"),
        ("address", "Location"),
        ("phone", "Phone__c"),
        ("notes", "Description"),
    ])
}

fn default_survey_constants() -> BTreeMap<String, String> {
    pairs(&[("LeadSource", "Field Survey")])
}

fn default_natural_key_field() -> String {
    "phone".to_string()
}

impl FieldMapping {
    /// Reject blank names and two local fields targeting one remote field.
    pub fn validate(&self) -> Result<()> {
        if self.natural_key_field.trim().is_empty() {
            return Err(Error::Config(
                "field_mapping.natural_key_field must not be empty".to_string(),
            ));
        }

        for (label, fields) in [("survey", &self.survey), ("appointment", &self.appointment)] {
            if fields.is_empty() {
                return Err(Error::Config(format!(
                    "field_mapping.{label} must map at least one field"
                )));
            }

            let mut targets = BTreeSet::new();
            for (local, remote) in fields {
                if local.trim().is_empty() || remote.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "field_mapping.{label} contains a blank field name"
                    )));
                }
                if !targets.insert(remote.as_str()) {
                    return Err(Error::Config(format!(
                        "field_mapping.{label} maps more than one field to {remote}"
                    )));
                }
            }
        }

        Ok(())
    }

    const fn fields_for(&self, record_type: RecordType) -> &BTreeMap<String, String> {
        match record_type {
            RecordType::Survey => &self.survey,
            RecordType::Appointment => &self.appointment,
        }
    }

    /// Translate a record payload into remote fields.
    ///
    /// Null and empty-string values are skipped; unmapped local fields are dropped.
    pub fn map_record(
        &self,
        record_type: RecordType,
        record_id: RecordId,
        payload: &Value,
    ) -> Result<MappedRecord> {
        let Some(object) = payload.as_object() else {
            return Err(Error::InvalidInput(format!(
                "{record_type} {record_id} payload is not a JSON object"
            )));
        };

        let mut fields = Map::new();
        for (local, remote) in self.fields_for(record_type) {
            match object.get(local) {
                None | Some(Value::Null) => {}
                Some(Value::String(text)) if text.trim().is_empty() => {}
                Some(Value::String(text)) => {
                    fields.insert(remote.clone(), Value::String(text.trim().to_string()));
                }
                Some(value) => {
                    fields.insert(remote.clone(), value.clone());
                }
            }
        }

        if record_type == RecordType::Survey {
            for (remote, value) in &self.survey_constants {
                fields
                    .entry(remote.clone())
                    .or_insert_with(|| Value::String(value.clone()));
            }
        }

        if fields.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{record_type} {record_id} has no mapped fields"
            )));
        }

        let natural_key = object
            .get(&self.natural_key_field)
            .and_then(Value::as_str)
            .and_then(normalize_phone);

        Ok(MappedRecord {
            record_type,
            record_id,
            natural_key,
            fields,
        })
    }
}
