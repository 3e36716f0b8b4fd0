use std::time::SystemTime;

use flashtrans_types::RequestKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub original_text: String,
    pub translated_text: String,
    pub kind: RequestKind,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub editable: bool,
    /// Translation no longer matches the original text
    #[serde(default)]
    pub stale: bool,
}

impl DashboardRecord {
    pub fn new(
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
        kind: RequestKind,
        editable: bool,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            original_text: original_text.into(),
            translated_text: translated_text.into(),
            kind,
            created_at: now,
            updated_at: now,
            editable,
            stale: false,
        }
    }
}

/// User edits of one record; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditedFields {
    pub original_text: Option<String>,
    pub translated_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated,
    /// Original text changed; its translation is stale until retranslated
    Retranslate { text: String },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DashboardError {
    #[error("Record {0} is not editable")]
    NotEditable(usize),

    #[error("Record {index} out of range ({len} records)")]
    OutOfRange { index: usize, len: usize },

    #[error("Original text cannot be empty")]
    EmptyOriginal,
}

/// Insertion-ordered log of translations
///
/// Owned by the presenter; background completion order never reorders it.
#[derive(Debug, Default)]
pub struct DashboardStore {
    records: Vec<DashboardRecord>,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore records saved by the host
    pub fn from_records(records: Vec<DashboardRecord>) -> Self {
        Self { records }
    }

    /// Returns the index of the new record
    pub fn append(&mut self, record: DashboardRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn update(
        &mut self,
        index: usize,
        fields: EditedFields,
    ) -> Result<UpdateOutcome, DashboardError> {
        let record = self.record_mut(index)?;
        if !record.editable {
            return Err(DashboardError::NotEditable(index));
        }

        let new_original = match fields.original_text {
            Some(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(DashboardError::EmptyOriginal);
                }
                (text != record.original_text).then_some(text)
            }
            None => None,
        };

        if let Some(translated) = fields.translated_text {
            record.translated_text = translated;
            record.stale = false;
        }
        record.updated_at = SystemTime::now();

        match new_original {
            Some(text) => {
                record.original_text = text.clone();
                record.stale = true;
                Ok(UpdateOutcome::Retranslate { text })
            }
            None => Ok(UpdateOutcome::Updated),
        }
    }

    /// Store the result of a retranslation
    pub fn set_translation(
        &mut self,
        index: usize,
        translated_text: impl Into<String>,
    ) -> Result<&DashboardRecord, DashboardError> {
        let record = self.record_mut(index)?;
        record.translated_text = translated_text.into();
        record.stale = false;
        record.updated_at = SystemTime::now();
        Ok(record)
    }

    pub fn get(&self, index: usize) -> Option<&DashboardRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn to_ordered_sequence(&self) -> Vec<DashboardRecord> {
        self.records.clone()
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut DashboardRecord, DashboardError> {
        let len = self.records.len();
        self.records
            .get_mut(index)
            .ok_or(DashboardError::OutOfRange { index, len })
    }
}
