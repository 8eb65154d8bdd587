//! Core data types: [`Record`], the raw [`RecordFields`] a collaborator
//! submits, and the derived [`Summary`].

use crate::error::{NotesError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `DD/MM/YYYY`, digits only. No calendar check: `99/99/9999` passes.
static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("date pattern is valid"));

/// One service note, exactly as it is stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub date: String,
    pub theme: String,
    pub passage: String,
    pub service_notes: String,
    pub devotional: String,
}

impl Record {
    /// The leading token of the passage, e.g. `John` for `John 3:16`.
    pub fn book(&self) -> &str {
        self.passage.split_whitespace().next().unwrap_or("")
    }
}

/// Unvalidated input for `add` and `update`. Missing fields decode as empty
/// and are rejected by [`RecordFields::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordFields {
    pub date: String,
    pub theme: String,
    pub passage: String,
    pub service_notes: String,
    pub devotional: String,
}

impl RecordFields {
    pub fn new(
        date: impl Into<String>,
        theme: impl Into<String>,
        passage: impl Into<String>,
        service_notes: impl Into<String>,
        devotional: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            theme: theme.into(),
            passage: passage.into(),
            service_notes: service_notes.into(),
            devotional: devotional.into(),
        }
    }

    /// Trims every field and checks the record invariants.
    pub fn validate(self) -> Result<Record> {
        let record = Record {
            date: self.date.trim().to_string(),
            theme: self.theme.trim().to_string(),
            passage: self.passage.trim().to_string(),
            service_notes: self.service_notes.trim().to_string(),
            devotional: self.devotional.trim().to_string(),
        };

        let missing: Vec<&str> = [
            ("date", &record.date),
            ("theme", &record.theme),
            ("passage", &record.passage),
            ("serviceNotes", &record.service_notes),
            ("devotional", &record.devotional),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(NotesError::Validation(format!(
                "All fields are required (missing: {})",
                missing.join(", ")
            )));
        }

        if !DATE_PATTERN.is_match(&record.date) {
            return Err(NotesError::Validation(format!(
                "Invalid date format '{}'. Use DD/MM/YYYY.",
                record.date
            )));
        }

        Ok(record)
    }
}

impl From<Record> for RecordFields {
    fn from(record: Record) -> Self {
        Self {
            date: record.date,
            theme: record.theme,
            passage: record.passage,
            service_notes: record.service_notes,
            devotional: record.devotional,
        }
    }
}

/// Read-only digest of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub themes: BTreeSet<String>,
    pub passages_by_book: BTreeMap<String, Vec<String>>,
    pub dates: BTreeSet<String>,
}

impl Summary {
    /// Single pass: themes and dates collapse to distinct values, passages
    /// keep every occurrence in collection order under their book.
    pub fn from_records(records: &[Record]) -> Self {
        let mut summary = Summary::default();
        for record in records {
            summary.themes.insert(record.theme.clone());
            summary.dates.insert(record.date.clone());
            summary
                .passages_by_book
                .entry(record.book().to_string())
                .or_default()
                .push(record.passage.clone());
        }
        summary
    }

    /// Dates ordered by calendar position (year, month, day) rather than by
    /// their `DD/MM/YYYY` text.
    pub fn dates_chronological(&self) -> Vec<&str> {
        let mut dates: Vec<&str> = self.dates.iter().map(String::as_str).collect();
        dates.sort_by_key(|d| {
            let mut parts = d.split('/');
            let day = parts.next().unwrap_or("");
            let month = parts.next().unwrap_or("");
            let year = parts.next().unwrap_or("");
            (year, month, day)
        });
        dates
    }
}
