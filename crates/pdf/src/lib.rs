//! # autoscribe-pdf: AcroForm Backend
//!
//! This crate provides the `lopdf`-backed [`FormBackend`] used to read and fill
//! interactive PDF forms, plus the page text extraction that feeds the question
//! extraction stage.

mod acroform;

use acroform::{apply_value, collect_fields, current_value, set_need_appearances};
use autoscribe::{FieldDescriptor, FormBackend, FormError, ResolvedFieldValue};
use lopdf::Document;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// --- Document I/O ---

fn load(path: &Path) -> Result<Document, FormError> {
    Document::load(path).map_err(|e| FormError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn save(doc: &mut Document, path: &Path) -> Result<(), FormError> {
    let save_error = |reason: String| FormError::Save {
        path: path.display().to_string(),
        reason,
    };
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| save_error(e.to_string()))?;
    std::fs::write(path, bytes).map_err(|e| save_error(e.to_string()))
}

/// Extracts the text of every page, in page order.
///
/// A page whose text cannot be extracted yields an empty string, so the result always
/// has one entry per page.
#[instrument]
pub fn page_texts(path: &Path) -> Result<Vec<String>, FormError> {
    let doc = load(path)?;
    let pages = doc.get_pages();
    let texts: Vec<String> = pages
        .keys()
        .map(|&page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to extract text from page {}: {}", page_number, e);
                String::new()
            }
        })
        .collect();
    info!("Extracted text from {} pages of '{}'.", texts.len(), path.display());
    Ok(texts)
}

// --- Form Backend ---

/// A [`FormBackend`] over the AcroForm dictionary of a PDF file.
///
/// Fields are addressed by their fully-qualified names. Writes set `/V` on the field,
/// `/AS` on toggle widgets and `/NeedAppearances` on the form, and are saved only
/// when every value of the call was applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfFormBackend;

impl LopdfFormBackend {
    pub fn new() -> Self {
        Self
    }

    /// Lists every field together with its current value.
    pub fn field_values(
        &self,
        source: &Path,
    ) -> Result<Vec<(FieldDescriptor, Option<String>)>, FormError> {
        let doc = load(source)?;
        let fields = collect_fields(&doc);
        if fields.is_empty() {
            return Err(FormError::NoFields(source.display().to_string()));
        }
        Ok(fields
            .iter()
            .map(|field| (field.descriptor(), current_value(&doc, field)))
            .collect())
    }
}

impl FormBackend for LopdfFormBackend {
    #[instrument(skip(self))]
    fn read_fields(&self, source: &Path) -> Result<Vec<FieldDescriptor>, FormError> {
        let doc = load(source)?;
        let fields = collect_fields(&doc);
        if fields.is_empty() {
            return Err(FormError::NoFields(source.display().to_string()));
        }
        info!("Found {} form fields in '{}'.", fields.len(), source.display());
        Ok(fields.iter().map(|field| field.descriptor()).collect())
    }

    #[instrument(skip(self, values), fields(values = values.len()))]
    fn write_fields(
        &self,
        source: &Path,
        destination: &Path,
        values: &[ResolvedFieldValue],
    ) -> Result<(), FormError> {
        let mut doc = load(source)?;

        if !values.is_empty() {
            let fields: HashMap<String, _> = collect_fields(&doc)
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect();
            if fields.is_empty() {
                return Err(FormError::NoFields(source.display().to_string()));
            }

            for value in values {
                let field = fields
                    .get(&value.name)
                    .ok_or_else(|| FormError::UnknownField(value.name.clone()))?;
                apply_value(&mut doc, field, &value.value)?;
                debug!("Set '{}' = '{}'.", value.name, value.value);
            }
            set_need_appearances(&mut doc)?;
        }

        save(&mut doc, destination)
    }
}
