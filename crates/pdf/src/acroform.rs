//! AcroForm field tree traversal and value encoding on top of `lopdf`.

use autoscribe::{FieldDescriptor, FieldKind, FormError};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Field trees deeper than this are treated as cyclic and cut off.
const MAX_FIELD_DEPTH: usize = 32;

const OFF_STATE: &str = "Off";

/// A terminal field of the form, resolved from the field tree.
#[derive(Debug, Clone)]
pub(crate) struct FieldNode {
    pub name: String,
    /// The field dictionary. `None` when the field is a direct object and cannot be edited.
    pub id: Option<ObjectId>,
    pub kind: FieldKind,
    /// Widget annotations carrying the field's appearance (the field itself when merged).
    pub widgets: Vec<ObjectId>,
    /// Normal-appearance states of the widgets, `Off` excluded.
    pub states: BTreeSet<String>,
}

impl FieldNode {
    pub fn descriptor(&self) -> FieldDescriptor {
        match &self.kind {
            FieldKind::Toggle if !self.states.is_empty() => {
                FieldDescriptor::toggle(self.name.clone(), self.states.iter().cloned())
            }
            FieldKind::Toggle => FieldDescriptor::unconstrained_toggle(self.name.clone()),
            FieldKind::Text => FieldDescriptor::text(self.name.clone()),
            FieldKind::Unsupported(raw) => FieldDescriptor {
                name: self.name.clone(),
                kind: FieldKind::Unsupported(raw.clone()),
                allowed_values: None,
            },
        }
    }
}

/// Follows one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn catalog_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").ok()?.as_reference().ok()
}

fn acro_form<'a>(doc: &'a Document) -> Option<&'a Dictionary> {
    let catalog = doc.get_object(catalog_id(doc)?).ok()?.as_dict().ok()?;
    resolve(doc, catalog.get(b"AcroForm").ok()?).as_dict().ok()
}

/// Collects the terminal fields of the document in document order.
///
/// Returns an empty list when the document has no `/AcroForm` or no fields. A name
/// that appears twice keeps its first field.
pub(crate) fn collect_fields(doc: &Document) -> Vec<FieldNode> {
    let Some(roots) = acro_form(doc)
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|fields| resolve(doc, fields).as_array().ok())
    else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    for root in roots {
        walk(doc, root, None, None, 0, &mut fields);
    }

    let mut seen = HashSet::new();
    fields.retain(|field: &FieldNode| {
        let first = seen.insert(field.name.clone());
        if !first {
            debug!("Ignoring duplicate field name '{}'.", field.name);
        }
        first
    });
    fields
}

fn walk(
    doc: &Document,
    object: &Object,
    parent_name: Option<&str>,
    inherited_type: Option<&[u8]>,
    depth: usize,
    out: &mut Vec<FieldNode>,
) {
    if depth > MAX_FIELD_DEPTH {
        warn!("Field tree deeper than {} levels; skipping the rest.", MAX_FIELD_DEPTH);
        return;
    }
    let id = object.as_reference().ok();
    let Ok(dict) = resolve(doc, object).as_dict() else {
        return;
    };

    let partial = match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    };
    let name = match (parent_name.filter(|p| !p.is_empty()), partial) {
        (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
        (None, Some(partial)) => partial,
        (Some(parent), None) => parent.to_string(),
        (None, None) => String::new(),
    };
    let field_type = match dict.get(b"FT") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => inherited_type,
    };

    let kids: Vec<&Object> = dict
        .get(b"Kids")
        .ok()
        .and_then(|kids| resolve(doc, kids).as_array().ok())
        .map(|kids| kids.iter().collect())
        .unwrap_or_default();
    let (field_kids, widget_kids): (Vec<&Object>, Vec<&Object>) =
        kids.into_iter().partition(|kid| {
            resolve(doc, kid)
                .as_dict()
                .map(|d| d.has(b"T"))
                .unwrap_or(false)
        });

    if !field_kids.is_empty() {
        for kid in field_kids {
            walk(doc, kid, Some(&name), field_type, depth + 1, out);
        }
        return;
    }

    if name.is_empty() {
        debug!("Skipping a terminal field without a name.");
        return;
    }

    let widgets: Vec<ObjectId> = if widget_kids.is_empty() {
        id.into_iter().collect()
    } else {
        widget_kids
            .iter()
            .filter_map(|kid| kid.as_reference().ok())
            .collect()
    };

    let kind = match field_type {
        Some(b"Tx") => FieldKind::Text,
        Some(b"Btn") => FieldKind::Toggle,
        Some(other) => FieldKind::Unsupported(String::from_utf8_lossy(other).into_owned()),
        None => FieldKind::Unsupported(String::new()),
    };

    let mut states = BTreeSet::new();
    if kind == FieldKind::Toggle {
        for widget in &widgets {
            if let Ok(widget) = doc.get_object(*widget).and_then(Object::as_dict) {
                states.extend(appearance_states(doc, widget));
            }
        }
        // A direct field object has no id to list as a widget.
        if widgets.is_empty() {
            states.extend(appearance_states(doc, dict));
        }
    }

    out.push(FieldNode {
        name,
        id,
        kind,
        widgets,
        states,
    });
}

/// The `/AP /N` state names of a widget, without `Off`.
fn appearance_states(doc: &Document, widget: &Dictionary) -> Vec<String> {
    let Some(normal) = widget
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve(doc, ap).as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve(doc, n).as_dict().ok())
    else {
        return Vec::new();
    };
    normal
        .iter()
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .filter(|state| state != OFF_STATE)
        .collect()
}

// --- Values ---

/// Decodes a PDF text string: UTF-16BE when it carries a byte order mark, else Latin-1.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encodes `value` as a PDF text string.
pub(crate) fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// The field's current `/V`, if any.
pub(crate) fn current_value(doc: &Document, field: &FieldNode) -> Option<String> {
    let dict = doc.get_object(field.id?).ok()?.as_dict().ok()?;
    match resolve(doc, dict.get(b"V").ok()?) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Applies one value to a field in memory.
pub(crate) fn apply_value(
    doc: &mut Document,
    field: &FieldNode,
    value: &str,
) -> Result<(), FormError> {
    let id = field.id.ok_or_else(|| FormError::Malformed {
        field: field.name.clone(),
        reason: "field dictionary is not an indirect object".to_string(),
    })?;

    match &field.kind {
        FieldKind::Text => set_entry(doc, id, &field.name, b"V", encode_text_string(value)),
        FieldKind::Toggle => {
            if value != OFF_STATE && !field.states.is_empty() && !field.states.contains(value) {
                return Err(FormError::InvalidToggleState {
                    field: field.name.clone(),
                    value: value.to_string(),
                });
            }
            set_entry(doc, id, &field.name, b"V", Object::Name(value.as_bytes().to_vec()))?;
            for widget in &field.widgets {
                let has_state = doc
                    .get_object(*widget)
                    .and_then(Object::as_dict)
                    .map(|w| appearance_states(doc, w).iter().any(|s| s == value))
                    .unwrap_or(false);
                let state = if has_state { value } else { OFF_STATE };
                set_entry(doc, *widget, &field.name, b"AS", Object::Name(state.as_bytes().to_vec()))?;
            }
            Ok(())
        }
        FieldKind::Unsupported(kind) => Err(FormError::UnsupportedField {
            field: field.name.clone(),
            kind: kind.clone(),
        }),
    }
}

fn set_entry(
    doc: &mut Document,
    id: ObjectId,
    field: &str,
    key: &[u8],
    value: Object,
) -> Result<(), FormError> {
    let dict = doc
        .get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| FormError::Malformed {
            field: field.to_string(),
            reason: e.to_string(),
        })?;
    dict.set(key.to_vec(), value);
    Ok(())
}

/// Asks viewers to regenerate field appearances from the new values.
pub(crate) fn set_need_appearances(doc: &mut Document) -> Result<(), FormError> {
    let malformed = |reason: String| FormError::Malformed {
        field: "AcroForm".to_string(),
        reason,
    };
    let catalog_id = catalog_id(doc).ok_or_else(|| malformed("missing /Root".to_string()))?;
    let form_ref = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"AcroForm"))
        .map_err(|e| malformed(e.to_string()))?
        .as_reference()
        .ok();

    let form = match form_ref {
        Some(form_id) => doc.get_object_mut(form_id),
        None => doc
            .get_object_mut(catalog_id)
            .and_then(Object::as_dict_mut)
            .and_then(|catalog| catalog.get_mut(b"AcroForm")),
    }
    .and_then(Object::as_dict_mut)
    .map_err(|e| malformed(e.to_string()))?;

    form.set("NeedAppearances", Object::Boolean(true));
    Ok(())
}
