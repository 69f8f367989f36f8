use anyhow::Result;
use async_trait::async_trait;
use autoscribe::errors::PromptError;
use autoscribe::providers::ai::AiProvider;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Mock AI Provider ---

/// Answers by system prompt: each programmed response is keyed by a substring
/// that must appear in the system prompt.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((system_prompt.to_string(), user_prompt.to_string()));

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        // 404 is not transient, so the completion client does not retry it.
        Err(PromptError::AiApi {
            status: 404,
            body: format!("MockAiProvider: no response programmed for system prompt '{system_prompt}'"),
        })
    }
}

// --- Scripted AI Provider ---

/// Replays a fixed queue of results in call order, regardless of the prompts.
#[derive(Clone, Debug)]
pub struct ScriptedAiProvider {
    script: Arc<Mutex<VecDeque<Result<String, (u16, String)>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    delay: Duration,
}

impl ScriptedAiProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(Mutex::new(
                responses.into_iter().map(|r| Ok(r.into())).collect(),
            )),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    /// Queues an API failure with the given HTTP status.
    pub fn push_failure(&self, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err((status, body.to_string())));
    }

    pub fn push_response(&self, response: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    /// Sleeps before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for ScriptedAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err((status, body))) => Err(PromptError::AiApi { status, body }),
            None => Err(PromptError::AiApi {
                status: 404,
                body: "ScriptedAiProvider: script exhausted".to_string(),
            }),
        }
    }
}

// --- Test-Specific Helpers ---

pub mod helpers {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

    /// The kinds of AcroForm field the fixture generator can produce.
    #[derive(Debug, Clone)]
    pub enum TestFieldKind {
        /// A `/Tx` field, optionally pre-filled.
        Text(Option<String>),
        /// A single-widget `/Btn` field with one "on" appearance state.
        Checkbox { on_state: String },
        /// A `/Btn` radio group with one widget kid per state.
        Radio { states: Vec<String> },
        /// A `/Btn` field without appearance streams.
        BareToggle,
        /// A `/Sig` field.
        Signature,
        /// A non-terminal node whose kids are named relative to it.
        Group(Vec<TestField>),
    }

    #[derive(Debug, Clone)]
    pub struct TestField {
        pub name: String,
        pub kind: TestFieldKind,
    }

    impl TestField {
        pub fn text(name: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::Text(None),
            }
        }

        pub fn filled_text(name: &str, value: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::Text(Some(value.to_string())),
            }
        }

        pub fn checkbox(name: &str, on_state: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::Checkbox {
                    on_state: on_state.to_string(),
                },
            }
        }

        pub fn radio(name: &str, states: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::Radio {
                    states: states.iter().map(|s| s.to_string()).collect(),
                },
            }
        }

        pub fn bare_toggle(name: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::BareToggle,
            }
        }

        pub fn signature(name: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::Signature,
            }
        }

        pub fn group(name: &str, kids: Vec<TestField>) -> Self {
            Self {
                name: name.to_string(),
                kind: TestFieldKind::Group(kids),
            }
        }
    }

    /// Generates a fillable PDF with one page per entry of `pages`.
    ///
    /// Every field gets its widget on the first page. Page text is written with the
    /// standard Helvetica font so that text extraction can read it back.
    pub fn generate_form_pdf(pages: &[&str], fields: &[TestField]) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids = Vec::new();
        for text in pages.iter().copied().chain(pages.is_empty().then_some("")) {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 750.into()]),
            ];
            for (i, line) in text.lines().enumerate() {
                if i > 0 {
                    operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
                }
                operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            page_ids.push(page_id);
        }

        let first_page = page_ids[0];
        let mut annots = Vec::new();
        let mut field_refs = Vec::new();
        let mut slot = 0;
        for field in fields {
            let id = add_field(&mut doc, field, None, first_page, &mut annots, &mut slot);
            field_refs.push(Object::Reference(id));
        }

        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(first_page) {
            page.set("Annots", annots);
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
            }),
        );

        let acro_form_id = doc.add_object(dictionary! {
            "Fields" => field_refs,
            "DA" => Object::string_literal("/F1 0 Tf 0 g"),
            "DR" => resources_id,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acro_form_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Generates a PDF with pages but no `/AcroForm` entry.
    pub fn generate_plain_pdf(text: &str) -> Result<Vec<u8>> {
        let bytes = generate_form_pdf(&[text], &[])?;
        let mut doc = Document::load_mem(&bytes)?;
        let root = doc.trailer.get(b"Root")?.as_reference()?;
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(root) {
            catalog.remove(b"AcroForm");
        }
        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    /// Writes a generated form PDF to `dir/name` and returns its path.
    pub fn write_form_pdf(
        dir: &Path,
        name: &str,
        pages: &[&str],
        fields: &[TestField],
    ) -> Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, generate_form_pdf(pages, fields)?)?;
        Ok(path)
    }

    fn appearance(doc: &mut Document) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 12.into(), 12.into()],
            },
            Vec::new(),
        ))
    }

    fn states_dict(doc: &mut Document, on_state: &str) -> Dictionary {
        let on = appearance(doc);
        let off = appearance(doc);
        dictionary! {
            on_state => on,
            "Off" => off,
        }
    }

    fn widget(page: ObjectId, slot: &mut i64) -> Dictionary {
        let y = 700 - 20 * *slot;
        *slot += 1;
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![300.into(), y.into(), 500.into(), (y + 14).into()],
            "P" => page,
        }
    }

    fn add_field(
        doc: &mut Document,
        field: &TestField,
        parent: Option<ObjectId>,
        page: ObjectId,
        annots: &mut Vec<Object>,
        slot: &mut i64,
    ) -> ObjectId {
        let id = doc.new_object_id();
        let mut dict = dictionary! {
            "T" => Object::string_literal(field.name.as_str()),
        };
        if let Some(parent) = parent {
            dict.set("Parent", parent);
        }

        match &field.kind {
            TestFieldKind::Group(kids) => {
                let kid_refs: Vec<Object> = kids
                    .iter()
                    .map(|kid| Object::Reference(add_field(doc, kid, Some(id), page, annots, slot)))
                    .collect();
                dict.set("Kids", kid_refs);
            }
            TestFieldKind::Radio { states } => {
                dict.set("FT", "Btn");
                dict.set("Ff", 1 << 15);
                dict.set("V", "Off");
                let mut kid_refs = Vec::new();
                for state in states {
                    let mut kid = widget(page, slot);
                    let normal = states_dict(doc, state);
                    kid.set("Parent", id);
                    kid.set("AP", dictionary! { "N" => normal });
                    kid.set("AS", "Off");
                    let kid_id = doc.add_object(kid);
                    annots.push(Object::Reference(kid_id));
                    kid_refs.push(Object::Reference(kid_id));
                }
                dict.set("Kids", kid_refs);
            }
            kind => {
                for (key, value) in widget(page, slot).iter() {
                    dict.set(key.clone(), value.clone());
                }
                match kind {
                    TestFieldKind::Text(value) => {
                        dict.set("FT", "Tx");
                        if let Some(value) = value {
                            dict.set("V", Object::string_literal(value.as_str()));
                        }
                    }
                    TestFieldKind::Checkbox { on_state } => {
                        let normal = states_dict(doc, on_state);
                        dict.set("FT", "Btn");
                        dict.set("V", "Off");
                        dict.set("AP", dictionary! { "N" => normal });
                        dict.set("AS", "Off");
                    }
                    TestFieldKind::BareToggle => dict.set("FT", "Btn"),
                    TestFieldKind::Signature => dict.set("FT", "Sig"),
                    TestFieldKind::Group(_) | TestFieldKind::Radio { .. } => {}
                }
                annots.push(Object::Reference(id));
            }
        }

        doc.objects.insert(id, Object::Dictionary(dict));
        id
    }
}
