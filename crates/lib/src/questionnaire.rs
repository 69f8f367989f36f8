//! # Questionnaire Model
//!
//! A small structured representation of form questions (text, blanks, and choices)
//! that renders to the plain-text layout used in prompts and follow-up lists.
//!
//! ```text
//! 1. Medical Condition
//! ____
//! Prognosis - condition is likely to:
//! [ ] improve
//! [v] deteriorate
//! [x] unknown, please specify (mm/dd/yyyy) ____
//! ```

use crate::types::{FieldDescriptor, FieldKind};
use std::fmt;

/// A fill-in blank, optionally with a hint about the expected format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blank {
    pub value: Option<String>,
    pub prompt: String,
}

impl Blank {
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            value: None,
            prompt: prompt.into(),
        }
    }
}

impl fmt::Display for Blank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prompt.is_empty() {
            write!(f, "({}) ", self.prompt)?;
        }
        match self.value.as_deref() {
            Some(value) if !value.is_empty() => f.write_str(value),
            _ => f.write_str("____"),
        }
    }
}

/// One option of a [`Choice`].
///
/// `selected` is tri-state: `Some(true)` renders `[v]`, `Some(false)` renders `[x]`
/// (explicitly ruled out), `None` renders `[ ]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceOption {
    pub description: String,
    pub blank: Option<Blank>,
    pub selected: Option<bool>,
}

impl ChoiceOption {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_blank(mut self, blank: Blank) -> Self {
        self.blank = Some(blank);
        self
    }
}

impl fmt::Display for ChoiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.selected {
            Some(true) => "[v] ",
            Some(false) => "[x] ",
            None => "[ ] ",
        };
        write!(f, "{mark}{}", self.description)?;
        if let Some(blank) = &self.blank {
            write!(f, " {blank}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prompt)?;
        for option in &self.options {
            write!(f, "\n{option}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionItem {
    Text(String),
    Blank(Blank),
    Choice(Choice),
}

impl fmt::Display for QuestionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionItem::Text(text) => f.write_str(text),
            QuestionItem::Blank(blank) => write!(f, "{blank}"),
            QuestionItem::Choice(choice) => write!(f, "{choice}"),
        }
    }
}

/// A question rendered item by item, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
    pub items: Vec<QuestionItem>,
}

impl Question {
    pub fn new(items: Vec<QuestionItem>) -> Self {
        Self { items }
    }

    /// Builds the question a form field asks, answered with its current value.
    ///
    /// Text fields and toggles without known states become a blank; toggles with
    /// states become a choice with the current state selected. Unsupported fields
    /// have no question.
    pub fn for_field(field: &FieldDescriptor, current: Option<&str>) -> Option<Self> {
        let blank = || {
            QuestionItem::Blank(Blank {
                value: current.map(str::to_string),
                prompt: String::new(),
            })
        };

        let items = match (&field.kind, &field.allowed_values) {
            (FieldKind::Text, _) | (FieldKind::Toggle, None) => {
                vec![QuestionItem::Text(field.name.clone()), blank()]
            }
            (FieldKind::Toggle, Some(states)) => vec![QuestionItem::Choice(Choice {
                prompt: field.name.clone(),
                options: states
                    .iter()
                    .map(|state| ChoiceOption {
                        selected: (current == Some(state.as_str())).then_some(true),
                        ..ChoiceOption::new(state.clone())
                    })
                    .collect(),
            })],
            (FieldKind::Unsupported(_), _) => return None,
        };
        Some(Self::new(items))
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}
