//! Minimal slot templates: `{{name}}` placeholders in static markup, parsed
//! once and rendered many times.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed slot at byte {0}")]
    Unclosed(usize),
    #[error("empty slot name at byte {0}")]
    EmptySlot(usize),
    #[error("no value for slot {0:?}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(&'static str),
    Slot(&'static str),
}

/// A value for one slot.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    /// Untrusted text, HTML-escaped on output.
    Text(&'a str),
    /// Markup rendered by the relay itself, inserted as is.
    Html(&'a str),
}

#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split the source into literal text and named slots.
    ///
    /// # Errors
    /// Returns an error on an unclosed `{{` or an empty slot name.
    pub fn compile(source: &'static str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(&rest[..open]));
            }
            let after = &rest[open + 2..];
            let close = after
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + open))?;
            let name = after[..close].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptySlot(offset + open));
            }
            segments.push(Segment::Slot(name));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest));
        }

        Ok(Self { segments })
    }

    /// Slot names in order of appearance.
    pub fn slots(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(name) => Some(*name),
            Segment::Text(_) => None,
        })
    }

    /// Fill every slot from `values`.
    ///
    /// # Errors
    /// Returns `TemplateError::Missing` if a slot has no value.
    pub fn render(&self, values: &[(&str, Value<'_>)]) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| *value)
                        .ok_or(TemplateError::Missing(*name))?;
                    match value {
                        Value::Text(text) => escape_into(&mut out, text),
                        Value::Html(html) => out.push_str(html),
                    }
                }
            }
        }
        Ok(out)
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
