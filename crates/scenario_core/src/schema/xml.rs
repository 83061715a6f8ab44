//! Minimal path-indexed view of an XML document.
//!
//! Element paths are relative to the root element, joined with `/`
//! (`Market/Currencies/Currency`).

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};

use crate::types::SchemaError;

#[derive(Debug, Default)]
pub(crate) struct XmlNodes {
    present: HashSet<String>,
    texts: HashMap<String, Vec<String>>,
}

impl XmlNodes {
    pub(crate) fn parse(xml: &str) -> Result<Self, SchemaError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<String> = Vec::new();
        let mut nodes = XmlNodes::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    nodes.present.insert(relative_path(&stack));
                }
                Ok(Event::Empty(e)) => {
                    stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    nodes.present.insert(relative_path(&stack));
                    stack.pop();
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| SchemaError::Xml(e.to_string()))?
                        .into_owned();
                    nodes
                        .texts
                        .entry(relative_path(&stack))
                        .or_default()
                        .push(text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(SchemaError::Xml(format!(
                        "at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        if !stack.is_empty() {
            return Err(SchemaError::Xml(format!("unclosed element <{}>", stack.join("/"))));
        }

        Ok(nodes)
    }

    pub(crate) fn is_present(&self, path: &str) -> bool {
        self.present.contains(path)
    }

    /// Fails with `MissingNode` unless `path` exists.
    pub(crate) fn require(&self, path: &str) -> Result<(), SchemaError> {
        if self.is_present(path) {
            Ok(())
        } else {
            Err(SchemaError::MissingNode(path.to_string()))
        }
    }

    /// First text of `path`, trimmed.
    pub(crate) fn text(&self, path: &str) -> Option<&str> {
        self.texts
            .get(path)
            .and_then(|texts| texts.first())
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// Comma-separated entries of the first text at `path`.
    pub(crate) fn list(&self, path: &str) -> Vec<String> {
        self.text(path).map(split_entries).unwrap_or_default()
    }

    /// Entries of every element at `path`, each possibly comma-separated.
    pub(crate) fn elements(&self, path: &str) -> Vec<String> {
        self.texts
            .get(path)
            .map(|texts| texts.iter().flat_map(|t| split_entries(t)).collect())
            .unwrap_or_default()
    }
}

fn relative_path(stack: &[String]) -> String {
    stack.get(1..).map(|rest| rest.join("/")).unwrap_or_default()
}

pub(crate) fn split_entries(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
