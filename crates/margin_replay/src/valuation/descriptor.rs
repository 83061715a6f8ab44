//! Margin job descriptor editing.
//!
//! The descriptor is an XML document owned by the valuation service. Its
//! settings are `<Parameter name="...">value</Parameter>` elements; the
//! replay only ever rewrites the text of such elements and passes every
//! other event through unchanged.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use scenario_core::types::Date;

use super::ValuationError;

/// Parameter holding the valuation date.
pub const ASOF_PARAMETER: &str = "asofDate";
/// Parameter holding the market data file path.
pub const MARKET_DATA_PARAMETER: &str = "marketDataFile";
/// Parameter holding the fixing file path.
pub const FIXING_DATA_PARAMETER: &str = "fixingDataFile";
/// Parameter holding the report directory.
pub const OUTPUT_PATH_PARAMETER: &str = "outputPath";

const PARAMETER_ELEMENT: &[u8] = b"Parameter";

/// In-memory job descriptor bound to the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    path: PathBuf,
    xml: String,
}

impl JobDescriptor {
    /// Reads a descriptor file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ValuationError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| ValuationError::io(path, e))?;
        Ok(Self::from_xml(path, xml))
    }

    /// Wraps descriptor text that belongs at `path`.
    pub fn from_xml(path: impl Into<PathBuf>, xml: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            xml: xml.into(),
        }
    }

    /// File the descriptor is saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document text.
    pub fn as_xml(&self) -> &str {
        &self.xml
    }

    /// Text of parameter `name`; `None` when it is not declared.
    pub fn parameter(&self, name: &str) -> Result<Option<String>, ValuationError> {
        let mut reader = Reader::from_str(&self.xml);
        let mut value: Option<String> = None;
        let mut in_target = false;

        loop {
            match reader.read_event().map_err(|e| self.malformed(e))? {
                Event::Start(e) => {
                    if self.is_parameter(&e, name)? {
                        in_target = true;
                        value = Some(String::new());
                    }
                }
                Event::Empty(e) => {
                    if self.is_parameter(&e, name)? {
                        return Ok(Some(String::new()));
                    }
                }
                Event::Text(t) if in_target => {
                    let text = t.unescape().map_err(|e| self.malformed(e))?;
                    if let Some(v) = value.as_mut() {
                        v.push_str(&text);
                    }
                }
                Event::End(_) if in_target => {
                    return Ok(value.map(|v| v.trim().to_string()));
                }
                Event::Eof => return Ok(value),
                _ => {}
            }
        }
    }

    /// The descriptor's as-of date.
    pub fn asof(&self) -> Result<Date, ValuationError> {
        let text = self
            .parameter(ASOF_PARAMETER)?
            .ok_or_else(|| self.missing(ASOF_PARAMETER))?;
        Date::parse(&text).map_err(|e| ValuationError::Descriptor {
            path: self.path.display().to_string(),
            message: format!("{} '{}': {}", ASOF_PARAMETER, text, e),
        })
    }

    /// Overwrites the as-of date.
    pub fn set_asof(&mut self, asof: Date) -> Result<(), ValuationError> {
        self.set_parameter(ASOF_PARAMETER, &asof.to_string())
    }

    /// Overwrites the text of the first parameter called `name`.
    ///
    /// # Errors
    ///
    /// `ValuationError::MissingParameter` when the descriptor does not
    /// declare it; parameters are never added.
    pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), ValuationError> {
        let mut reader = Reader::from_str(&self.xml);
        let mut writer = Writer::new(Vec::with_capacity(self.xml.len()));
        let mut found = false;
        let mut in_target = false;
        let mut replaced = false;

        loop {
            let event = reader.read_event().map_err(|e| self.malformed(e))?;
            match event {
                Event::Start(e) => {
                    if !found && self.is_parameter(&e, name)? {
                        found = true;
                        in_target = true;
                    }
                    self.write(&mut writer, Event::Start(e))?;
                }
                Event::Empty(e) => {
                    if !found && self.is_parameter(&e, name)? {
                        found = true;
                        let end = e.to_end().into_owned();
                        self.write(&mut writer, Event::Start(e.borrow()))?;
                        self.write(&mut writer, Event::Text(BytesText::new(value)))?;
                        self.write(&mut writer, Event::End(end))?;
                    } else {
                        self.write(&mut writer, Event::Empty(e))?;
                    }
                }
                Event::Text(_) | Event::CData(_) if in_target => {
                    if !replaced {
                        self.write(&mut writer, Event::Text(BytesText::new(value)))?;
                        replaced = true;
                    }
                }
                Event::End(e) => {
                    if in_target {
                        if !replaced {
                            self.write(&mut writer, Event::Text(BytesText::new(value)))?;
                        }
                        in_target = false;
                    }
                    self.write(&mut writer, Event::End(e))?;
                }
                Event::Eof => break,
                other => self.write(&mut writer, other)?,
            }
        }

        if !found {
            return Err(self.missing(name));
        }

        self.xml = String::from_utf8(writer.into_inner()).map_err(|e| ValuationError::Descriptor {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Writes the document back to its own path.
    pub fn save(&self) -> Result<(), ValuationError> {
        std::fs::write(&self.path, &self.xml).map_err(|e| ValuationError::io(&self.path, e))
    }

    /// Rebinds the descriptor to `path` and writes it there.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), ValuationError> {
        self.path = path.into();
        self.save()
    }

    fn is_parameter(&self, element: &BytesStart<'_>, name: &str) -> Result<bool, ValuationError> {
        if element.local_name().as_ref() != PARAMETER_ELEMENT {
            return Ok(false);
        }
        match element
            .try_get_attribute("name")
            .map_err(|e| self.malformed(e))?
        {
            Some(attr) => Ok(attr.unescape_value().map_err(|e| self.malformed(e))? == name),
            None => Ok(false),
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ValuationError> {
        writer.write_event(event).map_err(|e| self.malformed(e))
    }

    fn malformed(&self, error: impl std::fmt::Display) -> ValuationError {
        ValuationError::Descriptor {
            path: self.path.display().to_string(),
            message: error.to_string(),
        }
    }

    fn missing(&self, name: &str) -> ValuationError {
        ValuationError::MissingParameter {
            path: self.path.display().to_string(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORE_XML: &str = r#"<?xml version="1.0"?>
<ORE>
  <Setup>
    <Parameter name="asofDate">2025-01-01</Parameter>
    <Parameter name="inputPath">Input</Parameter>
    <Parameter name="outputPath">Output</Parameter>
    <Parameter name="marketDataFile"/>
    <!-- keep me -->
  </Setup>
  <Analytics>
    <Analytic type="simm">
      <Parameter name="active">Y</Parameter>
    </Analytic>
  </Analytics>
</ORE>
"#;

    fn descriptor() -> JobDescriptor {
        JobDescriptor::from_xml("ore.xml", ORE_XML)
    }

    #[test]
    fn test_read_asof() {
        assert_eq!(descriptor().asof().unwrap(), Date::from_ymd(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_set_asof_only_touches_that_parameter() {
        let mut d = descriptor();
        d.set_asof(Date::from_ymd(2025, 4, 1).unwrap()).unwrap();
        assert_eq!(d.asof().unwrap(), Date::from_ymd(2025, 4, 1).unwrap());
        assert_eq!(d.as_xml(), ORE_XML.replace("2025-01-01", "2025-04-01"));
    }

    #[test]
    fn test_set_empty_parameter() {
        let mut d = descriptor();
        d.set_parameter(MARKET_DATA_PARAMETER, "/tmp/w1/market.txt").unwrap();
        assert_eq!(
            d.parameter(MARKET_DATA_PARAMETER).unwrap().as_deref(),
            Some("/tmp/w1/market.txt")
        );
        assert_eq!(d.parameter("outputPath").unwrap().as_deref(), Some("Output"));
        assert!(d.as_xml().contains("<!-- keep me -->"));
    }

    #[test]
    fn test_missing_parameter() {
        let mut d = descriptor();
        assert!(d.parameter(FIXING_DATA_PARAMETER).unwrap().is_none());
        assert!(matches!(
            d.set_parameter(FIXING_DATA_PARAMETER, "fixings.txt"),
            Err(ValuationError::MissingParameter { name, .. }) if name == FIXING_DATA_PARAMETER
        ));
    }

    #[test]
    fn test_bad_asof_text() {
        let d = JobDescriptor::from_xml(
            "ore.xml",
            r#"<ORE><Setup><Parameter name="asofDate">soon</Parameter></Setup></ORE>"#,
        );
        assert!(matches!(d.asof(), Err(ValuationError::Descriptor { .. })));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = descriptor();
        d.set_asof(Date::from_ymd(2026, 1, 1).unwrap()).unwrap();
        d.save_as(dir.path().join("ore.xml")).unwrap();
        let reloaded = JobDescriptor::load(dir.path().join("ore.xml")).unwrap();
        assert_eq!(reloaded.asof().unwrap(), Date::from_ymd(2026, 1, 1).unwrap());
    }
}
