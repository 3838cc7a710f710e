//! `[Content_Types].xml` parsing and generation

use crate::error::{Error, Result};
use crate::schema::{CONTENT_TYPES_NAMESPACE, MODEL_CONTENT_TYPE, RELATIONSHIPS_CONTENT_TYPE};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::{attribute_map, emit};

/// Content type declarations of a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// `(extension, content type)` pairs, extension lowercased
    pub defaults: Vec<(String, String)>,
    /// `(part name, content type)` pairs, part name without leading slash
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// The declarations every 3MF package needs: `rels` and `model`
    pub fn for_3mf() -> Self {
        Self {
            defaults: vec![
                ("rels".to_string(), RELATIONSHIPS_CONTENT_TYPE.to_string()),
                ("model".to_string(), MODEL_CONTENT_TYPE.to_string()),
            ],
            overrides: Vec::new(),
        }
    }

    /// Parse `[Content_Types].xml`
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut types = Self::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| Error::PackageFormat(e.to_string()))?;
                    let attrs = attribute_map(e)?;

                    if name_str.ends_with("Default") {
                        if let (Some(ext), Some(ct)) =
                            (attrs.get("Extension"), attrs.get("ContentType"))
                        {
                            types.defaults.push((ext.to_ascii_lowercase(), ct.clone()));
                        }
                    } else if name_str.ends_with("Override")
                        && let (Some(part), Some(ct)) =
                            (attrs.get("PartName"), attrs.get("ContentType"))
                    {
                        types
                            .overrides
                            .push((part.trim_start_matches('/').to_string(), ct.clone()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::PackageFormat(format!(
                        "Content types are not well-formed XML: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Content type registered for a file extension
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, ct)| ct.as_str())
    }

    /// Content type of a part, overrides first
    pub fn content_type_of(&self, part: &str) -> Option<&str> {
        let part = part.trim_start_matches('/');
        if let Some((_, ct)) = self
            .overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(part))
        {
            return Some(ct.as_str());
        }
        let file_name = part.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        self.default_for(ext)
    }

    /// True when some declaration maps to the 3D model content type
    pub fn declares_model(&self) -> bool {
        self.defaults
            .iter()
            .chain(self.overrides.iter())
            .any(|(_, ct)| ct == MODEL_CONTENT_TYPE)
    }

    /// Declare `part` so that it resolves to `content_type`
    ///
    /// Adds a default for the part's extension when the extension is new, otherwise an
    /// override if the existing default disagrees.
    pub fn declare(&mut self, part: &str, content_type: &str) {
        if self.content_type_of(part) == Some(content_type) {
            return;
        }
        let part = part.trim_start_matches('/');
        let extension = part
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if self.default_for(&ext).is_none() => {
                self.defaults.push((ext, content_type.to_string()));
            }
            _ => {
                self.overrides
                    .push((part.to_string(), content_type.to_string()));
            }
        }
    }

    /// Serialize as `[Content_Types].xml`
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
            "content types declaration",
        )?;

        let mut types = BytesStart::new("Types");
        types.push_attribute(("xmlns", CONTENT_TYPES_NAMESPACE));
        emit(&mut writer, Event::Start(types), "Types element")?;

        for (ext, ct) in &self.defaults {
            let mut elem = BytesStart::new("Default");
            elem.push_attribute(("Extension", ext.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            emit(&mut writer, Event::Empty(elem), "Default element")?;
        }

        for (part, ct) in &self.overrides {
            let part_name = format!("/{}", part);
            let mut elem = BytesStart::new("Override");
            elem.push_attribute(("PartName", part_name.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            emit(&mut writer, Event::Empty(elem), "Override element")?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("Types")), "Types element")?;
        Ok(writer.into_inner())
    }
}
