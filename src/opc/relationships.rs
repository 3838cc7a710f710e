//! Package relationships: parsing, generation and ID allocation

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::schema::RELATIONSHIPS_NAMESPACE;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use urlencoding::decode;

use super::{attribute_map, emit};

/// One `<Relationship>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID, unique within its relationships part
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target part name as written
    pub target: String,
}

impl Relationship {
    /// Create a relationship
    pub fn new(
        id: impl Into<String>,
        rel_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            target: target.into(),
        }
    }

    /// Target resolved against the package root, percent-decoded and without leading slash
    ///
    /// Relationships of `_rels/.rels` have the package root as their source, so a
    /// relative target is already a part name.
    pub fn resolved_target(&self) -> String {
        let decoded = decode(&self.target)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| self.target.clone());
        normalize_part_name(&decoded)
    }
}

/// Drop the leading slash and resolve `.`/`..` segments
fn normalize_part_name(name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Parse a relationships part
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::PackageFormat(e.to_string()))?;

                if name_str.ends_with("Relationship") {
                    let attrs = attribute_map(e)?;
                    if let (Some(target), Some(rel_type)) = (attrs.get("Target"), attrs.get("Type"))
                    {
                        let id = attrs.get("Id").cloned().unwrap_or_default();
                        relationships.push(Relationship::new(id, rel_type.clone(), target.clone()));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::PackageFormat(format!(
                    "Relationships are not well-formed XML: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Serialize a relationships part
pub fn write_relationships(relationships: &[Relationship]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "relationships declaration",
    )?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NAMESPACE));
    emit(&mut writer, Event::Start(root), "Relationships element")?;

    for rel in relationships {
        let mut elem = BytesStart::new("Relationship");
        elem.push_attribute(("Target", rel.target.as_str()));
        elem.push_attribute(("Id", rel.id.as_str()));
        elem.push_attribute(("Type", rel.rel_type.as_str()));
        emit(&mut writer, Event::Empty(elem), "Relationship element")?;
    }

    emit(
        &mut writer,
        Event::End(BytesEnd::new("Relationships")),
        "Relationships element",
    )?;
    Ok(writer.into_inner())
}

/// Hands out `rel0`, `rel1`, … skipping IDs already in use
#[derive(Debug, Default)]
pub struct RelationshipIdGenerator {
    next: usize,
    taken: HashSet<String>,
}

impl RelationshipIdGenerator {
    /// Create a generator starting at `rel0`
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an ID as used
    pub fn reserve(&mut self, id: impl Into<String>) {
        self.taken.insert(id.into());
    }

    /// Next free ID
    pub fn next_id(&mut self) -> String {
        loop {
            let candidate = format!("rel{}", self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
