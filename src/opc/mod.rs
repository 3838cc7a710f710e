//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard, containing
//! various parts including the main 3D model file and relationships.

mod content_types;
mod reader;
mod relationships;
mod writer;

use std::collections::HashMap;
use std::io::Write as IoWrite;

use crate::error::{Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

pub use content_types::ContentTypes;
pub use reader::Package;
pub use relationships::{
    Relationship, RelationshipIdGenerator, parse_relationships, write_relationships,
};
pub use writer::create_package;

/// Main 3D model file path within the 3MF archive
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// Attribute name → unescaped value
fn attribute_map(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::PackageFormat(e.to_string()))?;
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|e| Error::PackageFormat(e.to_string()))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|e| Error::XmlAttr(format!("{}: {}", key, e)))?;
        attrs.insert(key.to_string(), value.into_owned());
    }
    Ok(attrs)
}

/// Write one event, naming the element in the error
fn emit<W: IoWrite>(writer: &mut Writer<W>, event: Event<'_>, what: &str) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::package_write(format!("Failed to write {}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const MINIMAL_MODEL: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources/>
  <build/>
</model>"#;

    const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

    fn rels_targeting(target: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="{}" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#,
            target
        )
    }

    fn archive(parts: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_package_constants() {
        assert_eq!(MODEL_PATH, "3D/3dmodel.model");
        assert_eq!(CONTENT_TYPES_PATH, "[Content_Types].xml");
    }

    #[test]
    fn test_package_from_empty_zip() {
        let cursor = archive(&[]);
        let result = Package::open(cursor);
        assert!(matches!(result, Err(Error::PackageFormat(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let result = Package::open(Cursor::new(b"solid cube\nendsolid".to_vec()));
        assert!(matches!(result, Err(Error::PackageFormat(_))));
    }

    #[test]
    fn test_missing_content_types() {
        let rels = rels_targeting("/3D/3dmodel.model");
        let cursor = archive(&[
            (RELS_PATH, rels.as_bytes()),
            (MODEL_PATH, MINIMAL_MODEL),
        ]);
        let err = Package::open(cursor).err().unwrap();
        assert!(err.to_string().contains("[Content_Types].xml"));
    }

    #[test]
    fn test_model_target_absent() {
        let rels = rels_targeting("/3D/missing.model");
        let cursor = archive(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, rels.as_bytes()),
            (MODEL_PATH, MINIMAL_MODEL),
        ]);
        assert!(matches!(
            Package::open(cursor),
            Err(Error::PackageFormat(_))
        ));
    }

    #[test]
    fn test_percent_encoded_part_names() {
        let rels = rels_targeting("/2D/test%C3%86file.model");
        let cursor = archive(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, rels.as_bytes()),
            ("2D/testÆfile.model", MINIMAL_MODEL),
        ]);
        let mut package = Package::open(cursor).unwrap();
        assert_eq!(package.model_path(), "2D/testÆfile.model");
        assert_eq!(package.model_bytes().unwrap(), MINIMAL_MODEL);
    }

    #[test]
    fn test_utf8_in_xml_accepted_for_compatibility() {
        let rels = rels_targeting("/2D/testÆfile.model");
        let cursor = archive(&[
            (CONTENT_TYPES_PATH, CONTENT_TYPES),
            (RELS_PATH, rels.as_bytes()),
            ("2D/testÆfile.model", MINIMAL_MODEL),
        ]);
        assert!(Package::open(cursor).is_ok());
    }
}
