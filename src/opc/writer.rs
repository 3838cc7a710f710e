//! Package writing functionality for creating 3MF files

use std::io::{Seek, Write};

use crate::error::{Error, Result};
use crate::model::Attachment;
use crate::schema::{MODEL_CONTENT_TYPE, MODEL_REL_TYPE};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::content_types::ContentTypes;
use super::relationships::{Relationship, RelationshipIdGenerator, write_relationships};
use super::{CONTENT_TYPES_PATH, MODEL_PATH, RELS_PATH};

/// Create a 3MF package (ZIP archive) from model data
///
/// This function creates a complete 3MF file including:
/// - `[Content_Types].xml`
/// - `_rels/.rels`
/// - `3D/3dmodel.model`
/// - every attachment, declared in the content types and, when it carries a
///   relationship type, in `_rels/.rels`
///
/// Every part is deflate-compressed. Returns the writer after finishing the archive.
pub fn create_package<W: Write + Seek>(
    writer: W,
    model_xml: &[u8],
    attachments: &[Attachment],
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let attachments: Vec<&Attachment> = attachments
        .iter()
        .filter(|a| !is_reserved_part(&a.path))
        .collect();

    let mut content_types = ContentTypes::for_3mf();
    content_types.declare(MODEL_PATH, MODEL_CONTENT_TYPE);
    for attachment in &attachments {
        content_types.declare(&attachment.path, &attachment.content_type);
    }

    let mut ids = RelationshipIdGenerator::new();
    let mut relationships = vec![Relationship::new(
        ids.next_id(),
        MODEL_REL_TYPE,
        format!("/{}", MODEL_PATH),
    )];
    for attachment in &attachments {
        if let Some(rel_type) = &attachment.relationship_type {
            relationships.push(Relationship::new(
                ids.next_id(),
                rel_type.clone(),
                format!("/{}", attachment.path),
            ));
        }
    }

    write_part(&mut zip, options, CONTENT_TYPES_PATH, &content_types.to_xml()?)?;
    write_part(&mut zip, options, RELS_PATH, &write_relationships(&relationships)?)?;
    write_part(&mut zip, options, MODEL_PATH, model_xml)?;
    for attachment in &attachments {
        write_part(&mut zip, options, &attachment.path, &attachment.data)?;
    }

    let writer = zip
        .finish()
        .map_err(|e| Error::package_write(format!("Failed to finalize ZIP archive: {}", e)))?;

    tracing::debug!(
        attachments = attachments.len(),
        model_bytes = model_xml.len(),
        "wrote 3MF package"
    );
    Ok(writer)
}

/// Parts the writer always generates itself
fn is_reserved_part(path: &str) -> bool {
    let reserved = [CONTENT_TYPES_PATH, RELS_PATH, MODEL_PATH];
    let skip = reserved.iter().any(|r| r.eq_ignore_ascii_case(path));
    if skip {
        tracing::warn!(part = %path, "attachment collides with a generated part, skipped");
    }
    skip
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    data: &[u8],
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::package_write(format!("Failed to create {}: {}", name, e)))?;
    zip.write_all(data)
        .map_err(|e| Error::package_write(format!("Failed to write {}: {}", name, e)))?;
    Ok(())
}
