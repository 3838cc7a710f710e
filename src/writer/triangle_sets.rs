//! Triangle Sets extension writing
//!
//! Sets are always written in the namespaced layout: `<t:trianglesets>` after
//! `<triangles>`, an `identifier` on every set and one `<t:ref index="N"/>` per member
//! in stored order. Meshes read from the older unnamespaced layout are upgraded.

use crate::error::{Error, Result};
use crate::model::{Mesh, validate_triangle_sets};
use crate::schema::{Extension, element};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

/// Write the triangle sets of `mesh`, if any
///
/// Fails with [`Error::ExtensionEncoding`] when a set has an empty identifier,
/// reuses one, or references a triangle the mesh does not have.
pub(super) fn write_triangle_sets<W: IoWrite>(writer: &mut Writer<W>, mesh: &Mesh) -> Result<()> {
    if mesh.triangle_sets.is_empty() {
        return Ok(());
    }
    validate_triangle_sets(&mesh.triangle_sets, mesh.triangles.len())?;

    let ts = Extension::TriangleSets;
    let container = ts.qualify(element::TRIANGLESETS);
    let set_name = ts.qualify(element::TRIANGLESET);
    let ref_name = ts.qualify(element::REF);

    writer
        .write_event(Event::Start(BytesStart::new(container.as_str())))
        .map_err(|e| Error::xml_write(format!("Failed to write trianglesets element: {}", e)))?;

    for set in &mesh.triangle_sets {
        let mut elem = BytesStart::new(set_name.as_str());
        elem.push_attribute(("name", set.name.as_str()));
        elem.push_attribute(("identifier", set.identifier.as_str()));

        if set.is_empty() {
            tracing::warn!(
                name = %set.name,
                identifier = %set.identifier,
                "writing triangle set without members"
            );
            writer
                .write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(format!("Failed to write triangleset element: {}", e)))?;
            continue;
        }

        writer
            .write_event(Event::Start(elem))
            .map_err(|e| Error::xml_write(format!("Failed to write triangleset element: {}", e)))?;

        for index in &set.triangles {
            let mut r = BytesStart::new(ref_name.as_str());
            r.push_attribute(("index", index.to_string().as_str()));
            writer
                .write_event(Event::Empty(r))
                .map_err(|e| Error::xml_write(format!("Failed to write ref element: {}", e)))?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(set_name.as_str())))
            .map_err(|e| Error::xml_write(format!("Failed to close triangleset element: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(container.as_str())))
        .map_err(|e| Error::xml_write(format!("Failed to close trianglesets element: {}", e)))?;
    Ok(())
}
