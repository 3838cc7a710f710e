//! XML writing for 3MF model files
//!
//! This module serializes a [`Model`] into the 3MF model part. Base materials are
//! written in the core namespace; `xmlns:t` is declared only when some mesh carries
//! triangle sets, and foreign namespaces read from the source document are declared
//! again so that passthrough resources stay well-formed.

mod core;
mod material;
mod triangle_sets;

use crate::error::{Error, Result};
use crate::model::{MetadataEntry, Model, PassthroughResource, Resources};
use crate::schema::Extension;
use quick_xml::{Reader, Writer};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write as IoWrite;

/// Write a Model to XML format
///
/// Vertex coordinates are written with `precision` digits after the decimal point.
/// The model is checked before anything is written: every mesh must reference only
/// existing, distinct vertices, every triangle set must be valid for its mesh and
/// every build item must name an object.
pub fn write_model_xml<W: IoWrite>(model: &Model, writer: W, precision: usize) -> Result<()> {
    for object in &model.resources.objects {
        object.mesh.validate().map_err(|e| match e {
            Error::Geometry(msg) => Error::Geometry(format!("object {}: {}", object.id, msg)),
            other => other,
        })?;
    }
    model.validate_build_references()?;

    let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);

    xml_writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut model_elem = BytesStart::new("model");
    model_elem.push_attribute(("unit", model.unit.as_str()));
    model_elem.push_attribute(("xml:lang", model.language.as_str()));
    model_elem.push_attribute(("xmlns", model.xmlns()));

    let with_sets = model.has_triangle_sets();
    let mut declared: Vec<&str> = Vec::new();
    if with_sets {
        let (name, uri) = Extension::TriangleSets.declaration();
        model_elem.push_attribute((name.as_str(), uri));
        declared.extend(Extension::TriangleSets.prefix());
    }
    for (prefix, uri) in &model.foreign_namespaces {
        if declared.contains(&prefix.as_str()) {
            continue;
        }
        declared.push(prefix.as_str());
        let name = format!("xmlns:{}", prefix);
        model_elem.push_attribute((name.as_str(), uri.as_str()));
    }

    xml_writer
        .write_event(Event::Start(model_elem))
        .map_err(|e| Error::xml_write(format!("Failed to write model element: {}", e)))?;

    for entry in &model.metadata {
        write_metadata(&mut xml_writer, entry)?;
    }

    write_resources(&mut xml_writer, &model.resources, precision)?;

    self::core::write_build(&mut xml_writer, &model.build)?;

    xml_writer
        .write_event(Event::End(BytesEnd::new("model")))
        .map_err(|e| Error::xml_write(format!("Failed to close model element: {}", e)))?;

    tracing::debug!(
        objects = model.resources.objects.len(),
        triangle_sets = with_sets,
        precision,
        "serialized 3MF model"
    );
    Ok(())
}

/// Write a metadata entry
fn write_metadata<W: IoWrite>(writer: &mut Writer<W>, entry: &MetadataEntry) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", entry.name.as_str()));

    if let Some(preserve) = entry.preserve {
        elem.push_attribute(("preserve", if preserve { "1" } else { "0" }));
    }

    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write metadata element: {}", e)))?;

    writer
        .write_event(Event::Text(BytesText::new(&entry.value)))
        .map_err(|e| Error::xml_write(format!("Failed to write metadata value: {}", e)))?;

    writer
        .write_event(Event::End(BytesEnd::new("metadata")))
        .map_err(|e| Error::xml_write(format!("Failed to close metadata element: {}", e)))?;

    Ok(())
}

/// Write resources section
///
/// Material groups come first so that objects only reference resources already
/// declared; passthrough resources follow in their original order, ahead of the
/// objects.
fn write_resources<W: IoWrite>(
    writer: &mut Writer<W>,
    resources: &Resources,
    precision: usize,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(|e| Error::xml_write(format!("Failed to write resources element: {}", e)))?;

    for group in &resources.base_material_groups {
        material::write_base_material_group(writer, group)?;
    }

    for passthrough in &resources.passthrough {
        write_passthrough(writer, passthrough)?;
    }

    for object in &resources.objects {
        self::core::write_object(writer, object, precision)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("resources")))
        .map_err(|e| Error::xml_write(format!("Failed to close resources element: {}", e)))?;

    Ok(())
}

/// Write a foreign resource captured by the parser
///
/// The stored XML is replayed event by event so that it is indented like the rest of
/// the document. Whitespace between its elements is dropped; everything else is kept.
fn write_passthrough<W: IoWrite>(
    writer: &mut Writer<W>,
    passthrough: &PassthroughResource,
) -> Result<()> {
    let mut reader = Reader::from_str(&passthrough.xml);
    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::xml_write(format!("Failed to read foreign resource: {}", e)))?;
        let event = match event {
            Event::Eof => break,
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => continue,
            Event::GeneralRef(name) => {
                let name = String::from_utf8_lossy(&name).into_owned();
                Event::Text(BytesText::from_escaped(format!("&{};", name)))
            }
            other => other,
        };
        writer
            .write_event(event)
            .map_err(|e| Error::xml_write(format!("Failed to write foreign resource: {}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BaseMaterial, BaseMaterialGroup, BuildItem, Object, PassthroughResource, Triangle,
        TriangleSet, Vertex,
    };

    fn tetrahedron(id: usize) -> Object {
        let mut object = Object::new(id);
        object.name = Some("Tet".to_string());
        object.mesh.vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(10.0, 0.0, 0.0),
            Vertex::new(0.0, 10.0, 0.0),
            Vertex::new(0.0, 0.0, 10.0),
        ];
        object.mesh.triangles = vec![
            Triangle::new(0, 2, 1),
            Triangle::new(0, 1, 3),
            Triangle::new(1, 2, 3),
            Triangle::new(0, 3, 2),
        ];
        object
    }

    fn to_string(model: &Model, precision: usize) -> Result<String> {
        let mut buffer = Vec::new();
        write_model_xml(model, &mut buffer, precision)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    #[test]
    fn test_no_trianglesets_namespace_without_sets() {
        let mut model = Model::new();
        model.resources.objects.push(tetrahedron(1));
        model.build.items.push(BuildItem::new(1));
        let xml = to_string(&model, 6).unwrap();
        assert!(xml.contains(
            r#"xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02""#
        ));
        assert!(!xml.contains("xmlns:t="));
        assert!(xml.contains(r#"<vertex x="10.000000" y="0.000000" z="0.000000"/>"#));
    }

    #[test]
    fn test_trianglesets_namespace_declared_with_sets() {
        let mut model = Model::new();
        let mut object = tetrahedron(1);
        object
            .mesh
            .triangle_sets
            .push(TriangleSet::with_triangles("Base", "ts_0", vec![0]));
        model.resources.objects.push(object);
        let xml = to_string(&model, 2).unwrap();
        assert!(xml.contains(
            r#"xmlns:t="http://schemas.microsoft.com/3dmanufacturing/trianglesets/2021/07""#
        ));
        assert!(xml.contains(r#"<t:ref index="0"/>"#));
        let triangles_end = xml.find("</triangles>").unwrap();
        let sets_start = xml.find("<t:trianglesets>").unwrap();
        assert!(sets_start > triangles_end);
    }

    #[test]
    fn test_base_materials_unprefixed() {
        let mut model = Model::new();
        let mut group = BaseMaterialGroup::new(1);
        group
            .materials
            .push(BaseMaterial::new("Red", (255, 0, 0, 255)));
        model.resources.base_material_groups.push(group);
        let mut object = tetrahedron(2);
        object.mesh.triangles[0] = Triangle::with_material(0, 2, 1, 1, 0);
        model.resources.objects.push(object);
        let xml = to_string(&model, 6).unwrap();
        assert!(xml.contains(r##"<base name="Red" displaycolor="#FF0000"/>"##));
        assert!(xml.contains(r#"<triangle v1="0" v2="2" v3="1" pid="1" p1="0"/>"#));
        assert!(xml.find("<basematerials").unwrap() < xml.find("<object").unwrap());
    }

    #[test]
    fn test_passthrough_written_indented() {
        let mut model = Model::new();
        model
            .foreign_namespaces
            .push(("x".to_string(), "urn:example:widgets".to_string()));
        model.resources.passthrough.push(PassthroughResource {
            id: Some(9),
            xml: r#"<x:widget id="9"> <x:coil turns="4"/><x:label>A &amp; B</x:label></x:widget>"#
                .to_string(),
        });
        model.resources.objects.push(tetrahedron(1));
        let xml = to_string(&model, 6).unwrap();
        assert!(xml.contains(r#"xmlns:x="urn:example:widgets""#));
        assert!(xml.contains(
            "  <resources>\n    <x:widget id=\"9\">\n      <x:coil turns=\"4\"/>\n      <x:label>A &amp; B</x:label>\n    </x:widget>\n    <object "
        ));
    }

    #[test]
    fn test_invalid_mesh_refused() {
        let mut model = Model::new();
        let mut object = tetrahedron(1);
        object.mesh.triangles.push(Triangle::new(0, 1, 9));
        model.resources.objects.push(object);
        assert!(matches!(to_string(&model, 6), Err(Error::Geometry(_))));
    }

    #[test]
    fn test_dangling_build_item_refused() {
        let mut model = Model::new();
        model.build.items.push(BuildItem::new(4));
        assert!(matches!(to_string(&model, 6), Err(Error::ModelSchema(_))));
    }
}
