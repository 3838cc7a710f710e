//! Core element writing for 3MF model files
//!
//! Objects, meshes and build items.

use crate::error::{Error, Result};
use crate::model::{Build, Mesh, Object, Transform};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

use super::triangle_sets::write_triangle_sets;

/// Write an object
pub(super) fn write_object<W: IoWrite>(
    writer: &mut Writer<W>,
    object: &Object,
    precision: usize,
) -> Result<()> {
    let mut elem = BytesStart::new("object");
    elem.push_attribute(("id", object.id.to_string().as_str()));
    elem.push_attribute(("type", object.object_type.as_str()));

    if let Some(ref name) = object.name {
        elem.push_attribute(("name", name.as_str()));
    }
    if let Some(ref partnumber) = object.partnumber {
        elem.push_attribute(("partnumber", partnumber.as_str()));
    }

    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write object element: {}", e)))?;

    write_mesh(writer, &object.mesh, precision)?;

    writer
        .write_event(Event::End(BytesEnd::new("object")))
        .map_err(|e| Error::xml_write(format!("Failed to close object element: {}", e)))?;

    Ok(())
}

/// Write a mesh, its triangle sets last
fn write_mesh<W: IoWrite>(writer: &mut Writer<W>, mesh: &Mesh, precision: usize) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("mesh")))
        .map_err(|e| Error::xml_write(format!("Failed to write mesh element: {}", e)))?;

    writer
        .write_event(Event::Start(BytesStart::new("vertices")))
        .map_err(|e| Error::xml_write(format!("Failed to write vertices element: {}", e)))?;

    for vertex in &mesh.vertices {
        let mut v_elem = BytesStart::new("vertex");
        v_elem.push_attribute(("x", format_coordinate(vertex.x, precision).as_str()));
        v_elem.push_attribute(("y", format_coordinate(vertex.y, precision).as_str()));
        v_elem.push_attribute(("z", format_coordinate(vertex.z, precision).as_str()));
        writer
            .write_event(Event::Empty(v_elem))
            .map_err(|e| Error::xml_write(format!("Failed to write vertex element: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("vertices")))
        .map_err(|e| Error::xml_write(format!("Failed to close vertices element: {}", e)))?;

    writer
        .write_event(Event::Start(BytesStart::new("triangles")))
        .map_err(|e| Error::xml_write(format!("Failed to write triangles element: {}", e)))?;

    for triangle in &mesh.triangles {
        let mut t_elem = BytesStart::new("triangle");
        t_elem.push_attribute(("v1", triangle.v1.to_string().as_str()));
        t_elem.push_attribute(("v2", triangle.v2.to_string().as_str()));
        t_elem.push_attribute(("v3", triangle.v3.to_string().as_str()));

        if let (Some(pid), Some(p1)) = (triangle.pid, triangle.p1) {
            t_elem.push_attribute(("pid", pid.to_string().as_str()));
            t_elem.push_attribute(("p1", p1.to_string().as_str()));
            // p2/p3 only when they differ from p1
            if let Some(p2) = triangle.p2.filter(|&p| p != p1) {
                t_elem.push_attribute(("p2", p2.to_string().as_str()));
            }
            if let Some(p3) = triangle.p3.filter(|&p| p != p1) {
                t_elem.push_attribute(("p3", p3.to_string().as_str()));
            }
        }

        writer
            .write_event(Event::Empty(t_elem))
            .map_err(|e| Error::xml_write(format!("Failed to write triangle element: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("triangles")))
        .map_err(|e| Error::xml_write(format!("Failed to close triangles element: {}", e)))?;

    write_triangle_sets(writer, mesh)?;

    writer
        .write_event(Event::End(BytesEnd::new("mesh")))
        .map_err(|e| Error::xml_write(format!("Failed to close mesh element: {}", e)))?;

    Ok(())
}

/// Write the build section
pub(super) fn write_build<W: IoWrite>(writer: &mut Writer<W>, build: &Build) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("build")))
        .map_err(|e| Error::xml_write(format!("Failed to write build element: {}", e)))?;

    for item in &build.items {
        let mut elem = BytesStart::new("item");
        elem.push_attribute(("objectid", item.objectid.to_string().as_str()));

        if let Some(ref transform) = item.transform {
            elem.push_attribute(("transform", format_transform(transform).as_str()));
        }
        if let Some(ref partnumber) = item.partnumber {
            elem.push_attribute(("partnumber", partnumber.as_str()));
        }

        writer
            .write_event(Event::Empty(elem))
            .map_err(|e| Error::xml_write(format!("Failed to write item element: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("build")))
        .map_err(|e| Error::xml_write(format!("Failed to close build element: {}", e)))?;

    Ok(())
}

/// Fixed-point coordinate with `precision` digits; negative zero is written as zero
pub(crate) fn format_coordinate(value: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    match text.strip_prefix('-') {
        Some(magnitude) if magnitude.bytes().all(|b| b == b'0' || b == b'.') => {
            magnitude.to_string()
        }
        _ => text,
    }
}

/// Twelve space-separated values in 3MF order
pub(crate) fn format_transform(transform: &Transform) -> String {
    transform
        .values()
        .iter()
        .map(|v| if *v == 0.0 { "0".to_string() } else { v.to_string() })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(1.0, 4), "1.0000");
        assert_eq!(format_coordinate(-0.00001, 4), "0.0000");
        assert_eq!(format_coordinate(-2.5, 2), "-2.50");
        assert_eq!(format_coordinate(3.14159, 0), "3");
    }

    #[test]
    fn test_format_transform() {
        let t = Transform::from_values([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 10.5, -0.0, 3.0]);
        assert_eq!(format_transform(&t), "1 0 0 0 1 0 0 0 1 10.5 0 3");
    }
}
