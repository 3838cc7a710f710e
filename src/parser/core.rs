//! Core 3MF element parsing
//!
//! Objects, vertices, triangles, build items and transforms. Each function reads one
//! element's attributes; unknown attributes are ignored.

use crate::error::{Error, Result};
use crate::model::{BuildItem, Object, ObjectType, TRANSFORM_MATRIX_SIZE, Transform, Triangle, Vertex};
use quick_xml::events::BytesStart;

use super::parse_attributes;

/// Object attributes together with the object-level default material
#[derive(Debug)]
pub(super) struct ObjectHeader {
    pub object: Object,
    /// `pid`/`pindex` applied to triangles that carry no material of their own
    pub default_material: Option<(usize, usize)>,
}

/// Parse object element attributes
pub(super) fn parse_object(e: &BytesStart) -> Result<ObjectHeader> {
    let attrs = parse_attributes(e)?;

    let id = attrs
        .get("id")
        .ok_or_else(|| Error::missing_attribute("object", "id"))?;
    let id = id
        .parse::<usize>()
        .map_err(|_| Error::parse_error_with_context("object id", id, "non-negative integer"))?;

    let mut object = Object::new(id);
    object.name = attrs.get("name").cloned();
    object.partnumber = attrs.get("partnumber").cloned();
    if let Some(type_str) = attrs.get("type") {
        object.object_type = type_str.parse::<ObjectType>()?;
    }

    let default_material = match (attrs.get("pid"), attrs.get("pindex")) {
        (Some(pid), Some(pindex)) => Some((pid.parse::<usize>()?, pindex.parse::<usize>()?)),
        (Some(pid), None) => Some((pid.parse::<usize>()?, 0)),
        _ => None,
    };

    Ok(ObjectHeader {
        object,
        default_material,
    })
}

/// Parse vertex element attributes
pub(super) fn parse_vertex(e: &BytesStart) -> Result<Vertex> {
    // Hot path: read attributes directly without building a map
    let mut x_opt: Option<f64> = None;
    let mut y_opt: Option<f64> = None;
    let mut z_opt: Option<f64> = None;

    let parse_f64 = |field: &str, value: &[u8]| -> Result<f64> {
        let value_str = std::str::from_utf8(value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        value_str.trim().parse::<f64>().map_err(|_| {
            Error::parse_error_with_context(field, value_str, "floating-point number")
        })
    };

    for attr_result in e.attributes() {
        let attr = attr_result?;
        match attr.key.as_ref() {
            b"x" => x_opt = Some(parse_f64("vertex x coordinate", &attr.value)?),
            b"y" => y_opt = Some(parse_f64("vertex y coordinate", &attr.value)?),
            b"z" => z_opt = Some(parse_f64("vertex z coordinate", &attr.value)?),
            _ => {}
        }
    }

    let x = x_opt.ok_or_else(|| Error::missing_attribute("vertex", "x"))?;
    let y = y_opt.ok_or_else(|| Error::missing_attribute("vertex", "y"))?;
    let z = z_opt.ok_or_else(|| Error::missing_attribute("vertex", "z"))?;

    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return Err(Error::Geometry(format!(
            "Vertex coordinates must be finite (got {} {} {})",
            x, y, z
        )));
    }

    Ok(Vertex::new(x, y, z))
}

/// Parse triangle element attributes
///
/// Vertex indices are checked against the mesh later, once every vertex is known.
pub(super) fn parse_triangle(e: &BytesStart) -> Result<Triangle> {
    let mut v1_opt: Option<usize> = None;
    let mut v2_opt: Option<usize> = None;
    let mut v3_opt: Option<usize> = None;
    let mut pid_opt: Option<usize> = None;
    let mut p1_opt: Option<usize> = None;
    let mut p2_opt: Option<usize> = None;
    let mut p3_opt: Option<usize> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let key = attr.key.as_ref();
        let slot = match key {
            b"v1" => &mut v1_opt,
            b"v2" => &mut v2_opt,
            b"v3" => &mut v3_opt,
            b"pid" => &mut pid_opt,
            b"p1" => &mut p1_opt,
            b"p2" => &mut p2_opt,
            b"p3" => &mut p3_opt,
            _ => continue,
        };
        let value_str =
            std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        let field = std::str::from_utf8(key).unwrap_or("index");
        *slot = Some(value_str.trim().parse::<usize>().map_err(|_| {
            Error::Geometry(format!(
                "Triangle attribute {}='{}' is not a non-negative integer",
                field, value_str
            ))
        })?);
    }

    let v1 = v1_opt.ok_or_else(|| Error::Geometry("Triangle missing v1 attribute".to_string()))?;
    let v2 = v2_opt.ok_or_else(|| Error::Geometry("Triangle missing v2 attribute".to_string()))?;
    let v3 = v3_opt.ok_or_else(|| Error::Geometry("Triangle missing v3 attribute".to_string()))?;

    let mut triangle = Triangle::new(v1, v2, v3);
    triangle.pid = pid_opt;
    triangle.p1 = p1_opt;
    triangle.p2 = p2_opt;
    triangle.p3 = p3_opt;
    Ok(triangle)
}

/// Parse build item element attributes
pub(super) fn parse_build_item(e: &BytesStart) -> Result<BuildItem> {
    let attrs = parse_attributes(e)?;

    let objectid = attrs
        .get("objectid")
        .ok_or_else(|| Error::missing_attribute("item", "objectid"))?;
    let objectid = objectid.parse::<usize>().map_err(|_| {
        Error::parse_error_with_context("item objectid", objectid, "non-negative integer")
    })?;

    let mut item = BuildItem::new(objectid);
    item.partnumber = attrs.get("partnumber").cloned();
    if let Some(transform) = attrs.get("transform") {
        item.transform = Some(parse_transform(transform)?);
    }
    Ok(item)
}

/// Parse the twelve space-separated numbers of a `transform` attribute
pub(super) fn parse_transform(value: &str) -> Result<Transform> {
    let parsed: Vec<f64> = value
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| Error::parse_error_with_context("transform", s, "floating-point number"))
        })
        .collect::<Result<_>>()?;

    let values: [f64; TRANSFORM_MATRIX_SIZE] = parsed.as_slice().try_into().map_err(|_| {
        Error::ModelSchema(format!(
            "Transform must have {} values, got {}",
            TRANSFORM_MATRIX_SIZE,
            parsed.len()
        ))
    })?;

    let transform = Transform::from_values(values);
    if !transform.is_finite() {
        return Err(Error::ModelSchema(format!(
            "Transform values must be finite: '{}'",
            value
        )));
    }
    Ok(transform)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(xml: &str) -> BytesStart<'static> {
        let mut reader = quick_xml::Reader::from_str(xml);
        match reader.read_event().unwrap() {
            quick_xml::events::Event::Empty(e) | quick_xml::events::Event::Start(e) => {
                e.into_owned()
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_object_with_default_material() {
        let header =
            parse_object(&start(r#"<object id="3" type="support" name="Cube" pid="1" pindex="2"/>"#))
                .unwrap();
        assert_eq!(header.object.id, 3);
        assert_eq!(header.object.object_type, ObjectType::Support);
        assert_eq!(header.object.name.as_deref(), Some("Cube"));
        assert_eq!(header.default_material, Some((1, 2)));
    }

    #[test]
    fn test_parse_object_requires_id() {
        let err = parse_object(&start(r#"<object type="model"/>"#)).unwrap_err();
        assert!(matches!(err, Error::ModelSchema(_)));
    }

    #[test]
    fn test_parse_vertex() {
        let v = parse_vertex(&start(r#"<vertex x="1.5" y="-2" z="3e1"/>"#)).unwrap();
        assert_eq!(v, Vertex::new(1.5, -2.0, 30.0));
    }

    #[test]
    fn test_parse_vertex_rejects_garbage() {
        assert!(parse_vertex(&start(r#"<vertex x="1,5" y="0" z="0"/>"#)).is_err());
        assert!(parse_vertex(&start(r#"<vertex x="1" y="0"/>"#)).is_err());
        assert!(matches!(
            parse_vertex(&start(r#"<vertex x="NaN" y="0" z="0"/>"#)),
            Err(Error::Geometry(_))
        ));
    }

    #[test]
    fn test_parse_triangle_with_material() {
        let t = parse_triangle(&start(r#"<triangle v1="0" v2="1" v3="2" pid="5" p1="3"/>"#))
            .unwrap();
        assert_eq!(t.indices(), [0, 1, 2]);
        assert_eq!(t.material_indices(), Some([3, 3, 3]));
    }

    #[test]
    fn test_parse_triangle_negative_index_is_geometry() {
        let err = parse_triangle(&start(r#"<triangle v1="-1" v2="1" v3="2"/>"#)).unwrap_err();
        assert!(matches!(err, Error::Geometry(_)));
    }

    #[test]
    fn test_parse_build_item_transform() {
        let item = parse_build_item(&start(
            r#"<item objectid="1" transform="1 0 0 0 1 0 0 0 1 10 20 30"/>"#,
        ))
        .unwrap();
        assert_eq!(item.objectid, 1);
        assert_eq!(item.effective_transform().translation(), [10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_parse_transform_wrong_arity() {
        assert!(matches!(
            parse_transform("1 0 0 1"),
            Err(Error::ModelSchema(_))
        ));
    }
}
