//! Scene snapshot to model document conversion
//!
//! [`build_document`] is the export direction of the scene adapter. It works in two
//! passes: every exported object is first converted into mesh data and its used
//! materials are interned into one [`MaterialPalette`]; only then are resource IDs
//! handed out, the material group first so that objects reference a resource that
//! precedes them in the document.

mod ids;
mod materials;

pub use ids::ResourceIdAllocator;
pub use materials::MaterialPalette;

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::{BuildItem, Mesh, Model, Object, Transform, Triangle, TriangleSet, Vertex};
use crate::options::ExportOptions;
use crate::scene::{SceneGraph, SceneObject};

/// Mesh data of one object before IDs are known
struct PreparedObject<'a> {
    source: &'a SceneObject,
    mesh: Mesh,
    /// Material slot of each kept triangle
    slots: Vec<usize>,
    /// Palette position for every used slot that has a material
    slot_materials: BTreeMap<usize, Option<usize>>,
    transform: Transform,
}

/// Convert a scene snapshot into a model document
///
/// Objects are skipped with a logged warning when they end up with no valid triangle,
/// carry a non-finite coordinate or have a non-finite transform; a scene in which
/// nothing survives still yields a valid, empty document. Fails with
/// [`Error::ModelSchema`] when the options produce an unusable scale factor.
pub fn build_document(scene: &SceneGraph, options: &ExportOptions) -> Result<Model> {
    let factor = options.scale_factor();
    if !factor.is_finite() || factor == 0.0 {
        return Err(Error::ModelSchema(format!(
            "Export scale factor {} is not usable (global scale {}, {} to {})",
            factor, options.global_scale, options.host_unit, options.unit
        )));
    }

    let mut palette = MaterialPalette::new();
    let prepared: Vec<PreparedObject<'_>> = scene
        .objects
        .iter()
        .filter(|object| object.selected || !options.use_selection)
        .filter_map(|object| prepare_object(object, options, factor, &mut palette))
        .collect();

    let mut ids = ResourceIdAllocator::with_reserved(scene.reserved_ids());
    let mut model = Model::new();
    model.unit = options.unit;
    model.metadata = scene.metadata.clone();
    model.foreign_namespaces = scene.foreign_namespaces.clone();
    model.resources.passthrough = scene.passthrough.clone();

    let group_id = if palette.is_empty() {
        None
    } else {
        let id = ids.allocate();
        model.resources.base_material_groups.push(palette.into_group(id));
        Some(id)
    };

    let mut set_ordinal = 0;
    for object in prepared {
        let id = ids.allocate();
        let PreparedObject {
            source,
            mut mesh,
            slots,
            slot_materials,
            transform,
        } = object;

        if let Some(pid) = group_id {
            for (triangle, slot) in mesh.triangles.iter_mut().zip(&slots) {
                if let Some(Some(index)) = slot_materials.get(slot) {
                    triangle.pid = Some(pid);
                    triangle.p1 = Some(*index);
                }
            }
        }

        if options.material_triangle_sets && !source.materials.is_empty() {
            for slot in slot_materials.keys() {
                let name = match source.materials.get(*slot) {
                    Some(Some(material)) => material.name.clone(),
                    _ => format!("Slot_{}", slot),
                };
                let members = slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| *s == slot)
                    .map(|(index, _)| index)
                    .collect();
                mesh.triangle_sets.push(TriangleSet::with_triangles(
                    name,
                    TriangleSet::synthesized_identifier(set_ordinal),
                    members,
                ));
                set_ordinal += 1;
            }
        }

        let mut resource = Object::new(id);
        resource.name = Some(source.name.clone());
        resource.object_type = source.object_type;
        resource.partnumber = source.partnumber.clone();
        resource.mesh = mesh;
        model.resources.objects.push(resource);

        model.build.items.push(if transform.is_identity() {
            BuildItem::new(id)
        } else {
            BuildItem::with_transform(id, transform)
        });
    }

    tracing::debug!(
        objects = model.resources.objects.len(),
        materials = model
            .resources
            .base_material_groups
            .first()
            .map_or(0, |g| g.len()),
        triangle_sets = set_ordinal,
        factor,
        "built 3MF document"
    );
    Ok(model)
}

/// Scale and validate one object's mesh, interning the materials it uses
fn prepare_object<'a>(
    object: &'a SceneObject,
    options: &ExportOptions,
    factor: f64,
    palette: &mut MaterialPalette,
) -> Option<PreparedObject<'a>> {
    let source = object.export_mesh(options.use_mesh_modifiers);

    let transform = Transform::from_rows(&object.world_transform).with_scaled_translation(factor);
    if !transform.is_finite() {
        tracing::warn!(object = %object.name, "skipping object with a non-finite transform");
        return None;
    }

    let vertices: Vec<Vertex> = source
        .vertices
        .iter()
        .map(|&[x, y, z]| Vertex::new(x, y, z).scaled(factor))
        .collect();
    if vertices
        .iter()
        .any(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
    {
        tracing::warn!(object = %object.name, "skipping object with a non-finite coordinate");
        return None;
    }

    let mut mesh = Mesh::with_capacity(vertices.len(), source.faces.len());
    mesh.vertices = vertices;
    let mut slots = Vec::with_capacity(source.faces.len());
    let mut dropped = 0usize;
    for face in &source.faces {
        let [v1, v2, v3] = face.indices;
        let triangle = Triangle::new(v1, v2, v3);
        if triangle.is_degenerate() || face.indices.iter().any(|&v| v >= mesh.vertices.len()) {
            dropped += 1;
            continue;
        }
        mesh.triangles.push(triangle);
        slots.push(face.material_slot);
    }
    if dropped > 0 {
        tracing::warn!(
            object = %object.name,
            dropped,
            "dropping degenerate or out-of-range faces"
        );
    }
    if mesh.triangles.is_empty() {
        tracing::warn!(object = %object.name, "skipping object without triangles");
        return None;
    }

    let mut slot_materials = BTreeMap::new();
    for &slot in &slots {
        slot_materials.entry(slot).or_insert_with(|| match object.materials.get(slot) {
            Some(Some(material)) => Some(palette.intern(material)),
            _ => None,
        });
    }

    Some(PreparedObject {
        source: object,
        mesh,
        slots,
        slot_materials,
        transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PassthroughResource, Unit};
    use crate::scene::{SceneMaterial, SceneMesh};

    fn triangle_object(name: &str) -> SceneObject {
        let mut mesh = SceneMesh::new();
        mesh.vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.push_face([0, 1, 2], 0);
        SceneObject::new(name, mesh)
    }

    #[test]
    fn test_empty_scene_is_valid() {
        let model = build_document(&SceneGraph::new(), &ExportOptions::default()).unwrap();
        assert!(model.resources.is_empty());
        assert!(model.build.items.is_empty());
    }

    #[test]
    fn test_ids_skip_reserved() {
        let mut scene = SceneGraph::new();
        scene.objects.push(triangle_object("A"));
        scene.objects.push(triangle_object("B"));
        scene.reserved_resource_ids = vec![1];
        scene.passthrough.push(PassthroughResource {
            id: Some(3),
            xml: "<x:thing id=\"3\"/>".to_string(),
        });
        let model = build_document(&scene, &ExportOptions::default()).unwrap();
        let ids: Vec<usize> = model.resources.objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_vertices_scaled_meter_to_millimeter() {
        let mut scene = SceneGraph::new();
        scene.objects.push(triangle_object("A"));
        let model = build_document(&scene, &ExportOptions::default()).unwrap();
        assert_eq!(model.unit, Unit::Millimeter);
        assert!((model.resources.objects[0].mesh.vertices[1].x - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_translation_scaled_rotation_kept() {
        let mut scene = SceneGraph::new();
        let mut object = triangle_object("A");
        object.world_transform[0][3] = 0.5;
        object.world_transform[0][0] = 2.0;
        scene.objects.push(object);
        let model = build_document(&scene, &ExportOptions::default()).unwrap();
        let transform = model.build.items[0].transform.unwrap();
        assert_eq!(transform.translation(), [500.0, 0.0, 0.0]);
        assert_eq!(transform.values()[0], 2.0);
    }

    #[test]
    fn test_selection_and_modifiers() {
        let mut scene = SceneGraph::new();
        let mut selected = triangle_object("Picked");
        selected.selected = true;
        let mut evaluated = selected.mesh.clone();
        evaluated.vertices.push([0.0, 0.0, 1.0]);
        evaluated.push_face([0, 1, 3], 0);
        selected.evaluated_mesh = Some(evaluated);
        scene.objects.push(selected);
        scene.objects.push(triangle_object("Ignored"));

        let options = ExportOptions::new().with_selection(true);
        let model = build_document(&scene, &options).unwrap();
        assert_eq!(model.resources.objects.len(), 1);
        assert_eq!(model.resources.objects[0].mesh.triangles.len(), 2);

        let model = build_document(&scene, &options.with_mesh_modifiers(false)).unwrap();
        assert_eq!(model.resources.objects[0].mesh.triangles.len(), 1);
    }

    #[test]
    fn test_objects_without_triangles_skipped() {
        let mut scene = SceneGraph::new();
        let mut object = triangle_object("Broken");
        object.mesh.faces[0].indices = [0, 0, 1];
        scene.objects.push(object);
        scene.objects.push(triangle_object("Fine"));
        let model = build_document(&scene, &ExportOptions::default()).unwrap();
        assert_eq!(model.resources.objects.len(), 1);
        assert_eq!(model.resources.objects[0].id, 1);
    }

    #[test]
    fn test_materials_and_sets() {
        let mut scene = SceneGraph::new();
        let mut object = triangle_object("Painted");
        object.mesh.vertices.push([1.0, 1.0, 0.0]);
        object.mesh.push_face([1, 3, 2], 2);
        object.mesh.push_face([0, 2, 3], 0);
        object.materials = vec![
            Some(SceneMaterial::new("Red", [1.0, 0.0, 0.0, 1.0])),
            None,
            Some(SceneMaterial::new("Red", [1.0, 0.0, 0.0, 1.0])),
        ];
        scene.objects.push(object);

        let model = build_document(&scene, &ExportOptions::default()).unwrap();
        let group = &model.resources.base_material_groups[0];
        assert_eq!(group.id, 1);
        assert_eq!(group.len(), 1);

        let mesh = &model.resources.objects[0].mesh;
        assert_eq!(model.resources.objects[0].id, 2);
        assert!(mesh.triangles.iter().all(|t| t.pid == Some(1) && t.p1 == Some(0)));

        let names: Vec<&str> = mesh.triangle_sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Red", "Red"]);
        assert_eq!(mesh.triangle_sets[0].triangles, vec![0, 2]);
        assert_eq!(mesh.triangle_sets[1].identifier, "ts_1");
    }

    #[test]
    fn test_slot_beyond_palette_has_no_material() {
        let mut scene = SceneGraph::new();
        let mut object = triangle_object("Sparse");
        object.mesh.faces[0].material_slot = 5;
        object.materials = vec![Some(SceneMaterial::new("Red", [1.0, 0.0, 0.0, 1.0]))];
        scene.objects.push(object);

        let model = build_document(&scene, &ExportOptions::default()).unwrap();
        assert!(model.resources.base_material_groups.is_empty());
        let mesh = &model.resources.objects[0].mesh;
        assert_eq!(mesh.triangles[0].pid, None);
        assert_eq!(mesh.triangle_sets[0].name, "Slot_5");
    }

    #[test]
    fn test_zero_scale_rejected() {
        let options = ExportOptions::new().with_global_scale(0.0);
        assert!(matches!(
            build_document(&SceneGraph::new(), &options),
            Err(Error::ModelSchema(_))
        ));
    }
}
