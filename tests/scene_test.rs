//! End-to-end tests of the scene adapter

mod common;

use common::{model_xml, package, part_text, tetrahedron, unit_cube_scene};
use threemf_codec::{
    ExportOptions, ImportOptions, SceneMaterial, Unit, WarningKind, build_document,
    export_scene, export_to_file, import_from_file, import_scene, read_package,
};

#[test]
fn test_unit_cube_end_to_end() {
    let options = ExportOptions::new()
        .with_global_scale(1.0)
        .with_coordinate_precision(4);
    let bytes = export_scene(&unit_cube_scene(), &options).unwrap();
    let xml = part_text(&bytes, "3D/3dmodel.model");

    assert_eq!(xml.matches("<base ").count(), 3);
    assert!(xml.contains(r##"<base name="Red" displaycolor="#FF0000"/>"##));
    assert!(xml.contains(r##"<base name="Green" displaycolor="#00FF00"/>"##));
    assert!(xml.contains(r##"<base name="Blue" displaycolor="#0000FF"/>"##));

    for identifier in ["ts_0", "ts_1", "ts_2"] {
        assert!(xml.contains(&format!(r#"identifier="{}""#, identifier)));
    }
    assert!(xml.contains(r#"<t:triangleset name="Red" identifier="ts_0">"#));
    assert_eq!(xml.matches("<t:ref index=").count(), 12);

    // 1 m host cube, 1000 mm document cube, four fractional digits
    assert!(xml.contains(r#"<vertex x="1000.0000" y="1000.0000" z="1000.0000"/>"#));
    assert!(xml.contains(r#"<vertex x="0.0000" y="0.0000" z="0.0000"/>"#));
    assert!(xml.contains(r#"unit="millimeter""#));

    let model = read_package(&bytes).unwrap().value;
    let mesh = &model.resources.objects[0].mesh;
    assert_eq!(mesh.vertices.len(), 8);
    assert_eq!(mesh.triangles.len(), 12);
    assert_eq!(mesh.triangle_sets.len(), 3);
    for (slot, set) in mesh.triangle_sets.iter().enumerate() {
        assert_eq!(set.len(), 4);
        assert_eq!(set.triangles, (slot * 4..slot * 4 + 4).collect::<Vec<_>>());
    }
}

#[test]
fn test_material_dedup_across_objects() {
    let mut scene = unit_cube_scene();
    let mut twin = scene.objects[0].clone();
    twin.name = "Twin".to_string();
    // Same name and color as the first object's red, different slot position
    twin.materials = vec![
        Some(SceneMaterial::new("Blue", [0.0, 0.0, 1.0, 1.0])),
        Some(SceneMaterial::new("Red", [1.0, 0.0, 0.0, 1.0])),
        Some(SceneMaterial::new("Red", [1.0, 0.0, 0.0, 0.5])),
    ];
    scene.objects.push(twin);

    let model = build_document(&scene, &ExportOptions::default()).unwrap();
    let group = &model.resources.base_material_groups[0];
    let names: Vec<(&str, u8)> = group
        .materials
        .iter()
        .map(|m| (m.name.as_str(), m.displaycolor.3))
        .collect();
    assert_eq!(
        names,
        vec![("Red", 255), ("Green", 255), ("Blue", 255), ("Red", 128)]
    );

    // Twin slot 0 is Blue, which is palette entry 2
    let twin = &model.resources.objects[1];
    assert_eq!(twin.mesh.triangles[0].p1, Some(2));
    assert_eq!(twin.mesh.triangles[4].p1, Some(0));
    assert_eq!(twin.mesh.triangles[8].p1, Some(3));
    assert_eq!(twin.mesh.triangle_sets[0].identifier, "ts_3");
}

#[test]
fn test_material_sets_can_be_disabled() {
    let options = ExportOptions::new().with_material_triangle_sets(false);
    let bytes = export_scene(&unit_cube_scene(), &options).unwrap();
    let xml = part_text(&bytes, "3D/3dmodel.model");
    assert!(!xml.contains("trianglesets"));
    assert!(!xml.contains("xmlns:t="));
    assert!(xml.contains("<basematerials"));
}

#[test]
fn test_import_then_export_reproduces_coordinates() {
    let original = unit_cube_scene();
    let options = ExportOptions::new().with_coordinate_precision(6);
    let bytes = export_scene(&original, &options).unwrap();
    let model = read_package(&bytes).unwrap().value;

    let imported = import_scene(&model, &ImportOptions::default());
    assert!(imported.warnings.is_empty());
    let scene = imported.value;
    assert_eq!(scene.materials.len(), 3);
    assert_eq!(scene.objects[0].triangle_sets.len(), 3);

    for (a, b) in scene.objects[0]
        .vertices
        .iter()
        .zip(&original.objects[0].mesh.vertices)
    {
        for axis in 0..3 {
            assert!((a[axis] - b[axis]).abs() < 1e-9);
        }
    }

    let again = export_scene(&scene.to_scene_graph(), &options).unwrap();
    assert_eq!(
        part_text(&again, "3D/3dmodel.model"),
        part_text(&bytes, "3D/3dmodel.model")
    );
}

#[test]
fn test_units_and_translation_scaled_on_import() {
    let resources = tetrahedron(1, "");
    let build = r#"    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 25.4 0 0"/>"#;
    let xml = model_xml(&resources, build);
    let model = read_package(&package(&xml)).unwrap().value;

    let options = ImportOptions::new().with_host_unit(Unit::Inch);
    let scene = import_scene(&model, &options).value;
    let object = &scene.objects[0];
    assert_eq!(scene.source_unit, Unit::Millimeter);
    assert!((object.transform[0][3] - 1.0).abs() < 1e-12);
    assert!((object.vertices[1][0] - 10.0 / 25.4).abs() < 1e-12);
}

#[test]
fn test_passthrough_ids_not_reallocated_on_export() {
    let resources = format!("    <x:gizmo id=\"1\"/>\n{}", tetrahedron(2, ""));
    let xml = model_xml(&resources, r#"    <item objectid="2"/>"#)
        .replace("<model ", r#"<model xmlns:x="urn:example:gizmos" "#);
    let model = read_package(&package(&xml)).unwrap().value;
    let imported = import_scene(&model, &ImportOptions::default()).value;

    let exported = build_document(&imported.to_scene_graph(), &ExportOptions::default()).unwrap();
    assert_eq!(exported.resources.passthrough[0].id, Some(1));
    assert_eq!(exported.resources.objects[0].id, 2);
    assert_eq!(exported.foreign_namespaces[0].1, "urn:example:gizmos");
}

#[test]
fn test_file_helpers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.3mf");
    export_to_file(&path, &unit_cube_scene(), &ExportOptions::default()).unwrap();

    let imported = import_from_file(&path, &ImportOptions::default()).unwrap();
    assert_eq!(imported.skipped_count(), 0);
    assert_eq!(imported.value.objects.len(), 1);
    assert_eq!(imported.value.objects[0].name.as_deref(), Some("Cube"));
    assert_eq!(imported.value.objects[0].triangles.len(), 12);
}

#[test]
fn test_import_warnings_merged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dangling.3mf");
    let xml = model_xml(&tetrahedron(1, ""), r#"    <item objectid="9"/>"#);
    std::fs::write(&path, package(&xml)).unwrap();

    let imported = import_from_file(&path, &ImportOptions::default()).unwrap();
    assert_eq!(imported.count_of(WarningKind::ModelSchema), 1);
    // The unplaced object is still imported once
    assert_eq!(imported.value.objects.len(), 1);
}
