//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use threemf_codec::{SceneGraph, SceneMaterial, SceneMesh, SceneObject};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

/// Package relationships pointing the 3D model relationship at `target`
pub fn rels_targeting(target: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rel0" Target="{}" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#,
        target
    )
}

/// Build a ZIP archive from `(name, contents)` pairs
pub fn archive(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A well-formed package around `model_xml` at the canonical location
pub fn package(model_xml: &str) -> Vec<u8> {
    let rels = rels_targeting("/3D/3dmodel.model");
    archive(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", rels.as_bytes()),
        ("3D/3dmodel.model", model_xml.as_bytes()),
    ])
}

/// Wrap `resources` and `build` in a core model root that also declares `t`
pub fn model_xml(resources: &str, build: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:t="http://schemas.microsoft.com/3dmanufacturing/trianglesets/2021/07">
  <resources>
{}
  </resources>
  <build>
{}
  </build>
</model>"#,
        resources, build
    )
}

/// A four-triangle tetrahedron object body with `extra` appended inside `<mesh>`
pub fn tetrahedron(id: usize, extra: &str) -> String {
    format!(
        r#"    <object id="{}" type="model" name="Tet">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1"/>
          <triangle v1="0" v2="1" v3="3"/>
          <triangle v1="1" v2="2" v3="3"/>
          <triangle v1="0" v2="3" v3="2"/>
        </triangles>
{}
      </mesh>
    </object>"#,
        id, extra
    )
}

/// Unit cube in meters, three material slots with two cube faces each
///
/// Faces are ordered so that slot `n` owns triangles `4n..4n+4`.
pub fn unit_cube_scene() -> SceneGraph {
    let mut mesh = SceneMesh::new();
    mesh.vertices = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ];
    let faces: [([usize; 3], usize); 12] = [
        // bottom and top
        ([0, 2, 1], 0),
        ([0, 3, 2], 0),
        ([4, 5, 6], 0),
        ([4, 6, 7], 0),
        // front and back
        ([0, 1, 5], 1),
        ([0, 5, 4], 1),
        ([3, 7, 6], 1),
        ([3, 6, 2], 1),
        // left and right
        ([0, 4, 7], 2),
        ([0, 7, 3], 2),
        ([1, 2, 6], 2),
        ([1, 6, 5], 2),
    ];
    for (indices, slot) in faces {
        mesh.push_face(indices, slot);
    }

    let mut cube = SceneObject::new("Cube", mesh);
    cube.materials = vec![
        Some(SceneMaterial::new("Red", [1.0, 0.0, 0.0, 1.0])),
        Some(SceneMaterial::new("Green", [0.0, 1.0, 0.0, 1.0])),
        Some(SceneMaterial::new("Blue", [0.0, 0.0, 1.0, 1.0])),
    ];

    let mut scene = SceneGraph::new();
    scene.objects.push(cube);
    scene
}

/// Text of a part inside a package
pub fn part_text(package: &[u8], name: &str) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}
