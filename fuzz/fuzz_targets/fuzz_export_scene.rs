#![no_main]

use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;
use threemf_codec::{ExportOptions, SceneGraph, SceneMaterial, SceneMesh, SceneObject};

#[derive(Debug)]
struct FuzzScene(SceneGraph);

impl<'a> Arbitrary<'a> for FuzzScene {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let mut scene = SceneGraph::new();
        for _ in 0..u.int_in_range(0..=4)? {
            let mut mesh = SceneMesh::new();
            for _ in 0..u.int_in_range(0..=40)? {
                mesh.vertices.push([u.arbitrary()?, u.arbitrary()?, u.arbitrary()?]);
            }
            // Indices may point past the vertex list on purpose
            for _ in 0..u.int_in_range(0..=60)? {
                let indices = [
                    u.int_in_range(0..=45)?,
                    u.int_in_range(0..=45)?,
                    u.int_in_range(0..=45)?,
                ];
                mesh.push_face(indices, u.int_in_range(0..=4)?);
            }
            let mut object = SceneObject::new("fuzz", mesh);
            for _ in 0..u.int_in_range(0..=3)? {
                let material = if u.arbitrary()? {
                    Some(SceneMaterial::new("m", [u.arbitrary()?, 0.5, 0.5, 1.0]))
                } else {
                    None
                };
                object.materials.push(material);
            }
            scene.objects.push(object);
        }
        scene.reserved_resource_ids = vec![u.int_in_range(1..=6)?];
        Ok(FuzzScene(scene))
    }
}

fuzz_target!(|scene: FuzzScene| {
    // The builder drops what it cannot represent, so writing must always succeed
    let options = ExportOptions::default();
    let bytes = threemf_codec::export_scene(&scene.0, &options).expect("export failed");
    threemf_codec::read_package(&bytes).expect("exported package failed to read");
});
