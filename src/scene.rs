//! Host scene snapshots and the import direction of the adapter
//!
//! A host copies its scene into a [`SceneGraph`] before exporting, and receives an
//! [`ImportedScene`] back when reading. Neither side touches host state: the codec
//! only ever sees these plain values.
//!
//! Transforms are exchanged as row-major rows of a column-vector 4×4 matrix, the
//! layout most scene graphs expose. Lengths are in the host unit chosen through
//! [`ExportOptions`](crate::ExportOptions) or [`ImportOptions`].

use std::collections::HashMap;

use crate::error::{Parsed, Warning, WarningKind};
use crate::model::{
    BaseMaterial, MetadataEntry, Model, Object, ObjectType, PassthroughResource, Transform,
    TriangleSet, Unit,
};
use crate::options::ImportOptions;

/// Row-major rows of the identity matrix
pub const IDENTITY_MATRIX: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// A host material: name and RGBA color with components in `0.0..=1.0`
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMaterial {
    /// Material name
    pub name: String,
    /// Linear RGBA color
    pub color: [f32; 4],
}

impl SceneMaterial {
    /// Create a material
    pub fn new(name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }

    /// Color quantised to 8 bits per channel
    pub fn displaycolor(&self) -> (u8, u8, u8, u8) {
        let [r, g, b, a] = self.color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        (r, g, b, a)
    }
}

impl From<&BaseMaterial> for SceneMaterial {
    fn from(material: &BaseMaterial) -> Self {
        let (r, g, b, a) = material.displaycolor;
        Self {
            name: material.name.clone(),
            color: [r, g, b, a].map(|c| f32::from(c) / 255.0),
        }
    }
}

/// A triangle of a host mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneFace {
    /// Vertex indices
    pub indices: [usize; 3],
    /// Index into the owning object's material slots
    pub material_slot: usize,
}

/// Vertex positions and triangles as the host holds them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMesh {
    /// Vertex positions in host units
    pub vertices: Vec<[f64; 3]>,
    /// Triangles with their material slot
    pub faces: Vec<SceneFace>,
}

impl SceneMesh {
    /// Empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a face
    pub fn push_face(&mut self, indices: [usize; 3], material_slot: usize) {
        self.faces.push(SceneFace {
            indices,
            material_slot,
        });
    }
}

/// One host object
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Object name
    pub name: String,
    /// Base mesh
    pub mesh: SceneMesh,
    /// Mesh with host modifiers applied, when the host evaluated one
    pub evaluated_mesh: Option<SceneMesh>,
    /// World transform, row-major rows of a column-vector matrix
    pub world_transform: [[f64; 4]; 4],
    /// Material slots; a slot may be empty
    pub materials: Vec<Option<SceneMaterial>>,
    /// Whether the host has the object selected
    pub selected: bool,
    /// 3MF object type to declare
    pub object_type: ObjectType,
    /// Optional part number
    pub partnumber: Option<String>,
}

impl SceneObject {
    /// Unselected model object with an identity transform and no materials
    pub fn new(name: impl Into<String>, mesh: SceneMesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            evaluated_mesh: None,
            world_transform: IDENTITY_MATRIX,
            materials: Vec::new(),
            selected: false,
            object_type: ObjectType::Model,
            partnumber: None,
        }
    }

    /// The mesh to export under the given modifier setting
    pub fn export_mesh(&self, use_mesh_modifiers: bool) -> &SceneMesh {
        match (&self.evaluated_mesh, use_mesh_modifiers) {
            (Some(evaluated), true) => evaluated,
            _ => &self.mesh,
        }
    }
}

/// A snapshot of everything the exporter needs from the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    /// Objects in host order
    pub objects: Vec<SceneObject>,
    /// Resource IDs the exporter must not allocate
    pub reserved_resource_ids: Vec<usize>,
    /// Foreign resources carried through from an earlier import
    pub passthrough: Vec<PassthroughResource>,
    /// Namespace declarations the passthrough resources rely on
    pub foreign_namespaces: Vec<(String, String)>,
    /// Document metadata to write
    pub metadata: Vec<MetadataEntry>,
}

impl SceneGraph {
    /// Empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resource ID the exporter has to leave alone
    pub fn reserved_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.reserved_resource_ids
            .iter()
            .copied()
            .chain(self.passthrough.iter().filter_map(|p| p.id))
    }
}

/// A material referenced by imported triangles
pub type ImportedMaterial = SceneMaterial;

/// A triangle handed to the host on import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedTriangle {
    /// Vertex indices
    pub indices: [usize; 3],
    /// Index into [`ImportedScene::materials`]
    pub material: Option<usize>,
}

/// One placed object ready to be instantiated by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedObject {
    /// Resource ID in the source document
    pub object_id: usize,
    /// Object name
    pub name: Option<String>,
    /// Declared object type
    pub object_type: ObjectType,
    /// Part number of the build item, falling back to the object's
    pub partnumber: Option<String>,
    /// Vertex positions in host units
    pub vertices: Vec<[f64; 3]>,
    /// Triangles
    pub triangles: Vec<ImportedTriangle>,
    /// Placement, row-major rows of a column-vector matrix in host units
    pub transform: [[f64; 4]; 4],
    /// Triangle groupings carried as auxiliary metadata
    pub triangle_sets: Vec<TriangleSet>,
}

/// Result of importing a document into host terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedScene {
    /// Unit declared by the source document
    pub source_unit: Unit,
    /// Placed objects, one per build item
    pub objects: Vec<ImportedObject>,
    /// Distinct materials referenced by the objects
    pub materials: Vec<ImportedMaterial>,
    /// Document metadata
    pub metadata: Vec<MetadataEntry>,
    /// Foreign resources to carry into a later export
    pub passthrough: Vec<PassthroughResource>,
    /// Namespace declarations for the passthrough resources
    pub foreign_namespaces: Vec<(String, String)>,
}

impl ImportedScene {
    /// Snapshot suitable for exporting the imported content again
    ///
    /// Each object gets one material slot per distinct material it uses, in order of
    /// first use, plus an empty slot when some triangles carry no material.
    ///
    /// [`ImportedObject::triangle_sets`] are not carried over: a [`SceneObject`] has no
    /// place for them. An export of the snapshot groups triangles by material slot
    /// again when [`ExportOptions::material_triangle_sets`] is set; any other
    /// grouping read from the file is lost.
    ///
    /// [`ExportOptions::material_triangle_sets`]: crate::options::ExportOptions::material_triangle_sets
    pub fn to_scene_graph(&self) -> SceneGraph {
        let objects = self
            .objects
            .iter()
            .map(|imported| {
                let mut slots: Vec<Option<usize>> = Vec::new();
                let mut mesh = SceneMesh {
                    vertices: imported.vertices.clone(),
                    faces: Vec::with_capacity(imported.triangles.len()),
                };
                for triangle in &imported.triangles {
                    let slot = match slots.iter().position(|s| *s == triangle.material) {
                        Some(slot) => slot,
                        None => {
                            slots.push(triangle.material);
                            slots.len() - 1
                        }
                    };
                    mesh.push_face(triangle.indices, slot);
                }
                let name = imported
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Object_{}", imported.object_id));
                let mut object = SceneObject::new(name, mesh);
                object.world_transform = imported.transform;
                object.object_type = imported.object_type;
                object.partnumber = imported.partnumber.clone();
                object.materials = slots
                    .into_iter()
                    .map(|slot| slot.and_then(|i| self.materials.get(i).cloned()))
                    .collect();
                object
            })
            .collect();

        SceneGraph {
            objects,
            reserved_resource_ids: Vec::new(),
            passthrough: self.passthrough.clone(),
            foreign_namespaces: self.foreign_namespaces.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Mesh data of one resource, before placement
struct ObjectTemplate<'a> {
    object: &'a Object,
    vertices: Vec<[f64; 3]>,
    triangles: Vec<ImportedTriangle>,
}

/// Convert a parsed document into host terms
///
/// Every build item becomes one [`ImportedObject`]; objects no build item places are
/// imported once with an identity transform. Vertices and translations are scaled
/// from the document unit into `options.host_unit`, times `options.global_scale`.
pub fn import_scene(model: &Model, options: &ImportOptions) -> Parsed<ImportedScene> {
    let factor = options.scale_factor(model.unit);
    let mut warnings = Vec::new();
    let mut materials: Vec<ImportedMaterial> = Vec::new();
    let mut material_index: HashMap<&BaseMaterial, usize> = HashMap::new();

    let mut templates: HashMap<usize, ObjectTemplate<'_>> = HashMap::new();
    for object in &model.resources.objects {
        let mut unresolved = 0usize;
        let triangles = object
            .mesh
            .triangles
            .iter()
            .map(|triangle| {
                let material = match (triangle.pid, triangle.p1) {
                    (Some(pid), Some(p1)) => {
                        let base = model
                            .resources
                            .base_material_group(pid)
                            .and_then(|group| group.materials.get(p1));
                        match base {
                            Some(base) => Some(*material_index.entry(base).or_insert_with(|| {
                                materials.push(SceneMaterial::from(base));
                                materials.len() - 1
                            })),
                            None => {
                                unresolved += 1;
                                None
                            }
                        }
                    }
                    _ => None,
                };
                ImportedTriangle {
                    indices: triangle.indices(),
                    material,
                }
            })
            .collect();

        if unresolved > 0 {
            warnings.push(
                Warning::new(
                    WarningKind::ModelSchema,
                    format!(
                        "{} triangle(s) reference a missing base material; imported without material",
                        unresolved
                    ),
                )
                .for_object(object.id),
            );
        }

        let vertices = object
            .mesh
            .vertices
            .iter()
            .map(|v| v.scaled(factor).to_array())
            .collect();
        templates.insert(
            object.id,
            ObjectTemplate {
                object,
                vertices,
                triangles,
            },
        );
    }

    let mut objects = Vec::with_capacity(model.build.items.len());
    let mut placed: Vec<usize> = Vec::new();
    for item in &model.build.items {
        let Some(template) = templates.get(&item.objectid) else {
            warnings.push(Warning::new(
                WarningKind::ModelSchema,
                format!("build item references missing object {}", item.objectid),
            ));
            continue;
        };
        let transform = item.effective_transform().with_scaled_translation(factor);
        let partnumber = item
            .partnumber
            .clone()
            .or_else(|| template.object.partnumber.clone());
        objects.push(instantiate(template, transform, partnumber));
        placed.push(item.objectid);
    }

    for object in &model.resources.objects {
        if placed.contains(&object.id) {
            continue;
        }
        if let Some(template) = templates.get(&object.id) {
            tracing::debug!(object = object.id, "importing unplaced object at origin");
            objects.push(instantiate(
                template,
                Transform::identity(),
                object.partnumber.clone(),
            ));
        }
    }

    for warning in &warnings {
        tracing::warn!(%warning, "import adjusted model content");
    }
    tracing::debug!(
        objects = objects.len(),
        materials = materials.len(),
        factor,
        "imported 3MF scene"
    );

    Parsed {
        value: ImportedScene {
            source_unit: model.unit,
            objects,
            materials,
            metadata: model.metadata.clone(),
            passthrough: model.resources.passthrough.clone(),
            foreign_namespaces: model.foreign_namespaces.clone(),
        },
        warnings,
    }
}

fn instantiate(
    template: &ObjectTemplate<'_>,
    transform: Transform,
    partnumber: Option<String>,
) -> ImportedObject {
    ImportedObject {
        object_id: template.object.id,
        name: template.object.name.clone(),
        object_type: template.object.object_type,
        partnumber,
        vertices: template.vertices.clone(),
        triangles: template.triangles.clone(),
        transform: transform.to_rows(),
        triangle_sets: template.object.mesh.triangle_sets.clone(),
    }
}
