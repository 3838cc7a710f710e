//! Core 3MF types and structures

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::{CORE_NAMESPACE, DEFAULT_LANGUAGE};

use super::material::BaseMaterialGroup;
use super::transform::Transform;
use super::triangle_sets::{TriangleSet, TriangleSetLayout};

/// Unit of measurement declared by a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    /// 0.001 mm
    Micron,
    /// The 3MF default
    #[default]
    Millimeter,
    /// 10 mm
    Centimeter,
    /// 1000 mm
    Meter,
    /// 25.4 mm
    Inch,
    /// 304.8 mm
    Foot,
}

impl Unit {
    /// Attribute value used in the model part
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Micron => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Meter => "meter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
        }
    }

    /// Length of one unit in meters
    pub fn meters(&self) -> f64 {
        match self {
            Unit::Micron => 0.000_001,
            Unit::Millimeter => 0.001,
            Unit::Centimeter => 0.01,
            Unit::Meter => 1.0,
            Unit::Inch => 0.0254,
            Unit::Foot => 0.3048,
        }
    }

    /// Factor converting a length in `self` into a length in `target`
    pub fn conversion_to(&self, target: Unit) -> f64 {
        self.meters() / target.meters()
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "micron" => Ok(Unit::Micron),
            "millimeter" => Ok(Unit::Millimeter),
            "centimeter" => Ok(Unit::Centimeter),
            "meter" => Ok(Unit::Meter),
            "inch" => Ok(Unit::Inch),
            "foot" => Ok(Unit::Foot),
            _ => Err(Error::ModelSchema(format!(
                "Invalid unit '{}'. Must be one of: micron, millimeter, centimeter, meter, inch, foot",
                s
            ))),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 3D vertex with x, y, z coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Multiply every coordinate by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Coordinates as an array
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
    /// Optional base material group ID (property ID)
    pub pid: Option<usize>,
    /// Optional material index for vertex 1
    pub p1: Option<usize>,
    /// Optional material index for vertex 2, defaults to `p1`
    pub p2: Option<usize>,
    /// Optional material index for vertex 3, defaults to `p1`
    pub p3: Option<usize>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self {
            v1,
            v2,
            v3,
            pid: None,
            p1: None,
            p2: None,
            p3: None,
        }
    }

    /// Create a triangle with one flat material from a base material group
    pub fn with_material(v1: usize, v2: usize, v3: usize, pid: usize, index: usize) -> Self {
        Self {
            pid: Some(pid),
            p1: Some(index),
            ..Self::new(v1, v2, v3)
        }
    }

    /// The three vertex indices
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// True when the triangle repeats a vertex index
    pub fn is_degenerate(&self) -> bool {
        self.v1 == self.v2 || self.v2 == self.v3 || self.v1 == self.v3
    }

    /// Resolved per-vertex material indices, with `p2`/`p3` falling back to `p1`
    pub fn material_indices(&self) -> Option<[usize; 3]> {
        let p1 = self.p1?;
        self.pid?;
        Some([p1, self.p2.unwrap_or(p1), self.p3.unwrap_or(p1)])
    }

    /// True when all three vertices resolve to the same material index
    pub fn is_flat_material(&self) -> bool {
        matches!(self.material_indices(), Some([a, b, c]) if a == b && b == c)
    }

    /// Drop the material reference
    pub fn clear_material(&mut self) {
        self.pid = None;
        self.p1 = None;
        self.p2 = None;
        self.p3 = None;
    }
}

/// A 3D mesh containing vertices, triangles and triangle sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices; a triangle refers to a vertex by its position here
    pub vertices: Vec<Vertex>,
    /// List of triangles; a triangle set refers to a triangle by its position here
    pub triangles: Vec<Triangle>,
    /// Triangle groupings (Triangle Sets extension)
    pub triangle_sets: Vec<TriangleSet>,
    /// Layout the triangle sets were read from, `None` for meshes built in memory
    pub triangle_sets_layout: Option<TriangleSetLayout>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            ..Self::default()
        }
    }

    /// Check that every triangle references three distinct, existing vertices
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        for (index, triangle) in self.triangles.iter().enumerate() {
            if let Some(bad) = triangle.indices().into_iter().find(|&v| v >= count) {
                return Err(Error::Geometry(format!(
                    "Triangle {} references vertex {} but the mesh has {} vertices",
                    index, bad, count
                )));
            }
            if triangle.is_degenerate() {
                return Err(Error::Geometry(format!(
                    "Triangle {} repeats a vertex index ({} {} {})",
                    index, triangle.v1, triangle.v2, triangle.v3
                )));
            }
        }
        Ok(())
    }
}

/// Type of 3D object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// A standard model object
    #[default]
    Model,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// A surface object
    Surface,
    /// Other types
    Other,
}

impl ObjectType {
    /// Attribute value used in the model part
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
            ObjectType::Other => "other",
        }
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(ObjectType::Model),
            "support" => Ok(ObjectType::Support),
            "solidsupport" => Ok(ObjectType::SolidSupport),
            "surface" => Ok(ObjectType::Surface),
            "other" => Ok(ObjectType::Other),
            _ => Err(Error::ModelSchema(format!(
                "Invalid object type '{}'. Must be one of: model, support, solidsupport, surface, other",
                s
            ))),
        }
    }
}

/// A named mesh container
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Object ID
    pub id: usize,
    /// Object name (optional)
    pub name: Option<String>,
    /// Type of object
    pub object_type: ObjectType,
    /// Part number (optional)
    pub partnumber: Option<String>,
    /// Mesh data
    pub mesh: Mesh,
}

impl Object {
    /// Create a new object with an empty mesh
    pub fn new(id: usize) -> Self {
        Self {
            id,
            name: None,
            object_type: ObjectType::Model,
            partnumber: None,
            mesh: Mesh::new(),
        }
    }
}

/// A resource in a namespace this crate does not interpret, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughResource {
    /// The `id` attribute, when the element carries one
    pub id: Option<usize>,
    /// The element serialised as XML, including its children
    pub xml: String,
}

/// Resources section containing objects and materials
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resources {
    /// List of objects
    pub objects: Vec<Object>,
    /// List of base material groups (materials extension)
    pub base_material_groups: Vec<BaseMaterialGroup>,
    /// Foreign resources preserved for round-trips
    pub passthrough: Vec<PassthroughResource>,
}

impl Resources {
    /// Create a new empty resources section
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object by ID
    pub fn object(&self, id: usize) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Look up a base material group by ID
    pub fn base_material_group(&self, id: usize) -> Option<&BaseMaterialGroup> {
        self.base_material_groups.iter().find(|g| g.id == id)
    }

    /// Every resource ID in declaration order of kind
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.base_material_groups
            .iter()
            .map(|g| g.id)
            .chain(self.objects.iter().map(|o| o.id))
            .chain(self.passthrough.iter().filter_map(|p| p.id))
    }

    /// True when any resource already uses `id`
    pub fn contains_id(&self, id: usize) -> bool {
        self.ids().any(|existing| existing == id)
    }

    /// Total number of resources
    pub fn len(&self) -> usize {
        self.objects.len() + self.base_material_groups.len() + self.passthrough.len()
    }

    /// True when there are no resources
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An item to be built, referencing an object
#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    /// Reference to object ID
    pub objectid: usize,
    /// Optional placement transform
    pub transform: Option<Transform>,
    /// Part number (optional)
    pub partnumber: Option<String>,
}

impl BuildItem {
    /// Create a new build item
    pub fn new(objectid: usize) -> Self {
        Self {
            objectid,
            transform: None,
            partnumber: None,
        }
    }

    /// Create a build item with a placement transform
    pub fn with_transform(objectid: usize, transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::new(objectid)
        }
    }

    /// The placement transform, identity when absent
    pub fn effective_transform(&self) -> Transform {
        self.transform.unwrap_or_default()
    }
}

/// Build section specifying which objects to manufacture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Build {
    /// List of items to build
    pub items: Vec<BuildItem>,
}

impl Build {
    /// Create a new empty build section
    pub fn new() -> Self {
        Self::default()
    }
}

/// Metadata entry of a model
///
/// A `name` attribute and text content, with an optional preservation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Name of the metadata entry
    pub name: String,
    /// Value of the metadata entry
    pub value: String,
    /// When true, the entry should be kept by editing applications
    pub preserve: Option<bool>,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            preserve: None,
        }
    }
}

/// An auxiliary package part carried through unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Part name inside the archive, without a leading slash
    pub path: String,
    /// Content type declared for the part
    pub content_type: String,
    /// Raw bytes
    pub data: Vec<u8>,
    /// Type of the package-level relationship targeting this part, if any
    pub relationship_type: Option<String>,
}

impl Attachment {
    /// Create an attachment without a package relationship
    pub fn new(path: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into().trim_start_matches('/').to_string(),
            content_type: content_type.into(),
            data,
            relationship_type: None,
        }
    }

    /// Set the package relationship type
    pub fn with_relationship(mut self, relationship_type: impl Into<String>) -> Self {
        self.relationship_type = Some(relationship_type.into());
        self
    }

    /// File extension of the part name, lowercased
    pub fn extension(&self) -> Option<String> {
        let file_name = self.path.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// Complete 3MF model document
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Unit of measurement
    pub unit: Unit,
    /// Language tag (`xml:lang`)
    pub language: String,
    /// Metadata entries
    pub metadata: Vec<MetadataEntry>,
    /// Resources (objects, materials, passthrough)
    pub resources: Resources,
    /// Build section
    pub build: Build,
    /// Foreign `prefix → namespace` declarations needed by passthrough resources
    pub foreign_namespaces: Vec<(String, String)>,
    /// Auxiliary package parts
    pub attachments: Vec<Attachment>,
}

impl Model {
    /// Create a new empty model
    pub fn new() -> Self {
        Self {
            unit: Unit::Millimeter,
            language: DEFAULT_LANGUAGE.to_string(),
            metadata: Vec::new(),
            resources: Resources::new(),
            build: Build::new(),
            foreign_namespaces: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Namespace of the root element
    pub fn xmlns(&self) -> &'static str {
        CORE_NAMESPACE
    }

    /// True when any mesh carries triangle sets
    pub fn has_triangle_sets(&self) -> bool {
        self.resources
            .objects
            .iter()
            .any(|o| !o.mesh.triangle_sets.is_empty())
    }

    /// Check every build item against the object resources
    pub fn validate_build_references(&self) -> Result<()> {
        for item in &self.build.items {
            if self.resources.object(item.objectid).is_none() {
                return Err(Error::ModelSchema(format!(
                    "Build item references object {} which is not defined",
                    item.objectid
                )));
            }
        }
        Ok(())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
