//! Data structures representing 3MF models

mod core;
mod material;
mod transform;
mod triangle_sets;

pub use core::{
    Attachment, Build, BuildItem, MetadataEntry, Mesh, Model, Object, ObjectType,
    PassthroughResource, Resources, Triangle, Unit, Vertex,
};

pub use material::{BaseMaterial, BaseMaterialGroup};

pub use transform::{TRANSFORM_MATRIX_SIZE, Transform};

pub use triangle_sets::{
    IDENTIFIER_PREFIX, TriangleSet, TriangleSetLayout, remap_triangle_sets,
    validate_triangle_sets,
};
