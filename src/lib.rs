//! # threemf-codec
//!
//! A pure Rust reader and writer for 3MF (3D Manufacturing Format) packages.
//!
//! A 3MF file is a ZIP container following the Open Packaging Conventions (OPC) that
//! holds an XML model part. This crate reads and writes that container, the core
//! model (meshes, objects, build items, metadata), base materials and the Triangle
//! Sets extension in both its older unnamespaced layout and the current namespaced
//! one. On top of the document model sits a scene adapter that turns a host scene
//! snapshot into a document and back, converting units on the way.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Tolerant reading: invalid objects, triangles, material references and triangle
//!   sets are skipped and reported as [`Warning`]s instead of failing the whole file
//! - Foreign resources and package parts are carried through unchanged
//! - Deterministic output with configurable coordinate precision
//!
//! ## Example
//!
//! ```no_run
//! use threemf_codec::{ExportOptions, ImportOptions, SceneGraph, SceneMesh, SceneObject};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut mesh = SceneMesh::new();
//! mesh.vertices = vec![[0.0, 0.0, 0.0], [0.01, 0.0, 0.0], [0.0, 0.01, 0.0]];
//! mesh.push_face([0, 1, 2], 0);
//!
//! let mut scene = SceneGraph::new();
//! scene.objects.push(SceneObject::new("Triangle", mesh));
//! threemf_codec::export_to_file("triangle.3mf", &scene, &ExportOptions::default())?;
//!
//! let imported = threemf_codec::import_from_file("triangle.3mf", &ImportOptions::default())?;
//! println!(
//!     "{} objects, {} skipped",
//!     imported.value.objects.len(),
//!     imported.skipped_count()
//! );
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod model;
pub mod opc;
pub mod options;
pub mod parser;
pub mod scene;
pub mod schema;
mod writer;

pub use builder::{ResourceIdAllocator, build_document};
pub use error::{Error, Parsed, Result, Warning, WarningKind};
pub use model::{
    Attachment, BaseMaterial, BaseMaterialGroup, Build, BuildItem, Mesh, MetadataEntry, Model,
    Object, ObjectType, PassthroughResource, Resources, Transform, Triangle, TriangleSet,
    TriangleSetLayout, Unit, Vertex,
};
pub use options::{DEFAULT_COORDINATE_PRECISION, ExportOptions, ImportOptions};
pub use parser::parse_document;
pub use scene::{
    ImportedMaterial, ImportedObject, ImportedScene, ImportedTriangle, SceneFace, SceneGraph,
    SceneMaterial, SceneMesh, SceneObject, import_scene,
};

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

/// Serialize `model` into a complete 3MF package
///
/// Coordinates are written with [`DEFAULT_COORDINATE_PRECISION`] fractional digits.
/// Nothing is returned on failure: the archive is only produced once the model part
/// serialized cleanly.
pub fn write_package(model: &Model) -> Result<Vec<u8>> {
    write_package_with_precision(model, DEFAULT_COORDINATE_PRECISION)
}

/// Serialize `model` into a 3MF package with `precision` fractional digits
pub fn write_package_with_precision(model: &Model, precision: usize) -> Result<Vec<u8>> {
    let cursor = model.to_writer(Cursor::new(Vec::new()), precision)?;
    Ok(cursor.into_inner())
}

/// Read a 3MF package held in memory
pub fn read_package(bytes: &[u8]) -> Result<Parsed<Model>> {
    read_package_from(Cursor::new(bytes))
}

/// Read a 3MF package from any seekable reader
///
/// Structural problems with the container fail with [`Error::PackageFormat`]; problems
/// inside the model part are isolated and returned as warnings where possible.
pub fn read_package_from<R: Read + Seek>(reader: R) -> Result<Parsed<Model>> {
    let mut package = opc::Package::open(reader)?;
    let xml = package.model_bytes()?;
    let mut parsed = parser::parse_document(&xml)?;
    parsed.value.attachments = package.attachments()?;
    Ok(parsed)
}

/// Build a document from `scene` and serialize it into package bytes
pub fn export_scene(scene: &SceneGraph, options: &ExportOptions) -> Result<Vec<u8>> {
    let model = build_document(scene, options)?;
    write_package_with_precision(&model, options.coordinate_precision)
}

/// Export `scene` to a 3MF file at `path`
///
/// The file is only created once the package was produced in full.
pub fn export_to_file<P: AsRef<Path>>(
    path: P,
    scene: &SceneGraph,
    options: &ExportOptions,
) -> Result<()> {
    let bytes = export_scene(scene, options)?;
    std::fs::write(path.as_ref(), bytes)?;
    tracing::info!(path = %path.as_ref().display(), objects = scene.objects.len(), "exported 3MF");
    Ok(())
}

/// Import a 3MF file into host terms
///
/// Warnings from reading the document and from converting it are returned together.
pub fn import_from_file<P: AsRef<Path>>(
    path: P,
    options: &ImportOptions,
) -> Result<Parsed<ImportedScene>> {
    let file = std::fs::File::open(path.as_ref())?;
    let (model, mut warnings) = read_package_from(std::io::BufReader::new(file))?.into_parts();
    let imported = import_scene(&model, options);
    warnings.extend(imported.warnings);
    tracing::info!(
        path = %path.as_ref().display(),
        objects = imported.value.objects.len(),
        skipped = warnings.len(),
        "imported 3MF"
    );
    Ok(Parsed {
        value: imported.value,
        warnings,
    })
}

impl Model {
    /// Parse a 3MF package from a reader, discarding warnings
    ///
    /// Use [`read_package_from`] to see what was skipped.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use threemf_codec::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let model = Model::from_reader(file)?;
    /// println!("Model contains {} objects", model.resources.objects.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Ok(read_package_from(reader)?.value)
    }

    /// Write the model as a complete 3MF package to `writer`
    ///
    /// Returns the writer after the archive is finished.
    pub fn to_writer<W: Write + Seek>(&self, writer: W, precision: usize) -> Result<W> {
        let mut xml_buffer = Vec::new();
        writer::write_model_xml(self, &mut xml_buffer, precision)?;
        opc::create_package(writer, &xml_buffer, &self.attachments)
    }

    /// Write the model to a file with the default coordinate precision
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = write_package(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
