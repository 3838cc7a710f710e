//! Namespaces, element names and package constants for 3MF
//!
//! Every other module takes namespace URIs, prefixes, content types and relationship
//! types from here.

/// 3MF core namespace
pub const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

/// Materials & Properties extension namespace
pub const MATERIAL_NAMESPACE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/material/2015/02";

/// Triangle Sets extension namespace
pub const TRIANGLESETS_NAMESPACE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/trianglesets/2021/07";

/// Namespace of the `xml:` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// OPC content types namespace
pub const CONTENT_TYPES_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";

/// OPC relationships namespace
pub const RELATIONSHIPS_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

/// Content type of relationship parts
pub const RELATIONSHIPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

/// Content type of 3D model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Relationship type pointing at the root 3D model part
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Relationship type of package thumbnails (OPC standard)
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// Language tag written when the model declares none
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Element names used by the model part
pub mod element {
    /// Root element
    pub const MODEL: &str = "model";
    /// Metadata entry
    pub const METADATA: &str = "metadata";
    /// Resource container
    pub const RESOURCES: &str = "resources";
    /// Object resource
    pub const OBJECT: &str = "object";
    /// Mesh of an object
    pub const MESH: &str = "mesh";
    /// Vertex list
    pub const VERTICES: &str = "vertices";
    /// Single vertex
    pub const VERTEX: &str = "vertex";
    /// Triangle list
    pub const TRIANGLES: &str = "triangles";
    /// Single triangle
    pub const TRIANGLE: &str = "triangle";
    /// Build list
    pub const BUILD: &str = "build";
    /// Build item
    pub const ITEM: &str = "item";
    /// Base material group
    pub const BASEMATERIALS: &str = "basematerials";
    /// Base material entry
    pub const BASE: &str = "base";
    /// Triangle set container
    pub const TRIANGLESETS: &str = "trianglesets";
    /// Triangle set
    pub const TRIANGLESET: &str = "triangleset";
    /// Single triangle reference
    pub const REF: &str = "ref";
    /// Inclusive triangle reference range
    pub const REFRANGE: &str = "refrange";
}

/// A namespace this codec understands
///
/// Extensions add capabilities beyond the 3MF core. Each one is bound to
/// the prefix this crate uses when writing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Core 3MF namespace (always present)
    Core,
    /// Materials & Properties Extension
    Material,
    /// Triangle Sets Extension
    TriangleSets,
}

impl Extension {
    /// All known extensions, core first
    pub const ALL: [Extension; 3] = [Extension::Core, Extension::Material, Extension::TriangleSets];

    /// Get the namespace URI for this extension
    pub fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => CORE_NAMESPACE,
            Extension::Material => MATERIAL_NAMESPACE,
            Extension::TriangleSets => TRIANGLESETS_NAMESPACE,
        }
    }

    /// Prefix used when writing this extension; `None` for the default namespace
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Extension::Core => None,
            Extension::Material => Some("m"),
            Extension::TriangleSets => Some("t"),
        }
    }

    /// Get extension from namespace URI
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ext| ext.namespace() == namespace)
    }

    /// Get a human-readable name for this extension
    pub fn name(&self) -> &'static str {
        match self {
            Extension::Core => "Core",
            Extension::Material => "Material",
            Extension::TriangleSets => "TriangleSets",
        }
    }

    /// Qualified name of `local` inside this extension, as written by this crate
    pub fn qualify(&self, local: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    /// `xmlns` attribute declaring this extension on the root element
    pub fn declaration(&self) -> (String, &'static str) {
        match self.prefix() {
            Some(prefix) => (format!("xmlns:{}", prefix), self.namespace()),
            None => ("xmlns".to_string(), self.namespace()),
        }
    }
}

/// Prefix → namespace pairs for every extension with a prefix
pub fn model_namespaces() -> impl Iterator<Item = (&'static str, &'static str)> {
    Extension::ALL
        .into_iter()
        .filter_map(|ext| ext.prefix().map(|prefix| (prefix, ext.namespace())))
}

/// Strip the prefix from a qualified XML name
///
/// - `"t:triangleset"` returns `"triangleset"`
/// - `"object"` returns `"object"`
pub fn local_name(qualified: &str) -> &str {
    match qualified.rfind(':') {
        Some(pos) => &qualified[pos + 1..],
        None => qualified,
    }
}

/// Prefix of a qualified XML name, if it has one
pub fn prefix_of(qualified: &str) -> Option<&str> {
    qualified.rfind(':').map(|pos| &qualified[..pos])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trianglesets_namespace() {
        assert_eq!(
            TRIANGLESETS_NAMESPACE,
            "http://schemas.microsoft.com/3dmanufacturing/trianglesets/2021/07"
        );
        assert_eq!(Extension::TriangleSets.prefix(), Some("t"));
    }

    #[test]
    fn test_model_namespaces_contains_t() {
        let map: Vec<_> = model_namespaces().collect();
        assert!(map.contains(&("t", TRIANGLESETS_NAMESPACE)));
        assert!(map.contains(&("m", MATERIAL_NAMESPACE)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_from_namespace() {
        assert_eq!(
            Extension::from_namespace(CORE_NAMESPACE),
            Some(Extension::Core)
        );
        assert_eq!(
            Extension::from_namespace(TRIANGLESETS_NAMESPACE),
            Some(Extension::TriangleSets)
        );
        assert_eq!(Extension::from_namespace("urn:unknown"), None);
    }

    #[test]
    fn test_qualify_and_declaration() {
        assert_eq!(Extension::TriangleSets.qualify("ref"), "t:ref");
        assert_eq!(Extension::Core.qualify("object"), "object");
        assert_eq!(
            Extension::Material.declaration(),
            ("xmlns:m".to_string(), MATERIAL_NAMESPACE)
        );
    }

    #[test]
    fn test_name_helpers() {
        assert_eq!(local_name("t:triangleset"), "triangleset");
        assert_eq!(local_name("object"), "object");
        assert_eq!(prefix_of("t:ref"), Some("t"));
        assert_eq!(prefix_of("ref"), None);
    }
}
