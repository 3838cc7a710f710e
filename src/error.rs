//! Error and warning types for 3MF reading and writing
//!
//! Fatal problems are reported through [`Error`]. Problems the reader can isolate to a
//! single object, triangle set or build item are collected as [`Warning`]s and returned
//! next to the successfully parsed value in a [`Parsed`].
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O, archive and package errors
//! - **E2xxx**: XML and schema errors
//! - **E3xxx**: Geometry and numeric errors
//! - **E4xxx**: Extension encoding errors
//!
//! ## Error Codes
//!
//! - `E1001`: I/O error
//! - `E1002`: ZIP archive format error
//! - `E1003`: Package structurally invalid or missing required parts
//! - `E1004`: Package could not be written
//! - `E2001`: XML parsing error
//! - `E2002`: XML attribute error
//! - `E2003`: Required element or attribute absent or invalid
//! - `E3001`: Invalid vertex or triangle data
//! - `E3002`: Numeric parse error
//! - `E4001`: Triangle sets writer invariant violated

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading or writing 3MF packages
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Input is not a ZIP archive
    /// - Truncated or corrupted archive
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The package is structurally invalid
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - Missing `[Content_Types].xml`
    /// - Missing `_rels/.rels` or no relationship of the 3dmodel type
    /// - The model relationship targets a part that is not in the archive
    ///
    /// **Suggestions**:
    /// - Verify the file is a 3MF package and not a bare model file
    /// - Re-export the file from the producing application
    #[error("[E1003] Invalid 3MF package: {0}")]
    PackageFormat(String),

    /// The package could not be written
    ///
    /// **Error Code**: E1004
    #[error("[E1004] Failed to write 3MF package: {0}")]
    PackageWrite(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Malformed XML syntax
    /// - Unclosed tags
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// A required element or attribute is absent or invalid
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Root element is not `model` in the 3MF core namespace
    /// - A resource lacks its `id`
    /// - A build item references an object that does not exist
    #[error("[E2003] Model schema error: {0}")]
    ModelSchema(String),

    /// Invalid vertex or triangle data
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - Triangle vertex index out of range
    /// - Triangle repeating a vertex index
    /// - Non-finite vertex coordinate
    #[error("[E3001] Invalid geometry: {0}")]
    Geometry(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    ///
    /// **Suggestions**:
    /// - Verify numeric values use proper format (e.g., "1.5" not "1,5")
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// The triangle sets writer invariant was violated
    ///
    /// **Error Code**: E4001
    ///
    /// **Common Causes**:
    /// - A triangle set with an empty `identifier`
    /// - Two triangle sets of one mesh sharing an identifier
    /// - A triangle set referencing a triangle outside its mesh
    #[error("[E4001] Triangle sets encoding error: {0}")]
    ExtensionEncoding(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create a ModelSchema error for a missing required attribute
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("object", "id")
    /// ```
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::ModelSchema(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ))
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "vertex x coordinate")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "floating-point number")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'",
            field_name, expected_type, value
        ))
    }

    /// Create a PackageWrite error
    pub fn package_write(message: impl Into<String>) -> Self {
        Error::PackageWrite(message.into())
    }

    /// Create a PackageWrite error for a failed XML event
    pub fn xml_write(message: impl Into<String>) -> Self {
        Error::PackageWrite(message.into())
    }

    /// Create a PackageFormat error
    pub fn package_format(message: impl Into<String>) -> Self {
        Error::PackageFormat(message.into())
    }

    /// Warning category this error maps to when the reader isolates it
    pub fn warning_kind(&self) -> WarningKind {
        match self {
            Error::Geometry(_) => WarningKind::Geometry,
            Error::ExtensionEncoding(_) => WarningKind::TriangleSet,
            _ => WarningKind::ModelSchema,
        }
    }
}

/// Category of a non-fatal problem found while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A required element or attribute was absent or invalid; the element was skipped
    ModelSchema,
    /// Invalid vertex or triangle data; the owning object or triangle was skipped
    Geometry,
    /// A triangle set was malformed and dropped, or is empty
    TriangleSet,
    /// An unknown element could not be preserved
    Passthrough,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::ModelSchema => "schema",
            WarningKind::Geometry => "geometry",
            WarningKind::TriangleSet => "triangle set",
            WarningKind::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem collected while reading a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Category of the problem
    pub kind: WarningKind,
    /// Human readable description
    pub message: String,
    /// Resource ID of the affected object, when known
    pub object_id: Option<usize>,
}

impl Warning {
    /// Create a warning not tied to a specific object
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            object_id: None,
        }
    }

    /// Attach the resource ID of the affected object
    pub fn for_object(mut self, object_id: usize) -> Self {
        self.object_id = Some(object_id);
        self
    }

    /// Build a warning from an isolated error
    pub fn from_error(err: &Error) -> Self {
        Self::new(err.warning_kind(), err.to_string())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_id {
            Some(id) => write!(f, "{} warning (object {}): {}", self.kind, id, self.message),
            None => write!(f, "{} warning: {}", self.kind, self.message),
        }
    }
}

/// A successfully read value together with the warnings collected on the way
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    /// The value that was read
    pub value: T,
    /// Problems that were isolated and skipped
    pub warnings: Vec<Warning>,
}

impl<T> Parsed<T> {
    /// Wrap a value without warnings
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Number of collected warnings
    pub fn skipped_count(&self) -> usize {
        self.warnings.len()
    }

    /// Count warnings of one category
    pub fn count_of(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Transform the value, keeping the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Split into value and warnings
    pub fn into_parts(self) -> (T, Vec<Warning>) {
        (self.value, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let package = Error::PackageFormat("no model".to_string());
        assert!(package.to_string().contains("[E1003]"));

        let write = Error::package_write("disk full");
        assert!(write.to_string().contains("[E1004]"));

        let schema = Error::ModelSchema("bad root".to_string());
        assert!(schema.to_string().contains("[E2003]"));

        let geometry = Error::Geometry("index 9 out of range".to_string());
        assert!(geometry.to_string().contains("[E3001]"));

        let encoding = Error::ExtensionEncoding("empty identifier".to_string());
        assert!(encoding.to_string().contains("[E4001]"));
    }

    #[test]
    fn test_missing_attribute_helper() {
        let err = Error::missing_attribute("object", "id");
        assert!(err.to_string().contains("Element '<object>'"));
        assert!(err.to_string().contains("missing required attribute 'id'"));
        assert!(err.to_string().contains("[E2003]"));
    }

    #[test]
    fn test_parse_error_with_context_helper() {
        let err =
            Error::parse_error_with_context("vertex x coordinate", "abc", "floating-point number");
        assert!(err.to_string().contains("vertex x coordinate"));
        assert!(err.to_string().contains("'abc'"));
        assert!(err.to_string().contains("[E3002]"));
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parse_err: std::num::ParseFloatError = "not_a_number".parse::<f64>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(
            err.to_string()
                .contains("Failed to parse floating-point number")
        );
    }

    #[test]
    fn test_warning_kind_mapping() {
        assert_eq!(
            Error::Geometry(String::new()).warning_kind(),
            WarningKind::Geometry
        );
        assert_eq!(
            Error::ParseError(String::new()).warning_kind(),
            WarningKind::ModelSchema
        );
        assert_eq!(
            Error::ExtensionEncoding(String::new()).warning_kind(),
            WarningKind::TriangleSet
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::new(WarningKind::Geometry, "triangle 3 out of range").for_object(7);
        assert_eq!(
            warning.to_string(),
            "geometry warning (object 7): triangle 3 out of range"
        );
    }

    #[test]
    fn test_parsed_counts() {
        let mut parsed = Parsed::new(());
        parsed
            .warnings
            .push(Warning::new(WarningKind::Geometry, "a"));
        parsed
            .warnings
            .push(Warning::new(WarningKind::TriangleSet, "b"));
        assert_eq!(parsed.skipped_count(), 2);
        assert_eq!(parsed.count_of(WarningKind::Geometry), 1);
        let mapped = parsed.map(|_| 5);
        assert_eq!(mapped.value, 5);
        assert_eq!(mapped.warnings.len(), 2);
    }
}
