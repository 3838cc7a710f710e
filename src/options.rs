//! Import and export configuration
//!
//! Both option sets are plain values with a [`Default`] and chainable `with_*`
//! methods, so a host can start from the defaults and override only what its user
//! changed.

use crate::model::Unit;

/// Fractional digits written for vertex coordinates unless configured otherwise
pub const DEFAULT_COORDINATE_PRECISION: usize = 6;

/// Options controlling how a scene snapshot becomes a 3MF document
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Extra factor applied on top of the unit conversion
    pub global_scale: f64,
    /// Export only objects the host marked as selected
    pub use_selection: bool,
    /// Prefer the host-evaluated mesh (modifiers applied) when the snapshot has one
    pub use_mesh_modifiers: bool,
    /// Digits after the decimal point for vertex coordinates
    pub coordinate_precision: usize,
    /// Emit one triangle set per material slot used by an object
    pub material_triangle_sets: bool,
    /// Unit declared on the written document
    pub unit: Unit,
    /// Unit the host scene is modelled in
    pub host_unit: Unit,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            global_scale: 1.0,
            use_selection: false,
            use_mesh_modifiers: true,
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            material_triangle_sets: true,
            unit: Unit::Millimeter,
            host_unit: Unit::Meter,
        }
    }
}

impl ExportOptions {
    /// Default export options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global scale factor
    pub fn with_global_scale(mut self, global_scale: f64) -> Self {
        self.global_scale = global_scale;
        self
    }

    /// Restrict the export to selected objects
    pub fn with_selection(mut self, use_selection: bool) -> Self {
        self.use_selection = use_selection;
        self
    }

    /// Choose between the evaluated and the base mesh
    pub fn with_mesh_modifiers(mut self, use_mesh_modifiers: bool) -> Self {
        self.use_mesh_modifiers = use_mesh_modifiers;
        self
    }

    /// Set the number of fractional digits for coordinates
    pub fn with_coordinate_precision(mut self, coordinate_precision: usize) -> Self {
        self.coordinate_precision = coordinate_precision;
        self
    }

    /// Toggle per-material triangle sets
    pub fn with_material_triangle_sets(mut self, material_triangle_sets: bool) -> Self {
        self.material_triangle_sets = material_triangle_sets;
        self
    }

    /// Set the document unit
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Set the host scene unit
    pub fn with_host_unit(mut self, host_unit: Unit) -> Self {
        self.host_unit = host_unit;
        self
    }

    /// Factor turning a host length into a document length
    pub fn scale_factor(&self) -> f64 {
        self.host_unit.conversion_to(self.unit) * self.global_scale
    }
}

/// Options controlling how a 3MF document becomes host scene data
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Extra factor applied on top of the unit conversion
    pub global_scale: f64,
    /// Unit the host scene is modelled in
    pub host_unit: Unit,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            global_scale: 1.0,
            host_unit: Unit::Meter,
        }
    }
}

impl ImportOptions {
    /// Default import options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global scale factor
    pub fn with_global_scale(mut self, global_scale: f64) -> Self {
        self.global_scale = global_scale;
        self
    }

    /// Set the host scene unit
    pub fn with_host_unit(mut self, host_unit: Unit) -> Self {
        self.host_unit = host_unit;
        self
    }

    /// Factor turning a length in `unit` into a host length
    pub fn scale_factor(&self, unit: Unit) -> f64 {
        unit.conversion_to(self.host_unit) * self.global_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_defaults() {
        let options = ExportOptions::default();
        assert_eq!(options.coordinate_precision, 6);
        assert!(options.material_triangle_sets);
        assert!(!options.use_selection);
        assert_eq!(options.unit, Unit::Millimeter);
        assert_eq!(options.host_unit, Unit::Meter);
    }

    #[test]
    fn test_export_scale_meter_to_millimeter() {
        let options = ExportOptions::new().with_global_scale(2.0);
        assert!((options.scale_factor() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_import_scale_is_inverse() {
        let export = ExportOptions::new().with_unit(Unit::Inch);
        let import = ImportOptions::new();
        let round = export.scale_factor() * import.scale_factor(Unit::Inch);
        assert!((round - 1.0).abs() < 1e-12);
    }
}
