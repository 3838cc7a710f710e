//! XML parsing for 3MF model files
//!
//! The parser walks the model part once with a `quick_xml` event loop. A stack of
//! [`Context`]s tracks where in the document it is and a parallel stack of namespace
//! scopes resolves prefixes, so a triangle set is recognised by the namespace its
//! prefix is bound to rather than by the prefix text.
//!
//! Problems confined to one object, material group, triangle set or build item are
//! recorded as [`Warning`]s and the offending element is skipped. Only a missing or
//! foreign root, a DTD, or XML that is not well-formed fail the whole document.

mod core;
mod material;
mod triangle_sets;

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{Error, Parsed, Result, Warning, WarningKind};
use crate::model::{
    BaseMaterialGroup, MetadataEntry, Model, PassthroughResource, Triangle, TriangleSetLayout,
    remap_triangle_sets,
};
use crate::schema::{
    CORE_NAMESPACE, Extension, TRIANGLESETS_NAMESPACE, XML_NAMESPACE, element, local_name,
    prefix_of,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use self::core::{ObjectHeader, parse_build_item, parse_object, parse_triangle, parse_vertex};
use self::material::{parse_base_material, parse_base_material_group};
use self::triangle_sets::TriangleSetsBlock;

/// Parse a 3MF model part
///
/// Returns the model together with every warning collected on the way.
pub fn parse_document(xml: &[u8]) -> Result<Parsed<Model>> {
    parse_model(xml)
}

/// Parse a 3MF model part from any buffered reader
pub fn parse_model<R: BufRead>(source: R) -> Result<Parsed<Model>> {
    let mut reader = Reader::from_reader(source);
    ModelParser::new().run(&mut reader)
}

/// Parse attributes into a map of qualified name → unescaped value
pub(crate) fn parse_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::XmlAttr(e.to_string()))?;
        let raw = std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|e| Error::XmlAttr(format!("{}: {}", key, e)))?;
        attrs.insert(key.to_string(), value.into_owned());
    }
    Ok(attrs)
}

/// Namespace an element resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Known(Extension),
    /// No prefix and no default namespace in scope
    Unqualified,
    Foreign,
}

/// `xmlns` declarations of every open element, innermost last
#[derive(Debug, Default)]
struct NamespaceScopes {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScopes {
    fn push(&mut self, e: &BytesStart) -> Result<()> {
        let mut frame = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::XmlAttr(e.to_string()))?;
            let prefix = if key == "xmlns" {
                None
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                Some(prefix.to_string())
            } else {
                continue;
            };
            let uri = std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;
            frame.push((prefix, uri.to_string()));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn classify(&self, qname: &str) -> Ns {
        match self.resolve(prefix_of(qname)) {
            None | Some("") => Ns::Unqualified,
            Some(uri) => Extension::from_namespace(uri).map_or(Ns::Foreign, Ns::Known),
        }
    }

    /// Declarations in scope for the innermost element that were made neither by it
    /// nor by the root, innermost binding first
    fn inherited_declarations(&self) -> Vec<(Option<String>, String)> {
        let Some((own, ancestors)) = self.frames.split_last() else {
            return Vec::new();
        };
        let mut declarations: Vec<(Option<String>, String)> = Vec::new();
        for (prefix, uri) in ancestors.iter().skip(1).rev().flat_map(|f| f.iter().rev()) {
            let shadowed = own.iter().chain(declarations.iter()).any(|(p, _)| p == prefix);
            if !shadowed {
                declarations.push((prefix.clone(), uri.clone()));
            }
        }
        declarations
    }

    /// Prefixed declarations made by the innermost open element
    fn innermost_prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.frames
            .last()
            .into_iter()
            .flatten()
            .filter_map(|(p, uri)| p.as_deref().map(|p| (p, uri.as_str())))
    }
}

/// Where the parser currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Model,
    Metadata,
    Resources,
    Object,
    Mesh,
    Vertices,
    Triangles,
    TriangleSets,
    TriangleSet,
    LegacyRef,
    BaseMaterials,
    Build,
}

/// What to do with an element that was just opened
enum Action {
    /// Descend into a container
    Enter(Context),
    /// Leaf element already consumed from its start tag
    Handled,
    /// Ignore the element and its subtree
    Skip,
    /// Keep the element verbatim as a passthrough resource
    Capture,
}

struct ObjectState {
    header: ObjectHeader,
    has_mesh: bool,
    failure: Option<String>,
    blocks: Vec<TriangleSetsBlock>,
}

struct BaseMaterialsState {
    group: BaseMaterialGroup,
    failure: Option<Error>,
}

struct ModelParser {
    model: Model,
    warnings: Vec<Warning>,
    scopes: NamespaceScopes,
    stack: Vec<Context>,
    seen_root: bool,
    object: Option<ObjectState>,
    materials: Option<BaseMaterialsState>,
    metadata: Option<MetadataEntry>,
    /// Running count of kept triangle sets, used to name legacy sets
    set_ordinal: usize,
}

impl ModelParser {
    fn new() -> Self {
        Self {
            model: Model::new(),
            warnings: Vec::new(),
            scopes: NamespaceScopes::default(),
            stack: Vec::new(),
            seen_root: false,
            object: None,
            materials: None,
            metadata: None,
            set_ordinal: 0,
        }
    }

    fn run<R: BufRead>(mut self, reader: &mut Reader<R>) -> Result<Parsed<Model>> {
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => self.start(reader, &e, false)?,
                Event::Empty(e) => self.start(reader, &e, true)?,
                Event::End(_) => self.end()?,
                Event::Text(t) => {
                    let text = std::str::from_utf8(&t).map_err(|e| Error::ModelSchema(e.to_string()))?;
                    self.text(text);
                }
                Event::CData(t) => {
                    let text = std::str::from_utf8(&t).map_err(|e| Error::ModelSchema(e.to_string()))?;
                    self.text(text);
                }
                Event::GeneralRef(r) => {
                    let name = std::str::from_utf8(&r).map_err(|e| Error::ModelSchema(e.to_string()))?;
                    let reference = format!("&{};", name);
                    match quick_xml::escape::unescape(&reference) {
                        Ok(resolved) => self.text(&resolved),
                        Err(_) => self.text(&reference),
                    }
                }
                Event::DocType(_) => {
                    return Err(Error::ModelSchema(
                        "DTD declarations are not allowed in 3MF model files".to_string(),
                    ));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !self.stack.is_empty() {
            return Err(Error::ModelSchema(format!(
                "Document ended inside {:?}",
                self.stack.last()
            )));
        }
        self.finish()
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!(%warning, "skipping invalid model content");
        self.warnings.push(warning);
    }

    fn start<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        e: &BytesStart,
        is_empty: bool,
    ) -> Result<()> {
        self.scopes.push(e)?;
        let qname = std::str::from_utf8(e.name().as_ref())
            .map_err(|e| Error::ModelSchema(e.to_string()))?
            .to_string();
        let ns = self.scopes.classify(&qname);

        match self.open(e, ns, &qname)? {
            Action::Enter(context) => {
                self.stack.push(context);
                if is_empty {
                    self.end()?;
                }
            }
            Action::Handled | Action::Skip => {
                self.scopes.pop();
                if !is_empty {
                    let end = e.to_end();
                    reader.read_to_end_into(end.name(), &mut Vec::new())?;
                }
            }
            Action::Capture => {
                // The subtree is written back below the root, so bindings made
                // between the two have to travel with it
                let mut start = e.clone();
                for (prefix, uri) in self.scopes.inherited_declarations() {
                    let key = match prefix {
                        Some(prefix) => format!("xmlns:{}", prefix),
                        None => "xmlns".to_string(),
                    };
                    start.push_attribute((key.as_str(), uri.as_str()));
                }
                self.scopes.pop();
                let xml = if is_empty {
                    capture_empty(&start)?
                } else {
                    capture_subtree(reader, &start)?
                };
                self.push_passthrough(e, xml)?;
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(context) = self.stack.pop() {
            self.close(context);
        }
        self.scopes.pop();
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.stack.last().copied() {
            Some(Context::Metadata) => {
                if let Some(entry) = &mut self.metadata {
                    entry.value.push_str(text);
                }
            }
            Some(Context::LegacyRef) => {
                if let Some(block) = self.current_block() {
                    block.push_text(text);
                }
            }
            _ => {}
        }
    }

    fn open(&mut self, e: &BytesStart, ns: Ns, qname: &str) -> Result<Action> {
        let local = local_name(qname);
        let core = ns == Ns::Known(Extension::Core);

        let action = match self.stack.last().copied() {
            None => {
                self.open_model(e, ns, qname)?;
                Action::Enter(Context::Model)
            }
            Some(Context::Model) if core => match local {
                element::METADATA => self.open_metadata(e),
                element::RESOURCES => Action::Enter(Context::Resources),
                element::BUILD => Action::Enter(Context::Build),
                _ => Action::Skip,
            },
            Some(Context::Resources) => match (ns, local) {
                (Ns::Known(Extension::Core), element::OBJECT) => self.open_object(e),
                (
                    Ns::Known(Extension::Core | Extension::Material),
                    element::BASEMATERIALS,
                ) => self.open_base_materials(e),
                (Ns::Known(Extension::Core) | Ns::Unqualified, _) => {
                    tracing::debug!(element = %qname, "ignoring unknown core resource");
                    Action::Skip
                }
                _ => Action::Capture,
            },
            Some(Context::Object) if core && local == element::MESH => {
                if let Some(state) = &mut self.object {
                    state.has_mesh = true;
                }
                Action::Enter(Context::Mesh)
            }
            Some(Context::Mesh) => match (ns, local) {
                (Ns::Known(Extension::Core), element::VERTICES) => Action::Enter(Context::Vertices),
                (Ns::Known(Extension::Core), element::TRIANGLES) => {
                    Action::Enter(Context::Triangles)
                }
                (Ns::Known(Extension::TriangleSets), element::TRIANGLESETS) => {
                    self.open_triangle_sets(TriangleSetLayout::Current)
                }
                (Ns::Known(Extension::Core) | Ns::Unqualified, element::TRIANGLESETS) => {
                    self.open_triangle_sets(TriangleSetLayout::Legacy)
                }
                _ => Action::Skip,
            },
            Some(Context::Vertices) if core && local == element::VERTEX => {
                self.add_vertex(e);
                Action::Handled
            }
            Some(Context::Triangles) if core && local == element::TRIANGLE => {
                self.add_triangle(e);
                Action::Handled
            }
            Some(Context::TriangleSets) if local == element::TRIANGLESET => {
                self.open_triangle_set(e)
            }
            Some(Context::TriangleSet) => self.triangle_set_member(e, local),
            Some(Context::BaseMaterials) if local == element::BASE => {
                self.add_base_material(e);
                Action::Handled
            }
            Some(Context::Build) if core && local == element::ITEM => {
                self.add_build_item(e);
                Action::Handled
            }
            _ => Action::Skip,
        };
        Ok(action)
    }

    fn close(&mut self, context: Context) {
        match context {
            Context::Metadata => {
                if let Some(entry) = self.metadata.take() {
                    self.model.metadata.push(entry);
                }
            }
            Context::Object => {
                if let Some(state) = self.object.take() {
                    self.finish_object(state);
                }
            }
            Context::BaseMaterials => {
                if let Some(state) = self.materials.take() {
                    match state.failure {
                        Some(err) => self.warn(
                            Warning::new(
                                WarningKind::ModelSchema,
                                format!(
                                    "base material group {} skipped: {}",
                                    state.group.id, err
                                ),
                            ),
                        ),
                        None => self.model.resources.base_material_groups.push(state.group),
                    }
                }
            }
            _ => {}
        }
    }

    fn open_model(&mut self, e: &BytesStart, ns: Ns, qname: &str) -> Result<()> {
        if local_name(qname) != element::MODEL || ns != Ns::Known(Extension::Core) {
            return Err(Error::ModelSchema(format!(
                "Root element must be <model> in namespace {}, found <{}>",
                CORE_NAMESPACE, qname
            )));
        }
        self.seen_root = true;

        let attrs = parse_attributes(e)?;
        if let Some(unit) = attrs.get("unit") {
            match unit.parse() {
                Ok(unit) => self.model.unit = unit,
                Err(err) => self.warn(Warning::new(
                    WarningKind::ModelSchema,
                    format!("{}; using millimeter", err),
                )),
            }
        }
        if let Some(lang) = attrs.get("xml:lang") {
            self.model.language = lang.clone();
        }

        self.model.foreign_namespaces = self
            .scopes
            .innermost_prefixes()
            .filter(|&(prefix, uri)| !(prefix == "t" && uri == TRIANGLESETS_NAMESPACE))
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect();

        if let Some(required) = attrs.get("requiredextensions") {
            let unsupported: Vec<String> = required
                .split_whitespace()
                .filter_map(|prefix| {
                    let uri = self.scopes.resolve(Some(prefix)).unwrap_or(prefix);
                    Extension::from_namespace(uri)
                        .is_none()
                        .then(|| uri.to_string())
                })
                .collect();
            for uri in unsupported {
                self.warn(Warning::new(
                    WarningKind::ModelSchema,
                    format!(
                        "required extension {} is not supported; its content is kept only where it can be passed through",
                        uri
                    ),
                ));
            }
        }
        Ok(())
    }

    fn open_metadata(&mut self, e: &BytesStart) -> Action {
        let attrs = match parse_attributes(e) {
            Ok(attrs) => attrs,
            Err(err) => {
                self.warn(Warning::from_error(&err));
                return Action::Skip;
            }
        };
        let Some(name) = attrs.get("name") else {
            self.warn(Warning::from_error(&Error::missing_attribute(
                "metadata", "name",
            )));
            return Action::Skip;
        };
        let mut entry = MetadataEntry::new(name.clone(), String::new());
        entry.preserve = attrs
            .get("preserve")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        self.metadata = Some(entry);
        Action::Enter(Context::Metadata)
    }

    fn id_taken(&self, id: usize) -> bool {
        self.model.resources.contains_id(id)
    }

    fn open_object(&mut self, e: &BytesStart) -> Action {
        match parse_object(e) {
            Ok(header) => {
                let id = header.object.id;
                if self.id_taken(id) {
                    self.warn(
                        Warning::new(
                            WarningKind::ModelSchema,
                            format!("resource id {} is already used; object skipped", id),
                        )
                        .for_object(id),
                    );
                    return Action::Skip;
                }
                self.object = Some(ObjectState {
                    header,
                    has_mesh: false,
                    failure: None,
                    blocks: Vec::new(),
                });
                Action::Enter(Context::Object)
            }
            Err(err) => {
                self.warn(Warning::from_error(&err));
                Action::Skip
            }
        }
    }

    fn add_vertex(&mut self, e: &BytesStart) {
        if let Some(state) = &mut self.object
            && state.failure.is_none()
        {
            let mesh = &mut state.header.object.mesh;
            match parse_vertex(e) {
                Ok(vertex) => mesh.vertices.push(vertex),
                Err(err) => {
                    state.failure = Some(format!("vertex {}: {}", mesh.vertices.len(), err));
                }
            }
        }
    }

    fn add_triangle(&mut self, e: &BytesStart) {
        if let Some(state) = &mut self.object
            && state.failure.is_none()
        {
            let mesh = &mut state.header.object.mesh;
            match parse_triangle(e) {
                Ok(triangle) => mesh.triangles.push(triangle),
                Err(err) => {
                    state.failure = Some(format!("triangle {}: {}", mesh.triangles.len(), err));
                }
            }
        }
    }

    fn current_block(&mut self) -> Option<&mut TriangleSetsBlock> {
        self.object.as_mut()?.blocks.last_mut()
    }

    fn open_triangle_sets(&mut self, layout: TriangleSetLayout) -> Action {
        match &mut self.object {
            Some(state) => {
                state.blocks.push(TriangleSetsBlock::new(layout));
                Action::Enter(Context::TriangleSets)
            }
            None => Action::Skip,
        }
    }

    fn open_triangle_set(&mut self, e: &BytesStart) -> Action {
        let Some(block) = self.current_block() else {
            return Action::Skip;
        };
        match block.open_set(e) {
            Ok(()) => Action::Enter(Context::TriangleSet),
            Err(err) => {
                let mut warning = Warning::new(WarningKind::TriangleSet, err.to_string());
                if let Some(state) = &self.object {
                    warning = warning.for_object(state.header.object.id);
                }
                self.warn(warning);
                Action::Skip
            }
        }
    }

    fn triangle_set_member(&mut self, e: &BytesStart, local: &str) -> Action {
        let Some(block) = self.current_block() else {
            return Action::Skip;
        };
        match (block.layout(), local) {
            (TriangleSetLayout::Legacy, element::REF) => Action::Enter(Context::LegacyRef),
            (TriangleSetLayout::Current, element::REF) => {
                block.push_ref(e);
                Action::Handled
            }
            (TriangleSetLayout::Current, element::REFRANGE) => {
                block.push_range(e);
                Action::Handled
            }
            _ => Action::Skip,
        }
    }

    fn open_base_materials(&mut self, e: &BytesStart) -> Action {
        match parse_base_material_group(e) {
            Ok(group) => {
                if self.id_taken(group.id) {
                    self.warn(Warning::new(
                        WarningKind::ModelSchema,
                        format!(
                            "resource id {} is already used; base material group skipped",
                            group.id
                        ),
                    ));
                    return Action::Skip;
                }
                self.materials = Some(BaseMaterialsState {
                    group,
                    failure: None,
                });
                Action::Enter(Context::BaseMaterials)
            }
            Err(err) => {
                self.warn(Warning::from_error(&err));
                Action::Skip
            }
        }
    }

    fn add_base_material(&mut self, e: &BytesStart) {
        if let Some(state) = &mut self.materials
            && state.failure.is_none()
        {
            match parse_base_material(e) {
                Ok(material) => state.group.materials.push(material),
                Err(err) => state.failure = Some(err),
            }
        }
    }

    fn add_build_item(&mut self, e: &BytesStart) {
        match parse_build_item(e) {
            Ok(item) => self.model.build.items.push(item),
            Err(err) => self.warn(Warning::new(
                WarningKind::ModelSchema,
                format!("build item skipped: {}", err),
            )),
        }
    }

    fn push_passthrough(&mut self, e: &BytesStart, xml: String) -> Result<()> {
        let id = parse_attributes(e)?
            .get("id")
            .and_then(|id| id.parse::<usize>().ok());
        if let Some(id) = id
            && self.id_taken(id)
        {
            self.warn(Warning::new(
                WarningKind::Passthrough,
                format!("resource id {} is already used; foreign resource dropped", id),
            ));
            return Ok(());
        }
        tracing::debug!(?id, bytes = xml.len(), "keeping foreign resource");
        self.model
            .resources
            .passthrough
            .push(PassthroughResource { id, xml });
        Ok(())
    }

    fn finish_object(&mut self, state: ObjectState) {
        let ObjectState {
            header,
            has_mesh,
            failure,
            mut blocks,
        } = state;
        let ObjectHeader {
            mut object,
            default_material,
        } = header;
        let id = object.id;

        if let Some(reason) = failure {
            self.warn(
                Warning::new(
                    WarningKind::Geometry,
                    format!("object skipped, {}", reason),
                )
                .for_object(id),
            );
            return;
        }
        if !has_mesh {
            self.warn(
                Warning::new(
                    WarningKind::ModelSchema,
                    "object has no mesh and was skipped",
                )
                .for_object(id),
            );
            return;
        }

        let mesh = &mut object.mesh;
        let vertex_count = mesh.vertices.len();
        let out_of_range = mesh.triangles.iter().enumerate().find_map(|(index, t)| {
            t.indices()
                .into_iter()
                .find(|&v| v >= vertex_count)
                .map(|v| (index, v))
        });
        if let Some((index, vertex)) = out_of_range {
            self.warn(
                Warning::new(
                    WarningKind::Geometry,
                    format!(
                        "object skipped, triangle {} references vertex {} but the mesh has {} vertices",
                        index, vertex, vertex_count
                    ),
                )
                .for_object(id),
            );
            return;
        }

        if let Some((pid, pindex)) = default_material {
            for triangle in mesh.triangles.iter_mut().filter(|t| t.pid.is_none()) {
                triangle.pid = Some(pid);
                triangle.p1 = triangle.p1.or(Some(pindex));
            }
        }

        // The namespaced layout wins when a mesh carries both
        let chosen = match blocks
            .iter()
            .position(|b| b.layout() == TriangleSetLayout::Current)
        {
            Some(index) => Some(blocks.swap_remove(index)),
            None => blocks.into_iter().next(),
        };
        let mut set_warnings = Vec::new();
        if let Some(block) = chosen {
            let layout = block.layout();
            let (sets, warnings) = block.project(mesh.triangles.len(), &mut self.set_ordinal, id);
            mesh.triangle_sets = sets;
            mesh.triangle_sets_layout = Some(layout);
            set_warnings = warnings;
        }

        let mut degenerate = 0;
        if mesh.triangles.iter().any(Triangle::is_degenerate) {
            let mut next = 0;
            let remap: Vec<Option<usize>> = mesh
                .triangles
                .iter()
                .map(|t| {
                    if t.is_degenerate() {
                        None
                    } else {
                        next += 1;
                        Some(next - 1)
                    }
                })
                .collect();
            degenerate = mesh.triangles.len() - next;
            mesh.triangles.retain(|t| !t.is_degenerate());
            remap_triangle_sets(&mut mesh.triangle_sets, &remap);
        }

        for warning in set_warnings {
            self.warn(warning);
        }
        if degenerate > 0 {
            self.warn(
                Warning::new(
                    WarningKind::Geometry,
                    format!("{} degenerate triangles dropped", degenerate),
                )
                .for_object(id),
            );
        }
        self.model.resources.objects.push(object);
    }

    /// Clear material references that point nowhere
    fn resolve_material_references(&mut self) {
        let groups: HashMap<usize, usize> = self
            .model
            .resources
            .base_material_groups
            .iter()
            .map(|g| (g.id, g.len()))
            .collect();

        let mut warnings = Vec::new();
        for object in &mut self.model.resources.objects {
            let mut cleared = 0;
            for triangle in &mut object.mesh.triangles {
                let Some(pid) = triangle.pid else {
                    continue;
                };
                let valid = match (groups.get(&pid), triangle.material_indices()) {
                    (Some(&len), Some(indices)) => indices.iter().all(|&i| i < len),
                    _ => false,
                };
                if !valid {
                    triangle.clear_material();
                    cleared += 1;
                }
            }
            if cleared > 0 {
                warnings.push(
                    Warning::new(
                        WarningKind::ModelSchema,
                        format!(
                            "{} triangles reference a missing material; material cleared",
                            cleared
                        ),
                    )
                    .for_object(object.id),
                );
            }
        }
        for warning in warnings {
            self.warn(warning);
        }
    }

    fn resolve_build_items(&mut self) {
        let items = std::mem::take(&mut self.model.build.items);
        for item in items {
            if self.model.resources.object(item.objectid).is_some() {
                self.model.build.items.push(item);
            } else {
                self.warn(Warning::new(
                    WarningKind::ModelSchema,
                    format!(
                        "build item references object {} which is not defined; item skipped",
                        item.objectid
                    ),
                ));
            }
        }
    }

    fn finish(mut self) -> Result<Parsed<Model>> {
        if !self.seen_root {
            return Err(Error::ModelSchema(
                "Document has no <model> root element".to_string(),
            ));
        }
        self.resolve_material_references();
        self.resolve_build_items();

        tracing::debug!(
            objects = self.model.resources.objects.len(),
            items = self.model.build.items.len(),
            warnings = self.warnings.len(),
            "parsed 3MF model"
        );
        Ok(Parsed {
            value: self.model,
            warnings: self.warnings,
        })
    }
}

fn capture_empty(e: &BytesStart) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Empty(e.clone()))?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::ModelSchema(e.to_string()))
}

/// Re-serialize an element and everything up to its matching end tag
fn capture_subtree<R: BufRead>(reader: &mut Reader<R>, e: &BytesStart) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(e.clone()))?;

    let mut buf = Vec::new();
    let mut depth = 1usize;
    while depth > 0 {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;
        // Whitespace-only text is layout; the writer indents the resource itself
        let layout = match &event {
            Event::Start(_) => {
                depth += 1;
                false
            }
            Event::End(_) => {
                depth -= 1;
                false
            }
            Event::Eof => {
                return Err(Error::ModelSchema(
                    "Document ended inside a foreign resource".to_string(),
                ));
            }
            Event::Text(t) => t.iter().all(u8::is_ascii_whitespace),
            _ => false,
        };
        if !layout {
            writer.write_event(event)?;
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::ModelSchema(e.to_string()))
}
