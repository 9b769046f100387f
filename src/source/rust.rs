use super::{AnnotationFact, FactExtractor, WiringFact};
use crate::markers::Target;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::PathBuf;
use syn::visit::{self, Visit};
use syn::{Attribute, AttrStyle, Expr, Item};
use walkdir::WalkDir;

/// Bare identifiers recognised as CRUD letters in wiring code.
const OPERATION_IDENTS: [&str; 10] = [
    "C", "L", "R", "U", "D", "Create", "List", "Read", "Update", "Delete",
];

/// Reads annotations and wiring from Rust source trees.
///
/// `resources` are scanned for `///` and `//!` annotations; `wiring` files
/// are scanned for resource registration structs. Both accept files and
/// directories; directories are walked recursively for `.rs` files in path
/// order.
#[derive(Debug, Clone, Default)]
pub struct RustSourceExtractor {
    resources: Vec<PathBuf>,
    wiring: Vec<PathBuf>,
}

impl RustSourceExtractor {
    pub fn new(resources: Vec<PathBuf>, wiring: Vec<PathBuf>) -> Self {
        RustSourceExtractor { resources, wiring }
    }

    /// Annotations found in one source text.
    pub fn annotations_from_source(source: &str, origin: &str) -> anyhow::Result<Vec<AnnotationFact>> {
        let file = syn::parse_file(source).context("Failed to parse Rust source")?;
        let mut facts = Vec::new();

        for line in annotation_lines(&file.attrs, true) {
            facts.push(AnnotationFact {
                declaration: origin.to_string(),
                target: Target::Package,
                text: line,
                origin: origin.to_string(),
            });
        }
        collect_items(&file.items, origin, &mut facts);
        Ok(facts)
    }

    /// Wiring facts found in one source text.
    pub fn wiring_from_source(source: &str, origin: &str) -> anyhow::Result<Vec<WiringFact>> {
        let file = syn::parse_file(source).context("Failed to parse Rust source")?;
        let mut collector = WiringCollector::default();
        collector.visit_file(&file);
        Ok(collector.into_facts(origin))
    }
}

impl FactExtractor for RustSourceExtractor {
    fn annotations(&self) -> anyhow::Result<Vec<AnnotationFact>> {
        let mut facts = Vec::new();
        for path in rust_files(&self.resources)? {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let origin = path.display().to_string();
            facts.extend(
                Self::annotations_from_source(&source, &origin)
                    .with_context(|| format!("failed to parse {origin}"))?,
            );
        }
        tracing::debug!(count = facts.len(), "extracted annotation facts");
        Ok(facts)
    }

    fn wiring(&self) -> anyhow::Result<Vec<WiringFact>> {
        let mut facts = Vec::new();
        for path in rust_files(&self.wiring)? {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let origin = path.display().to_string();
            facts.extend(
                Self::wiring_from_source(&source, &origin)
                    .with_context(|| format!("failed to parse {origin}"))?,
            );
        }
        tracing::debug!(count = facts.len(), "extracted wiring facts");
        Ok(facts)
    }
}

fn rust_files(roots: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            anyhow::bail!("source path {} does not exist", root.display());
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path.to_path_buf());
            }
        }
    }
    Ok(files)
}

/// Doc-comment lines of `attrs`, trimmed.
fn doc_lines(attrs: &[Attribute], inner: bool) -> Vec<String> {
    let mut docs = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") || matches!(attr.style, AttrStyle::Inner(_)) != inner {
            continue;
        }
        if let syn::Meta::NameValue(meta) = &attr.meta {
            if let Expr::Lit(expr_lit) = &meta.value {
                if let syn::Lit::Str(lit_str) = &expr_lit.lit {
                    let doc = lit_str.value();
                    let doc = doc.trim();
                    if !doc.is_empty() {
                        docs.push(doc.to_string());
                    }
                }
            }
        }
    }
    docs
}

fn annotation_lines(attrs: &[Attribute], inner: bool) -> Vec<String> {
    doc_lines(attrs, inner)
        .into_iter()
        .filter(|line| line.starts_with('+'))
        .collect()
}

fn push_type_facts(name: &str, attrs: &[Attribute], origin: &str, facts: &mut Vec<AnnotationFact>) {
    for line in annotation_lines(attrs, false) {
        facts.push(AnnotationFact {
            declaration: name.to_string(),
            target: Target::Type,
            text: line,
            origin: origin.to_string(),
        });
    }
}

fn collect_items(items: &[Item], origin: &str, facts: &mut Vec<AnnotationFact>) {
    for item in items {
        match item {
            Item::Struct(s) => {
                let name = s.ident.to_string();
                push_type_facts(&name, &s.attrs, origin, facts);
                for field in &s.fields {
                    let Some(ident) = &field.ident else { continue };
                    for line in annotation_lines(&field.attrs, false) {
                        facts.push(AnnotationFact {
                            declaration: format!("{name}.{ident}"),
                            target: Target::Field,
                            text: line,
                            origin: origin.to_string(),
                        });
                    }
                }
            }
            Item::Enum(e) => push_type_facts(&e.ident.to_string(), &e.attrs, origin, facts),
            Item::Type(t) => push_type_facts(&t.ident.to_string(), &t.attrs, origin, facts),
            Item::Mod(m) => {
                if let Some((_, inner)) = &m.content {
                    collect_items(inner, origin, facts);
                }
            }
            _ => {}
        }
    }
}

/// Resource handle field: `field: Handle<Resource>`.
#[derive(Debug)]
struct HandleField {
    resource: String,
    comments: Vec<String>,
}

#[derive(Debug, Default)]
struct Initialiser {
    base_path: Option<String>,
    operations: Vec<String>,
}

#[derive(Debug, Default)]
struct WiringCollector {
    fields: BTreeMap<String, HandleField>,
    initialisers: BTreeMap<String, Initialiser>,
}

impl WiringCollector {
    fn into_facts(self, origin: &str) -> Vec<WiringFact> {
        let mut initialisers = self.initialisers;
        self.fields
            .into_iter()
            .map(|(field, handle)| {
                let init = initialisers.remove(&field).unwrap_or_default();
                WiringFact {
                    resource: handle.resource,
                    field,
                    base_path: init.base_path,
                    operations: init.operations,
                    comments: handle.comments,
                    origin: origin.to_string(),
                }
            })
            .collect()
    }
}

/// Inner type name of `Outer<Inner>`.
fn generic_resource(ty: &syn::Type) -> Option<String> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(syn::Type::Path(inner)) => {
            inner.path.segments.last().map(|s| s.ident.to_string())
        }
        _ => None,
    }
}

/// Walk an initialiser expression for a base path literal and CRUD idents.
fn scan_initialiser(expr: &Expr, init: &mut Initialiser) {
    match expr {
        Expr::Lit(lit) => {
            if let syn::Lit::Str(s) = &lit.lit {
                if init.base_path.is_none() {
                    init.base_path = Some(s.value());
                }
            }
        }
        Expr::Path(p) => {
            if let Some(seg) = p.path.segments.last() {
                let ident = seg.ident.to_string();
                if OPERATION_IDENTS.contains(&ident.as_str()) && !init.operations.contains(&ident) {
                    init.operations.push(ident);
                }
            }
        }
        Expr::Call(call) => call.args.iter().for_each(|a| scan_initialiser(a, init)),
        Expr::MethodCall(call) => {
            scan_initialiser(&call.receiver, init);
            call.args.iter().for_each(|a| scan_initialiser(a, init));
        }
        Expr::Array(arr) => arr.elems.iter().for_each(|e| scan_initialiser(e, init)),
        Expr::Tuple(t) => t.elems.iter().for_each(|e| scan_initialiser(e, init)),
        Expr::Reference(r) => scan_initialiser(&r.expr, init),
        Expr::Paren(p) => scan_initialiser(&p.expr, init),
        Expr::Group(g) => scan_initialiser(&g.expr, init),
        _ => {}
    }
}

impl<'ast> Visit<'ast> for WiringCollector {
    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        for field in &node.fields {
            let (Some(ident), Some(resource)) = (&field.ident, generic_resource(&field.ty)) else {
                continue;
            };
            self.fields.insert(
                ident.to_string(),
                HandleField {
                    resource,
                    comments: doc_lines(&field.attrs, false),
                },
            );
        }
        visit::visit_item_struct(self, node);
    }

    fn visit_expr_struct(&mut self, node: &'ast syn::ExprStruct) {
        for fv in &node.fields {
            if let syn::Member::Named(ident) = &fv.member {
                let mut init = Initialiser::default();
                scan_initialiser(&fv.expr, &mut init);
                if init.base_path.is_some() || !init.operations.is_empty() {
                    self.initialisers.insert(ident.to_string(), init);
                }
            }
        }
        visit::visit_expr_struct(self, node);
    }
}
