//! Repo-local lint for the chama backend's hexagonal boundaries.
//!
//! Group, round and payout rules live in `domain` behind ports. HTTP
//! handlers live in `inbound`; PostgreSQL, the ledger client and the
//! in-memory doubles live in `outbound`. The lint parses every file under
//! those three directories and rejects:
//!
//! - `domain` paths into either adapter layer, or into web, OpenAPI,
//!   database or HTTP-client crates
//! - `inbound` paths into `outbound`, or into database and HTTP-client
//!   crates
//! - `outbound` paths into `inbound`, or into web and OpenAPI crates
//!
//! Run it with `cargo run -p architecture-lint`.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", file.display())]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: PathBuf,
    /// Human-readable description of the violated rule.
    pub message: String,
}

/// Failure modes returned by the architecture lint.
#[derive(Debug, thiserror::Error)]
pub enum ArchitectureLintError {
    /// Filesystem traversal or reading failed.
    #[error("reading backend sources: {0}")]
    Io(#[from] io::Error),
    /// A file could not be parsed or placed in a layer.
    #[error("{}: {message}", file.display())]
    Parse { file: PathBuf, message: String },
    /// One or more boundary violations were found.
    #[error("layer boundary violations:{}", bullet_list(.0))]
    Violations(Vec<Violation>),
}

fn bullet_list(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n- {violation}"))
        .collect()
}

/// Lint the backend crate sources on disk.
///
/// `backend_dir` must be the `backend/` directory at the repository root;
/// only `src/domain`, `src/inbound` and `src/outbound` are inspected.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = backend_dir.join("src");
    let sources = collect_lint_sources(&src_dir)?;
    lint_sources(&sources)
}

/// Lint the provided Rust sources. Intended for unit and behaviour tests.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();

    for source in sources {
        let layer = ModuleLayer::infer_from_path(&source.file).ok_or_else(|| {
            ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: "unable to infer module layer from file path".to_owned(),
            }
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(lint_parsed_source(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    pub contents: String,
}

const WEB_CRATES: &[&str] = &[
    "actix",
    "actix_http",
    "actix_service",
    "actix_session",
    "actix_web",
    "actix_web_prom",
];
const OPENAPI_CRATES: &[&str] = &["utoipa", "utoipa_swagger_ui"];
const DATABASE_CRATES: &[&str] = &["diesel", "diesel_async", "diesel_migrations", "bb8"];
const LEDGER_CLIENT_CRATES: &[&str] = &["reqwest"];

/// Name the backend crate uses for itself in integration-style paths.
const CRATE_NAME: &str = "chama_backend";

/// The backend layer a file belongs to, taken from its first path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleLayer {
    Domain,
    Inbound,
    Outbound,
}

/// What one layer may not reach: sibling layers and external crates.
struct LayerRule {
    name: &'static str,
    sibling_layers: &'static [&'static str],
    crate_groups: &'static [&'static [&'static str]],
}

static DOMAIN_RULE: LayerRule = LayerRule {
    name: "domain",
    sibling_layers: &["inbound", "outbound"],
    crate_groups: &[WEB_CRATES, OPENAPI_CRATES, DATABASE_CRATES, LEDGER_CLIENT_CRATES],
};
static INBOUND_RULE: LayerRule = LayerRule {
    name: "inbound",
    sibling_layers: &["outbound"],
    crate_groups: &[DATABASE_CRATES, LEDGER_CLIENT_CRATES],
};
static OUTBOUND_RULE: LayerRule = LayerRule {
    name: "outbound",
    sibling_layers: &["inbound"],
    crate_groups: &[WEB_CRATES, OPENAPI_CRATES],
};

impl ModuleLayer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    fn infer_from_path(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?.as_os_str().to_str()?;
        Self::ALL.into_iter().find(|layer| layer.rule().name == first)
    }

    fn rule(self) -> &'static LayerRule {
        match self {
            Self::Domain => &DOMAIN_RULE,
            Self::Inbound => &INBOUND_RULE,
            Self::Outbound => &OUTBOUND_RULE,
        }
    }
}

impl LayerRule {
    fn forbids_crate(&self, root: &str) -> bool {
        self.crate_groups.iter().any(|group| group.contains(&root))
    }

    fn forbids_sibling(&self, root: &str) -> bool {
        self.sibling_layers.contains(&root)
    }
}

fn lint_parsed_source(file: &Path, layer: ModuleLayer, parsed: &syn::File) -> Vec<Violation> {
    let rule = layer.rule();
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        if let Some(root) = internal_module_root(segments).filter(|root| rule.forbids_sibling(root)) {
            messages.insert(format!("{} module must not depend on crate::{root}", rule.name));
        }
        if let Some(root) = external_crate_root(segments).filter(|root| rule.forbids_crate(root)) {
            messages.insert(format!(
                "{} module must not depend on external crate `{root}`",
                rule.name
            ));
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

fn is_relative_module_segment(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

fn internal_module_root(segments: &[String]) -> Option<&str> {
    let first = segments.first()?.as_str();
    if matches!(first, "domain" | "inbound" | "outbound") {
        return Some(first);
    }
    let start_index = match first {
        "crate" | "self" | "super" => segments
            .iter()
            .position(|segment| !is_relative_module_segment(segment.as_str()))?,
        CRATE_NAME => 1,
        _ => return None,
    };
    segments.get(start_index).map(|segment| segment.as_str())
}

fn external_crate_root(segments: &[String]) -> Option<&str> {
    let root = segments.first()?.as_str();
    if is_relative_module_segment(root) || root == CRATE_NAME {
        return None;
    }
    Some(root)
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_path(&mut self, path: &syn::Path) {
        let segments = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return;
        }
        self.paths.insert(segments);
    }

    fn record_use_tree(&mut self, tree: &syn::UseTree, prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                let mut next = prefix;
                next.push(path.ident.to_string());
                self.record_use_tree(&path.tree, next);
            }
            syn::UseTree::Name(name) => {
                let mut segments = prefix;
                segments.push(name.ident.to_string());
                self.paths.insert(segments);
            }
            syn::UseTree::Rename(rename) => {
                let mut segments = prefix;
                segments.push(rename.ident.to_string());
                self.paths.insert(segments);
            }
            syn::UseTree::Glob(_) => {
                let mut segments = prefix;
                segments.push("*".to_owned());
                self.paths.insert(segments);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        self.record_path(node);
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

fn collect_lint_sources(src_dir: &Path) -> Result<Vec<LintSource>, ArchitectureLintError> {
    let mut sources = Vec::new();
    for layer_dir in ["domain", "inbound", "outbound"] {
        let dir = src_dir.join(layer_dir);
        if !dir.exists() {
            continue;
        }
        collect_sources_under(src_dir, &dir, &mut sources)?;
    }
    Ok(sources)
}

fn collect_sources_under(
    src_root: &Path,
    current: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_sources_under(src_root, &path, sources)?;
            continue;
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            continue;
        }

        let relative = path
            .strip_prefix(src_root)
            .map_err(|err| ArchitectureLintError::Parse {
                file: path.clone(),
                message: err.to_string(),
            })?
            .to_path_buf();
        let contents = fs::read_to_string(&path)?;
        sources.push(LintSource {
            file: relative,
            contents,
        });
    }
    Ok(())
}
