//! Shared fixtures: a fake workspace, a table-driven adapter and a small
//! sample project index.

#![allow(dead_code)]

use refindex::index::{CandidateId, ClassKey, IndexWriter, NameTable, SignatureData, SymbolRef};
use refindex::service::{
    AdapterRegistry, LanguageAdapter, ModuleId, ReferenceService, SourceElement, Workspace,
};
use refindex::index::FileKind;
use refindex::utils::ServiceConfig;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const CORE: ModuleId = ModuleId(1);
pub const APP: ModuleId = ModuleId(2);

/// `core/**` and `app/**` are modules (app depends on core), everything
/// else is library code.
#[derive(Default)]
pub struct FakeWorkspace {
    unsaved: Mutex<Vec<PathBuf>>,
    edits: AtomicU64,
    disposed: AtomicBool,
}

impl FakeWorkspace {
    pub fn open_unsaved(&self, path: &str) {
        self.unsaved.lock().unwrap().push(PathBuf::from(path));
        self.edits.fetch_add(1, Ordering::SeqCst);
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl Workspace for FakeWorkspace {
    fn module_of(&self, path: &Path) -> Option<ModuleId> {
        if path.starts_with("core") {
            Some(CORE)
        } else if path.starts_with("app") {
            Some(APP)
        } else {
            None
        }
    }

    fn module_with_dependents(&self, module: ModuleId) -> Vec<ModuleId> {
        if module == CORE {
            vec![CORE, APP]
        } else {
            vec![module]
        }
    }

    fn unsaved_documents(&self) -> Vec<PathBuf> {
        self.unsaved.lock().unwrap().clone()
    }

    fn modification_count(&self) -> u64 {
        self.edits.load(Ordering::SeqCst)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// What a source element stands for
#[derive(Debug, Clone)]
pub enum Symbol {
    Class(&'static str),
    Method(&'static str, &'static str, u32),
    Field(&'static str, &'static str),
    /// Anonymous class or lambda: resolvable but not indexable
    Local,
}

/// Adapter answering from tables filled in by the test
#[derive(Default)]
pub struct TableAdapter {
    symbols: HashMap<SourceElement, Symbol>,
    constructors: HashMap<SourceElement, Vec<SourceElement>>,
    extends: HashSet<(SourceElement, SourceElement)>,
    anonymous: HashMap<(PathBuf, String), SourceElement>,
    lambdas: HashMap<(PathBuf, u32), SourceElement>,
}

impl TableAdapter {
    pub fn define(&mut self, element: &SourceElement, symbol: Symbol) {
        self.symbols.insert(element.clone(), symbol);
    }

    pub fn constructors(&mut self, class: &SourceElement, constructors: Vec<SourceElement>) {
        self.constructors.insert(class.clone(), constructors);
    }

    pub fn extends(&mut self, child: &SourceElement, base: &SourceElement) {
        self.extends.insert((child.clone(), base.clone()));
    }

    pub fn anonymous(&mut self, element: &SourceElement, name: &str) {
        self.anonymous
            .insert((element.file.clone(), name.to_string()), element.clone());
        self.symbols.insert(element.clone(), Symbol::Local);
    }

    pub fn lambda(&mut self, element: &SourceElement, ordinal: u32) {
        self.lambdas
            .insert((element.file.clone(), ordinal), element.clone());
        self.symbols.insert(element.clone(), Symbol::Local);
    }

    fn class_element(&self, file: &Path, name: &str) -> Option<SourceElement> {
        self.symbols.iter().find_map(|(element, symbol)| match symbol {
            Symbol::Class(class) if *class == name && element.file == file => Some(element.clone()),
            _ => None,
        })
    }
}

impl LanguageAdapter for TableAdapter {
    fn to_refs(&self, element: &SourceElement, names: &NameTable) -> Option<Vec<SymbolRef>> {
        let r = match self.symbols.get(element)? {
            Symbol::Class(name) => SymbolRef::class(names.enumerate(name)?),
            Symbol::Method(owner, name, params) => SymbolRef::method(
                names.enumerate(owner)?,
                names.enumerate(name)?,
                *params,
            ),
            Symbol::Field(owner, name) => {
                SymbolRef::field(names.enumerate(owner)?, names.enumerate(name)?)
            }
            Symbol::Local => return None,
        };
        Some(vec![r])
    }

    fn is_class(&self, element: &SourceElement) -> bool {
        matches!(self.symbols.get(element), Some(Symbol::Class(_)))
    }

    fn instantiable_constructors(&self, element: &SourceElement) -> Vec<SourceElement> {
        self.constructors.get(element).cloned().unwrap_or_default()
    }

    fn is_direct_inheritor(&self, candidate: &SourceElement, base: &SourceElement) -> bool {
        self.extends.contains(&(candidate.clone(), base.clone()))
    }

    fn find_direct_inheritor_candidates_in_file(
        &self,
        ids: &[CandidateId],
        file: &Path,
    ) -> Vec<SourceElement> {
        ids.iter()
            .filter_map(|id| match id {
                CandidateId::Named(name) => self.class_element(file, name),
                CandidateId::Anonymous(name) => self
                    .anonymous
                    .get(&(file.to_path_buf(), name.clone()))
                    .cloned(),
                CandidateId::FunctionalExpr(_) => None,
            })
            .collect()
    }

    fn find_functional_expressions_in_file(
        &self,
        ids: &[CandidateId],
        file: &Path,
    ) -> Vec<SourceElement> {
        ids.iter()
            .filter_map(|id| match id {
                CandidateId::FunctionalExpr(ordinal) => {
                    self.lambdas.get(&(file.to_path_buf(), *ordinal)).cloned()
                }
                _ => None,
            })
            .collect()
    }
}

pub fn el(file: &str, offset: u32) -> SourceElement {
    SourceElement::new(file, offset)
}

/// Elements of the sample project
pub mod elements {
    use super::{el, SourceElement};

    pub fn shape() -> SourceElement {
        el("core/Shape.java", 0)
    }
    pub fn shape_draw() -> SourceElement {
        el("core/Shape.java", 40)
    }
    pub fn circle() -> SourceElement {
        el("core/Circle.java", 0)
    }
    pub fn circle_new() -> SourceElement {
        el("core/Circle.java", 30)
    }
    pub fn circle_new_radius() -> SourceElement {
        el("core/Circle.java", 60)
    }
    pub fn square() -> SourceElement {
        el("app/Square.java", 0)
    }
    pub fn main_anonymous() -> SourceElement {
        el("app/Main.java", 200)
    }
    pub fn main_lambda() -> SourceElement {
        el("app/Main.java", 300)
    }
    pub fn lonely() -> SourceElement {
        el("core/Lonely.java", 0)
    }
    pub fn listener() -> SourceElement {
        el("core/Shape.java", 500)
    }
    pub fn main_listener() -> SourceElement {
        el("app/Main.java", 400)
    }
    /// Square's constructor, declared in source but never compiled
    pub fn square_new() -> SourceElement {
        el("app/Square.java", 30)
    }
    pub fn widget() -> SourceElement {
        el("lib/Widget.java", 0)
    }
    pub fn script() -> SourceElement {
        el("app/Script.kt", 0)
    }
}

/// Adapter knowing every element of the sample project
pub fn sample_adapter() -> TableAdapter {
    use elements::*;

    let mut adapter = TableAdapter::default();
    adapter.define(&shape(), Symbol::Class("core.Shape"));
    adapter.define(&shape_draw(), Symbol::Method("core.Shape", "draw", 0));
    adapter.define(&circle(), Symbol::Class("core.Circle"));
    adapter.define(&circle_new(), Symbol::Method("core.Circle", "<init>", 0));
    adapter.define(&circle_new_radius(), Symbol::Method("core.Circle", "<init>", 1));
    adapter.define(&square(), Symbol::Class("app.Square"));
    adapter.define(&lonely(), Symbol::Class("core.Lonely"));
    adapter.define(&listener(), Symbol::Class("core.Listener"));
    adapter.anonymous(&main_listener(), "app.Main$2");
    adapter.define(&widget(), Symbol::Class("lib.Widget"));
    adapter.anonymous(&main_anonymous(), "app.Main$1");
    adapter.lambda(&main_lambda(), 0);

    adapter.constructors(&circle(), vec![circle_new(), circle_new_radius()]);
    adapter.constructors(&square(), vec![square_new()]);
    adapter.extends(&circle(), &shape());
    adapter.extends(&square(), &shape());
    adapter.extends(&main_lambda(), &shape());
    // The anonymous class stopped extending Shape in live source
    adapter
}

/// Write the sample project index:
///
/// - `core.Shape` <- `core.Circle`, `app.Square`, `app.Main$1`, lambda #0
/// - `core.Listener` (declared in Shape.java) <- `app.Main$2` only
/// - `Shape.draw` called in Main (2x), overridden and called in Square
/// - `Circle` constructed in Main (3x) and Square (1x, radius ctor)
/// - casts to `Circle` from `Shape` (Main) and `Object` (Util)
/// - `Circle` implicitly stringified in Main
/// - `app.Factory#create/0` returns `core.Shape`
/// - `core.Lonely` has no subclasses; `lib.Widget` is used by Main
pub fn write_sample_index(index_dir: &Path) {
    let mut w = IndexWriter::new(index_dir);
    let shape = w.intern("core.Shape");
    let circle = w.intern("core.Circle");
    let square = w.intern("app.Square");
    let anon = w.intern("app.Main$1");
    let lonely = w.intern("core.Lonely");
    let listener = w.intern("core.Listener");
    let anon_listener = w.intern("app.Main$2");
    let widget = w.intern("lib.Widget");
    let factory = w.intern("app.Factory");
    let object = w.intern("java.lang.Object");
    let draw = w.intern("draw");
    let init = w.intern("<init>");
    let create = w.intern("create");

    let f_shape = w.add_file("core/Shape.java");
    let f_circle = w.add_file("core/Circle.java");
    let f_lonely = w.add_file("core/Lonely.java");
    let f_square = w.add_file("app/Square.java");
    let f_main = w.add_file("app/Main.java");
    let f_util = w.add_file("app/Util.java");
    let f_factory = w.add_file("app/Factory.java");
    let f_widget = w.add_file("lib/Widget.java");

    w.add_class_definition(f_shape, ClassKey::Named(shape));
    w.add_class_definition(f_circle, ClassKey::Named(circle));
    w.add_class_definition(f_lonely, ClassKey::Named(lonely));
    w.add_class_definition(f_square, ClassKey::Named(square));
    w.add_class_definition(f_main, ClassKey::Anonymous(anon));
    w.add_class_definition(f_shape, ClassKey::Named(listener));
    w.add_class_definition(f_main, ClassKey::Anonymous(anon_listener));
    w.add_class_definition(f_factory, ClassKey::Named(factory));
    w.add_class_definition(f_widget, ClassKey::Named(widget));

    w.add_inheritor(f_circle, ClassKey::Named(shape), SymbolRef::class(circle));
    w.add_inheritor(f_square, ClassKey::Named(shape), SymbolRef::class(square));
    w.add_inheritor(f_main, ClassKey::Named(shape), SymbolRef::anonymous(anon));
    w.add_inheritor(f_main, ClassKey::Named(shape), SymbolRef::functional_expr(shape, 0));
    w.add_inheritor(f_main, ClassKey::Named(listener), SymbolRef::anonymous(anon_listener));

    w.add_usages(f_main, SymbolRef::method(shape, draw, 0), 2);
    w.add_usage(f_square, SymbolRef::method(square, draw, 0));
    w.add_usages(f_main, SymbolRef::method(circle, init, 0), 3);
    w.add_usage(f_square, SymbolRef::method(circle, init, 1));
    w.add_usage(f_main, SymbolRef::class(widget));
    w.add_usage(f_main, SymbolRef::class(circle));

    w.add_cast(f_main, SymbolRef::class(circle), SymbolRef::class(shape));
    w.add_cast(f_util, SymbolRef::class(circle), SymbolRef::class(object));
    w.add_implicit_to_string(f_main, SymbolRef::class(circle));
    w.add_signature_member(
        f_factory,
        SignatureData::new(shape, 0, false),
        SymbolRef::method(factory, create, 0),
    );

    w.write().unwrap();
}

/// A service over a temporary build output directory
pub struct Harness {
    pub build_output: TempDir,
    pub workspace: Arc<FakeWorkspace>,
    pub service: ReferenceService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let build_output = TempDir::new().unwrap();
        let workspace = Arc::new(FakeWorkspace::default());
        let adapters =
            AdapterRegistry::new().with(FileKind::Java, Arc::new(sample_adapter()));
        let service = ReferenceService::new(
            config,
            build_output.path(),
            workspace.clone(),
            adapters,
        );
        Self {
            build_output,
            workspace,
            service,
        }
    }

    /// Run one complete build session that writes the sample index
    pub fn build(&self, session: u64, affected: &[ModuleId]) {
        self.service.build_session_started(session);
        write_sample_index(self.service.index_dir());
        self.service.build_session_finished(session, affected);
    }

    /// A harness whose index has been built once, with nothing dirty
    pub fn built() -> Self {
        let harness = Self::new();
        harness.build(1, &[CORE, APP]);
        assert!(harness.service.is_index_available());
        harness
    }

    pub fn ws(&self) -> &FakeWorkspace {
        &self.workspace
    }
}
