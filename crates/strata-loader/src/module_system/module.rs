// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module records and their lifecycle
//!
//! A module moves through `load` (fetch source), `analyse` (scan for
//! `require` calls), `load_requires` (fetch and link the dependency graph)
//! and `run` (evaluate the body once). Bodies only execute after the whole
//! graph below them has been fetched, so `require` inside a body never
//! waits on the network.

use std::fmt;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use strata_script::runtime::Object;
use strata_script::{ObjectRef, Value};
use tracing::debug;

use super::registry::ModuleRegistry;
use super::resolver::{ModuleId, resolve_from};
use super::scanner::unique_requires;
use crate::error::{LoaderError, Result};
use crate::transport::Transport;

/// Where a module is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Registered, source not fetched
    Created,
    /// Source fetched
    Loaded,
    /// Dependencies discovered, some not linked yet
    Analysed,
    /// Every dependency linked to a module record
    Linked,
    /// Body started but has not finished (cycle or failure)
    Executing,
    /// Body ran to completion
    Executed,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleStatus::Created => "created",
            ModuleStatus::Loaded => "loaded",
            ModuleStatus::Analysed => "analysed",
            ModuleStatus::Linked => "linked",
            ModuleStatus::Executing => "executing",
            ModuleStatus::Executed => "executed",
        };
        f.write_str(name)
    }
}

/// A dependency entry, keyed by the literal passed to `require`.
#[derive(Debug, Clone)]
pub enum Require {
    /// Resolved to an id but not yet bound to a module
    Unresolved(ModuleId),
    /// Bound to a module record
    Linked(WeakModule),
}

impl Require {
    /// The dependency's module id.
    pub fn id(&self) -> &ModuleId {
        match self {
            Require::Unresolved(id) => id,
            Require::Linked(weak) => &weak.id,
        }
    }
}

/// Everything `load_requires` needs to fetch and register dependencies.
#[derive(Clone)]
pub struct LoadContext {
    /// Where new modules are registered
    pub registry: Arc<ModuleRegistry>,
    /// Where sources are fetched from
    pub transport: Arc<dyn Transport>,
    /// Appended to a module id to form its request path
    pub extension: Arc<str>,
}

struct ModuleInner {
    id: ModuleId,
    state: RwLock<ModuleState>,
}

#[derive(Default)]
struct ModuleState {
    content: Option<Arc<str>>,
    /// Discovery order is preserved
    requires: Option<Vec<(String, Require)>>,
    /// The script-visible `module` object, `{ id, exports }`
    record: Option<ObjectRef>,
    executed: bool,
}

/// A shared handle to one module record.
///
/// Cloning the handle aliases the same record.
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

/// A non-owning handle to a module record.
#[derive(Clone)]
pub struct WeakModule {
    id: ModuleId,
    inner: Weak<ModuleInner>,
}

impl WeakModule {
    /// The module id.
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Recover a strong handle if the module is still alive.
    pub fn upgrade(&self) -> Option<Module> {
        self.inner.upgrade().map(|inner| Module { inner })
    }
}

impl fmt::Debug for WeakModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakModule({})", self.id)
    }
}

impl Module {
    /// Creates an unregistered module record.
    pub(crate) fn new(id: ModuleId) -> Self {
        Self {
            inner: Arc::new(ModuleInner {
                id,
                state: RwLock::new(ModuleState::default()),
            }),
        }
    }

    /// The module id.
    pub fn id(&self) -> &ModuleId {
        &self.inner.id
    }

    /// Returns true if both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Module) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A non-owning handle to this module.
    pub fn downgrade(&self) -> WeakModule {
        WeakModule {
            id: self.inner.id.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The fetched source, if loaded.
    pub fn content(&self) -> Option<Arc<str>> {
        self.inner.state.read().content.clone()
    }

    /// Returns true once the source has been fetched.
    pub fn is_loaded(&self) -> bool {
        self.inner.state.read().content.is_some()
    }

    /// Returns true once execution has begun.
    pub fn has_record(&self) -> bool {
        self.inner.state.read().record.is_some()
    }

    /// The lifecycle stage.
    pub fn status(&self) -> ModuleStatus {
        let state = self.inner.state.read();
        if state.executed {
            return ModuleStatus::Executed;
        }
        if state.record.is_some() {
            return ModuleStatus::Executing;
        }
        match (&state.content, &state.requires) {
            (None, _) => ModuleStatus::Created,
            (Some(_), None) => ModuleStatus::Loaded,
            (Some(_), Some(requires)) => {
                if requires
                    .iter()
                    .all(|(_, require)| matches!(require, Require::Linked(_)))
                {
                    ModuleStatus::Linked
                } else {
                    ModuleStatus::Analysed
                }
            }
        }
    }

    /// Snapshot of the dependency table in discovery order.
    pub fn requires(&self) -> Vec<(String, Require)> {
        self.inner.state.read().requires.clone().unwrap_or_default()
    }

    /// The current `module.exports`, once execution has begun.
    ///
    /// Objects are returned by reference, so a partially executed module
    /// yields exports that later fill in.
    pub fn exports(&self) -> Option<Value> {
        let record = self.inner.state.read().record.clone()?;
        Some(record.get("exports"))
    }

    /// Fetch `/<id><extension>` and keep the source.
    pub async fn load(&self, transport: &dyn Transport, extension: &str) -> Result<()> {
        let path = format!("/{}{}", self.id(), extension);
        debug!(module = %self.id(), path = %path, "fetching module");

        let content = transport.fetch_text(&path).await?;
        self.inner.state.write().content = Some(Arc::from(content));
        Ok(())
    }

    /// Discover dependencies in the fetched source.
    ///
    /// Each distinct literal is resolved against this module's id. Calling
    /// this again keeps existing entries, including linked ones.
    pub fn analyse(&self) -> Result<()> {
        let content = self
            .content()
            .ok_or_else(|| LoaderError::NotLoaded(self.id().clone()))?;
        let literals = unique_requires(&content);

        let mut state = self.inner.state.write();
        let requires = state.requires.get_or_insert_with(Vec::new);
        for literal in literals {
            if requires.iter().any(|(known, _)| *known == literal) {
                continue;
            }
            let id = resolve_from(&literal, self.id().as_str());
            requires.push((literal, Require::Unresolved(id)));
        }

        debug!(module = %self.id(), requires = requires.len(), "analysed module");
        Ok(())
    }

    /// Fetch and link every unresolved dependency, recursively.
    ///
    /// Dependencies already in the registry are adopted as they are, which
    /// both deduplicates fetches and ends recursion on cycles. New ones are
    /// registered and linked before their fetch starts, and all branches run
    /// concurrently. A branch whose fetch fails is dropped after a debug
    /// log; the dependency stays linked but unloaded.
    pub fn load_requires(&self, ctx: &LoadContext) -> BoxFuture<'static, ()> {
        let branches = self.link_requires(ctx);
        async move {
            if branches.is_empty() {
                tokio::task::yield_now().await;
            } else {
                join_all(branches).await;
            }
        }
        .boxed()
    }

    /// Binds unresolved entries and returns one loading branch per new module.
    ///
    /// The module's own lock is never held while the registry is touched.
    fn link_requires(&self, ctx: &LoadContext) -> Vec<BoxFuture<'static, ()>> {
        let unresolved: Vec<(String, ModuleId)> = {
            let state = self.inner.state.read();
            state
                .requires
                .iter()
                .flatten()
                .filter_map(|(literal, require)| match require {
                    Require::Unresolved(id) => Some((literal.clone(), id.clone())),
                    Require::Linked(_) => None,
                })
                .collect()
        };

        let mut branches = Vec::new();
        for (literal, id) in unresolved {
            let (dependency, created) = ctx.registry.get_or_create(id);
            self.bind(&literal, &dependency);

            if created {
                debug!(module = %self.id(), literal = %literal, dependency = %dependency.id(), "loading dependency");
                branches.push(dependency.load_branch(ctx.clone()));
            } else {
                debug!(module = %self.id(), dependency = %dependency.id(), "dependency already registered");
            }
        }

        branches
    }

    /// Records `literal` as linked to `dependency`.
    fn bind(&self, literal: &str, dependency: &Module) {
        let mut state = self.inner.state.write();
        let entry = state
            .requires
            .iter_mut()
            .flatten()
            .find(|(known, _)| known == literal);
        if let Some((_, require)) = entry {
            *require = Require::Linked(dependency.downgrade());
        }
    }

    /// load → analyse → load_requires for a freshly registered dependency.
    fn load_branch(self, ctx: LoadContext) -> BoxFuture<'static, ()> {
        async move {
            if let Err(err) = self.load(ctx.transport.as_ref(), &ctx.extension).await {
                debug!(module = %self.id(), error = %err, "abandoning dependency");
                return;
            }
            if let Err(err) = self.analyse() {
                debug!(module = %self.id(), error = %err, "abandoning dependency");
                return;
            }
            self.load_requires(&ctx).await;
        }
        .boxed()
    }

    /// Execute the body once.
    ///
    /// The `module` record is published before the body starts so a cyclic
    /// `require` sees the partially filled exports instead of re-running
    /// this module. Calling `run` again once a record exists does nothing.
    pub fn run(&self) -> Result<()> {
        let (content, record) = {
            let mut state = self.inner.state.write();
            if state.record.is_some() {
                return Ok(());
            }
            let content = state
                .content
                .clone()
                .ok_or_else(|| LoaderError::NotLoaded(self.id().clone()))?;

            let record = ObjectRef::new(Object::new());
            record.set("id", Value::String(self.id().to_string()));
            record.set("exports", Value::new_object());
            state.record = Some(record.clone());
            (content, record)
        };

        debug!(module = %self.id(), "running module");
        let program = strata_script::parse(&content)?;
        let exports = record.get("exports");
        strata_script::evaluate_module(
            &program,
            &[
                ("exports", exports),
                ("require", self.require_function()),
                ("module", Value::Object(record)),
            ],
        )?;

        self.inner.state.write().executed = true;
        debug!(module = %self.id(), "module executed");
        Ok(())
    }

    /// The `require` binding handed to this module's body.
    fn require_function(&self) -> Value {
        // Exported closures keep the body's scope, and with it this
        // function, alive; a strong handle here would leak the module.
        let owner = self.downgrade();
        Value::native("require", move |receiver, args| {
            let module = owner
                .upgrade()
                .ok_or_else(|| LoaderError::NotFound(owner.id().clone()))?;
            Ok(module.require(receiver, args)?)
        })
    }

    fn require(&self, receiver: &Value, args: &[Value]) -> Result<Value> {
        if !receiver.is_undefined() {
            return Err(LoaderError::InvalidContext {
                module: self.id().clone(),
            });
        }

        let specifier = args.first().cloned().unwrap_or_default().to_js_string();
        let require = {
            let state = self.inner.state.read();
            state.requires.as_ref().and_then(|requires| {
                requires
                    .iter()
                    .find(|(literal, _)| *literal == specifier)
                    .map(|(_, require)| require.clone())
            })
        };

        let unloaded = || LoaderError::UnloadedModule {
            module: self.id().clone(),
            specifier: specifier.clone(),
        };

        let dependency = match require {
            None => {
                return Err(LoaderError::UnknownRequire {
                    module: self.id().clone(),
                    specifier: specifier.clone(),
                });
            }
            Some(Require::Unresolved(_)) => return Err(unloaded()),
            Some(Require::Linked(weak)) => weak.upgrade().ok_or_else(unloaded)?,
        };

        if !dependency.is_loaded() {
            return Err(unloaded());
        }
        if !dependency.has_record() {
            dependency.run()?;
        }

        Ok(dependency.exports().unwrap_or_default())
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", self.id())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn context(transport: MemoryTransport) -> (LoadContext, Arc<MemoryTransport>) {
        let transport = Arc::new(transport);
        let ctx = LoadContext {
            registry: Arc::new(ModuleRegistry::new()),
            transport: transport.clone(),
            extension: Arc::from(".js"),
        };
        (ctx, transport)
    }

    async fn prepare(ctx: &LoadContext, id: &str) -> Module {
        let module = ctx.registry.create(ModuleId::parse(id)).unwrap();
        module
            .load(ctx.transport.as_ref(), &ctx.extension)
            .await
            .unwrap();
        module.analyse().unwrap();
        module.load_requires(ctx).await;
        module
    }

    #[tokio::test]
    async fn test_load_stores_content() {
        let (ctx, transport) = context(MemoryTransport::new().with_file("/lib/a.js", "1"));
        let module = ctx.registry.create(ModuleId::parse("lib/a")).unwrap();
        assert_eq!(module.status(), ModuleStatus::Created);

        module.load(ctx.transport.as_ref(), ".js").await.unwrap();
        assert_eq!(module.content().as_deref(), Some("1"));
        assert_eq!(module.status(), ModuleStatus::Loaded);
        assert_eq!(transport.fetch_count("/lib/a.js"), 1);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_module_unloaded() {
        let (ctx, _) = context(MemoryTransport::new());
        let module = ctx.registry.create(ModuleId::parse("gone")).unwrap();
        let err = module.load(ctx.transport.as_ref(), ".js").await.unwrap_err();
        assert!(matches!(err, LoaderError::Fetch(ref fetch) if fetch.status == 404));
        assert!(!module.is_loaded());
    }

    #[test]
    fn test_analyse_requires_content() {
        let module = Module::new(ModuleId::parse("a"));
        assert!(matches!(module.analyse(), Err(LoaderError::NotLoaded(_))));
    }

    #[test]
    fn test_analyse_dedups_and_resolves() {
        let module = Module::new(ModuleId::parse("lib/a"));
        module.inner.state.write().content =
            Some(Arc::from("require('./b'); require('../c'); require('./b')"));
        module.analyse().unwrap();
        module.analyse().unwrap();

        let requires = module.requires();
        let summary: Vec<_> = requires
            .iter()
            .map(|(literal, require)| (literal.as_str(), require.id().as_str()))
            .collect();
        assert_eq!(summary, vec![("./b", "lib/b"), ("../c", "c")]);
        assert_eq!(module.status(), ModuleStatus::Analysed);
    }

    #[tokio::test]
    async fn test_load_requires_links_and_registers() {
        let (ctx, transport) = context(
            MemoryTransport::new()
                .with_file("/a.js", "require('./b'); require('./c')")
                .with_file("/b.js", "require('./c')")
                .with_file("/c.js", ""),
        );
        let module = prepare(&ctx, "a").await;

        assert_eq!(module.status(), ModuleStatus::Linked);
        assert_eq!(ctx.registry.len(), 3);
        assert_eq!(transport.fetch_count("/c.js"), 1);
        let c = ctx.registry.get(&ModuleId::parse("c")).unwrap();
        assert_eq!(c.status(), ModuleStatus::Linked);
    }

    #[tokio::test]
    async fn test_load_requires_without_dependencies_completes() {
        let (ctx, _) = context(MemoryTransport::new().with_file("/a.js", "exports.x = 1"));
        let module = prepare(&ctx, "a").await;
        assert_eq!(module.status(), ModuleStatus::Linked);
    }

    #[tokio::test]
    async fn test_load_requires_yields_once_without_branches() {
        let (ctx, _) = context(
            MemoryTransport::new()
                .with_file("/a.js", "exports.x = 1")
                .with_file("/b.js", "require('./a')"),
        );
        let a = ctx.registry.create(ModuleId::parse("a")).unwrap();
        a.load(ctx.transport.as_ref(), ".js").await.unwrap();
        a.analyse().unwrap();

        let mut linking = a.load_requires(&ctx);
        assert!(futures::poll!(&mut linking).is_pending());
        linking.await;

        // Every dependency of b is already registered, so nothing is fetched
        let b = ctx.registry.create(ModuleId::parse("b")).unwrap();
        b.load(ctx.transport.as_ref(), ".js").await.unwrap();
        b.analyse().unwrap();

        let mut adopting = b.load_requires(&ctx);
        assert!(futures::poll!(&mut adopting).is_pending());
        assert_eq!(b.status(), ModuleStatus::Linked);
        adopting.await;
    }

    #[tokio::test]
    async fn test_registry_debug_after_linking() {
        let (ctx, _) = context(
            MemoryTransport::new()
                .with_file("/a.js", "require('./b')")
                .with_file("/b.js", ""),
        );
        let a = prepare(&ctx, "a").await;
        // Debug on the registry reads every module's state under shard locks
        let rendered = format!("{:?}", ctx.registry);
        assert!(rendered.contains("Linked"));
        assert!(matches!(a.requires()[0].1, Require::Linked(_)));
    }

    #[tokio::test]
    async fn test_deeply_nested_body_is_a_syntax_error() {
        let source = format!("module.exports = {}1{}", "(".repeat(5000), ")".repeat(5000));
        let (ctx, _) = context(MemoryTransport::new().with_file("/deep.js", source));
        let module = prepare(&ctx, "deep").await;
        assert!(matches!(
            module.run(),
            Err(LoaderError::Script(strata_script::Error::Syntax { .. }))
        ));
    }

    #[tokio::test]
    async fn test_failed_dependency_is_linked_but_unloaded() {
        let (ctx, _) = context(MemoryTransport::new().with_file("/a.js", "require('./missing')"));
        let module = prepare(&ctx, "a").await;

        let missing = ctx.registry.get(&ModuleId::parse("missing")).unwrap();
        assert_eq!(missing.status(), ModuleStatus::Created);
        assert!(matches!(module.requires()[0].1, Require::Linked(_)));
    }

    #[tokio::test]
    async fn test_run_publishes_exports() {
        let (ctx, _) = context(
            MemoryTransport::new().with_file("/a.js", "exports.answer = 42; exports.id = module.id"),
        );
        let module = prepare(&ctx, "a").await;
        module.run().unwrap();

        assert_eq!(module.status(), ModuleStatus::Executed);
        let exports = module.exports().unwrap();
        assert_eq!(exports.get_property("answer").unwrap(), Value::Number(42.0));
        assert_eq!(exports.get_property("id").unwrap(), Value::from("a"));
    }

    #[tokio::test]
    async fn test_run_is_once_only() {
        let (ctx, _) = context(
            MemoryTransport::new().with_file("/a.js", "module.exports = { runs: 1 }"),
        );
        let module = prepare(&ctx, "a").await;
        module.run().unwrap();
        let first = module.exports().unwrap();
        module.run().unwrap();
        assert_eq!(module.exports().unwrap(), first);
    }

    #[tokio::test]
    async fn test_require_runs_dependency_lazily() {
        let (ctx, _) = context(
            MemoryTransport::new()
                .with_file("/a.js", "var b = require('./b'); module.exports = b + 1")
                .with_file("/b.js", "module.exports = 41"),
        );
        let module = prepare(&ctx, "a").await;
        let b = ctx.registry.get(&ModuleId::parse("b")).unwrap();
        assert!(!b.has_record());

        module.run().unwrap();
        assert_eq!(module.exports(), Some(Value::Number(42.0)));
        assert_eq!(b.status(), ModuleStatus::Executed);
    }

    #[tokio::test]
    async fn test_require_as_method_is_rejected() {
        let (ctx, _) = context(
            MemoryTransport::new()
                .with_file("/a.js", "var o = { r: require }; o.r('./b')")
                .with_file("/b.js", ""),
        );
        let module = prepare(&ctx, "a").await;
        let err = module.run().unwrap_err();
        assert!(matches!(err, LoaderError::InvalidContext { .. }));
    }

    #[tokio::test]
    async fn test_require_unknown_literal() {
        let (ctx, _) = context(
            MemoryTransport::new().with_file("/a.js", "var name = './b'; require(name)"),
        );
        let module = prepare(&ctx, "a").await;
        let err = module.run().unwrap_err();
        assert!(
            matches!(err, LoaderError::UnknownRequire { ref specifier, .. } if specifier == "./b")
        );
    }

    #[tokio::test]
    async fn test_require_unloaded_dependency() {
        let (ctx, _) = context(MemoryTransport::new().with_file("/a.js", "require('./missing')"));
        let module = prepare(&ctx, "a").await;
        let err = module.run().unwrap_err();
        assert!(matches!(
            err,
            LoaderError::UnloadedModule { ref specifier, .. } if specifier == "./missing"
        ));
    }

    #[tokio::test]
    async fn test_require_before_linking_is_unloaded() {
        let (ctx, _) = context(MemoryTransport::new().with_file("/a.js", "require('./b')"));
        let module = ctx.registry.create(ModuleId::parse("a")).unwrap();
        module.load(ctx.transport.as_ref(), ".js").await.unwrap();
        module.analyse().unwrap();
        assert!(matches!(
            module.run(),
            Err(LoaderError::UnloadedModule { .. })
        ));
    }

    #[tokio::test]
    async fn test_cycle_sees_partial_exports() {
        let (ctx, _) = context(
            MemoryTransport::new()
                .with_file(
                    "/ca.js",
                    "exports.value = 3; var cb = require('./cb'); module.exports = cb.value + 4;",
                )
                .with_file("/cb.js", "var ca = require('./ca'); exports.value = ca.value;"),
        );
        let module = prepare(&ctx, "ca").await;
        module.run().unwrap();
        assert_eq!(module.exports(), Some(Value::Number(7.0)));
    }

    #[tokio::test]
    async fn test_script_error_propagates() {
        let (ctx, _) = context(MemoryTransport::new().with_file("/a.js", "throw 'bad'"));
        let module = prepare(&ctx, "a").await;
        let err = module.run().unwrap_err();
        assert!(matches!(err, LoaderError::Script(strata_script::Error::Thrown(_))));
        assert_eq!(module.status(), ModuleStatus::Executing);
    }

    #[tokio::test]
    async fn test_dropped_dependency_reports_unloaded() {
        let (ctx, _) = context(
            MemoryTransport::new()
                .with_file("/a.js", "require('./b')")
                .with_file("/b.js", ""),
        );
        let module = prepare(&ctx, "a").await;
        ctx.registry.clear();
        assert!(matches!(
            module.run(),
            Err(LoaderError::UnloadedModule { .. })
        ));
    }
}
