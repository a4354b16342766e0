use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use ren_abi::{
    stack_len, RenCell, RenContextHandle, RenEngineHandle, RenResult, RenSeriesHandle,
    RenShimPointer, REN_STACK_ARGS, REN_STACK_FUNCTION, REN_STACK_RETURN,
};
use ren_values::{cell_series, CellHeap, Function, Series, Value};

use crate::eval::DepthGuard;
use crate::heap::SeriesHeap;
use crate::{native, EngineConfig, EngineConfigBuilder, EngineError, EvalError, NativeFailure};
use crate::spec::Specification;

/// A native as the runtime sees it: its specification and the shim to call.
pub struct NativeRecord {
    pub spec: Specification,
    pub shim: RenShimPointer,
}

pub(crate) struct Context {
    parent: Option<RenContextHandle>,
    words: RwLock<HashMap<String, Value>>,
}

impl Context {
    fn new(parent: Option<RenContextHandle>) -> Self {
        Context {
            parent,
            words: RwLock::new(HashMap::new()),
        }
    }
}

/// One runtime instance: cell heap, native records and contexts.
///
/// Engines are registered in a process-wide directory by handle so that
/// natives, which only see handles, can find their engine again.
pub struct Engine {
    handle: RenEngineHandle,
    this: Weak<Engine>,
    closed: AtomicBool,
    config: EngineConfig,
    heap: SeriesHeap,
    natives: RwLock<Vec<Arc<NativeRecord>>>,
    contexts: RwLock<Vec<Arc<Context>>>,
}

static ENGINES: Lazy<RwLock<HashMap<RenEngineHandle, Arc<Engine>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static NEXT_ENGINE: AtomicU32 = AtomicU32::new(0);

type Finder = Box<dyn Fn() -> Option<Arc<Engine>> + Send + Sync>;

static FINDER: Lazy<RwLock<Option<Finder>>> = Lazy::new(|| RwLock::new(None));
static DEFAULT_ENGINE: Lazy<Mutex<Option<Arc<Engine>>>> = Lazy::new(|| Mutex::new(None));

const LIB_CONTEXT: RenContextHandle = RenContextHandle(0);
const USER_CONTEXT: RenContextHandle = RenContextHandle(1);

impl Engine {
    pub fn create(config: EngineConfig) -> Result<Arc<Engine>, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let handle = RenEngineHandle(NEXT_ENGINE.fetch_add(1, Ordering::Relaxed));
        let lib = Context::new(None);
        {
            let mut words = lib.words.write();
            words.insert("true".to_string(), Value::Logic(true));
            words.insert("false".to_string(), Value::Logic(false));
            words.insert("none".to_string(), Value::None);
        }
        let user = Context::new(Some(LIB_CONTEXT));

        let engine = Arc::new_cyclic(|this| Engine {
            handle,
            this: this.clone(),
            closed: AtomicBool::new(false),
            heap: SeriesHeap::with_capacity(config.series_capacity),
            natives: RwLock::new(Vec::new()),
            contexts: RwLock::new(vec![Arc::new(lib), Arc::new(user)]),
            config,
        });
        ENGINES.write().insert(handle, Arc::clone(&engine));
        debug!("created engine {} handle={}", engine.config.name, handle.0);
        Ok(engine)
    }

    /// Find a live engine by handle.
    pub fn lookup(handle: RenEngineHandle) -> Option<Arc<Engine>> {
        ENGINES.read().get(&handle).cloned()
    }

    /// Remove the engine from the directory. Natives registered against it
    /// fail with `EngineGone` from then on.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if ENGINES.write().remove(&self.handle).is_some() {
            debug!("closed engine {} handle={}", self.config.name, self.handle.0);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Non-owning reference for holders that must not keep the engine alive.
    pub fn downgrade(&self) -> Weak<Engine> {
        self.this.clone()
    }

    pub fn handle(&self) -> RenEngineHandle {
        self.handle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Context holding `true`, `false` and `none`.
    pub fn lib_context(&self) -> RenContextHandle {
        LIB_CONTEXT
    }

    /// Default evaluation target; inherits from the lib context.
    pub fn user_context(&self) -> RenContextHandle {
        USER_CONTEXT
    }

    pub fn create_context(&self, parent: Option<RenContextHandle>) -> Result<RenContextHandle, EvalError> {
        if let Some(parent) = parent {
            self.context(parent)?;
        }
        let mut contexts = self.contexts.write();
        contexts.push(Arc::new(Context::new(parent)));
        Ok(RenContextHandle((contexts.len() - 1) as u32))
    }

    pub(crate) fn context(&self, handle: RenContextHandle) -> Result<Arc<Context>, EvalError> {
        self.contexts
            .read()
            .get(handle.0 as usize)
            .cloned()
            .ok_or(EvalError::InvalidContext(handle))
    }

    /// Bind `name` in `context`.
    pub fn set_word(&self, context: RenContextHandle, name: &str, value: Value) -> Result<(), EvalError> {
        self.context(context)?.words.write().insert(name.to_string(), value);
        Ok(())
    }

    /// Look `name` up in `context` and then its parents.
    pub fn get_word(&self, context: RenContextHandle, name: &str) -> Result<Option<Value>, EvalError> {
        let mut current = Some(context);
        while let Some(handle) = current {
            let ctx = self.context(handle)?;
            if let Some(value) = ctx.words.read().get(name) {
                return Ok(Some(value.clone()));
            }
            current = ctx.parent;
        }
        Ok(None)
    }

    /// Create the runtime record for a native and hand back its function value.
    pub fn finish_init(&self, spec: Specification, shim: RenShimPointer) -> Function {
        let mut natives = self.natives.write();
        natives.push(Arc::new(NativeRecord { spec, shim }));
        let index = (natives.len() - 1) as u32;
        debug!("engine {} native #{index} initialised", self.handle.0);
        Function {
            engine: self.handle,
            index,
        }
    }

    pub fn record(&self, function: &Function) -> Option<Arc<NativeRecord>> {
        if function.engine != self.handle {
            return None;
        }
        self.natives.read().get(function.index as usize).cloned()
    }

    pub fn native_count(&self) -> usize {
        self.natives.read().len()
    }

    pub fn series_count(&self) -> usize {
        self.heap.len()
    }

    /// Call a function value with already evaluated arguments.
    pub fn apply(&self, function: &Function, args: &[Value]) -> Result<Value, EvalError> {
        self.apply_named(&Value::Function(*function).to_string(), function, args)
    }

    pub(crate) fn apply_named(
        &self,
        name: &str,
        function: &Function,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let record = self
            .record(function)
            .ok_or_else(|| EvalError::InvalidFunction(name.to_string()))?;
        let arity = record.spec.arity();
        if args.len() != arity {
            return Err(EvalError::Native {
                function: name.to_string(),
                failure: NativeFailure::Arity {
                    expected: arity,
                    found: args.len(),
                },
            });
        }

        let _depth = DepthGuard::enter(self.config.max_eval_depth)?;
        if self.config.trace_applies {
            trace!("apply {name} engine={} args={}", self.handle.0, arity);
        }

        let mut stack = vec![RenCell::UNSET; stack_len(arity)];
        stack[REN_STACK_FUNCTION] = Value::Function(*function).to_cell(self);
        for (i, arg) in args.iter().enumerate() {
            stack[REN_STACK_ARGS + i] = arg.to_cell(self);
        }

        native::clear();
        let code = (record.shim)(stack.as_mut_ptr());
        let result = self.collect(name, code, &stack[REN_STACK_RETURN]);
        self.release_stack(&stack);
        result
    }

    fn collect(&self, name: &str, code: RenResult, ret: &RenCell) -> Result<Value, EvalError> {
        match code {
            RenResult::Success => Ok(Value::from_cell(ret, self)?),
            RenResult::Failure => {
                let failure = native::take_failure().unwrap_or_else(|| {
                    NativeFailure::Callable("native failed without detail".to_string())
                });
                Err(EvalError::Native {
                    function: name.to_string(),
                    failure,
                })
            }
            other => {
                warn!("native {name} answered {other:?} to a call");
                Err(EvalError::InvalidFunction(name.to_string()))
            }
        }
    }

    // Series behind a call stack only live for that call; results have
    // already been copied out into values.
    fn release_stack(&self, stack: &[RenCell]) {
        let mut handles: Vec<RenSeriesHandle> = stack.iter().filter_map(cell_series).collect();
        handles.sort_unstable_by_key(|h| h.0);
        handles.dedup();
        for handle in handles {
            self.heap.release(handle);
        }
    }
}

impl CellHeap for Engine {
    fn engine(&self) -> RenEngineHandle {
        self.handle
    }

    fn alloc(&self, series: Series) -> RenSeriesHandle {
        self.heap.alloc(series)
    }

    fn get(&self, handle: RenSeriesHandle) -> Option<Series> {
        self.heap.get(handle)
    }
}

/// Install the hook used when a registration names no engine.
pub fn set_finder<F>(finder: F)
where
    F: Fn() -> Option<Arc<Engine>> + Send + Sync + 'static,
{
    *FINDER.write() = Some(Box::new(finder));
}

pub fn clear_finder() {
    *FINDER.write() = None;
}

/// Resolve the implicit engine: the installed finder if any, otherwise a
/// lazily created default engine configured from the environment.
pub fn run_finder() -> Option<Arc<Engine>> {
    if let Some(finder) = FINDER.read().as_ref() {
        return finder();
    }

    let mut default = DEFAULT_ENGINE.lock();
    if let Some(engine) = default.as_ref() {
        if Engine::lookup(engine.handle()).is_some() {
            return Some(Arc::clone(engine));
        }
    }
    let config = EngineConfigBuilder::from_env()
        .build()
        .unwrap_or_else(|err| {
            warn!("ignoring engine environment overrides: {err}");
            EngineConfig::default()
        });
    let engine = Engine::create(config).ok()?;
    *default = Some(Arc::clone(&engine));
    Some(engine)
}
