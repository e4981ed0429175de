//! [`Sandbox`] backed by the Rhai scripting engine.
//!
//! Every invocation gets a fresh [`Engine`] and [`Scope`]. Only the
//! capabilities present in the [`ExecutionContext`] are registered, so a
//! script can probe for a profile with `is_def_var("__httpClient")`. Engine
//! progress callbacks enforce the deadline between operations and inside
//! `setTimeout` waits. Modules cannot be imported.
//!
//! Variadic host functions take up to four arguments directly; longer
//! argument lists are passed as one array, as in `__notify([a, b, c, d, e])`.

use std::thread;
use std::time::{Duration, Instant};

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, NativeCallContext, Position,
    Scope,
};
use scripthost_core::profile::{
    CAP_HTTP_CLIENT, CAP_NOTIFICATION, CAP_NOTIFY, CAP_PERSISTENT_STORE, CAP_PREFS, CAP_TASK,
};
use scripthost_core::request::RequestSpec;
use serde_json::Value;

use super::{Sandbox, SandboxError};
use crate::bridge::ClientReply;
use crate::capability::{
    Console, HttpClientCapability, LogLevel, NotifyCapability, StoreCapability, TaskCapability,
};
use crate::context::ExecutionContext;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

const TERMINATION_TOKEN: &str = "execution deadline exceeded";
/// Longest single sleep while waiting in `setTimeout`.
const WAIT_SLICE: Duration = Duration::from_millis(10);
const MAX_CALL_LEVELS: usize = 64;

/// Runs scripts written in Rhai.
#[derive(Debug, Default, Clone, Copy)]
pub struct RhaiSandbox;

impl RhaiSandbox {
    pub fn new() -> Self {
        Self
    }
}

impl Sandbox for RhaiSandbox {
    fn execute(
        &self,
        source: &str,
        context: ExecutionContext,
        deadline: Instant,
    ) -> Result<(), SandboxError> {
        let started = Instant::now();
        let mut engine = Engine::new();
        engine.set_max_call_levels(MAX_CALL_LEVELS);
        engine.disable_symbol("eval");
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.on_progress(move |_| {
            (Instant::now() >= deadline).then(|| Dynamic::from(TERMINATION_TOKEN.to_string()))
        });

        let print_console = context.console.clone();
        engine.on_print(move |text| print_console.emit(LogLevel::Info, text));
        let debug_console = context.console.clone();
        engine.on_debug(move |text, _, _| debug_console.emit(LogLevel::Debug, text));

        let mut scope = Scope::new();
        register_baseline(&mut engine, &mut scope, &context, deadline);
        register_http_client_profile(&mut engine, &mut scope, &context);
        register_task_fetch_profile(&mut engine, &mut scope, &context);

        for (name, value) in &context.bindings {
            let value = json_to_dynamic(value).map_err(|e| SandboxError::Runtime(e.to_string()))?;
            scope.push_dynamic(name.as_str(), value);
        }

        let ast = engine
            .compile(source)
            .map_err(|e| SandboxError::Compile(e.to_string()))?;

        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|err| classify(&err, started))
    }
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

fn register_baseline(
    engine: &mut Engine,
    scope: &mut Scope,
    context: &ExecutionContext,
    deadline: Instant,
) {
    engine.register_type_with_name::<Console>("Console");
    for (name, level) in [
        ("log", LogLevel::Info),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ] {
        engine.register_fn(name, move |c: &mut Console, a: Dynamic| {
            c.emit(level, &render_all(&[a]))
        });
        engine.register_fn(name, move |c: &mut Console, a: Dynamic, b: Dynamic| {
            c.emit(level, &render_all(&[a, b]))
        });
        engine.register_fn(name, move |c: &mut Console, a: Dynamic, b: Dynamic, d: Dynamic| {
            c.emit(level, &render_all(&[a, b, d]))
        });
        engine.register_fn(
            name,
            move |c: &mut Console, a: Dynamic, b: Dynamic, d: Dynamic, e: Dynamic| {
                c.emit(level, &render_all(&[a, b, d, e]))
            },
        );
        engine.register_fn(name, move |c: &mut Console, args: Array| {
            c.emit(level, &render_all(&args))
        });
    }
    scope.push("console", context.console.clone());

    engine.register_fn(
        "setTimeout",
        move |ctx: NativeCallContext, callback: FnPtr| -> RhaiResult<()> {
            callback.call_within_context::<Dynamic>(&ctx, Vec::<Dynamic>::new())?;
            Ok(())
        },
    );
    engine.register_fn(
        "setTimeout",
        move |ctx: NativeCallContext, callback: FnPtr, ms: i64| -> RhaiResult<()> {
            wait_within_deadline(Duration::from_millis(ms.max(0) as u64), deadline)?;
            callback.call_within_context::<Dynamic>(&ctx, Vec::<Dynamic>::new())?;
            Ok(())
        },
    );

    let slot = context.completion.clone();
    let console = context.console.clone();
    engine.register_fn("done", move |payload: Dynamic| -> RhaiResult<()> {
        let value = dynamic_to_json(&payload)?;
        console.emit(LogLevel::Debug, &format!("done data: {value}"));
        slot.record(value);
        Ok(())
    });
    engine.register_fn("done", || {});

    let http = context.http.clone();
    engine.register_fn(
        "axios",
        move |ctx: NativeCallContext, request: Dynamic, callback: FnPtr| -> RhaiResult<()> {
            let spec = request_spec(&request)?;
            if let Some(raw) = http.generic(spec) {
                callback.call_within_context::<Dynamic>(&ctx, vec![json_to_dynamic(&raw)?])?;
            }
            Ok(())
        },
    );
}

// ---------------------------------------------------------------------------
// Http-client profile
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct PersistentStore(StoreCapability);

#[derive(Clone)]
struct Notification(NotifyCapability);

fn register_http_client_profile(engine: &mut Engine, scope: &mut Scope, context: &ExecutionContext) {
    if let Some(client) = &context.http_client {
        engine.register_type_with_name::<HttpClientCapability>("HttpClient");
        engine.register_fn(
            "get",
            |ctx: NativeCallContext,
             client: &mut HttpClientCapability,
             request: Dynamic,
             callback: FnPtr|
             -> RhaiResult<()> {
                let reply = client.get(request_spec(&request)?);
                deliver_reply(&ctx, &callback, reply)
            },
        );
        engine.register_fn(
            "post",
            |ctx: NativeCallContext,
             client: &mut HttpClientCapability,
             request: Dynamic,
             callback: FnPtr|
             -> RhaiResult<()> {
                let reply = client.post(request_spec(&request)?);
                deliver_reply(&ctx, &callback, reply)
            },
        );
        scope.push(CAP_HTTP_CLIENT, client.clone());
    }

    if let Some(store) = &context.persistent_store {
        engine.register_type_with_name::<PersistentStore>("PersistentStore");
        engine.register_fn("read", |s: &mut PersistentStore, key: ImmutableString| -> String {
            s.0.read(key.as_str())
        });
        engine.register_fn(
            "write",
            |s: &mut PersistentStore, value: Dynamic, key: ImmutableString| -> bool {
                s.0.write(&render(&value), key.as_str())
            },
        );
        scope.push(CAP_PERSISTENT_STORE, PersistentStore(store.clone()));
    }

    if let Some(notify) = &context.notification {
        engine.register_type_with_name::<Notification>("Notification");
        engine.register_fn("post", |n: &mut Notification, a: Dynamic| n.0.post(&render_each(&[a])));
        engine.register_fn("post", |n: &mut Notification, a: Dynamic, b: Dynamic| {
            n.0.post(&render_each(&[a, b]))
        });
        engine.register_fn(
            "post",
            |n: &mut Notification, a: Dynamic, b: Dynamic, c: Dynamic| {
                n.0.post(&render_each(&[a, b, c]))
            },
        );
        engine.register_fn(
            "post",
            |n: &mut Notification, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
                n.0.post(&render_each(&[a, b, c, d]))
            },
        );
        engine.register_fn("post", |n: &mut Notification, args: Array| {
            n.0.post(&render_each(&args))
        });
        scope.push(CAP_NOTIFICATION, Notification(notify.clone()));
    }
}

/// Calls `callback(error, response, body)`.
fn deliver_reply(ctx: &NativeCallContext, callback: &FnPtr, reply: ClientReply) -> RhaiResult<()> {
    let error = reply.error.map(Dynamic::from).unwrap_or(Dynamic::UNIT);
    let response = match &reply.response {
        Some(response) => json_to_dynamic(&response.to_value())?,
        None => Dynamic::UNIT,
    };
    callback.call_within_context::<Dynamic>(ctx, vec![error, response, Dynamic::from(reply.body)])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Task-fetch profile
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Task(TaskCapability);

#[derive(Clone)]
struct Prefs(StoreCapability);

/// An already-settled fetch outcome. `then` runs the matching handler
/// immediately and settles a new promise with its result.
#[derive(Clone)]
struct Promise {
    outcome: Result<Dynamic, Dynamic>,
}

impl Promise {
    fn settle(
        &self,
        ctx: &NativeCallContext,
        on_ok: &FnPtr,
        on_err: Option<&FnPtr>,
    ) -> RhaiResult<Self> {
        let outcome = match (&self.outcome, on_err) {
            (Ok(value), _) => Ok(on_ok.call_within_context::<Dynamic>(ctx, vec![value.clone()])?),
            (Err(reason), Some(handler)) => {
                Ok(handler.call_within_context::<Dynamic>(ctx, vec![reason.clone()])?)
            }
            (Err(reason), None) => Err(reason.clone()),
        };
        Ok(Self { outcome })
    }
}

fn register_task_fetch_profile(engine: &mut Engine, scope: &mut Scope, context: &ExecutionContext) {
    if let Some(task) = &context.task {
        engine.register_type_with_name::<Task>("Task");
        engine.register_type_with_name::<Promise>("Promise");
        engine.register_fn("fetch", |t: &mut Task, request: Dynamic| -> RhaiResult<Promise> {
            let outcome = match t.0.fetch(request_spec(&request)?) {
                Ok(response) => Ok(json_to_dynamic(&response.to_value())?),
                Err(err) => Err(Dynamic::from(err.to_string())),
            };
            Ok(Promise { outcome })
        });
        engine.register_fn(
            "then",
            |ctx: NativeCallContext, p: &mut Promise, on_ok: FnPtr| -> RhaiResult<Promise> {
                p.settle(&ctx, &on_ok, None)
            },
        );
        engine.register_fn(
            "then",
            |ctx: NativeCallContext,
             p: &mut Promise,
             on_ok: FnPtr,
             on_err: FnPtr|
             -> RhaiResult<Promise> { p.settle(&ctx, &on_ok, Some(&on_err)) },
        );
        engine.register_fn("is_rejected", |p: &mut Promise| p.outcome.is_err());
        scope.push(CAP_TASK, Task(task.clone()));
    }

    if let Some(prefs) = &context.prefs {
        engine.register_type_with_name::<Prefs>("Prefs");
        engine.register_fn("valueForKey", |p: &mut Prefs, key: ImmutableString| -> String {
            p.0.read(key.as_str())
        });
        engine.register_fn(
            "setValueForKey",
            |p: &mut Prefs, value: Dynamic, key: ImmutableString| -> bool {
                p.0.write(&render(&value), key.as_str())
            },
        );
        scope.push(CAP_PREFS, Prefs(prefs.clone()));
    }

    if let Some(notify) = &context.notify {
        let n = notify.clone();
        engine.register_fn(CAP_NOTIFY, move |a: Dynamic| n.post(&render_each(&[a])));
        let n = notify.clone();
        engine.register_fn(CAP_NOTIFY, move |a: Dynamic, b: Dynamic| {
            n.post(&render_each(&[a, b]))
        });
        let n = notify.clone();
        engine.register_fn(CAP_NOTIFY, move |a: Dynamic, b: Dynamic, c: Dynamic| {
            n.post(&render_each(&[a, b, c]))
        });
        let n = notify.clone();
        engine.register_fn(CAP_NOTIFY, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
            n.post(&render_each(&[a, b, c, d]))
        });
        let n = notify.clone();
        engine.register_fn(CAP_NOTIFY, move |args: Array| n.post(&render_each(&args)));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(message.into()), Position::NONE).into()
}

fn terminated() -> Box<EvalAltResult> {
    EvalAltResult::ErrorTerminated(Dynamic::from(TERMINATION_TOKEN.to_string()), Position::NONE).into()
}

fn dynamic_to_json(value: &Dynamic) -> RhaiResult<Value> {
    rhai::serde::from_dynamic::<Value>(value)
}

fn json_to_dynamic(value: &Value) -> RhaiResult<Dynamic> {
    rhai::serde::to_dynamic(value)
}

fn request_spec(request: &Dynamic) -> RhaiResult<RequestSpec> {
    let value = dynamic_to_json(request)?;
    RequestSpec::from_value(&value).map_err(|e| runtime_error(e.to_string()))
}

/// Strings as-is, everything else as JSON text.
fn render(value: &Dynamic) -> String {
    if value.is_string() {
        return value.clone().into_string().unwrap_or_default();
    }
    if value.is_unit() {
        return "undefined".to_string();
    }
    match dynamic_to_json(value) {
        Ok(json) => json.to_string(),
        Err(_) => value.to_string(),
    }
}

fn render_each(values: &[Dynamic]) -> Vec<String> {
    values.iter().map(render).collect()
}

fn render_all(values: &[Dynamic]) -> String {
    render_each(values).join(" ")
}

/// Sleep for `wait`, failing as terminated once `deadline` passes.
fn wait_within_deadline(wait: Duration, deadline: Instant) -> RhaiResult<()> {
    let wake_at = Instant::now() + wait;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(terminated());
        }
        if now >= wake_at {
            return Ok(());
        }
        thread::sleep(WAIT_SLICE.min(wake_at - now).min(deadline - now));
    }
}

fn is_termination(err: &EvalAltResult) -> bool {
    match err {
        EvalAltResult::ErrorTerminated(..) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => is_termination(inner),
        _ => false,
    }
}

fn classify(err: &EvalAltResult, started: Instant) -> SandboxError {
    if is_termination(err) {
        SandboxError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    } else {
        SandboxError::Runtime(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
