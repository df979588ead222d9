//! JavaScript strategy powered by the Boa engine
//!
//! Every run gets its own [`Context`]: the script sees the ECMAScript
//! built-ins, the encoding/structuredClone/microtask extensions from
//! boa_runtime, and a `console` object whose `log` writes into the run's
//! [`LineCapture`]. The other console methods are developer-facing and go to
//! `tracing`.

use boa_engine::{
    Context, JsError, JsNativeError, JsObject, JsResult, JsValue, NativeFunction, Source,
    context::ContextBuilder, js_string, object::ObjectInitializer,
};
use boa_gc::{Finalize, Trace};
use boa_runtime::{
    extensions::{EncodingExtension, MicrotaskExtension, StructuredCloneExtension},
    register_extensions,
};
use tracing::{debug, error, info, warn};

use super::{ExecutionError, ExecutionResult};
use crate::capture::{self, LineCapture};
use crate::config::JsConfig;

/// Renders one `console.log` argument
const SHOW_ARGUMENT: &str =
    "(value) => typeof value === 'object' ? JSON.stringify(value, null, 2) : String(value)";

/// Extracts the message of a thrown `Error`, `undefined` for anything else
const ERROR_MESSAGE: &str =
    "(error) => error instanceof Error ? String(error.message) : undefined";

/// State captured by the native console functions of one context
#[derive(Clone, Trace, Finalize)]
struct ConsoleSink {
    #[unsafe_ignore_trace]
    log: LineCapture,
    show: JsObject,
}

impl ConsoleSink {
    /// Format call arguments as one line, separated by single spaces
    fn render(&self, args: &[JsValue], context: &mut Context) -> JsResult<String> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let shown = self
                .show
                .call(&JsValue::undefined(), std::slice::from_ref(arg), context)?;
            parts.push(shown.to_string(context)?.to_std_string_escaped());
        }
        Ok(parts.join(" "))
    }
}

fn console_log(
    _this: &JsValue,
    args: &[JsValue],
    sink: &ConsoleSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    let line = sink.render(args, context)?;
    sink.log.push(line);
    Ok(JsValue::undefined())
}

fn console_info(
    _this: &JsValue,
    args: &[JsValue],
    sink: &ConsoleSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    let line = sink.render(args, context)?;
    info!(target: "scratchpad::console", "{line}");
    Ok(JsValue::undefined())
}

fn console_debug(
    _this: &JsValue,
    args: &[JsValue],
    sink: &ConsoleSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    let line = sink.render(args, context)?;
    debug!(target: "scratchpad::console", "{line}");
    Ok(JsValue::undefined())
}

fn console_warn(
    _this: &JsValue,
    args: &[JsValue],
    sink: &ConsoleSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    let line = sink.render(args, context)?;
    warn!(target: "scratchpad::console", "{line}");
    Ok(JsValue::undefined())
}

fn console_error(
    _this: &JsValue,
    args: &[JsValue],
    sink: &ConsoleSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    let line = sink.render(args, context)?;
    error!(target: "scratchpad::console", "{line}");
    Ok(JsValue::undefined())
}

/// Create a context with the configured limits and the WebAPI extensions
fn build_context(config: &JsConfig) -> JsResult<Context> {
    let mut context = ContextBuilder::default().build()?;

    context
        .runtime_limits_mut()
        .set_recursion_limit(config.recursion_limit);
    context
        .runtime_limits_mut()
        .set_stack_size_limit(config.stack_size_limit);

    register_extensions(
        (
            EncodingExtension,
            StructuredCloneExtension,
            MicrotaskExtension,
        ),
        None,
        &mut context,
    )?;

    Ok(context)
}

/// Evaluate a helper arrow function and return it as an object
fn helper(context: &mut Context, code: &str) -> JsResult<JsObject> {
    let value = context.eval(Source::from_bytes(code.as_bytes()))?;
    value.as_object().map(|o| o.clone()).ok_or_else(|| {
        JsNativeError::typ()
            .with_message("helper did not evaluate to a function")
            .into()
    })
}

/// Bind a fresh `console` object to `sink`
fn install_console(context: &mut Context, sink: ConsoleSink) -> JsResult<()> {
    let console = ObjectInitializer::new(context)
        .function(
            NativeFunction::from_copy_closure_with_captures(console_log, sink.clone()),
            js_string!("log"),
            0,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(console_info, sink.clone()),
            js_string!("info"),
            0,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(console_debug, sink.clone()),
            js_string!("debug"),
            0,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(console_warn, sink.clone()),
            js_string!("warn"),
            0,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(console_error, sink),
            js_string!("error"),
            0,
        )
        .build();

    context
        .global_object()
        .set(js_string!("console"), console, false, context)?;
    Ok(())
}

/// Run the script, drain pending jobs, and stringify the completion value
fn evaluate(context: &mut Context, source: &str) -> JsResult<Option<String>> {
    let value = context.eval(Source::from_bytes(source.as_bytes()))?;
    context.run_jobs()?;

    if value.is_undefined() {
        return Ok(None);
    }
    Ok(Some(value.to_string(context)?.to_std_string_escaped()))
}

/// Map a thrown value to the text shown in the output panel
fn describe_error(error: &JsError, context: &mut Context) -> ExecutionError {
    // Runtime limit errors cannot be turned into JS objects
    if let Some(native) = error.as_native().filter(|native| native.is_runtime_limit()) {
        return ExecutionError::Raised(native.message().to_string());
    }

    let thrown = error.to_opaque(context);
    let message = helper(context, ERROR_MESSAGE)
        .and_then(|describe| describe.call(&JsValue::undefined(), &[thrown], context));

    match message {
        Ok(message) => match message.as_string() {
            Some(text) => ExecutionError::Raised(text.to_std_string_escaped()),
            None => ExecutionError::Unknown,
        },
        Err(_) => ExecutionError::Unknown,
    }
}

fn setup_failure(error: JsError) -> ExecutionError {
    error!("failed to prepare JavaScript context: {error}");
    ExecutionError::Raised(error.to_string())
}

/// Execute `source` and compose its output
pub fn execute(source: &str, config: &JsConfig) -> ExecutionResult<String> {
    let mut context = build_context(config).map_err(setup_failure)?;

    let log = LineCapture::new();
    let show = helper(&mut context, SHOW_ARGUMENT).map_err(setup_failure)?;
    install_console(
        &mut context,
        ConsoleSink {
            log: log.clone(),
            show,
        },
    )
    .map_err(setup_failure)?;

    debug!(bytes = source.len(), "running JavaScript");
    match evaluate(&mut context, source) {
        Ok(value) => Ok(capture::compose_script_output(&log, value.as_deref())),
        Err(err) => Err(describe_error(&err, &mut context)),
    }
}
