//! The thread that owns the RustPython interpreter

use rustpython_vm::{
    AsObject, Interpreter, PyObjectRef, PyRef, PyResult, Settings, VirtualMachine,
    builtins::{PyBaseExceptionRef, PyCode},
    compiler::Mode,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::Job;
use crate::capture;
use crate::config::PythonConfig;
use crate::runtime::{BootstrapError, ExecutionError, ExecutionResult};

/// File name reported in tracebacks of user code
const SOURCE_PATH: &str = "<exec>";

/// Objects installed as `sys.stdout` and `sys.stdin` for the duration of
/// one run. Programs have no interactive input, so `input()` sees EOF.
const STDIO_CLASSES: &str = r#"
class StdoutCapture:
    def __init__(self):
        self._parts = []

    def write(self, text):
        self._parts.append(text)
        return len(text)

    def flush(self):
        pass

    def isatty(self):
        return False

    def getvalue(self):
        return "".join(self._parts)


class ClosedStdin:
    def readline(self, size=-1):
        return ""

    def read(self, size=-1):
        return ""

    def isatty(self):
        return False
"#;

/// Thread entry point: boot, report readiness, then serve jobs until the
/// handle is dropped
pub(super) fn serve(
    config: PythonConfig,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    ready: oneshot::Sender<Result<(), BootstrapError>>,
) {
    let vm = match Vm::boot(&config) {
        Ok(vm) => vm,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        debug!("bootstrap abandoned before the Python VM was ready");
        return;
    }

    while let Some(job) = jobs.blocking_recv() {
        debug!(bytes = job.source.len(), "running Python");
        let outcome = vm.execute(&job.source);
        let _ = job.reply.send(outcome);
    }

    debug!("Python VM thread exiting");
}

struct Vm {
    interpreter: Interpreter,
    stdio: StdioClasses,
}

struct StdioClasses {
    capture: PyObjectRef,
    closed_stdin: PyObjectRef,
}

impl Vm {
    fn boot(config: &PythonConfig) -> Result<Self, BootstrapError> {
        let mut settings = Settings::default();
        if let Some(path) = &config.library_path {
            if !path.is_dir() {
                return Err(BootstrapError::MissingLibrary(path.clone()));
            }
            settings.path_list.push(path.to_string_lossy().into_owned());
        }

        let interpreter = Interpreter::with_init(
            settings,
            |#[cfg_attr(not(feature = "python-stdlib"), allow(unused_variables))] vm| {
                #[cfg(feature = "python-stdlib")]
                {
                    vm.add_native_modules(rustpython_stdlib::get_module_inits());
                    vm.add_frozen(rustpython_pylib::FROZEN_STDLIB);
                }
            },
        );

        let stdio = interpreter
            .enter(|vm| define_stdio_classes(vm).map_err(|exc| describe_exception(vm, &exc)))
            .map_err(BootstrapError::Init)?;

        Ok(Self { interpreter, stdio })
    }

    fn execute(&self, source: &str) -> ExecutionResult<String> {
        self.interpreter.enter(|vm| {
            self.run_captured(vm, source)
                .map_err(|exc| ExecutionError::Raised(describe_exception(vm, &exc)))
        })
    }

    fn run_captured(&self, vm: &VirtualMachine, source: &str) -> PyResult<String> {
        let streams = StdioCapture::install(vm, &self.stdio)?;
        let value = run_program(vm, source);
        let printed = streams.finish();

        let value = value?;
        let printed = printed?;
        let shown = match value {
            Some(value) => Some(value.str(vm)?.as_str().to_owned()),
            None => None,
        };
        Ok(capture::compose_vm_output(&printed, shown.as_deref()))
    }
}

fn define_stdio_classes(vm: &VirtualMachine) -> PyResult<StdioClasses> {
    let scope = vm.new_scope_with_builtins();
    vm.run_code_string(scope.clone(), STDIO_CLASSES, "<stdio>".to_owned())?;
    Ok(StdioClasses {
        capture: scope.globals.get_item("StdoutCapture", vm)?,
        closed_stdin: scope.globals.get_item("ClosedStdin", vm)?,
    })
}

/// `sys.stdout` and `sys.stdin` swapped for fresh run-local objects until
/// [`finish`] or drop
///
/// [`finish`]: StdioCapture::finish
struct StdioCapture<'vm> {
    vm: &'vm VirtualMachine,
    sink: PyObjectRef,
    saved: Vec<(&'static str, PyObjectRef)>,
}

impl<'vm> StdioCapture<'vm> {
    fn install(vm: &'vm VirtualMachine, classes: &StdioClasses) -> PyResult<Self> {
        let sink = classes.capture.call((), vm)?;
        let stdin = classes.closed_stdin.call((), vm)?;

        let mut guard = Self {
            vm,
            sink: sink.clone(),
            saved: Vec::with_capacity(2),
        };
        guard.swap("stdout", sink)?;
        guard.swap("stdin", stdin)?;
        Ok(guard)
    }

    fn swap(&mut self, name: &'static str, replacement: PyObjectRef) -> PyResult<()> {
        let vm = self.vm;
        let sys = vm.sys_module.as_object();
        let original = sys.get_attr(name, vm)?;
        sys.set_attr(name, replacement, vm)?;
        self.saved.push((name, original));
        Ok(())
    }

    /// Put every swapped stream back, reporting the first failure
    fn restore(&mut self) -> PyResult<()> {
        let vm = self.vm;
        let sys = vm.sys_module.as_object();
        let mut result = Ok(());
        while let Some((name, original)) = self.saved.pop() {
            if let Err(exc) = sys.set_attr(name, original, vm) {
                if result.is_ok() {
                    result = Err(exc);
                }
            }
        }
        result
    }

    /// Restore the streams and return everything written to the capture
    fn finish(mut self) -> PyResult<String> {
        self.restore()?;
        let text = self.vm.call_method(&self.sink, "getvalue", ())?;
        Ok(text.str(self.vm)?.as_str().to_owned())
    }
}

impl Drop for StdioCapture<'_> {
    fn drop(&mut self) {
        if let Err(exc) = self.restore() {
            warn!(
                "failed to restore sys streams: {}",
                describe_exception(self.vm, &exc)
            );
        }
    }
}

/// Run `source` in a fresh global scope, returning the value of a trailing
/// expression statement unless it is `None`
fn run_program(vm: &VirtualMachine, source: &str) -> PyResult<Option<PyObjectRef>> {
    let scope = vm.new_scope_with_builtins();

    match split_trailing_expression(vm, source) {
        Some((body, expression)) => {
            vm.run_code_string(scope.clone(), body, SOURCE_PATH.to_owned())?;
            let value = vm.run_code_obj(expression, scope)?;
            Ok((!vm.is_none(&value)).then_some(value))
        }
        None => {
            vm.run_code_string(scope, source, SOURCE_PATH.to_owned())?;
            Ok(None)
        }
    }
}

/// Find the last top-level statement if it is an expression
///
/// Walks unindented lines from the bottom; the first one whose tail compiles
/// as an expression and whose head compiles as a module wins.
fn split_trailing_expression<'s>(
    vm: &VirtualMachine,
    source: &'s str,
) -> Option<(&'s str, PyRef<PyCode>)> {
    if ends_with_semicolon(source) {
        return None;
    }

    for start in statement_starts(source).into_iter().rev() {
        let (body, tail) = source.split_at(start);
        let Ok(expression) = vm.compile(tail, Mode::Eval, SOURCE_PATH.to_owned()) else {
            continue;
        };
        if vm.compile(body, Mode::Exec, SOURCE_PATH.to_owned()).is_ok() {
            return Some((body, expression));
        }
    }
    None
}

/// Byte offsets of unindented lines that hold code
fn statement_starts(source: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        let indented = line.starts_with(char::is_whitespace);
        if !indented && !trimmed.is_empty() && !trimmed.starts_with('#') {
            starts.push(offset);
        }
        offset += line.len();
    }
    starts
}

/// A trailing `;` on the last code line suppresses the value
fn ends_with_semicolon(source: &str) -> bool {
    source
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .is_some_and(|line| line.ends_with(';'))
}

/// `"<Type>: <message>"`, or just the type name when the message is empty
fn describe_exception(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    let type_name = exc.as_object().class().name().to_string();
    match exc.as_object().str(vm) {
        Ok(text) if !text.as_str().is_empty() => format!("{type_name}: {}", text.as_str()),
        _ => type_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_starts_skip_indented_blank_and_comments() {
        let source = "x = 1\n\n# note\nif x:\n    y = 2\nx\n";
        assert_eq!(statement_starts(source), vec![0, 14, 30]);
    }

    #[test]
    fn test_statement_starts_empty_source() {
        assert!(statement_starts("").is_empty());
        assert!(statement_starts("   \n# only a comment\n").is_empty());
    }

    #[test]
    fn test_semicolon_detection_ignores_trailing_comments() {
        assert!(ends_with_semicolon("x = 1\nx;\n# done\n"));
        assert!(!ends_with_semicolon("x = 1\nx\n"));
        assert!(!ends_with_semicolon(""));
    }

    fn stream_ids(vm: &Vm) -> (usize, usize) {
        vm.interpreter.enter(|vm| {
            let sys = vm.sys_module.as_object();
            (
                sys.get_attr("stdout", vm).unwrap().get_id(),
                sys.get_attr("stdin", vm).unwrap().get_id(),
            )
        })
    }

    #[test]
    fn test_streams_restored_when_program_raises() {
        let vm = Vm::boot(&PythonConfig::default()).unwrap();
        let before = stream_ids(&vm);

        assert!(vm.execute("print('partial')\nraise RuntimeError('x')").is_err());
        assert_eq!(stream_ids(&vm), before);

        assert!(vm.execute("input()").is_err());
        assert_eq!(stream_ids(&vm), before);
    }

    #[test]
    fn test_execute_composes_output() {
        let vm = Vm::boot(&PythonConfig::default()).unwrap();
        assert_eq!(vm.execute("print('a')\nprint('b')").unwrap(), "a\nb");
        assert_eq!(vm.execute("print('a')\n'b'").unwrap(), "a\n\n=> b");
        assert_eq!(
            vm.execute("raise ValueError('boom')").unwrap_err(),
            ExecutionError::Raised("ValueError: boom".to_string())
        );
    }
}
