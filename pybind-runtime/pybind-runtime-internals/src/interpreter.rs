//! The interpreter controller: configuration, lifecycle, and the
//! `eval`/`exec`/`exec_file` surface.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};

use pyo3_ffi as ffi;
use tracing::error;

use crate::error::{raise_runtime_error, Error, ErrorException};
use crate::object::mapping::Dict;
use crate::object::module;
use crate::object::sequence::List;
use crate::object::Object;

/// Interpreter configuration. Owns the runtime's opaque `PyConfig` record
/// with strict cleanup (`PyConfig_Clear` before free).
pub struct Config {
    config: Box<ffi::PyConfig>,
}

impl Config {
    /// Build an isolated configuration (no implicit environment/site lookup).
    pub fn new() -> Self {
        let mut config: Box<ffi::PyConfig> = Box::new(unsafe { std::mem::zeroed() });
        unsafe { ffi::PyConfig_InitIsolatedConfig(config.as_mut()) };
        Config { config }
    }

    fn get_mut(&mut self) -> &mut ffi::PyConfig {
        self.config.as_mut()
    }

    pub fn set_home(&mut self, home: &str) -> Result<(), Error> {
        let c = CString::new(home).unwrap_or_default();
        let status = unsafe {
            let config = self.get_mut();
            ffi::PyConfig_SetBytesString(config, &mut config.home, c.as_ptr())
        };
        check_status(status, &format!("failed to set interpreter home directory to '{}'", home))
    }

    pub fn set_prog_name(&mut self, name: &str) -> Result<(), Error> {
        let c = CString::new(name).unwrap_or_default();
        let status = unsafe {
            let config = self.get_mut();
            ffi::PyConfig_SetBytesString(config, &mut config.program_name, c.as_ptr())
        };
        check_status(status, &format!("failed to set interpreter program name to '{}'", name))
    }

    /// Parse `args` according to the runtime's own command-line
    /// conventions and install them as `sys.argv`.
    pub fn set_cmd_args(&mut self, args: &[String]) -> Result<(), Error> {
        let c_args: Vec<CString> = args.iter().map(|a| CString::new(a.as_str()).unwrap_or_default()).collect();
        let mut argv: Vec<*mut std::os::raw::c_char> = c_args.iter().map(|c| c.as_ptr() as *mut _).collect();
        let status = unsafe {
            let config = self.get_mut();
            config.parse_argv = 1;
            ffi::PyConfig_SetBytesArgv(config, argv.len() as std::os::raw::c_int, argv.as_mut_ptr())
        };
        check_status(status, "failed to set interpreter command line arguments")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        unsafe { ffi::PyConfig_Clear(self.config.as_mut()) };
    }
}

fn check_status(status: ffi::PyStatus, message: &str) -> Result<(), Error> {
    if unsafe { ffi::PyStatus_IsError(status) } == 0 {
        return Ok(());
    }
    let func = if status.func.is_null() {
        String::new()
    } else {
        unsafe { std::ffi::CStr::from_ptr(status.func) }.to_string_lossy().into_owned()
    };
    let err_msg = if status.err_msg.is_null() {
        String::new()
    } else {
        unsafe { std::ffi::CStr::from_ptr(status.err_msg) }.to_string_lossy().into_owned()
    };
    Err(raise_runtime_error(format!("{}: {}: {}", message, func, err_msg)))
}

static INTERPRETER_LIVE: AtomicBool = AtomicBool::new(false);

/// The embedded interpreter. Only one may be live per process; construction
/// initializes the runtime and captures `__main__`'s global namespace,
/// destruction finalizes it.
pub struct Interpreter {
    globals: Dict,
    #[cfg(feature = "coverage")]
    coverage_report: std::cell::RefCell<Option<Object>>,
}

impl Interpreter {
    pub fn new(mut config: Config) -> Result<Self, Error> {
        if INTERPRETER_LIVE.swap(true, Ordering::AcqRel) {
            return Err(raise_runtime_error("only one interpreter may be live per process"));
        }
        let status = unsafe { ffi::Py_InitializeFromConfig(config.get_mut()) };
        if let Err(e) = check_status(status, "failed to initialize interpreter") {
            INTERPRETER_LIVE.store(false, Ordering::Release);
            return Err(e);
        }
        let globals = module::import("__main__")?.dict()?;
        let interpreter = Interpreter {
            globals,
            #[cfg(feature = "coverage")]
            coverage_report: std::cell::RefCell::new(None),
        };
        #[cfg(feature = "coverage")]
        interpreter.start_coverage_report()?;
        Ok(interpreter)
    }

    /// Append `path` to the runtime's module search path (`sys.path`).
    pub fn append_path(&self, path: &str) -> Result<(), Error> {
        let sys = module::import("sys")?;
        let sys_path = List::expect(&sys.as_object().get_attr("path")?)?;
        sys_path.append(&Object::new(&path.to_string()))
    }

    /// Borrow the captured `__main__` global namespace.
    pub fn globals(&self) -> &Dict {
        &self.globals
    }

    /// Compile and evaluate `expr` in expression mode. Raises on failure.
    pub fn eval(&self, expr: &str) -> Result<Object, Error> {
        let source = dedent(expr);
        let c_source = CString::new(source).unwrap_or_default();
        let globals_ptr = self.globals.as_object().as_ptr();
        let p = unsafe { ffi::PyRun_String(c_source.as_ptr(), ffi::Py_eval_input, globals_ptr, globals_ptr) };
        if p.is_null() {
            return Err(Error::Exception(ErrorException::capture()));
        }
        Ok(Object::from_handle(crate::handle::steal(p)))
    }

    /// Compile and execute `stmt` in statement mode. On failure, prints the
    /// formatted error to the runtime's standard error and returns `false`.
    pub fn exec(&self, stmt: &str) -> bool {
        let source = dedent(stmt);
        let c_source = match CString::new(source) {
            Ok(c) => c,
            Err(_) => return false,
        };
        let globals_ptr = self.globals.as_object().as_ptr();
        let p = unsafe { ffi::PyRun_String(c_source.as_ptr(), ffi::Py_file_input, globals_ptr, globals_ptr) };
        if p.is_null() {
            unsafe { ffi::PyErr_Print() };
            return false;
        }
        unsafe { ffi::Py_DECREF(p) };
        true
    }

    /// Open `path` and execute it as statements. Raises a host-level error
    /// if the file cannot be opened; failure semantics otherwise mirror
    /// [`Interpreter::exec`].
    pub fn exec_file(&self, path: &str) -> Result<bool, Error> {
        let file = std::fs::File::open(path)
            .map_err(|_| raise_runtime_error(format!("Failed to open file '{}'.", path)))?;
        self.globals.set_item(&Object::new(&"__file__".to_string()), &Object::new(&path.to_string()))?;
        let c_path = CString::new(path).unwrap_or_default();
        let c_mode = CString::new("r").unwrap_or_default();
        let fp = unsafe { libc::fdopen(std::os::unix::io::AsRawFd::as_raw_fd(&file) as _, c_mode.as_ptr()) };
        if fp.is_null() {
            return Err(raise_runtime_error(format!("failed to open '{}' for execution", path)));
        }
        let globals_ptr = self.globals.as_object().as_ptr();
        let p = unsafe { ffi::PyRun_File(fp, c_path.as_ptr(), ffi::Py_file_input, globals_ptr, globals_ptr) };
        if p.is_null() {
            unsafe { ffi::PyErr_Print() };
            return Ok(false);
        }
        unsafe { ffi::Py_DECREF(p) };
        Ok(true)
    }

    #[cfg(feature = "coverage")]
    fn start_coverage_report(&self) -> Result<(), Error> {
        let source_dir = std::env::var("SOURCE_DIR").map_err(|_| {
            raise_runtime_error("environment variable 'SOURCE_DIR' must be set for coverage-instrumented builds")
        })?;
        let config_file = format!("{}/pyproject.toml", source_dir);
        let coverage = module::import("coverage")?;
        let coverage_class = coverage.as_object().get_attr("Coverage")?;
        let report = crate::call_any!(
            &coverage_class,
            crate::call::kwarg("branch", &true),
            crate::call::kwarg("config_file", &config_file)
        )?;
        report.get_attr("start")?.call0()?;
        *self.coverage_report.borrow_mut() = Some(report);
        Ok(())
    }

    #[cfg(feature = "coverage")]
    fn stop_coverage_report(&self) -> Result<(), Error> {
        let warnings = module::import("warnings")?;
        warnings.as_object().get_attr("filterwarnings")?.call(&[Object::new(&"ignore".to_string())])?;
        if let Some(report) = self.coverage_report.borrow_mut().take() {
            report.get_attr("stop")?.call0()?;
            report.get_attr("save")?.call0()?;
        }
        Ok(())
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        #[cfg(feature = "coverage")]
        if let Err(e) = self.stop_coverage_report() {
            error!("failed to finalize coverage report: {}", e);
        }
        unsafe { ffi::Py_Finalize() };
        INTERPRETER_LIVE.store(false, Ordering::Release);
    }
}

/// Strip a leading newline's worth of common indentation, matching the
/// runtime's own `textwrap.dedent`. A no-op unless `s` begins with a literal
/// newline, so ordinary single-line host strings pass through untouched.
pub fn dedent(s: &str) -> String {
    if !s.starts_with('\n') {
        return s.to_string();
    }
    let lines: Vec<&str> = s.split('\n').collect();
    let mut margin: Option<&str> = None;
    for line in &lines {
        let trimmed = line.trim_start_matches(|c: char| c == ' ' || c == '\t');
        if trimmed.is_empty() {
            continue;
        }
        let indent = &line[..line.len() - trimmed.len()];
        margin = Some(match margin {
            None => indent,
            Some(m) => common_prefix(m, indent),
        });
        if margin == Some("") {
            break;
        }
    }
    match margin {
        None | Some("") => s.to_string(),
        Some(m) => lines
            .iter()
            .map(|line| {
                if line.trim().is_empty() {
                    ""
                } else {
                    line.strip_prefix(m).unwrap_or(line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    &a[..len]
}

#[cfg(test)]
mod tests {
    use super::dedent;

    #[test]
    fn dedent_leaves_single_line_unchanged() {
        assert_eq!(dedent("x = 1"), "x = 1");
    }

    #[test]
    fn dedent_strips_common_indentation() {
        let input = "\n    def f():\n        return 1\n    ";
        let expected = "\ndef f():\n    return 1\n";
        assert_eq!(dedent(input), expected);
    }

    #[test]
    fn dedent_is_idempotent() {
        let input = "\n    x = 1\n    y = 2\n";
        let once = dedent(input);
        let twice = dedent(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn dedent_idempotent_on_plain_strings() {
        let input = "no leading newline here";
        assert_eq!(dedent(dedent(input).as_str()), dedent(input));
    }
}
