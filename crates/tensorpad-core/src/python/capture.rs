//! Scoped capture of `sys.stdout`.

use pyo3::prelude::*;

/// Routes `sys.stdout` into a fresh `io.StringIO` until dropped.
///
/// The previous stream is put back on drop, so it is restored on every
/// exit path, including an exception from the executed code. `sys.stdout`
/// is process-global: callers must hold the execution lock for the whole
/// lifetime of the guard.
pub struct StdoutCapture<'py> {
    sys: Bound<'py, PyModule>,
    previous: Bound<'py, PyAny>,
    buffer: Bound<'py, PyAny>,
}

impl<'py> StdoutCapture<'py> {
    pub fn start(py: Python<'py>) -> PyResult<Self> {
        let sys = py.import_bound("sys")?;
        let buffer = py.import_bound("io")?.getattr("StringIO")?.call0()?;
        let previous = sys.getattr("stdout")?;
        sys.setattr("stdout", &buffer)?;
        Ok(Self {
            sys,
            previous,
            buffer,
        })
    }

    /// Everything written so far.
    pub fn contents(&self) -> PyResult<String> {
        self.buffer.call_method0("getvalue")?.extract()
    }

    /// Restore the previous stream and return the captured text.
    pub fn finish(self) -> PyResult<String> {
        let captured = self.contents();
        drop(self);
        captured
    }
}

impl Drop for StdoutCapture<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sys.setattr("stdout", &self.previous) {
            log::error!("Failed to restore sys.stdout: {}", e);
        }
    }
}
