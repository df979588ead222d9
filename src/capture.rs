//! Output capture and composition
//!
//! A [`LineCapture`] is handed to exactly one execution and collects the lines
//! it writes. Nothing global is redirected, so there is nothing to restore once
//! the run is over: dropping the capture is the release.
//!
//! The `compose_*` functions turn captured text plus an optional final value
//! into the string shown in the output panel.

use std::cell::RefCell;
use std::rc::Rc;

/// Marker placed in front of a run's final value
pub const RESULT_MARKER: &str = "=> ";

/// Shown in the output panel while there is no output
pub const EMPTY_OUTPUT_HINT: &str = "Run your code to see the output here.";

/// Line buffer shared between a running program's output sink and the caller
#[derive(Debug, Clone, Default)]
pub struct LineCapture {
    lines: Rc<RefCell<Vec<String>>>,
}

impl LineCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one line of output
    pub fn push(&self, line: impl Into<String>) {
        self.lines.borrow_mut().push(line.into());
    }

    /// Number of lines captured so far
    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    /// Captured lines joined by newlines
    pub fn text(&self) -> String {
        self.lines.borrow().join("\n")
    }
}

fn append_value(text: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        text.push('\n');
        text.push_str(RESULT_MARKER);
        text.push_str(value);
    }
}

/// Output of an in-process JavaScript run: log lines, then the completion
/// value if there is one. Not trimmed, so a run that logs nothing but yields
/// a value starts with a newline.
pub fn compose_script_output(log: &LineCapture, value: Option<&str>) -> String {
    let mut text = log.text();
    append_value(&mut text, value);
    text
}

/// Output of an embedded VM run: raw stdout, then the final value if there is
/// one, with surrounding whitespace trimmed.
pub fn compose_vm_output(stdout: &str, value: Option<&str>) -> String {
    let mut text = stdout.to_string();
    append_value(&mut text, value);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_is_shared_between_clones() {
        let capture = LineCapture::new();
        let sink = capture.clone();
        sink.push("first");
        sink.push("second");
        assert_eq!(capture.len(), 2);
        assert_eq!(capture.text(), "first\nsecond");
    }

    #[test]
    fn test_script_output_with_value() {
        let log = LineCapture::new();
        log.push("hi");
        assert_eq!(compose_script_output(&log, Some("42")), "hi\n=> 42");
    }

    #[test]
    fn test_script_output_without_logs() {
        let log = LineCapture::new();
        assert!(log.is_empty());
        assert_eq!(compose_script_output(&log, Some("42")), "\n=> 42");
        assert_eq!(compose_script_output(&log, None), "");
    }

    #[test]
    fn test_vm_output_is_trimmed() {
        assert_eq!(compose_vm_output("x\n", None), "x");
        assert_eq!(compose_vm_output("", Some("3")), "=> 3");
        assert_eq!(compose_vm_output("a\nb\n", Some("c")), "a\nb\n\n=> c");
        assert_eq!(compose_vm_output("  \n", None), "");
    }
}
