//! On-demand execution of runnable code snippets
//!
//! Snippets run in a separate `node` process that evaluates the source in an
//! isolated `vm` context, so a crashing or hostile-looking snippet can never
//! take the host down with it, and no interception of the host's output
//! channel is involved on any exit path. Printed values are captured as
//! output lines; runtime failures come back as an inline error next to
//! whatever output was produced before the failure.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Wall-clock guard for a single snippet evaluation
const RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed harness evaluated by `node -e`.
///
/// Reads the snippet from stdin, evaluates it in a fresh `vm` context with a
/// capturing console, prints a `"=> "`-prefixed line for a non-undefined
/// completion value, and reports thrown errors on stderr.
const HARNESS: &str = r#"
const vm = require("vm");
const util = require("util");
let source = "";
process.stdin.setEncoding("utf8");
process.stdin.on("data", (chunk) => { source += chunk; });
process.stdin.on("end", () => {
  const render = (args) => args.map((value) => {
    if (typeof value === "string") return value;
    try { return util.inspect(value); } catch (_) { return "[unserializable]"; }
  }).join(" ");
  const emit = (...args) => { process.stdout.write(render(args) + "\n"); };
  const sandbox = { console: { log: emit, info: emit, warn: emit, error: emit, debug: emit } };
  try {
    const result = vm.runInNewContext(source, sandbox, { timeout: __TIMEOUT_MS__ });
    if (result !== undefined) {
      process.stdout.write("=> " + render([result]) + "\n");
    }
  } catch (err) {
    process.stderr.write(String(err && err.message ? err.message : err));
    process.exitCode = 1;
  }
});
"#;

/// Prefix marking the snippet's completion value in the captured output
pub const RETURN_VALUE_PREFIX: &str = "=> ";

/// Result of running a snippet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Captured output, one entry per printed line
    pub output: Vec<String>,

    /// Runtime failure, if any. Output captured before the failure is kept.
    pub error: Option<String>,
}

/// Executes JavaScript snippets in an isolated subprocess
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    runtime: Option<PathBuf>,
}

impl SandboxRunner {
    /// Create a runner, locating the JavaScript runtime on PATH
    pub fn new() -> Self {
        let runtime = which::which("node").ok();
        if runtime.is_none() {
            debug!("No JavaScript runtime on PATH; snippets will report an inline error");
        }
        Self { runtime }
    }

    /// Whether a fence language tag belongs to the runnable tag family.
    ///
    /// Only these tags expose a run affordance; everything else is
    /// display-only.
    pub fn handles(language: &str) -> bool {
        matches!(language, "js" | "javascript" | "mjs" | "node")
    }

    /// Whether a runtime was found at construction time
    pub fn is_available(&self) -> bool {
        self.runtime.is_some()
    }

    /// Run a snippet to completion, capturing output and any runtime failure.
    ///
    /// Never panics and never propagates the snippet's failure to the
    /// caller; every outcome is folded into the returned [`RunOutcome`].
    pub fn run(&self, snippet: &str) -> RunOutcome {
        let Some(runtime) = &self.runtime else {
            return RunOutcome {
                output: Vec::new(),
                error: Some("JavaScript runtime not found; install node to run snippets".into()),
            };
        };

        let harness = HARNESS.replace("__TIMEOUT_MS__", &RUN_TIMEOUT.as_millis().to_string());

        let mut child = match Command::new(runtime)
            .arg("-e")
            .arg(harness)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn snippet runtime: {}", e);
                return RunOutcome {
                    output: Vec::new(),
                    error: Some(format!("failed to start runtime: {e}")),
                };
            }
        };

        if let Some(stdin) = child.stdin.take() {
            let mut stdin = stdin;
            if let Err(e) = stdin.write_all(snippet.as_bytes()) {
                warn!("Failed to hand snippet to runtime: {}", e);
            }
            // Dropping stdin closes it so the harness sees end-of-input
        }

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                return RunOutcome {
                    output: Vec::new(),
                    error: Some(format!("runtime did not finish: {e}")),
                };
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        // Every printed line ends in a newline, so splitting leaves one
        // trailing empty segment; only that artifact is discarded. Printed
        // empty lines are real output and stay.
        let mut lines: Vec<String> = stdout.split('\n').map(str::to_string).collect();
        if lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let error = if output.status.success() && stderr.trim().is_empty() {
            None
        } else if stderr.trim().is_empty() {
            Some("snippet exited abnormally".to_string())
        } else {
            Some(stderr.trim().to_string())
        };

        debug!(
            lines = lines.len(),
            failed = error.is_some(),
            "Snippet run finished"
        );

        RunOutcome {
            output: lines,
            error,
        }
    }
}

impl Default for SandboxRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> Option<SandboxRunner> {
        let runner = SandboxRunner::new();
        runner.is_available().then_some(runner)
    }

    #[test]
    fn test_handles_only_javascript_tags() {
        assert!(SandboxRunner::handles("js"));
        assert!(SandboxRunner::handles("javascript"));
        assert!(SandboxRunner::handles("node"));
        assert!(!SandboxRunner::handles("python"));
        assert!(!SandboxRunner::handles("rust"));
        assert!(!SandboxRunner::handles("plaintext"));
        assert!(!SandboxRunner::handles(""));
    }

    #[test]
    fn test_missing_runtime_reports_inline_error() {
        let runner = SandboxRunner { runtime: None };
        let outcome = runner.run("console.log(1)");
        assert!(outcome.output.is_empty());
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_captures_printed_lines() {
        let Some(runner) = runner() else { return };
        let outcome = runner.run("console.log('one'); console.log('two');");
        assert_eq!(outcome.output, vec!["one", "two"]);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_empty_printed_line_is_captured() {
        let Some(runner) = runner() else { return };
        let outcome = runner.run("console.log('a'); console.log(''); console.log('b');");
        assert_eq!(outcome.output, vec!["a", "", "b"]);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_structured_values_serialized() {
        let Some(runner) = runner() else { return };
        let outcome = runner.run("console.log({ a: 1 })");
        assert_eq!(outcome.output.len(), 1);
        assert!(outcome.output[0].contains("a: 1"));
    }

    #[test]
    fn test_completion_value_marked() {
        let Some(runner) = runner() else { return };
        let outcome = runner.run("1 + 2");
        assert_eq!(outcome.output, vec!["=> 3"]);
    }

    #[test]
    fn test_undefined_completion_not_marked() {
        let Some(runner) = runner() else { return };
        let outcome = runner.run("let x = 1;");
        assert!(outcome.output.is_empty());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_error_preserves_prior_output() {
        let Some(runner) = runner() else { return };
        let outcome = runner.run("console.log('before'); throw new Error('boom');");
        assert_eq!(outcome.output, vec!["before"]);
        let error = outcome.error.unwrap_or_default();
        assert!(error.contains("boom"));
    }

    #[test]
    fn test_no_leak_between_runs() {
        // A failing run must not contaminate a later unrelated one
        let Some(runner) = runner() else { return };
        let _ = runner.run("console.log('leaked?'); throw new Error('x');");
        let outcome = runner.run("console.log('clean')");
        assert_eq!(outcome.output, vec!["clean"]);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_no_host_state_reachable() {
        let Some(runner) = runner() else { return };
        // `process` is not exposed to the evaluation context
        let outcome = runner.run("process.exit(0)");
        assert!(outcome.error.is_some());
    }
}
