//! Generates the Node.js harness that wraps user source for a sandboxed run.
//!
//! The harness is a minimal standalone script that
//!   1. shadows `console` so `log`/`error`/`warn` serialize their arguments
//!      and emit one `{"type":"console","method":...,"args":[...]}` JSON line
//!      on stdout instead of writing to a real console,
//!   2. installs an uncaught-exception handler that reports through the same
//!      channel, and
//!   3. executes the user source inside `try/catch` so synchronous throws
//!      become error records rather than crashes.

const PRELUDE: &str = r#"const __emit = (method, args) => {
  try {
    process.stdout.write(JSON.stringify({ type: "console", method, args }) + "\n");
  } catch (_e) {
    // Serialization failures must never take down the sandbox.
  }
};
const __stringify = (value) => {
  if (typeof value === "string") return value;
  try {
    const json = JSON.stringify(value);
    return json === undefined ? String(value) : json;
  } catch (_e) {
    return String(value);
  }
};
const console = {
  log: (...args) => __emit("log", args.map(__stringify)),
  error: (...args) => __emit("error", args.map(__stringify)),
  warn: (...args) => __emit("warn", args.map(__stringify)),
};
process.on("uncaughtException", (err) => __emit("error", [String(err)]));
"#;

/// Wrap `source` in the console-bridging harness.
///
/// The source is spliced in textually, exactly as the document holds it.
pub fn build_harness(source: &str) -> String {
    format!("{PRELUDE}try {{\n{source}\n}} catch (err) {{\n  console.error(String(err));\n}}\n")
}
