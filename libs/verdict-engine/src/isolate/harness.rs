//! Program text for one isolated run.
//!
//! Layout of the generated script:
//! 1. preamble: capture the posting op and JSON codec, then strip `globalThis`
//!    down to an allow-list of ECMAScript intrinsics
//! 2. the submission, verbatim
//! 3. harness loop over the embedded test cases
//! 4. a single `post` of every case outcome
//!
//! Everything after the preamble runs inside one `try` so a top-level throw
//! in the submission is reported as a harness error instead of escaping.

use crate::error::ExecutionFault;
use serde::Deserialize;
use verdict_common::types::TestCase;

pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Script name reported in V8 stack traces
pub const PROGRAM_NAME: &str = "[verdict:submission]";

/// Globals kept on `globalThis`. Everything else is deleted before user code runs.
const ALLOWED_GLOBALS: &[&str] = &[
    "globalThis", "Object", "Function", "Array", "Number", "Boolean", "String",
    "Symbol", "BigInt", "Date", "RegExp", "Promise", "Proxy", "Reflect", "JSON",
    "Math", "Intl", "Map", "Set", "WeakMap", "WeakSet", "WeakRef",
    "FinalizationRegistry", "Error", "AggregateError", "EvalError", "RangeError",
    "ReferenceError", "SyntaxError", "TypeError", "URIError", "ArrayBuffer",
    "DataView", "Int8Array", "Uint8Array", "Uint8ClampedArray", "Int16Array",
    "Uint16Array", "Int32Array", "Uint32Array", "Float32Array", "Float64Array",
    "BigInt64Array", "BigUint64Array", "parseInt", "parseFloat", "isNaN",
    "isFinite", "encodeURI", "encodeURIComponent", "decodeURI",
    "decodeURIComponent", "escape", "unescape", "eval", "NaN", "Infinity",
    "undefined", "console",
];

/// Handles that must never be reachable even if a host re-adds them
const DENIED_GLOBALS: &[&str] = &[
    "fetch", "XMLHttpRequest", "importScripts", "WebSocket", "EventSource",
];

/// Whether `name` can be referenced as a bare JavaScript identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Guardrails shared by both executors. `valid_name` applies the target
/// language's identifier rules. Violations are harness-level failures.
pub fn check_request(
    source_code: &str,
    function_name: &str,
    test_cases: &[TestCase],
    valid_name: fn(&str) -> bool,
) -> Result<(), ExecutionFault> {
    if source_code.len() > MAX_SOURCE_CODE_BYTES {
        return Err(ExecutionFault::harness(format!(
            "Source code exceeds maximum size of {} bytes",
            MAX_SOURCE_CODE_BYTES
        )));
    }
    let input_bytes: usize = test_cases.iter().map(|tc| tc.input.len() + tc.expected.len()).sum();
    if input_bytes > MAX_TEST_INPUT_BYTES {
        return Err(ExecutionFault::harness(format!(
            "Test input exceeds maximum size of {} bytes",
            MAX_TEST_INPUT_BYTES
        )));
    }
    if !valid_name(function_name) {
        return Err(ExecutionFault::harness(format!(
            "Invalid function name: {:?}",
            function_name
        )));
    }
    Ok(())
}

/// Self-contained program handed to the isolate thread.
///
/// Owned by the unit for exactly one run; dropping it releases the text.
#[derive(Debug)]
pub struct HarnessProgram {
    source: String,
}

impl HarnessProgram {
    pub fn build(
        source_code: &str,
        function_name: &str,
        test_cases: &[TestCase],
    ) -> Result<Self, ExecutionFault> {
        check_request(source_code, function_name, test_cases, is_identifier)?;

        let cases: Vec<serde_json::Value> = test_cases
            .iter()
            .map(|tc| serde_json::json!({ "input": tc.input, "expected": tc.expected }))
            .collect();
        let cases_json = serde_json::to_string(&cases)
            .map_err(|e| ExecutionFault::harness(format!("Failed to encode test cases: {}", e)))?;
        let allowed_json = serde_json::to_string(ALLOWED_GLOBALS)
            .map_err(|e| ExecutionFault::harness(format!("Failed to encode allow-list: {}", e)))?;
        let denied_json = serde_json::to_string(DENIED_GLOBALS)
            .map_err(|e| ExecutionFault::harness(format!("Failed to encode deny-list: {}", e)))?;

        let source = format!(
            r#"
const __verdictPost = ((rawPost) => {{
    let posted = false;
    return (message) => {{
        if (posted) return;
        posted = true;
        rawPost(message);
    }};
}})(Deno.core.ops.op_harness_post);
const __verdictParse = JSON.parse;
const __verdictStringify = JSON.stringify;
const __verdictEncode = (value) => value === undefined ? "undefined" : __verdictStringify(value);

((allowed, denied) => {{
    const keep = new Set(allowed);
    for (const name of Object.getOwnPropertyNames(globalThis)) {{
        if (!keep.has(name)) {{
            try {{ delete globalThis[name]; }} catch (_) {{}}
        }}
    }}
    for (const name of denied) {{
        try {{
            Object.defineProperty(globalThis, name, {{ value: undefined, writable: false, configurable: false }});
        }} catch (_) {{}}
    }}
    const noop = () => {{}};
    try {{
        Object.defineProperty(globalThis, "console", {{
            value: Object.freeze({{ log: noop, info: noop, warn: noop, error: noop, debug: noop, trace: noop }}),
            writable: false,
            configurable: false,
        }});
    }} catch (_) {{}}
}})({allowed_json}, {denied_json});

try {{
{source_code}

    const __verdictCases = {cases_json};
    const __verdictResults = [];
    for (const __tc of __verdictCases) {{
        try {{
            const __args = __verdictParse("[" + __tc.input + "]");
            const __expected = __verdictParse(__tc.expected);
            const __actual = {function_name}(...__args);
            __verdictResults.push({{
                actual: __verdictEncode(__actual),
                expected: __verdictEncode(__expected),
            }});
        }} catch (__err) {{
            __verdictResults.push({{ error: String((__err && __err.message) || __err) }});
        }}
    }}
    __verdictPost(__verdictStringify({{ success: true, results: __verdictResults }}));
}} catch (__err) {{
    __verdictPost(__verdictStringify({{ success: false, error: String((__err && __err.message) || __err) }}));
}}
"#
        );

        Ok(Self { source })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn into_source(self) -> String {
        self.source
    }
}

/// One harness-loop entry as posted by the isolate
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PostedCase {
    #[serde(default)]
    pub actual: Option<String>,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Message posted through the isolation boundary at the end of a run
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PostedMessage {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<PostedCase>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PostedMessage {
    pub fn parse(payload: &str) -> Result<Self, ExecutionFault> {
        serde_json::from_str(payload)
            .map_err(|e| ExecutionFault::boundary(format!("Malformed harness message: {}", e)))
    }
}
