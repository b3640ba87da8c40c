const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break",
    "class", "continue", "def", "del", "elif", "else", "except", "finally",
    "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Whether `name` is a Python identifier that can be called by name.
/// Unicode letters are accepted; keywords are not.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_') && !KEYWORDS.contains(&name)
}

/// Program for one test case: the submission followed by a call of
/// `function_name` with the decoded input as positional arguments.
///
/// The input is embedded as a JSON string literal (also a valid Python
/// literal) and only spliced into `[...]` at runtime.
pub fn case_program(source_code: &str, function_name: &str, input: &str) -> String {
    let input_literal = serde_json::Value::String(input.to_string()).to_string();
    format!(
        "{source_code}\n\n\
         import json as __verdict_json\n\
         __verdict_args__ = __verdict_json.loads(\"[\" + {input_literal} + \"]\")\n\
         __verdict_output__ = __verdict_json.dumps({function_name}(*__verdict_args__))\n"
    )
}
