use once_cell::sync::Lazy;
use regex::Regex;

/// Shape of a bundleable module name: dotted chain of Lua identifiers.
static MODULE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*$").expect("valid regex"));

/// Extract statically-known `require` references from Lua source.
///
/// Recognizes all the literal-argument call forms Lua allows:
/// `require("a.b")`, `require('a.b')`, `require "a.b"`, `require 'a.b'`
/// and `require [[a.b]]` (including leveled long brackets).
///
/// References inside comments and string literals are not reported, and
/// dynamic requires (non-literal argument) are skipped so the emitted
/// bundle can defer them to the runtime fallback.
pub fn extract_requires(source: &str) -> Vec<String> {
    let bytes = source.as_bytes();
    let mut requires = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                // Comment: long form if `--[=*[`, line form otherwise
                if let Some(end) = long_bracket_end(bytes, i + 2) {
                    i = end;
                } else {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
            }
            b'"' | b'\'' => {
                i = skip_short_string(bytes, i);
            }
            b'[' => {
                // Long string in expression position; its contents are data
                match long_bracket_end(bytes, i) {
                    Some(end) => i = end,
                    None => i += 1,
                }
            }
            c if c == b'_' || c.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && (bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                let word = &source[start..i];
                let is_field_access =
                    start > 0 && (bytes[start - 1] == b'.' || bytes[start - 1] == b':');
                if word == "require" && !is_field_access {
                    if let Some((name, end)) = parse_require_argument(source, bytes, i) {
                        if MODULE_NAME_RE.is_match(&name) {
                            requires.push(name);
                        } else {
                            log::debug!("Skipping non-module require argument: {:?}", name);
                        }
                        i = end;
                    }
                }
            }
            _ => i += 1,
        }
    }

    requires
}

/// Skip a short (quoted) string starting at `i`, honoring backslash escapes.
/// Returns the index just past the closing quote.
fn skip_short_string(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            c if c == quote => return j + 1,
            // Unterminated at end of line; Lua would reject this source
            b'\n' => return j + 1,
            _ => j += 1,
        }
    }
    j
}

/// If `bytes[i..]` opens a long bracket (`[`, zero or more `=`, `[`),
/// return the index just past the matching closing bracket.
fn long_bracket_end(bytes: &[u8], i: usize) -> Option<usize> {
    let (level, content_start) = long_bracket_open(bytes, i)?;
    let closer: Vec<u8> = std::iter::once(b']')
        .chain(std::iter::repeat_n(b'=', level))
        .chain(std::iter::once(b']'))
        .collect();
    let rest = &bytes[content_start..];
    match rest
        .windows(closer.len())
        .position(|window| window == closer.as_slice())
    {
        Some(pos) => Some(content_start + pos + closer.len()),
        // Unterminated long bracket runs to end of input
        None => Some(bytes.len()),
    }
}

/// Parse a long bracket opener at `i`; returns (level, index past opener).
fn long_bracket_open(bytes: &[u8], i: usize) -> Option<(usize, usize)> {
    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    let mut j = i + 1;
    let mut level = 0;
    while bytes.get(j) == Some(&b'=') {
        level += 1;
        j += 1;
    }
    if bytes.get(j) == Some(&b'[') {
        Some((level, j + 1))
    } else {
        None
    }
}

/// Parse the argument of a `require` whose name token ends at `i`.
/// Accepts an optional opening parenthesis before the string literal.
/// Returns the module name and the index to resume scanning from, or
/// `None` when the argument is not a string literal (dynamic require).
fn parse_require_argument(source: &str, bytes: &[u8], i: usize) -> Option<(String, usize)> {
    let mut j = i;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    if bytes.get(j) == Some(&b'(') {
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
    }
    match bytes.get(j)? {
        b'"' | b'\'' => {
            let quote = bytes[j];
            let start = j + 1;
            let mut k = start;
            while k < bytes.len() && bytes[k] != quote {
                // Escapes never appear in module names; treat as dynamic
                if bytes[k] == b'\\' || bytes[k] == b'\n' {
                    return None;
                }
                k += 1;
            }
            if k >= bytes.len() {
                return None;
            }
            Some((source[start..k].to_string(), k + 1))
        }
        b'[' => {
            let (level, content_start) = long_bracket_open(bytes, j)?;
            let end = long_bracket_end(bytes, j)?;
            let closer_len = level + 2;
            if end < closer_len || end - closer_len < content_start {
                return None;
            }
            Some((source[content_start..end - closer_len].to_string(), end))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_forms() {
        let source = r#"
local a = require("foo.bar")
local b = require('baz')
local c = require "qux.quux"
local d = require 'single'
local e = require [[long.form]]
"#;
        assert_eq!(
            extract_requires(source),
            vec!["foo.bar", "baz", "qux.quux", "single", "long.form"]
        );
    }

    #[test]
    fn test_leveled_long_bracket_argument() {
        let source = "local m = require [==[lib.events]==]\n";
        assert_eq!(extract_requires(source), vec!["lib.events"]);
    }

    #[test]
    fn test_requires_in_comments_are_skipped() {
        let source = r#"
-- require("commented.out")
--[[
require("block.commented")
]]
--[==[ require("leveled.comment") ]==]
local real = require("actual.module")
"#;
        assert_eq!(extract_requires(source), vec!["actual.module"]);
    }

    #[test]
    fn test_requires_in_strings_are_skipped() {
        let source = r#"
local doc = "call require('fake.module') to load"
local other = 'require "also.fake"'
local long = [[require("still.fake")]]
local real = require("actual.module")
"#;
        assert_eq!(extract_requires(source), vec!["actual.module"]);
    }

    #[test]
    fn test_dynamic_requires_are_skipped() {
        let source = r#"
local name = "plugin" .. id
local p = require(name)
local q = require("prefix." .. suffix)
"#;
        // `require("prefix." .. suffix)` has a literal first piece, but the
        // name "prefix." is not a valid module reference and is dropped
        assert_eq!(extract_requires(source), Vec::<String>::new());
    }

    #[test]
    fn test_field_access_is_not_a_require() {
        let source = r#"
local r = loader.require("not.this")
local s = loader:require("nor.this")
local t = require("but.this")
"#;
        assert_eq!(extract_requires(source), vec!["but.this"]);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let source = r#"
local s = "she said \"require('nope')\" loudly"
local real = require("yes.module")
"#;
        assert_eq!(extract_requires(source), vec!["yes.module"]);
    }

    #[test]
    fn test_duplicate_requires_reported_in_order() {
        let source = r#"
require("a")
require("b")
require("a")
"#;
        assert_eq!(extract_requires(source), vec!["a", "b", "a"]);
    }
}
