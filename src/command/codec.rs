//! Wrapping scripts in the host's invocation syntax.
//!
//! The host evaluates `function("<script>")`, so the script travels as a
//! double-quoted string literal. Escaping rule, per character:
//!
//! | char | escaped |
//! |------|---------|
//! | `\`  | `\\`    |
//! | `"`  | `\"`    |
//! | LF   | `\n`    |
//! | CR   | `\r`    |
//! | TAB  | `\t`    |
//!
//! Everything else passes through unchanged.

use crate::error::CodecError;

pub fn escape(script: &str) -> String {
    let mut out = String::with_capacity(script.len() + script.len() / 8);
    for c in script.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

pub fn unescape(text: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(CodecError::UnknownEscape(other)),
            None => return Err(CodecError::DanglingEscape),
        }
    }
    Ok(out)
}

/// Encodes scripts as `function("...")` payloads and decodes them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationCodec {
    function: String,
}

impl InvocationCodec {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn wrap(&self, script: &str) -> String {
        format!("{}(\"{}\")", self.function, escape(script))
    }

    /// Recover the original script from a wrapped payload.
    pub fn unwrap(&self, payload: &str) -> Result<String, CodecError> {
        let body = payload
            .trim()
            .strip_prefix(self.function.as_str())
            .and_then(|rest| rest.strip_prefix("(\""))
            .and_then(|rest| rest.strip_suffix("\")"))
            .ok_or_else(|| CodecError::MissingWrapper {
                function: self.function.clone(),
            })?;
        unescape(body)
    }
}
