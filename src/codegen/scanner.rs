//! # Function Scanner
//!
//! Finds GLSL function definitions in specialised library code. Brace and
//! parenthesis matching ignores characters inside string literals and comments,
//! which is what lets it find the closing brace of a body that contains nested
//! control flow or commented-out braces.

use std::collections::{HashMap, HashSet};

const NON_TYPE_WORDS: &[&str] = &[
    "return", "if", "else", "for", "while", "do", "switch", "case", "define", "ifdef", "ifndef",
    "elif", "endif", "undef", "struct", "layout", "precision", "uniform", "const", "in", "out",
    "inout",
];

const PARAM_QUALIFIERS: &[&str] = &["in", "out", "inout", "const", "highp", "mediump", "lowp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    InLineComment,
    InBlockComment,
}

/// One function definition found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub return_type: String,
    pub name: String,
    pub param_types: Vec<String>,
    /// Byte range of the whole definition.
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl FunctionDef {
    /// `returnType_name_paramType*`
    pub fn signature(&self) -> String {
        let mut parts = vec![self.return_type.as_str(), self.name.as_str()];
        parts.extend(self.param_types.iter().map(String::as_str));
        parts.join("_")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedSource {
    /// Top-level code outside every function (constants, structs, defines).
    pub preamble: String,
    pub functions: Vec<FunctionDef>,
}

/// `true` for bytes that are code, `false` inside strings and comments.
fn code_mask(bytes: &[u8]) -> Vec<bool> {
    let mut mask = vec![true; bytes.len()];
    let mut state = ScanState::Normal;
    let mut i = 0;
    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        match state {
            ScanState::Normal => match (bytes[i], next) {
                (b'/', Some(b'/')) => {
                    state = ScanState::InLineComment;
                    mask[i] = false;
                    mask[i + 1] = false;
                    i += 2;
                    continue;
                }
                (b'/', Some(b'*')) => {
                    state = ScanState::InBlockComment;
                    mask[i] = false;
                    mask[i + 1] = false;
                    i += 2;
                    continue;
                }
                (b'"', _) => {
                    state = ScanState::InString;
                    mask[i] = false;
                }
                _ => {}
            },
            ScanState::InString => {
                mask[i] = false;
                if bytes[i] == b'\\' && next.is_some() {
                    mask[i + 1] = false;
                    i += 2;
                    continue;
                }
                if bytes[i] == b'"' {
                    state = ScanState::Normal;
                }
            }
            ScanState::InLineComment => {
                if bytes[i] == b'\n' {
                    state = ScanState::Normal;
                } else {
                    mask[i] = false;
                }
            }
            ScanState::InBlockComment => {
                mask[i] = false;
                if bytes[i] == b'*' && next == Some(b'/') {
                    mask[i + 1] = false;
                    state = ScanState::Normal;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    mask
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    end
}

/// Skip whitespace and comments.
fn skip_trivia(bytes: &[u8], mask: &[bool], mut i: usize) -> usize {
    while i < bytes.len() && (!mask[i] || bytes[i].is_ascii_whitespace()) {
        i += 1;
    }
    i
}

/// Index of the delimiter closing the one at `open`.
fn matching_delimiter(bytes: &[u8], mask: &[bool], open: usize, left: u8, right: u8) -> Option<usize> {
    let mut depth = 0usize;
    for i in open..bytes.len() {
        if !mask[i] {
            continue;
        }
        if bytes[i] == left {
            depth += 1;
        } else if bytes[i] == right {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn parse_param_types(source: &str, mask: &[bool], start: usize, end: usize) -> Vec<String> {
    let code: String = source[start..end]
        .char_indices()
        .map(|(offset, c)| if mask[start + offset] { c } else { ' ' })
        .collect();
    code.split(',')
        .filter_map(|param| {
            let ty = param
                .split_whitespace()
                .find(|token| !PARAM_QUALIFIERS.contains(token))?;
            let ty = ty.split('[').next().unwrap_or(ty);
            (ty != "void" && !ty.is_empty()).then(|| ty.to_string())
        })
        .collect()
}

fn function_at(source: &str, mask: &[bool], start: usize) -> Option<FunctionDef> {
    let bytes = source.as_bytes();
    let type_end = ident_end(bytes, start);
    let return_type = &source[start..type_end];
    if NON_TYPE_WORDS.contains(&return_type) {
        return None;
    }

    let name_start = skip_trivia(bytes, mask, type_end);
    if name_start >= bytes.len() || !is_ident_start(bytes[name_start]) {
        return None;
    }
    let name_end = ident_end(bytes, name_start);
    let name = &source[name_start..name_end];
    if NON_TYPE_WORDS.contains(&name) {
        return None;
    }

    let open_paren = skip_trivia(bytes, mask, name_end);
    if bytes.get(open_paren) != Some(&b'(') {
        return None;
    }
    let close_paren = matching_delimiter(bytes, mask, open_paren, b'(', b')')?;
    let open_brace = skip_trivia(bytes, mask, close_paren + 1);
    if bytes.get(open_brace) != Some(&b'{') {
        // prototype or macro
        return None;
    }
    let close_brace = matching_delimiter(bytes, mask, open_brace, b'{', b'}')?;

    Some(FunctionDef {
        return_type: return_type.to_string(),
        name: name.to_string(),
        param_types: parse_param_types(source, mask, open_paren + 1, close_paren),
        start,
        end: close_brace + 1,
        text: source[start..=close_brace].to_string(),
    })
}

/// Split `source` into top-level function definitions and everything else.
pub fn scan_functions(source: &str) -> ScannedSource {
    let bytes = source.as_bytes();
    let mask = code_mask(bytes);
    let mut functions = Vec::new();
    let mut pieces: Vec<&str> = Vec::new();
    let mut depth = 0usize;
    let mut last_end = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !mask[i] {
            i += 1;
            continue;
        }
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b if depth == 0 && is_ident_start(b) && (i == 0 || !is_ident_char(bytes[i - 1])) => {
                if let Some(def) = function_at(source, &mask, i) {
                    pieces.push(&source[last_end..def.start]);
                    i = def.end;
                    last_end = def.end;
                    functions.push(def);
                } else {
                    i = ident_end(bytes, i);
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push(&source[last_end..]);

    let preamble = pieces
        .iter()
        .map(|piece| piece.trim())
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    ScannedSource { preamble, functions }
}

/// Identifiers appearing in code (not in comments or strings).
pub fn identifiers(source: &str) -> HashSet<&str> {
    let bytes = source.as_bytes();
    let mask = code_mask(bytes);
    let mut found = HashSet::new();
    let mut i = 0;
    while i < bytes.len() {
        if mask[i] && is_ident_start(bytes[i]) && (i == 0 || !is_ident_char(bytes[i - 1])) {
            let end = ident_end(bytes, i);
            found.insert(&source[i..end]);
            i = end;
        } else {
            i += 1;
        }
    }
    found
}

/// Rename whole identifiers in code, leaving comments and strings untouched.
pub fn rename_identifiers(source: &str, renames: &[(String, String)]) -> String {
    if renames.is_empty() {
        return source.to_string();
    }
    let map: HashMap<&str, &str> = renames
        .iter()
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();
    let bytes = source.as_bytes();
    let mask = code_mask(bytes);
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if mask[i] && is_ident_start(bytes[i]) && (i == 0 || !is_ident_char(bytes[i - 1])) {
            let end = ident_end(bytes, i);
            if let Some(to) = map.get(&source[i..end]) {
                out.push_str(&source[copied..i]);
                out.push_str(to);
                copied = end;
            }
            i = end;
        } else {
            i += 1;
        }
    }
    out.push_str(&source[copied..]);
    out
}
