//! # Code Templates
//!
//! Node code templates are text with `$`-prefixed placeholders. They are parsed
//! once into segments so that every placeholder is a variant of a closed enum and
//! resolution is exhaustive.

use std::fmt;

/// A placeholder recognised inside a node code template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `$input.<port>`
    Input(String),
    /// `$output.<port>`
    Output(String),
    /// `$param.<name>`
    Param(String),
    /// `$time`
    Time,
    /// `$resolution`
    Resolution,
    /// `$position`: 3D sample position.
    Position,
    /// `$uv`: centered, aspect-corrected 2D coordinate.
    Uv,
    /// `$sdf_call` (raymarchers only)
    SdfCall,
    /// `$displacement_at_p` (raymarchers only)
    DisplacementAtP,
    /// Anything else after a `$`.
    Unknown(String),
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Input(port) => write!(f, "$input.{port}"),
            Placeholder::Output(port) => write!(f, "$output.{port}"),
            Placeholder::Param(name) => write!(f, "$param.{name}"),
            Placeholder::Time => f.write_str("$time"),
            Placeholder::Resolution => f.write_str("$resolution"),
            Placeholder::Position => f.write_str("$position"),
            Placeholder::Uv => f.write_str("$uv"),
            Placeholder::SdfCall => f.write_str("$sdf_call"),
            Placeholder::DisplacementAtP => f.write_str("$displacement_at_p"),
            Placeholder::Unknown(raw) => write!(f, "${raw}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut segments = Vec::new();
        let mut text_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'$' {
                i += 1;
                continue;
            }
            let word_start = i + 1;
            let word_end = scan_word(bytes, word_start);
            if word_end == word_start {
                // lone '$' stays text
                i += 1;
                continue;
            }
            let word = &source[word_start..word_end];
            let mut end = word_end;
            let placeholder = match word {
                "input" | "output" | "param" if bytes.get(word_end) == Some(&b'.') => {
                    let name_end = scan_word(bytes, word_end + 1);
                    if name_end == word_end + 1 {
                        Placeholder::Unknown(word.to_string())
                    } else {
                        end = name_end;
                        let name = source[word_end + 1..name_end].to_string();
                        match word {
                            "input" => Placeholder::Input(name),
                            "output" => Placeholder::Output(name),
                            _ => Placeholder::Param(name),
                        }
                    }
                }
                "time" => Placeholder::Time,
                "resolution" => Placeholder::Resolution,
                "position" => Placeholder::Position,
                "uv" => Placeholder::Uv,
                "sdf_call" => Placeholder::SdfCall,
                "displacement_at_p" => Placeholder::DisplacementAtP,
                other => Placeholder::Unknown(other.to_string()),
            };

            if text_start < i {
                segments.push(Segment::Text(source[text_start..i].to_string()));
            }
            segments.push(Segment::Placeholder(placeholder));
            i = end;
            text_start = end;
        }

        if text_start < bytes.len() {
            segments.push(Segment::Text(source[text_start..].to_string()));
        }
        Self { segments }
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(p) => Some(p),
            Segment::Text(_) => None,
        })
    }

    pub fn contains(&self, placeholder: &Placeholder) -> bool {
        self.placeholders().any(|p| p == placeholder)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|segment| match segment {
            Segment::Text(text) => text.trim().is_empty(),
            Segment::Placeholder(_) => false,
        })
    }

    /// Substitute every placeholder with the resolver's text.
    pub fn render(&self, mut resolve: impl FnMut(&Placeholder) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => out.push_str(&resolve(p)),
            }
        }
        out
    }
}

fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}
