//! Compound CSS selector subset understood by [`MemoryTree`]:
//! `tag`, `#id`, `.class`, `[attr]`, `[attr="value"]`, combinations of those
//! (`input[type="email"]`), and comma-separated alternatives.
//!
//! [`MemoryTree`]: super::MemoryTree

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> EngineResult<Self> {
        let alternatives = split_alternatives(input)
            .into_iter()
            .map(|part| parse_compound(part.trim(), input))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        self.alternatives.iter().any(|c| c.matches(tag, attributes))
    }
}

impl Compound {
    fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        if let Some(expected) = &self.tag {
            if expected != "*" && !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = attributes.get("class").map(String::as_str).unwrap_or("");
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|(name, value)| match value {
            None => attributes.contains_key(name),
            Some(v) => attributes.get(name) == Some(v),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Split on top-level commas; commas inside brackets or quotes belong to
/// the attribute value.
fn split_alternatives(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' if depth > 0 => quote = Some(c),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Parse `name`, `name=value` or `name="quoted"` starting just after `[`.
/// Returns the name, the value and the index after the closing `]`.
fn parse_attribute(chars: &[char], mut i: usize) -> Option<(String, Option<String>, usize)> {
    let mut name = String::new();
    while i < chars.len() && chars[i] != '=' && chars[i] != ']' {
        name.push(chars[i]);
        i += 1;
    }
    let name = name.trim().to_string();
    match chars.get(i)? {
        ']' => return Some((name, None, i + 1)),
        _ => i += 1,
    }
    while chars.get(i)?.is_whitespace() {
        i += 1;
    }

    let mut value = String::new();
    let quote = chars[i];
    if quote == '"' || quote == '\'' {
        i += 1;
        loop {
            match *chars.get(i)? {
                '\\' => {
                    value.push(*chars.get(i + 1)?);
                    i += 2;
                }
                c if c == quote => {
                    i += 1;
                    break;
                }
                c => {
                    value.push(c);
                    i += 1;
                }
            }
        }
        while chars.get(i)?.is_whitespace() {
            i += 1;
        }
    } else {
        while chars[i] != ']' {
            value.push(chars[i]);
            i += 1;
            chars.get(i)?;
        }
        value = value.trim().to_string();
    }

    (*chars.get(i)? == ']').then(|| (name, Some(value), i + 1))
}

fn parse_compound(part: &str, whole: &str) -> EngineResult<Compound> {
    let unsupported = || EngineError::Adapter(format!("Unsupported selector: {whole}"));
    if part.is_empty() {
        return Err(unsupported());
    }

    let chars: Vec<char> = part.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && is_ident_char(chars[*i]) {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    if chars[0] == '*' {
        compound.tag = Some("*".into());
        i = 1;
    } else if is_ident_char(chars[0]) {
        compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err(unsupported());
                }
                compound.id = Some(ident);
            }
            '.' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err(unsupported());
                }
                compound.classes.push(ident);
            }
            '[' => {
                let (name, value, next) = parse_attribute(&chars, i + 1).ok_or_else(unsupported)?;
                if name.is_empty() {
                    return Err(unsupported());
                }
                compound.attrs.push((name, value));
                i = next;
            }
            _ => return Err(unsupported()),
        }
    }

    Ok(compound)
}
