//! CSS selector parsing.
//!
//! Supports the subset tracking catalogs use in practice:
//!
//! - type (`input`), universal (`*`), id (`#submit`), class (`.elqField`)
//! - attributes: `[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`, `[a$=v]`, `[a~=v]`, `[a|=v]`
//! - descendant (` `) and child (`>`) combinators
//! - comma-separated selector lists
//!
//! Pseudo-classes and sibling combinators are rejected with
//! [`SelectorError::Unsupported`] rather than silently ignored.

use crate::SelectorError;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    Contains { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
}

impl AttrCondition {
    pub(crate) fn key(&self) -> &str {
        match self {
            AttrCondition::Exists { key }
            | AttrCondition::Eq { key, .. }
            | AttrCondition::Contains { key, .. }
            | AttrCondition::StartsWith { key, .. }
            | AttrCondition::EndsWith { key, .. }
            | AttrCondition::Includes { key, .. }
            | AttrCondition::DashMatch { key, .. } => key,
        }
    }

    pub(crate) fn holds(&self, attr: Option<&str>) -> bool {
        let Some(attr) = attr else {
            return false;
        };
        match self {
            AttrCondition::Exists { .. } => true,
            AttrCondition::Eq { value, .. } => attr == value,
            AttrCondition::Contains { value, .. } => !value.is_empty() && attr.contains(value.as_str()),
            AttrCondition::StartsWith { value, .. } => !value.is_empty() && attr.starts_with(value.as_str()),
            AttrCondition::EndsWith { value, .. } => !value.is_empty() && attr.ends_with(value.as_str()),
            AttrCondition::Includes { value, .. } => attr.split_whitespace().any(|token| token == value),
            AttrCondition::DashMatch { value, .. } => {
                attr == value || attr.strip_prefix(value.as_str()).is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

/// One compound selector such as `input.elqField[required]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    /// Lowercased tag name; `None` for `*` or when omitted.
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Part {
    pub compound: Compound,
    /// Relation to the part on the left; `None` for the leftmost part.
    pub combinator: Option<Combinator>,
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    pub(crate) groups: Vec<Vec<Part>>,
}

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        if selector.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut groups = Vec::new();
        for (offset, group) in split_groups(selector)? {
            groups.push(parse_complex(selector, group, offset)?);
        }

        Ok(SelectorList { source: selector.to_string(), groups })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of comma-separated alternatives.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelectorList::parse(s)
    }
}

fn malformed(selector: &str, position: usize) -> SelectorError {
    SelectorError::Malformed { selector: selector.to_string(), position }
}

fn unsupported(selector: &str, feature: &'static str) -> SelectorError {
    SelectorError::Unsupported { selector: selector.to_string(), feature }
}

/// Split on top-level commas, keeping the byte offset of each group.
fn split_groups(selector: &str) -> Result<Vec<(usize, &str)>, SelectorError> {
    let bytes = selector.as_bytes();
    let mut groups = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'[') => depth += 1,
            (None, b']') => depth = depth.saturating_sub(1),
            (None, b',') if depth == 0 => {
                groups.push((start, &selector[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push((start, &selector[start..]));

    for (offset, group) in &groups {
        if group.trim().is_empty() {
            return Err(malformed(selector, *offset));
        }
    }
    Ok(groups)
}

fn parse_complex(selector: &str, group: &str, offset: usize) -> Result<Vec<Part>, SelectorError> {
    let bytes = group.as_bytes();
    let mut parts: Vec<Part> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_whitespace() => {
                if !parts.is_empty() && pending.is_none() {
                    pending = Some(Combinator::Descendant);
                }
                i += 1;
            }
            b'>' => {
                if parts.is_empty() || pending == Some(Combinator::Child) {
                    return Err(malformed(selector, offset + i));
                }
                pending = Some(Combinator::Child);
                i += 1;
            }
            b'+' | b'~' => return Err(unsupported(selector, "sibling combinators")),
            _ => {
                let (compound, end) = parse_compound(selector, bytes, i, offset)?;
                let combinator = if parts.is_empty() { None } else { pending.take() };
                parts.push(Part { compound, combinator });
                i = end;
            }
        }
    }

    if pending == Some(Combinator::Child) {
        return Err(malformed(selector, offset + bytes.len()));
    }
    Ok(parts)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

fn scan_ident(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    end
}

fn ident_at<'a>(
    selector: &str,
    bytes: &'a [u8],
    start: usize,
    offset: usize,
) -> Result<(&'a str, usize), SelectorError> {
    let end = scan_ident(bytes, start);
    if end == start {
        return Err(malformed(selector, offset + start));
    }
    // Boundaries sit on ASCII bytes, so the slice is valid UTF-8.
    let ident = std::str::from_utf8(&bytes[start..end]).map_err(|_| malformed(selector, offset + start))?;
    Ok((ident, end))
}

fn parse_compound(
    selector: &str,
    bytes: &[u8],
    start: usize,
    offset: usize,
) -> Result<(Compound, usize), SelectorError> {
    let mut compound = Compound::default();
    let mut i = start;
    let mut seen_any = false;

    if bytes[i] == b'*' {
        i += 1;
        seen_any = true;
    } else if is_ident_byte(bytes[i]) {
        let (tag, end) = ident_at(selector, bytes, i, offset)?;
        compound.tag = Some(tag.to_ascii_lowercase());
        i = end;
        seen_any = true;
    }

    loop {
        match bytes.get(i) {
            Some(b'#') => {
                let (id, end) = ident_at(selector, bytes, i + 1, offset)?;
                compound.id = Some(id.to_string());
                i = end;
            }
            Some(b'.') => {
                let (class, end) = ident_at(selector, bytes, i + 1, offset)?;
                compound.classes.push(class.to_string());
                i = end;
            }
            Some(b'[') => {
                let end = closing_bracket(bytes, i).ok_or_else(|| malformed(selector, offset + i))?;
                let text = std::str::from_utf8(&bytes[i..=end]).map_err(|_| malformed(selector, offset + i))?;
                compound.attrs.push(parse_attr(text).ok_or_else(|| malformed(selector, offset + i))?);
                i = end + 1;
            }
            Some(b':') => return Err(unsupported(selector, "pseudo-classes")),
            _ => break,
        }
        seen_any = true;
    }

    if !seen_any {
        return Err(malformed(selector, offset + i));
    }
    Ok((compound, i))
}

/// Index of the `]` closing the attribute block opened at `open`.
fn closing_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(open + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b']' => return Some(i),
            None => {}
        }
    }
    None
}

fn parse_attr(text: &str) -> Option<AttrCondition> {
    let re = regex!(r#"^\[\s*([A-Za-z_][-\w]*)\s*(?:([~|^$*]?=)\s*(?:"([^"]*)"|'([^']*)'|([^\s"'\]]+))\s*)?\]$"#);
    let caps = re.captures(text)?;
    let key = caps.get(1)?.as_str().to_ascii_lowercase();
    let Some(op) = caps.get(2) else {
        return Some(AttrCondition::Exists { key });
    };
    let value = caps.get(3).or_else(|| caps.get(4)).or_else(|| caps.get(5))?.as_str().to_string();

    Some(match op.as_str() {
        "=" => AttrCondition::Eq { key, value },
        "*=" => AttrCondition::Contains { key, value },
        "^=" => AttrCondition::StartsWith { key, value },
        "$=" => AttrCondition::EndsWith { key, value },
        "~=" => AttrCondition::Includes { key, value },
        "|=" => AttrCondition::DashMatch { key, value },
        _ => return None,
    })
}
