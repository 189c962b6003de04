use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::cache::LruCache;
use crate::matching::Match;
use crate::{Error, Result};

const MEMO_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(GroupRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupRef {
    Index(usize),
    Name(String),
}

pub(crate) fn expand(template: &str, found: &Match<'_>) -> Result<String> {
    let segments = segments(template);
    let mut out = String::new();
    for segment in segments.iter() {
        match segment {
            Segment::Literal(raw) => out.push_str(&unescape(raw)),
            Segment::Group(group) => {
                let text = match group {
                    GroupRef::Index(index) => found.group(*index),
                    GroupRef::Name(name) => found.named_group(name),
                }
                .map_err(|_| undefined(group))?;
                if let Some(text) = text {
                    out.push_str(text);
                }
            }
        }
    }
    Ok(out)
}

fn undefined(group: &GroupRef) -> Error {
    match group {
        GroupRef::Index(index) => {
            Error::UndefinedGroup(format!("template references undefined group {index}"))
        }
        GroupRef::Name(name) => {
            Error::UndefinedGroup(format!("template references undefined group {name:?}"))
        }
    }
}

fn segments(template: &str) -> Arc<[Segment]> {
    static MEMO: OnceLock<Mutex<LruCache<String, Arc<[Segment]>>>> = OnceLock::new();
    let memo = MEMO.get_or_init(|| Mutex::new(LruCache::new(MEMO_CAPACITY)));
    let mut memo = memo.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(hit) = memo.get(template) {
        return hit;
    }
    let segments: Arc<[Segment]> = tokenize(template).into();
    memo.insert(template.to_string(), segments.clone());
    segments
}

fn tokenize(template: &str) -> Vec<Segment> {
    let chars: Vec<char> = template.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }
        // Three octal digits outrank group references. Taking only the
        // backslash and the first digit keeps the remaining digits in the
        // same literal run, so the unescaper sees the whole \ooo sequence.
        if i + 3 < chars.len()
            && is_octal(chars[i + 1])
            && is_octal(chars[i + 2])
            && is_octal(chars[i + 3])
        {
            literal.push('\\');
            literal.push(chars[i + 1]);
            i += 2;
            continue;
        }
        // \1 through \99
        if i + 1 < chars.len() && ('1'..='9').contains(&chars[i + 1]) {
            let mut index = chars[i + 1] as usize - '0' as usize;
            let mut consumed = 2;
            if i + 2 < chars.len() && chars[i + 2].is_ascii_digit() {
                index = index * 10 + (chars[i + 2] as usize - '0' as usize);
                consumed = 3;
            }
            flush(&mut segments, &mut literal);
            segments.push(Segment::Group(GroupRef::Index(index)));
            i += consumed;
            continue;
        }
        // \g<name-or-number>
        if i + 2 < chars.len() && chars[i + 1] == 'g' && chars[i + 2] == '<' {
            let mut j = i + 3;
            while j < chars.len() && is_word(chars[j]) {
                j += 1;
            }
            if j > i + 3 && j < chars.len() && chars[j] == '>' {
                let content: String = chars[i + 3..j].iter().collect();
                let group = match content.parse::<usize>() {
                    Ok(index) => GroupRef::Index(index),
                    Err(_) => GroupRef::Name(content),
                };
                flush(&mut segments, &mut literal);
                segments.push(Segment::Group(group));
                i = j + 1;
                continue;
            }
        }
        // Any other escape: two characters into the literal run, so a later
        // reference is still found.
        literal.push('\\');
        if i + 1 < chars.len() {
            literal.push(chars[i + 1]);
            i += 2;
        } else {
            i += 1;
        }
    }
    flush(&mut segments, &mut literal);
    segments
}

fn flush(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn is_octal(ch: char) -> bool {
    ('0'..='7').contains(&ch)
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn unescape(literal: &str) -> String {
    let chars: Vec<char> = literal.chars().collect();
    let mut out = String::with_capacity(literal.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars[i + 1] {
            'n' => push_escaped(&mut out, '\n', &mut i),
            't' => push_escaped(&mut out, '\t', &mut i),
            'r' => push_escaped(&mut out, '\r', &mut i),
            'v' => push_escaped(&mut out, '\u{b}', &mut i),
            'f' => push_escaped(&mut out, '\u{c}', &mut i),
            'a' => push_escaped(&mut out, '\u{7}', &mut i),
            'b' => push_escaped(&mut out, '\u{8}', &mut i),
            '\\' => push_escaped(&mut out, '\\', &mut i),
            '\'' => push_escaped(&mut out, '\'', &mut i),
            '"' => push_escaped(&mut out, '"', &mut i),
            '0'..='7' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 3 && i + 1 + digits < chars.len() && is_octal(chars[i + 1 + digits]) {
                    value = value * 8 + chars[i + 1 + digits].to_digit(8).unwrap_or(0);
                    digits += 1;
                }
                match char::from_u32(value) {
                    Some(ch) => out.push(ch),
                    None => out.push(char::REPLACEMENT_CHARACTER),
                }
                i += 1 + digits;
            }
            'x' => hex_escape(&mut out, &chars, &mut i, 2),
            'u' => hex_escape(&mut out, &chars, &mut i, 4),
            'U' => hex_escape(&mut out, &chars, &mut i, 8),
            other => {
                // Unrecognized escapes stay verbatim.
                out.push('\\');
                out.push(other);
                i += 2;
            }
        }
    }
    out
}

fn push_escaped(out: &mut String, ch: char, i: &mut usize) {
    out.push(ch);
    *i += 2;
}

fn hex_escape(out: &mut String, chars: &[char], i: &mut usize, width: usize) {
    let start = *i + 2;
    let end = start + width;
    if end <= chars.len() && chars[start..end].iter().all(char::is_ascii_hexdigit) {
        let value = chars[start..end]
            .iter()
            .fold(0u32, |acc, ch| acc * 16 + ch.to_digit(16).unwrap_or(0));
        if let Some(ch) = char::from_u32(value) {
            out.push(ch);
            *i = end;
            return;
        }
    }
    out.push('\\');
    out.push(chars[*i + 1]);
    *i += 2;
}
