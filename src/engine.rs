use std::borrow::Cow;
use std::collections::HashMap;

use crate::matching::Span;
use crate::{Error, Options, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    Unanchored,
    Start,
    Both,
}

#[derive(Debug)]
pub(crate) struct Engine {
    search: fancy_regex::Regex,
    full: fancy_regex::Regex,
}

impl Engine {
    pub(crate) fn new(pattern: &str, options: &Options) -> Result<Self> {
        let source = if options.literal {
            escape(pattern)
        } else {
            Cow::Borrowed(pattern)
        };
        let search = build(&source, options)?;
        let full = build(&format!("(?:{source})\\z"), options)?;
        Ok(Self { search, full })
    }

    // One span per group, index 0 the whole match, `None` for a group that
    // did not participate; outer `None` when the window holds no match.
    pub(crate) fn spans(
        &self,
        anchor: Anchor,
        text: &str,
        start: usize,
        end: usize,
    ) -> Result<Option<Vec<Option<Span>>>> {
        let window = text.get(..end).ok_or_else(|| {
            Error::Encoding(format!(
                "window end {end} does not fall on a character boundary"
            ))
        })?;
        let backend = match anchor {
            Anchor::Both => &self.full,
            _ => &self.search,
        };
        let captures = backend
            .captures_from_pos(window, start)
            .map_err(|err| Error::Engine(err.to_string()))?;
        let Some(captures) = captures else {
            return Ok(None);
        };
        let Some(whole) = captures.get(0) else {
            return Ok(None);
        };
        if anchor != Anchor::Unanchored && whole.start() != start {
            return Ok(None);
        }
        let mut spans = Vec::with_capacity(captures.len());
        for index in 0..captures.len() {
            spans.push(captures.get(index).map(|group| Span {
                start: group.start(),
                end: group.end(),
            }));
        }
        Ok(Some(spans))
    }

    pub(crate) fn group_count(&self) -> usize {
        self.search.capture_names().count().saturating_sub(1)
    }

    pub(crate) fn named_groups(&self) -> HashMap<String, usize> {
        self.search
            .capture_names()
            .enumerate()
            .filter_map(|(index, name)| name.map(|name| (name.to_string(), index)))
            .collect()
    }
}

fn build(source: &str, options: &Options) -> Result<fancy_regex::Regex> {
    let mut builder = fancy_regex::RegexBuilder::new(source);
    builder.case_insensitive(!options.case_sensitive);
    builder.multi_line(options.multi_line);
    builder.dot_matches_new_line(options.dot_nl);
    builder.backtrack_limit(options.backtrack_limit);
    builder.delegate_size_limit(options.max_mem);
    builder
        .build()
        .map_err(|err| Error::Compile(err.to_string()))
}

pub fn escape(value: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(value.len());
    let mut changed = false;

    for ch in value.chars() {
        if is_meta(ch) {
            // A NUL cannot follow a backslash in a pattern.
            if ch == '\0' {
                out.push_str("\\x00");
            } else {
                out.push('\\');
                out.push(ch);
            }
            changed = true;
        } else {
            out.push(ch);
        }
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(value)
    }
}

fn is_meta(ch: char) -> bool {
    ch.is_ascii() && !ch.is_ascii_alphanumeric() && ch != '_'
}
