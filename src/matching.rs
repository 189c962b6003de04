use std::collections::HashMap;

use crate::engine::Anchor;
use crate::pattern::Pattern;
use crate::template;
use crate::translate::{OffsetTranslator, locate_char};
use crate::{Encoding, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Match<'t> {
    pattern: Pattern,
    text: &'t str,
    pos: usize,
    endpos: usize,
    spans: Vec<Option<Span>>,
    byte_spans: Vec<Option<Span>>,
}

impl<'t> Match<'t> {
    pub fn as_str(&self) -> &'t str {
        self.byte_spans
            .first()
            .copied()
            .flatten()
            .map(|span| &self.text[span.start..span.end])
            .unwrap_or("")
    }

    pub fn group(&self, group: usize) -> Result<Option<&'t str>> {
        let span = self.byte_span(group)?;
        Ok(span.map(|span| &self.text[span.start..span.end]))
    }

    pub fn named_group(&self, name: &str) -> Result<Option<&'t str>> {
        let index = self
            .pattern
            .group_index()
            .get(name)
            .copied()
            .ok_or_else(|| Error::BadGroup(format!("bad group name {name:?}")))?;
        self.group(index)
    }

    pub fn groups(&self) -> Vec<Option<&'t str>> {
        (1..=self.pattern.group_count())
            .map(|group| {
                self.byte_spans
                    .get(group)
                    .copied()
                    .flatten()
                    .map(|span| &self.text[span.start..span.end])
            })
            .collect()
    }

    pub fn group_dict<'m>(&'m self) -> HashMap<&'m str, Option<&'t str>> {
        self.pattern
            .group_index()
            .iter()
            .map(|(name, &index)| {
                let text = self
                    .byte_spans
                    .get(index)
                    .copied()
                    .flatten()
                    .map(|span| &self.text[span.start..span.end]);
                (name.as_str(), text)
            })
            .collect()
    }

    pub fn span(&self, group: usize) -> Result<Option<Span>> {
        if group > self.pattern.group_count() {
            return Err(Error::BadGroup(format!("bad group index {group}")));
        }
        Ok(self.spans.get(group).copied().flatten())
    }

    pub fn start(&self, group: usize) -> Result<Option<usize>> {
        Ok(self.span(group)?.map(|span| span.start))
    }

    pub fn end(&self, group: usize) -> Result<Option<usize>> {
        Ok(self.span(group)?.map(|span| span.end))
    }

    pub fn last_index(&self) -> Option<usize> {
        // The first group reaching the greatest end offset wins: that is the
        // outermost of nested groups sharing it.
        let mut best: Option<(usize, usize)> = None;
        for group in 1..=self.pattern.group_count() {
            let Some(span) = self.spans.get(group).copied().flatten() else {
                continue;
            };
            if best.is_none_or(|(_, end)| span.end > end) {
                best = Some((group, span.end));
            }
        }
        best.map(|(group, _)| group)
    }

    pub fn last_group(&self) -> Option<&str> {
        let target = self.last_index()?;
        self.pattern
            .group_index()
            .iter()
            .find(|&(_, &index)| index == target)
            .map(|(name, _)| name.as_str())
    }

    pub fn expand(&self, template: &str) -> Result<String> {
        template::expand(template, self)
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn endpos(&self) -> usize {
        self.endpos
    }

    pub fn text(&self) -> &'t str {
        self.text
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn byte_span(&self, group: usize) -> Result<Option<Span>> {
        if group > self.pattern.group_count() {
            return Err(Error::BadGroup(format!("bad group index {group}")));
        }
        Ok(self.byte_spans.get(group).copied().flatten())
    }

    pub(crate) fn whole_byte_span(&self) -> Span {
        self.byte_spans
            .first()
            .copied()
            .flatten()
            .unwrap_or(Span { start: 0, end: 0 })
    }
}

#[derive(Debug)]
pub struct Matches<'t> {
    pattern: Pattern,
    text: &'t str,
    anchor: Anchor,
    cursor: usize,
    byte_endpos: usize,
    endpos: usize,
    translator: OffsetTranslator,
    done: bool,
}

impl<'t> Matches<'t> {
    pub(crate) fn new(pattern: Pattern, anchor: Anchor, text: &'t str) -> Self {
        let endpos = match pattern.options().encoding {
            Encoding::Utf8 => text.chars().count(),
            Encoding::Bytes => text.len(),
        };
        Self {
            pattern,
            text,
            anchor,
            cursor: 0,
            byte_endpos: text.len(),
            endpos,
            translator: OffsetTranslator::new(),
            done: false,
        }
    }

    pub(crate) fn new_at(
        pattern: Pattern,
        anchor: Anchor,
        text: &'t str,
        pos: usize,
        endpos: usize,
    ) -> Result<Self> {
        let (cursor, byte_endpos, endpos) = match pattern.options().encoding {
            Encoding::Utf8 => {
                let (pos_byte, _) = locate_char(text, pos);
                let (end_byte, end_char) = locate_char(text, endpos);
                (pos_byte, end_byte, end_char)
            }
            Encoding::Bytes => {
                let pos = pos.min(text.len());
                let endpos = endpos.min(text.len());
                for offset in [pos, endpos] {
                    if !text.is_char_boundary(offset) {
                        return Err(Error::Encoding(format!(
                            "byte offset {offset} does not fall on a character boundary"
                        )));
                    }
                }
                (pos, endpos, endpos)
            }
        };
        Ok(Self {
            done: cursor > byte_endpos,
            pattern,
            text,
            anchor,
            cursor,
            byte_endpos,
            endpos,
            translator: OffsetTranslator::new(),
        })
    }

    pub fn next_match(&mut self) -> Result<Option<Match<'t>>> {
        if self.done {
            return Ok(None);
        }
        let spans = match self
            .pattern
            .engine()
            .spans(self.anchor, self.text, self.cursor, self.byte_endpos)
        {
            Ok(spans) => spans,
            Err(err) => {
                self.done = true;
                return Err(err);
            }
        };
        let Some(byte_spans) = spans else {
            self.done = true;
            return Ok(None);
        };
        let Some(whole) = byte_spans.first().copied().flatten() else {
            self.done = true;
            return Ok(None);
        };

        let (pos, spans) = match self.pattern.options().encoding {
            Encoding::Utf8 => {
                match self.translator.translate(self.text, self.cursor, &byte_spans) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        self.done = true;
                        return Err(err);
                    }
                }
            }
            Encoding::Bytes => (self.cursor, byte_spans.clone()),
        };
        let found = Match {
            pattern: self.pattern.clone(),
            text: self.text,
            pos,
            endpos: self.endpos,
            spans,
            byte_spans,
        };

        if self.cursor == self.byte_endpos {
            self.done = true;
        } else if whole.end == self.cursor {
            // The engine matched the empty string at the cursor and would
            // stall, so step over one character.
            self.cursor += self.text[self.cursor..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        } else {
            self.cursor = whole.end;
        }
        Ok(Some(found))
    }
}

impl<'t> Iterator for Matches<'t> {
    type Item = Result<Match<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_match().transpose()
    }
}
