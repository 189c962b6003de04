use std::collections::{BTreeSet, HashMap};

use crate::matching::Span;
use crate::{Error, Result};

#[derive(Debug)]
pub(crate) struct OffsetTranslator {
    last_byte: usize,
    last_char: usize,
    memo: HashMap<usize, usize>,
}

impl OffsetTranslator {
    pub(crate) fn new() -> Self {
        let mut memo = HashMap::new();
        memo.insert(0, 0);
        Self {
            last_byte: 0,
            last_char: 0,
            memo,
        }
    }

    pub(crate) fn translate(
        &mut self,
        text: &str,
        cursor: usize,
        spans: &[Option<Span>],
    ) -> Result<(usize, Vec<Option<Span>>)> {
        let mut offsets = BTreeSet::new();
        offsets.insert(cursor);
        for span in spans.iter().flatten() {
            offsets.insert(span.start);
            offsets.insert(span.end);
        }

        // Offsets already passed can never recur in a forward iteration, so
        // only the rightmost resolved pair survives between matches.
        self.memo.clear();
        self.memo.insert(self.last_byte, self.last_char);
        for &offset in &offsets {
            if self.memo.contains_key(&offset) {
                continue;
            }
            let chars = if offset >= self.last_byte {
                self.last_char + count_chars(text, self.last_byte, offset)?
            } else {
                // A capture inside a look-ahead can end past the whole-match
                // end, putting the next cursor behind the anchor.
                count_chars(text, 0, offset)?
            };
            self.memo.insert(offset, chars);
            if offset > self.last_byte {
                self.last_byte = offset;
                self.last_char = chars;
            }
        }

        let decoded = spans
            .iter()
            .map(|span| {
                span.map(|span| Span {
                    start: self.memo[&span.start],
                    end: self.memo[&span.end],
                })
            })
            .collect();
        Ok((self.memo[&cursor], decoded))
    }
}

fn count_chars(text: &str, start: usize, end: usize) -> Result<usize> {
    text.get(start..end)
        .map(|slice| slice.chars().count())
        .ok_or_else(|| {
            Error::Encoding(format!(
                "byte range {start}..{end} does not fall on character boundaries"
            ))
        })
}

pub(crate) fn locate_char(text: &str, target: usize) -> (usize, usize) {
    let mut chars = 0;
    for (byte, _) in text.char_indices() {
        if chars == target {
            return (byte, chars);
        }
        chars += 1;
    }
    (text.len(), chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Option<Span> {
        Some(Span { start, end })
    }

    #[test]
    fn identity_on_ascii() -> Result<()> {
        let mut translator = OffsetTranslator::new();
        let (pos, spans) = translator.translate("Hello, world.", 0, &[span(0, 5), None])?;
        assert_eq!(0, pos);
        assert_eq!(vec![span(0, 5), None], spans);
        Ok(())
    }

    #[test]
    fn multibyte_offsets_shrink_to_char_counts() -> Result<()> {
        let text = "I \u{2665} ABC!";
        let mut translator = OffsetTranslator::new();
        let (pos, spans) = translator.translate(text, 2, &[span(2, 5), span(6, 9)])?;
        assert_eq!(2, pos);
        assert_eq!(vec![span(2, 3), span(4, 7)], spans);
        Ok(())
    }

    #[test]
    fn incremental_translation_matches_full_count() -> Result<()> {
        let text = "a\u{2665}b\u{1F388}c\u{e9}d";
        let mut translator = OffsetTranslator::new();
        let mut byte = 0;
        while byte <= text.len() {
            if text.is_char_boundary(byte) {
                let (_, spans) = translator.translate(text, byte, &[span(byte, byte)])?;
                let expected = text[..byte].chars().count();
                assert_eq!(vec![span(expected, expected)], spans);
            }
            byte += 1;
        }
        Ok(())
    }

    #[test]
    fn sentinel_spans_pass_through() -> Result<()> {
        let mut translator = OffsetTranslator::new();
        let (_, spans) = translator.translate("abc", 1, &[span(1, 2), None, None])?;
        assert_eq!(vec![span(1, 2), None, None], spans);
        Ok(())
    }

    #[test]
    fn offsets_behind_the_anchor_still_resolve() -> Result<()> {
        let text = "\u{2665}\u{2665}abc";
        let mut translator = OffsetTranslator::new();
        translator.translate(text, 0, &[span(0, 9)])?;
        let (pos, spans) = translator.translate(text, 3, &[span(3, 6)])?;
        assert_eq!(1, pos);
        assert_eq!(vec![span(1, 2)], spans);
        Ok(())
    }

    #[test]
    fn off_boundary_offset_is_an_encoding_error() {
        let mut translator = OffsetTranslator::new();
        let err = translator.translate("\u{2665}", 0, &[span(0, 1)]);
        assert!(matches!(err, Err(Error::Encoding(_))));
    }

    #[test]
    fn earlier_state_survives_a_failed_step() -> Result<()> {
        let text = "\u{2665}abc";
        let mut translator = OffsetTranslator::new();
        translator.translate(text, 0, &[span(0, 3)])?;
        assert!(translator.translate(text, 4, &[span(4, 5), span(1, 2)]).is_err());
        let (_, spans) = translator.translate(text, 4, &[span(4, 5)])?;
        assert_eq!(vec![span(2, 3)], spans);
        Ok(())
    }

    #[test]
    fn locate_char_clamps_past_the_end() {
        assert_eq!((0, 0), locate_char("abc", 0));
        assert_eq!((3, 1), locate_char("\u{2665}bc", 1));
        assert_eq!((5, 3), locate_char("\u{2665}bc", 17));
        assert_eq!((0, 0), locate_char("", 4));
    }
}
