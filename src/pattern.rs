use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::{Anchor, Engine};
use crate::matching::{Match, Matches};
use crate::{Encoding, Error, Options, Result};

#[derive(Debug, Clone)]
pub struct Pattern {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    source: String,
    options: Options,
    engine: Engine,
    group_count: usize,
    group_index: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindAllItem {
    Text(String),
    Tuple(Vec<String>),
}

impl Pattern {
    pub(crate) fn compile(pattern: &str, options: &Options) -> Result<Self> {
        if options.max_mem == 0 {
            return Err(Error::Config("max_mem must be positive".to_string()));
        }
        if options.backtrack_limit == 0 {
            return Err(Error::Config("backtrack_limit must be positive".to_string()));
        }
        if options.encoding == Encoding::Bytes && !pattern.is_ascii() {
            return Err(Error::Config(
                "pattern is a character sequence, but options specify byte-oriented matching"
                    .to_string(),
            ));
        }
        let engine = Engine::new(pattern, options)?;
        let group_count = engine.group_count();
        let group_index = engine.named_groups();
        Ok(Self {
            inner: Arc::new(Inner {
                source: pattern.to_string(),
                options: options.clone(),
                engine,
                group_count,
                group_index,
            }),
        })
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn group_count(&self) -> usize {
        self.inner.group_count
    }

    pub fn group_index(&self) -> &HashMap<String, usize> {
        &self.inner.group_index
    }

    pub fn ptr_eq(&self, other: &Pattern) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn search<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>> {
        Matches::new(self.clone(), Anchor::Unanchored, text).next_match()
    }

    pub fn search_at<'t>(&self, text: &'t str, pos: usize, endpos: usize) -> Result<Option<Match<'t>>> {
        Matches::new_at(self.clone(), Anchor::Unanchored, text, pos, endpos)?.next_match()
    }

    pub fn match_start<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>> {
        Matches::new(self.clone(), Anchor::Start, text).next_match()
    }

    pub fn match_start_at<'t>(
        &self,
        text: &'t str,
        pos: usize,
        endpos: usize,
    ) -> Result<Option<Match<'t>>> {
        Matches::new_at(self.clone(), Anchor::Start, text, pos, endpos)?.next_match()
    }

    pub fn match_full<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>> {
        Matches::new(self.clone(), Anchor::Both, text).next_match()
    }

    pub fn match_full_at<'t>(
        &self,
        text: &'t str,
        pos: usize,
        endpos: usize,
    ) -> Result<Option<Match<'t>>> {
        Matches::new_at(self.clone(), Anchor::Both, text, pos, endpos)?.next_match()
    }

    pub fn find_iter<'t>(&self, text: &'t str) -> Matches<'t> {
        Matches::new(self.clone(), Anchor::Unanchored, text)
    }

    pub fn find_iter_at<'t>(&self, text: &'t str, pos: usize, endpos: usize) -> Result<Matches<'t>> {
        Matches::new_at(self.clone(), Anchor::Unanchored, text, pos, endpos)
    }

    pub fn find_all(&self, text: &str) -> Result<Vec<FindAllItem>> {
        let mut items = Vec::new();
        let mut matches = self.find_iter(text);
        while let Some(found) = matches.next_match()? {
            let item = match self.group_count() {
                0 => FindAllItem::Text(found.as_str().to_string()),
                1 => FindAllItem::Text(found.group(1)?.unwrap_or_default().to_string()),
                count => FindAllItem::Tuple(
                    (1..=count)
                        .map(|group| Ok(found.group(group)?.unwrap_or_default().to_string()))
                        .collect::<Result<_>>()?,
                ),
            };
            items.push(item);
        }
        Ok(items)
    }

    pub fn split(&self, text: &str, maxsplit: isize) -> Result<Vec<String>> {
        let count = self.group_count();
        let (pieces, _) = self.split_with(text, maxsplit, |found, pieces| {
            for group in 1..=count {
                pieces.push(found.group(group)?.unwrap_or_default().to_string());
            }
            Ok(())
        })?;
        Ok(pieces)
    }

    pub fn substitute(&self, template: &str, text: &str, count: isize) -> Result<String> {
        Ok(self.substitute_counting(template, text, count)?.0)
    }

    pub fn substitute_counting(
        &self,
        template: &str,
        text: &str,
        count: isize,
    ) -> Result<(String, usize)> {
        let (pieces, substituted) = self.split_with(text, count, |found, pieces| {
            pieces.push(found.expand(template)?);
            Ok(())
        })?;
        Ok((pieces.concat(), substituted))
    }

    pub fn substitute_with<F>(&self, replacer: F, text: &str, count: isize) -> Result<String>
    where
        F: FnMut(&Match<'_>) -> String,
    {
        Ok(self.substitute_with_counting(replacer, text, count)?.0)
    }

    pub fn substitute_with_counting<F>(
        &self,
        mut replacer: F,
        text: &str,
        count: isize,
    ) -> Result<(String, usize)>
    where
        F: FnMut(&Match<'_>) -> String,
    {
        let (pieces, substituted) = self.split_with(text, count, |found, pieces| {
            pieces.push(replacer(found));
            Ok(())
        })?;
        Ok((pieces.concat(), substituted))
    }

    // Shared by split and the substitute family: interleaves the text before
    // each consumed match with whatever the callback appends for it.
    fn split_with<F>(&self, text: &str, limit: isize, mut add: F) -> Result<(Vec<String>, usize)>
    where
        F: FnMut(&Match<'_>, &mut Vec<String>) -> Result<()>,
    {
        if limit < 0 {
            return Ok((vec![text.to_string()], 0));
        }
        let mut matches = self.find_iter(text);
        let mut pieces = Vec::new();
        let mut end = 0;
        let mut consumed = 0;
        while limit == 0 || consumed < limit as usize {
            let Some(found) = matches.next_match()? else {
                break;
            };
            let span = found.whole_byte_span();
            pieces.push(text[end..span.start].to_string());
            add(&found, &mut pieces)?;
            end = span.end;
            consumed += 1;
        }
        pieces.push(text[end..].to_string());
        Ok((pieces, consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_item(text: &str) -> FindAllItem {
        FindAllItem::Text(text.to_string())
    }

    fn tuple_item(groups: &[&str]) -> FindAllItem {
        FindAllItem::Tuple(groups.iter().map(|group| group.to_string()).collect())
    }

    fn compile(source: &str) -> Pattern {
        Pattern::compile(source, &Options::default()).unwrap()
    }

    #[test]
    fn find_all_projects_by_group_count() -> Result<()> {
        let cases = [
            ("\\w\\w+", vec![text_item("Hello"), text_item("world")]),
            ("(\\w)\\w+", vec![text_item("H"), text_item("w")]),
            (
                "(\\w)(\\w+)",
                vec![tuple_item(&["H", "ello"]), tuple_item(&["w", "orld"])],
            ),
        ];
        for (source, expected) in cases {
            assert_eq!(expected, compile(source).find_all("Hello, world.")?);
        }
        assert_eq!(
            vec![tuple_item(&["H", "ello"]), tuple_item(&["w", ""])],
            compile("(\\w)(\\w+)?").find_all("Hello, w.")?
        );
        Ok(())
    }

    #[test]
    fn split_respects_maxsplit() -> Result<()> {
        let pattern = compile("\\W+");
        let text = "Hello, world.";
        assert_eq!(vec![text.to_string()], pattern.split(text, -1)?);
        assert_eq!(
            vec!["Hello".to_string(), "world".to_string(), String::new()],
            pattern.split(text, 0)?
        );
        assert_eq!(
            vec!["Hello".to_string(), "world.".to_string()],
            pattern.split(text, 1)?
        );
        Ok(())
    }

    #[test]
    fn split_interleaves_capture_groups() -> Result<()> {
        let pattern = compile("(\\W+)");
        let text = "Hello, world.";
        assert_eq!(vec![text.to_string()], pattern.split(text, -1)?);
        assert_eq!(
            vec![
                "Hello".to_string(),
                ", ".to_string(),
                "world".to_string(),
                ".".to_string(),
                String::new(),
            ],
            pattern.split(text, 0)?
        );
        assert_eq!(
            vec!["Hello".to_string(), ", ".to_string(), "world.".to_string()],
            pattern.split(text, 1)?
        );
        Ok(())
    }

    #[test]
    fn substitute_with_template_counts_substitutions() -> Result<()> {
        let pattern = compile("\\w+");
        let text = "Hello, world.";
        assert_eq!(
            (text.to_string(), 0),
            pattern.substitute_counting("MEEP", text, -1)?
        );
        assert_eq!(
            ("MEEP, MEEP.".to_string(), 2),
            pattern.substitute_counting("MEEP", text, 0)?
        );
        assert_eq!(
            ("MEEP, world.".to_string(), 1),
            pattern.substitute_counting("MEEP", text, 1)?
        );
        Ok(())
    }

    #[test]
    fn substitute_with_callback_counts_substitutions() -> Result<()> {
        let pattern = compile("\\w+");
        let upper = |found: &Match<'_>| found.as_str().to_uppercase();
        let text = "Hello, world.";
        assert_eq!(
            (text.to_string(), 0),
            pattern.substitute_with_counting(upper, text, -1)?
        );
        assert_eq!(
            ("HELLO, WORLD.".to_string(), 2),
            pattern.substitute_with_counting(upper, text, 0)?
        );
        assert_eq!(
            ("HELLO, world.".to_string(), 1),
            pattern.substitute_with_counting(upper, text, 1)?
        );
        Ok(())
    }

    #[test]
    fn substitute_backslash_template() -> Result<()> {
        let pattern = compile("\\\\");
        assert_eq!(
            ("Hello,\\\\world.".to_string(), 1),
            pattern.substitute_counting("\\\\\\\\", "Hello,\\world.", 0)?
        );
        Ok(())
    }

    #[test]
    fn anchored_matches() -> Result<()> {
        let cases = [
            ("\\d+", "Hello, world.", false, false, false),
            ("\\s+", "Hello, world.", true, false, false),
            ("\\w+", "Hello, world.", true, true, false),
            ("(\\d+)?", "Hello, world.", true, true, false),
            (
                "youtube(_device|_md|_gaia|_multiday|_multiday_gaia)?",
                "youtube_ads",
                true,
                true,
                false,
            ),
            ("\\w+, \\w+\\.", "Hello, world.", true, true, true),
        ];
        for (source, text, search, match_start, match_full) in cases {
            let pattern = compile(source);
            assert_eq!(search, pattern.search(text)?.is_some(), "search {source:?}");
            assert_eq!(
                match_start,
                pattern.match_start(text)?.is_some(),
                "match_start {source:?}"
            );
            assert_eq!(
                match_full,
                pattern.match_full(text)?.is_some(),
                "match_full {source:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn byte_oriented_patterns_report_byte_offsets() -> Result<()> {
        let options = Options {
            encoding: Encoding::Bytes,
            ..Options::default()
        };
        let pattern = Pattern::compile("\\p{Lo}", &options)?;
        let spans: Vec<_> = pattern
            .find_iter("\u{0ca0}_\u{0ca0}")
            .map(|found| found.and_then(|found| found.span(0)))
            .collect::<Result<_>>()?;
        assert_eq!(
            vec![
                Some(crate::Span { start: 0, end: 3 }),
                Some(crate::Span { start: 4, end: 7 }),
            ],
            spans
        );
        Ok(())
    }

    #[test]
    fn conflicting_options_are_config_errors() {
        let bytes = Options {
            encoding: Encoding::Bytes,
            ..Options::default()
        };
        assert!(matches!(
            Pattern::compile("caf\u{e9}", &bytes),
            Err(Error::Config(_))
        ));
        assert!(Pattern::compile("cafe", &bytes).is_ok());

        let no_mem = Options {
            max_mem: 0,
            ..Options::default()
        };
        assert!(matches!(
            Pattern::compile(".", &no_mem),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn compile_errors_are_typed() {
        assert!(matches!(
            Pattern::compile("(unclosed", &Options::default()),
            Err(Error::Compile(_))
        ));
    }
}
