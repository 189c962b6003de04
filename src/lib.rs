use std::error::Error as StdError;
use std::fmt;
use std::sync::OnceLock;

mod cache;
mod engine;
mod matching;
mod pattern;
mod template;
mod translate;

pub use cache::PatternCache;
pub use engine::escape;
pub use matching::{Match, Matches, Span};
pub use pattern::{FindAllItem, Pattern};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Compile(String),
    Encoding(String),
    BadGroup(String),
    UndefinedGroup(String),
    Config(String),
    Engine(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile(msg) => write!(f, "compile error: {msg}"),
            Self::Encoding(msg) => write!(f, "encoding error: {msg}"),
            Self::BadGroup(msg) => write!(f, "{msg}"),
            Self::UndefinedGroup(msg) => write!(f, "{msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Engine(msg) => write!(f, "engine error: {msg}"),
        }
    }
}

impl StdError for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Options {
    pub encoding: Encoding,
    pub case_sensitive: bool,
    pub multi_line: bool,
    pub dot_nl: bool,
    pub literal: bool,
    pub max_mem: usize,
    pub backtrack_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            case_sensitive: true,
            multi_line: false,
            dot_nl: false,
            literal: false,
            max_mem: 8 << 20,
            backtrack_limit: 1 << 20,
        }
    }
}

fn default_cache() -> &'static PatternCache {
    static CACHE: OnceLock<PatternCache> = OnceLock::new();
    CACHE.get_or_init(PatternCache::new)
}

pub fn compile(pattern: &str) -> Result<Pattern> {
    default_cache().get_or_compile(pattern, &Options::default())
}

pub fn compile_with(pattern: &str, options: &Options) -> Result<Pattern> {
    default_cache().get_or_compile(pattern, options)
}

pub fn search<'t>(pattern: &str, text: &'t str) -> Result<Option<Match<'t>>> {
    compile(pattern)?.search(text)
}

pub fn match_start<'t>(pattern: &str, text: &'t str) -> Result<Option<Match<'t>>> {
    compile(pattern)?.match_start(text)
}

pub fn match_full<'t>(pattern: &str, text: &'t str) -> Result<Option<Match<'t>>> {
    compile(pattern)?.match_full(text)
}

pub fn find_iter<'t>(pattern: &str, text: &'t str) -> Result<Matches<'t>> {
    Ok(compile(pattern)?.find_iter(text))
}

pub fn find_all(pattern: &str, text: &str) -> Result<Vec<FindAllItem>> {
    compile(pattern)?.find_all(text)
}

pub fn split(pattern: &str, text: &str, maxsplit: isize) -> Result<Vec<String>> {
    compile(pattern)?.split(text, maxsplit)
}

pub fn substitute(pattern: &str, template: &str, text: &str, count: isize) -> Result<String> {
    compile(pattern)?.substitute(template, text, count)
}

pub fn substitute_counting(
    pattern: &str,
    template: &str,
    text: &str,
    count: isize,
) -> Result<(String, usize)> {
    compile(pattern)?.substitute_counting(template, text, count)
}

pub fn purge() {
    default_cache().purge();
}
