use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use crate::pattern::Pattern;
use crate::{Options, Result};

const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug)]
pub(crate) struct LruCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
}

impl<K: Eq + Hash, V: Clone> LruCache<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.tick += 1;
        let tick = self.tick;
        let (value, last_used) = self.entries.get_mut(key)?;
        *last_used = tick;
        Some(value.clone())
    }

    pub(crate) fn insert(&mut self, key: K, value: V)
    where
        K: Clone,
    {
        self.tick += 1;
        self.entries.insert(key, (value, self.tick));
        if self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug)]
pub struct PatternCache {
    inner: Mutex<LruCache<(String, Options), Pattern>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get_or_compile(&self, pattern: &str, options: &Options) -> Result<Pattern> {
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (pattern.to_string(), options.clone());
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }
        let compiled = Pattern::compile(pattern, options)?;
        cache.insert(key, compiled.clone());
        Ok(compiled)
    }

    pub fn purge(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}
