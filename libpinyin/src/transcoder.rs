// pinyin-typing/src/transcoder.rs
//
// Display pinyin -> typed letters. Tone marks are stripped by canonical
// decomposition and ü (with or without a tone) becomes `v`, the way pinyin
// keyboards expect it. Results are memoized in an LRU bounded both by entry
// count and by the bytes held, since long article sessions feed it a wide
// variety of syllables.

use std::cell::RefCell;
use std::num::NonZeroUsize;

use lru::LruCache;
use unicode_normalization::char::{decompose_canonical, is_combining_mark};
use unicode_normalization::UnicodeNormalization;

use typing_core::Config;

const DEFAULT_CACHE_ENTRIES: usize = 5000;
const DEFAULT_CACHE_BYTES: usize = 50 * 1024 * 1024;

fn is_u_umlaut(ch: char) -> bool {
    matches!(
        ch,
        'ü' | 'ǖ' | 'ǘ' | 'ǚ' | 'ǜ' | 'Ü' | 'Ǖ' | 'Ǘ' | 'Ǚ' | 'Ǜ'
    )
}

/// Uncached transcoding of one syllable (or any text).
pub fn transcode(syllable: &str) -> String {
    let mut out = String::with_capacity(syllable.len());
    for ch in syllable.nfc() {
        if is_u_umlaut(ch) {
            out.push('v');
            continue;
        }
        decompose_canonical(ch, |d| {
            if !is_combining_mark(d) {
                out.extend(d.to_lowercase());
            }
        });
    }
    out
}

pub struct PinyinTranscoder {
    cache: RefCell<LruCache<String, String>>,
    cached_bytes: RefCell<usize>,
    max_bytes: usize,
    cache_hits: RefCell<usize>,
    cache_misses: RefCell<usize>,
}

impl Default for PinyinTranscoder {
    fn default() -> Self {
        Self::with_limits(DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_BYTES)
    }
}

impl PinyinTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_limits(config.transcoder_cache_entries, config.transcoder_cache_bytes)
    }

    /// A zero entry limit is treated as one.
    pub fn with_limits(max_entries: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
            cached_bytes: RefCell::new(0),
            max_bytes,
            cache_hits: RefCell::new(0),
            cache_misses: RefCell::new(0),
        }
    }

    /// Typed form of `syllable`, e.g. `"lǚ"` -> `"lv"`, `"Hǎo"` -> `"hao"`.
    pub fn to_input_form(&self, syllable: &str) -> String {
        if let Some(hit) = self.cache.borrow_mut().get(syllable) {
            *self.cache_hits.borrow_mut() += 1;
            return hit.clone();
        }
        *self.cache_misses.borrow_mut() += 1;

        let result = transcode(syllable);
        self.remember(syllable, &result);
        result
    }

    fn remember(&self, key: &str, value: &str) {
        let size = key.len() + value.len();
        if size > self.max_bytes {
            return;
        }
        let mut cache = self.cache.borrow_mut();
        let mut bytes = self.cached_bytes.borrow_mut();
        if let Some((old_key, old_value)) = cache.push(key.to_string(), value.to_string()) {
            *bytes -= old_key.len() + old_value.len();
        }
        *bytes += size;
        while *bytes > self.max_bytes {
            match cache.pop_lru() {
                Some((k, v)) => *bytes -= k.len() + v.len(),
                None => break,
            }
        }
    }

    /// Get cache statistics (hits, misses).
    pub fn cache_stats(&self) -> (usize, usize) {
        (*self.cache_hits.borrow(), *self.cache_misses.borrow())
    }

    pub fn cache_hit_rate(&self) -> Option<f32> {
        let (hits, misses) = self.cache_stats();
        let total = hits + misses;
        if total == 0 {
            None
        } else {
            Some((hits as f32 / total as f32) * 100.0)
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Bytes of keys and values currently cached.
    pub fn cache_bytes(&self) -> usize {
        *self.cached_bytes.borrow()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
        *self.cached_bytes.borrow_mut() = 0;
        *self.cache_hits.borrow_mut() = 0;
        *self.cache_misses.borrow_mut() = 0;
    }
}
