use super::table::SuffixTrie;

/// Maximum number of characters kept in the decode buffer.
pub const DECODE_CAP: usize = 78;

pub const DIT_TOKEN: char = '.';
pub const DAH_TOKEN: char = '-';
pub const GAP_TOKEN: char = ' ';

/// Incremental decoder turning keyed elements into text.
///
/// Dots and dashes are appended verbatim. When a gap arrives, the longest
/// table pattern ending the current run of elements is replaced by its
/// decoded text and the gap is consumed. Runs that never complete a pattern
/// stay visible as raw elements.
#[derive(Clone, Debug)]
pub struct Decoder {
    trie: SuffixTrie,
    text: String,
    /// Trailing elements not yet closed by a gap. Always ASCII.
    pending: usize,
    cap: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_cap(DECODE_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            trie: SuffixTrie::new(),
            text: String::new(),
            pending: 0,
            cap,
        }
    }

    /// Append one token and return the current decoded text.
    pub fn push(&mut self, token: char) -> &str {
        match token {
            DIT_TOKEN | DAH_TOKEN => {
                self.text.push(token);
                self.pending += 1;
            }
            GAP_TOKEN => self.close_run(),
            other => {
                log::warn!("ignoring unknown decoder token {other:?}");
                return &self.text;
            }
        }
        self.trim();
        &self.text
    }

    fn close_run(&mut self) {
        let run_start = self.text.len() - self.pending;
        self.pending = 0;
        match self.trie.longest_suffix(&self.text[run_start..]) {
            Some((len, decoded)) => {
                let cut = self.text.len() - len;
                self.text.truncate(cut);
                self.text.push_str(decoded);
            }
            None => self.text.push(GAP_TOKEN),
        }
    }

    fn trim(&mut self) {
        let count = self.text.chars().count();
        if count <= self.cap {
            return;
        }
        let drop = count - self.cap;
        let start = self
            .text
            .char_indices()
            .nth(drop)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len());
        self.text.drain(..start);
        self.pending = self.pending.min(self.text.len());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn ends_with_gap(&self) -> bool {
        self.text.ends_with(GAP_TOKEN)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Decoder {
    /// Number of characters currently held.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }
}
