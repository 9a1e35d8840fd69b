/// Dot/dash patterns and the text they decode to.
///
/// Prosigns decode to their bracketed names so they stay visible in the
/// decoder line.
pub const MORSE_TABLE: &[(&str, &str)] = &[
    (".-", "A"),
    (".-.-", "Ä"),
    ("-...", "B"),
    ("-.-.", "C"),
    ("----", "CH"),
    ("-..", "D"),
    (".", "E"),
    ("..-.", "F"),
    ("--.", "G"),
    ("....", "H"),
    ("..", "I"),
    (".---", "J"),
    ("-.-", "K"),
    (".-..", "L"),
    ("--", "M"),
    ("-.", "N"),
    ("---", "O"),
    ("---.", "Ö"),
    (".--.", "P"),
    ("--.-", "Q"),
    (".-.", "R"),
    ("...", "S"),
    ("-", "T"),
    ("..-", "U"),
    ("..--", "Ü"),
    ("...-", "V"),
    (".--", "W"),
    ("-..-", "X"),
    ("-.--", "Y"),
    ("--..", "Z"),
    ("-----", "0"),
    (".----", "1"),
    ("..---", "2"),
    ("...--", "3"),
    ("....-", "4"),
    (".....", "5"),
    ("-....", "6"),
    ("--...", "7"),
    ("---..", "8"),
    ("----.", "9"),
    (".-.-.", "+"),
    ("--..--", ","),
    ("-....-", "-"),
    (".-.-.-", "."),
    ("-..-.", "/"),
    ("---...", ";"),
    ("-...-", "="),
    ("..--..", "?"),
    (".--.-.", "@"),
    (".-...", "<AS>"),
    ("...-.-", "<SK>"),
];

#[derive(Clone, Debug, Default)]
struct Node {
    children: [Option<usize>; 2],
    text: Option<&'static str>,
}

/// Trie over the table patterns, keyed from the last symbol backwards.
///
/// Walking it from the end of a token run finds every table pattern that is
/// a suffix of the run; the deepest hit is the longest one.
#[derive(Clone, Debug)]
pub struct SuffixTrie {
    nodes: Vec<Node>,
}

fn symbol_index(symbol: char) -> Option<usize> {
    match symbol {
        '.' => Some(0),
        '-' => Some(1),
        _ => None,
    }
}

impl SuffixTrie {
    pub fn new() -> Self {
        let mut trie = Self {
            nodes: vec![Node::default()],
        };
        for (code, text) in MORSE_TABLE {
            trie.insert(code, text);
        }
        trie
    }

    fn insert(&mut self, code: &str, text: &'static str) {
        let mut node = 0;
        for symbol in code.chars().rev() {
            let Some(idx) = symbol_index(symbol) else {
                return;
            };
            node = match self.nodes[node].children[idx] {
                Some(next) => next,
                None => {
                    self.nodes.push(Node::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[node].children[idx] = Some(next);
                    next
                }
            };
        }
        self.nodes[node].text = Some(text);
    }

    /// Longest table pattern that ends the token run.
    ///
    /// Returns the pattern length in symbols and its decoded text.
    pub fn longest_suffix(&self, tokens: &str) -> Option<(usize, &'static str)> {
        let mut node = 0;
        let mut best = None;
        for (depth, symbol) in tokens.chars().rev().enumerate() {
            let Some(next) = symbol_index(symbol).and_then(|idx| self.nodes[node].children[idx])
            else {
                break;
            };
            node = next;
            if let Some(text) = self.nodes[node].text {
                best = Some((depth + 1, text));
            }
        }
        best
    }
}

impl Default for SuffixTrie {
    fn default() -> Self {
        Self::new()
    }
}
