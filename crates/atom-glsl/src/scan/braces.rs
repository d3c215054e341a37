use crate::model::Span;

/// Every `{ }` pair in a (comment-blanked) source, matched with a stack.
///
/// Stray closing braces are ignored; opening braces that never close are
/// kept with `close: None` and treated as running to the end of the text.
#[derive(Debug, Clone, Default)]
pub(crate) struct BraceMap {
    /// Sorted by `open`.
    pairs: Vec<BracePair>,
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BracePair {
    pub open: usize,
    pub close: Option<usize>,
}

impl BracePair {
    fn end(self, len: usize) -> usize {
        self.close.map(|c| c + 1).unwrap_or(len)
    }
}

impl BraceMap {
    pub fn new(clean: &str) -> Self {
        let mut pairs = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        for (i, b) in clean.bytes().enumerate() {
            match b {
                b'{' => {
                    stack.push(pairs.len());
                    pairs.push(BracePair { open: i, close: None });
                }
                b'}' => {
                    if let Some(idx) = stack.pop() {
                        pairs[idx].close = Some(i);
                    }
                }
                _ => {}
            }
        }
        Self { pairs, len: clean.len() }
    }

    /// Matching closing brace of the `{` at `open`.
    pub fn close_of(&self, open: usize) -> Option<usize> {
        let idx = self.pairs.binary_search_by_key(&open, |p| p.open).ok()?;
        self.pairs[idx].close
    }

    /// `true` when some brace pair strictly surrounds `span`.
    pub fn is_enclosed(&self, span: Span) -> bool {
        self.pairs
            .iter()
            .take_while(|p| p.open < span.start)
            .any(|p| span.end <= p.end(self.len))
    }

    /// Outermost pairs, in source order.
    pub fn top_level(&self) -> Vec<BracePair> {
        let mut out = Vec::new();
        let mut covered_until = 0;
        for pair in &self.pairs {
            if pair.open >= covered_until {
                out.push(*pair);
                covered_until = pair.end(self.len);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_nested_pairs() {
        let src = "void f(){ if(x){ y(); } }";
        let map = BraceMap::new(src);
        let outer = src.find('{').unwrap();
        assert_eq!(map.close_of(outer), Some(src.len() - 1));
        assert_eq!(map.top_level().len(), 1);
    }

    #[test]
    fn enclosure_check() {
        let src = "S a; void main(){ S b; }";
        let map = BraceMap::new(src);
        let a = src.find("S a;").unwrap();
        let b = src.find("S b;").unwrap();
        assert!(!map.is_enclosed(Span::new(a, a + 4)));
        assert!(map.is_enclosed(Span::new(b, b + 4)));
    }

    #[test]
    fn unclosed_brace_runs_to_end() {
        let src = "void f(){ int x;";
        let map = BraceMap::new(src);
        let open = src.find('{').unwrap();
        assert_eq!(map.close_of(open), None);
        assert!(map.is_enclosed(Span::new(src.len() - 6, src.len())));
    }
}
