/// Decides whether a line belongs in the count.
///
/// Matching is plain substring presence: a line counts once no matter how
/// often the keyword occurs in it. There is no pattern syntax of any kind.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keyword: String,
}

impl KeywordMatcher {
    /// Creates a matcher for the given keyword
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }

    /// Returns true when the keyword occurs in the line.
    ///
    /// An empty keyword matches no line, not every line. `str::contains`
    /// would report the opposite, so the emptiness check comes first.
    pub fn is_match(&self, line: &str) -> bool {
        !self.keyword.is_empty() && line.contains(&self.keyword)
    }
}
