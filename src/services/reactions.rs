/// Reaction symbols counted as star votes unless the config overrides them.
pub const DEFAULT_STAR_REACTIONS: [&str; 4] = ["⭐", "🌟", "✨", "💫"];

/// Vote meaning of a reaction symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionClass {
    /// Counts as one star.
    StarVote,
    /// Carries no vote.
    Ignored,
}

/// Classify `symbol` against `allow_list` (exact, case-sensitive match).
pub fn classify_reaction<S: AsRef<str>>(allow_list: &[S], symbol: &str) -> ReactionClass {
    if allow_list.iter().any(|allowed| allowed.as_ref() == symbol) {
        ReactionClass::StarVote
    } else {
        ReactionClass::Ignored
    }
}

/// Reaction allow-list bound to a room session.
#[derive(Debug, Clone)]
pub struct ReactionNormalizer {
    star_reactions: Vec<String>,
}

impl ReactionNormalizer {
    /// Use `star_reactions` as the allow-list.
    pub fn new(star_reactions: Vec<String>) -> Self {
        Self { star_reactions }
    }

    /// Classify `symbol` against this session's allow-list.
    pub fn classify(&self, symbol: &str) -> ReactionClass {
        classify_reaction(&self.star_reactions, symbol)
    }
}

impl Default for ReactionNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STAR_REACTIONS.map(String::from).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_listed_symbols_are_star_votes() {
        let normalizer = ReactionNormalizer::default();
        for symbol in DEFAULT_STAR_REACTIONS {
            assert_eq!(normalizer.classify(symbol), ReactionClass::StarVote);
        }
    }

    #[test]
    fn anything_else_is_ignored() {
        let normalizer = ReactionNormalizer::default();
        assert_eq!(normalizer.classify("🔥"), ReactionClass::Ignored);
        assert_eq!(normalizer.classify(""), ReactionClass::Ignored);
        assert_eq!(normalizer.classify("⭐⭐"), ReactionClass::Ignored);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let allow_list = ["star"];
        assert_eq!(classify_reaction(&allow_list, "star"), ReactionClass::StarVote);
        assert_eq!(classify_reaction(&allow_list, "Star"), ReactionClass::Ignored);
        assert_eq!(classify_reaction(&allow_list, " star"), ReactionClass::Ignored);
    }
}
