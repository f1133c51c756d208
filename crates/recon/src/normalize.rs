/// Category and locality words that carry no identity for this market.
pub const DEFAULT_STOP_WORDS: &[&str] = &["casino", "batumi"];

/// Reduces display names to comparison keys.
///
/// Lowercase, drop every stop-word occurrence, keep only `[a-z0-9]`.
/// Stop-word removal runs to a fixpoint both before and after character
/// stripping, so a key never contains a stop-word and re-normalizing a key
/// returns it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    stop_words: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS)
    }
}

impl Normalizer {
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = stop_words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { stop_words }
    }

    pub fn stop_words(&self) -> &[String] {
        &self.stop_words
    }

    pub fn key(&self, name: &str) -> String {
        let lowered = self.strip_stop_words(name.to_lowercase());
        let kept: String = lowered
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();
        self.strip_stop_words(kept)
    }

    fn strip_stop_words(&self, mut text: String) -> String {
        loop {
            let before = text.len();
            for word in &self.stop_words {
                if text.contains(word.as_str()) {
                    text = text.replace(word.as_str(), "");
                }
            }
            if text.len() == before {
                return text;
            }
        }
    }
}

/// Key under the default stop-words.
pub fn normalize(name: &str) -> String {
    Normalizer::default().key(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn drops_category_and_locality() {
        assert_eq!(normalize("Casino Soho"), "soho");
        assert_eq!(normalize("Casino Soho"), normalize("soho"));
        assert_eq!(normalize("Casino Iveria Batumi"), "iveria");
        assert_eq!(normalize("Casino-Batumi"), "");
    }

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("  Grand BELLAGIO!  "), "grandbellagio");
        assert_eq!(normalize("Eclipse Casino #2"), "eclipse2");
        assert_eq!(normalize("Ბათუმი Empire"), "empire");
    }

    #[test]
    fn stop_words_hidden_by_punctuation_are_removed() {
        // "cas-ino" only becomes a stop-word after stripping
        assert_eq!(normalize("Cas-ino Peace"), "peace");
        assert_eq!(normalize("cacasinosino royal"), "royal");
    }

    #[test]
    fn custom_stop_words_are_lowercased() {
        let n = Normalizer::new(["Hotel", ""]);
        assert_eq!(n.stop_words(), &["hotel".to_string()]);
        assert_eq!(n.key("Hotel Intourist"), "intourist");
    }

    proptest! {
        #[test]
        fn key_is_idempotent(name in "[A-Za-z0-9 &'.-]{0,40}") {
            let once = normalize(&name);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn key_ignores_case(name in "[A-Za-z0-9 ]{0,40}") {
            prop_assert_eq!(normalize(&name.to_uppercase()), normalize(&name.to_lowercase()));
        }

        #[test]
        fn key_is_alphanumeric(name in ".{0,40}") {
            let key = normalize(&name);
            prop_assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
