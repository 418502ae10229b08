//! Alert status classification.
//!
//! Decides whether a line raises or clears an alert from an ordered keyword
//! table. Lines mentioning an ignore phrase never reach classification.

use crate::models::{ClassifierConfig, KeywordRule};

/// Keyword-driven alert/clear classifier.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    /// Rules sorted by descending keyword length, stable over table order
    rules: Vec<(String, bool)>,
    ignore: Vec<String>,
}

impl StatusClassifier {
    /// Create a classifier from an ordered keyword table and ignore list.
    pub fn new(keywords: &[KeywordRule], ignore: &[String]) -> Self {
        let mut rules: Vec<(String, bool)> = keywords
            .iter()
            .filter(|rule| !rule.keyword.is_empty())
            .map(|rule| (rule.keyword.to_lowercase(), rule.alert))
            .collect();
        rules.sort_by_key(|(keyword, _)| std::cmp::Reverse(keyword.chars().count()));

        let ignore = ignore
            .iter()
            .filter(|phrase| !phrase.is_empty())
            .map(|phrase| phrase.to_lowercase())
            .collect();

        Self { rules, ignore }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(&config.keywords, &config.ignore)
    }

    /// Alert value of the longest keyword found in the line, if any.
    pub fn classify(&self, line: &str) -> Option<bool> {
        let haystack = line.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, alert)| *alert)
    }

    /// Whether the line contains an ignore phrase.
    pub fn is_ignored(&self, line: &str) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        let haystack = line.to_lowercase();
        self.ignore
            .iter()
            .any(|phrase| haystack.contains(phrase.as_str()))
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(rules: &[(&str, bool)]) -> StatusClassifier {
        let keywords: Vec<KeywordRule> = rules
            .iter()
            .map(|(keyword, alert)| KeywordRule::new(*keyword, *alert))
            .collect();
        StatusClassifier::new(&keywords, &["реклама".to_string()])
    }

    #[test]
    fn test_emoji_keywords() {
        let c = classifier(&[("🔴", true), ("🟢", false)]);
        assert_eq!(c.classify("🔴 Київська область"), Some(true));
        assert_eq!(c.classify("🟢 Київська область"), Some(false));
        assert_eq!(c.classify("Київська область"), None);
    }

    #[test]
    fn test_longest_keyword_wins() {
        let c = classifier(&[("тривога", true), ("відбій тривога", false)]);
        assert_eq!(c.classify("Відбій тривога в області"), Some(false));
        assert_eq!(c.classify("Тривога в області"), Some(true));
    }

    #[test]
    fn test_equal_length_ties_follow_table_order() {
        let c = classifier(&[("abc", false), ("xyz", true)]);
        assert_eq!(c.classify("xyz abc"), Some(false));

        let c = classifier(&[("xyz", true), ("abc", false)]);
        assert_eq!(c.classify("xyz abc"), Some(true));
    }

    #[test]
    fn test_case_insensitive() {
        let c = classifier(&[("Повітряна тривога", true)]);
        assert_eq!(c.classify("ПОВІТРЯНА ТРИВОГА у Львові"), Some(true));
        assert_eq!(c.classify("повітряна Тривога"), Some(true));
    }

    #[test]
    fn test_ignore_list() {
        let c = classifier(&[("🔴", true)]);
        assert!(c.is_ignored("🔴 РЕКЛАМА тут"));
        assert!(!c.is_ignored("🔴 Київ"));
    }

    #[test]
    fn test_default_tables() {
        let c = StatusClassifier::default();
        assert_eq!(c.classify("Відбій тривоги в м. Київ"), Some(false));
        assert_eq!(c.classify("Повітряна тривога в м. Київ"), Some(true));
        assert!(c.is_ignored("БЕЗКОШТОВНА ЕВАКУАЦІЯ з Харкова"));
    }
}
