//! Crawler allowlist.
//!
//! Requests whose user agent contains one of the configured substrings see
//! the origin's markup unmodified.

/// Separator accepted when the list is given as a single string.
pub const BOT_LIST_SEPARATOR: char = ';';

const DEFAULT_BOTS: &[&str] = &["Googlebot", "Screaming Frog"];

/// Configured crawler user-agent substrings. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerBots {
    bots: Vec<String>,
}

impl CrawlerBots {
    /// Build from entries kept verbatim; empty entries are dropped.
    pub fn new<I, S>(bots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bots: bots
                .into_iter()
                .map(Into::into)
                .filter(|b: &String| !b.is_empty())
                .collect(),
        }
    }

    /// Parse a `;`-separated list such as `Googlebot;Bingbot`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(BOT_LIST_SEPARATOR))
    }

    /// True if the user agent contains any configured bot name.
    pub fn matches(&self, user_agent: Option<&str>) -> bool {
        let Some(user_agent) = user_agent else {
            return false;
        };
        self.bots.iter().any(|bot| user_agent.contains(bot.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.bots.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

impl Default for CrawlerBots {
    fn default() -> Self {
        Self::new(DEFAULT_BOTS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bots = CrawlerBots::default();
        assert!(bots.matches(Some(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        )));
        assert!(bots.matches(Some("Screaming Frog SEO Spider/19.0")));
        assert!(!bots.matches(Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0")));
        assert!(!bots.matches(None));
    }

    #[test]
    fn test_parse_list() {
        let bots = CrawlerBots::parse("Bingbot;DuckDuckBot;;");
        assert_eq!(bots.iter().collect::<Vec<_>>(), vec!["Bingbot", "DuckDuckBot"]);
        assert!(bots.matches(Some("Mozilla/5.0 (compatible; bingbot) Bingbot/2.0")));
        assert!(!bots.matches(Some("Googlebot")));
    }

    #[test]
    fn test_entries_keep_whitespace() {
        let bots = CrawlerBots::parse("Bingbot; Frog");
        assert_eq!(bots.iter().collect::<Vec<_>>(), vec!["Bingbot", " Frog"]);
        assert!(bots.matches(Some("Screaming Frog SEO Spider/19.0")));
        assert!(!bots.matches(Some("Frog/1.0")));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let bots = CrawlerBots::default();
        assert!(!bots.matches(Some("googlebot")));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let bots = CrawlerBots::parse("");
        assert!(bots.is_empty());
        assert!(!bots.matches(Some("Googlebot")));
    }
}
