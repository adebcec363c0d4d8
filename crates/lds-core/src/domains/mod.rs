//! Domain files and rewrite entries
//!
//! A domain file lists one hostname per line; blank lines and `#` comments
//! are ignored. Every hostname becomes one [`RewriteEntry`] pointing at the
//! lancache.

mod fetcher;

pub use fetcher::{fetch_all, FetchOutcome};

use std::net::IpAddr;

/// One desired DNS rewrite
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RewriteEntry {
    /// Hostname as listed in the domain file (may start with `*.`)
    pub domain: String,
    /// Answer the hostname should resolve to
    pub target: IpAddr,
}

impl RewriteEntry {
    /// Create a rewrite entry
    pub fn new(domain: impl Into<String>, target: IpAddr) -> Self {
        Self {
            domain: domain.into(),
            target,
        }
    }
}

/// Extract the hostnames from a domain file, in file order
pub fn parse_domain_file(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// Turn a domain file into rewrite entries for `target`
pub fn rewrites_from_file(content: &str, target: IpAddr) -> Vec<RewriteEntry> {
    parse_domain_file(content)
        .into_iter()
        .map(|domain| RewriteEntry::new(domain, target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_comments_and_blanks() {
        let content = "# c1\nsteampowered.com\n\n# c2\nsteamcontent.com\n";
        assert_eq!(parse_domain_file(content), vec!["steampowered.com", "steamcontent.com"]);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let content = "  lancache.steamcontent.com  \r\n\t# indented comment\r\n   \r\n*.cdn.blizzard.com\n";
        assert_eq!(
            parse_domain_file(content),
            vec!["lancache.steamcontent.com", "*.cdn.blizzard.com"]
        );
    }

    #[test]
    fn test_parse_empty_file() {
        assert!(parse_domain_file("").is_empty());
        assert!(parse_domain_file("# only comments\n#\n").is_empty());
    }

    #[test]
    fn test_rewrites_from_file() {
        let target: IpAddr = "10.0.0.5".parse().unwrap();
        let rewrites = rewrites_from_file("a.com\nb.com\n", target);
        assert_eq!(
            rewrites,
            vec![RewriteEntry::new("a.com", target), RewriteEntry::new("b.com", target)]
        );
    }
}
