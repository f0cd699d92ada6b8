//! Normalization helpers shared by tool adapters

use regex::Regex;
use std::sync::OnceLock;

/// Extract CVE identifiers from free-form advisory text
pub fn extract_cve_ids(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"CVE-\d{4}-\d{4,}").unwrap());
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Pick the first CVE-shaped identifier from a list of aliases
pub fn first_cve(aliases: &[String]) -> Option<String> {
    aliases.iter().find(|a| a.starts_with("CVE-")).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cve_ids() {
        let text = "Tracked as CVE-2023-1234 and CVE-2023-56789.";
        let cves = extract_cve_ids(text);
        assert_eq!(cves, vec!["CVE-2023-1234", "CVE-2023-56789"]);
        assert!(extract_cve_ids("no identifiers here").is_empty());
    }

    #[test]
    fn test_first_cve() {
        let aliases = vec![
            String::from("GHSA-xxxx-yyyy"),
            String::from("CVE-2019-1010083"),
        ];
        assert_eq!(first_cve(&aliases).as_deref(), Some("CVE-2019-1010083"));
        assert!(first_cve(&[]).is_none());
    }
}
