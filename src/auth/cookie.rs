//! Parsing of the `--cookie` session string
//!
//! Accepts a single `name=value` pair or several pairs joined by `;`.
//! Segments without `=` or without any alphanumeric character are dropped
//! silently, as are segments whose name is blank.

use std::collections::BTreeMap;

/// Cookies supplied on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    cookies: BTreeMap<String, String>,
}

impl CookieSet {
    /// Parses a cookie string; never fails, malformed segments are skipped
    pub fn parse(raw: &str) -> Self {
        let mut cookies = BTreeMap::new();
        for segment in raw.split(';') {
            if !segment.contains('=') || !segment.chars().any(|c| c.is_ascii_alphanumeric()) {
                continue;
            }
            let mut parts = segment.split('=');
            let name = parts.next().unwrap_or_default().trim();
            let value = parts.next().unwrap_or_default().trim();
            if name.is_empty() {
                continue;
            }
            cookies.insert(name.to_string(), value.to_string());
        }
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// `Set-Cookie` style strings scoped to the whole host
    pub fn set_cookie_strings(&self) -> impl Iterator<Item = String> + '_ {
        self.iter()
            .map(|(name, value)| format!("{}={}; Path=/", name, value))
    }
}
