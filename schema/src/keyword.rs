use serde::Serialize;

/// Keywords every DC file knows about without declaring them.
pub const BUILTIN_KEYWORDS: [&str; 9] = [
    "required",
    "ram",
    "broadcast",
    "clrecv",
    "clsend",
    "ownrecv",
    "ownsend",
    "airecv",
    "db",
];

/// An ordered set of keyword names.
///
/// A File uses one to hold the declared keyword universe; a Field uses one to
/// hold the keywords written on it. Insertion order is kept and duplicates
/// are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn new() -> KeywordSet {
        KeywordSet(Vec::new())
    }

    pub fn builtin() -> KeywordSet {
        KeywordSet(BUILTIN_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }

    /// Adds `keyword`, returning false if it was already present.
    pub fn add(&mut self, keyword: &str) -> bool {
        if self.has(keyword) {
            return false;
        }
        self.0.push(keyword.to_owned());
        true
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.0.iter().any(|k| k == keyword)
    }

    /// Set equality; order does not matter.
    pub fn same_keywords(&self, other: &KeywordSet) -> bool {
        self.len() == other.len() && self.iter().all(|k| other.has(k))
    }

    /// Position of `keyword` in insertion order.
    pub fn position(&self, keyword: &str) -> Option<usize> {
        self.0.iter().position(|k| k == keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_order_and_drops_duplicates() {
        let mut set = KeywordSet::new();
        assert!(set.add("db"));
        assert!(set.add("ram"));
        assert!(!set.add("db"));
        assert_eq!(set.iter().collect::<Vec<_>>(), ["db", "ram"]);
        assert_eq!(set.position("ram"), Some(1));
    }

    #[test]
    fn same_keywords_ignores_order() {
        let mut a = KeywordSet::new();
        a.add("db");
        a.add("ram");
        let mut b = KeywordSet::new();
        b.add("ram");
        b.add("db");
        assert!(a.same_keywords(&b));
        b.add("broadcast");
        assert!(!a.same_keywords(&b));
    }

    #[test]
    fn builtin_universe() {
        let set = KeywordSet::builtin();
        assert_eq!(set.len(), 9);
        assert!(set.has("airecv"));
        assert!(!set.has("bogus"));
    }
}
