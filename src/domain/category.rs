use serde::{Deserialize, Serialize};

/// Categories recognized when no custom set is configured.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "allowance",
    "salary",
    "gift",
    "food",
    "transport",
    "shopping",
    "entertainment",
    "education",
    "health",
    "housing",
    "utilities",
    "other",
];

/// Which category names a transaction may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "names")]
pub enum CategoryPolicy {
    /// Any non-empty name is accepted.
    FreeText,
    /// Only the listed names are accepted (exact match).
    Fixed(Vec<String>),
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        CategoryPolicy::Fixed(DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect())
    }
}

impl CategoryPolicy {
    pub fn fixed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CategoryPolicy::Fixed(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if `name` (already trimmed) is acceptable under this policy.
    pub fn accepts(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        match self {
            CategoryPolicy::FreeText => true,
            CategoryPolicy::Fixed(names) => names.iter().any(|n| n == name),
        }
    }

    /// The recognized names, or `None` when any name is accepted.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            CategoryPolicy::FreeText => None,
            CategoryPolicy::Fixed(names) => Some(names),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text_accepts_any_non_empty() {
        let policy = CategoryPolicy::FreeText;
        assert!(policy.accepts("snacks"));
        assert!(!policy.accepts(""));
    }

    #[test]
    fn test_fixed_is_exact_match() {
        let policy = CategoryPolicy::fixed(["food", "transport"]);
        assert!(policy.accepts("food"));
        assert!(!policy.accepts("Food"));
        assert!(!policy.accepts("snacks"));
    }

    #[test]
    fn test_default_policy_is_fixed_set() {
        let policy = CategoryPolicy::default();
        assert!(policy.accepts("food"));
        assert_eq!(policy.names().map(|n| n.len()), Some(DEFAULT_CATEGORIES.len()));
    }
}
