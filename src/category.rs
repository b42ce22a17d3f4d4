// 🏷️ Categories & Filters
// Closed set of entry categories plus the transient list filter

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CATEGORY
// ============================================================================

/// Category assigned to every entry.
///
/// The set is closed: an entry can never carry anything else, and
/// `Thought` is what the classifier falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Task,
    Purchase,
    Idea,
    #[default]
    Thought,
}

impl Category {
    /// Menu order used by retype prompts (1-based in the UI)
    pub const ALL: [Category; 4] = [
        Category::Task,
        Category::Purchase,
        Category::Idea,
        Category::Thought,
    ];

    /// Machine name, as stored on disk and accepted by `FromStr`
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Task => "task",
            Category::Purchase => "purchase",
            Category::Idea => "idea",
            Category::Thought => "thought",
        }
    }

    /// Human-readable label for display and export
    pub fn label(&self) -> &'static str {
        match self {
            Category::Task => "Задача",
            Category::Purchase => "Покупка",
            Category::Idea => "Идея",
            Category::Thought => "Мысль",
        }
    }

    /// Resolve a 1-based menu choice ("1" → Task ... "4" → Thought)
    pub fn from_choice(choice: usize) -> Option<Category> {
        choice
            .checked_sub(1)
            .and_then(|i| Category::ALL.get(i))
            .copied()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" => Ok(Category::Task),
            "purchase" => Ok(Category::Purchase),
            "idea" => Ok(Category::Idea),
            "thought" => Ok(Category::Thought),
            other => Err(other.to_string()),
        }
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// Which entries a view shows. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Only(Category),
}

impl Filter {
    /// Filter keys in display order (TUI keys 1-5)
    pub const ALL: [Filter; 5] = [
        Filter::All,
        Filter::Only(Category::Task),
        Filter::Only(Category::Purchase),
        Filter::Only(Category::Idea),
        Filter::Only(Category::Thought),
    ];

    pub fn matches(&self, category: Category) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(c) => *c == category,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "Все",
            Filter::Only(c) => c.label(),
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Filter::All);
        }
        s.parse::<Category>().map(Filter::Only)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("all"),
            Filter::Only(c) => f.write_str(c.as_str()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Category::Task.label(), "Задача");
        assert_eq!(Category::Purchase.label(), "Покупка");
        assert_eq!(Category::Idea.label(), "Идея");
        assert_eq!(Category::Thought.label(), "Мысль");
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("purchase".parse::<Category>(), Ok(Category::Purchase));
        assert_eq!(" Task ".parse::<Category>(), Ok(Category::Task));
        assert!("bogus".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn test_from_choice() {
        assert_eq!(Category::from_choice(1), Some(Category::Task));
        assert_eq!(Category::from_choice(4), Some(Category::Thought));
        assert_eq!(Category::from_choice(0), None);
        assert_eq!(Category::from_choice(5), None);
    }

    #[test]
    fn test_filter_parse_and_match() {
        assert_eq!("all".parse::<Filter>(), Ok(Filter::All));
        assert_eq!("idea".parse::<Filter>(), Ok(Filter::Only(Category::Idea)));
        assert!("everything".parse::<Filter>().is_err());

        assert!(Filter::All.matches(Category::Purchase));
        assert!(Filter::Only(Category::Task).matches(Category::Task));
        assert!(!Filter::Only(Category::Task).matches(Category::Idea));
    }

    #[test]
    fn test_serde_uses_machine_names() {
        let json = serde_json::to_string(&Category::Purchase).unwrap();
        assert_eq!(json, "\"purchase\"");
        let back: Category = serde_json::from_str("\"idea\"").unwrap();
        assert_eq!(back, Category::Idea);
    }
}
