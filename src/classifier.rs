// 🏷️ Keyword Classifier
// Ordered keyword rules mapping free text to a Category

use crate::category::Category;

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// One vocabulary of keywords that all map to the same category.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
}

impl KeywordRule {
    /// First keyword contained anywhere in `lower_text`.
    ///
    /// Substring containment, not whole words: "перекупить" matches "купить".
    /// `lower_text` must already be lowercased.
    pub fn first_match(&self, lower_text: &str) -> Option<&'static str> {
        self.keywords
            .iter()
            .copied()
            .find(|keyword| lower_text.contains(keyword))
    }
}

const PURCHASE_KEYWORDS: &[&str] = &[
    "купить", "покупка", "заказать", "приобрести", "купи", "закажу",
];

const TASK_KEYWORDS: &[&str] = &[
    "сделать", "задача", "выполнить", "позвонить", "написать", "встреча",
    "погулять", "сходить", "съездить", "заехать", "встретиться", "договориться",
    "записаться", "запланировать", "подготовить", "составить", "проверить",
    "исправить", "убрать", "почистить", "починить", "настроить", "установить",
    "обновить", "отправить", "получить", "забрать", "принести", "показать",
    "объяснить", "научить", "помочь", "встретить", "проводить", "отвезти",
    "привезти", "доставить",
];

const IDEA_KEYWORDS: &[&str] = &[
    "идея", "придумать", "создать", "разработать", "изобрести", "придумаю",
    "создам", "разработаю", "проект", "стартап", "бизнес", "концепция",
];

/// Rules in strict priority order: purchase, then task, then idea.
pub const RULES: [KeywordRule; 3] = [
    KeywordRule { category: Category::Purchase, keywords: PURCHASE_KEYWORDS },
    KeywordRule { category: Category::Task, keywords: TASK_KEYWORDS },
    KeywordRule { category: Category::Idea, keywords: IDEA_KEYWORDS },
];

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub category: Category,
    /// Keyword that decided the category; None for the fallback
    pub keyword: Option<&'static str>,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        ClassificationResult {
            category: Category::Thought,
            keyword: None,
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Classify text into a category. Total over all inputs, including "".
pub fn classify(text: &str) -> Category {
    explain(text).category
}

/// Same decision as [`classify`], plus the keyword that triggered it.
pub fn explain(text: &str) -> ClassificationResult {
    let lower = text.to_lowercase();

    // First matching rule wins (RULES is already in priority order)
    for rule in &RULES {
        if let Some(keyword) = rule.first_match(&lower) {
            log::debug!("classified as {} via {:?}", rule.category, keyword);
            return ClassificationResult {
                category: rule.category,
                keyword: Some(keyword),
            };
        }
    }

    ClassificationResult::default()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_keywords() {
        assert_eq!(classify("Купить молоко"), Category::Purchase);
        assert_eq!(classify("заказать пиццу на вечер"), Category::Purchase);
        assert_eq!(classify("ПРИОБРЕСТИ билеты"), Category::Purchase);
    }

    #[test]
    fn test_task_keywords() {
        assert_eq!(classify("Позвонить маме"), Category::Task);
        assert_eq!(classify("починить кран"), Category::Task);
        assert_eq!(classify("Встреча с командой в 10"), Category::Task);
    }

    #[test]
    fn test_idea_keywords() {
        assert_eq!(classify("Идея: приложение для заметок"), Category::Idea);
        assert_eq!(classify("новый стартап"), Category::Idea);
    }

    #[test]
    fn test_purchase_beats_task() {
        // "сделать" is a task keyword, "купить" wins
        assert_eq!(classify("сделать ремонт и купить краску"), Category::Purchase);
        assert_eq!(classify("позвонить и заказать доставку"), Category::Purchase);
    }

    #[test]
    fn test_task_beats_idea() {
        assert_eq!(classify("написать бизнес план"), Category::Task);
    }

    #[test]
    fn test_fallback_is_thought() {
        assert_eq!(classify("Сегодня хорошая погода"), Category::Thought);
        assert_eq!(classify("hello world"), Category::Thought);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(classify(""), Category::Thought);
        assert_eq!(explain(""), ClassificationResult::default());
    }

    #[test]
    fn test_substring_matching_is_kept() {
        // Keyword embedded in a longer word still counts
        assert_eq!(classify("перекупить"), Category::Purchase);
        assert_eq!(classify("проектирование"), Category::Idea);
    }

    #[test]
    fn test_explain_reports_keyword() {
        let result = explain("Надо купить хлеб");
        assert_eq!(result.category, Category::Purchase);
        assert_eq!(result.keyword, Some("купить"));

        let result = explain("просто мысль");
        assert_eq!(result.category, Category::Thought);
        assert_eq!(result.keyword, None);
    }

    #[test]
    fn test_deterministic() {
        let text = "Проверить почту";
        assert_eq!(classify(text), classify(text));
    }
}
