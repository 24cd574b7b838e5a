//! Rules deciding whether a results page should get an answer at all.

/// Question-mark glyphs recognized at the end of a query.
pub const QUESTION_MARKS: &[char] = &[
    '?',  // ASCII
    '？', // fullwidth, Chinese/Japanese
    '؟',  // Arabic
    '⸮',  // reversed, Arabic
];

pub fn ends_with_question_mark(question: &str) -> bool {
    question
        .trim()
        .chars()
        .last()
        .is_some_and(|c| QUESTION_MARKS.contains(&c))
}

/// Only the first results page qualifies. `start` is the page's pagination
/// parameter; an empty value counts as absent.
pub fn is_first_page(start: Option<&str>) -> bool {
    start.map_or(true, |s| s.is_empty() || s == "0")
}

pub fn should_answer(question: &str, start: Option<&str>) -> bool {
    !question.trim().is_empty() && ends_with_question_mark(question) && is_first_page(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_marks_across_scripts() {
        assert!(ends_with_question_mark("What is 2+2?"));
        assert!(ends_with_question_mark("什么是锈？"));
        assert!(ends_with_question_mark("ما هذا؟"));
        assert!(ends_with_question_mark("ما هذا⸮"));
        assert!(ends_with_question_mark("trailing space?  "));
        assert!(!ends_with_question_mark("rust borrow checker"));
        assert!(!ends_with_question_mark(""));
    }

    #[test]
    fn test_first_page() {
        assert!(is_first_page(None));
        assert!(is_first_page(Some("0")));
        assert!(!is_first_page(Some("10")));
        assert!(is_first_page(Some("")));
    }

    #[test]
    fn test_should_answer() {
        assert!(should_answer("why is the sky blue?", None));
        assert!(!should_answer("why is the sky blue?", Some("20")));
        assert!(should_answer("  ?", Some("0")));
        assert!(!should_answer("   ", None));
    }
}
