//! Plain-text rendering of a pending question

use super::builder::ClarificationItem;

/// The question followed by numbered options, one per line
pub fn render_clarification(item: &ClarificationItem) -> String {
    let mut out = item.question.clone();
    for (i, option) in item.options.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, option));
    }
    out
}

/// Options picked by number in `answer` ("1", "2 and 3"), in answer order.
///
/// Only answers made of numbers and joining words count, so "Building 2"
/// never selects option 2. Numbers outside the option range are ignored.
pub fn select_options(answer: &str, options: &[String]) -> Vec<String> {
    let numeric_only = answer
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .all(|w| matches!(w.to_lowercase().as_str(), "and" | "or" | "both" | "option" | "options"));
    if !numeric_only {
        return Vec::new();
    }

    let mut picked: Vec<String> = Vec::new();
    for token in answer.split(|c: char| !c.is_ascii_digit()) {
        let Ok(n) = token.parse::<usize>() else {
            continue;
        };
        if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
            if !picked.contains(option) {
                picked.push(option.clone());
            }
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clarify::{ClarificationField, ClarificationKind};

    #[test]
    fn test_render_numbers_options() {
        let item = ClarificationItem::new(ClarificationField::AggregationLevel, ClarificationKind::Choice, "How?")
            .with_options(["tenant", "property"]);
        assert_eq!(render_clarification(&item), "How?\n  1. tenant\n  2. property");
    }

    #[test]
    fn test_render_without_options() {
        let item = ClarificationItem::new(ClarificationField::TenantName, ClarificationKind::Value, "Which tenant?");
        assert_eq!(render_clarification(&item), "Which tenant?");
    }

    #[test]
    fn test_select_options() {
        let options = vec!["Building 120".to_string(), "Building 160".to_string(), "Building 180".to_string()];
        assert_eq!(select_options("3 and 1", &options), vec!["Building 180", "Building 120"]);
        assert_eq!(select_options("2, 2, 7", &options), vec!["Building 160"]);
        assert_eq!(select_options("options 1 and 2", &options), vec!["Building 120", "Building 160"]);
        assert!(select_options("Building 2", &options).is_empty());
    }
}
