use std::fmt::Write as _;

use super::ReviewRecord;

/// Render a review as the markdown block shown in the conversation.
pub fn format_review_markdown(review: &ReviewRecord) -> String {
    let mut out = String::from("## UXレビュー結果\n\n");

    let _ = write!(out, "### 全体サマリー\n{}\n\n", review.summary);

    out.push_str("### 良い点\n");
    for point in &review.good_points {
        let _ = writeln!(out, "- {}", point);
    }
    out.push('\n');

    out.push_str("### 改善点\n");
    for point in &review.bad_points {
        let _ = writeln!(out, "- {}", point);
    }
    out.push('\n');

    out.push_str("### 詳細分析\n");
    for (principle, text) in review.detailed_analysis.iter() {
        let _ = write!(out, "\n#### {}\n{}\n", principle, text);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{extract, Principle};

    #[test]
    fn test_markdown_has_all_sections_in_order() {
        let markdown = format_review_markdown(&extract(""));

        let mut cursor = 0;
        let mut expect = |needle: &str| {
            let pos = markdown[cursor..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing {:?}", needle));
            cursor += pos + needle.len();
        };

        expect("### 全体サマリー");
        expect("### 良い点");
        expect("### 改善点");
        expect("### 詳細分析");
        for principle in Principle::ALL {
            expect(&format!("#### {}", principle.name()));
        }
    }

    #[test]
    fn test_points_render_as_bullets() {
        let markdown = format_review_markdown(&extract("良い点:\n- a\n- b"));
        assert!(markdown.contains("### 良い点\n- a\n- b\n"));
        assert_eq!(markdown.matches("#### ").count(), Principle::COUNT);
    }
}
