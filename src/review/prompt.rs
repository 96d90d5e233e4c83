//! Prompt text sent to the generative model.
//!
//! The output-format block is assembled from the same heading constants the
//! extractor searches for.

use std::fmt::Write as _;

use super::{
    Principle, ReviewRecord, ANALYSIS_HEADING, BAD_POINTS_HEADING, GOOD_POINTS_HEADING,
    SUMMARY_HEADING,
};
use crate::domain::conversation::HistoryEntry;
use crate::domain::selection::LayerNode;

pub const REVIEW_SYSTEM_PROMPT: &str = "あなたはUXデザインの専門家です。ヤコブ・ニールセンの10ヒューリスティック原則に基づいて、Figmaのデザインを分析し、具体的で実用的なフィードバックを提供してください。";

pub const ANSWER_SYSTEM_PROMPT: &str =
    "あなたはUXデザインの専門家です。ユーザーの質問に対して、具体的で実用的な回答を提供してください。";

/// Placeholder for an absent prior review or empty history.
pub const NO_INFORMATION: &str = "情報なし";

/// Build the user message for a review request.
pub fn build_review_prompt(layers: &[LayerNode]) -> Result<String, serde_json::Error> {
    let layer_json = serde_json::to_string_pretty(layers)?;

    let mut prompt = String::new();
    prompt.push_str(
        "以下のFigmaレイヤー情報を分析し、ヤコブ・ニールセンの10ヒューリスティック原則に基づいてUXレビューを行ってください。\n\n",
    );

    prompt.push_str("## レイヤー情報\n");
    prompt.push_str(&layer_json);
    prompt.push_str("\n\n");

    prompt.push_str("## レビュー観点\nヤコブ・ニールセンの10ヒューリスティック原則:\n");
    for (i, principle) in Principle::ALL.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, principle.name());
    }
    prompt.push('\n');

    prompt.push_str("## 出力形式\n");
    prompt.push_str(
        "以下の見出しをそのまま使い、各見出しの後にコロンを付けて出力してください。見出しの間は空行で区切ってください:\n\n",
    );
    let _ = writeln!(prompt, "{}: （100-150文字の全体サマリー）", SUMMARY_HEADING);
    prompt.push('\n');
    let _ = writeln!(prompt, "{}:", GOOD_POINTS_HEADING);
    prompt.push_str("- （良い点を3-5項目）\n\n");
    let _ = writeln!(prompt, "{}:", BAD_POINTS_HEADING);
    prompt.push_str("- （改善点を3-5項目）\n\n");
    let _ = writeln!(prompt, "{}:", ANALYSIS_HEADING);
    for principle in Principle::ALL {
        let _ = writeln!(prompt, "{}: （分析）", principle.name());
    }
    prompt.push('\n');

    prompt.push_str("レビューは日本語で行ってください。\n");
    Ok(prompt)
}

/// Build the user message for a follow-up question.
pub fn build_answer_prompt(
    question: &str,
    review: Option<&ReviewRecord>,
    history: &[HistoryEntry],
) -> Result<String, serde_json::Error> {
    let review_text = match review {
        Some(review) => serde_json::to_string_pretty(review)?,
        None => NO_INFORMATION.to_string(),
    };

    let history_text = if history.is_empty() {
        NO_INFORMATION.to_string()
    } else {
        history
            .iter()
            .map(|entry| format!("{}: {}", entry.role.as_str(), entry.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!(
        "## 質問\n{}\n\n## レビュー結果\n{}\n\n## 過去の会話履歴\n{}\n\n上記の情報を参考に、質問に対して具体的で実用的な回答を日本語で提供してください。\n",
        question, review_text, history_text
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Role;
    use crate::review::extract;

    #[test]
    fn test_review_prompt_embeds_selection_and_headings() {
        let layers = vec![LayerNode::text("1:2", "Button Label", "Submit")];
        let prompt = build_review_prompt(&layers).unwrap();

        assert!(prompt.contains("\"characters\": \"Submit\""));
        assert!(prompt.contains("全体サマリー:"));
        assert!(prompt.contains("良い点:"));
        assert!(prompt.contains("改善点:"));
        assert!(prompt.contains("各ヒューリスティック原則ごとの詳細分析:"));
        for principle in Principle::ALL {
            assert!(prompt.contains(&format!("{}:", principle.name())));
        }
    }

    #[test]
    fn test_review_prompt_lists_principles_in_order() {
        let prompt = build_review_prompt(&[]).unwrap();
        let mut cursor = 0;
        for (i, principle) in Principle::ALL.iter().enumerate() {
            let line = format!("{}. {}", i + 1, principle.name());
            let pos = prompt[cursor..].find(&line).unwrap();
            cursor += pos + line.len();
        }
    }

    #[test]
    fn test_review_prompt_is_deterministic() {
        let layers = vec![LayerNode::text("1:2", "Label", "OK")];
        assert_eq!(build_review_prompt(&layers).unwrap(), build_review_prompt(&layers).unwrap());
    }

    #[test]
    fn test_answer_prompt_without_context() {
        let prompt = build_answer_prompt("色は適切ですか？", None, &[]).unwrap();
        assert!(prompt.starts_with("## 質問\n色は適切ですか？\n"));
        assert!(prompt.contains("## レビュー結果\n情報なし\n"));
        assert!(prompt.contains("## 過去の会話履歴\n情報なし\n"));
    }

    #[test]
    fn test_answer_prompt_with_review_and_history() {
        let review = extract("全体サマリー: 良好");
        let history = vec![
            HistoryEntry {
                role: Role::User,
                content: "最初の質問".to_string(),
            },
            HistoryEntry {
                role: Role::Assistant,
                content: "最初の回答".to_string(),
            },
        ];

        let prompt = build_answer_prompt("次の質問", Some(&review), &history).unwrap();
        assert!(prompt.contains("\"summary\": \"良好\""));
        assert!(prompt.contains("user: 最初の質問\nassistant: 最初の回答"));
    }
}
