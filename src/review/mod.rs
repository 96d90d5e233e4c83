//! UX review model and the text protocol around it.
//!
//! The generative model is asked (see [`prompt`]) to answer with a fixed set of
//! Japanese headings, and [`extract`] recovers a [`ReviewRecord`] from whatever
//! text comes back. Both sides read the heading literals from this module, so a
//! change to the vocabulary has to happen here and nowhere else.

pub mod extract;
pub mod prompt;
pub mod render;

pub use extract::extract;
pub use prompt::{build_answer_prompt, build_review_prompt};
pub use render::format_review_markdown;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Heading that introduces the overall summary.
pub const SUMMARY_HEADING: &str = "全体サマリー";
/// Heading that introduces the positive points.
pub const GOOD_POINTS_HEADING: &str = "良い点";
/// Heading that introduces the negative points.
pub const BAD_POINTS_HEADING: &str = "改善点";
/// Heading that opens the per-principle analysis block.
pub const ANALYSIS_HEADING: &str = "各ヒューリスティック原則ごとの詳細分析";
/// Prefix of [`ANALYSIS_HEADING`] that terminates the negative points block.
pub const ANALYSIS_HEADING_PREFIX: &str = "各ヒューリスティック";

pub const SUMMARY_MISSING: &str = "全体サマリーが見つかりませんでした";
pub const GOOD_POINTS_MISSING: &str = "良い点が見つかりませんでした";
pub const BAD_POINTS_MISSING: &str = "改善点が見つかりませんでした";
pub const ANALYSIS_MISSING: &str = "分析情報なし";

pub const PARSE_FAILED_SUMMARY: &str = "レスポンスのパースに失敗しました";
pub const PARSE_FAILED_POINT: &str = "パースエラーが発生しました";

/// Nielsen's ten usability heuristics, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principle {
    VisibilityOfSystemStatus,
    MatchWithRealWorld,
    UserControlAndFreedom,
    ConsistencyAndStandards,
    ErrorPrevention,
    RecognitionRatherThanRecall,
    FlexibilityAndEfficiency,
    AestheticAndMinimalistDesign,
    ErrorRecovery,
    HelpAndDocumentation,
}

impl Principle {
    pub const COUNT: usize = 10;

    pub const ALL: [Principle; Principle::COUNT] = [
        Principle::VisibilityOfSystemStatus,
        Principle::MatchWithRealWorld,
        Principle::UserControlAndFreedom,
        Principle::ConsistencyAndStandards,
        Principle::ErrorPrevention,
        Principle::RecognitionRatherThanRecall,
        Principle::FlexibilityAndEfficiency,
        Principle::AestheticAndMinimalistDesign,
        Principle::ErrorRecovery,
        Principle::HelpAndDocumentation,
    ];

    /// The heading literal used both in prompts and in model output.
    pub fn name(self) -> &'static str {
        match self {
            Principle::VisibilityOfSystemStatus => "システム状態の可視性",
            Principle::MatchWithRealWorld => "システムと実世界の一致",
            Principle::UserControlAndFreedom => "ユーザーコントロールと自由",
            Principle::ConsistencyAndStandards => "一貫性と標準",
            Principle::ErrorPrevention => "エラー防止",
            Principle::RecognitionRatherThanRecall => "認識よりも想起",
            Principle::FlexibilityAndEfficiency => "柔軟性と効率性",
            Principle::AestheticAndMinimalistDesign => "美的でミニマリストなデザイン",
            Principle::ErrorRecovery => "エラーの認識・診断・回復の手助け",
            Principle::HelpAndDocumentation => "ヘルプとドキュメント",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Exact-match lookup by heading literal.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The principle that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for Principle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-principle analysis text.
///
/// Always holds exactly one entry per [`Principle`]; serializes as a JSON
/// object keyed by principle name in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedAnalysis {
    entries: [String; Principle::COUNT],
}

impl DetailedAnalysis {
    /// Every principle set to `text`.
    pub fn filled(text: &str) -> Self {
        Self {
            entries: std::array::from_fn(|_| text.to_string()),
        }
    }

    pub fn get(&self, principle: Principle) -> &str {
        &self.entries[principle.index()]
    }

    pub fn set(&mut self, principle: Principle, text: impl Into<String>) {
        self.entries[principle.index()] = text.into();
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Principle, &str)> {
        Principle::ALL
            .into_iter()
            .zip(self.entries.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for DetailedAnalysis {
    fn default() -> Self {
        Self::filled(ANALYSIS_MISSING)
    }
}

impl Serialize for DetailedAnalysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Principle::COUNT))?;
        for (principle, text) in self.iter() {
            map.serialize_entry(principle.name(), text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DetailedAnalysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AnalysisVisitor;

        impl<'de> Visitor<'de> for AnalysisVisitor {
            type Value = DetailedAnalysis;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of principle names to analysis text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut analysis = DetailedAnalysis::default();
                while let Some(key) = access.next_key::<String>()? {
                    match Principle::from_name(&key) {
                        Some(principle) => analysis.set(principle, access.next_value::<String>()?),
                        None => {
                            access.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(analysis)
            }
        }

        deserializer.deserialize_map(AnalysisVisitor)
    }
}

/// Structured outcome of one UX review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub summary: String,
    pub good_points: Vec<String>,
    pub bad_points: Vec<String>,
    #[serde(default)]
    pub detailed_analysis: DetailedAnalysis,
}

impl ReviewRecord {
    /// Record returned when the extractor cannot run at all.
    pub fn parse_failed() -> Self {
        Self {
            summary: PARSE_FAILED_SUMMARY.to_string(),
            good_points: vec![PARSE_FAILED_POINT.to_string()],
            bad_points: vec![PARSE_FAILED_POINT.to_string()],
            detailed_analysis: DetailedAnalysis::filled(PARSE_FAILED_SUMMARY),
        }
    }
}
