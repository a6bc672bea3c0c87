//! Intent labels and model-output normalisation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PatisserieError;

/// What a customer wants from a message.
///
/// The declared order is load-bearing: [`Label::from_model_output`] scans
/// labels in this order and the first contained label wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    OrderDessert,
    AskRecommendation,
    CheckIngredients,
    Goodbye,
}

impl Intent {
    /// All intents in declared order.
    pub const ALL: [Intent; 5] = [
        Intent::Greeting,
        Intent::OrderDessert,
        Intent::AskRecommendation,
        Intent::CheckIngredients,
        Intent::Goodbye,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::OrderDessert => "order_dessert",
            Self::AskRecommendation => "ask_recommendation",
            Self::CheckIngredients => "check_ingredients",
            Self::Goodbye => "goodbye",
        }
    }

    /// Comma separated label list, as shown to the model.
    pub fn label_list() -> String {
        Self::ALL
            .iter()
            .map(Intent::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = PatisserieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == needle)
            .ok_or_else(|| PatisserieError::InvalidInput(format!("unknown intent '{s}'")))
    }
}

/// A classifier verdict: one of the five intents or a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Label {
    Intent(Intent),
    /// The model answered, but with no known label in its output.
    Unknown,
    /// The remote call failed.
    Error,
}

impl Label {
    /// Every label a classifier can return, intents first.
    pub const ALL: [Label; 7] = [
        Label::Intent(Intent::Greeting),
        Label::Intent(Intent::OrderDessert),
        Label::Intent(Intent::AskRecommendation),
        Label::Intent(Intent::CheckIngredients),
        Label::Intent(Intent::Goodbye),
        Label::Unknown,
        Label::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent(intent) => intent.as_str(),
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }

    pub fn intent(&self) -> Option<Intent> {
        match self {
            Self::Intent(intent) => Some(*intent),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Intent(_))
    }

    /// Position in [`Label::ALL`].
    pub(crate) fn ordinal(&self) -> usize {
        match self {
            Self::Intent(intent) => *intent as usize,
            Self::Unknown => 5,
            Self::Error => 6,
        }
    }

    /// Map raw completion text to a label.
    ///
    /// The output is lowercased and trimmed, then each intent is checked by
    /// substring containment in declared order; the first hit wins. No hit
    /// yields [`Label::Unknown`]. Containment tolerates punctuation and
    /// prefixes such as `"intent: goodbye."`, but would misfire if one label
    /// ever became a substring of another.
    pub fn from_model_output(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        Intent::ALL
            .into_iter()
            .find(|intent| normalized.contains(intent.as_str()))
            .map(Label::Intent)
            .unwrap_or(Label::Unknown)
    }
}

impl From<Intent> for Label {
    fn from(intent: Intent) -> Self {
        Label::Intent(intent)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl FromStr for Label {
    type Err = PatisserieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Ok(Label::Unknown),
            "error" => Ok(Label::Error),
            other => other.parse().map(Label::Intent),
        }
    }
}

// Deserialization goes through FromStr; the associated `Error` type of
// TryFrom would shadow the `Label::Error` variant inside the impl.
impl TryFrom<String> for Label {
    type Error = PatisserieError;

    fn try_from(value: String) -> Result<Self, PatisserieError> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_punctuation_still_matches() {
        assert_eq!(
            Label::from_model_output("order_dessert."),
            Label::Intent(Intent::OrderDessert)
        );
    }

    #[test]
    fn partial_label_is_unknown() {
        assert_eq!(Label::from_model_output("maybe dessert-ish"), Label::Unknown);
    }

    #[test]
    fn output_is_case_and_whitespace_insensitive() {
        assert_eq!(
            Label::from_model_output("  Intent: GOODBYE \n"),
            Label::Intent(Intent::Goodbye)
        );
    }

    #[test]
    fn first_declared_label_wins() {
        // both labels present; greeting is declared before goodbye
        assert_eq!(
            Label::from_model_output("goodbye or greeting"),
            Label::Intent(Intent::Greeting)
        );
    }

    #[test]
    fn empty_output_is_unknown() {
        assert_eq!(Label::from_model_output(""), Label::Unknown);
    }

    #[test]
    fn ordinals_match_all_table() {
        for (i, label) in Label::ALL.iter().enumerate() {
            assert_eq!(label.ordinal(), i);
        }
    }

    #[test]
    fn label_serializes_as_plain_string() {
        let json = serde_json::to_string(&Label::Intent(Intent::CheckIngredients)).unwrap();
        assert_eq!(json, "\"check_ingredients\"");
        let back: Label = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, Label::Error);
    }

    #[test]
    fn intent_parse_rejects_unknown_names() {
        assert!("dessert".parse::<Intent>().is_err());
        assert_eq!(" Greeting ".parse::<Intent>().unwrap(), Intent::Greeting);
    }
}
