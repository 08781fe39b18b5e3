use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Upper bound for any date tolerance, in days.
pub const MAX_DATE_TOLERANCE_DAYS: u32 = 7;

/// Threshold reductions applied by the default pass ladder.
pub const MEDIUM_PASS_THRESHOLD_REDUCTION: u8 = 10;
pub const LENIENT_PASS_THRESHOLD_REDUCTION: u8 = 15;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub date_tolerance_days: u32,
    #[serde(default)]
    pub show_all_matches: bool,
    #[serde(default = "default_true")]
    pub multi_pass: bool,
    /// Rows with no date on both sides may be matched on names alone.
    #[serde(default)]
    pub allow_dateless: bool,
    #[serde(default)]
    pub date_order: DateOrder,
    #[serde(default)]
    pub unmatched_gss: UnmatchedPlacement,
    #[serde(default)]
    pub names: NameConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    /// Explicit pass ladder. Empty means "derive from threshold/tolerance".
    #[serde(default)]
    pub passes: Vec<PassSpec>,
    #[serde(default)]
    pub gss: TableConfig,
    #[serde(default)]
    pub opera: TableConfig,
}

fn default_name() -> String {
    "guest match".into()
}

fn default_threshold() -> u8 {
    85
}

fn default_true() -> bool {
    true
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            algorithm: Algorithm::default(),
            threshold: default_threshold(),
            date_tolerance_days: 0,
            show_all_matches: false,
            multi_pass: true,
            allow_dateless: false,
            date_order: DateOrder::default(),
            unmatched_gss: UnmatchedPlacement::default(),
            names: NameConfig::default(),
            scoring: ScoringConfig::default(),
            confidence: ConfidenceConfig::default(),
            passes: Vec::new(),
            gss: TableConfig::default(),
            opera: TableConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Algorithm {
    #[default]
    Ensemble,
    WeightedRatio,
    PartialRatio,
    JaroWinkler,
    TokenSortRatio,
    DoubleMetaphone,
    RecordLinkage,
    Semantic,
}

impl Algorithm {
    pub const ALL: [Algorithm; 8] = [
        Algorithm::Ensemble,
        Algorithm::WeightedRatio,
        Algorithm::PartialRatio,
        Algorithm::JaroWinkler,
        Algorithm::TokenSortRatio,
        Algorithm::DoubleMetaphone,
        Algorithm::RecordLinkage,
        Algorithm::Semantic,
    ];

    /// Stable config key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ensemble => "ensemble",
            Self::WeightedRatio => "weighted_ratio",
            Self::PartialRatio => "partial_ratio",
            Self::JaroWinkler => "jaro_winkler",
            Self::TokenSortRatio => "token_sort_ratio",
            Self::DoubleMetaphone => "double_metaphone",
            Self::RecordLinkage => "record_linkage",
            Self::Semantic => "semantic",
        }
    }

    /// Human label, as shown in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ensemble => "Ensemble",
            Self::WeightedRatio => "Weighted Ratio",
            Self::PartialRatio => "Partial Ratio",
            Self::JaroWinkler => "Jaro-Winkler",
            Self::TokenSortRatio => "Token Sort Ratio",
            Self::DoubleMetaphone => "Double Metaphone",
            Self::RecordLinkage => "Record Linkage",
            Self::Semantic => "Semantic Matching",
        }
    }

    /// Whether the cheap initial/length prefilter applies. Phonetic and
    /// whole-record strategies see spellings the prefilter would reject.
    pub fn uses_prefilter(&self) -> bool {
        !matches!(self, Self::DoubleMetaphone | Self::RecordLinkage | Self::Semantic)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Algorithm {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match folded.as_str() {
            "ensemble" => Ok(Self::Ensemble),
            "weighted_ratio" | "wratio" => Ok(Self::WeightedRatio),
            "partial_ratio" => Ok(Self::PartialRatio),
            "jaro_winkler" => Ok(Self::JaroWinkler),
            "token_sort_ratio" | "token_sort" => Ok(Self::TokenSortRatio),
            "double_metaphone" | "metaphone" => Ok(Self::DoubleMetaphone),
            "record_linkage" => Ok(Self::RecordLinkage),
            "semantic" | "semantic_matching" => Ok(Self::Semantic),
            _ => Err(MatchError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = MatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// Preferred reading of ambiguous `01/02/2024`-style dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

/// Where unmatched GSS rows land in the assembled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPlacement {
    /// At their GSS input position.
    #[default]
    Interleaved,
    /// After all matched rows.
    Appended,
}

// ---------------------------------------------------------------------------
// Names, scoring, confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    /// Strip accents, punctuation and stretched letters.
    pub normalize: bool,
    /// Map nicknames and spelling variants to a canonical first name.
    pub first_name_variants: bool,
    /// Keep particles like "van der" attached to the surname.
    pub compound_surnames: bool,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            first_name_variants: true,
            compound_surnames: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub exact_date_name: u8,
    pub exact_date_combined: u8,
    pub close_date_name: u8,
    pub close_date_combined: u8,
    /// Apply the combined-score date boosts.
    pub date_bonus: bool,
    /// Added to a below-threshold score when surname Soundex codes agree. 0 disables.
    pub phonetic_bonus: u8,
    /// Double Metaphone score when only a secondary code agrees.
    pub phonetic_partial_credit: u8,
    /// Reject hopeless pairs before detailed scoring.
    pub prefilter: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            exact_date_name: 3,
            exact_date_combined: 10,
            close_date_name: 1,
            close_date_combined: 5,
            date_bonus: true,
            phonetic_bonus: 0,
            phonetic_partial_credit: 50,
            prefilter: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub high: u8,
    pub medium: u8,
    pub low: u8,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high: 90,
            medium: 80,
            low: 70,
        }
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PassSpec {
    pub label: String,
    pub threshold: u8,
    #[serde(default)]
    pub date_tolerance_days: u32,
    #[serde(default)]
    pub allow_dateless: bool,
}

impl PassSpec {
    pub fn new(label: &str, threshold: u8, date_tolerance_days: u32, allow_dateless: bool) -> Self {
        Self {
            label: label.into(),
            threshold,
            date_tolerance_days,
            allow_dateless,
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Logical field -> physical column for one input table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Single "First Last" column, used when first/last are not mapped.
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Intent-to-return score (GSS side only).
    #[serde(default)]
    pub itr: Option<String>,
}

impl ColumnMapping {
    pub fn split(first_name: &str, last_name: &str, date: &str) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            date: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn full(full_name: &str, date: &str) -> Self {
        Self {
            full_name: Some(full_name.into()),
            date: Some(date.into()),
            ..Self::default()
        }
    }

    fn has_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.full_name.is_some()
    }

    /// Every column this mapping refers to.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        [
            &self.first_name,
            &self.last_name,
            &self.full_name,
            &self.date,
            &self.itr,
        ]
        .into_iter()
        .filter_map(|c| c.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub columns: ColumnMapping,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    /// Config for `algorithm` with default options and the given column mappings.
    pub fn new(algorithm: Algorithm, gss: ColumnMapping, opera: ColumnMapping) -> Self {
        Self {
            algorithm,
            gss: TableConfig { file: None, columns: gss },
            opera: TableConfig { file: None, columns: opera },
            ..Self::default()
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.threshold > 100 {
            return Err(MatchError::ConfigValidation(format!(
                "threshold must be 0-100, got {}",
                self.threshold
            )));
        }
        if self.date_tolerance_days > MAX_DATE_TOLERANCE_DAYS {
            return Err(MatchError::ConfigValidation(format!(
                "date_tolerance_days must be 0-{MAX_DATE_TOLERANCE_DAYS}, got {}",
                self.date_tolerance_days
            )));
        }

        let c = &self.confidence;
        if c.high > 100 || c.high < c.medium || c.medium < c.low {
            return Err(MatchError::ConfigValidation(format!(
                "confidence bands must satisfy 100 >= high >= medium >= low, got {}/{}/{}",
                c.high, c.medium, c.low
            )));
        }
        if self.scoring.phonetic_partial_credit > 100 {
            return Err(MatchError::ConfigValidation(format!(
                "phonetic_partial_credit must be 0-100, got {}",
                self.scoring.phonetic_partial_credit
            )));
        }

        let mut labels = std::collections::HashSet::new();
        for pass in &self.passes {
            if pass.label.trim().is_empty() {
                return Err(MatchError::ConfigValidation("pass label must not be empty".into()));
            }
            if !labels.insert(pass.label.as_str()) {
                return Err(MatchError::ConfigValidation(format!(
                    "duplicate pass label '{}'",
                    pass.label
                )));
            }
            if pass.threshold > 100 {
                return Err(MatchError::ConfigValidation(format!(
                    "pass '{}': threshold must be 0-100, got {}",
                    pass.label, pass.threshold
                )));
            }
            if pass.date_tolerance_days > MAX_DATE_TOLERANCE_DAYS {
                return Err(MatchError::ConfigValidation(format!(
                    "pass '{}': date_tolerance_days must be 0-{MAX_DATE_TOLERANCE_DAYS}, got {}",
                    pass.label, pass.date_tolerance_days
                )));
            }
        }

        for (table, t) in [("gss", &self.gss), ("opera", &self.opera)] {
            if !t.columns.has_name() {
                return Err(MatchError::ConfigValidation(format!(
                    "{table}: map at least one of first_name, last_name, full_name"
                )));
            }
            let dateless_somewhere =
                self.allow_dateless || self.passes.iter().any(|p| p.allow_dateless);
            if t.columns.date.is_none() && !dateless_somewhere {
                return Err(MatchError::ConfigValidation(format!(
                    "{table}: no date column mapped and date-less matching is disabled"
                )));
            }
        }

        Ok(())
    }

    /// The ordered passes this config runs, strictest first.
    pub fn pass_ladder(&self) -> Vec<PassSpec> {
        if !self.passes.is_empty() {
            return self.passes.clone();
        }
        if !self.multi_pass {
            return vec![PassSpec::new(
                "single",
                self.threshold,
                self.date_tolerance_days,
                self.allow_dateless,
            )];
        }

        let tol = self.date_tolerance_days;
        let mut ladder = vec![
            PassSpec::new("strict", self.threshold, 0, false),
            PassSpec::new(
                "medium",
                self.threshold.saturating_sub(MEDIUM_PASS_THRESHOLD_REDUCTION),
                tol,
                false,
            ),
            PassSpec::new(
                "lenient",
                self.threshold.saturating_sub(LENIENT_PASS_THRESHOLD_REDUCTION),
                tol,
                false,
            ),
        ];
        if self.allow_dateless {
            ladder.push(PassSpec::new("name-only", self.threshold, tol, true));
        }
        ladder
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "March survey"
algorithm = "ensemble"
threshold = 85
date_tolerance_days = 2

[gss]
file = "gss.csv"
[gss.columns]
first_name = "First Name"
last_name  = "Last Name"
date       = "Arrival"
itr        = "ITR"

[opera]
file = "opera.csv"
[opera.columns]
full_name = "Guest"
date      = "Date"
"#;

    #[test]
    fn parse_valid() {
        let config = MatchConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "March survey");
        assert_eq!(config.algorithm, Algorithm::Ensemble);
        assert_eq!(config.threshold, 85);
        assert_eq!(config.date_tolerance_days, 2);
        assert!(config.multi_pass);
        assert!(!config.show_all_matches);
        assert_eq!(config.gss.file.as_deref(), Some("gss.csv"));
        assert_eq!(config.gss.columns.itr.as_deref(), Some("ITR"));
        assert_eq!(config.opera.columns.full_name.as_deref(), Some("Guest"));
        assert_eq!(config.scoring.exact_date_combined, 10);
        assert_eq!(config.confidence.high, 90);
    }

    #[test]
    fn algorithm_accepts_display_labels() {
        assert_eq!("Semantic Matching".parse::<Algorithm>().unwrap(), Algorithm::Semantic);
        assert_eq!("Jaro-Winkler".parse::<Algorithm>().unwrap(), Algorithm::JaroWinkler);
        assert_eq!("Weighted Ratio".parse::<Algorithm>().unwrap(), Algorithm::WeightedRatio);
        for alg in Algorithm::ALL {
            assert_eq!(alg.key().parse::<Algorithm>().unwrap(), alg);
            assert_eq!(alg.label().parse::<Algorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn reject_unknown_algorithm() {
        let input = VALID.replace("\"ensemble\"", "\"soundalike\"");
        let err = MatchConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("soundalike"), "{err}");
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let input = VALID.replace("threshold = 85", "threshold = 101");
        let err = MatchConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("threshold must be 0-100"));
    }

    #[test]
    fn reject_tolerance_out_of_range() {
        let input = VALID.replace("date_tolerance_days = 2", "date_tolerance_days = 8");
        let err = MatchConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("date_tolerance_days"));
    }

    #[test]
    fn reject_missing_name_columns() {
        let input = VALID.replace("full_name = \"Guest\"", "");
        let err = MatchConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("opera"));
    }

    #[test]
    fn reject_inverted_confidence_bands() {
        let input = format!("{VALID}\n[confidence]\nhigh = 70\nmedium = 80\nlow = 60\n");
        let err = MatchConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("confidence bands"));
    }

    #[test]
    fn default_ladder_is_strict_medium_lenient() {
        let config = MatchConfig::from_toml(VALID).unwrap();
        let ladder = config.pass_ladder();
        let labels: Vec<&str> = ladder.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["strict", "medium", "lenient"]);
        assert_eq!(ladder[0].threshold, 85);
        assert_eq!(ladder[0].date_tolerance_days, 0);
        assert_eq!(ladder[1].threshold, 75);
        assert_eq!(ladder[2].threshold, 70);
        assert_eq!(ladder[2].date_tolerance_days, 2);
    }

    #[test]
    fn ladder_adds_name_only_pass() {
        let input = VALID.replace("threshold = 85", "threshold = 85\nallow_dateless = true");
        let config = MatchConfig::from_toml(&input).unwrap();
        let ladder = config.pass_ladder();
        assert_eq!(ladder.len(), 4);
        assert_eq!(ladder[3].label, "name-only");
        assert!(ladder[3].allow_dateless);
    }

    #[test]
    fn single_pass_ladder() {
        let input = VALID.replace("threshold = 85", "threshold = 85\nmulti_pass = false");
        let config = MatchConfig::from_toml(&input).unwrap();
        assert_eq!(
            config.pass_ladder(),
            vec![PassSpec::new("single", 85, 2, false)]
        );
    }

    #[test]
    fn explicit_passes_override_ladder() {
        let input = format!(
            r#"{VALID}
[[passes]]
label = "exact"
threshold = 95

[[passes]]
label = "loose"
threshold = 80
date_tolerance_days = 3
"#
        );
        let config = MatchConfig::from_toml(&input).unwrap();
        let ladder = config.pass_ladder();
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder[1], PassSpec::new("loose", 80, 3, false));
    }

    #[test]
    fn reject_duplicate_pass_labels() {
        let input = format!(
            "{VALID}\n[[passes]]\nlabel = \"a\"\nthreshold = 90\n\n[[passes]]\nlabel = \"a\"\nthreshold = 80\n"
        );
        let err = MatchConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate pass label"));
    }
}
