//! Built-in Typst report template.
//!
//! Custom templates may use any subset of the placeholders below.

pub const PLACEHOLDERS: [&str; 5] = [
    "{{ANALYSIS_SUMMARY}}",
    "{{COEFFICIENT_TABLES}}",
    "{{EXPECTED_RETURNS}}",
    "{{ROLLING_SECTION}}",
    "{{PREDICTION_SECTION}}",
];

pub fn template() -> &'static str {
    r#"#set page(paper: "a4", margin: 2cm)
#set text(size: 10pt)
#set table(stroke: 0.5pt + gray, inset: 5pt)

#align(center)[
  #text(size: 18pt, weight: "bold")[Arbitrage Pricing Theory Factor Analysis]
]

= Analysis Summary

{{ANALYSIS_SUMMARY}}

= Factor Regressions

{{COEFFICIENT_TABLES}}

= APT Expected Returns

Expected return per period is the risk-free mean plus the sum of each
factor's beta times its mean premium over the risk-free rate.

{{EXPECTED_RETURNS}}

= Rolling Coefficients

{{ROLLING_SECTION}}

= Walk-Forward Predictions

{{PREDICTION_SECTION}}
"#
}
