//! Classification of the rows between a header and the first data row.
//!
//! Measurement sheets often carry a row of units and a row of free-text descriptions below the
//! channel names. Which row is which is decided by a [`HintPolicy`]; [`MeanLengthHints`] is the
//! default.

use crate::structure::inference::CellClass;

/// Attribute a hint row provides for its columns
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Hint {
    Unit,
    Description,
}

/// One cell of a candidate hint row
#[derive(Clone, Debug, PartialEq)]
pub struct HintCell {
    pub class: CellClass,
    /// Trimmed text, `None` for empty cells
    pub text: Option<String>,
}

/// Decides whether a row between header and data holds units, descriptions or neither.
pub trait HintPolicy: Send + Sync {
    /// Classifies the cells of one row, restricted to the channel columns.
    fn classify(&self, cells: &[HintCell]) -> Option<Hint>;
}

/// Units are short tokens, descriptions are longer prose.
///
/// Rows are candidates only when all their non-empty cells are text. Tokens wrapped in `[]`,
/// `()` or quotes are unwrapped first; a row made only of wrapped tokens, or whose mean token
/// length is below [`MeanLengthHints::UNIT_MAX_MEAN_LENGTH`], is a unit row.
#[derive(Copy, Clone, Debug, Default)]
pub struct MeanLengthHints;

impl MeanLengthHints {
    pub const UNIT_MAX_MEAN_LENGTH: f64 = 5.0;
}

impl HintPolicy for MeanLengthHints {
    fn classify(&self, cells: &[HintCell]) -> Option<Hint> {
        let mut count = 0usize;
        let mut length = 0usize;
        let mut all_wrapped = true;
        for cell in cells {
            let text = match &cell.text {
                Some(text) if !text.is_empty() => text,
                _ => continue,
            };
            if cell.class != CellClass::Text {
                return None;
            }
            let token = match unwrap_token(text) {
                Some(inner) => inner,
                None => {
                    all_wrapped = false;
                    text.as_str()
                }
            };
            count += 1;
            length += token.chars().count();
        }

        if count == 0 {
            None
        } else if all_wrapped || (length as f64 / count as f64) < Self::UNIT_MAX_MEAN_LENGTH {
            Some(Hint::Unit)
        } else {
            Some(Hint::Description)
        }
    }
}

/// Strips one pair of enclosing brackets, parentheses or quotes.
pub(crate) fn unwrap_token(token: &str) -> Option<&str> {
    const PAIRS: [(char, char); 4] = [('[', ']'), ('(', ')'), ('"', '"'), ('\'', '\'')];
    let token = token.trim();
    PAIRS.iter().find_map(|(open, close)| {
        token
            .strip_prefix(*open)
            .and_then(|rest| rest.strip_suffix(*close))
            .map(str::trim)
    })
}

/// Unit text of a unit-row cell, without enclosing brackets.
pub(crate) fn unit_text(token: &str) -> String {
    unwrap_token(token).unwrap_or(token.trim()).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(texts: &[&str]) -> Vec<HintCell> {
        texts
            .iter()
            .map(|text| HintCell {
                class: if text.is_empty() { CellClass::Empty } else { CellClass::Text },
                text: (!text.is_empty()).then(|| text.to_string()),
            })
            .collect()
    }

    #[test]
    fn short_tokens_are_units() {
        assert_eq!(MeanLengthHints.classify(&row(&["s", "km/h"])), Some(Hint::Unit));
        assert_eq!(MeanLengthHints.classify(&row(&["", "m", "V"])), Some(Hint::Unit));
    }

    #[test]
    fn wrapped_tokens_are_units() {
        assert_eq!(MeanLengthHints.classify(&row(&["[seconds]", "[kilometres/hour]"])), Some(Hint::Unit));
        assert_eq!(MeanLengthHints.classify(&row(&["(degC)", "\"bar\""])), Some(Hint::Unit));
    }

    #[test]
    fn long_tokens_are_descriptions() {
        let cells = row(&["elapsed time since start", "vehicle speed"]);
        assert_eq!(MeanLengthHints.classify(&cells), Some(Hint::Description));
    }

    #[test]
    fn rows_with_values_are_not_hints() {
        let mut cells = row(&["s", ""]);
        cells[1] = HintCell { class: CellClass::Number, text: Some("12".to_owned()) };
        assert_eq!(MeanLengthHints.classify(&cells), None);
        assert_eq!(MeanLengthHints.classify(&row(&["", ""])), None);
    }

    #[test]
    fn unit_text_strips_brackets() {
        assert_eq!(unit_text("[km/h]"), "km/h");
        assert_eq!(unit_text(" ( s ) "), "s");
        assert_eq!(unit_text("m/s"), "m/s");
        assert_eq!(unwrap_token("km/h"), None);
    }
}
