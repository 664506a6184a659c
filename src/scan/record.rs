//! The structured record a scan produces.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sentinel name used when no patient name could be extracted.
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// Sentinel used when no national ID number could be extracted.
pub const ID_NOT_DETECTED: &str = "Not detected";

/// Initials reported for the sentinel name on anonymized channels.
const UNKNOWN_PATIENT_INITIALS: &str = "P. D.";

/// Classification of the attention a document describes.
///
/// Categories are tested in declaration order over the cleaned text and the
/// first match wins, so a document mentioning both "cirugía" and "dental"
/// classifies as dental. The ordering is observed product behavior, kept
/// as-is.
#[derive(Clone, Copy, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionType {
    /// Dental work: checkups, cleanings, extractions, orthodontics.
    Dental,

    /// Hearing evaluation: audiometry, ear complaints.
    Acoustic,

    /// Surgical procedures and operating-room paperwork.
    Surgical,

    /// Anything else.
    #[default]
    GeneralConsultation,
}

impl fmt::Display for AttentionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttentionType::Dental => "Dental Review",
            AttentionType::Acoustic => "Acoustic Evaluation",
            AttentionType::Surgical => "Surgery",
            AttentionType::GeneralConsultation => "General Consultation",
        };
        f.write_str(label)
    }
}

/// The terminal output of one scan.
///
/// Every field is best-effort: extraction failures degrade to the documented
/// sentinel or default instead of erroring, so a record always exists for a
/// human to review and correct. Downstream record-creation, document
/// rendering, and notification workflows all consume this type.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
pub struct ExtractedRecord {
    /// Patient name, or [`UNKNOWN_PATIENT`].
    pub name: String,

    /// National ID number (7–12 digits), or [`ID_NOT_DETECTED`].
    pub national_id: String,

    /// Attention-type classification of the document.
    pub attention_type: AttentionType,

    /// Merged diagnostic sections, or a truncated excerpt of the cleaned
    /// text when no labeled section was found.
    pub clinical_notes: String,

    /// Recognition confidence, 0–100. A calibration signal only; low
    /// confidence never rejects a scan.
    pub confidence: u8,
}

impl ExtractedRecord {
    /// Initials for notification channels that must not carry the full name.
    ///
    /// The sentinel name maps to the fixed abbreviation `"P. D."`; otherwise
    /// each space-separated word contributes its uppercased first letter:
    /// `"Juan Perez"` becomes `"J. P."`.
    pub fn anonymized_initials(&self) -> String {
        anonymized_initials(&self.name)
    }
}

/// See [`ExtractedRecord::anonymized_initials`].
pub fn anonymized_initials(name: &str) -> String {
    if name.trim().is_empty() || name == UNKNOWN_PATIENT {
        return UNKNOWN_PATIENT_INITIALS.to_string();
    }
    let mut initials = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .map(|c| c.to_uppercase().to_string())
        .collect::<Vec<_>>()
        .join(". ");
    initials.push('.');
    initials
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_for_sentinel_and_empty() {
        assert_eq!(anonymized_initials(UNKNOWN_PATIENT), "P. D.");
        assert_eq!(anonymized_initials(""), "P. D.");
        assert_eq!(anonymized_initials("   "), "P. D.");
    }

    #[test]
    fn initials_from_full_name() {
        assert_eq!(anonymized_initials("Juan Perez"), "J. P.");
        assert_eq!(anonymized_initials("maria fernanda lopez"), "M. F. L.");
        assert_eq!(anonymized_initials("Álvaro Núñez"), "Á. N.");
    }

    #[test]
    fn attention_type_defaults_to_general_consultation() {
        assert_eq!(AttentionType::default(), AttentionType::GeneralConsultation);
        assert_eq!(
            AttentionType::GeneralConsultation.to_string(),
            "General Consultation"
        );
    }

    #[test]
    fn record_serializes_with_snake_case_classification() {
        let record = ExtractedRecord {
            name: "Juan Perez".to_string(),
            national_id: "12345678".to_string(),
            attention_type: AttentionType::Dental,
            clinical_notes: String::new(),
            confidence: 87,
        };
        let json = serde_json::to_string(&record).expect("record should serialize");
        assert!(json.contains(r#""attention_type":"dental""#));
    }
}
