//! Field extraction from cleaned recognition text.
//!
//! Everything here is an ordered chain of labeled-pattern rules with
//! fallbacks. Each rule is a data record (label synonyms + value pattern)
//! compiled once; adding a synonym means editing a table, not control flow.
//! Extraction never fails: when no rule matches, the field degrades to its
//! documented sentinel or default.

use std::sync::LazyLock;

use regex::Regex;

use super::record::{AttentionType, ExtractedRecord, ID_NOT_DETECTED, UNKNOWN_PATIENT};

/// A labeled-pattern rule: any synonym, an optional colon and whitespace,
/// then the value.
struct LabeledPattern {
    label: Regex,
    value: Regex,
}

impl LabeledPattern {
    /// `value` must contain exactly one capture group for the extracted text.
    fn new(synonyms: &[&str], value: &str) -> Self {
        let labels = synonyms
            .iter()
            .map(|synonym| regex::escape(synonym))
            .collect::<Vec<_>>()
            .join("|");
        let label = Regex::new(&format!("(?i)(?:{labels})"))
            .expect("label synonyms should form a valid pattern");
        let value = Regex::new(&format!(r"^[:\s]*{value}"))
            .expect("value pattern should be valid");
        Self { label, value }
    }

    /// The value following the first label occurrence that actually has one.
    ///
    /// Label occurrences are tried left to right, and the value pattern must
    /// match immediately after the label. A label with nothing usable after
    /// it is skipped, never reinterpreted as a shorter synonym plus value —
    /// `"NOMBRE COMPLETO"` on its own line extracts nothing.
    fn first_value<'t>(&self, text: &'t str) -> Option<&'t str> {
        for label in self.label.find_iter(text) {
            if let Some(captures) = self.value.captures(&text[label.end()..]) {
                let value = captures
                    .get(1)
                    .expect("value pattern has a capture group")
                    .as_str();
                return Some(value.trim());
            }
        }
        None
    }
}

/// Name labels seen on Spanish-language medical documents and IDs.
static NAME_LABELS: &[&str] = &[
    "NOMBRE COMPLETO",
    "Nombre",
    "Paciente",
    "A nombre de",
    "Sr/Sra",
    "Atención",
    "Nombres",
    "Apellidos",
];

/// National-ID labels. `CC` and `CEDULA` are Colombian, `DNI` regional.
static ID_LABELS: &[&str] = &[
    "CC",
    "DNI",
    "Cédula",
    "ID",
    "Documento",
    "Identificación",
    "D.N.I",
    "CEDULA",
    "NUMERO",
];

static NAME_RULE: LazyLock<LabeledPattern> = LazyLock::new(|| {
    // Letters (accented included) and spaces only, terminated by a line
    // break or the end of the text so a name never spans lines.
    LabeledPattern::new(NAME_LABELS, r"([A-Za-zÀ-ÿ ]{2,50})(?:\r?\n|$)")
});

static ID_RULE: LazyLock<LabeledPattern> =
    LazyLock::new(|| LabeledPattern::new(ID_LABELS, r"([0-9]{7,12})"));

/// Fallback: any standalone 7–12 digit run. ASCII boundaries, because OCR
/// text routinely glues digits onto accented words.
static STANDALONE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b[0-9]{7,12}\b)").expect("standalone-ID pattern should compile")
});

/// A line of nothing but uppercase letters and spaces, sized like a name.
static UPPERCASE_NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-ZÀ-Ÿ\s]{5,40}$").expect("uppercase-name pattern should compile")
});

/// Two or three capitalized words.
static MIXED_CASE_NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][a-zÀ-ÿ]+\s+[A-Z][a-zÀ-ÿ]+(?:\s+[A-Z][a-zÀ-ÿ]+)?$")
        .expect("mixed-case-name pattern should compile")
});

/// Document boilerplate that looks name-shaped on ID cards but never is.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)REPUBLICA|NACIMIENTO|EXPEDICION|IDENTIDAD|CEDULA|DOCUMENTO|FOLIO|PAGINA")
        .expect("boilerplate pattern should compile")
});

/// How many leading lines the name fallback inspects.
const NAME_FALLBACK_LINE_LIMIT: usize = 8;

/// Lines at or below this length are headers, noise, or field stubs.
const TRIVIAL_LINE_LENGTH: usize = 5;

/// Clinical-notes fallback excerpt length, in characters.
const NOTES_EXCERPT_LIMIT: usize = 300;

/// Attention-type keyword table. Order is the product's observed precedence:
/// a document mentioning both "cirugía" and "dental" is dental.
static ATTENTION_KEYWORDS: &[(AttentionType, &[&str])] = &[
    (
        AttentionType::Dental,
        &["dental", "diente", "limpieza", "extracción", "ortodoncia"],
    ),
    (
        AttentionType::Acoustic,
        &["acústica", "oído", "audiometría", "audición"],
    ),
    (
        AttentionType::Surgical,
        &["cirugía", "quirúrgico", "operación", "sala"],
    ),
];

/// A labeled diagnostic section to lift into the clinical notes.
struct Section {
    label: &'static str,
    pattern: Regex,
}

impl Section {
    fn new(label: &'static str, synonyms: &[&str]) -> Self {
        let alternatives = synonyms
            .iter()
            .map(|synonym| regex::escape(synonym))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("(?i)(?:{alternatives}):"))
            .expect("section label should form a valid pattern");
        Self { label, pattern }
    }

    /// Text following the label, up to a blank line, the next
    /// capitalized-word-colon label, or the end of the text.
    fn capture(&self, text: &str) -> Option<String> {
        let label = self.pattern.find(text)?;
        let rest = text[label.end()..].trim_start();
        if rest.is_empty() {
            return None;
        }
        let body = match SECTION_END.find(rest) {
            Some(end) => &rest[..end.start()],
            None => rest,
        };
        let body = body.trim();
        (!body.is_empty()).then(|| body.to_string())
    }
}

/// Terminates a section body: a blank line or the next `Word:` label.
static SECTION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n|\n[A-Z][a-z]+:").expect("section-end pattern should compile"));

/// Diagnostic sections, merged in this fixed order.
static SECTIONS: LazyLock<Vec<Section>> = LazyLock::new(|| {
    vec![
        Section::new("Diagnóstico", &["Diagnóstico", "Dx"]),
        Section::new("Observaciones", &["Observaciones"]),
        Section::new("Análisis", &["Análisis"]),
        Section::new("Resultados", &["Resultados"]),
        Section::new("Evolución", &["Evolución"]),
    ]
});

/// Convert cleaned recognition text into an [`ExtractedRecord`].
///
/// Total over all inputs: absence of a match always degrades to the
/// documented sentinel or default, never an error.
pub fn extract_fields(cleaned: &str, confidence: f32) -> ExtractedRecord {
    let name = NAME_RULE
        .first_value(cleaned)
        .map(str::to_string)
        .or_else(|| name_from_leading_lines(cleaned))
        .unwrap_or_else(|| UNKNOWN_PATIENT.to_string());

    let national_id = ID_RULE
        .first_value(cleaned)
        .or_else(|| STANDALONE_ID.find(cleaned).map(|m| m.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| ID_NOT_DETECTED.to_string());

    ExtractedRecord {
        name,
        national_id,
        attention_type: classify_attention(cleaned),
        clinical_notes: clinical_notes(cleaned),
        confidence: confidence.round().clamp(0.0, 100.0) as u8,
    }
}

/// Name fallback: scan the first few non-trivial lines for something
/// name-shaped, skipping document boilerplate and bare field labels.
/// Tuned for Latin-American ID card layouts.
fn name_from_leading_lines(text: &str) -> Option<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| line.chars().count() > TRIVIAL_LINE_LENGTH)
        .take(NAME_FALLBACK_LINE_LIMIT)
        .find(|line| {
            (UPPERCASE_NAME_LINE.is_match(line) || MIXED_CASE_NAME_LINE.is_match(line))
                && !BOILERPLATE.is_match(line)
                && !is_bare_name_label(line)
        })
        .map(str::to_string)
}

/// A line that is exactly a name label (e.g. `NOMBRE COMPLETO`) carries no
/// name, however name-shaped it looks.
fn is_bare_name_label(line: &str) -> bool {
    let line = line.to_lowercase();
    NAME_LABELS
        .iter()
        .any(|label| line == label.to_lowercase())
}

fn classify_attention(text: &str) -> AttentionType {
    let haystack = text.to_lowercase();
    for (attention, keywords) in ATTENTION_KEYWORDS {
        if keywords.iter().any(|keyword| haystack.contains(keyword)) {
            return *attention;
        }
    }
    AttentionType::GeneralConsultation
}

/// Merge labeled diagnostic sections, or fall back to a leading excerpt of
/// the cleaned text.
fn clinical_notes(text: &str) -> String {
    let found = SECTIONS
        .iter()
        .filter_map(|section| {
            section
                .capture(text)
                .map(|body| format!("{}: {}", section.label, body))
        })
        .collect::<Vec<_>>();
    if found.is_empty() {
        leading_excerpt(text, NOTES_EXCERPT_LIMIT)
    } else {
        found.join("\n\n")
    }
}

/// The first `limit` characters of `text`, with an ellipsis marker when
/// truncated. Counts characters, not bytes, so accented text never splits
/// mid-codepoint.
fn leading_excerpt(text: &str, limit: usize) -> String {
    let mut excerpt: String = text.chars().take(limit).collect();
    if text.chars().nth(limit).is_some() {
        excerpt.push_str("...");
    }
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractedRecord {
        extract_fields(text, 90.0)
    }

    #[test]
    fn name_after_full_label() {
        assert_eq!(extract("NOMBRE COMPLETO Juan Perez\n").name, "Juan Perez");
    }

    #[test]
    fn name_after_colon_label() {
        assert_eq!(extract("Nombre: Maria Lopez").name, "Maria Lopez");
    }

    #[test]
    fn name_label_on_next_line() {
        // The first label has no value after it; a later occurrence does.
        let record = extract("Paciente\nNombre: Maria Lopez");
        assert_eq!(record.name, "Maria Lopez");
    }

    #[test]
    fn bare_label_yields_sentinel() {
        // No value follows the label, and the label line itself must not be
        // mistaken for a name by the line fallback.
        assert_eq!(extract("NOMBRE COMPLETO").name, UNKNOWN_PATIENT);
    }

    #[test]
    fn name_fallback_accepts_uppercase_line() {
        let record = extract("REPUBLICA DE COLOMBIA\nJUAN PEREZ GOMEZ\n10.234.567");
        assert_eq!(record.name, "JUAN PEREZ GOMEZ");
    }

    #[test]
    fn name_fallback_accepts_capitalized_words() {
        assert_eq!(extract("factura 0017\nJuan Perez\ntotal 100").name, "Juan Perez");
    }

    #[test]
    fn name_fallback_rejects_boilerplate() {
        let record = extract("CEDULA DE CIUDADANIA\nFECHA DE NACIMIENTO\nLUGAR DE EXPEDICION");
        assert_eq!(record.name, UNKNOWN_PATIENT);
    }

    #[test]
    fn name_fallback_only_scans_leading_lines() {
        let mut text = String::new();
        for i in 0..NAME_FALLBACK_LINE_LIMIT {
            text.push_str(&format!("registro 00{i}\n"));
        }
        text.push_str("Juan Perez\n");
        assert_eq!(extract(&text).name, UNKNOWN_PATIENT);
    }

    #[test]
    fn empty_and_whitespace_text_yield_sentinels() {
        for text in ["", " ", "\n\n\n"] {
            let record = extract(text);
            assert_eq!(record.name, UNKNOWN_PATIENT);
            assert_eq!(record.national_id, ID_NOT_DETECTED);
            assert_eq!(record.attention_type, AttentionType::GeneralConsultation);
        }
    }

    #[test]
    fn id_after_documento_label() {
        assert_eq!(extract("DOCUMENTO 12345678").national_id, "12345678");
    }

    #[test]
    fn labeled_id_beats_earlier_standalone_digits() {
        let record = extract("telefono 300123456\nCC 12345678");
        assert_eq!(record.national_id, "12345678");
    }

    #[test]
    fn standalone_digits_as_fallback() {
        assert_eq!(extract("registro 10234567 archivado").national_id, "10234567");
    }

    #[test]
    fn digit_runs_outside_7_to_12_are_ignored() {
        let record = extract("tel 123456 ref 1234567890123");
        assert_eq!(record.national_id, ID_NOT_DETECTED);
    }

    #[test]
    fn no_id_yields_sentinel() {
        assert_eq!(extract("Random text without ID").national_id, ID_NOT_DETECTED);
    }

    #[test]
    fn classification_dental_before_surgical() {
        // Both keyword families present; dental is checked first.
        let record = extract("cirugía programada tras limpieza dental");
        assert_eq!(record.attention_type, AttentionType::Dental);
    }

    #[test]
    fn classification_single_categories() {
        assert_eq!(extract("audiometría de control").attention_type, AttentionType::Acoustic);
        assert_eq!(extract("pasa a sala de operación").attention_type, AttentionType::Surgical);
        assert_eq!(extract("EXTRACCIÓN programada").attention_type, AttentionType::Dental);
        assert_eq!(
            extract("control de rutina").attention_type,
            AttentionType::GeneralConsultation
        );
    }

    #[test]
    fn clinical_sections_merge_in_fixed_order() {
        // Sections appear reversed in the document but merge in the fixed
        // Diagnóstico-first order.
        let record = extract("Observaciones: Reposo\n\nDiagnóstico: Gripe común");
        assert_eq!(
            record.clinical_notes,
            "Diagnóstico: Gripe común\n\nObservaciones: Reposo"
        );
    }

    #[test]
    fn section_body_spans_lines_until_blank_line() {
        let record = extract("Observaciones: Reposo\nen casa\n\nsin mas");
        assert_eq!(record.clinical_notes, "Observaciones: Reposo\nen casa");
    }

    #[test]
    fn clinical_sections_scenario_from_blank_line_separated_text() {
        let record = extract("Diagnóstico: Gripe común\n\nObservaciones: Reposo");
        assert_eq!(
            record.clinical_notes,
            "Diagnóstico: Gripe común\n\nObservaciones: Reposo"
        );
    }

    #[test]
    fn dx_abbreviation_is_a_diagnostico_synonym() {
        assert_eq!(extract("Dx: Otitis media").clinical_notes, "Diagnóstico: Otitis media");
    }

    #[test]
    fn section_body_stops_at_next_label() {
        let record = extract("Resultados: dentro de rangos\nObservaciones: control");
        assert_eq!(
            record.clinical_notes,
            "Observaciones: control\n\nResultados: dentro de rangos"
        );
    }

    #[test]
    fn notes_fall_back_to_leading_excerpt() {
        let short = extract("sin encabezados reconocibles");
        assert_eq!(short.clinical_notes, "sin encabezados reconocibles");

        let long_text = "palabra ".repeat(60);
        let long = extract(&long_text);
        assert!(long.clinical_notes.ends_with("..."));
        assert_eq!(
            long.clinical_notes.chars().count(),
            NOTES_EXCERPT_LIMIT + 3
        );
    }

    #[test]
    fn confidence_is_rounded_and_clamped() {
        assert_eq!(extract_fields("", 86.6).confidence, 87);
        assert_eq!(extract_fields("", -3.0).confidence, 0);
        assert_eq!(extract_fields("", 250.0).confidence, 100);
    }
}
