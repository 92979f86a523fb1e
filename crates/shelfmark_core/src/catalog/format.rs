//! Custom identifier formats: segment documents, rendering and validation.
//!
//! A format is a JSON array of segment descriptors. Rendering walks the
//! segments in order and concatenates their expansions; unrecognized kinds
//! expand to nothing so that older documents keep rendering after a
//! vocabulary change.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{error::CatalogError, identity::InventoryId};

pub const DEFAULT_DATE_PATTERN: &str = "yyyyMMdd";
pub const DEFAULT_SEQUENCE_PATTERN: &str = "D3";

/// One entry of the stored segment document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Resolved segment behavior. `Unknown` covers kinds outside the current
/// vocabulary and renders as the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Fixed(String),
    Random20,
    Random32,
    DecimalPadded6,
    DecimalPadded9,
    ShortGuid,
    Date(Option<String>),
    Sequence(Option<String>),
    Unknown,
}

impl From<&SegmentSpec> for Segment {
    fn from(spec: &SegmentSpec) -> Self {
        let kind = spec.kind.as_str();
        if kind.eq_ignore_ascii_case("fixed") {
            Segment::Fixed(spec.value.clone().unwrap_or_default())
        } else if kind.eq_ignore_ascii_case("random20") {
            Segment::Random20
        } else if kind.eq_ignore_ascii_case("random32") {
            Segment::Random32
        } else if kind.eq_ignore_ascii_case("d6") {
            Segment::DecimalPadded6
        } else if kind.eq_ignore_ascii_case("d9") {
            Segment::DecimalPadded9
        } else if kind.eq_ignore_ascii_case("guid") {
            Segment::ShortGuid
        } else if kind.eq_ignore_ascii_case("date") {
            Segment::Date(spec.format.clone())
        } else if kind.eq_ignore_ascii_case("sequence") {
            Segment::Sequence(spec.format.clone())
        } else {
            Segment::Unknown
        }
    }
}

/// The stored custom identifier format of one inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomIdFormat {
    pub inventory_id: InventoryId,
    pub definition: Vec<SegmentSpec>,
    pub validation_pattern: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CustomIdFormat {
    /// The definition serialized back to its JSON document form.
    pub fn definition_json(&self) -> String {
        serde_json::to_string(&self.definition).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Parse a JSON segment document into its specs.
pub fn parse_definition(document: &str) -> Result<Vec<SegmentSpec>, CatalogError> {
    serde_json::from_str(document)
        .map_err(|e| CatalogError::ValidationFailed(format!("malformed segment document: {e}")))
}

/// Compile a validation pattern, anchoring it so that only full matches pass.
pub fn compile_pattern(pattern: &str) -> Result<Regex, CatalogError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| CatalogError::ValidationFailed(format!("invalid validation pattern: {e}")))
}

/// Check a candidate identifier against a stored format.
///
/// A missing format, a missing pattern or an empty pattern all accept any
/// value. An unparseable stored pattern rejects everything.
pub fn validate_value(format: Option<&CustomIdFormat>, value: &str) -> bool {
    match format.and_then(|f| f.validation_pattern.as_deref()) {
        None => true,
        Some(pattern) if pattern.is_empty() => true,
        Some(pattern) => {
            compile_pattern(pattern).map(|re| re.is_match(value)).unwrap_or(false)
        }
    }
}

/// A short random identifier: the first 8 hex digits of a v4 uuid.
pub fn short_guid() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Render a segment document into an identifier.
///
/// `sequence_value` is the per-inventory counter value consumed by this
/// rendering; it feeds every `sequence` segment in the document.
pub fn render(definition: &[SegmentSpec], sequence_value: i64, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::new();
    for spec in definition {
        match Segment::from(spec) {
            Segment::Fixed(text) => out.push_str(&text),
            Segment::Random20 => {
                out.push_str(&format!("{:05X}", rng.gen_range(0..(1u32 << 20))));
            }
            Segment::Random32 => {
                out.push_str(&format!("{:08X}", rng.gen_range(0..(1u64 << 32))));
            }
            Segment::DecimalPadded6 => {
                out.push_str(&format!("{:06}", rng.gen_range(0..1_000_000u32)));
            }
            Segment::DecimalPadded9 => {
                out.push_str(&format!("{:09}", rng.gen_range(0..1_000_000_000u32)));
            }
            Segment::ShortGuid => out.push_str(&short_guid()),
            Segment::Date(pattern) => {
                out.push_str(&format_date(now, pattern.as_deref().unwrap_or(DEFAULT_DATE_PATTERN)));
            }
            Segment::Sequence(pattern) => {
                out.push_str(&format_sequence(
                    sequence_value,
                    pattern.as_deref().unwrap_or(DEFAULT_SEQUENCE_PATTERN),
                ));
            }
            Segment::Unknown => {}
        }
    }
    out
}

/// Format a sequence value with a `D<width>` zero-padding pattern.
/// Anything else falls back to the plain decimal rendering.
pub fn format_sequence(value: i64, pattern: &str) -> String {
    if let Some(width) = pattern
        .strip_prefix('D')
        .or_else(|| pattern.strip_prefix('d'))
        .and_then(|w| w.parse::<usize>().ok())
    {
        format!("{value:0width$}")
    } else {
        value.to_string()
    }
}

/// Format a timestamp with a date pattern built from `y`, `M`, `d`, `H`,
/// `m` and `s` token runs. Other characters pass through verbatim.
pub fn format_date(now: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        match c {
            'y' => {
                if run >= 4 {
                    out.push_str(&format!("{:04}", now.year()));
                } else {
                    out.push_str(&format!("{:02}", now.year() % 100));
                }
            }
            'M' => out.push_str(&pad2(now.month(), run)),
            'd' => out.push_str(&pad2(now.day(), run)),
            'H' => out.push_str(&pad2(now.hour(), run)),
            'm' => out.push_str(&pad2(now.minute(), run)),
            's' => out.push_str(&pad2(now.second(), run)),
            other => {
                for _ in 0..run {
                    out.push(other);
                }
            }
        }
        i += run;
    }
    out
}

fn pad2(value: u32, run: usize) -> String {
    if run >= 2 { format!("{value:02}") } else { value.to_string() }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn march_7() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap()
    }

    #[test]
    fn unit_format_parse_definition_accepts_segment_document() {
        let specs = parse_definition(
            r#"[{"kind":"fixed","value":"SKU-"},{"kind":"sequence","format":"D3"}]"#,
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].kind, "fixed");
        assert_eq!(specs[0].value.as_deref(), Some("SKU-"));
        assert_eq!(specs[1].format.as_deref(), Some("D3"));
    }

    #[test]
    fn unit_format_parse_definition_rejects_malformed_document() {
        assert!(matches!(
            parse_definition("{not json"),
            Err(CatalogError::ValidationFailed(_))
        ));
        // An object is not a segment array either
        assert!(parse_definition(r#"{"kind":"fixed"}"#).is_err());
    }

    #[test]
    fn unit_format_segment_kind_is_case_insensitive() {
        let spec = SegmentSpec { kind: "FIXED".to_string(), value: Some("A".to_string()), format: None };
        assert_eq!(Segment::from(&spec), Segment::Fixed("A".to_string()));
        let spec = SegmentSpec { kind: "Guid".to_string(), value: None, format: None };
        assert_eq!(Segment::from(&spec), Segment::ShortGuid);
        let spec = SegmentSpec { kind: "barcode".to_string(), value: None, format: None };
        assert_eq!(Segment::from(&spec), Segment::Unknown);
    }

    #[test]
    fn unit_format_render_fixed_and_sequence() {
        let specs = parse_definition(
            r#"[{"kind":"fixed","value":"SKU-"},{"kind":"sequence","format":"D3"}]"#,
        )
        .unwrap();
        assert_eq!(render(&specs, 1, march_7()), "SKU-001");
        assert_eq!(render(&specs, 42, march_7()), "SKU-042");
        assert_eq!(render(&specs, 1234, march_7()), "SKU-1234");
    }

    #[test]
    fn unit_format_render_date_patterns() {
        assert_eq!(format_date(march_7(), "yyyyMMdd"), "20240307");
        assert_eq!(format_date(march_7(), "yy-M-d"), "24-3-7");
        assert_eq!(format_date(march_7(), "yyyy/MM/dd HH:mm:ss"), "2024/03/07 09:05:02");
    }

    #[test]
    fn unit_format_render_random_segments_have_fixed_width() {
        let specs = parse_definition(r#"[{"kind":"random20"}]"#).unwrap();
        for _ in 0..20 {
            let id = render(&specs, 1, march_7());
            assert_eq!(id.len(), 5);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
        let specs = parse_definition(r#"[{"kind":"random32"}]"#).unwrap();
        for _ in 0..20 {
            assert_eq!(render(&specs, 1, march_7()).len(), 8);
        }
        let specs = parse_definition(r#"[{"kind":"d6"}]"#).unwrap();
        for _ in 0..20 {
            let id = render(&specs, 1, march_7());
            assert_eq!(id.len(), 6);
            assert!(id.chars().all(|c| c.is_ascii_digit()));
        }
        let specs = parse_definition(r#"[{"kind":"d9"}]"#).unwrap();
        for _ in 0..20 {
            assert_eq!(render(&specs, 1, march_7()).len(), 9);
        }
    }

    #[test]
    fn unit_format_render_guid_segment_is_short_lowercase_hex() {
        let specs = parse_definition(r#"[{"kind":"guid"}]"#).unwrap();
        let id = render(&specs, 1, march_7());
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn unit_format_render_unknown_kind_and_empty_document() {
        let specs = parse_definition(r#"[{"kind":"barcode"},{"kind":"fixed","value":"X"}]"#).unwrap();
        assert_eq!(render(&specs, 1, march_7()), "X");
        assert_eq!(render(&[], 1, march_7()), "");
    }

    #[test]
    fn unit_format_sequence_pattern_fallback() {
        assert_eq!(format_sequence(7, "D3"), "007");
        assert_eq!(format_sequence(7, "d5"), "00007");
        assert_eq!(format_sequence(7, "hex"), "7");
        assert_eq!(format_sequence(1234, "D3"), "1234");
    }

    #[test]
    fn unit_format_validate_requires_full_match() {
        let format = CustomIdFormat {
            inventory_id: InventoryId(1),
            definition: vec![],
            validation_pattern: Some(r"SKU-\d{3}".to_string()),
            updated_at: march_7(),
        };
        assert!(validate_value(Some(&format), "SKU-001"));
        assert!(!validate_value(Some(&format), "xSKU-001"));
        assert!(!validate_value(Some(&format), "SKU-0012"));
        // Case sensitive
        assert!(!validate_value(Some(&format), "sku-001"));
    }

    #[test]
    fn unit_format_validate_alternation_is_anchored_as_a_whole() {
        let format = CustomIdFormat {
            inventory_id: InventoryId(1),
            definition: vec![],
            validation_pattern: Some("a|aa".to_string()),
            updated_at: march_7(),
        };
        assert!(validate_value(Some(&format), "a"));
        assert!(validate_value(Some(&format), "aa"));
        assert!(!validate_value(Some(&format), "aaa"));
    }

    #[test]
    fn unit_format_validate_missing_or_empty_pattern_accepts_all() {
        assert!(validate_value(None, "anything"));
        let format = CustomIdFormat {
            inventory_id: InventoryId(1),
            definition: vec![],
            validation_pattern: None,
            updated_at: march_7(),
        };
        assert!(validate_value(Some(&format), "anything"));
        let format = CustomIdFormat { validation_pattern: Some(String::new()), ..format };
        assert!(validate_value(Some(&format), ""));
    }

    #[test]
    fn unit_format_compile_pattern_rejects_bad_regex() {
        assert!(matches!(compile_pattern("("), Err(CatalogError::ValidationFailed(_))));
    }

    #[test]
    fn unit_format_definition_json_round_trip() {
        let document = r#"[{"kind":"fixed","value":"SKU-"},{"kind":"sequence","format":"D3"}]"#;
        let format = CustomIdFormat {
            inventory_id: InventoryId(1),
            definition: parse_definition(document).unwrap(),
            validation_pattern: None,
            updated_at: march_7(),
        };
        assert_eq!(format.definition_json(), document);
    }
}
