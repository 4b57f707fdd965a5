//! Hidden-character detection for text shown to humans or executed as commands
//!
//! Four categories are tracked independently: zero-width characters, BiDi
//! overrides, Cyrillic/Greek homoglyphs and stray control characters.
//! [`sanitize`] strips or replaces all of them and reports what it found;
//! [`guard_command`] is the fail-closed variant used before a command is
//! surfaced, refusing outright when BiDi overrides are present.
//!
//! Sanitizing is idempotent: the normalized output of one pass contains none
//! of the tracked characters, so a second pass reports nothing.

mod tables;

use std::collections::HashMap;

use bitflags::bitflags;

use crate::error::{Result, RuntimeError};

use tables::{BIDI, ZERO_WIDTH};

bitflags! {
    /// Categories of suspicious characters found in a string
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SuspiciousKinds: u8 {
        /// Zero-width or invisible formatting characters
        const ZERO_WIDTH = 0b0001;
        /// BiDi override or isolate characters
        const BIDI_OVERRIDE = 0b0010;
        /// Cyrillic or Greek look-alikes of Latin letters
        const HOMOGLYPH = 0b0100;
        /// C0 or C1 control characters
        const CONTROL = 0b1000;
    }
}

/// One category-specific finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Zero-width character, stripped
    ZeroWidth {
        /// The character
        ch: char,
        /// Unicode name
        name: &'static str,
        /// Occurrences
        count: usize,
    },
    /// BiDi override or isolate, stripped
    BidiOverride {
        /// The character
        ch: char,
        /// Unicode name
        name: &'static str,
        /// Occurrences
        count: usize,
    },
    /// Homoglyph, replaced by its Latin look-alike
    Homoglyph {
        /// Original character
        source: char,
        /// Replacement
        target: char,
        /// Occurrences
        count: usize,
    },
    /// Control character, stripped
    Control {
        /// The character
        ch: char,
        /// Occurrences
        count: usize,
    },
}

/// Output of [`sanitize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeResult {
    /// Input as given
    pub original: String,
    /// Input with every finding stripped or replaced
    pub normalized: String,
    /// True iff any category produced a warning
    pub suspicious: bool,
    /// Human-readable findings, one per category, in category order
    pub warnings: Vec<String>,
    /// Structured findings
    pub findings: Vec<Finding>,
    /// Categories present
    pub kinds: SuspiciousKinds,
}

impl SanitizeResult {
    fn clean(input: &str) -> Self {
        Self {
            original: input.to_string(),
            normalized: input.to_string(),
            suspicious: false,
            warnings: Vec::new(),
            findings: Vec::new(),
            kinds: SuspiciousKinds::empty(),
        }
    }

    /// True when BiDi override characters were present
    #[must_use]
    pub fn has_bidi_override(&self) -> bool {
        self.kinds.contains(SuspiciousKinds::BIDI_OVERRIDE)
    }

    /// Distinct BiDi code points found, formatted as `U+XXXX`
    #[must_use]
    pub fn bidi_code_points(&self) -> Vec<String> {
        self.findings
            .iter()
            .filter_map(|finding| match finding {
                Finding::BidiOverride { ch, .. } => Some(code_point(*ch)),
                _ => None,
            })
            .collect()
    }
}

/// Format a character as `U+XXXX`
#[must_use]
pub fn code_point(c: char) -> String {
    format!("U+{:04X}", c as u32)
}

/// Fast check for any tracked character, without building a report
#[must_use]
pub fn has_suspicious_chars(input: &str) -> bool {
    input.chars().any(|c| {
        tables::is_stripped_control(c)
            || tables::zero_width_index(c).is_some()
            || tables::bidi_index(c).is_some()
            || tables::homoglyph_target(c).is_some()
    })
}

/// Detect and neutralize hidden or look-alike characters
#[must_use]
pub fn sanitize(input: &str) -> SanitizeResult {
    if !has_suspicious_chars(input) {
        return SanitizeResult::clean(input);
    }

    let mut normalized = String::with_capacity(input.len());
    let mut zero_width = [0usize; ZERO_WIDTH.len()];
    let mut bidi = [0usize; BIDI.len()];
    // (source, target, count) in first-seen order
    let mut homoglyphs: Vec<(char, char, usize)> = Vec::new();
    let mut controls: HashMap<char, usize> = HashMap::new();

    for c in input.chars() {
        if let Some(i) = tables::zero_width_index(c) {
            zero_width[i] += 1;
        } else if let Some(i) = tables::bidi_index(c) {
            bidi[i] += 1;
        } else if tables::is_stripped_control(c) {
            *controls.entry(c).or_default() += 1;
        } else if let Some(target) = tables::homoglyph_target(c) {
            match homoglyphs.iter_mut().find(|(source, _, _)| *source == c) {
                Some(entry) => entry.2 += 1,
                None => homoglyphs.push((c, target, 1)),
            }
            normalized.push(target);
        } else {
            normalized.push(c);
        }
    }

    let mut findings = Vec::new();
    let mut warnings = Vec::new();
    let mut kinds = SuspiciousKinds::empty();

    let zero_width_findings: Vec<Finding> = ZERO_WIDTH
        .iter()
        .zip(zero_width)
        .filter(|(_, count)| *count > 0)
        .map(|(&(ch, name), count)| Finding::ZeroWidth { ch, name, count })
        .collect();
    if !zero_width_findings.is_empty() {
        kinds |= SuspiciousKinds::ZERO_WIDTH;
        let total: usize = zero_width.iter().sum();
        let detail: Vec<String> = zero_width_findings
            .iter()
            .filter_map(|finding| match finding {
                Finding::ZeroWidth { ch, name, count } => {
                    Some(format!("{count}× {name} ({})", code_point(*ch)))
                }
                _ => None,
            })
            .collect();
        warnings.push(format!(
            "Removed {total} zero-width character(s): {}",
            detail.join(", ")
        ));
        findings.extend(zero_width_findings);
    }

    let bidi_findings: Vec<Finding> = BIDI
        .iter()
        .zip(bidi)
        .filter(|(_, count)| *count > 0)
        .map(|(&(ch, name), count)| Finding::BidiOverride { ch, name, count })
        .collect();
    if !bidi_findings.is_empty() {
        kinds |= SuspiciousKinds::BIDI_OVERRIDE;
        let total: usize = bidi.iter().sum();
        let detail: Vec<String> = bidi_findings
            .iter()
            .filter_map(|finding| match finding {
                Finding::BidiOverride { ch, name, count } => {
                    Some(format!("{count}× {name} ({})", code_point(*ch)))
                }
                _ => None,
            })
            .collect();
        warnings.push(format!(
            "DANGER: removed {total} BiDi override character(s) that can make displayed text differ from executed text: {}",
            detail.join(", ")
        ));
        findings.extend(bidi_findings);
    }

    if !homoglyphs.is_empty() {
        kinds |= SuspiciousKinds::HOMOGLYPH;
        let total: usize = homoglyphs.iter().map(|(_, _, count)| count).sum();
        let detail: Vec<String> = homoglyphs
            .iter()
            .map(|(source, target, _)| format!("{source}→{target}"))
            .collect();
        warnings.push(format!(
            "Replaced {total} homoglyph character(s): {}",
            detail.join(", ")
        ));
        findings.extend(
            homoglyphs
                .into_iter()
                .map(|(source, target, count)| Finding::Homoglyph {
                    source,
                    target,
                    count,
                }),
        );
    }

    if !controls.is_empty() {
        kinds |= SuspiciousKinds::CONTROL;
        let mut controls: Vec<(char, usize)> = controls.into_iter().collect();
        controls.sort_unstable_by_key(|(ch, _)| *ch);
        let total: usize = controls.iter().map(|(_, count)| count).sum();
        let detail: Vec<String> = controls.iter().map(|(ch, _)| code_point(*ch)).collect();
        warnings.push(format!(
            "Removed {total} control character(s): {}",
            detail.join(", ")
        ));
        findings.extend(
            controls
                .into_iter()
                .map(|(ch, count)| Finding::Control { ch, count }),
        );
    }

    SanitizeResult {
        original: input.to_string(),
        normalized,
        suspicious: !warnings.is_empty(),
        warnings,
        findings,
        kinds,
    }
}

/// Render the warnings of a result as a bullet list; empty when clean
#[must_use]
pub fn format_sanitize_warning(result: &SanitizeResult) -> String {
    if !result.suspicious {
        return String::new();
    }
    let mut out = String::from("Hidden or look-alike characters were found and neutralized:");
    for warning in &result.warnings {
        out.push_str("\n  • ");
        out.push_str(warning);
    }
    out
}

/// Command cleared for display or execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedCommand {
    /// Normalized command text
    pub command: String,
    /// Formatted warning when anything was neutralized
    pub warning: Option<String>,
}

/// Clear a command for display or execution
///
/// Zero-width, homoglyph and control findings are neutralized and reported
/// in `warning`. BiDi overrides are refused.
///
/// # Errors
/// Returns [`RuntimeError::SecurityViolation`] listing the offending code
/// points when BiDi override characters are present
pub fn guard_command(input: &str) -> Result<GuardedCommand> {
    let result = sanitize(input);
    if result.has_bidi_override() {
        let code_points = result.bidi_code_points();
        log::warn!(
            "Refused command containing BiDi override characters: {}",
            code_points.join(", ")
        );
        return Err(RuntimeError::SecurityViolation { code_points });
    }
    if result.suspicious {
        log::warn!("Neutralized suspicious characters in command: {:?}", result.warnings);
    }
    let warning = result
        .suspicious
        .then(|| format_sanitize_warning(&result));
    Ok(GuardedCommand {
        command: result.normalized,
        warning,
    })
}
