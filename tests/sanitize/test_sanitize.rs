//! Tests for hidden-character sanitizing

use kodegen_agent_runtime::sanitize::{
    Finding, SuspiciousKinds, format_sanitize_warning, guard_command, has_suspicious_chars,
    sanitize,
};
use kodegen_agent_runtime::RuntimeError;

#[test]
fn test_clean_input_passes_through() {
    let result = sanitize("cargo test --all -- --nocapture\n\tdone");
    assert!(!result.suspicious);
    assert_eq!(result.normalized, result.original);
    assert!(result.warnings.is_empty());
    assert!(result.kinds.is_empty());
    assert_eq!(format_sanitize_warning(&result), "");
}

#[test]
fn test_cyrillic_paypal() {
    let result = sanitize("p\u{0430}yp\u{0430}l.com");
    assert!(result.suspicious);
    assert_eq!(result.normalized, "paypal.com");
    assert_eq!(result.kinds, SuspiciousKinds::HOMOGLYPH);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Replaced 2 homoglyph"));
    assert!(result.warnings[0].contains("а→a"));
    assert_eq!(
        result.findings,
        vec![Finding::Homoglyph {
            source: '\u{0430}',
            target: 'a',
            count: 2
        }]
    );
}

#[test]
fn test_greek_and_digit_lookalikes() {
    let result = sanitize("\u{0391}PI_\u{0417}");
    assert_eq!(result.normalized, "API_3");
}

#[test]
fn test_zero_width_counts_per_class() {
    let result = sanitize("r\u{200B}m \u{200B}-rf\u{FEFF} /");
    assert_eq!(result.normalized, "rm -rf /");
    assert_eq!(result.kinds, SuspiciousKinds::ZERO_WIDTH);
    assert!(result.warnings[0].starts_with("Removed 3 zero-width character(s)"));
    assert!(result.warnings[0].contains("2× ZERO WIDTH SPACE (U+200B)"));
    assert!(result.warnings[0].contains("1× ZERO WIDTH NO-BREAK SPACE (U+FEFF)"));
}

#[test]
fn test_control_characters_stripped_whitespace_kept() {
    let result = sanitize("echo\u{0007} hi\u{009B}\n\tok\r");
    assert_eq!(result.normalized, "echo hi\n\tok\r");
    assert_eq!(result.kinds, SuspiciousKinds::CONTROL);
    assert_eq!(
        result.warnings,
        vec!["Removed 2 control character(s): U+0007, U+009B".to_string()]
    );
}

#[test]
fn test_bidi_detected_and_stripped() {
    let result = sanitize("ls \u{202E}gpj.exe");
    assert!(result.has_bidi_override());
    assert_eq!(result.normalized, "ls gpj.exe");
    assert_eq!(result.bidi_code_points(), vec!["U+202E".to_string()]);
    assert!(result.warnings[0].starts_with("DANGER"));
}

#[test]
fn test_warnings_follow_category_order() {
    let result = sanitize("\u{0007}\u{0430}\u{2066}\u{200D}x");
    assert_eq!(result.normalized, "ax");
    assert_eq!(result.warnings.len(), 4);
    assert!(result.warnings[0].contains("zero-width"));
    assert!(result.warnings[1].contains("BiDi"));
    assert!(result.warnings[2].contains("homoglyph"));
    assert!(result.warnings[3].contains("control"));
    assert_eq!(result.kinds, SuspiciousKinds::all());
}

#[test]
fn test_sanitize_is_idempotent() {
    let inputs = [
        "p\u{0430}yp\u{0430}l.com",
        "a\u{200B}b\u{202E}c\u{0001}d",
        "\u{0405}\u{0435}\u{0441}ret \u{2069}",
        "plain",
    ];
    for input in inputs {
        let once = sanitize(input);
        let twice = sanitize(&once.normalized);
        assert!(!twice.suspicious, "second pass flagged {input:?}");
        assert_eq!(twice.normalized, once.normalized);
    }
}

#[test]
fn test_has_suspicious_chars_matches_sanitize() {
    for input in ["ok", "z\u{200C}", "\u{202D}", "\u{043E}", "\u{001B}[31m", "tab\tnl\n"] {
        assert_eq!(has_suspicious_chars(input), sanitize(input).suspicious, "{input:?}");
    }
}

#[test]
fn test_format_sanitize_warning_bullets() {
    let result = sanitize("\u{200B}\u{0430}");
    let formatted = format_sanitize_warning(&result);
    let lines: Vec<&str> = formatted.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("  • Removed 1 zero-width"));
    assert!(lines[2].starts_with("  • Replaced 1 homoglyph"));
}

#[test]
fn test_guard_command_refuses_bidi() {
    let err = guard_command("cat notes\u{202E}txt.sh \u{2067}").unwrap_err();
    match err {
        RuntimeError::SecurityViolation { code_points } => {
            assert_eq!(code_points, vec!["U+202E".to_string(), "U+2067".to_string()]);
        }
        other => panic!("expected security violation, got {other:?}"),
    }
}

#[test]
fn test_guard_command_neutralizes_other_findings() {
    let guarded = guard_command("curl https://p\u{0430}ypal.com\u{200B}").unwrap();
    assert_eq!(guarded.command, "curl https://paypal.com");
    assert!(guarded.warning.unwrap().contains("homoglyph"));

    let clean = guard_command("git status").unwrap();
    assert_eq!(clean.command, "git status");
    assert!(clean.warning.is_none());
}
