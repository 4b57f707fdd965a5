//! Fixed character tables for hidden-character detection

/// Invisible characters stripped from text, with their Unicode names
pub(super) const ZERO_WIDTH: &[(char, &str)] = &[
    ('\u{200B}', "ZERO WIDTH SPACE"),
    ('\u{200C}', "ZERO WIDTH NON-JOINER"),
    ('\u{200D}', "ZERO WIDTH JOINER"),
    ('\u{FEFF}', "ZERO WIDTH NO-BREAK SPACE"),
    ('\u{2060}', "WORD JOINER"),
    ('\u{180E}', "MONGOLIAN VOWEL SEPARATOR"),
    ('\u{200E}', "LEFT-TO-RIGHT MARK"),
    ('\u{200F}', "RIGHT-TO-LEFT MARK"),
];

/// Directional embedding, override and isolate controls
pub(super) const BIDI: &[(char, &str)] = &[
    ('\u{202A}', "LEFT-TO-RIGHT EMBEDDING"),
    ('\u{202B}', "RIGHT-TO-LEFT EMBEDDING"),
    ('\u{202C}', "POP DIRECTIONAL FORMATTING"),
    ('\u{202D}', "LEFT-TO-RIGHT OVERRIDE"),
    ('\u{202E}', "RIGHT-TO-LEFT OVERRIDE"),
    ('\u{2066}', "LEFT-TO-RIGHT ISOLATE"),
    ('\u{2067}', "RIGHT-TO-LEFT ISOLATE"),
    ('\u{2068}', "FIRST STRONG ISOLATE"),
    ('\u{2069}', "POP DIRECTIONAL ISOLATE"),
];

/// Cyrillic and Greek look-alikes mapped to the Latin (or digit) they imitate
pub(super) const HOMOGLYPHS: &[(char, char)] = &[
    // Cyrillic lowercase
    ('а', 'a'),
    ('с', 'c'),
    ('ԁ', 'd'),
    ('е', 'e'),
    ('һ', 'h'),
    ('і', 'i'),
    ('ј', 'j'),
    ('о', 'o'),
    ('р', 'p'),
    ('ѕ', 's'),
    ('у', 'y'),
    ('х', 'x'),
    // Cyrillic uppercase
    ('А', 'A'),
    ('В', 'B'),
    ('С', 'C'),
    ('Е', 'E'),
    ('Н', 'H'),
    ('І', 'I'),
    ('Ј', 'J'),
    ('К', 'K'),
    ('М', 'M'),
    ('О', 'O'),
    ('Р', 'P'),
    ('Ѕ', 'S'),
    ('Т', 'T'),
    ('Х', 'X'),
    ('У', 'Y'),
    ('З', '3'),
    // Greek uppercase
    ('Α', 'A'),
    ('Β', 'B'),
    ('Ε', 'E'),
    ('Ζ', 'Z'),
    ('Η', 'H'),
    ('Ι', 'I'),
    ('Κ', 'K'),
    ('Μ', 'M'),
    ('Ν', 'N'),
    ('Ο', 'O'),
    ('Ρ', 'P'),
    ('Τ', 'T'),
    ('Υ', 'Y'),
    ('Χ', 'X'),
    // Greek lowercase
    ('ο', 'o'),
    ('ν', 'v'),
];

/// Index of `c` in [`ZERO_WIDTH`]
pub(super) fn zero_width_index(c: char) -> Option<usize> {
    ZERO_WIDTH.iter().position(|(z, _)| *z == c)
}

/// Index of `c` in [`BIDI`]
pub(super) fn bidi_index(c: char) -> Option<usize> {
    match c {
        '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' => {
            BIDI.iter().position(|(b, _)| *b == c)
        }
        _ => None,
    }
}

/// Latin replacement for a homoglyph
pub(super) fn homoglyph_target(c: char) -> Option<char> {
    if c.is_ascii() {
        return None;
    }
    HOMOGLYPHS
        .iter()
        .find_map(|(source, target)| (*source == c).then_some(*target))
}

/// C0 controls other than tab, newline and carriage return, plus C1 controls
pub(super) fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{80}'..='\u{9F}')
}
