//! Unicode normalization of LaTeX-escaped field values.
//!
//! Decodes accent commands (`{\'e}`, `\'{e}`, `\"o`, `\c{c}`, `\v{S}`, ...) and
//! the usual non-ASCII letter commands (`{\ss}`, `\o`, `\ae`, ...) into
//! precomposed Unicode characters. Commands without a known precomposed form
//! are left as they are. Nothing else about the value is touched: names,
//! journals, dois, links and page ranges keep their raw form.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::bibliography::Entry;

/// Base letter of an accent: a braced or bare letter, or a dotless i/j.
const BASE: &str = r"(?:\{\s*(\\[ij]|[A-Za-z])\s*\}|(\\[ij]|[A-Za-z]))";

/// Accents written with a punctuation command, e.g. `\'`.
const PUNCT_ACCENTS: &str = r#"[`'^"~=.]"#;

/// Accents written with a letter command, e.g. `\c`. These need braces or a
/// space before their argument.
const ALPHA_ACCENTS: &str = "[cvuHkr]";

static BRACED_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\{{\\({})\s*{}\}}", PUNCT_ACCENTS, BASE)).unwrap());

static BARE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\\({})\s*{}", PUNCT_ACCENTS, BASE)).unwrap());

static BRACED_ALPHA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\{{\\({})(?:\s*\{{\s*(\\[ij]|[A-Za-z])\s*\}}|\s+(\\[ij]|[A-Za-z]))\}}",
        ALPHA_ACCENTS
    ))
    .unwrap()
});

static BARE_ALPHA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\\({})(?:\s*\{{\s*(\\[ij]|[A-Za-z])\s*\}}|\s+(\\[ij]|[A-Za-z]))",
        ALPHA_ACCENTS
    ))
    .unwrap()
});

static BRACED_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\(ss|ae|AE|oe|OE|aa|AA|o|O|l|L|i|j)\}").unwrap());

static BARE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(ss|ae|AE|oe|OE|aa|AA|o|O|l|L|i|j)(?:\{\}| |\b)").unwrap());

/// A brace group holding one non-ASCII character, e.g. `{é}`.
static LONE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^\x00-\x7F])\}").unwrap());

/// (accent command, base letters, precomposed forms), aligned by position.
const ACCENTED: &[(char, &str, &str)] = &[
    ('\'', "aeiouyAEIOUYcCnNsSzZlLrR", "áéíóúýÁÉÍÓÚÝćĆńŃśŚźŹĺĹŕŔ"),
    ('`', "aeiouAEIOU", "àèìòùÀÈÌÒÙ"),
    ('^', "aeiouAEIOUcCgGhHjJsSwWyY", "âêîôûÂÊÎÔÛĉĈĝĜĥĤĵĴŝŜŵŴŷŶ"),
    ('"', "aeiouyAEIOUY", "äëïöüÿÄËÏÖÜŸ"),
    ('~', "anoANOiuIU", "ãñõÃÑÕĩũĨŨ"),
    ('=', "aeiouAEIOU", "āēīōūĀĒĪŌŪ"),
    ('.', "cegzCEGZI", "ċėġżĊĖĠŻİ"),
    ('u', "aeguAEGU", "ăĕğŭĂĔĞŬ"),
    ('v', "cdenrstzCDENRSTZ", "čďěňřšťžČĎĚŇŘŠŤŽ"),
    ('H', "ouOU", "őűŐŰ"),
    ('c', "cgklnrstCGKLNRST", "çģķļņŗşţÇĢĶĻŅŖŞŢ"),
    ('k', "aeiuAEIU", "ąęįųĄĘĮŲ"),
    ('r', "auAU", "åůÅŮ"),
];

/// Looks up the precomposed form of `base` carrying `accent`.
fn compose(accent: char, base: char) -> Option<char> {
    let (_, bases, composed) = ACCENTED.iter().find(|(a, _, _)| *a == accent)?;
    let index = bases.chars().position(|c| c == base)?;
    composed.chars().nth(index)
}

fn letter(command: &str) -> Option<&'static str> {
    Some(match command {
        "ss" => "ß",
        "ae" => "æ",
        "AE" => "Æ",
        "oe" => "œ",
        "OE" => "Œ",
        "aa" => "å",
        "AA" => "Å",
        "o" => "ø",
        "O" => "Ø",
        "l" => "ł",
        "L" => "Ł",
        "i" => "ı",
        "j" => "ȷ",
        _ => return None,
    })
}

fn replace_accent(caps: &Captures<'_>) -> String {
    let accent = caps[1].chars().next();
    let base = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim_start_matches('\\'))
        .and_then(|b| b.chars().next());

    match (accent, base) {
        (Some(accent), Some(base)) => compose(accent, base)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string()),
        _ => caps[0].to_string(),
    }
}

fn replace_letter(caps: &Captures<'_>) -> String {
    letter(&caps[1])
        .map(String::from)
        .unwrap_or_else(|| caps[0].to_string())
}

/// Decodes LaTeX accent and letter commands in `text` into Unicode.
///
/// # Examples
///
/// ```
/// use bib2md::decode_latex;
///
/// assert_eq!(decode_latex(r"J{\'e}gou"), "Jégou");
/// assert_eq!(decode_latex(r#"M\"{u}ller"#), "Müller");
/// ```
pub fn decode_latex(text: &str) -> String {
    if !text.contains('\\') && !text.contains('{') {
        return text.to_string();
    }

    // Accents first so that `\'{\i}` is read as one command.
    let text = BRACED_PUNCT.replace_all(text, replace_accent);
    let text = BARE_PUNCT.replace_all(&text, replace_accent);
    let text = BRACED_ALPHA.replace_all(&text, replace_accent);
    let text = BARE_ALPHA.replace_all(&text, replace_accent);
    let text = BRACED_LETTER.replace_all(&text, replace_letter);
    let text = BARE_LETTER.replace_all(&text, replace_letter);
    let text = LONE_GROUP.replace_all(&text, "$1");
    text.into_owned()
}

/// Record customization: decodes every field value of `entry` to Unicode.
pub fn convert_to_unicode(mut entry: Entry) -> Entry {
    for value in entry.fields.values_mut() {
        *value = decode_latex(value);
    }
    entry
}
