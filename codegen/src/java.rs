//! Java lexical helpers: identifiers, numerals and string literals.

use blocks::block::Literal;

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Turn an editor-supplied name into a legal Java identifier.
pub fn identifier(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whole numbers that fit an `int` render as integer literals, everything
/// else as a double literal.
pub fn number(n: f64) -> String {
    if n.is_nan() {
        "Double.NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Double.POSITIVE_INFINITY".to_string()
        } else {
            "Double.NEGATIVE_INFINITY".to_string()
        }
    } else if n == n.floor() && n >= i32::MIN as f64 && n <= i32::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{:?}", n)
    }
}

/// Render a literal in expression position. Text holding a finite number is
/// emitted as that number.
pub fn literal(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => number(*n),
        Literal::Boolean(b) => b.to_string(),
        Literal::Text(text) => match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && !text.trim().is_empty() => number(n),
            _ => string_literal(text),
        },
    }
}
