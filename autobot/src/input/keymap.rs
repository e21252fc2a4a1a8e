//! Character to physical-key mapping for a US keyboard layout.
//!
//! A stroke is the unshifted character printed on the key plus whether Shift
//! must be held. Characters without a key (accents, non-Latin scripts) have no
//! stroke and cannot be typed blind.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    /// Character produced by the key without modifiers
    pub base: char,
    pub shift: bool,
}

impl KeyStroke {
    const fn plain(base: char) -> Self {
        Self { base, shift: false }
    }

    const fn shifted(base: char) -> Self {
        Self { base, shift: true }
    }
}

pub fn stroke_for(c: char) -> Option<KeyStroke> {
    let stroke = match c {
        'a'..='z' | '0'..='9' => KeyStroke::plain(c),
        'A'..='Z' => KeyStroke::shifted(c.to_ascii_lowercase()),
        ' ' | '-' | '=' | '[' | ']' | '\\' | ';' | '\'' | ',' | '.' | '/' | '`' => {
            KeyStroke::plain(c)
        }
        '!' => KeyStroke::shifted('1'),
        '@' => KeyStroke::shifted('2'),
        '#' => KeyStroke::shifted('3'),
        '$' => KeyStroke::shifted('4'),
        '%' => KeyStroke::shifted('5'),
        '^' => KeyStroke::shifted('6'),
        '&' => KeyStroke::shifted('7'),
        '*' => KeyStroke::shifted('8'),
        '(' => KeyStroke::shifted('9'),
        ')' => KeyStroke::shifted('0'),
        '_' => KeyStroke::shifted('-'),
        '+' => KeyStroke::shifted('='),
        '{' => KeyStroke::shifted('['),
        '}' => KeyStroke::shifted(']'),
        '|' => KeyStroke::shifted('\\'),
        ':' => KeyStroke::shifted(';'),
        '"' => KeyStroke::shifted('\''),
        '<' => KeyStroke::shifted(','),
        '>' => KeyStroke::shifted('.'),
        '?' => KeyStroke::shifted('/'),
        '~' => KeyStroke::shifted('`'),
        _ => return None,
    };
    Some(stroke)
}

/// Map a whole string, reporting the first character that has no key.
pub fn strokes_for(text: &str) -> Result<Vec<KeyStroke>, char> {
    text.chars().map(|c| stroke_for(c).ok_or(c)).collect()
}
