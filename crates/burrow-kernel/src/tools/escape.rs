//! Backslash escape interpretation, as `printf` and `echo -e` use it.
//!
//! Supported: `\\`, `\a`, `\b`, `\e`, `\f`, `\n`, `\r`, `\t`, `\v`,
//! `\xHH`, `\uHHHH` and three-digit octal `\NNN`. Octal values above 255
//! become `?`. Any other backslash is kept as written.

pub fn interpret_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };
        let simple = match next {
            '\\' => Some('\\'),
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            'e' => Some('\u{1b}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\u{b}'),
            _ => None,
        };
        if let Some(ch) = simple {
            chars.next();
            out.push(ch);
            continue;
        }

        let rest: String = chars.clone().take(5).collect();
        if let Some((ch, used)) = numeric_escape(&rest) {
            for _ in 0..used {
                chars.next();
            }
            out.push(ch);
        } else {
            out.push('\\');
        }
    }
    out
}

/// `xHH`, `uHHHH` or `NNN` at the start of `rest`; returns the character
/// and how many chars of `rest` it used.
fn numeric_escape(rest: &str) -> Option<(char, usize)> {
    let hex = |digits: &str, n: usize| -> Option<u32> {
        let digits: String = digits.chars().take(n).collect();
        if digits.len() == n && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            u32::from_str_radix(&digits, 16).ok()
        } else {
            None
        }
    };
    if let Some(digits) = rest.strip_prefix('x') {
        let value = hex(digits, 2)?;
        return char::from_u32(value).map(|c| (c, 3));
    }
    if let Some(digits) = rest.strip_prefix('u') {
        let value = hex(digits, 4)?;
        return char::from_u32(value).map(|c| (c, 5));
    }
    let octal: String = rest.chars().take(3).collect();
    if octal.len() == 3 && octal.chars().all(|c| ('0'..='7').contains(&c)) {
        let value = u32::from_str_radix(&octal, 8).ok()?;
        let ch = if value < 256 {
            char::from_u32(value)?
        } else {
            '?'
        };
        return Some((ch, 3));
    }
    None
}
