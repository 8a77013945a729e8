//! sprintf-style formatting for `printf`.
//!
//! Handles `%[flags][width][.precision]conversion` with conversions
//! `s d i f e g x X o c b %` and flags `- 0 + space #`. Backslash escapes
//! are left alone here; `printf` interprets them in the result, and `%b`
//! interprets them in its argument.

use super::escape::interpret_escapes;

/// A malformed format or an argument that does not fit its conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[sprintf] {0}")]
pub struct FormatError(pub String);

impl FormatError {
    /// The message without the `[sprintf] ` prefix.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Largest accepted field width or precision.
pub const MAX_FIELD: usize = 4096;

#[derive(Debug, Default)]
struct Placeholder {
    left_align: bool,
    zero_pad: bool,
    plus_sign: bool,
    space_sign: bool,
    alt_form: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

pub fn sprintf(format: &str, args: &[String]) -> Result<String, FormatError> {
    let mut output = String::new();
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            output.push('%');
            continue;
        }
        let placeholder = parse_placeholder(&mut chars)?;
        let arg = args.next().map(String::as_str);
        render(&placeholder, arg, &mut output)?;
    }
    Ok(output)
}

fn parse_placeholder(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<Placeholder, FormatError> {
    let mut p = Placeholder::default();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => p.left_align = true,
            '0' => p.zero_pad = true,
            '+' => p.plus_sign = true,
            ' ' => p.space_sign = true,
            '#' => p.alt_form = true,
            _ => break,
        }
        chars.next();
    }
    p.width = digits(chars, "field width")?;
    if chars.peek() == Some(&'.') {
        chars.next();
        p.precision = Some(digits(chars, "precision")?.unwrap_or(0));
    }
    match chars.next() {
        Some(c @ ('s' | 'd' | 'i' | 'f' | 'e' | 'g' | 'x' | 'X' | 'o' | 'c' | 'b')) => {
            p.conversion = c;
            Ok(p)
        }
        _ => Err(FormatError("unexpected placeholder".into())),
    }
}

fn digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, what: &str) -> Result<Option<usize>, FormatError> {
    let mut text = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        text.push(c);
        chars.next();
    }
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<usize>() {
        Ok(n) if n <= MAX_FIELD => Ok(Some(n)),
        _ => Err(FormatError(format!("{what} {text} exceeds {MAX_FIELD}"))),
    }
}

fn int_arg(arg: Option<&str>) -> Result<i64, FormatError> {
    let Some(arg) = arg.map(str::trim) else {
        return Ok(0);
    };
    if let Ok(n) = arg.parse::<i64>() {
        return Ok(n);
    }
    arg.parse::<f64>()
        .map(|f| f.trunc() as i64)
        .map_err(|_| FormatError("expecting number but found string".into()))
}

fn float_arg(arg: Option<&str>) -> Result<f64, FormatError> {
    match arg.map(str::trim) {
        None => Ok(0.0),
        Some(arg) => arg
            .parse::<f64>()
            .map_err(|_| FormatError("expecting number but found string".into())),
    }
}

fn render(p: &Placeholder, arg: Option<&str>, output: &mut String) -> Result<(), FormatError> {
    match p.conversion {
        's' => {
            let value = arg.unwrap_or_default();
            let value: String = match p.precision {
                Some(n) => value.chars().take(n).collect(),
                None => value.to_string(),
            };
            pad(p, &value, false, output);
        }
        'b' => pad(p, &interpret_escapes(arg.unwrap_or_default()), false, output),
        'c' => {
            let value: String = arg.and_then(|a| a.chars().next()).into_iter().collect();
            pad(p, &value, false, output);
        }
        'd' | 'i' => {
            let n = int_arg(arg)?;
            let body = n.unsigned_abs().to_string();
            pad(p, &signed(p, n < 0, body), true, output);
        }
        'x' | 'X' | 'o' => {
            let n = int_arg(arg)?;
            let mut body = match p.conversion {
                'x' => format!("{n:x}"),
                'X' => format!("{n:X}"),
                _ => format!("{n:o}"),
            };
            if p.alt_form && n != 0 {
                let prefix = match p.conversion {
                    'x' => "0x",
                    'X' => "0X",
                    _ => "0",
                };
                body.insert_str(0, prefix);
            }
            pad(p, &body, true, output);
        }
        'f' | 'e' | 'g' => {
            let f = float_arg(arg)?;
            let precision = p.precision.unwrap_or(6);
            let body = match p.conversion {
                'f' => format!("{:.precision$}", f.abs()),
                'e' => exponent(f.abs(), precision),
                _ => general(f.abs(), precision),
            };
            pad(p, &signed(p, f.is_sign_negative() && f != 0.0, body), true, output);
        }
        other => return Err(FormatError(format!("unexpected placeholder '{other}'"))),
    }
    Ok(())
}

fn signed(p: &Placeholder, negative: bool, body: String) -> String {
    if negative {
        format!("-{body}")
    } else if p.plus_sign {
        format!("+{body}")
    } else if p.space_sign {
        format!(" {body}")
    } else {
        body
    }
}

/// C-style exponent: at least two exponent digits, explicit sign.
fn exponent(f: f64, precision: usize) -> String {
    let rust = format!("{f:.precision$e}");
    match rust.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => rust,
    }
}

/// `%g`: fixed notation with trailing zeros removed.
fn general(f: f64, precision: usize) -> String {
    let fixed = format!("{f:.precision$}");
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

fn pad(p: &Placeholder, value: &str, numeric: bool, output: &mut String) {
    let len = value.chars().count();
    let width = p.width.unwrap_or(0);
    if width <= len {
        output.push_str(value);
        return;
    }
    let fill = width - len;
    if p.left_align {
        output.push_str(value);
        output.extend(std::iter::repeat_n(' ', fill));
    } else if p.zero_pad && numeric {
        // Zeros go between the sign and the digits.
        let split = value
            .find(|c: char| c != '-' && c != '+' && c != ' ')
            .unwrap_or(0);
        output.push_str(&value[..split]);
        output.extend(std::iter::repeat_n('0', fill));
        output.push_str(&value[split..]);
    } else {
        output.extend(std::iter::repeat_n(' ', fill));
        output.push_str(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case::strings("%s-%s", &["a", "b"], "a-b")]
    #[case::int("%d", &["42"], "42")]
    #[case::int_from_float("%i", &["3.9"], "3")]
    #[case::left_align("%-5s|", &["hi"], "hi   |")]
    #[case::right_align("%5s|", &["hi"], "   hi|")]
    #[case::zero_pad("%05d", &["-42"], "-0042")]
    #[case::plus("%+d", &["7"], "+7")]
    #[case::hex("%x %X %#x", &["255", "255", "255"], "ff FF 0xff")]
    #[case::octal("%o", &["8"], "10")]
    #[case::fixed("%.2f", &["3.14159"], "3.14")]
    #[case::width_and_precision("%8.3f", &["2.5"], "   2.500")]
    #[case::exponent("%.2e", &["1234.5"], "1.23e+03")]
    #[case::general("%g", &["2.50"], "2.5")]
    #[case::char("%c", &["xyz"], "x")]
    #[case::percent("100%%", &[], "100%")]
    #[case::missing_args("%s|%d", &[], "|0")]
    #[case::escapes_left_alone(r"a\n%s", &["b"], r"a\nb")]
    #[case::b_interprets_escapes("%b", &[r"x\ty"], "x\ty")]
    #[case::truncating_precision("%.2s", &["hello"], "he")]
    fn formats(#[case] format: &str, #[case] values: &[&str], #[case] expected: &str) {
        assert_eq!(sprintf(format, &args(values)).unwrap(), expected);
    }

    #[test]
    fn non_numeric_argument_fails() {
        let err = sprintf("%d", &args(&["abc"])).unwrap_err();
        assert_eq!(err.to_string(), "[sprintf] expecting number but found string");
        assert_eq!(err.message(), "expecting number but found string");
    }

    #[rstest]
    #[case::huge_width("%1000000000000s", "field width 1000000000000 exceeds 4096")]
    #[case::huge_precision("%.5000f", "precision 5000 exceeds 4096")]
    #[case::past_usize("%99999999999999999999999d", "field width 99999999999999999999999 exceeds 4096")]
    fn oversized_fields_fail(#[case] format: &str, #[case] message: &str) {
        let err = sprintf(format, &args(&["1"])).unwrap_err();
        assert_eq!(err.message(), message);
    }

    #[test]
    fn widest_field_is_accepted() {
        let text = sprintf("%4096s", &args(&["x"])).unwrap();
        assert_eq!(text.len(), MAX_FIELD);
        assert!(text.ends_with('x'));
    }

    #[test]
    fn unknown_placeholder_fails() {
        assert!(sprintf("%q", &[]).is_err());
        assert!(sprintf("50%", &[]).is_err());
    }
}
