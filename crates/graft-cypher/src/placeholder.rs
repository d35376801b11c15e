//! `$name` placeholders inside statement text supplied from outside the
//! builder.
//!
//! Quoted strings and backtick identifiers are skipped, so `"$5"` or
//! `` `$x` `` never count as placeholders.

/// One `$name` in the text; `start..end` covers the `$` and the name.
struct Occurrence<'t> {
    start: usize,
    end: usize,
    name: &'t str,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn occurrences(text: &str) -> Vec<Occurrence<'_>> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == b'\\' && q != b'`' => {
                i += 2;
                continue;
            }
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if matches!(b, b'\'' | b'"' | b'`') => quote = Some(b),
            None if b == b'$' => {
                let end = bytes[i + 1..]
                    .iter()
                    .position(|&c| !is_name_byte(c))
                    .map_or(bytes.len(), |offset| i + 1 + offset);
                if end > i + 1 {
                    found.push(Occurrence {
                        start: i,
                        end,
                        name: &text[i + 1..end],
                    });
                    i = end;
                    continue;
                }
            }
            None => {}
        }
        i += 1;
    }
    found
}

/// Distinct placeholder names, in order of first appearance.
pub fn names(text: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for occurrence in occurrences(text) {
        if !names.contains(&occurrence.name) {
            names.push(occurrence.name);
        }
    }
    names
}

/// Replace every placeholder with what `replace` returns for its name.
pub fn rewrite<E>(text: &str, mut replace: impl FnMut(&str) -> Result<String, E>) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for occurrence in occurrences(text) {
        out.push_str(&text[last..occurrence.start]);
        out.push_str(&replace(occurrence.name)?);
        last = occurrence.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("RETURN $first", &["first"]; "single")]
    #[test_case("LIMIT $first SKIP $offset + $first", &["first", "offset"]; "repeated in first use order")]
    #[test_case("RETURN \"$x\" + '$y' + `$z` AS v", &[]; "quoted text skipped")]
    #[test_case("RETURN \"a\\\"$x\" + $y", &["y"]; "escaped quote stays inside string")]
    #[test_case("RETURN $ + 1, $0", &["0"]; "bare dollar ignored")]
    #[test_case("RETURN $auth.jwt.sub", &["auth"]; "property access ends name")]
    fn test_names(text: &str, expected: &[&str]) {
        assert_eq!(names(text), expected);
    }

    #[test]
    fn test_rewrite_replaces_every_occurrence() {
        let rewritten = rewrite::<()>("MATCH (m) WHERE m.x = $a RETURN m LIMIT $a", |name| Ok(format!("$p_{name}")));
        assert_eq!(rewritten.unwrap(), "MATCH (m) WHERE m.x = $p_a RETURN m LIMIT $p_a");
    }

    #[test]
    fn test_rewrite_propagates_errors() {
        let result = rewrite("RETURN $missing", |name| Err(name.to_string()));
        assert_eq!(result, Err("missing".to_string()));
    }

    #[test]
    fn test_rewrite_keeps_multibyte_text() {
        let rewritten = rewrite::<()>("RETURN \"größe $x\" + $x", |_| Ok("$p".to_string()));
        assert_eq!(rewritten.unwrap(), "RETURN \"größe $x\" + $p");
    }
}
