//! `$`-template substitution
//!
//! Builds a replacement string from a template and the data of one match:
//!
//! | Template | Inserts                                      |
//! |----------|----------------------------------------------|
//! | `$$`     | `$`                                          |
//! | `$&`     | the matched text                             |
//! | `` $` `` | the subject before the match                 |
//! | `$'`     | the subject after the match                  |
//! | `$n`     | capture group `n` (one or two digits)        |
//!
//! Anything else, including a `$` that starts none of the above, is copied
//! through. The function never fails.
//!
//! Positions are character indices, like every other offset in this crate.

/// Expand `template` for one match
///
/// `captures[0]` is group 1. Groups that did not participate must already be
/// empty strings.
///
/// # Example
///
/// ```
/// use rexvm::substitution::substitute;
///
/// let out = substitute("oo", "foobar", 1, &[] as &[&str], "[$`|$&|$']");
/// assert_eq!(out, "[f|oo|bar]");
/// ```
pub fn substitute<S: AsRef<str>>(
    matched: &str,
    input: &str,
    position: usize,
    captures: &[S],
    template: &str,
) -> String {
    let mut out = String::with_capacity(template.len() + matched.len());
    let chars: Vec<char> = template.chars().collect();
    let count = captures.len();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }

        let Some(&next) = chars.get(i + 1) else {
            out.push('$');
            break;
        };

        match next {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.push_str(matched);
                i += 2;
            }
            '`' => {
                out.push_str(prefix(input, position));
                i += 2;
            }
            '\'' => {
                out.push_str(suffix(input, position + matched.chars().count()));
                i += 2;
            }
            d if d.is_ascii_digit() => {
                let first = d as usize - '0' as usize;
                let two = chars
                    .get(i + 2)
                    .filter(|c| c.is_ascii_digit())
                    .map(|c| first * 10 + (*c as usize - '0' as usize));

                match two {
                    Some(n) if (1..=count).contains(&n) => {
                        out.push_str(captures[n - 1].as_ref());
                        i += 3;
                    }
                    _ if (1..=count).contains(&first) => {
                        out.push_str(captures[first - 1].as_ref());
                        i += 2;
                    }
                    _ => {
                        out.push('$');
                        out.push(d);
                        i += 2;
                    }
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }

    out
}

/// Byte offset of character index `index`, clamped to the end
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

fn prefix(input: &str, position: usize) -> &str {
    &input[..byte_offset(input, position)]
}

fn suffix(input: &str, position: usize) -> &str {
    &input[byte_offset(input, position)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_dollar_escape() {
        assert_eq!(substitute("X", "XYZ", 0, NONE, "a$$b"), "a$b");
    }

    #[test]
    fn test_match_prefix_suffix() {
        assert_eq!(substitute("oo", "foobar", 1, NONE, "[$`|$&|$']"), "[f|oo|bar]");
        assert_eq!(substitute("foobar", "foobar", 0, NONE, "<$`$'>"), "<>");
    }

    #[test]
    fn test_group_bounds() {
        assert_eq!(substitute("m", "input", 0, &["X"], "$1$2"), "X$2");
        assert_eq!(substitute("m", "input", 0, &["X"], "$0"), "$0");
        assert_eq!(substitute("m", "input", 0, NONE, "$1"), "$1");
    }

    #[test]
    fn test_two_digit_groups() {
        assert_eq!(substitute("m", "m", 0, &["A"], "$12"), "A2");
        assert_eq!(substitute("m", "m", 0, &["A"], "$01"), "A");

        let groups: Vec<String> = (1..=12).map(|n| format!("g{}", n)).collect();
        assert_eq!(substitute("m", "m", 0, &groups, "$12"), "g12");
        assert_eq!(substitute("m", "m", 0, &groups, "$13"), "g13");
        assert_eq!(substitute("m", "m", 0, &groups, "$1x"), "g1x");
    }

    #[test]
    fn test_other_characters_after_dollar() {
        assert_eq!(substitute("m", "m", 0, NONE, "cost: $"), "cost: $");
        assert_eq!(substitute("m", "m", 0, NONE, "$x$"), "$x$");
        assert_eq!(substitute("m", "m", 0, NONE, "$<name>"), "$<name>");
        assert_eq!(substitute("m", "m", 0, NONE, "$$$&"), "$m");
    }

    #[test]
    fn test_non_ascii_positions() {
        assert_eq!(substitute("é", "café!", 3, NONE, "[$`][$']"), "[caf][!]");
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(substitute("m", "m", 0, &["a"], ""), "");
    }
}
