//! `{name}` placeholder substitution for argument templates.
//!
//! `{{` and `}}` produce literal braces. A placeholder name is made of ASCII
//! alphanumerics and underscores.

use std::collections::BTreeMap;

use hh_core::{Error, Result};

enum Piece<'a> {
    Literal(char),
    Text(&'a str),
    Var(&'a str),
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;
    let mut start = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                pieces.push(Piece::Text(&template[start..i]));
                pieces.push(Piece::Literal(bytes[i] as char));
                i += 2;
                start = i;
            }
            b'{' => {
                pieces.push(Piece::Text(&template[start..i]));
                let Some(len) = template[i + 1..].find('}') else {
                    return Err(Error::Validation(format!("unclosed '{{' in template '{template}'")));
                };
                let name = &template[i + 1..i + 1 + len];
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(Error::Validation(format!(
                        "invalid placeholder '{{{name}}}' in template '{template}'"
                    )));
                }
                pieces.push(Piece::Var(name));
                i += len + 2;
                start = i;
            }
            b'}' => {
                return Err(Error::Validation(format!("unmatched '}}' in template '{template}'")));
            }
            _ => i += 1,
        }
    }
    pieces.push(Piece::Text(&template[start..]));
    Ok(pieces)
}

/// Placeholder names used by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<String>> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|p| match p {
            Piece::Var(name) => Some(name.to_string()),
            _ => None,
        })
        .collect())
}

/// Substitute every placeholder; an unknown name is a validation error.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Text(s) => out.push_str(s),
            Piece::Literal(c) => out.push(c),
            Piece::Var(name) => match vars.get(name) {
                Some(v) => out.push_str(v),
                None => {
                    return Err(Error::Validation(format!(
                        "unknown placeholder '{{{name}}}' in template '{template}'"
                    )));
                }
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let v = vars(&[("point", "250"), ("group", "lm")]);
        let s = render("shapes_{group}_S2M{point}_{point}.root", &v).unwrap();
        assert_eq!(s, "shapes_lm_S2M250_250.root");
    }

    #[test]
    fn double_braces_are_literal() {
        let s = render("{{\"mass\": {point}}}", &vars(&[("point", "300")])).unwrap();
        assert_eq!(s, "{\"mass\": 300}");
    }

    #[test]
    fn unknown_and_malformed_placeholders_fail() {
        let v = vars(&[("point", "1")]);
        assert!(render("{spin}", &v).unwrap_err().to_string().contains("{spin}"));
        assert!(render("{point", &v).is_err());
        assert!(render("point}", &v).is_err());
        assert!(render("{a b}", &v).is_err());
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(placeholders("{a}-{{x}}-{b}").unwrap(), ["a", "b"]);
    }
}
