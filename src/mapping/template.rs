//! Placeholder parsing for address templates
//!
//! Tokens look like `{name}`, `{name:width}` or `{name:width,start}`.

use crate::error::{MixerError, Result};

/// One `{...}` token located in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    /// Inline zero-pad width, if given
    pub width: Option<usize>,
    /// Inline first index, if given
    pub start: Option<i64>,
}

fn parse_token(template: &str, body: &str) -> Result<Placeholder> {
    let malformed = || {
        MixerError::Configuration(format!(
            "malformed placeholder {{{}}} in {}",
            body, template
        ))
    };

    let (name, options) = match body.split_once(':') {
        Some((name, options)) => (name, Some(options)),
        None => (body, None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed());
    }

    let (width, start) = match options {
        None => (None, None),
        Some(options) => {
            let (width, start) = match options.split_once(',') {
                Some((w, s)) => (w, Some(s)),
                None => (options, None),
            };
            let width = if width.is_empty() {
                None
            } else {
                Some(width.trim().parse::<usize>().map_err(|_| malformed())?)
            };
            let start = match start {
                Some(s) => Some(s.trim().parse::<i64>().map_err(|_| malformed())?),
                None => None,
            };
            (width, start)
        },
    };

    Ok(Placeholder {
        name: name.to_string(),
        width,
        start,
    })
}

/// All placeholders in order of appearance (duplicates kept)
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            MixerError::Configuration(format!("unterminated placeholder in {}", template))
        })?;
        found.push(parse_token(template, &after[..close])?);
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(MixerError::Configuration(format!(
            "stray '}}' in {}",
            template
        )));
    }
    Ok(found)
}

/// First placeholder of a template, if any
pub fn first_placeholder(template: &str) -> Result<Option<Placeholder>> {
    Ok(placeholders(template)?.into_iter().next())
}

/// Placeholder named `name`, if the template contains one
pub fn find_named(template: &str, name: &str) -> Result<Option<Placeholder>> {
    Ok(placeholders(template)?.into_iter().find(|p| p.name == name))
}

/// Replace every token named `name` with `number`, zero-padded to `width`
pub fn substitute(template: &str, name: &str, number: i64, width: usize) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            MixerError::Configuration(format!("unterminated placeholder in {}", template))
        })?;
        let body = &after[..close];
        let token = parse_token(template, body)?;
        if token.name == name {
            out.push_str(&format!("{:0width$}", number, width = width));
        } else {
            out.push('{');
            out.push_str(body);
            out.push('}');
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Number of decimal digits of a cardinality (`0` counts as one digit)
pub fn digit_count(n: u32) -> usize {
    n.to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let found = placeholders("/ch/{num_channel}/mix/{num_bus:2}/x/{num_head_amp:3,0}").unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].name, "num_channel");
        assert_eq!(found[0].width, None);
        assert_eq!(found[1].width, Some(2));
        assert_eq!(found[1].start, None);
        assert_eq!(found[2].width, Some(3));
        assert_eq!(found[2].start, Some(0));
    }

    #[test]
    fn test_start_without_width() {
        let p = first_placeholder("/a/{n:,0}").unwrap().unwrap();
        assert_eq!(p.width, None);
        assert_eq!(p.start, Some(0));
    }

    #[test]
    fn test_malformed() {
        assert!(placeholders("/a/{n").is_err());
        assert!(placeholders("/a/n}").is_err());
        assert!(placeholders("/a/{}").is_err());
        assert!(placeholders("/a/{n:x}").is_err());
    }

    #[test]
    fn test_substitute_keeps_other_tokens() {
        let out = substitute("/ch/{a}/mix/{b:2}", "b", 3, 2).unwrap();
        assert_eq!(out, "/ch/{a}/mix/03");
        let out = substitute(&out, "a", 7, 0).unwrap();
        assert_eq!(out, "/ch/7/mix/03");
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(8), 1);
        assert_eq!(digit_count(32), 2);
        assert_eq!(digit_count(128), 3);
    }
}
