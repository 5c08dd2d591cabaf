//! Common utilities and helper functions.

use std::io::{self, BufRead, Write};

use anyhow::bail;

/// Replaces `${env:VAR}` placeholders with environment variable values.
///
/// Unset variables expand to an empty string. Placeholders that are not
/// closed, or that use another scheme than `env:`, are kept verbatim.
///
/// # Example
///
/// ```rust
/// use valvectl::utils::replace_env_placeholders;
///
/// unsafe { std::env::set_var("VALVECTL_DOC_TOKEN", "s3cret"); }
/// let result = replace_env_placeholders("Bearer ${env:VALVECTL_DOC_TOKEN}").unwrap();
/// assert_eq!(result, "Bearer s3cret");
/// ```
pub fn replace_env_placeholders(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];

        let Some(end) = body.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let placeholder = &body[..end];
        match placeholder.strip_prefix("env:") {
            Some(name) if name.contains('{') => {
                bail!("nested placeholder in `${{{placeholder}}}`");
            }
            Some(name) => {
                let value = std::env::var(name).unwrap_or_default();
                debug!("expanded ${{env:{name}}}");
                out.push_str(&value);
            }
            None => {
                out.push_str("${");
                out.push_str(placeholder);
                out.push('}');
            }
        }
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Asks a yes/no question on the terminal. Anything but `y`/`yes` is no.
pub fn prompt_yes_no(message: &str) -> bool {
    print!("{message} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Pads `cells` into aligned columns.
pub fn columns(rows: &[Vec<String>]) -> Vec<String> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; width];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 == row.len() {
                    line.push_str(cell);
                } else {
                    let pad = widths[i] - cell.chars().count();
                    line.push_str(cell);
                    line.push_str(&" ".repeat(pad + 2));
                }
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_replace_env_placeholders() {
        unsafe {
            env::set_var("VALVECTL_TEST_HOST", "gateway.local");
            env::set_var("VALVECTL_TEST_PORT", "8080");
        }

        assert_eq!(
            replace_env_placeholders("${env:VALVECTL_TEST_HOST}").unwrap(),
            "gateway.local"
        );
        assert_eq!(
            replace_env_placeholders("http://${env:VALVECTL_TEST_HOST}:${env:VALVECTL_TEST_PORT}/")
                .unwrap(),
            "http://gateway.local:8080/"
        );
        assert_eq!(
            replace_env_placeholders("${env:VALVECTL_TEST_UNSET}").unwrap(),
            ""
        );
        assert_eq!(replace_env_placeholders("plain").unwrap(), "plain");
        assert_eq!(replace_env_placeholders("").unwrap(), "");
    }

    #[test]
    fn test_malformed_placeholders() {
        assert_eq!(replace_env_placeholders("${").unwrap(), "${");
        assert_eq!(replace_env_placeholders("${env:X").unwrap(), "${env:X");
        assert_eq!(replace_env_placeholders("${other:x}").unwrap(), "${other:x}");
        assert_eq!(replace_env_placeholders("$$ {env:X}").unwrap(), "$$ {env:X}");
        assert!(replace_env_placeholders("${env:${env:X}}").is_err());
    }

    #[test]
    fn test_columns() {
        let rows = vec![
            vec!["ID".to_string(), "NAME".to_string()],
            vec!["rate_limit".to_string(), "Rate Limit".to_string()],
        ];
        assert_eq!(columns(&rows), vec!["ID          NAME", "rate_limit  Rate Limit"]);
    }
}
