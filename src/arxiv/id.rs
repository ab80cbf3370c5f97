//! arXiv identifier checks.
//!
//! Accepts new-style ids (`2403.12345`, `0704.0001v2`) and old-style ids
//! (`hep-th/9901001`, `math.GT/0309136v1`), optionally prefixed with `arXiv:`.

use crate::error::SourceError;

/// Trim and validate an identifier, returning the form used in URLs
pub fn normalize(raw: &str) -> Result<String, SourceError> {
    let trimmed = raw.trim();
    let id = strip_prefix_ignore_case(trimmed, "arxiv:").unwrap_or(trimmed);

    if is_new_style(id) || is_old_style(id) {
        Ok(id.to_string())
    } else {
        Err(SourceError::InvalidId { id: raw.to_string() })
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// `YYMM.NNNN` or `YYMM.NNNNN`, optional `vK`
fn is_new_style(id: &str) -> bool {
    let id = strip_version(id);
    let Some((yymm, number)) = id.split_once('.') else {
        return false;
    };
    all_digits(yymm, 4..=4) && all_digits(number, 4..=5)
}

/// `archive(.SUBJECT)/YYMMNNN`, optional `vK`
fn is_old_style(id: &str) -> bool {
    let id = strip_version(id);
    let Some((archive, number)) = id.split_once('/') else {
        return false;
    };
    let (name, subject) = match archive.split_once('.') {
        Some((name, subject)) => (name, Some(subject)),
        None => (archive, None),
    };

    let name_ok = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_lowercase() || c == '-');
    let subject_ok = subject.map_or(true, |s| {
        s.len() == 2 && s.chars().all(|c| c.is_ascii_uppercase())
    });

    name_ok && subject_ok && all_digits(number, 7..=7)
}

fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(pos) if pos > 0 && all_digits(&id[pos + 1..], 1..=3) => &id[..pos],
        _ => id,
    }
}

fn all_digits(s: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_style_ids() {
        assert_eq!(normalize("2403.12345").unwrap(), "2403.12345");
        assert_eq!(normalize("1706.03762v7").unwrap(), "1706.03762v7");
        assert_eq!(normalize("0704.0001").unwrap(), "0704.0001");
        assert_eq!(normalize("  arXiv:2403.12345 ").unwrap(), "2403.12345");
    }

    #[test]
    fn test_old_style_ids() {
        assert_eq!(normalize("hep-th/9901001").unwrap(), "hep-th/9901001");
        assert_eq!(normalize("math.GT/0309136v1").unwrap(), "math.GT/0309136v1");
    }

    #[test]
    fn test_invalid_ids() {
        for bad in ["", "not-an-id", "2403.123", "24031.2345", "hep-th/99", "../etc/passwd", "2403.12345v"] {
            assert!(
                matches!(normalize(bad), Err(SourceError::InvalidId { .. })),
                "accepted {:?}",
                bad
            );
        }
    }
}
