//! Leading `---`-delimited YAML frontmatter, hand-parsed: the teacher's
//! preference for small focused parsers over a heavyweight crate for a
//! five-line job.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
}

/// Splits `text` into `(frontmatter, body)`. If the leading delimiters are
/// absent or the enclosed YAML fails to parse, returns `(None, text)`
/// unchanged — frontmatter is an enhancement, never a hard requirement.
pub fn split(text: &str) -> (Option<Frontmatter>, &str) {
    let Some(rest) = text.strip_prefix("---") else {
        return (None, text);
    };
    // Require the opening fence to be alone on its line.
    let rest = match rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
        Some(r) => r,
        None => return (None, text),
    };

    let Some(end) = find_closing_fence(rest) else {
        return (None, text);
    };

    let yaml = &rest[..end.yaml_end];
    let body = &rest[end.body_start..];

    match serde_yaml::from_str::<Frontmatter>(yaml) {
        Ok(fm) => (Some(fm), body),
        Err(_) => (None, text),
    }
}

struct FenceEnd {
    yaml_end: usize,
    body_start: usize,
}

fn find_closing_fence(rest: &str) -> Option<FenceEnd> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" || trimmed == "..." {
            return Some(FenceEnd {
                yaml_end: offset,
                body_start: offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_valid_frontmatter() {
        let text = "---\ntitle: Hello\ndescription: A page\n---\n# Body\n";
        let (fm, body) = split(text);
        let fm = fm.unwrap();
        assert_eq!(fm.title.as_deref(), Some("Hello"));
        assert_eq!(fm.description.as_deref(), Some("A page"));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn no_fence_returns_none() {
        let text = "# Just a heading\n";
        let (fm, body) = split(text);
        assert!(fm.is_none());
        assert_eq!(body, text);
    }

    #[test]
    fn unterminated_fence_returns_none() {
        let text = "---\ntitle: Hello\n# no closer\n";
        let (fm, body) = split(text);
        assert!(fm.is_none());
        assert_eq!(body, text);
    }
}
