/// Lower-cases, folds `ё` into `е` and collapses runs of whitespace.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.to_lowercase().replace('ё', "е"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops markup tags such as `<highlighttext>` and decodes the few entities
/// the API emits.
pub fn strip_html(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut inside_tag = false;

    for c in input.chars() {
        if c == '<' {
            inside_tag = true;
        } else if c == '>' {
            inside_tag = false;
        } else if !inside_tag {
            result.push(c);
        }
    }

    result
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Trims and maps blank strings to `None`.
pub fn clean_opt(input: Option<String>) -> Option<String> {
    input
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collapses runs of whitespace without touching case or characters.
pub fn squash_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_yo_and_spaces() {
        assert_eq!(normalize("  Ведущий   ИНЖЕНЕР\tЁмкостей "), "ведущий инженер емкостей");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn strip_html_removes_highlight_tags() {
        assert_eq!(
            strip_html("Опыт работы <highlighttext>сварщиком</highlighttext> &amp; монтажником "),
            "Опыт работы сварщиком & монтажником"
        );
    }

    #[test]
    fn squash_whitespace_keeps_decoded_text() {
        assert_eq!(squash_whitespace("  Токарь   <b>\n"), "Токарь <b>");
    }

    #[test]
    fn clean_opt_drops_blank() {
        assert_eq!(clean_opt(Some("   ".into())), None);
        assert_eq!(clean_opt(Some(" Москва ".into())), Some("Москва".into()));
    }
}
