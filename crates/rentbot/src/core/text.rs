/// Escapes `<`, `>`, `&` and `"` for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cuts to `max` characters, replacing the tail with `suffix` when cut.
/// `max` counts the suffix too.
pub fn truncate_chars(text: &str, max: usize, suffix: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// One-line preview for request lists: newlines flattened, 36 chars plus `…`.
pub fn preview_line(text: &str) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    let flat = flat.trim();
    if flat.chars().count() > 36 {
        let mut out: String = flat.chars().take(36).collect();
        out.push('…');
        out
    } else {
        flat.to_string()
    }
}

/// First non-empty line, trimmed.
pub fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
        assert_eq!(escape_html(r#"ЖК "Панорама""#), "ЖК &quot;Панорама&quot;");
    }

    #[test]
    fn test_truncate_chars_counts_unicode() {
        let title = "Квартира".repeat(12);
        let cut = truncate_chars(&title, 80, "...");
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_chars("коротко", 80, "..."), "коротко");
    }

    #[test]
    fn test_preview_line() {
        assert_eq!(preview_line("с 20 марта\nна 3 ночи"), "с 20 марта на 3 ночи");
        let long = "а".repeat(40);
        assert_eq!(preview_line(&long), format!("{}…", "а".repeat(36)));
    }

    #[test]
    fn test_first_line_skips_blank() {
        assert_eq!(first_line("\n  ЖК Панорама  \nвторая"), "ЖК Панорама");
        assert_eq!(first_line(""), "");
    }
}
