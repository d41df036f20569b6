//! Post-processing: deterministic cleanup of raw Tesseract output.
//!
//! Tesseract's text renderer terminates every page with a form feed
//! (`\x0c`) and usually a trailing newline. Left in place, a three-page PDF
//! would carry stray page breaks inside the joined text, and the `"\n\n"`
//! page separator would no longer be the only thing between pages.
//! Recognised text is otherwise passed through untouched.

/// Clean one page of OCR output.
///
/// Normalises CRLF to LF and removes the trailing form-feed page terminator
/// together with the whitespace around it. Leading whitespace and interior
/// line structure are kept.
pub fn clean_page_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let trimmed = text.trim_end_matches(|c: char| c == '\x0c' || c.is_whitespace());
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_form_feed_terminator() {
        assert_eq!(clean_page_text("안녕하세요\nhello\n\x0c"), "안녕하세요\nhello");
        assert_eq!(clean_page_text("line\n\n\x0c\n"), "line");
    }

    #[test]
    fn normalises_crlf() {
        assert_eq!(clean_page_text("a\r\nb\r\n"), "a\nb");
    }

    #[test]
    fn keeps_interior_structure() {
        assert_eq!(clean_page_text("  indented\n\nnext para\n"), "  indented\n\nnext para");
    }

    #[test]
    fn blank_output_becomes_empty() {
        assert_eq!(clean_page_text(" \n\x0c"), "");
        assert_eq!(clean_page_text(""), "");
    }
}
