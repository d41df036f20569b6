//! The upload page.
//!
//! One template, compiled into the binary and loaded into a minijinja
//! environment at startup. The `.html` name turns on HTML auto-escaping, so
//! OCR text and error causes are always rendered as text.

use crate::error::Img2TextError;
use crate::handler::PageView;
use minijinja::{context, Environment, Value};

const INDEX_NAME: &str = "index.html";
const INDEX_SOURCE: &str = include_str!("../templates/index.html");

/// Template environment shared by all requests.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, Img2TextError> {
        let mut env = Environment::new();
        env.add_template(INDEX_NAME, INDEX_SOURCE)
            .map_err(|e| Img2TextError::Internal(format!("index template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the page for `view`. `pdf_supported` toggles the "no PDF" notice.
    pub fn render_page(
        &self,
        view: &PageView,
        pdf_supported: bool,
    ) -> Result<String, Img2TextError> {
        let tmpl = self
            .env
            .get_template(INDEX_NAME)
            .map_err(|e| Img2TextError::Internal(e.to_string()))?;
        tmpl.render(context! {
            pdf_supported => pdf_supported,
            ..Value::from_serialize(view)
        })
        .map_err(|e| Img2TextError::Internal(format!("rendering {INDEX_NAME}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LangMode;
    use crate::extract::ExtractionResult;
    use crate::handler::{Flash, MSG_NO_TEXT};

    fn templates() -> Templates {
        Templates::new().expect("template compiles")
    }

    #[test]
    fn blank_form_checks_default_language() {
        let html = templates()
            .render_page(&PageView::empty(LangMode::KorEng), true)
            .unwrap();
        assert!(html.contains(r#"value="kor+eng" checked"#));
        assert!(!html.contains(r#"value="kor" checked"#));
        assert!(html.contains("결과가 여기에 표시됩니다"));
        assert!(!html.contains("class=\"flash"));
        assert!(!html.contains("helper-text helper-warn"));
    }

    #[test]
    fn result_and_count_are_rendered_escaped() {
        let view = PageView::extracted(LangMode::Kor, ExtractionResult::new("a < b & 한글".into()));
        let html = templates().render_page(&view, true).unwrap();
        assert!(html.contains("a &lt; b &amp; 한글"));
        assert!(html.contains("10자 인식"));
        assert!(html.contains(r#"value="kor" checked"#));
    }

    #[test]
    fn flash_levels_map_to_css_classes() {
        let mut view = PageView::empty(LangMode::Kor);
        view.flash = Some(Flash::info(MSG_NO_TEXT));
        let html = templates().render_page(&view, true).unwrap();
        assert!(html.contains(r#"<div class="flash flash-info">텍스트를 인식하지 못했습니다."#));

        view.flash = Some(Flash::error("<boom>"));
        let html = templates().render_page(&view, true).unwrap();
        assert!(html.contains(r#"<div class="flash flash-error">&lt;boom&gt;</div>"#));
    }

    #[test]
    fn missing_pdf_support_is_announced() {
        let html = templates()
            .render_page(&PageView::empty(LangMode::KorEng), false)
            .unwrap();
        assert!(html.contains("helper-text helper-warn"));
    }
}
