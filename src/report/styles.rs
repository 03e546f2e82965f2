//! Style lookup in a WordprocessingML `word/styles.xml` part.
//!
//! Styles are matched by display name (`w:name`) or by `w:styleId`, both
//! case-insensitively and ignoring spaces, so `"Light List"` finds either
//! `<w:name w:val="Light List"/>` or `w:styleId="LightList"`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

/// How the timeline table ends up styled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStyle {
    /// The requested style exists; holds its style id.
    Named(String),
    /// Requested style missing; the document's default table style id.
    Default(String),
    /// Neither exists; no `w:tblStyle` is emitted.
    Unstyled,
}

impl TableStyle {
    pub fn style_id(&self) -> Option<&str> {
        match self {
            TableStyle::Named(id) | TableStyle::Default(id) => Some(id),
            TableStyle::Unstyled => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StyleDef {
    id: String,
    name: Option<String>,
    kind: String,
    is_default: bool,
}

/// The styles declared by one document.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: Vec<StyleDef>,
}

impl StyleSheet {
    /// Parse `word/styles.xml`. Malformed XML yields whatever was read before
    /// the error, with a warning; a broken sheet only costs styling.
    pub fn parse(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut styles = Vec::new();
        let mut current: Option<StyleDef> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                    current = Some(style_def(&e));
                }
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"w:name" => {
                        if let Some(style) = current.as_mut() {
                            style.name = get_attr(&e, b"w:val");
                        }
                    }
                    b"w:style" => styles.push(style_def(&e)),
                    _ => {}
                },
                Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                    if let Some(style) = current.take() {
                        styles.push(style);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    warn!(
                        "styles.xml: parse error at {}: {}",
                        reader.buffer_position(),
                        e
                    );
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        debug!("Parsed {} styles", styles.len());
        Self { styles }
    }

    /// Style id of the `kind` style (`"table"`, `"paragraph"`, …) called `name`.
    pub fn find(&self, kind: &str, name: &str) -> Option<&str> {
        let wanted = fold(name);
        self.styles
            .iter()
            .filter(|s| s.kind == kind)
            .find(|s| fold(&s.id) == wanted || s.name.as_deref().is_some_and(|n| fold(n) == wanted))
            .map(|s| s.id.as_str())
    }

    /// Style id of the default style of `kind`.
    pub fn default_of(&self, kind: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|s| s.kind == kind && s.is_default)
            .map(|s| s.id.as_str())
    }

    /// Resolve the table style: requested, else document default, else none.
    pub fn table_style(&self, requested: &str) -> TableStyle {
        if let Some(id) = self.find("table", requested) {
            return TableStyle::Named(id.to_string());
        }
        match self.default_of("table") {
            Some(id) => {
                warn!(
                    "Table style '{}' not found, using default table style '{}'",
                    requested, id
                );
                TableStyle::Default(id.to_string())
            }
            None => {
                warn!(
                    "Table style '{}' not found and no default table style, leaving table unstyled",
                    requested
                );
                TableStyle::Unstyled
            }
        }
    }
}

fn style_def(e: &BytesStart) -> StyleDef {
    StyleDef {
        id: get_attr(e, b"w:styleId").unwrap_or_default(),
        name: None,
        kind: get_attr(e, b"w:type").unwrap_or_else(|| "paragraph".into()),
        is_default: matches!(get_attr(e, b"w:default").as_deref(), Some("1" | "true" | "on")),
    }
}

fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/></w:style>
  <w:style w:type="table" w:styleId="LightList"><w:name w:val="Light List"/></w:style>
</w:styles>"#;

    #[test]
    fn finds_by_name_or_id() {
        let sheet = StyleSheet::parse(SHEET);
        assert_eq!(sheet.default_of("paragraph"), Some("Normal"));
        assert_eq!(sheet.find("table", "Light List"), Some("LightList"));
        assert_eq!(sheet.find("table", "lightlist"), Some("LightList"));
        assert_eq!(sheet.find("paragraph", "Heading 1"), Some("Heading1"));
        assert_eq!(sheet.find("paragraph", "Light List"), None);
    }

    #[test]
    fn requested_style_wins() {
        let sheet = StyleSheet::parse(SHEET);
        assert_eq!(sheet.table_style("Light List"), TableStyle::Named("LightList".into()));
    }

    #[test]
    fn missing_style_falls_back_to_default() {
        let sheet = StyleSheet::parse(SHEET);
        let style = sheet.table_style("Grid Table 4");
        assert_eq!(style, TableStyle::Default("TableNormal".into()));
        assert_eq!(style.style_id(), Some("TableNormal"));
    }

    #[test]
    fn no_table_styles_means_unstyled() {
        let xml = r#"<w:styles xmlns:w="x"><w:style w:type="paragraph" w:styleId="Normal"/></w:styles>"#;
        let sheet = StyleSheet::parse(xml);
        assert_eq!(sheet.find("paragraph", "Normal"), Some("Normal"));
        assert_eq!(sheet.table_style("Light List"), TableStyle::Unstyled);
        assert_eq!(StyleSheet::default().table_style("Light List").style_id(), None);
    }

    #[test]
    fn malformed_xml_does_not_panic() {
        let sheet = StyleSheet::parse("<w:styles><w:style w:type=\"table\"");
        assert_eq!(sheet.table_style("Light List"), TableStyle::Unstyled);
    }
}
