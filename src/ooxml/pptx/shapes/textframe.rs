/// Text bodies, paragraphs and runs of DrawingML text.
///
/// A `p:txBody` (or `a:txBody` inside table cells) holds body properties and
/// an ordered list of paragraphs; each paragraph holds runs. The model is
/// rebuilt wholesale when text is set rather than diffed. Property elements
/// keep their source bytes and are written back verbatim until changed.
use crate::common::unit::pt_to_centipoints;
use crate::common::xml::{
    ElementPath, Retained, attr_i64, attr_value, capture_element, escape_xml, push_entity, push_raw, push_text,
};
use crate::ooxml::error::{OoxmlError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt::Write as FmtWrite;

/// Horizontal paragraph alignment (`a:pPr@algn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distributed,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "l",
            Alignment::Center => "ctr",
            Alignment::Right => "r",
            Alignment::Justify => "just",
            Alignment::Distributed => "dist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "l" => Some(Alignment::Left),
            "ctr" => Some(Alignment::Center),
            "r" => Some(Alignment::Right),
            "just" => Some(Alignment::Justify),
            "dist" => Some(Alignment::Distributed),
            _ => None,
        }
    }
}

/// Character formatting of a run (`a:rPr`).
///
/// Unset fields inherit from the placeholder, layout and master chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunProperties {
    /// Latin typeface
    pub font_family: Option<String>,
    /// Size in hundredths of a point
    pub size: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Underline style: `sng`, `dbl`, `wavy`, … or `none`
    pub underline: Option<String>,
    pub strike: Option<bool>,
    /// Superscript/subscript offset in thousandths of a percent
    pub baseline: Option<i32>,
    /// Character spacing in hundredths of a point
    pub spacing: Option<i32>,
    /// RGB color as six hex digits
    pub color: Option<String>,
    /// Scheme color name such as `accent1`
    pub theme_color: Option<String>,
    pub lang: Option<String>,
}

impl RunProperties {
    /// Set the font size in points.
    pub fn set_size_pt(&mut self, pt: f64) {
        self.size = Some(pt_to_centipoints(pt));
    }

    /// Single underline on, or underline explicitly off.
    pub fn set_underline(&mut self, on: bool) {
        self.underline = Some(if on { "sng" } else { "none" }.to_string());
    }

    #[inline]
    pub fn is_underlined(&self) -> bool {
        self.underline.as_deref().is_some_and(|u| u != "none")
    }

    fn read_attrs(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.lang = attr_value(e, b"lang")?;
        self.size = attr_i64(e, b"sz").and_then(|v| u32::try_from(v).ok());
        self.bold = attr_value(e, b"b")?.map(|v| xml_bool(&v));
        self.italic = attr_value(e, b"i")?.map(|v| xml_bool(&v));
        self.underline = attr_value(e, b"u")?;
        self.strike = attr_value(e, b"strike")?.map(|v| v != "noStrike");
        self.baseline = attr_i64(e, b"baseline").and_then(|v| i32::try_from(v).ok());
        self.spacing = attr_i64(e, b"spc").and_then(|v| i32::try_from(v).ok());
        Ok(())
    }

    fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<a:rPr");
        if let Some(ref lang) = self.lang {
            write!(xml, r#" lang="{}""#, escape_xml(lang))?;
        }
        if let Some(size) = self.size {
            write!(xml, r#" sz="{}""#, size)?;
        }
        if let Some(bold) = self.bold {
            write!(xml, r#" b="{}""#, bold as u8)?;
        }
        if let Some(italic) = self.italic {
            write!(xml, r#" i="{}""#, italic as u8)?;
        }
        if let Some(ref underline) = self.underline {
            write!(xml, r#" u="{}""#, escape_xml(underline))?;
        }
        if let Some(strike) = self.strike {
            let val = if strike { "sngStrike" } else { "noStrike" };
            write!(xml, r#" strike="{}""#, val)?;
        }
        if let Some(baseline) = self.baseline {
            write!(xml, r#" baseline="{}""#, baseline)?;
        }
        if let Some(spacing) = self.spacing {
            write!(xml, r#" spc="{}""#, spacing)?;
        }
        xml.push_str(r#" dirty="0""#);

        let has_fill = self.color.is_some() || self.theme_color.is_some();
        if !has_fill && self.font_family.is_none() {
            xml.push_str("/>");
            return Ok(());
        }

        xml.push('>');
        if let Some(ref color) = self.color {
            write!(
                xml,
                r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
                escape_xml(color)
            )?;
        } else if let Some(ref scheme) = self.theme_color {
            write!(
                xml,
                r#"<a:solidFill><a:schemeClr val="{}"/></a:solidFill>"#,
                escape_xml(scheme)
            )?;
        }
        if let Some(ref font) = self.font_family {
            write!(xml, r#"<a:latin typeface="{}"/>"#, escape_xml(font))?;
        }
        xml.push_str("</a:rPr>");
        Ok(())
    }
}

/// A text field (`a:fld`) such as a slide number or date.
///
/// The run text is the value last rendered by the authoring application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    /// GUID identifying the field instance
    pub id: String,
    /// `slidenum`, `datetime1`, …
    pub field_type: Option<String>,
}

/// A run of uniformly formatted text.
///
/// Line breaks (`a:br`) are represented as runs whose text is `"\n"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub props: RunProperties,
    /// Set when the run is a field rather than literal text
    pub field: Option<Field>,
    pub(crate) props_source: Retained<RunProperties>,
}

impl Run {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn line_break() -> Self {
        Self::new("\n")
    }

    #[inline]
    pub fn is_line_break(&self) -> bool {
        self.text == "\n"
    }

    fn write_props(&self, xml: &mut String) -> Result<()> {
        match self.props_source.get(&self.props) {
            Some(raw) => push_raw(xml, raw)?,
            None => self.props.write_xml(xml)?,
        }
        Ok(())
    }

    fn write_xml(&self, xml: &mut String) -> Result<()> {
        if self.is_line_break() {
            xml.push_str("<a:br>");
            self.write_props(xml)?;
            xml.push_str("</a:br>");
            return Ok(());
        }
        match self.field {
            Some(ref field) => {
                write!(xml, r#"<a:fld id="{}""#, escape_xml(&field.id))?;
                if let Some(ref kind) = field.field_type {
                    write!(xml, r#" type="{}""#, escape_xml(kind))?;
                }
                xml.push('>');
            },
            None => xml.push_str("<a:r>"),
        }
        self.write_props(xml)?;
        write!(xml, "<a:t>{}</a:t>", escape_xml(&self.text))?;
        xml.push_str(if self.field.is_some() { "</a:fld>" } else { "</a:r>" });
        Ok(())
    }
}

/// Paragraph-level properties (`a:pPr`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphProperties {
    /// Indent level, 0 to 8
    pub level: u8,
    pub alignment: Option<Alignment>,
    pub no_bullet: bool,
}

impl ParagraphProperties {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<a:pPr");
        if self.level > 0 {
            write!(xml, r#" lvl="{}""#, self.level)?;
        }
        if let Some(alignment) = self.alignment {
            write!(xml, r#" algn="{}""#, alignment.as_str())?;
        }
        if self.no_bullet {
            xml.push_str("><a:buNone/></a:pPr>");
        } else {
            xml.push_str("/>");
        }
        Ok(())
    }
}

/// A paragraph: an ordered list of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub properties: ParagraphProperties,
    pub runs: Vec<Run>,
    pub(crate) props_source: Retained<ParagraphProperties>,
    /// Decoded paragraphs record whether `a:endParaRPr` was present.
    pub(crate) end_props: Retained<bool>,
}

impl Paragraph {
    /// A paragraph with a single unformatted run, or no run for empty text.
    pub fn new(text: &str) -> Self {
        let mut para = Self::default();
        if !text.is_empty() {
            para.runs.push(Run::new(text));
        }
        para
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Append a run and return it for formatting.
    pub fn add_run(&mut self, text: &str) -> &mut Run {
        self.runs.push(Run::new(text));
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }

    /// Set the indent level, clamped to 0..=8.
    pub fn set_level(&mut self, level: u8) {
        self.properties.level = level.min(8);
    }

    /// Copy of this paragraph's formatting holding `text` in a single run.
    ///
    /// The run takes the formatting of the first text run, if any.
    fn restyled(&self, text: &str) -> Self {
        let mut para = Self {
            properties: self.properties.clone(),
            runs: Vec::new(),
            props_source: self.props_source.clone(),
            end_props: self.end_props.clone(),
        };
        if !text.is_empty() {
            let mut run = self
                .runs
                .iter()
                .find(|r| !r.is_line_break() && r.field.is_none())
                .cloned()
                .unwrap_or_default();
            run.text = text.to_string();
            para.runs.push(run);
        }
        para
    }

    fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<a:p>");

        if let Some(raw) = self.props_source.get(&self.properties) {
            push_raw(xml, raw)?;
        } else if !self.properties.is_default() {
            self.properties.write_xml(xml)?;
        }

        for run in &self.runs {
            run.write_xml(xml)?;
        }

        match self.end_props.source() {
            Some((true, raw)) => push_raw(xml, raw)?,
            Some((false, _)) => {},
            None => xml.push_str(r#"<a:endParaRPr lang="en-US" dirty="0"/>"#),
        }
        xml.push_str("</a:p>");
        Ok(())
    }
}

/// Body-level properties (`a:bodyPr`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyProperties {
    /// `square` or `none`
    pub wrap: Option<String>,
    /// `t`, `ctr` or `b`
    pub anchor: Option<String>,
    /// Shrink text on overflow (`a:normAutofit`)
    pub normal_autofit: bool,
    /// Resize shape to fit text (`a:spAutoFit`)
    pub shape_autofit: bool,
}

impl BodyProperties {
    fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<a:bodyPr");
        if let Some(ref wrap) = self.wrap {
            write!(xml, r#" wrap="{}""#, escape_xml(wrap))?;
        }
        if let Some(ref anchor) = self.anchor {
            write!(xml, r#" anchor="{}""#, escape_xml(anchor))?;
        }
        if self.normal_autofit {
            xml.push_str("><a:normAutofit/></a:bodyPr>");
        } else if self.shape_autofit {
            xml.push_str("><a:spAutoFit/></a:bodyPr>");
        } else {
            xml.push_str("/>");
        }
        Ok(())
    }
}

/// A text body.
///
/// Always serializes at least one paragraph, as the schema requires.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::shapes::TextBody;
///
/// let mut body = TextBody::from_text("Agenda\nQ3 results");
/// assert_eq!(body.paragraphs.len(), 2);
///
/// body.set_text("Done");
/// assert_eq!(body.text(), "Done");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBody {
    pub body_props: BodyProperties,
    pub paragraphs: Vec<Paragraph>,
    pub(crate) body_source: Retained<BodyProperties>,
    /// `a:lstStyle`
    pub(crate) list_style: Retained,
}

/// Property element whose source span is still open.
#[derive(Clone, Copy)]
enum OpenProps {
    Body(usize),
    Paragraph(usize),
    Run(usize),
}

impl TextBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a body with one paragraph per line of `text`.
    pub fn from_text(text: &str) -> Self {
        let mut body = Self::new();
        body.set_text(text);
        body
    }

    /// Replace all paragraphs, splitting `text` on `\n`.
    ///
    /// Body properties are kept. New paragraphs take the formatting of the
    /// first paragraph and its first text run.
    pub fn set_text(&mut self, text: &str) {
        let template = self.paragraphs.first().cloned().unwrap_or_default();
        self.paragraphs = text.split('\n').map(|line| template.restyled(line)).collect();
    }

    /// Remove all paragraphs.
    pub fn clear(&mut self) {
        self.paragraphs.clear();
    }

    /// Append a paragraph and return it for formatting.
    pub fn add_paragraph(&mut self, text: &str) -> &mut Paragraph {
        self.paragraphs.push(Paragraph::new(text));
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    /// Text of all paragraphs joined with `\n`.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when no run carries any text.
    pub fn is_blank(&self) -> bool {
        self.paragraphs
            .iter()
            .all(|p| p.runs.iter().all(|r| r.text.trim().is_empty()))
    }

    /// Decode a text body.
    ///
    /// The reader must be positioned just after the `txBody` start tag; the
    /// matching end tag is consumed. `xml` is the document the reader walks.
    pub(crate) fn parse(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<Self> {
        let mut body = TextBody::new();
        let mut path = ElementPath::new();
        let mut para: Option<Paragraph> = None;
        let mut run: Option<Run> = None;
        let mut open: Option<OpenProps> = None;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    let name = local.as_ref();

                    match name {
                        b"bodyPr" if path.is_empty() => {
                            body.body_props.wrap = attr_value(e, b"wrap")?;
                            body.body_props.anchor = attr_value(e, b"anchor")?;
                            open = Some(OpenProps::Body(start));
                        },
                        b"lstStyle" if path.is_empty() => {
                            if opened {
                                body.list_style = Retained::from_raw(capture_element(reader, xml, start, e, true)?);
                            }
                            continue;
                        },
                        b"normAutofit" if path.ends_with(&[b"bodyPr"]) => {
                            body.body_props.normal_autofit = true;
                        },
                        b"spAutoFit" if path.ends_with(&[b"bodyPr"]) => {
                            body.body_props.shape_autofit = true;
                        },
                        b"p" if path.is_empty() => {
                            let p = Paragraph {
                                end_props: Retained::new(false, Vec::new()),
                                ..Default::default()
                            };
                            if opened {
                                para = Some(p);
                            } else {
                                body.paragraphs.push(p);
                            }
                        },
                        b"pPr" if path.ends_with(&[b"p"]) => {
                            if let Some(p) = para.as_mut() {
                                p.properties.level = attr_i64(e, b"lvl")
                                    .and_then(|v| u8::try_from(v).ok())
                                    .unwrap_or(0)
                                    .min(8);
                                p.properties.alignment =
                                    attr_value(e, b"algn")?.as_deref().and_then(Alignment::parse);
                            }
                            open = Some(OpenProps::Paragraph(start));
                        },
                        b"buNone" if path.ends_with(&[b"p", b"pPr"]) => {
                            if let Some(p) = para.as_mut() {
                                p.properties.no_bullet = true;
                            }
                        },
                        b"endParaRPr" if path.ends_with(&[b"p"]) => {
                            let raw = capture_element(reader, xml, start, e, opened)?;
                            if let Some(p) = para.as_mut() {
                                p.end_props = Retained::new(true, raw);
                            }
                            continue;
                        },
                        b"r" if path.ends_with(&[b"p"]) && opened => {
                            run = Some(Run::default());
                        },
                        b"fld" if path.ends_with(&[b"p"]) => {
                            let field = Field {
                                id: attr_value(e, b"id")?.unwrap_or_default(),
                                field_type: attr_value(e, b"type")?,
                            };
                            let r = Run {
                                field: Some(field),
                                ..Default::default()
                            };
                            if opened {
                                run = Some(r);
                            } else if let Some(p) = para.as_mut() {
                                p.runs.push(r);
                            }
                        },
                        b"br" if path.ends_with(&[b"p"]) => {
                            if opened {
                                run = Some(Run::line_break());
                            } else if let Some(p) = para.as_mut() {
                                p.runs.push(Run::line_break());
                            }
                        },
                        b"rPr" if path.depth() == 2 && in_run(&path) => {
                            if let Some(r) = run.as_mut() {
                                r.props.read_attrs(e)?;
                            }
                            open = Some(OpenProps::Run(start));
                        },
                        b"latin" if path.ends_with(&[b"rPr"]) && path.depth() == 3 => {
                            if let Some(r) = run.as_mut() {
                                r.props.font_family = attr_value(e, b"typeface")?;
                            }
                        },
                        b"srgbClr" if path.ends_with(&[b"rPr", b"solidFill"]) => {
                            if let Some(r) = run.as_mut() {
                                r.props.color = attr_value(e, b"val")?;
                            }
                        },
                        b"schemeClr" if path.ends_with(&[b"rPr", b"solidFill"]) => {
                            if let Some(r) = run.as_mut() {
                                r.props.theme_color = attr_value(e, b"val")?;
                            }
                        },
                        _ => {},
                    }

                    if opened {
                        path.push(name);
                    } else if matches!(name, b"bodyPr" | b"pPr" | b"rPr") {
                        let end = reader.buffer_position() as usize;
                        close_props(&mut open, &mut body, para.as_mut(), run.as_mut(), &xml[..end]);
                    }
                },
                Event::End(ref e) => {
                    if path.is_empty() {
                        break;
                    }
                    match e.local_name().as_ref() {
                        b"r" | b"fld" | b"br" if path.depth() == 2 => {
                            if let (Some(p), Some(r)) = (para.as_mut(), run.take()) {
                                p.runs.push(r);
                            }
                        },
                        b"p" if path.depth() == 1 => {
                            if let Some(p) = para.take() {
                                body.paragraphs.push(p);
                            }
                        },
                        b"bodyPr" | b"pPr" | b"rPr" => {
                            let end = reader.buffer_position() as usize;
                            close_props(&mut open, &mut body, para.as_mut(), run.as_mut(), &xml[..end]);
                        },
                        _ => {},
                    }
                    path.pop();
                },
                Event::Text(ref e) => {
                    if in_run_text(&path)
                        && let Some(r) = run.as_mut()
                    {
                        push_text(&mut r.text, e)?;
                    }
                },
                Event::GeneralRef(ref e) => {
                    if in_run_text(&path)
                        && let Some(r) = run.as_mut()
                    {
                        push_entity(&mut r.text, e)?;
                    }
                },
                Event::CData(ref e) => {
                    if in_run_text(&path)
                        && let Some(r) = run.as_mut()
                    {
                        r.text.push_str(&e.decode().map_err(quick_xml::Error::from)?);
                    }
                },
                Event::Eof => {
                    return Err(OoxmlError::Xml("unexpected end of text body".to_string()));
                },
                _ => {},
            }
        }

        Ok(body)
    }

    /// Encode as `<{tag}>…</{tag}>`, `p:txBody` for shapes and `a:txBody` for table cells.
    pub(crate) fn write_xml(&self, xml: &mut String, tag: &str) -> Result<()> {
        write!(xml, "<{}>", tag)?;

        match self.body_source.get(&self.body_props) {
            Some(raw) => push_raw(xml, raw)?,
            None => self.body_props.write_xml(xml)?,
        }
        match self.list_style.raw() {
            Some(raw) => push_raw(xml, raw)?,
            None => xml.push_str("<a:lstStyle/>"),
        }

        if self.paragraphs.is_empty() {
            Paragraph::default().write_xml(xml)?;
        }
        for para in &self.paragraphs {
            para.write_xml(xml)?;
        }

        write!(xml, "</{}>", tag)?;
        Ok(())
    }
}

/// Attach the source span `xml[start..]` of the property element that just closed.
///
/// `xml` ends where the element ends.
fn close_props(
    open: &mut Option<OpenProps>,
    body: &mut TextBody,
    para: Option<&mut Paragraph>,
    run: Option<&mut Run>,
    xml: &[u8],
) {
    match open.take() {
        Some(OpenProps::Body(start)) => {
            body.body_source = Retained::new(body.body_props.clone(), xml[start..].to_vec());
        },
        Some(OpenProps::Paragraph(start)) => {
            if let Some(p) = para {
                p.props_source = Retained::new(p.properties.clone(), xml[start..].to_vec());
            }
        },
        Some(OpenProps::Run(start)) => {
            if let Some(r) = run {
                r.props_source = Retained::new(r.props.clone(), xml[start..].to_vec());
            }
        },
        None => {},
    }
}

/// Directly inside `a:r`, `a:fld` or `a:br`.
fn in_run(path: &ElementPath) -> bool {
    path.ends_with(&[b"r"]) || path.ends_with(&[b"fld"]) || path.ends_with(&[b"br"])
}

/// Inside `a:r/a:t` or `a:fld/a:t`.
fn in_run_text(path: &ElementPath) -> bool {
    path.depth() == 3 && (path.ends_with(&[b"r", b"t"]) || path.ends_with(&[b"fld", b"t"]))
}

fn xml_bool(v: &str) -> bool {
    matches!(v, "1" | "true" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::xml_reader;

    fn parse_body(xml: &str) -> TextBody {
        let mut reader = xml_reader(xml.as_bytes());
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"txBody" => break,
                Event::Eof => panic!("no txBody"),
                _ => {},
            }
        }
        TextBody::parse(&mut reader, xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_runs_and_formatting() {
        let body = parse_body(
            r#"<p:txBody xmlns:p="p" xmlns:a="a"><a:bodyPr wrap="square" anchor="ctr"><a:normAutofit/></a:bodyPr><a:lstStyle/>
<a:p><a:pPr lvl="1" algn="ctr"><a:buNone/></a:pPr><a:r><a:rPr lang="en-US" sz="2400" b="1" u="sng"><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill><a:latin typeface="Arial"/></a:rPr><a:t>Fish &amp; Chips</a:t></a:r><a:br/><a:r><a:t> two </a:t></a:r></a:p>
<a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody>"#,
        );

        assert_eq!(body.body_props.wrap.as_deref(), Some("square"));
        assert_eq!(body.body_props.anchor.as_deref(), Some("ctr"));
        assert!(body.body_props.normal_autofit);
        assert_eq!(body.paragraphs.len(), 2);

        let first = &body.paragraphs[0];
        assert_eq!(first.properties.level, 1);
        assert_eq!(first.properties.alignment, Some(Alignment::Center));
        assert!(first.properties.no_bullet);
        assert_eq!(first.runs.len(), 3);

        let props = &first.runs[0].props;
        assert_eq!(first.runs[0].text, "Fish & Chips");
        assert_eq!(props.size, Some(2400));
        assert_eq!(props.bold, Some(true));
        assert_eq!(props.underline.as_deref(), Some("sng"));
        assert!(props.is_underlined());
        assert_eq!(props.color.as_deref(), Some("FF0000"));
        assert_eq!(props.font_family.as_deref(), Some("Arial"));
        assert!(first.runs[1].is_line_break());
        assert_eq!(first.runs[2].text, " two ");

        assert_eq!(body.text(), "Fish & Chips\n two \n");
    }

    #[test]
    fn test_set_text_splits_paragraphs() {
        let mut body = TextBody::from_text("a\nb\n");
        assert_eq!(body.paragraphs.len(), 3);
        assert_eq!(body.text(), "a\nb\n");

        body.clear();
        assert!(body.is_blank());
        let mut xml = String::new();
        body.write_xml(&mut xml, "p:txBody").unwrap();
        assert_eq!(xml.matches("<a:p>").count(), 1);
    }

    #[test]
    fn test_write_then_parse_keeps_formatting() {
        let mut body = TextBody::from_text("Heading");
        {
            let run = &mut body.paragraphs[0].runs[0];
            run.props.set_size_pt(28.0);
            run.props.italic = Some(true);
            run.props.theme_color = Some("accent1".to_string());
            run.props.spacing = Some(-50);
        }
        body.paragraphs[0].set_level(12);
        body.add_paragraph("<tag>");

        let mut xml = String::new();
        body.write_xml(&mut xml, "p:txBody").unwrap();
        assert!(xml.contains(r#"sz="2800""#));
        assert!(xml.contains(r#"lvl="8""#));
        assert!(xml.contains("&lt;tag&gt;"));

        let parsed = parse_body(&xml);
        assert_eq!(parsed, body);
    }

    fn write_body(body: &TextBody) -> String {
        let mut xml = String::new();
        body.write_xml(&mut xml, "p:txBody").unwrap();
        xml
    }

    const FOOTER: &str = r#"<p:txBody><a:bodyPr vert="vert270" lIns="0"><a:prstTxWarp prst="textNoShape"/><a:normAutofit/></a:bodyPr><a:lstStyle><a:lvl1pPr algn="r"><a:defRPr sz="1200"/></a:lvl1pPr></a:lstStyle><a:p><a:pPr algn="r"><a:lnSpc><a:spcPct val="90000"/></a:lnSpc></a:pPr><a:fld id="{B6F15528-21DE-4FAA-801E-634DDDAF4B2B}" type="slidenum"><a:rPr lang="en-US" u="wavy"><a:solidFill><a:schemeClr val="tx1"><a:lumMod val="50000"/></a:schemeClr></a:solidFill></a:rPr><a:t>7</a:t></a:fld><a:r><a:rPr lang="en-US" u="dbl"/><a:t> of <![CDATA[<ten>]]></a:t></a:r><a:endParaRPr lang="fr-FR" sz="1100"/></a:p></p:txBody>"#;

    #[test]
    fn test_untouched_body_is_written_verbatim() {
        let body = parse_body(FOOTER);
        let para = &body.paragraphs[0];
        assert_eq!(para.properties.alignment, Some(Alignment::Right));
        assert_eq!(
            para.runs[0].field.as_ref().and_then(|f| f.field_type.as_deref()),
            Some("slidenum")
        );
        assert_eq!(para.runs[0].props.underline.as_deref(), Some("wavy"));
        assert_eq!(para.runs[1].text, " of <ten>");
        assert_eq!(body.text(), "7 of <ten>");

        // CDATA comes back escaped, everything else byte for byte
        let expected = FOOTER.replace("<![CDATA[<ten>]]>", "&lt;ten&gt;");
        assert_eq!(write_body(&body), expected);
    }

    #[test]
    fn test_edits_regenerate_only_what_changed() {
        let mut body = parse_body(FOOTER);
        body.paragraphs[0].runs[1].props.bold = Some(true);
        body.paragraphs[0].properties.level = 1;
        let xml = write_body(&body);

        assert!(xml.contains(r#"<a:rPr lang="en-US" b="1" u="dbl" dirty="0"/>"#));
        assert!(xml.contains(r#"<a:pPr lvl="1" algn="r"/>"#));
        assert!(xml.contains(r#"<a:fld id="{B6F15528-21DE-4FAA-801E-634DDDAF4B2B}" type="slidenum"><a:rPr lang="en-US" u="wavy">"#));
        assert!(xml.contains(r#"<a:lstStyle><a:lvl1pPr algn="r">"#));
        assert!(xml.contains(r#"<a:prstTxWarp prst="textNoShape"/>"#));
        assert!(xml.contains(r#"<a:endParaRPr lang="fr-FR" sz="1100"/>"#));
        assert_eq!(parse_body(&xml), body);
    }

    #[test]
    fn test_set_text_reuses_first_run_formatting() {
        let mut body = parse_body(
            r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="de-DE" sz="4400" b="1"/><a:t>Alt</a:t></a:r><a:r><a:rPr lang="de-DE" i="1"/><a:t>er</a:t></a:r></a:p></p:txBody>"#,
        );
        body.set_text("Neu\nZwei");

        assert_eq!(body.paragraphs.len(), 2);
        for para in &body.paragraphs {
            assert_eq!(para.properties.alignment, Some(Alignment::Center));
            assert_eq!(para.runs.len(), 1);
            assert_eq!(para.runs[0].props.size, Some(4400));
            assert_eq!(para.runs[0].props.bold, Some(true));
        }
        let xml = write_body(&body);
        assert_eq!(xml.matches(r#"<a:rPr lang="de-DE" sz="4400" b="1"/>"#).count(), 2);
        assert!(!xml.contains("endParaRPr"));
    }
}
