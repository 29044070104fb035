/// Presentation part - the main part in a .pptx package.
///
/// Corresponds to `/ppt/presentation.xml` in the package. Slide display order
/// is the order of `p:sldIdLst`, never the numbering of slide file names.
use std::fmt::Write as FmtWrite;

use quick_xml::events::Event;

use super::{PML_NAMESPACES, XML_DECLARATION, XmlPart, element_span};
use crate::common::xml::{ElementPath, attr_i64, attr_prefixed, attr_u32, push_raw, xml_reader};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;

/// Default slide width: 13.333 in (16:9).
pub const DEFAULT_SLIDE_WIDTH: i64 = 12_192_000;
/// Default slide height: 7.5 in.
pub const DEFAULT_SLIDE_HEIGHT: i64 = 6_858_000;

/// Smallest slide id PowerPoint accepts.
const MIN_SLIDE_ID: u32 = 256;
/// Largest slide id PowerPoint accepts.
const MAX_SLIDE_ID: u32 = 2_147_483_647;
/// Master and layout ids share a range starting here.
pub(crate) const MIN_MASTER_ID: u32 = 2_147_483_648;

/// An entry of `p:sldIdLst`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlideRef {
    pub r_id: String,
    pub slide_id: u32,
}

/// An entry of `p:sldMasterIdLst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRef {
    pub r_id: String,
    pub id: u32,
}

/// The main presentation part.
///
/// Only the slide list, master list and slide size are modeled. Everything
/// else in `presentation.xml` is written back as it was read.
///
/// # Example
///
/// ```rust
/// use slidekit::ooxml::pptx::parts::PresentationPart;
///
/// let mut part = PresentationPart::new(9_144_000, 6_858_000);
/// assert_eq!(part.add_slide_ref("rId7", None)?, 256);
/// assert_eq!(part.add_slide_ref("rId8", Some(0))?, 257);
/// assert_eq!(part.get_slide_refs()[0].r_id, "rId8");
/// # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationPart {
    xml: Vec<u8>,
    slide_refs: Vec<SlideRef>,
    master_refs: Vec<MasterRef>,
    slide_size: Option<(i64, i64)>,
}

impl PresentationPart {
    /// An empty presentation of the given size in EMU.
    pub fn new(width: i64, height: i64) -> Self {
        let mut xml = String::with_capacity(512);
        xml.push_str(XML_DECLARATION);
        let _ = write!(
            xml,
            r#"<p:presentation {} saveSubsetFonts="1"><p:sldMasterIdLst/><p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            PML_NAMESPACES, width, height
        );
        Self {
            xml: xml.into_bytes(),
            slide_refs: Vec::new(),
            master_refs: Vec::new(),
            slide_size: Some((width, height)),
        }
    }

    /// Slide references in display order.
    #[inline]
    pub fn get_slide_refs(&self) -> &[SlideRef] {
        &self.slide_refs
    }

    #[inline]
    pub fn get_master_refs(&self) -> &[MasterRef] {
        &self.master_refs
    }

    #[inline]
    pub fn slide_count(&self) -> usize {
        self.slide_refs.len()
    }

    /// `(width, height)` in EMU, 16:9 when the part declares none.
    pub fn get_slide_size(&self) -> (i64, i64) {
        self.slide_size
            .unwrap_or((DEFAULT_SLIDE_WIDTH, DEFAULT_SLIDE_HEIGHT))
    }

    pub fn set_slide_size(&mut self, width: i64, height: i64) {
        self.slide_size = Some((width, height));
    }

    /// Id the next added slide gets: one past the largest in use.
    pub fn next_slide_id(&self) -> Result<u32> {
        match self.slide_refs.iter().map(|r| r.slide_id).max() {
            None => Ok(MIN_SLIDE_ID),
            Some(max) => max
                .max(MIN_SLIDE_ID - 1)
                .checked_add(1)
                .filter(|&id| id <= MAX_SLIDE_ID)
                .ok_or_else(|| OoxmlError::InvalidInput(format!("no slide id left after {}", max))),
        }
    }

    /// Insert a slide reference at a 0-based position (`None` appends) and
    /// return its new slide id.
    pub fn add_slide_ref(&mut self, r_id: &str, position: Option<usize>) -> Result<u32> {
        let slide_id = self.next_slide_id()?;
        let entry = SlideRef {
            r_id: r_id.to_string(),
            slide_id,
        };
        let at = position
            .unwrap_or(self.slide_refs.len())
            .min(self.slide_refs.len());
        self.slide_refs.insert(at, entry);
        Ok(slide_id)
    }

    pub fn remove_slide_ref(&mut self, r_id: &str) -> bool {
        let before = self.slide_refs.len();
        self.slide_refs.retain(|r| r.r_id != r_id);
        self.slide_refs.len() != before
    }

    /// Put the listed references first, in the given order.
    ///
    /// Unknown or repeated rIds are ignored and unlisted references keep their
    /// relative order after the listed ones, so no reference is ever created
    /// or lost.
    pub fn reorder_slides<S: AsRef<str>>(&mut self, r_id_order: &[S]) {
        let mut remaining = std::mem::take(&mut self.slide_refs);
        let mut ordered = Vec::with_capacity(remaining.len());
        for r_id in r_id_order {
            if let Some(pos) = remaining.iter().position(|r| r.r_id == r_id.as_ref()) {
                ordered.push(remaining.remove(pos));
            }
        }
        ordered.extend(remaining);
        self.slide_refs = ordered;
    }

    /// Register a slide master and return its id.
    pub fn add_master_ref(&mut self, r_id: &str) -> u32 {
        let id = self
            .master_refs
            .iter()
            .map(|m| m.id + 1)
            .max()
            .unwrap_or(MIN_MASTER_ID)
            .max(MIN_MASTER_ID);
        self.master_refs.push(MasterRef {
            r_id: r_id.to_string(),
            id,
        });
        id
    }

    fn write_master_list(&self, xml: &mut String) -> Result<()> {
        if self.master_refs.is_empty() {
            xml.push_str("<p:sldMasterIdLst/>");
            return Ok(());
        }
        xml.push_str("<p:sldMasterIdLst>");
        for m in &self.master_refs {
            write!(xml, r#"<p:sldMasterId id="{}" r:id="{}"/>"#, m.id, m.r_id)?;
        }
        xml.push_str("</p:sldMasterIdLst>");
        Ok(())
    }

    fn write_slide_list(&self, xml: &mut String) -> Result<()> {
        if self.slide_refs.is_empty() {
            return Ok(());
        }
        xml.push_str("<p:sldIdLst>");
        for s in &self.slide_refs {
            write!(xml, r#"<p:sldId id="{}" r:id="{}"/>"#, s.slide_id, s.r_id)?;
        }
        xml.push_str("</p:sldIdLst>");
        Ok(())
    }
}

impl XmlPart for PresentationPart {
    const CONTENT_TYPE: &'static str = ct::PML_PRESENTATION_MAIN;

    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = xml_reader(xml);
        let mut path = ElementPath::new();
        let mut slide_refs = Vec::new();
        let mut master_refs = Vec::new();
        let mut slide_size = None;
        let mut seen_root = false;

        loop {
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    if !seen_root {
                        seen_root = true;
                        if local.as_ref() != b"presentation" {
                            return Err(OoxmlError::InvalidTemplate(format!(
                                "main part root is <{}>, expected <p:presentation>",
                                String::from_utf8_lossy(local.as_ref())
                            )));
                        }
                    }
                    match local.as_ref() {
                        b"sldId" if path.ends_with(&[b"sldIdLst"]) => {
                            if let (Some(slide_id), Some(r_id)) = (attr_u32(e, b"id"), attr_prefixed(e, b"id")?) {
                                slide_refs.push(SlideRef { r_id, slide_id });
                            }
                        },
                        b"sldMasterId" if path.ends_with(&[b"sldMasterIdLst"]) => {
                            if let (Some(id), Some(r_id)) = (attr_u32(e, b"id"), attr_prefixed(e, b"id")?) {
                                master_refs.push(MasterRef { r_id, id });
                            }
                        },
                        b"sldSz" if path.depth() == 1 => {
                            if let (Some(cx), Some(cy)) = (attr_i64(e, b"cx"), attr_i64(e, b"cy")) {
                                slide_size = Some((cx, cy));
                            }
                        },
                        _ => {},
                    }
                    if opened {
                        path.push(local.as_ref());
                    }
                },
                Event::End(_) => {
                    path.pop();
                },
                Event::Eof => break,
                _ => {},
            }
        }

        if !seen_root {
            return Err(OoxmlError::InvalidTemplate("presentation part is empty".to_string()));
        }

        Ok(Self {
            xml: xml.to_vec(),
            slide_refs,
            master_refs,
            slide_size,
        })
    }

    /// Rewrite the master list, slide list and slide size in place.
    ///
    /// `notesMasterIdLst` and `handoutMasterIdLst`, which sit between them,
    /// are copied through.
    fn to_xml(&self) -> Result<Vec<u8>> {
        let xml = self.xml.as_slice();
        let span_of = |name: &[u8]| element_span(xml, &[b"presentation", name]);

        let masters = span_of(b"sldMasterIdLst")?;
        let notes = span_of(b"notesMasterIdLst")?;
        let handout = span_of(b"handoutMasterIdLst")?;
        let slides = span_of(b"sldIdLst")?;
        let size = span_of(b"sldSz")?;

        let spans = [&masters, &notes, &handout, &slides, &size];
        let start = spans.iter().filter_map(|s| s.as_ref().map(|r| r.start)).min();
        let end = spans.iter().filter_map(|s| s.as_ref().map(|r| r.end)).max();
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                let at = span_of(b"notesSz")?
                    .map(|r| r.start)
                    .ok_or_else(|| OoxmlError::Xml("presentation part has no p:notesSz".to_string()))?;
                (at, at)
            },
        };

        let mut lists = String::with_capacity(256);
        self.write_master_list(&mut lists)?;
        if let Some(r) = notes {
            push_raw(&mut lists, &xml[r])?;
        }
        if let Some(r) = handout {
            push_raw(&mut lists, &xml[r])?;
        }
        self.write_slide_list(&mut lists)?;
        if let Some((cx, cy)) = self.slide_size {
            write!(lists, r#"<p:sldSz cx="{}" cy="{}"/>"#, cx, cy)?;
        } else if let Some(r) = size {
            push_raw(&mut lists, &xml[r])?;
        }

        let mut out = Vec::with_capacity(xml.len() + lists.len());
        out.extend_from_slice(&xml[..start]);
        out.extend_from_slice(lists.as_bytes());
        out.extend_from_slice(&xml[end..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESENTATION: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<p:presentation xmlns:a="a" xmlns:r="r" xmlns:p="p">"#,
        r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
        r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId9"/></p:notesMasterIdLst>"#,
        r#"<p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="260" r:id="rId3"/><p:sldId id="257" r:id="rId4"/></p:sldIdLst>"#,
        r#"<p:sldSz cx="9144000" cy="6858000" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/>"#,
        r#"<p:defaultTextStyle><a:lvl1pPr/></p:defaultTextStyle></p:presentation>"#
    );

    fn r_ids(part: &PresentationPart) -> Vec<&str> {
        part.get_slide_refs().iter().map(|r| r.r_id.as_str()).collect()
    }

    #[test]
    fn test_parse_lists() {
        let part = PresentationPart::from_xml(PRESENTATION.as_bytes()).unwrap();
        assert_eq!(r_ids(&part), vec!["rId2", "rId3", "rId4"]);
        assert_eq!(part.get_slide_refs()[1].slide_id, 260);
        assert_eq!(part.get_master_refs()[0].id, 2_147_483_648);
        assert_eq!(part.get_slide_size(), (9_144_000, 6_858_000));
    }

    #[test]
    fn test_default_size() {
        let part = PresentationPart::from_xml(br#"<p:presentation><p:notesSz cx="1" cy="1"/></p:presentation>"#).unwrap();
        assert_eq!(part.get_slide_size(), (DEFAULT_SLIDE_WIDTH, DEFAULT_SLIDE_HEIGHT));
    }

    #[test]
    fn test_wrong_root() {
        let err = PresentationPart::from_xml(b"<w:document/>").unwrap_err();
        assert!(matches!(err, OoxmlError::InvalidTemplate(_)));
    }

    #[test]
    fn test_slide_ids_and_positions() {
        let mut part = PresentationPart::from_xml(PRESENTATION.as_bytes()).unwrap();
        assert_eq!(part.add_slide_ref("rId10", Some(1)).unwrap(), 261);
        assert_eq!(part.add_slide_ref("rId11", Some(99)).unwrap(), 262);
        assert_eq!(r_ids(&part), vec!["rId2", "rId10", "rId3", "rId4", "rId11"]);

        assert!(part.remove_slide_ref("rId3"));
        assert!(!part.remove_slide_ref("rId3"));
        assert_eq!(part.slide_count(), 4);
    }

    #[test]
    fn test_slide_ids_run_out() {
        for last in ["2147483647", "4294967295"] {
            let xml = format!(
                r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="{}" r:id="rId2"/></p:sldIdLst></p:presentation>"#,
                last
            );
            let mut part = PresentationPart::from_xml(xml.as_bytes()).unwrap();
            assert!(matches!(part.add_slide_ref("rId3", None), Err(OoxmlError::InvalidInput(_))));
            assert_eq!(r_ids(&part), vec!["rId2"]);
        }
    }

    #[test]
    fn test_reorder_only_permutes() {
        let mut part = PresentationPart::from_xml(PRESENTATION.as_bytes()).unwrap();
        part.reorder_slides(&["rId4", "rId99", "rId2", "rId4"]);
        assert_eq!(r_ids(&part), vec!["rId4", "rId2", "rId3"]);
    }

    #[test]
    fn test_rewrite_keeps_other_elements() {
        let mut part = PresentationPart::from_xml(PRESENTATION.as_bytes()).unwrap();
        part.remove_slide_ref("rId3");
        part.add_slide_ref("rId12", Some(0)).unwrap();
        part.set_slide_size(12_192_000, 6_858_000);

        let xml = String::from_utf8(part.to_xml().unwrap()).unwrap();
        assert!(xml.contains(r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId9"/></p:notesMasterIdLst>"#));
        assert!(xml.contains(r#"<p:sldIdLst><p:sldId id="258" r:id="rId12"/><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId4"/></p:sldIdLst>"#));
        assert!(xml.contains(r#"<p:sldSz cx="12192000" cy="6858000"/><p:notesSz"#));
        assert!(xml.contains("<p:defaultTextStyle><a:lvl1pPr/></p:defaultTextStyle>"));

        let again = PresentationPart::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(again.get_slide_refs(), part.get_slide_refs());
        assert_eq!(again.get_master_refs(), part.get_master_refs());
    }

    #[test]
    fn test_new_part_gains_slide_list() {
        let mut part = PresentationPart::new(9_144_000, 5_143_500);
        part.add_master_ref("rId1");
        part.add_slide_ref("rId2", None).unwrap();

        let again = PresentationPart::from_xml(&part.to_xml().unwrap()).unwrap();
        assert_eq!(again.get_slide_refs()[0].r_id, "rId2");
        assert_eq!(again.get_master_refs()[0].id, MIN_MASTER_ID);
        assert_eq!(again.get_slide_size(), (9_144_000, 5_143_500));
    }
}
