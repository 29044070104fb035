/// Chart frames (`p:graphicFrame` hosting `c:chart`).
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::namespace;
use std::fmt::Write as FmtWrite;

use super::base::{Placeholder, Position, ShapeExtras, write_c_nv_pr, write_nv_pr};

/// A chart reference. The chart itself is a separate part reached through
/// the slide relationship `r_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chart {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub r_id: String,
    /// Set on chart placeholders of layouts
    pub placeholder: Option<Placeholder>,
}

impl Chart {
    pub fn new<S: Into<String>>(r_id: S, position: Position) -> Self {
        Self {
            id: 0,
            name: "Chart".to_string(),
            position,
            r_id: r_id.into(),
            placeholder: None,
        }
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<p:graphicFrame><p:nvGraphicFramePr>");
        let extras = ShapeExtras::default();
        write_c_nv_pr(xml, self.id, &self.name, None, &extras)?;
        xml.push_str("<p:cNvGraphicFramePr/>");
        write_nv_pr(xml, self.placeholder.as_ref(), &extras)?;
        xml.push_str("</p:nvGraphicFramePr>");
        self.position.write_xfrm(xml, "p:xfrm")?;
        write!(
            xml,
            r#"<a:graphic><a:graphicData uri="{chart}"><c:chart xmlns:c="{chart}" xmlns:r="{rels}" r:id="{}"/></a:graphicData></a:graphic>"#,
            self.r_id,
            chart = namespace::DML_CHART,
            rels = namespace::OFC_RELATIONSHIPS,
        )?;
        xml.push_str("</p:graphicFrame>");
        Ok(())
    }
}
