/// The presentation object: slide lifecycle on top of an OPC package.
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ooxml::error::{OoxmlError, Result, layout_not_found};
use crate::ooxml::opc::Package;
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::pptx::config::{LayoutFallback, PresentationConfig};
use crate::ooxml::pptx::parts::layout::find_layout_by_name;
use crate::ooxml::pptx::parts::{
    LayoutInfo, PresentationPart, SlideLayoutPart, SlideMasterPart, SlidePart, SlideRef, ThemeFonts,
    ThemePart, XmlPart, get_layout_info_list, theme_part_name,
};
use crate::ooxml::pptx::shapes::{Picture, Position, ShapeKind};
use crate::ooxml::pptx::slide::Slide;

const MAIN_PART: &str = "ppt/presentation.xml";
const MASTER_PART: &str = "ppt/slideMasters/slideMaster1.xml";
const THEME_PART: &str = "ppt/theme/theme1.xml";
const SLIDE_TEMPLATE: &str = "ppt/slides/slide%d.xml";

/// How `add_slide` picks a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSelector {
    /// Canonical layout index
    Index(usize),
    /// Layout name; an exact case-insensitive match wins over a substring one
    Name(String),
}

impl From<usize> for LayoutSelector {
    fn from(index: usize) -> Self {
        LayoutSelector::Index(index)
    }
}

impl From<&str> for LayoutSelector {
    fn from(name: &str) -> Self {
        LayoutSelector::Name(name.to_string())
    }
}

impl From<String> for LayoutSelector {
    fn from(name: String) -> Self {
        LayoutSelector::Name(name)
    }
}

impl fmt::Display for LayoutSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSelector::Index(i) => write!(f, "#{}", i),
            LayoutSelector::Name(name) => f.write_str(name),
        }
    }
}

/// Values derived from package bytes, valid for one generation.
#[derive(Debug, Default)]
struct DerivedCache {
    generation: u64,
    presentation: Option<Arc<PresentationPart>>,
    layouts: Option<Arc<Vec<LayoutInfo>>>,
    theme: Option<Arc<ThemePart>>,
}

/// A PowerPoint presentation.
///
/// Owns its [`Package`]; every structural edit goes through `&mut self` and
/// is written back to the package before the call returns. Slides are
/// addressed by 1-based number.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::Presentation;
///
/// let mut pres = Presentation::new()?;
/// assert_eq!(pres.get_layout_names()?[0], "Title Slide");
///
/// pres.add_slide(0, None)?;
/// pres.add_slide("Title and Content", None)?;
/// pres.reorder_slides(&[2, 1])?;
/// assert_eq!(pres.slide_count()?, 2);
///
/// let bytes = pres.to_bytes()?;
/// let reopened = Presentation::open(&bytes)?;
/// assert_eq!(reopened.slide_count()?, 2);
/// # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
/// ```
#[derive(Debug)]
pub struct Presentation {
    package: Package,
    main_part: String,
    config: PresentationConfig,
    generation: u64,
    cache: RefCell<DerivedCache>,
}

impl Presentation {
    /// A new presentation with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(PresentationConfig::default())
    }

    /// A new presentation: one theme, one master, the configured layouts and
    /// no slides.
    pub fn with_config(config: PresentationConfig) -> Result<Self> {
        config.validate()?;
        let (width, height) = (config.slide_width, config.slide_height);
        let mut package = Package::blank();

        ThemePart::office_default().store(&mut package, THEME_PART)?;

        let mut layout_rids = Vec::with_capacity(config.default_layouts.len());
        for (i, template) in config.default_layouts.iter().enumerate() {
            let name = format!("ppt/slideLayouts/slideLayout{}.xml", i + 1);
            SlideLayoutPart::new(&template.name, template.layout_type.as_deref(), template.to_tree())
                .store(&mut package, &name)?;
            package.relate_to(&name, MASTER_PART, rt::SLIDE_MASTER)?;
            layout_rids.push(package.relate_to(MASTER_PART, &name, rt::SLIDE_LAYOUT)?);
        }
        package.relate_to(MASTER_PART, THEME_PART, rt::THEME)?;
        SlideMasterPart::new(width, height, &layout_rids).store(&mut package, MASTER_PART)?;

        let mut part = PresentationPart::new(width, height);
        let master_rid = package.relate_to(MAIN_PART, MASTER_PART, rt::SLIDE_MASTER)?;
        part.add_master_ref(&master_rid);
        package.relate_to(MAIN_PART, THEME_PART, rt::THEME)?;
        part.store(&mut package, MAIN_PART)?;

        debug!(
            layouts = layout_rids.len(),
            width, height, "created presentation"
        );

        Ok(Self {
            package,
            main_part: MAIN_PART.to_string(),
            config,
            generation: 0,
            cache: RefCell::default(),
        })
    }

    /// Open a presentation from the bytes of a `.pptx` (or `.potx`/`.ppsx`).
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Self::from_package(Package::open(bytes)?)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(Package::open_path(path)?)
    }

    /// Open a template and drop all of its slides.
    ///
    /// A template main part is re-registered as a presentation so the result
    /// saves as a `.pptx`.
    pub fn from_template<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pres = Self::open_path(path)?;
        while pres.slide_count()? > 0 {
            pres.delete_slide(1)?;
        }
        if pres.package.content_type(&pres.main_part) != Some(ct::PML_PRESENTATION_MAIN) {
            let main_part = pres.main_part.clone();
            pres.package
                .content_types_mut()
                .add_override(&main_part, ct::PML_PRESENTATION_MAIN);
        }
        pres.touch();
        Ok(pres)
    }

    /// Wrap an already opened package.
    ///
    /// Fails with `InvalidTemplate` unless the package's main document is a
    /// presentation, template or slideshow part.
    pub fn from_package(package: Package) -> Result<Self> {
        let main_part = package
            .main_document_part()
            .map_err(|e| OoxmlError::InvalidTemplate(format!("no presentation part: {}", e)))?;
        match package.content_type(&main_part) {
            Some(ct::PML_PRESENTATION_MAIN | ct::PML_TEMPLATE_MAIN | ct::PML_SLIDESHOW_MAIN) => {},
            other => {
                return Err(OoxmlError::InvalidTemplate(format!(
                    "main part '{}' has content type '{}'",
                    main_part,
                    other.unwrap_or("none")
                )));
            },
        }
        if !package.contains_part(&main_part) {
            return Err(OoxmlError::InvalidTemplate(format!(
                "main part '{}' is missing",
                main_part
            )));
        }

        let part = PresentationPart::load(&package, &main_part)?;
        let (slide_width, slide_height) = part.get_slide_size();
        let config = PresentationConfig {
            slide_width,
            slide_height,
            ..Default::default()
        };

        let pres = Self {
            package,
            main_part,
            config,
            generation: 0,
            cache: RefCell::default(),
        };
        pres.cache.borrow_mut().presentation = Some(Arc::new(part));
        let layouts = pres.layouts()?;
        debug!(
            main_part = %pres.main_part,
            slides = pres.slide_count()?,
            layouts = layouts.len(),
            "opened presentation"
        );
        Ok(pres)
    }

    #[inline]
    pub fn package(&self) -> &Package {
        &self.package
    }

    #[inline]
    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    /// Change what `add_slide` does with an unknown layout.
    pub fn set_layout_fallback(&mut self, fallback: LayoutFallback) {
        self.config.layout_fallback = fallback;
    }

    /// Invalidate everything derived from the package.
    fn touch(&mut self) {
        self.generation += 1;
    }

    fn cached<T>(
        &self,
        select: impl Fn(&mut DerivedCache) -> &mut Option<Arc<T>>,
        derive: impl FnOnce() -> Result<T>,
    ) -> Result<Arc<T>> {
        let mut cache = self.cache.borrow_mut();
        if cache.generation != self.generation {
            *cache = DerivedCache {
                generation: self.generation,
                ..Default::default()
            };
        }
        if let Some(value) = select(&mut *cache) {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(derive()?);
        *select(&mut *cache) = Some(Arc::clone(&value));
        Ok(value)
    }

    fn presentation_part(&self) -> Result<Arc<PresentationPart>> {
        self.cached(
            |c| &mut c.presentation,
            || PresentationPart::load(&self.package, &self.main_part),
        )
    }

    fn layouts(&self) -> Result<Arc<Vec<LayoutInfo>>> {
        self.cached(|c| &mut c.layouts, || get_layout_info_list(&self.package))
    }

    fn theme_name(&self) -> Result<String> {
        theme_part_name(&self.package, &self.main_part)
            .ok_or_else(|| OoxmlError::InvalidTemplate("presentation has no theme".to_string()))
    }

    fn theme(&self) -> Result<Arc<ThemePart>> {
        self.cached(
            |c| &mut c.theme,
            || ThemePart::load(&self.package, &self.theme_name()?),
        )
    }

    pub fn slide_count(&self) -> Result<usize> {
        Ok(self.presentation_part()?.slide_count())
    }

    /// Slide width in EMU.
    pub fn slide_width(&self) -> Result<i64> {
        Ok(self.presentation_part()?.get_slide_size().0)
    }

    /// Slide height in EMU.
    pub fn slide_height(&self) -> Result<i64> {
        Ok(self.presentation_part()?.get_slide_size().1)
    }

    /// Slide references in display order.
    pub fn get_slide_refs(&self) -> Result<Vec<SlideRef>> {
        Ok(self.presentation_part()?.get_slide_refs().to_vec())
    }

    /// Layouts in canonical order.
    pub fn get_layouts(&self) -> Result<Vec<LayoutInfo>> {
        Ok(self.layouts()?.as_ref().clone())
    }

    pub fn get_layout_names(&self) -> Result<Vec<String>> {
        Ok(self.layouts()?.iter().map(|l| l.name.clone()).collect())
    }

    /// Theme colors as `#RRGGBB`, keyed by slot name.
    pub fn get_theme_colors(&self) -> Result<std::collections::BTreeMap<String, String>> {
        Ok(self.theme()?.colors_hex())
    }

    pub fn get_theme_fonts(&self) -> Result<ThemeFonts> {
        Ok(self.theme()?.fonts().clone())
    }

    /// Set a theme color slot, e.g. `accent1`, to `RRGGBB`.
    pub fn set_theme_color(&mut self, slot: &str, rgb: &str) -> Result<()> {
        let name = self.theme_name()?;
        let mut theme = self.theme()?.as_ref().clone();
        theme.set_color(slot, rgb)?;
        theme.store(&mut self.package, &name)?;
        self.touch();
        Ok(())
    }

    fn resolve_layout(&self, selector: &LayoutSelector) -> Result<LayoutInfo> {
        let layouts = self.layouts()?;
        let found = match selector {
            LayoutSelector::Index(i) => layouts.get(*i),
            LayoutSelector::Name(name) => find_layout_by_name(&layouts, name, true),
        };
        if let Some(layout) = found {
            return Ok(layout.clone());
        }

        let fallback = match self.config.layout_fallback {
            LayoutFallback::Strict => None,
            LayoutFallback::FirstLayout => layouts.first(),
            LayoutFallback::ByType => layouts
                .iter()
                .find(|l| l.layout_type.as_deref() == Some("obj"))
                .or_else(|| layouts.first()),
        };
        match fallback {
            Some(layout) => {
                warn!(requested = %selector, layout = %layout.name, "layout not found, falling back");
                Ok(layout.clone())
            },
            None => Err(layout_not_found(
                &selector.to_string(),
                layouts.iter().map(|l| l.name.clone()).collect(),
            )),
        }
    }

    /// Add a slide built from `layout` and return its 1-based number.
    ///
    /// `position` is 1-based and clamped to `1..=slide_count + 1`; `None`
    /// appends.
    pub fn add_slide(&mut self, layout: impl Into<LayoutSelector>, position: Option<usize>) -> Result<usize> {
        let layout = self.resolve_layout(&layout.into())?;
        let slide = SlidePart::from_layout(&SlideLayoutPart::load(&self.package, &layout.part_name)?);
        let mut part = self.presentation_part()?.as_ref().clone();
        part.next_slide_id()?;
        let slide_name = self.package.next_partname(SLIDE_TEMPLATE)?;

        slide.store(&mut self.package, &slide_name)?;
        self.package
            .relate_to(&slide_name, &layout.part_name, rt::SLIDE_LAYOUT)?;
        let r_id = self
            .package
            .relate_to(&self.main_part, &slide_name, rt::SLIDE)?;

        let count = part.slide_count();
        let index = position.map_or(count, |p| p.clamp(1, count + 1) - 1);
        let slide_id = part.add_slide_ref(&r_id, Some(index))?;
        part.store(&mut self.package, &self.main_part)?;
        self.touch();

        info!(
            slide = index + 1,
            slide_id,
            part = %slide_name,
            layout = %layout.name,
            "added slide"
        );
        Ok(index + 1)
    }

    /// Delete slide `number`; `false` when there is no such slide.
    pub fn delete_slide(&mut self, number: usize) -> Result<bool> {
        let part = self.presentation_part()?;
        if number == 0 || number > part.slide_count() {
            return Ok(false);
        }
        let r_id = part.get_slide_refs()[number - 1].r_id.clone();
        let slide_name = self.package.related_part_name(&self.main_part, &r_id)?;

        let mut part = part.as_ref().clone();
        part.remove_slide_ref(&r_id);
        part.store(&mut self.package, &self.main_part)?;
        let removed = self.package.drop_part(&slide_name);
        self.touch();

        info!(slide = number, part = %slide_name, removed = ?removed, "deleted slide");
        Ok(true)
    }

    /// Insert a new slide from the first layout right after slide `number`.
    ///
    /// The source slide's shapes are not copied.
    pub fn duplicate_slide(&mut self, number: usize) -> Result<usize> {
        let total = self.slide_count()?;
        if number == 0 || number > total {
            return Err(OoxmlError::SlideNotFound {
                requested: number,
                total,
            });
        }
        self.add_slide(0, Some(number + 1))
    }

    /// Reorder slides; `new_order[i]` is the current number of the slide that
    /// becomes slide `i + 1`.
    pub fn reorder_slides(&mut self, new_order: &[usize]) -> Result<()> {
        let part = self.presentation_part()?;
        check_permutation(new_order, part.slide_count())?;

        let refs = part.get_slide_refs();
        let order: Vec<&str> = new_order
            .iter()
            .map(|&n| refs[n - 1].r_id.as_str())
            .collect();
        let mut updated = part.as_ref().clone();
        updated.reorder_slides(&order);
        updated.store(&mut self.package, &self.main_part)?;
        self.touch();

        info!(order = ?new_order, "reordered slides");
        Ok(())
    }

    fn slide_part_name(&self, number: usize) -> Result<String> {
        let part = self.presentation_part()?;
        let total = part.slide_count();
        if number == 0 || number > total {
            return Err(OoxmlError::SlideNotFound {
                requested: number,
                total,
            });
        }
        let r_id = &part.get_slide_refs()[number - 1].r_id;
        Ok(self.package.related_part_name(&self.main_part, r_id)?)
    }

    fn load_slide(&self, number: usize) -> Result<(SlidePart, Slide)> {
        let name = self.slide_part_name(number)?;
        let part = SlidePart::load(&self.package, &name)?;
        let layout = self
            .package
            .related_part_by_type(&name, rt::SLIDE_LAYOUT)
            .ok();
        let slide = Slide::new(number, name, layout, part.tree().clone());
        Ok((part, slide))
    }

    /// Snapshot of slide `number`.
    pub fn get_slide(&self, number: usize) -> Result<Slide> {
        Ok(self.load_slide(number)?.1)
    }

    /// Snapshots of all slides in display order.
    pub fn slides(&self) -> Result<Vec<Slide>> {
        (1..=self.slide_count()?)
            .map(|n| self.get_slide(n))
            .collect()
    }

    /// Edit slide `number` and write it back.
    ///
    /// Nothing is stored when `f` fails.
    ///
    /// ```rust
    /// use slidekit::ooxml::pptx::{Presentation, shapes::Position};
    ///
    /// let mut pres = Presentation::new()?;
    /// pres.add_slide("Blank", None)?;
    /// let id = pres.with_slide_mut(1, |slide| Ok(slide.add_text_box("Draft", Position::new(0, 0, 914_400, 457_200))))?;
    /// assert_eq!(pres.get_slide(1)?.tree().get_shape_by_id(id).unwrap().text().as_deref(), Some("Draft"));
    /// # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
    /// ```
    pub fn with_slide_mut<T>(&mut self, number: usize, f: impl FnOnce(&mut Slide) -> Result<T>) -> Result<T> {
        let (mut part, mut slide) = self.load_slide(number)?;
        let before: Vec<String> = part.referenced_r_ids().into_iter().map(str::to_string).collect();
        let out = f(&mut slide)?;
        let name = slide.part_name().to_string();
        *part.tree_mut() = slide.into_tree();
        let xml = part.to_xml()?;

        // Media and charts of removed shapes go unless the slide still
        // mentions the relationship somewhere
        let after = part.referenced_r_ids();
        let released: Vec<String> = before
            .into_iter()
            .filter(|r_id| !after.contains(&r_id.as_str()) && !mentions_r_id(&xml, r_id))
            .collect();
        self.package.set_part(&name, xml, Some(SlidePart::CONTENT_TYPE))?;
        for r_id in released {
            let removed = self.package.drop_relationship(&name, &r_id);
            debug!(slide = number, r_id = %r_id, removed = ?removed, "released relationship");
        }
        self.touch();
        Ok(out)
    }

    /// Embed an image on slide `number` and return the new picture's shape id.
    ///
    /// `ext` picks the content type (`png`, `jpg`, `gif`, `bmp`, `tiff`,
    /// `emf`, `wmf`); the bytes must carry the matching signature.
    pub fn add_image(&mut self, number: usize, bytes: &[u8], ext: &str, position: Position) -> Result<u32> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        let content_type = ct::for_image_ext(&ext)
            .ok_or_else(|| OoxmlError::InvalidInput(format!("unsupported image type '{}'", ext)))?;
        if !has_image_signature(&ext, bytes) {
            return Err(OoxmlError::InvalidInput(format!(
                "data is not a valid {} image",
                ext
            )));
        }

        let (mut part, slide) = self.load_slide(number)?;
        let slide_name = slide.part_name().to_string();
        let media_name = self
            .package
            .next_partname(&format!("ppt/media/image%d.{}", ext))?;
        self.package
            .set_part(&media_name, bytes.to_vec(), Some(content_type))?;
        let r_id = self.package.relate_to(&slide_name, &media_name, rt::IMAGE)?;

        let id = part
            .tree_mut()
            .add_shape(ShapeKind::Picture(Picture::new(r_id, position)));
        if let Some(ShapeKind::Picture(picture)) = part.tree_mut().get_shape_by_id_mut(id) {
            picture.name = format!("Picture {}", id - 1);
        }
        part.store(&mut self.package, &slide_name)?;
        self.touch();

        debug!(slide = number, media = %media_name, bytes = bytes.len(), "added image");
        Ok(id)
    }

    /// Serialize to the bytes of a `.pptx`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.package.to_bytes()?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.package.save(path)?;
        Ok(())
    }
}

/// `Ok` iff `order` is a permutation of `1..=count`.
fn check_permutation(order: &[usize], count: usize) -> Result<()> {
    if order.len() != count {
        return Err(OoxmlError::InvalidPermutation(format!(
            "expected {} slide numbers, got {}",
            count,
            order.len()
        )));
    }
    let mut seen = vec![false; count];
    for &n in order {
        if n == 0 || n > count {
            return Err(OoxmlError::InvalidPermutation(format!(
                "slide {} is out of range 1-{}",
                n, count
            )));
        }
        if std::mem::replace(&mut seen[n - 1], true) {
            return Err(OoxmlError::InvalidPermutation(format!(
                "slide {} appears more than once",
                n
            )));
        }
    }
    Ok(())
}

/// Whether `xml` holds `r_id` as an attribute value.
fn mentions_r_id(xml: &[u8], r_id: &str) -> bool {
    let quoted = format!("\"{}\"", r_id);
    xml.windows(quoted.len()).any(|w| w == quoted.as_bytes())
}

fn has_image_signature(ext: &str, bytes: &[u8]) -> bool {
    match ext {
        "png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "jpg" | "jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
        "bmp" => bytes.starts_with(b"BM"),
        "tif" | "tiff" => bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*"),
        "emf" => bytes.starts_with(&[1, 0, 0, 0]) && bytes.get(40..44) == Some(b" EMF".as_slice()),
        "wmf" => {
            bytes.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A])
                || bytes.starts_with(&[1, 0, 9, 0])
                || bytes.starts_with(&[2, 0, 9, 0])
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_new_presentation() {
        let pres = Presentation::new().unwrap();
        assert_eq!(pres.slide_count().unwrap(), 0);
        assert_eq!(pres.slide_width().unwrap(), 12_192_000);
        assert_eq!(pres.slide_height().unwrap(), 6_858_000);
        assert_eq!(pres.get_layout_names().unwrap().len(), 6);
        assert_eq!(pres.get_theme_colors().unwrap()["accent1"], "#4472C4");
        assert_eq!(pres.get_theme_fonts().unwrap().heading, "Calibri Light");
        pres.package().validate().unwrap();
    }

    #[test]
    fn test_add_slide_positions() {
        let mut pres = Presentation::new().unwrap();
        assert_eq!(pres.add_slide("Title Slide", None).unwrap(), 1);
        assert_eq!(pres.add_slide("Blank", Some(1)).unwrap(), 1);
        assert_eq!(pres.add_slide(1, Some(99)).unwrap(), 3);
        assert_eq!(pres.add_slide(1, Some(0)).unwrap(), 1);

        let layouts: Vec<String> = pres
            .slides()
            .unwrap()
            .iter()
            .map(|s| s.layout_part_name().unwrap().to_string())
            .collect();
        assert_eq!(
            layouts,
            [
                "ppt/slideLayouts/slideLayout2.xml",
                "ppt/slideLayouts/slideLayout5.xml",
                "ppt/slideLayouts/slideLayout1.xml",
                "ppt/slideLayouts/slideLayout2.xml",
            ]
        );
    }

    #[test]
    fn test_layout_resolution() {
        let mut pres = Presentation::new().unwrap();
        match pres.add_slide("Title Slde", None) {
            Err(OoxmlError::LayoutNotFound { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("Title Slide"))
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            pres.add_slide("Agenda", None),
            Err(OoxmlError::LayoutNotFound { .. })
        ));
        assert!(matches!(
            pres.add_slide(42, None),
            Err(OoxmlError::LayoutNotFound { .. })
        ));
        assert_eq!(pres.slide_count().unwrap(), 0);

        pres.set_layout_fallback(LayoutFallback::ByType);
        pres.add_slide("Agenda", None).unwrap();
        assert_eq!(
            pres.get_slide(1).unwrap().layout_part_name(),
            Some("ppt/slideLayouts/slideLayout2.xml")
        );
    }

    #[test]
    fn test_delete_and_reuse_part_name() {
        let mut pres = Presentation::new().unwrap();
        for _ in 0..3 {
            pres.add_slide(0, None).unwrap();
        }
        assert!(!pres.delete_slide(0).unwrap());
        assert!(!pres.delete_slide(4).unwrap());
        assert!(pres.delete_slide(2).unwrap());
        assert!(!pres.package().contains_part("ppt/slides/slide2.xml"));
        assert_eq!(pres.get_slide(2).unwrap().part_name(), "ppt/slides/slide3.xml");

        pres.add_slide(0, None).unwrap();
        assert_eq!(pres.get_slide(3).unwrap().part_name(), "ppt/slides/slide2.xml");
        pres.package().validate().unwrap();
    }

    #[test]
    fn test_delete_slide_removes_its_notes() {
        let mut pres = Presentation::new().unwrap();
        pres.add_slide("Title Slide", None).unwrap();
        pres.add_slide("Blank", None).unwrap();

        let slide = "ppt/slides/slide1.xml";
        let notes = "ppt/notesSlides/notesSlide1.xml";
        pres.package
            .set_part(notes, b"<p:notes/>".to_vec(), Some(ct::PML_NOTES_SLIDE))
            .unwrap();
        pres.package.relate_to(slide, notes, rt::NOTES_SLIDE).unwrap();
        pres.package.relate_to(notes, slide, rt::SLIDE).unwrap();
        pres.package.validate().unwrap();

        assert!(pres.delete_slide(1).unwrap());
        assert!(!pres.package().contains_part(notes));
        assert!(!pres.package().contains_part(slide));
        assert!(pres.package().contains_part("ppt/slideLayouts/slideLayout1.xml"));
        assert!(pres.to_bytes().is_ok());

        let reopened = Presentation::open(&pres.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.slide_count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_slide() {
        let mut pres = Presentation::new().unwrap();
        pres.add_slide("Blank", None).unwrap();
        pres.add_slide("Blank", None).unwrap();
        assert!(matches!(
            pres.duplicate_slide(3),
            Err(OoxmlError::SlideNotFound { requested: 3, total: 2 })
        ));
        assert_eq!(pres.duplicate_slide(1).unwrap(), 2);
        let copy = pres.get_slide(2).unwrap();
        assert_eq!(copy.layout_part_name(), Some("ppt/slideLayouts/slideLayout1.xml"));
    }

    #[test]
    fn test_reorder_rejects_before_mutation() {
        let mut pres = Presentation::new().unwrap();
        for _ in 0..3 {
            pres.add_slide(4, None).unwrap();
        }
        let before = pres.get_slide_refs().unwrap();
        let bad_orders: [&[usize]; 5] = [&[1, 2], &[1, 1, 2], &[0, 1, 2], &[1, 2, 4], &[1, 2, 3, 3]];
        for bad in bad_orders {
            assert!(matches!(
                pres.reorder_slides(bad),
                Err(OoxmlError::InvalidPermutation(_))
            ));
        }
        assert_eq!(pres.get_slide_refs().unwrap(), before);

        pres.reorder_slides(&[2, 3, 1]).unwrap();
        let after = pres.get_slide_refs().unwrap();
        assert_eq!(after, vec![before[1].clone(), before[2].clone(), before[0].clone()]);
    }

    #[test]
    fn test_with_slide_mut_persists() {
        let mut pres = Presentation::new().unwrap();
        pres.add_slide("Title and Content", None).unwrap();
        pres.with_slide_mut(1, |slide| {
            slide.set_placeholder_text("title", "Results")?;
            slide.set_placeholder_text("content", "Up\nand to the right")
        })
        .unwrap();

        let err = pres
            .with_slide_mut(1, |slide| {
                slide.set_placeholder_text("title", "Lost")?;
                slide.set_placeholder_text("footer", "x")
            })
            .unwrap_err();
        assert!(matches!(err, OoxmlError::PlaceholderNotFound { .. }));

        let slide = pres.get_slide(1).unwrap();
        assert_eq!(slide.get_title().as_deref(), Some("Results"));
        assert_eq!(slide.get_body().as_deref(), Some("Up\nand to the right"));
    }

    #[test]
    fn test_add_image() {
        let mut pres = Presentation::new().unwrap();
        pres.add_slide("Blank", None).unwrap();

        let id = pres
            .add_image(1, PNG, ".PNG", Position::new(0, 0, 914_400, 914_400))
            .unwrap();
        assert_eq!(id, 2);
        assert_eq!(pres.package().content_type("ppt/media/image1.png"), Some(ct::PNG));

        let slide = pres.get_slide(1).unwrap();
        let r_id = match slide.tree().get_shape_by_id(id) {
            Some(ShapeKind::Picture(p)) => p.r_embed.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(
            pres.package().related_part_name(slide.part_name(), &r_id).unwrap(),
            "ppt/media/image1.png"
        );

        assert!(matches!(
            pres.add_image(1, b"not an image", "png", Position::default()),
            Err(OoxmlError::InvalidInput(_))
        ));
        assert!(matches!(
            pres.add_image(1, PNG, "svg", Position::default()),
            Err(OoxmlError::InvalidInput(_))
        ));
        assert!(matches!(
            pres.add_image(2, PNG, "png", Position::default()),
            Err(OoxmlError::SlideNotFound { .. })
        ));
        pres.package().validate().unwrap();
    }

    #[test]
    fn test_removed_picture_releases_media() {
        let mut pres = Presentation::new().unwrap();
        pres.add_slide("Blank", None).unwrap();
        let keep = pres.add_image(1, PNG, "png", Position::default()).unwrap();
        let gone = pres.add_image(1, PNG, "png", Position::default()).unwrap();
        assert!(pres.package().contains_part("ppt/media/image2.png"));

        pres.with_slide_mut(1, |slide| Ok(slide.tree_mut().remove_shape(gone)))
            .unwrap();
        assert!(!pres.package().contains_part("ppt/media/image2.png"));
        assert!(pres.package().contains_part("ppt/media/image1.png"));
        assert_eq!(
            pres.package()
                .rels("ppt/slides/slide1.xml")
                .unwrap()
                .with_reltype(rt::IMAGE)
                .count(),
            1
        );
        assert!(pres.get_slide(1).unwrap().tree().contains(keep));

        // Edits that keep the picture leave the media alone
        pres.with_slide_mut(1, |slide| Ok(slide.add_text_box("caption", Position::default())))
            .unwrap();
        assert!(pres.package().contains_part("ppt/media/image1.png"));
        pres.package().validate().unwrap();
    }

    #[test]
    fn test_set_theme_color_invalidates_cache() {
        let mut pres = Presentation::new().unwrap();
        assert_eq!(pres.get_theme_colors().unwrap()["accent2"], "#ED7D31");
        pres.set_theme_color("accent2", "112233").unwrap();
        assert_eq!(pres.get_theme_colors().unwrap()["accent2"], "#112233");
        assert!(pres.set_theme_color("accent9", "112233").is_err());
    }

    #[test]
    fn test_open_rejects_non_presentation() {
        let mut package = Package::blank();
        package
            .set_part(MAIN_PART, b"<w:document/>".to_vec(), Some("application/xml"))
            .unwrap();
        assert!(matches!(
            Presentation::from_package(package),
            Err(OoxmlError::InvalidTemplate(_))
        ));

        assert!(matches!(
            Presentation::from_package(Package::new()),
            Err(OoxmlError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_config_slide_size() {
        let config = PresentationConfig {
            slide_width: 9_144_000,
            ..Default::default()
        };
        let pres = Presentation::with_config(config).unwrap();
        let reopened = Presentation::open(&pres.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.slide_width().unwrap(), 9_144_000);
        assert_eq!(reopened.config().slide_width, 9_144_000);
    }

    #[test]
    fn test_permutation_check() {
        assert!(check_permutation(&[], 0).is_ok());
        assert!(check_permutation(&[3, 1, 2], 3).is_ok());
        assert!(check_permutation(&[3, 1], 3).is_err());
        assert!(check_permutation(&[3, 3, 2], 3).is_err());
    }
}
