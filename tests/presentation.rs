use proptest::prelude::*;
use slidekit::ooxml::pptx::shapes::{Position, ShapeKind};
use slidekit::ooxml::pptx::{Slide, get_layout_by_name};
use slidekit::{OoxmlError, Presentation, Template};

fn deck(n: usize) -> Presentation {
    let mut pres = Presentation::new().unwrap();
    for i in 0..n {
        pres.add_slide("Title Only", None).unwrap();
        pres.with_slide_mut(i + 1, |slide| slide.set_placeholder_text("title", &format!("Slide {}", i + 1)))
            .unwrap();
    }
    pres
}

fn titles(pres: &Presentation) -> Vec<String> {
    pres.slides()
        .unwrap()
        .iter()
        .map(|s: &Slide| s.get_title().unwrap_or_default())
        .collect()
}

#[test]
fn new_presentation_has_default_layouts() {
    let pres = Presentation::new().unwrap();
    assert_eq!(pres.slide_count().unwrap(), 0);
    let names = pres.get_layout_names().unwrap();
    assert_eq!(names.len(), 6);
    assert_eq!(names[0], "Title Slide");
}

#[test]
fn added_slide_copies_layout_geometry() {
    let mut pres = Presentation::new().unwrap();
    pres.add_slide(0, None).unwrap();
    assert_eq!(pres.slide_count().unwrap(), 1);

    let slide = pres.get_slide(1).unwrap();
    let title = slide.find_placeholder("ctrTitle").unwrap();
    assert_eq!(title.position(), Some(Position::new(685_800, 2_130_425, 7_772_400, 1_470_025)));

    let layout = &pres.get_layouts().unwrap()[0];
    for ph in &layout.placeholders {
        let clone = slide
            .tree()
            .get_placeholder(Some(&ph.ph_type), ph.idx)
            .unwrap_or_else(|| panic!("missing {}", ph.key));
        assert_eq!(clone.position(), Some(ph.bounds));
        assert_eq!(clone.text().as_deref(), Some(""));
    }
}

#[test]
fn delete_shifts_later_slides_down() {
    let mut pres = deck(3);
    assert!(pres.delete_slide(2).unwrap());
    assert_eq!(pres.slide_count().unwrap(), 2);
    assert_eq!(pres.get_slide(2).unwrap().get_title().as_deref(), Some("Slide 3"));
    assert!(matches!(
        pres.get_slide(3),
        Err(OoxmlError::SlideNotFound { requested: 3, total: 2 })
    ));
}

#[test]
fn reorder_moves_last_slide_first() {
    let mut pres = deck(3);
    pres.reorder_slides(&[3, 1, 2]).unwrap();
    assert_eq!(titles(&pres), ["Slide 3", "Slide 1", "Slide 2"]);
}

#[test]
fn layout_lookup_normalizes_names() {
    let pres = Presentation::new().unwrap();
    let layout = get_layout_by_name(pres.package(), "two_content", true)
        .unwrap()
        .unwrap();
    assert_eq!(layout.name, "Two Content");

    let exact = get_layout_by_name(pres.package(), "title slide", true)
        .unwrap()
        .unwrap();
    assert_eq!(exact.name, "Title Slide");
    let only = get_layout_by_name(pres.package(), "TITLE ONLY", false)
        .unwrap()
        .unwrap();
    assert_eq!(only.index, 5);
}

#[test]
fn invalid_permutation_leaves_order_unchanged() {
    let mut pres = deck(3);
    let err = pres.reorder_slides(&[1, 1, 2]).unwrap_err();
    assert!(matches!(err, OoxmlError::InvalidPermutation(_)));
    assert_eq!(titles(&pres), ["Slide 1", "Slide 2", "Slide 3"]);
}

#[test]
fn save_and_reopen_from_disk() {
    let mut pres = deck(2);
    pres.add_slide("Two Content", Some(1)).unwrap();
    pres.with_slide_mut(1, |slide| {
        slide.set_placeholder_text("title", "Agenda")?;
        slide.set_placeholder_text("body_2", "Risks")?;
        slide.add_table(
            &[
                vec!["Owner".to_string(), "Due".to_string()],
                vec!["Ops".to_string(), "May".to_string()],
            ],
            Position::new(457_200, 5_000_000, 4_000_000, 600_000),
        )
    })
    .unwrap();
    pres.set_theme_color("accent1", "#1F4E79").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.pptx");
    pres.save(&path).unwrap();

    let reopened = Presentation::open_path(&path).unwrap();
    assert_eq!(reopened.slide_count().unwrap(), 3);
    assert_eq!(titles(&reopened), ["Agenda", "Slide 1", "Slide 2"]);
    assert_eq!(reopened.get_layout_names().unwrap(), pres.get_layout_names().unwrap());
    assert_eq!(reopened.get_theme_colors().unwrap(), pres.get_theme_colors().unwrap());
    assert_eq!(reopened.get_theme_fonts().unwrap(), pres.get_theme_fonts().unwrap());
    assert_eq!(reopened.get_theme_colors().unwrap()["accent1"], "#1F4E79");

    let first = reopened.get_slide(1).unwrap();
    assert_eq!(first.find_placeholder("body_2").unwrap().text().as_deref(), Some("Risks"));
    let table = first
        .tree()
        .iter()
        .find_map(ShapeKind::as_table)
        .expect("table survives the round trip");
    assert_eq!((table.row_count(), table.col_count()), (2, 2));
    assert_eq!(table.cell(1, 0).unwrap().text, "Ops");
}

#[test]
fn from_template_drops_slides_but_keeps_layouts() {
    let mut pres = deck(2);
    pres.add_image(1, b"GIF89a\x01\0\x01\0", "gif", Position::new(0, 0, 100, 100))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.pptx");
    pres.save(&path).unwrap();

    let mut fresh = Presentation::from_template(&path).unwrap();
    assert_eq!(fresh.slide_count().unwrap(), 0);
    assert_eq!(fresh.get_layout_names().unwrap().len(), 6);
    fresh.add_slide("Blank", None).unwrap();
    fresh.to_bytes().unwrap();

    let template = Template::open(&path).unwrap();
    assert_eq!(template.layout_names().len(), 6);
    assert_eq!(template.fonts().body, "Calibri");
}

#[test]
fn open_rejects_garbage() {
    assert!(Presentation::open(b"definitely not a zip").is_err());
}

fn refs_after(order: &[usize], refs: &[slidekit::ooxml::pptx::SlideRef]) -> Vec<slidekit::ooxml::pptx::SlideRef> {
    order.iter().map(|&i| refs[i - 1].clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_reorder_accepts_only_permutations(
        count in 1usize..6,
        order in prop::collection::vec(0usize..7, 0..7),
    ) {
        let mut pres = deck(count);
        let refs = pres.get_slide_refs().unwrap();

        let mut sorted = order.clone();
        sorted.sort_unstable();
        let is_permutation = sorted == (1..=count).collect::<Vec<_>>();

        match pres.reorder_slides(&order) {
            Ok(()) => {
                prop_assert!(is_permutation);
                prop_assert_eq!(pres.get_slide_refs().unwrap(), refs_after(&order, &refs));
            },
            Err(OoxmlError::InvalidPermutation(_)) => {
                prop_assert!(!is_permutation);
                prop_assert_eq!(pres.get_slide_refs().unwrap(), refs);
            },
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn prop_shuffled_permutation_is_applied(order in Just((1..=5usize).collect::<Vec<_>>()).prop_shuffle()) {
        let mut pres = deck(5);
        let refs = pres.get_slide_refs().unwrap();
        pres.reorder_slides(&order).unwrap();
        prop_assert_eq!(pres.get_slide_refs().unwrap(), refs_after(&order, &refs));
        let expected: Vec<String> = order.iter().map(|i| format!("Slide {}", i)).collect();
        prop_assert_eq!(titles(&pres), expected);
    }

    #[test]
    fn prop_add_then_delete_restores_count(initial in 0usize..4, layout in 0usize..6, position in prop::option::of(0usize..6)) {
        let mut pres = deck(initial);
        let before = pres.slide_count().unwrap();
        let at = pres.add_slide(layout, position).unwrap();
        prop_assert_eq!(pres.slide_count().unwrap(), before + 1);
        prop_assert!(pres.delete_slide(at).unwrap());
        prop_assert_eq!(pres.slide_count().unwrap(), before);
        prop_assert_eq!(titles(&pres), titles(&deck(initial)));
    }

    #[test]
    fn prop_round_trip_keeps_order(count in 0usize..5) {
        let pres = deck(count);
        let reopened = Presentation::open(&pres.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(reopened.slide_count().unwrap(), count);
        prop_assert_eq!(reopened.get_slide_refs().unwrap(), pres.get_slide_refs().unwrap());
        prop_assert_eq!(titles(&reopened), titles(&pres));
    }
}
