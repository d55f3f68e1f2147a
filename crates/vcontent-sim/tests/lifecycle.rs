//! Content assignment, attachment, and teardown against the simulated host.

mod common;

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use tracing_test::traced_test;
use vcontent_core::{
    ContentValue, HostRef, InstanceRegistry, RenderHost, VirtualContent, VirtualContentConfig,
    VirtualContentError, WindowMode,
};
use vcontent_sim::{NodeId, SimNodeKind};

use common::{CHUNK, compact_host, config, document, mounted};

fn joined(view: &VirtualContent<vcontent_sim::SimHost>) -> String {
    view.chunks().concat()
}

// ── Coercion ────────────────────────────────────────────────────────────

#[test]
fn numbers_become_their_decimal_form() {
    let mut view = VirtualContent::create(compact_host(), VirtualContentConfig::default());
    view.set_text(9999).unwrap();
    assert_eq!(joined(&view), "9999");
    view.set_text(2.5).unwrap();
    assert_eq!(joined(&view), "2.5");
}

#[test]
fn empty_values_become_empty_content() {
    let mut view = VirtualContent::create(compact_host(), VirtualContentConfig::default());
    view.set_text(()).unwrap();
    assert_eq!(joined(&view), "");
    view.set_text(None::<&str>).unwrap();
    assert_eq!(joined(&view), "");
    view.set_text(f64::NAN).unwrap();
    assert_eq!(joined(&view), "");
    assert_eq!(view.chunk_count(), 0);
}

#[test]
fn strings_pass_through_unchanged() {
    let mut view = VirtualContent::create(compact_host(), config(WindowMode::Replace, 2));
    let source = document(3);
    view.set_text(source.as_str()).unwrap();
    assert_eq!(view.chunk_count(), 3);
    assert_eq!(joined(&view), source);
}

#[test]
fn invalid_values_are_rejected_without_touching_state() {
    let mut view = VirtualContent::create(compact_host(), VirtualContentConfig::default());
    view.set_text("kept").unwrap();

    assert_eq!(
        view.set_text(vec![1, 2]).err(),
        Some(VirtualContentError::InvalidContentType { found: "array" })
    );
    assert_eq!(
        view.set_html(ContentValue::Object(BTreeMap::new())).err(),
        Some(VirtualContentError::InvalidContentType { found: "object" })
    );
    assert_eq!(
        view.set_text(true).err(),
        Some(VirtualContentError::InvalidContentType { found: "boolean" })
    );

    assert_eq!(joined(&view), "kept");
    assert!(!view.is_html_content());
}

#[test]
fn content_type_follows_last_setter() {
    let mut view = VirtualContent::create(compact_host(), VirtualContentConfig::default());
    assert!(view.is_html_content());
    view.set_text("plain")
        .unwrap()
        .set_html("<b>bold</b>")
        .unwrap();
    assert!(view.is_html_content());
    view.set_text("plain again").unwrap();
    assert!(!view.is_html_content());
}

#[test]
fn markup_straddling_a_boundary_stays_whole() {
    let tag = r#"<a href="/u" class="c"></a>"#;
    let mut view = VirtualContent::create(
        compact_host(),
        VirtualContentConfig::default().with_chunk_size(50),
    );
    // Padding 27 puts the naive boundary right after `<a ...>`.
    for width in 20..=40 {
        let padding = "x".repeat(width);
        let source = format!("{padding}{tag}{padding}");
        view.set_html(source.as_str()).unwrap();

        let chunks = view.chunks();
        assert_eq!(chunks.len(), 2, "padding {width}");
        assert!(
            chunks.iter().any(|chunk| chunk.contains(tag)),
            "padding {width}: {chunks:?}"
        );
        assert_eq!(chunks.concat(), source);
    }
}

// ── Attachment ──────────────────────────────────────────────────────────

#[test]
fn render_to_mounts_the_initial_window() {
    let (host, root, view) = mounted(WindowMode::Replace, 2, 10);
    let container = view.container();

    assert_eq!(host.parent(container), Some(root));
    assert!(view.is_attached());
    assert_eq!(view.visible(), vec![0, 1, 2, 3]);
    assert_eq!(host.mounted_chunks(container), vec![0, 1, 2, 3]);
    assert_eq!(host.filler_heights(container), vec![0.0, 0.0]);
    assert_eq!(host.text_content(container), document(4));
    assert_eq!(view.cached_geometry(3).offset_top, Some(300.0));
}

#[test]
fn render_to_accepts_every_reference_shape() {
    let host = compact_host();
    let panel = host.create_element();
    host.set_selector(panel, "#panel");
    let other = host.create_root();

    let mut view = VirtualContent::create(host.clone(), VirtualContentConfig::default());
    view.set_text("abc").unwrap();

    view.render_to(HostRef::Selector("#panel".to_string())).unwrap();
    assert_eq!(host.parent(view.container()), Some(panel));

    view.render_to(HostRef::Collection(vec![other, panel])).unwrap();
    assert_eq!(host.parent(view.container()), Some(other));
    assert_eq!(host.children_count(panel), 0);

    view.render_to(panel).unwrap();
    assert_eq!(host.parent(view.container()), Some(panel));
    assert_eq!(host.text_content(panel), "abc");
}

#[test]
fn unresolvable_references_fail() {
    let host = compact_host();
    let mut view = VirtualContent::create(host.clone(), VirtualContentConfig::default());

    for reference in [
        HostRef::<NodeId>::Missing,
        HostRef::Collection(Vec::new()),
        HostRef::Selector("#nowhere".to_string()),
    ] {
        let err = view.render_to(reference).err();
        assert!(
            matches!(err, Some(VirtualContentError::InvalidHostReference { .. })),
            "{err:?}"
        );
    }
    assert_eq!(
        view.render_to(None::<NodeId>).err().map(|e| e.is_programming_error()),
        Some(false)
    );
    assert!(!view.is_attached());
}

#[test]
fn set_text_while_attached_remounts_from_the_top() {
    let (host, _root, mut view) = mounted(WindowMode::Replace, 1, 6);
    let container = view.container();
    host.scroll_to(container, 50.0);

    view.set_text(document(3)).unwrap();
    assert_eq!(view.pointer(), 0);
    assert_eq!(view.visible(), vec![0, 1]);
    assert_eq!(host.scroll_top(container), 0.0);
    assert_eq!(view.chunk_count(), 3);
}

#[test]
fn pre_processor_transforms_injected_text_only() {
    let config = config(WindowMode::Replace, 2).with_chunk_pre_processor(|chunk: &str| {
        format!("[{}]", &chunk[..3])
    });
    let host = compact_host();
    let root = host.create_root();
    let mut view = VirtualContent::create(host.clone(), config);
    view.set_text(document(2)).unwrap().render_to(root).unwrap();

    let container = view.container();
    let contents: Vec<String> = host
        .children(container)
        .into_iter()
        .filter(|&node| matches!(host.kind(node), SimNodeKind::Chunk { .. }))
        .map(|node| host.content(node))
        .collect();
    assert_eq!(contents, vec!["[aaa]", "[bbb]"]);
    assert_eq!(view.chunks()[0].len(), CHUNK);
}

#[test]
fn injection_mode_follows_content_type() {
    let host = compact_host();
    let root = host.create_root();
    let mut view = VirtualContent::create(host.clone(), VirtualContentConfig::default());
    view.set_html("<i>x</i>").unwrap().render_to(root).unwrap();
    let chunk = host.children(view.container())[1];
    assert!(host.is_html(chunk));

    view.set_text("<i>x</i>").unwrap();
    let chunk = host.children(view.container())[1];
    assert!(!host.is_html(chunk));
}

#[test]
fn scrollable_parent_is_resolved_or_falls_back() {
    let host = compact_host();
    let panel = host.create_element();
    host.set_selector(panel, "#scroller");

    let view = VirtualContent::create_with_scrollable(
        host.clone(),
        VirtualContentConfig::default(),
        HostRef::Selector("#scroller".to_string()),
    );
    assert_eq!(view.scrollable(), Some(panel));
    assert!(host.is_subscribed(panel));

    let fallback = VirtualContent::create_with_scrollable(
        host.clone(),
        VirtualContentConfig::default(),
        HostRef::Selector("#missing".to_string()),
    );
    assert_eq!(fallback.scrollable(), Some(fallback.container()));
}

// ── Teardown ────────────────────────────────────────────────────────────

#[test]
fn destroy_releases_everything() {
    InstanceRegistry::stop_tracking();
    InstanceRegistry::start_tracking();
    let host = compact_host();
    let root = host.create_root();
    let mut view = VirtualContent::create(host.clone(), VirtualContentConfig::default());
    view.set_text("random").unwrap().render_to(root).unwrap();
    let id = view.id();
    let container = view.container();
    assert!(InstanceRegistry::contains(id));

    view.destroy().unwrap();

    assert_eq!(view.scrollable(), None);
    assert_eq!(host.parent(container), None);
    assert!(!InstanceRegistry::contains(id));
    assert_eq!(host.children_count(root), 0);
    assert_eq!(host.children_count(container), 0);
    assert!(!host.is_subscribed(container));
    assert!(view.is_destroyed());
    assert_eq!(view.chunk_count(), 0);
}

#[test]
fn calls_after_destroy_fail_fast() {
    let mut view = VirtualContent::create(compact_host(), VirtualContentConfig::default());
    view.destroy().unwrap();

    assert_eq!(view.destroy().err(), Some(VirtualContentError::Destroyed));
    assert_eq!(view.set_text("x").err(), Some(VirtualContentError::Destroyed));
    assert_eq!(view.handle_scroll().err(), Some(VirtualContentError::Destroyed));
    assert_eq!(view.track().err(), Some(VirtualContentError::Destroyed));
    let err = view.recalculate().err();
    assert!(err.is_some_and(|e| e.is_programming_error()));
}

#[test]
fn dropping_an_instance_tears_it_down() {
    InstanceRegistry::stop_tracking();
    InstanceRegistry::start_tracking();
    let host = compact_host();
    let root = host.create_root();
    {
        let mut view = VirtualContent::create(host.clone(), VirtualContentConfig::default());
        view.set_text("short-lived").unwrap().render_to(root).unwrap();
        assert_eq!(InstanceRegistry::len(), 1);
    }
    assert_eq!(host.children_count(root), 0);
    assert_eq!(InstanceRegistry::len(), 0);
}

#[test]
#[traced_test]
fn lifecycle_is_logged() {
    let host = compact_host();
    let root = host.create_root();
    let mut view = VirtualContent::create(host.clone(), VirtualContentConfig::default());
    view.set_text("logged").unwrap().render_to(root).unwrap();
    view.destroy().unwrap();

    assert!(logs_contain("vcontent.set_content"));
    assert!(logs_contain("vcontent.render_to"));
    assert!(logs_contain("vcontent.destroy"));
}

#[test]
fn container_width_is_inherited_from_target() {
    let (host, root, view) = mounted(WindowMode::Append, 2, 2);
    assert_eq!(host.container_width(&view.container()), 100.0);
    host.set_width(root, Some(60.0));
    assert_eq!(host.container_width(&view.container()), 60.0);
}
