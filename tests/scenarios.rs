//! End-to-end window tree scenarios through the public API

use area_dix::dix::{
    ConfigureValues, Event, EventLog, EventMask, NullBackend, SaverMode, SaverSettings, Screen,
    ScreenInfo, WindowAttributes,
};
use area_dix::shared::{Circulate, ShapeKind, StackMode, WindowClass, WindowId};
use area_dix::WindowError;
use area_region::{Rect, Region};

const CLIENT: u32 = 1;
const WM: u32 = 2;

fn screen() -> (Screen, EventLog) {
    let log = EventLog::new();
    let scr = Screen::new(
        ScreenInfo::default(),
        SaverSettings::default(),
        Box::new(NullBackend),
        Box::new(log.clone()),
    )
    .unwrap();
    (scr, log)
}

fn create(scr: &mut Screen, parent: WindowId, id: WindowId, x: i32, y: i32, w: u32, h: u32) -> WindowId {
    scr.create_window(CLIENT, 0, id, parent, x, y, w, h, 0, WindowClass::InputOutput, 0, &WindowAttributes::new())
        .unwrap()
}

fn all_windows(scr: &Screen) -> Vec<WindowId> {
    let mut out = Vec::new();
    let mut stack: Vec<WindowId> = scr.root().into_iter().collect();
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(scr.children(id));
    }
    out
}

/// Lifecycle and clip invariants over the whole tree.
fn check_invariants(scr: &Screen) {
    for id in all_windows(scr) {
        let win = scr.get(id).unwrap();
        let parent = win.parent.map(|p| scr.get(p).unwrap());
        if win.viewable {
            assert!(win.realized, "0x{:x} viewable but not realized", id);
        }
        if win.realized {
            assert!(parent.is_none_or(|p| p.realized), "0x{:x} realized under unrealized parent", id);
        }
        assert!(win.clip_list.is_subset_of(&win.border_size), "0x{:x} clip escapes border size", id);
        if let Some(p) = parent {
            assert!(win.clip_list.is_subset_of(&p.clip_list.union(&p.win_size)));
        }
    }
}

/// Scenario A: two overlapping children of the root.
fn scenario_a(scr: &mut Screen) -> (WindowId, WindowId) {
    let root = scr.root().unwrap();
    let a = create(scr, root, 0x200, 10, 10, 100, 100);
    let b = create(scr, root, 0x201, 50, 50, 100, 100);
    scr.map_window(a, CLIENT).unwrap();
    scr.map_window(b, CLIENT).unwrap();
    (a, b)
}

#[test]
fn test_overlapping_children_clip() {
    let (mut scr, _log) = screen();
    let root = scr.root().unwrap();
    let (a, b) = scenario_a(&mut scr);

    assert_eq!(scr.children(root), vec![b, a]);
    let aw = scr.get(a).unwrap();
    assert_eq!(
        aw.clip_list,
        Region::from_rect(Rect::new(10, 10, 110, 110)).subtract_rect(&Rect::new(50, 50, 110, 110))
    );
    assert!(!aw.clip_list.contains_point(60, 60));
    check_invariants(&scr);
}

#[test]
fn test_top_if_promotes_obscured_window() {
    let (mut scr, _log) = screen();
    let root = scr.root().unwrap();
    let (a, b) = scenario_a(&mut scr);

    let values = ConfigureValues::new().sibling(b).stack_mode(StackMode::TopIf);
    scr.configure_window(a, &values, CLIENT).unwrap();

    assert_eq!(scr.children(root), vec![a, b]);
    assert_eq!(scr.get(a).unwrap().clip_list, Region::from_rect(Rect::new(10, 10, 110, 110)));
    assert_eq!(
        scr.get(b).unwrap().clip_list,
        Region::from_rect(Rect::new(50, 50, 150, 150)).subtract_rect(&Rect::new(10, 10, 110, 110))
    );
    check_invariants(&scr);
}

#[test]
fn test_unmap_parent_unrealizes_mapped_child() {
    let (mut scr, log) = screen();
    let root = scr.root().unwrap();
    let a = create(&mut scr, root, 0x200, 10, 10, 100, 100);
    let c = create(&mut scr, a, 0x202, 5, 5, 20, 20);
    scr.map_window(c, CLIENT).unwrap();
    scr.map_window(a, CLIENT).unwrap();
    assert!(scr.get(c).unwrap().viewable);
    scr.select_input(a, CLIENT, EventMask::STRUCTURE_NOTIFY).unwrap();
    scr.select_input(c, CLIENT, EventMask::STRUCTURE_NOTIFY).unwrap();
    log.clear();

    scr.unmap_window(a).unwrap();

    let events = log.events();
    assert_eq!(events, vec![Event::UnmapNotify { window: a, from_configure: false }]);
    let cw = scr.get(c).unwrap();
    assert!(!cw.realized && !cw.viewable);
    assert!(cw.mapped);
    assert!(cw.clip_list.is_empty());
    check_invariants(&scr);
}

#[test]
fn test_reparent_into_descendant_leaves_tree_alone() {
    let (mut scr, log) = screen();
    let root = scr.root().unwrap();
    let a = create(&mut scr, root, 0x200, 10, 10, 100, 100);
    let c = create(&mut scr, a, 0x202, 5, 5, 20, 20);
    let g = create(&mut scr, c, 0x203, 1, 1, 5, 5);
    let before = scr.summary(root).unwrap();
    log.clear();

    assert!(matches!(scr.reparent_window(a, g, 0, 0, CLIENT), Err(WindowError::InvalidMatch(_))));
    assert!(matches!(scr.reparent_window(a, a, 0, 0, CLIENT), Err(WindowError::InvalidMatch(_))));
    assert_eq!(scr.summary(root).unwrap(), before);
    assert!(log.is_empty());
}

#[test]
fn test_bordered_input_only_is_rejected() {
    let (mut scr, _log) = screen();
    let root = scr.root().unwrap();

    let result = scr.create_window(
        CLIENT,
        0,
        0x200,
        root,
        0,
        0,
        10,
        10,
        1,
        WindowClass::InputOnly,
        0,
        &WindowAttributes::new(),
    );
    assert!(matches!(result, Err(WindowError::InvalidMatch(_))));
    assert!(!scr.contains(0x200));
    assert!(scr.children(root).is_empty());
}

#[test]
fn test_window_manager_flow() {
    let (mut scr, log) = screen();
    let root = scr.root().unwrap();
    scr.select_input(root, WM, EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY)
        .unwrap();
    let app = create(&mut scr, root, 0x200, 0, 0, 200, 100);
    log.clear();

    // The application's requests turn into requests to the manager.
    scr.map_window(app, CLIENT).unwrap();
    scr.configure_window(app, &ConfigureValues::new().x(30).y(40), CLIENT).unwrap();
    assert_eq!(
        log.events(),
        vec![
            Event::MapRequest { parent: root, window: app },
            Event::ConfigureRequest {
                parent: root,
                window: app,
                sibling: None,
                x: 30,
                y: 40,
                width: 200,
                height: 100,
                border_width: 0,
                stack_mode: StackMode::Above,
                value_mask: 0b11,
            },
        ]
    );
    assert!(!scr.get(app).unwrap().mapped);

    // The manager grants them.
    log.clear();
    scr.configure_window(app, &ConfigureValues::new().x(30).y(40), WM).unwrap();
    scr.map_window(app, WM).unwrap();
    assert!(scr.get(app).unwrap().viewable);
    assert_eq!(scr.get(app).unwrap().clip_list, Region::from_rect(Rect::new(30, 40, 230, 140)));
    assert!(matches!(log.events()[0], Event::ConfigureNotify { x: 30, y: 40, .. }));
    assert!(matches!(log.events()[1], Event::MapNotify { .. }));
    check_invariants(&scr);
}

#[test]
fn test_stacking_churn_keeps_invariants() {
    let (mut scr, _log) = screen();
    let root = scr.root().unwrap();
    let mut ids = Vec::new();
    for i in 0..6u32 {
        let id = create(&mut scr, root, 0x300 + i, (i * 40) as i32, (i * 30) as i32, 200, 150);
        let child = create(&mut scr, id, 0x400 + i, 20, 20, 50, 50);
        scr.map_window(child, CLIENT).unwrap();
        scr.map_window(id, CLIENT).unwrap();
        ids.push(id);
    }
    check_invariants(&scr);

    let modes = [StackMode::Above, StackMode::Below, StackMode::TopIf, StackMode::BottomIf, StackMode::Opposite];
    for (step, &id) in ids.iter().cycle().take(20).enumerate() {
        let values = ConfigureValues::new()
            .x((step * 13 % 300) as i32)
            .width(100 + (step as u32 * 7) % 80)
            .stack_mode(modes[step % modes.len()]);
        scr.configure_window(id, &values, CLIENT).unwrap();
        check_invariants(&scr);
    }

    scr.circulate_window(root, Circulate::RaiseLowest, CLIENT).unwrap();
    scr.circulate_window(root, Circulate::LowerHighest, CLIENT).unwrap();
    check_invariants(&scr);

    // Root area not covered by any child is exactly the root's clip.
    let covered = ids
        .iter()
        .fold(Region::new(), |acc, &id| acc.union(&scr.get(id).unwrap().border_size));
    let expected = Region::from_rect(Rect::new(0, 0, 1024, 768)).subtract(&covered);
    assert_eq!(scr.get(root).unwrap().clip_list, expected);

    // Sibling clips never overlap.
    for (i, &x) in ids.iter().enumerate() {
        for &y in &ids[i + 1..] {
            assert!(!scr.get(x).unwrap().border_clip.intersects(&scr.get(y).unwrap().border_clip));
        }
    }
}

#[test]
fn test_destroy_and_saver_round_trip() {
    let (mut scr, log) = screen();
    let root = scr.root().unwrap();
    let (a, b) = scenario_a(&mut scr);
    scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();

    scr.save_screens(SaverMode::On).unwrap();
    let saver = scr.saver_window().unwrap();
    assert_eq!(scr.children(root), vec![saver, b, a]);
    scr.save_screens(SaverMode::Off).unwrap();
    assert!(!scr.contains(saver));
    log.clear();

    scr.destroy_window(b).unwrap();
    assert_eq!(
        log.events(),
        vec![
            Event::UnmapNotify { window: b, from_configure: false },
            Event::DestroyNotify { window: b },
        ]
    );
    assert_eq!(scr.get(a).unwrap().clip_list, Region::from_rect(Rect::new(10, 10, 110, 110)));
    assert_eq!(scr.query_tree(root).unwrap().children, vec![a]);
    check_invariants(&scr);
}

/// A parent with a shaped child at `child_at`, a clip-shaped grandchild,
/// and an unshaped sibling stacked above the shaped child.
fn shaped_scene(scr: &mut Screen, parent_at: (i32, i32), child_at: (i32, i32)) -> [WindowId; 4] {
    let root = scr.root().unwrap();
    let p = create(scr, root, 0x500, parent_at.0, parent_at.1, 300, 200);
    let s = create(scr, p, 0x501, child_at.0, child_at.1, 120, 120);
    let bounding = Region::from_rects([Rect::new(0, 0, 120, 40), Rect::new(0, 40, 50, 120)]);
    scr.set_shape(s, ShapeKind::Bounding, Some(bounding)).unwrap();
    let g = create(scr, s, 0x502, 5, 5, 40, 40);
    scr.set_shape(g, ShapeKind::Clip, Some(Region::from_rect(Rect::new(0, 0, 20, 40))))
        .unwrap();
    let t = create(scr, p, 0x503, 60, 10, 80, 80);
    for id in [g, s, t, p] {
        scr.map_window(id, CLIENT).unwrap();
    }
    [p, s, g, t]
}

/// Clips after incremental changes match a tree built directly in the
/// final layout.
fn assert_same_clips(changed: &Screen, built: &Screen) {
    for id in all_windows(built) {
        let (a, b) = (changed.get(id).unwrap(), built.get(id).unwrap());
        assert_eq!(a.border_clip, b.border_clip, "border clip of 0x{:x}", id);
        assert_eq!(a.clip_list, b.clip_list, "clip list of 0x{:x}", id);
    }
}

#[test]
fn test_shaped_windows_clipped_by_edges_follow_moves() {
    let (mut scr, _log) = screen();
    let [p, s, _, _] = shaped_scene(&mut scr, (100, 100), (-30, 20));
    check_invariants(&scr);

    // Shaped child over its parent's top-left corner.
    scr.configure_window(s, &ConfigureValues::new().x(-20).y(-15), CLIENT).unwrap();
    let (mut built, _log) = screen();
    shaped_scene(&mut built, (100, 100), (-20, -15));
    assert_same_clips(&scr, &built);
    check_invariants(&scr);

    // The parent itself hangs off the top of the screen.
    scr.configure_window(p, &ConfigureValues::new().x(60).y(-40), CLIENT).unwrap();
    let (mut built, _log) = screen();
    shaped_scene(&mut built, (60, -40), (-20, -15));
    assert_same_clips(&scr, &built);
    check_invariants(&scr);

    // Everything back inside.
    scr.configure_window(p, &ConfigureValues::new().x(200).y(150), CLIENT).unwrap();
    scr.configure_window(s, &ConfigureValues::new().x(10).y(10), CLIENT).unwrap();
    let (mut built, _log) = screen();
    shaped_scene(&mut built, (200, 150), (10, 10));
    assert_same_clips(&scr, &built);
    check_invariants(&scr);
}
