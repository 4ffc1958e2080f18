//! Screen Module
//!
//! Per-screen state: the window arena, the root window, the screen's
//! depths and visuals, saver state, and the backend and event sink the core
//! talks to.

use std::collections::HashMap;
use std::rc::Rc;

use area_region::Region;
use serde::Serialize;
use tracing::{debug, info};

use crate::dix::backend::Backend;
use crate::dix::events::EventSink;
use crate::dix::optional::OptionalAttrs;
use crate::dix::saver::{SaverSettings, ScreenSaver};
use crate::dix::window::{Background, Border, Cursor, Window};
use crate::error::{Result, WindowError};
use crate::shared::{ClientId, ColormapId, Geometry, MapState, Visibility, VisualId, WindowClass, WindowId};

/// Visuals available at one depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depth {
    pub depth: u8,
    pub visuals: Vec<VisualId>,
}

/// Static description of a screen
#[derive(Debug, Clone)]
pub struct ScreenInfo {
    pub root: WindowId,
    pub width: u32,
    pub height: u32,
    pub root_depth: u8,
    pub root_visual: VisualId,
    pub default_colormap: ColormapId,
    pub black_pixel: u32,
    pub white_pixel: u32,
    pub root_cursor: u32,
    pub depths: Vec<Depth>,
}

impl ScreenInfo {
    /// True if `visual` may be used at `depth` on this screen.
    pub fn allows(&self, depth: u8, visual: VisualId) -> bool {
        self.depths
            .iter()
            .any(|d| d.depth == depth && d.visuals.contains(&visual))
    }
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            root: 0x0000_01d6,
            width: 1024,
            height: 768,
            root_depth: 24,
            root_visual: 0x21,
            default_colormap: 0x20,
            black_pixel: 0x000000,
            white_pixel: 0xffffff,
            root_cursor: 0x0000_0101,
            depths: vec![
                Depth { depth: 1, visuals: Vec::new() },
                Depth { depth: 24, visuals: vec![0x21, 0x22] },
                Depth { depth: 32, visuals: vec![0x23] },
            ],
        }
    }
}

/// Snapshot of one window, as printed by the replay tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    pub id: WindowId,
    pub parent: Option<WindowId>,
    pub geometry: Geometry,
    pub border_width: u32,
    pub map_state: MapState,
    pub visibility: Visibility,
    pub clip: Vec<(i32, i32, i32, i32)>,
    pub children: Vec<WindowSummary>,
}

/// Per-screen window core
pub struct Screen {
    pub(crate) info: ScreenInfo,
    pub(crate) windows: HashMap<WindowId, Window>,
    pub(crate) root: Option<WindowId>,
    pub(crate) saver: ScreenSaver,
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) sink: Box<dyn EventSink>,
    next_server_id: WindowId,
}

/// Ids the server allocates for its own windows
const SERVER_ID_BASE: WindowId = 0xf000_0000;

/// Owner of the root and of windows the server creates itself
pub const SERVER_CLIENT: ClientId = 0;

impl Screen {
    /// Create the screen and its root window, and map the root.
    pub fn new(
        info: ScreenInfo,
        saver: SaverSettings,
        backend: Box<dyn Backend>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self> {
        if !info.allows(info.root_depth, info.root_visual) {
            return Err(WindowError::InvalidMatch("root visual not available at root depth"));
        }

        let mut screen = Self {
            info,
            windows: HashMap::new(),
            root: None,
            saver: ScreenSaver::new(saver),
            backend,
            sink,
            next_server_id: SERVER_ID_BASE,
        };
        screen.create_root_window()?;
        Ok(screen)
    }

    fn create_root_window(&mut self) -> Result<()> {
        let info = &self.info;
        let id = info.root;
        let mut root = Window::new(id, SERVER_CLIENT, WindowClass::InputOutput, info.root_depth);
        root.drawable = Geometry::new(0, 0, info.width, info.height);
        root.background = Background::Pixel(info.white_pixel);
        root.border = Border::Pixel(info.black_pixel);
        root.optional = Some(Box::new(OptionalAttrs::inheriting(
            info.root_visual,
            info.default_colormap,
            Some(Rc::new(Cursor { id: info.root_cursor })),
        )));

        let full = Region::from_rect(root.drawable.to_rect());
        root.win_size = full.clone();
        root.border_size = full;

        if !self.backend.create_window(&root) {
            return Err(WindowError::AllocationFailure);
        }
        self.backend.position_window(&root);

        info!(
            "Created root window 0x{:x} ({}x{}, depth {})",
            id, self.info.width, self.info.height, self.info.root_depth
        );
        self.windows.insert(id, root);
        self.root = Some(id);

        self.map_root()
    }

    /// Root is mapped and realized at init without going through the map
    /// state machine; it has no parent to notify or redirect through.
    fn map_root(&mut self) -> Result<()> {
        let id = self.root.ok_or(WindowError::AllocationFailure)?;
        let win = self.windows.get_mut(&id).ok_or(WindowError::InvalidReference(id))?;
        win.mapped = true;
        win.realized = true;
        win.viewable = true;
        win.visibility = Visibility::Unobscured;
        win.clip_list = win.win_size.clone();
        win.border_clip = win.border_size.clone();
        if !self.backend.realize_window(win) {
            return Err(WindowError::AllocationFailure);
        }
        if let Some(win) = self.windows.get(&id) {
            self.backend.clip_notify(win, 0, 0);
        }
        debug!("Mapped root window 0x{:x}", id);
        Ok(())
    }

    pub fn info(&self) -> &ScreenInfo {
        &self.info
    }

    pub fn root(&self) -> Option<WindowId> {
        self.root
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// Look up a window, failing with InvalidReference.
    pub fn get(&self, id: WindowId) -> Result<&Window> {
        self.windows.get(&id).ok_or(WindowError::InvalidReference(id))
    }

    pub(crate) fn get_mut(&mut self, id: WindowId) -> Result<&mut Window> {
        self.windows.get_mut(&id).ok_or(WindowError::InvalidReference(id))
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Children of `id` from the top of the stack to the bottom.
    pub fn children(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut cur = self.windows.get(&id).and_then(|w| w.first_child);
        while let Some(child) = cur {
            out.push(child);
            cur = self.windows.get(&child).and_then(|w| w.next_sib);
        }
        out
    }

    /// Next unused id in the server's own range.
    pub(crate) fn alloc_server_id(&mut self) -> WindowId {
        while self.windows.contains_key(&self.next_server_id) {
            self.next_server_id = self.next_server_id.wrapping_add(1).max(SERVER_ID_BASE);
        }
        let id = self.next_server_id;
        self.next_server_id = self.next_server_id.wrapping_add(1).max(SERVER_ID_BASE);
        id
    }

    /// Tree below `id` with geometry, map state and clip extents.
    pub fn summary(&self, id: WindowId) -> Result<WindowSummary> {
        let win = self.get(id)?;
        let children = self
            .children(id)
            .into_iter()
            .rev()
            .map(|child| self.summary(child))
            .collect::<Result<Vec<_>>>()?;
        Ok(WindowSummary {
            id,
            parent: win.parent,
            geometry: Geometry::new(
                win.position().0,
                win.position().1,
                win.drawable.width,
                win.drawable.height,
            ),
            border_width: win.border_width,
            map_state: win.map_state(),
            visibility: win.visibility,
            clip: win
                .clip_list
                .rects()
                .iter()
                .map(|r| (r.x1, r.y1, r.x2, r.y2))
                .collect(),
            children,
        })
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("info", &self.info)
            .field("root", &self.root)
            .field("windows", &self.windows.len())
            .finish()
    }
}
