//! Screen saver
//!
//! Either the backend blanks the screen, or the server covers it with an
//! override-redirect window slightly larger than the root and shifts it
//! around on every cycle. While the saver is on, that window is the system
//! head of the root's children and every restack of a real child stays
//! below it.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dix::attributes::WindowAttributes;
use crate::dix::configure::ConfigureValues;
use crate::dix::screen::SERVER_CLIENT;
use crate::dix::window::{Background, Cursor};
use crate::dix::Screen;
use crate::error::{Result, WindowError};
use crate::shared::{WindowClass, WindowId};

/// Saver request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaverMode {
    /// Activate, or cycle if already active
    On,
    /// Deactivate
    Off,
    /// Shift the saver window, or re-blank
    Cycle,
    /// Activate even if already active, telling the backend first
    Force,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverSettings {
    /// How far past the screen's top-left corner the saver window reaches
    pub random_margin: u32,
    /// Try backend blanking before falling back to a window
    pub prefer_blanking: bool,
    /// Allow a saver window at all
    pub allow_exposures: bool,
    /// Seed for the cycle offsets
    pub seed: u32,
}

impl Default for SaverSettings {
    fn default() -> Self {
        Self {
            random_margin: 32,
            prefer_blanking: true,
            allow_exposures: true,
            seed: 0x2545_f491,
        }
    }
}

/// How the screen is currently saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blank {
    NotSaved,
    /// The backend blanked it
    Blanked,
    /// Black saver window
    Black,
    /// Saver window showing the root background
    Tiled,
}

/// Per-screen saver state
#[derive(Debug, Clone)]
pub struct ScreenSaver {
    pub(crate) settings: SaverSettings,
    active: bool,
    blank: Blank,
    pub(crate) window: Option<WindowId>,
    rng: u32,
}

impl ScreenSaver {
    pub fn new(settings: SaverSettings) -> Self {
        let rng = if settings.seed == 0 { 1 } else { settings.seed };
        Self {
            settings,
            active: false,
            blank: Blank::NotSaved,
            window: None,
            rng,
        }
    }

    /// The saver is active, so the saver window heads the root's children.
    pub fn is_on(&self) -> bool {
        self.active
    }

    /// xorshift32
    fn next_random(&mut self) -> u32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        x
    }

    fn random_offset(&mut self) -> i32 {
        let margin = self.settings.random_margin.max(1);
        -((self.next_random() % margin) as i32)
    }
}

impl Screen {
    pub fn saver_active(&self) -> bool {
        self.saver.is_on()
    }

    pub fn saver_window(&self) -> Option<WindowId> {
        self.saver.window
    }

    /// Change the saver state.
    pub fn save_screens(&mut self, mode: SaverMode) -> Result<()> {
        let (on, mode) = match mode {
            SaverMode::Force => {
                self.backend.save_screen(true);
                (true, SaverMode::On)
            }
            SaverMode::On if self.saver.active => (true, SaverMode::Cycle),
            SaverMode::On => (true, SaverMode::On),
            SaverMode::Off => (false, SaverMode::Off),
            SaverMode::Cycle => (self.saver.active, SaverMode::Cycle),
        };

        match mode {
            SaverMode::Off => self.saver_off()?,
            SaverMode::Cycle => self.saver_cycle()?,
            _ => self.saver_on()?,
        }
        self.saver.active = on;
        Ok(())
    }

    fn saver_on(&mut self) -> Result<()> {
        if self.saver.blank != Blank::NotSaved {
            return Ok(());
        }
        let settings = self.saver.settings.clone();
        if settings.prefer_blanking {
            if self.backend.save_screen(true) {
                info!("Screen blanked by the backend");
                self.saver.blank = Blank::Blanked;
                return Ok(());
            }
            if settings.allow_exposures && self.tile_screen_saver(Blank::Black)? {
                self.saver.blank = Blank::Black;
                return Ok(());
            }
        }
        self.saver.blank = if settings.allow_exposures && self.tile_screen_saver(Blank::Tiled)? {
            Blank::Tiled
        } else {
            Blank::NotSaved
        };
        Ok(())
    }

    fn saver_off(&mut self) -> Result<()> {
        match self.saver.blank {
            Blank::NotSaved => {}
            Blank::Blanked => {
                self.backend.save_screen(false);
            }
            Blank::Black | Blank::Tiled => {
                if let Some(wid) = self.saver.window.take() {
                    debug!("Destroying saver window 0x{:x}", wid);
                    self.destroy_window(wid)?;
                }
            }
        }
        info!("Screen saver off");
        self.saver.blank = Blank::NotSaved;
        Ok(())
    }

    fn saver_cycle(&mut self) -> Result<()> {
        match self.saver.blank {
            Blank::Tiled | Blank::Black => {
                let Some(wid) = self.saver.window else {
                    return Ok(());
                };
                let values = ConfigureValues::new()
                    .x(self.saver.random_offset())
                    .y(self.saver.random_offset());
                // With the flag off the saver window is an ordinary child
                // and may be configured like one.
                let was_active = self.saver.active;
                self.saver.active = false;
                let result = self.configure_window(wid, &values, SERVER_CLIENT);
                self.saver.active = was_active;
                result
            }
            Blank::Blanked => {
                self.backend.save_screen(true);
                Ok(())
            }
            Blank::NotSaved => Ok(()),
        }
    }

    /// Cover the root with a saver window. Returns false if the window
    /// could not be created.
    fn tile_screen_saver(&mut self, kind: Blank) -> Result<bool> {
        let root = self.root.ok_or(WindowError::AllocationFailure)?;
        let margin = self.saver.settings.random_margin;
        let background = match kind {
            Blank::Black => Some(Background::Pixel(self.info.black_pixel)),
            _ => match &self.get(root)?.background {
                Background::Pixel(pixel) => Some(Background::Pixel(*pixel)),
                Background::Pixmap(_) => Some(Background::None),
                _ => None,
            },
        };

        let mut attrs = WindowAttributes::new()
            .override_redirect(true)
            .cursor(Some(Rc::new(Cursor { id: 0 })));
        attrs.background = background;

        let wid = self.alloc_server_id();
        let created = self.create_window(
            SERVER_CLIENT,
            0,
            wid,
            root,
            -(margin as i32),
            -(margin as i32),
            self.info.width + margin,
            self.info.height + margin,
            0,
            WindowClass::InputOutput,
            0,
            &attrs,
        );
        if let Err(err) = created {
            debug!("Saver window creation failed: {}", err);
            return Ok(false);
        }
        self.saver.window = Some(wid);
        self.map_window(wid, SERVER_CLIENT)?;
        info!("Screen saver window 0x{:x} up", wid);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dix::backend::Backend;
    use crate::dix::events::EventLog;
    use crate::dix::test_support::{mapped_window, screen, CLIENT};
    use crate::dix::ScreenInfo;
    use crate::shared::StackMode;
    use std::cell::Cell;

    #[test]
    fn test_saver_window_covers_root() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x200, 10, 10, 100, 100);

        scr.save_screens(SaverMode::On).unwrap();

        let saver = scr.saver_window().unwrap();
        assert!(scr.saver_active());
        assert!(saver >= 0xf000_0000);
        assert_eq!(scr.children(root), vec![saver, a]);
        let sw = scr.get(saver).unwrap();
        assert!(sw.viewable && sw.override_redirect);
        assert!(scr.get(root).unwrap().clip_list.is_empty());
        assert!(scr.get(a).unwrap().clip_list.is_empty());
    }

    #[test]
    fn test_real_children_stay_below_saver() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x200, 10, 10, 100, 100);
        scr.save_screens(SaverMode::On).unwrap();
        let saver = scr.saver_window().unwrap();

        let b = mapped_window(&mut scr, root, 0x201, 0, 0, 10, 10);
        assert_eq!(scr.children(root), vec![saver, b, a]);

        let raise = ConfigureValues::new().stack_mode(StackMode::Above);
        scr.configure_window(a, &raise, CLIENT).unwrap();
        assert_eq!(scr.children(root), vec![saver, a, b]);
    }

    #[test]
    fn test_cycle_moves_within_margin_and_off_restores() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        scr.save_screens(SaverMode::On).unwrap();
        let saver = scr.saver_window().unwrap();

        for _ in 0..8 {
            scr.save_screens(SaverMode::Cycle).unwrap();
            let (x, y) = scr.get(saver).unwrap().position();
            assert!((-31..=0).contains(&x) && (-31..=0).contains(&y));
            assert!(scr.saver_active());
            assert_eq!(scr.children(root)[0], saver);
        }

        scr.save_screens(SaverMode::Off).unwrap();
        assert!(!scr.saver_active());
        assert!(!scr.contains(saver));
        assert_eq!(scr.get(root).unwrap().clip_list.area(), 1024 * 768);
    }

    struct Blanker(Rc<Cell<Option<bool>>>);

    impl Backend for Blanker {
        fn save_screen(&mut self, on: bool) -> bool {
            self.0.set(Some(on));
            true
        }
    }

    #[test]
    fn test_backend_blanking_preferred() {
        let state = Rc::new(Cell::new(None));
        let mut scr = Screen::new(
            ScreenInfo::default(),
            SaverSettings::default(),
            Box::new(Blanker(state.clone())),
            Box::new(EventLog::new()),
        )
        .unwrap();

        scr.save_screens(SaverMode::On).unwrap();
        assert_eq!(state.get(), Some(true));
        assert!(scr.saver_window().is_none());

        scr.save_screens(SaverMode::Off).unwrap();
        assert_eq!(state.get(), Some(false));
        assert!(!scr.saver_active());
    }
}
