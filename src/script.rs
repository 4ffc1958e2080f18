//! Replay scripts
//!
//! A script is a JSON array of requests, each tagged with `op`. Replaying
//! runs them in order against a screen; a failing request is reported and
//! the rest still run.

use area_region::{Rect, Region};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dix::{
    Background, ConfigureValues, EventMask, SaverMode, Screen, WindowAttributes,
};
use crate::error::Result;
use crate::shared::{
    Atom, BackingStore, Circulate, ClientId, ColormapId, Gravity, PropMode, ShapeKind, VisualId,
    WindowClass, WindowId,
};

fn default_client() -> ClientId {
    1
}

fn default_class() -> WindowClass {
    WindowClass::InputOutput
}

/// Background as written in a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundSpec {
    None,
    ParentRelative,
    Pixel(u32),
}

/// Attribute set as written in a script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesSpec {
    pub background: Option<BackgroundSpec>,
    pub border_pixel: Option<u32>,
    pub bit_gravity: Option<Gravity>,
    pub win_gravity: Option<Gravity>,
    pub backing_store: Option<BackingStore>,
    pub override_redirect: Option<bool>,
    pub save_under: Option<bool>,
    pub event_mask: Option<u32>,
    pub do_not_propagate_mask: Option<u32>,
    pub colormap: Option<ColormapId>,
}

impl AttributesSpec {
    pub fn to_attributes(&self) -> WindowAttributes {
        WindowAttributes {
            background: self.background.map(|bg| match bg {
                BackgroundSpec::None => Background::None,
                BackgroundSpec::ParentRelative => Background::ParentRelative,
                BackgroundSpec::Pixel(pixel) => Background::Pixel(pixel),
            }),
            border: self.border_pixel.map(crate::dix::Border::Pixel),
            bit_gravity: self.bit_gravity,
            win_gravity: self.win_gravity,
            backing_store: self.backing_store,
            override_redirect: self.override_redirect,
            save_under: self.save_under,
            event_mask: self.event_mask.map(EventMask::from_bits_truncate),
            do_not_propagate_mask: self.do_not_propagate_mask.map(EventMask::from_bits_truncate),
            colormap: self.colormap,
            ..WindowAttributes::default()
        }
    }
}

/// One scripted request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Create {
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        #[serde(default)]
        border_width: u32,
        #[serde(default = "default_class")]
        class: WindowClass,
        #[serde(default)]
        depth: u8,
        #[serde(default)]
        visual: VisualId,
        #[serde(default = "default_client")]
        client: ClientId,
        #[serde(default)]
        attributes: AttributesSpec,
    },
    Destroy {
        window: WindowId,
    },
    DestroySubwindows {
        window: WindowId,
    },
    Map {
        window: WindowId,
        #[serde(default = "default_client")]
        client: ClientId,
    },
    MapSubwindows {
        window: WindowId,
        #[serde(default = "default_client")]
        client: ClientId,
    },
    Unmap {
        window: WindowId,
    },
    UnmapSubwindows {
        window: WindowId,
    },
    Configure {
        window: WindowId,
        #[serde(default = "default_client")]
        client: ClientId,
        #[serde(flatten)]
        values: ConfigureValues,
    },
    Circulate {
        window: WindowId,
        direction: Circulate,
        #[serde(default = "default_client")]
        client: ClientId,
    },
    Reparent {
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
        #[serde(default = "default_client")]
        client: ClientId,
    },
    ChangeAttributes {
        window: WindowId,
        #[serde(default = "default_client")]
        client: ClientId,
        attributes: AttributesSpec,
    },
    SelectInput {
        window: WindowId,
        #[serde(default = "default_client")]
        client: ClientId,
        mask: u32,
    },
    /// `rects` are x, y, width, height relative to the inside corner;
    /// absent clears the shape
    SetShape {
        window: WindowId,
        kind: ShapeKind,
        #[serde(default)]
        rects: Option<Vec<(i32, i32, u32, u32)>>,
    },
    RedirectDraw {
        window: WindowId,
        enabled: bool,
    },
    ChangeProperty {
        window: WindowId,
        atom: Atom,
        #[serde(rename = "type")]
        type_: Atom,
        format: u8,
        mode: PropMode,
        data: Vec<u8>,
    },
    DeleteProperty {
        window: WindowId,
        atom: Atom,
    },
    SaveScreens {
        mode: SaverMode,
    },
    ClientGone {
        client: ClientId,
    },
}

/// Result of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse a script.
pub fn parse(text: &str) -> serde_json::Result<Vec<Request>> {
    serde_json::from_str(text)
}

/// Run every request against `screen`, in order.
pub fn replay(screen: &mut Screen, requests: &[Request]) -> Vec<Outcome> {
    requests
        .iter()
        .enumerate()
        .map(|(index, request)| {
            debug!("Replaying #{}: {:?}", index, request);
            let error = apply(screen, request).err().map(|err| {
                warn!("Request #{} failed: {}", index, err);
                err.to_string()
            });
            Outcome { index, error }
        })
        .collect()
}

fn apply(screen: &mut Screen, request: &Request) -> Result<()> {
    match request {
        Request::Create {
            window,
            parent,
            x,
            y,
            width,
            height,
            border_width,
            class,
            depth,
            visual,
            client,
            attributes,
        } => screen
            .create_window(
                *client,
                *depth,
                *window,
                *parent,
                *x,
                *y,
                *width,
                *height,
                *border_width,
                *class,
                *visual,
                &attributes.to_attributes(),
            )
            .map(|_| ()),
        Request::Destroy { window } => screen.destroy_window(*window),
        Request::DestroySubwindows { window } => screen.destroy_subwindows(*window),
        Request::Map { window, client } => screen.map_window(*window, *client),
        Request::MapSubwindows { window, client } => screen.map_subwindows(*window, *client),
        Request::Unmap { window } => screen.unmap_window(*window),
        Request::UnmapSubwindows { window } => screen.unmap_subwindows(*window),
        Request::Configure { window, client, values } => screen.configure_window(*window, values, *client),
        Request::Circulate { window, direction, client } => {
            screen.circulate_window(*window, *direction, *client)
        }
        Request::Reparent { window, parent, x, y, client } => {
            screen.reparent_window(*window, *parent, *x, *y, *client)
        }
        Request::ChangeAttributes { window, client, attributes } => {
            screen.change_attributes(*window, *client, &attributes.to_attributes())
        }
        Request::SelectInput { window, client, mask } => {
            screen.select_input(*window, *client, EventMask::from_bits_truncate(*mask))
        }
        Request::SetShape { window, kind, rects } => {
            let shape = rects.as_ref().map(|rects| {
                Region::from_rects(rects.iter().map(|&(x, y, w, h)| Rect::from_xywh(x, y, w, h)))
            });
            screen.set_shape(*window, *kind, shape)
        }
        Request::RedirectDraw { window, enabled } => screen.set_redirect_draw(*window, *enabled),
        Request::ChangeProperty { window, atom, type_, format, mode, data } => {
            screen.change_property(*window, *atom, *type_, *format, *mode, data)
        }
        Request::DeleteProperty { window, atom } => screen.delete_property(*window, *atom),
        Request::SaveScreens { mode } => screen.save_screens(*mode),
        Request::ClientGone { client } => screen.client_gone(*client),
    }
}
