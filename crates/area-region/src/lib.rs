//! Area Region
//!
//! Rectangle-list regions used by the window core for winSize, borderSize,
//! clip lists and exposure tracking. A region is a set of pairwise disjoint,
//! non-empty boxes; boxes are half-open (`x2`/`y2` are exclusive).

use serde::{Deserialize, Serialize};

/// An axis-aligned box with exclusive lower-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Rect { x1, y1, x2, y2 }
    }

    /// Box from an origin and a size.
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect {
            x1: x,
            y1: y,
            x2: x.saturating_add(width.min(i32::MAX as u32) as i32),
            y2: y.saturating_add(height.min(i32::MAX as u32) as i32),
        }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width() as i64 * self.height() as i64
        }
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// True when the two boxes share at least one pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    /// Intersection of two boxes. Returns None if they don't overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    /// Smallest box containing both. Empty boxes are ignored.
    pub fn bounding(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Grow the box by `n` pixels on every side.
    pub fn expand(&self, n: i32) -> Rect {
        Rect {
            x1: self.x1 - n,
            y1: self.y1 - n,
            x2: self.x2 + n,
            y2: self.y2 + n,
        }
    }

    /// Pieces of `self` not covered by `other` (at most four).
    fn subtract_into(&self, other: &Rect, out: &mut Vec<Rect>) {
        if !self.overlaps(other) {
            out.push(*self);
            return;
        }
        if other.y1 > self.y1 {
            out.push(Rect::new(self.x1, self.y1, self.x2, other.y1));
        }
        if other.y2 < self.y2 {
            out.push(Rect::new(self.x1, other.y2, self.x2, self.y2));
        }
        let band_y1 = self.y1.max(other.y1);
        let band_y2 = self.y2.min(other.y2);
        if other.x1 > self.x1 {
            out.push(Rect::new(self.x1, band_y1, other.x1, band_y2));
        }
        if other.x2 < self.x2 {
            out.push(Rect::new(other.x2, band_y1, self.x2, band_y2));
        }
    }
}

/// Where a box lies relative to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectIn {
    /// No pixel of the box is in the region.
    Out,
    /// Every pixel of the box is in the region.
    In,
    /// Some, but not all, pixels are in the region.
    Partial,
}

/// A set of disjoint boxes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// The empty region.
    pub fn new() -> Self {
        Region { rects: Vec::new() }
    }

    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            Region::new()
        } else {
            Region { rects: vec![rect] }
        }
    }

    /// Union of arbitrary (possibly overlapping) boxes.
    pub fn from_rects<I: IntoIterator<Item = Rect>>(rects: I) -> Self {
        let mut region = Region::new();
        for r in rects {
            region = region.union(&Region::from_rect(r));
        }
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Bounding box of the region; all zeroes when empty.
    pub fn extents(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.bounding(r))
    }

    /// Number of covered pixels.
    pub fn area(&self) -> i64 {
        self.rects.iter().map(Rect::area).sum()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Replace the contents with a single box.
    pub fn reset(&mut self, rect: Rect) {
        self.rects.clear();
        if !rect.is_empty() {
            self.rects.push(rect);
        }
    }

    pub fn intersect(&self, other: &Region) -> Region {
        let mut rects = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(r) = a.intersect(b) {
                    rects.push(r);
                }
            }
        }
        Region::coalesced(rects)
    }

    pub fn intersect_rect(&self, rect: &Rect) -> Region {
        let rects = self.rects.iter().filter_map(|a| a.intersect(rect)).collect();
        Region::coalesced(rects)
    }

    pub fn subtract(&self, other: &Region) -> Region {
        let mut rects = self.rects.clone();
        let other_extents = other.extents();
        for b in &other.rects {
            if rects.is_empty() {
                break;
            }
            let mut next = Vec::with_capacity(rects.len() + 4);
            for a in &rects {
                if a.overlaps(&other_extents) {
                    a.subtract_into(b, &mut next);
                } else {
                    next.push(*a);
                }
            }
            rects = next;
        }
        Region::coalesced(rects)
    }

    pub fn subtract_rect(&self, rect: &Rect) -> Region {
        self.subtract(&Region::from_rect(*rect))
    }

    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut rects = self.rects.clone();
        rects.extend_from_slice(&other.subtract(self).rects);
        Region::coalesced(rects)
    }

    pub fn union_rect(&self, rect: &Rect) -> Region {
        self.union(&Region::from_rect(*rect))
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        for r in &mut self.rects {
            *r = r.translate(dx, dy);
        }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Region {
        let mut region = self.clone();
        region.translate(dx, dy);
        region
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    pub fn contains_rect(&self, rect: &Rect) -> RectIn {
        if rect.is_empty() {
            return RectIn::Out;
        }
        let covered: i64 = self
            .rects
            .iter()
            .filter_map(|r| r.intersect(rect))
            .map(|r| r.area())
            .sum();
        if covered == 0 {
            RectIn::Out
        } else if covered == rect.area() {
            RectIn::In
        } else {
            RectIn::Partial
        }
    }

    pub fn is_subset_of(&self, other: &Region) -> bool {
        self.subtract(other).is_empty()
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.rects
            .iter()
            .any(|a| other.rects.iter().any(|b| a.overlaps(b)))
    }

    /// Merge boxes that share a full edge to keep the list short: runs
    /// within a band, then runs within a column, until a round merges
    /// nothing.
    fn coalesced(mut rects: Vec<Rect>) -> Region {
        rects.retain(|r| !r.is_empty());
        loop {
            let before = rects.len();
            rects.sort_unstable_by_key(|r| (r.y1, r.y2, r.x1));
            rects = merge_runs(
                rects,
                |a, b| a.y1 == b.y1 && a.y2 == b.y2 && a.x2 == b.x1,
                |a, b| Rect::new(a.x1, a.y1, b.x2, a.y2),
            );
            rects.sort_unstable_by_key(|r| (r.x1, r.x2, r.y1));
            rects = merge_runs(
                rects,
                |a, b| a.x1 == b.x1 && a.x2 == b.x2 && a.y2 == b.y1,
                |a, b| Rect::new(a.x1, a.y1, a.x2, b.y2),
            );
            if rects.len() == before {
                break;
            }
        }
        rects.sort_unstable_by_key(|r| (r.y1, r.x1));
        Region { rects }
    }
}

/// Join each box into its predecessor in `rects` while `adjacent` holds.
fn merge_runs(
    rects: Vec<Rect>,
    adjacent: impl Fn(&Rect, &Rect) -> bool,
    join: impl Fn(&Rect, &Rect) -> Rect,
) -> Vec<Rect> {
    let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
    for r in rects {
        match out.last_mut() {
            Some(last) if adjacent(last, &r) => *last = join(last, &r),
            _ => out.push(r),
        }
    }
    out
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Region::from_rect(rect)
    }
}

/// Regions compare by coverage, not by their box decomposition.
impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.area() == other.area() && self.is_subset_of(other)
    }
}

impl Eq for Region {}
