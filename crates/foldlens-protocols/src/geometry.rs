//! Viewport geometry: content rects and the fold coverage grid.

use serde::{Deserialize, Serialize};

/// Coverage grid columns.
pub const GRID_COLS: usize = 24;
/// Coverage grid rows.
pub const GRID_ROWS: usize = 32;

/// Provenance of a content rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RectKind {
    Glyph,
    Media,
    Cta,
    HeroBackground,
}

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Clips to a `(0,0)..(vw,vh)` viewport. `None` when nothing remains.
    pub fn clip(&self, vw: f64, vh: f64) -> Option<Rect> {
        let x0 = self.x.max(0.0);
        let y0 = self.y.max(0.0);
        let x1 = self.right().min(vw);
        let y1 = self.bottom().min(vh);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Shrinks by `margin` on every side. `None` when the rect collapses.
    pub fn erode(&self, margin: f64) -> Option<Rect> {
        let w = self.width - 2.0 * margin;
        let h = self.height - 2.0 * margin;
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        Some(Rect::new(self.x + margin, self.y + margin, w, h))
    }

    /// Scales around the center so the area becomes `max_area`, when larger.
    pub fn cap_area(&self, max_area: f64) -> Rect {
        let area = self.area();
        if area <= max_area || area <= 0.0 || max_area <= 0.0 {
            return *self;
        }
        let scale = (max_area / area).sqrt();
        let w = self.width * scale;
        let h = self.height * scale;
        Rect::new(
            self.x + (self.width - w) / 2.0,
            self.y + (self.height - h) / 2.0,
            w,
            h,
        )
    }

    /// True when `self` lies entirely inside the `(0,0)..(vw,vh)` viewport.
    pub fn inside_viewport(&self, vw: f64, vh: f64) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= vw
            && self.bottom() <= vh
    }

    /// True when `self` lies entirely inside `outer`.
    pub fn contained_in(&self, outer: &Rect) -> bool {
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }
}

/// Content rects grouped by provenance, as the fold audit program reports
/// them. Field names match the in-page program's payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectSets {
    #[serde(default)]
    pub glyphs: Vec<Rect>,
    #[serde(default)]
    pub media: Vec<Rect>,
    #[serde(default)]
    pub ctas: Vec<Rect>,
    #[serde(default)]
    pub hero_backgrounds: Vec<Rect>,
}

impl RectSets {
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
            && self.media.is_empty()
            && self.ctas.is_empty()
            && self.hero_backgrounds.is_empty()
    }

    /// Every rect with its provenance tag, in category order.
    pub fn iter_tagged(&self) -> impl Iterator<Item = (RectKind, &Rect)> {
        let glyphs = self.glyphs.iter().map(|r| (RectKind::Glyph, r));
        let media = self.media.iter().map(|r| (RectKind::Media, r));
        let ctas = self.ctas.iter().map(|r| (RectKind::Cta, r));
        let heroes = self
            .hero_backgrounds
            .iter()
            .map(|r| (RectKind::HeroBackground, r));
        glyphs.chain(media).chain(ctas).chain(heroes)
    }
}

/// Fixed-resolution rasterizer approximating what fraction of the fold is
/// occupied. A cell counts as covered once any rect overlaps it, so the
/// coverage percentage is monotone under rect addition and bounded by 100.
#[derive(Debug, Clone)]
pub struct CoverageGrid {
    viewport_w: f64,
    viewport_h: f64,
    cells: [bool; GRID_COLS * GRID_ROWS],
}

impl CoverageGrid {
    pub fn new(viewport_w: f64, viewport_h: f64) -> Self {
        Self {
            viewport_w,
            viewport_h,
            cells: [false; GRID_COLS * GRID_ROWS],
        }
    }

    /// Marks every cell the rect overlaps. The rect is clipped to the
    /// viewport first; degenerate rects mark nothing.
    pub fn add(&mut self, rect: &Rect) {
        let Some(r) = rect.clip(self.viewport_w, self.viewport_h) else {
            return;
        };
        let cell_w = self.viewport_w / GRID_COLS as f64;
        let cell_h = self.viewport_h / GRID_ROWS as f64;
        let col_start = (r.x / cell_w).floor() as usize;
        let col_end = ((r.right() / cell_w).ceil() as usize).min(GRID_COLS);
        let row_start = (r.y / cell_h).floor() as usize;
        let row_end = ((r.bottom() / cell_h).ceil() as usize).min(GRID_ROWS);
        for row in row_start..row_end {
            for col in col_start..col_end {
                self.cells[row * GRID_COLS + col] = true;
            }
        }
    }

    pub fn add_all<'a>(&mut self, rects: impl IntoIterator<Item = &'a Rect>) {
        for rect in rects {
            self.add(rect);
        }
    }

    pub fn covered_cells(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    /// Row-major cell states, `GRID_ROWS` rows of `GRID_COLS` columns.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Covered-cell ratio in percent, clamped to `[0, 100]`.
    pub fn coverage_pct(&self) -> f64 {
        let pct = self.covered_cells() as f64 / (GRID_COLS * GRID_ROWS) as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
