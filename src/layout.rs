//! Screen geometry of a rendered surface.
//!
//! Coordinates are device-independent pixels. The terminal host converts
//! cells with [`CellMetrics`]; other hosts can fill a [`SurfaceLayout`]
//! straight from their own text layout.

use ratatui::layout::Rect as CellRect;

use crate::surface::{TextPosition, TextRange};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.y && y < self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    fn horizontal_distance(&self, x: f32) -> f32 {
        if x < self.x {
            self.x - x
        } else if x >= self.right() {
            x - self.right()
        } else {
            0.0
        }
    }
}

/// Size of one terminal cell in device-independent pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellMetrics {
    pub width: f32,
    pub height: f32,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 16.0,
        }
    }
}

impl CellMetrics {
    /// Centre of the cell at `column`, `row`.
    pub fn point_at(&self, column: u16, row: u16) -> Point {
        Point::new(
            (column as f32 + 0.5) * self.width,
            (row as f32 + 0.5) * self.height,
        )
    }

    pub fn cell_rect(&self, column: u16, row: u16, columns: u16) -> Rect {
        Rect::new(
            column as f32 * self.width,
            row as f32 * self.height,
            columns as f32 * self.width,
            self.height,
        )
    }

    pub fn area_rect(&self, area: CellRect) -> Rect {
        Rect::new(
            area.x as f32 * self.width,
            area.y as f32 * self.height,
            area.width as f32 * self.width,
            area.height as f32 * self.height,
        )
    }

    /// Smallest cell rectangle covering `rect`.
    pub fn to_cells(&self, rect: Rect) -> CellRect {
        let left = (rect.x / self.width).floor().max(0.0);
        let top = (rect.y / self.height).floor().max(0.0);
        let right = (rect.right() / self.width).ceil().max(left);
        let bottom = (rect.bottom() / self.height).ceil().max(top);
        CellRect::new(
            left as u16,
            top as u16,
            (right - left) as u16,
            (bottom - top) as u16,
        )
    }
}

/// Screen box of one rendered character.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphBox {
    pub position: TextPosition,
    pub rect: Rect,
}

/// Screen box of one rendered token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TokenBox {
    pub range: TextRange,
    pub rect: Rect,
}

/// Where the visible part of a surface ended up on screen.
///
/// Either list may be empty; the caret strategies probe for what is present.
#[derive(Clone, Debug, Default)]
pub struct SurfaceLayout {
    container: Rect,
    glyphs: Vec<GlyphBox>,
    tokens: Vec<TokenBox>,
}

impl SurfaceLayout {
    pub fn new(container: Rect) -> Self {
        Self {
            container,
            glyphs: Vec::new(),
            tokens: Vec::new(),
        }
    }

    pub fn container(&self) -> Rect {
        self.container
    }

    pub fn glyphs(&self) -> &[GlyphBox] {
        &self.glyphs
    }

    pub fn tokens(&self) -> &[TokenBox] {
        &self.tokens
    }

    pub fn push_glyph(&mut self, position: TextPosition, rect: Rect) {
        self.glyphs.push(GlyphBox { position, rect });
    }

    pub fn push_token(&mut self, range: TextRange, rect: Rect) {
        self.tokens.push(TokenBox { range, rect });
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.container.contains(point)
    }

    /// Glyph under `point`, or the horizontally nearest glyph on the same row.
    pub fn glyph_near(&self, point: Point) -> Option<&GlyphBox> {
        self.glyphs
            .iter()
            .filter(|glyph| glyph.rect.contains_y(point.y))
            .min_by(|a, b| {
                a.rect
                    .horizontal_distance(point.x)
                    .total_cmp(&b.rect.horizontal_distance(point.x))
            })
    }

    pub fn token_at(&self, point: Point) -> Option<&TokenBox> {
        self.tokens.iter().find(|token| token.rect.contains(point))
    }

    /// Bounding box of the laid-out part of `range`.
    pub fn range_bounds(&self, range: TextRange) -> Option<Rect> {
        let from_glyphs = self
            .glyphs
            .iter()
            .filter(|glyph| range.contains(glyph.position))
            .map(|glyph| glyph.rect)
            .reduce(|acc, rect| acc.union(&rect));
        if from_glyphs.is_some() {
            return from_glyphs;
        }
        self.tokens
            .iter()
            .filter(|token| token.range.start < range.end && range.start < token.range.end)
            .map(|token| token.rect)
            .reduce(|acc, rect| acc.union(&rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_layout(text: &str) -> SurfaceLayout {
        let mut layout = SurfaceLayout::new(Rect::new(0.0, 0.0, 200.0, 20.0));
        for (idx, _) in text.chars().enumerate() {
            layout.push_glyph(
                TextPosition::new(0, idx),
                Rect::new(idx as f32 * 10.0, 0.0, 10.0, 20.0),
            );
        }
        layout
    }

    #[test]
    fn glyph_near_prefers_exact_hit() {
        let layout = row_layout("hola");
        let glyph = layout.glyph_near(Point::new(25.0, 5.0)).unwrap();
        assert_eq!(glyph.position.offset, 2);
    }

    #[test]
    fn glyph_near_snaps_to_line_end() {
        let layout = row_layout("hola");
        let glyph = layout.glyph_near(Point::new(150.0, 5.0)).unwrap();
        assert_eq!(glyph.position.offset, 3);
        assert!(layout.glyph_near(Point::new(5.0, 30.0)).is_none());
    }

    #[test]
    fn range_bounds_unions_glyphs() {
        let layout = row_layout("hola mundo");
        let bounds = layout
            .range_bounds(TextRange::within_paragraph(0, 5..10))
            .unwrap();
        assert_eq!(bounds, Rect::new(50.0, 0.0, 50.0, 20.0));
    }

    #[test]
    fn range_bounds_falls_back_to_tokens() {
        let mut layout = SurfaceLayout::new(Rect::new(0.0, 0.0, 100.0, 20.0));
        layout.push_token(
            TextRange::within_paragraph(0, 0..4),
            Rect::new(0.0, 0.0, 40.0, 20.0),
        );
        let bounds = layout
            .range_bounds(TextRange::within_paragraph(0, 1..3))
            .unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 40.0, 20.0));
    }

    #[test]
    fn cell_conversion_round_trips_cell_boxes() {
        let metrics = CellMetrics::default();
        let rect = metrics.cell_rect(3, 2, 5);
        assert_eq!(metrics.to_cells(rect), CellRect::new(3, 2, 5, 1));
        let point = metrics.point_at(3, 2);
        assert!(rect.contains(point));
    }
}
