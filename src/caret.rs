//! Point-to-text resolution.
//!
//! Hosts differ in what they can answer about "which character is under this
//! point". Strategies are probed once in a fixed priority order and the first
//! supported one is kept for the lifetime of the probe.

use std::fmt;

use log::debug;

use crate::layout::{Point, SurfaceLayout};
use crate::surface::TextPosition;

pub trait CaretStrategy {
    fn name(&self) -> &'static str;

    /// Whether the host's layout carries what this strategy needs.
    fn is_supported(&self, layout: &SurfaceLayout) -> bool;

    fn caret_from_point(&self, layout: &SurfaceLayout, point: Point) -> Option<TextPosition>;
}

/// Exact character under the point, from per-glyph boxes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphHitTest;

impl CaretStrategy for GlyphHitTest {
    fn name(&self) -> &'static str {
        "glyph-hit-test"
    }

    fn is_supported(&self, layout: &SurfaceLayout) -> bool {
        !layout.glyphs().is_empty()
    }

    fn caret_from_point(&self, layout: &SurfaceLayout, point: Point) -> Option<TextPosition> {
        layout.glyph_near(point).map(|glyph| glyph.position)
    }
}

/// Start of the token box under the point. Coarser than [`GlyphHitTest`]:
/// taps between tokens resolve to nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenHitTest;

impl CaretStrategy for TokenHitTest {
    fn name(&self) -> &'static str {
        "token-hit-test"
    }

    fn is_supported(&self, layout: &SurfaceLayout) -> bool {
        !layout.tokens().is_empty()
    }

    fn caret_from_point(&self, layout: &SurfaceLayout, point: Point) -> Option<TextPosition> {
        layout.token_at(point).map(|token| token.range.start)
    }
}

pub fn default_strategies() -> Vec<Box<dyn CaretStrategy>> {
    vec![Box::new(GlyphHitTest), Box::new(TokenHitTest)]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaretSupport {
    Unprobed,
    Strategy(usize),
    Unavailable,
}

pub struct CaretProbe {
    strategies: Vec<Box<dyn CaretStrategy>>,
    support: CaretSupport,
}

impl fmt::Debug for CaretProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("CaretProbe")
            .field("strategies", &names)
            .field("support", &self.support)
            .finish()
    }
}

impl CaretProbe {
    pub fn new(strategies: Vec<Box<dyn CaretStrategy>>) -> Self {
        Self {
            strategies,
            support: CaretSupport::Unprobed,
        }
    }

    pub fn support(&self) -> CaretSupport {
        self.support
    }

    /// False only once probing has found nothing usable.
    pub fn is_available(&self) -> bool {
        self.support != CaretSupport::Unavailable
    }

    pub fn active_strategy(&self) -> Option<&'static str> {
        match self.support {
            CaretSupport::Strategy(index) => self.strategies.get(index).map(|s| s.name()),
            _ => None,
        }
    }

    pub fn caret_from_point(
        &mut self,
        layout: &SurfaceLayout,
        point: Point,
    ) -> Option<TextPosition> {
        if self.support == CaretSupport::Unprobed {
            if layout.glyphs().is_empty() && layout.tokens().is_empty() {
                // Nothing drawn yet says nothing about the host.
                return None;
            }
            self.probe(layout);
        }
        match self.support {
            CaretSupport::Strategy(index) => self.strategies[index].caret_from_point(layout, point),
            _ => None,
        }
    }

    fn probe(&mut self, layout: &SurfaceLayout) {
        self.support = match self
            .strategies
            .iter()
            .position(|strategy| strategy.is_supported(layout))
        {
            Some(index) => {
                debug!("caret strategy: {}", self.strategies[index].name());
                CaretSupport::Strategy(index)
            }
            None => {
                debug!("no caret strategy supported, word taps disabled");
                CaretSupport::Unavailable
            }
        };
    }
}

impl Default for CaretProbe {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}
