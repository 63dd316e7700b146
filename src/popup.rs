//! Gloss popup placement next to the selection it describes.

use ratatui::layout::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupSide {
    Below,
    Above,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopupPlacement {
    pub area: Rect,
    pub side: PopupSide,
}

/// Places a `width` x `height` popup against `anchor` inside `viewport`.
///
/// Below the anchor when it fits, otherwise above, otherwise on whichever
/// side has more room with the height shrunk to that room. Horizontally the
/// popup starts at the anchor and is pushed back inside the viewport.
pub fn place_popup(anchor: Rect, width: u16, height: u16, viewport: Rect) -> Option<PopupPlacement> {
    if viewport.width == 0 || viewport.height == 0 || width == 0 || height == 0 {
        return None;
    }

    let width = width.min(viewport.width);
    let viewport_right = viewport.x + viewport.width;
    let viewport_bottom = viewport.y + viewport.height;

    let anchor_top = anchor.y.clamp(viewport.y, viewport_bottom);
    let anchor_bottom = (anchor.y + anchor.height).clamp(anchor_top, viewport_bottom);
    let room_below = viewport_bottom - anchor_bottom;
    let room_above = anchor_top - viewport.y;

    let (side, height) = if height <= room_below {
        (PopupSide::Below, height)
    } else if height <= room_above {
        (PopupSide::Above, height)
    } else if room_below >= room_above {
        (PopupSide::Below, room_below)
    } else {
        (PopupSide::Above, room_above)
    };
    if height == 0 {
        return None;
    }

    let y = match side {
        PopupSide::Below => anchor_bottom,
        PopupSide::Above => anchor_top - height,
    };
    let x = anchor
        .x
        .max(viewport.x)
        .min(viewport_right.saturating_sub(width));

    Some(PopupPlacement {
        area: Rect::new(x, y, width, height),
        side,
    })
}
