use std::time::{Duration, Instant};

use super::*;
use crate::caret::GlyphHitTest;

const GLYPH_WIDTH: f32 = 10.0;
const ROW_HEIGHT: f32 = 20.0;

/// One paragraph per row, one fixed-width glyph per char.
struct TestHost {
    surface: TextSurface,
    layout: SurfaceLayout,
    selection: Option<NativeSelection>,
}

impl TestHost {
    fn new(paragraphs: &[&str]) -> Self {
        Self::build(paragraphs, true, true)
    }

    fn tokens_only(paragraphs: &[&str]) -> Self {
        Self::build(paragraphs, false, true)
    }

    fn build(paragraphs: &[&str], glyphs: bool, tokens: bool) -> Self {
        let surface = TextSurface::new(paragraphs.iter().copied());
        let widest = surface
            .paragraphs()
            .iter()
            .map(|p| p.char_len())
            .max()
            .unwrap_or(0);
        let container = Rect::new(
            0.0,
            0.0,
            widest as f32 * GLYPH_WIDTH,
            surface.len() as f32 * ROW_HEIGHT,
        );
        let mut layout = SurfaceLayout::new(container);
        for (row, paragraph) in surface.paragraphs().iter().enumerate() {
            let y = row as f32 * ROW_HEIGHT;
            if glyphs {
                for offset in 0..paragraph.char_len() {
                    layout.push_glyph(
                        TextPosition::new(row, offset),
                        Rect::new(offset as f32 * GLYPH_WIDTH, y, GLYPH_WIDTH, ROW_HEIGHT),
                    );
                }
            }
            if tokens {
                for token in paragraph.tokens() {
                    layout.push_token(
                        TextRange::within_paragraph(row, token.range()),
                        Rect::new(
                            token.start as f32 * GLYPH_WIDTH,
                            y,
                            (token.end - token.start) as f32 * GLYPH_WIDTH,
                            ROW_HEIGHT,
                        ),
                    );
                }
            }
        }
        Self {
            surface,
            layout,
            selection: None,
        }
    }

    fn offset_of(&self, paragraph: usize, needle: &str) -> usize {
        let text = self.surface.paragraph(paragraph).unwrap().text();
        let byte = text.find(needle).expect("needle present");
        text[..byte].chars().count()
    }

    fn point_at(&self, paragraph: usize, offset: usize) -> Point {
        Point::new(
            (offset as f32 + 0.5) * GLYPH_WIDTH,
            (paragraph as f32 + 0.5) * ROW_HEIGHT,
        )
    }

    /// A point on the second char of the first occurrence of `needle`.
    fn point_in(&self, paragraph: usize, needle: &str) -> Point {
        self.point_at(paragraph, self.offset_of(paragraph, needle) + 1)
    }

    fn range_of(&self, paragraph: usize, needle: &str) -> TextRange {
        let start = self.offset_of(paragraph, needle);
        TextRange::within_paragraph(paragraph, start..start + needle.chars().count())
    }

    fn select(&mut self, range: TextRange) {
        self.selection = Some(NativeSelection::from_range(range));
    }

    fn click_offset(
        &mut self,
        resolver: &mut SelectionResolver,
        offset: usize,
        at: Instant,
    ) -> Option<SelectionResult> {
        let point = self.point_at(0, offset);
        resolver.handle(self, click(point, at))
    }

    fn click_word(
        &mut self,
        resolver: &mut SelectionResolver,
        needle: &str,
        at: Instant,
    ) -> Option<SelectionResult> {
        let point = self.point_in(0, needle);
        resolver.handle(self, click(point, at))
    }
}

impl SelectionHost for TestHost {
    fn surface(&self) -> &TextSurface {
        &self.surface
    }

    fn layout(&self) -> &SurfaceLayout {
        &self.layout
    }

    fn native_selection(&self) -> Option<NativeSelection> {
        self.selection
    }

    fn set_native_selection(&mut self, range: Option<TextRange>) {
        self.selection = range.map(NativeSelection::from_range);
    }
}

fn after(start: Instant, millis: u64) -> Instant {
    start + Duration::from_millis(millis)
}

fn click(point: Point, at: Instant) -> InputEvent {
    InputEvent::Click { point, at }
}

const STORY: &str = "Él corrió. Ella esperó. ¿Qué pasó?";

#[test]
fn tap_resolves_word_and_sentence() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    let result = host
        .click_word(&mut resolver, "esperó", t0)
        .expect("word resolved");
    assert_eq!(result.text, "esperó");
    assert_eq!(result.sentence, "Ella esperó.");

    let result = host
        .click_word(&mut resolver, "pasó", after(t0, 1000))
        .expect("word resolved");
    assert_eq!(result.text, "pasó");
    assert_eq!(result.sentence, "¿Qué pasó?");
}

#[test]
fn inverted_mark_bounds_sentence_without_period() {
    let mut host = TestHost::new(&["¡Hola! ¿Cómo estás?"]);
    let mut resolver = SelectionResolver::default();

    let result = host
        .click_word(&mut resolver, "Cómo", Instant::now())
        .expect("word resolved");
    assert_eq!(result.text, "Cómo");
    assert_eq!(result.sentence, "¿Cómo estás?");
}

#[test]
fn tap_strips_punctuation_and_highlights_bare_word() {
    let mut host = TestHost::new(&["Dijo «hola», y se fue."]);
    let mut resolver = SelectionResolver::default();

    let result = host
        .click_word(&mut resolver, "hola", Instant::now())
        .expect("word resolved");
    assert_eq!(result.text, "hola");
    assert_eq!(result.sentence, "Dijo «hola», y se fue.");

    let expected = host.range_of(0, "hola");
    assert_eq!(result.range, expected);
    assert_eq!(host.selection, Some(NativeSelection::from_range(expected)));
    assert_eq!(
        result.anchor_region,
        Rect::new(6.0 * GLYPH_WIDTH, 0.0, 4.0 * GLYPH_WIDTH, ROW_HEIGHT)
    );
}

#[test]
fn tap_on_punctuation_only_token_is_ignored() {
    let mut host = TestHost::new(&["Dijo — y calló « » ¡¿"]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    for (idx, needle) in ["—", "«", "»", "¡¿"].into_iter().enumerate() {
        let point = host.point_at(0, host.offset_of(0, needle));
        let at = after(t0, idx as u64 * 1000);
        assert!(resolver.handle(&mut host, click(point, at)).is_none());
    }
    assert!(resolver.current().is_none());
    assert!(host.selection.is_none());
}

#[test]
fn tap_on_ellipsis_dashes_or_brackets_is_ignored() {
    let mut host = TestHost::new(&["Y luego … -- (...) - [ ] nada."]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    let lone_dash = host.offset_of(0, " - ") + 1;
    let offsets = [
        host.offset_of(0, "…"),
        host.offset_of(0, "--"),
        host.offset_of(0, "(...)"),
        lone_dash,
        host.offset_of(0, "["),
    ];
    for (idx, offset) in offsets.into_iter().enumerate() {
        let point = host.point_at(0, offset);
        let at = after(t0, idx as u64 * 1000);
        assert!(
            resolver.handle(&mut host, click(point, at)).is_none(),
            "token at {offset} resolved"
        );
    }
    assert!(resolver.current().is_none());

    let result = host
        .click_word(&mut resolver, "nada", after(t0, 9000))
        .expect("word resolved");
    assert_eq!(result.text, "nada");
}

#[test]
fn phrase_of_punctuation_only_is_ignored() {
    let mut host = TestHost::new(&["Y luego … -- (...) nada."]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, "… -- (...)"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    assert!(resolver.poll(&mut host, after(t0, 400)).is_none());
    assert!(resolver.current().is_none());
}

#[test]
fn tap_on_space_after_word_picks_that_word() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let space = host.offset_of(0, "corrió.") + "corrió.".chars().count();

    let result = host
        .click_offset(&mut resolver, space, Instant::now())
        .expect("word resolved");
    assert_eq!(result.text, "corrió");
}

#[test]
fn click_outside_surface_is_ignored() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();

    let outside = Point::new(5.0, 5.0 * ROW_HEIGHT);
    assert!(resolver.handle(&mut host, click(outside, Instant::now())).is_none());
    assert!(resolver.current().is_none());
}

#[test]
fn repeated_click_within_dedup_window_fires_once() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "corrió");
    let t0 = Instant::now();

    assert!(resolver.handle(&mut host, click(point, t0)).is_some());
    assert!(resolver.handle(&mut host, click(point, after(t0, 100))).is_none());
    assert!(resolver.handle(&mut host, click(point, after(t0, 399))).is_none());
    assert!(resolver.handle(&mut host, click(point, after(t0, 450))).is_some());
}

#[test]
fn synthetic_click_after_touch_tap_is_swallowed() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "Ella");
    let t0 = Instant::now();

    let mut fired = Vec::new();
    let events = [
        InputEvent::TouchStart { point, at: t0 },
        InputEvent::TouchEnd {
            point,
            at: after(t0, 120),
        },
        click(point, after(t0, 180)),
    ];
    for event in events {
        if let Some(result) = resolver.handle(&mut host, event) {
            fired.push(result);
        }
    }

    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].text, "Ella");
}

/// Replays what a touch host emits: the gesture, then a click at its end.
fn touch_then_click(
    resolver: &mut SelectionResolver,
    host: &mut TestHost,
    start: Point,
    end: Point,
    t0: Instant,
    held_ms: u64,
) -> (Option<SelectionResult>, Option<SelectionResult>) {
    resolver.handle(host, InputEvent::TouchStart { point: start, at: t0 });
    let released = after(t0, held_ms);
    let on_end = resolver.handle(
        host,
        InputEvent::TouchEnd {
            point: end,
            at: released,
        },
    );
    let on_click = resolver.handle(host, click(end, released));
    (on_end, on_click)
}

#[test]
fn long_press_followed_by_click_resolves_nothing() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "esperó");
    let t0 = Instant::now();

    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t0 });
    host.selection = Some(NativeSelection::collapsed_at(
        host.range_of(0, "esperó").start,
    ));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 5) });
    let released = after(t0, 900);
    let end = InputEvent::TouchEnd {
        point,
        at: released,
    };
    assert!(resolver.handle(&mut host, end).is_none());
    assert!(resolver.handle(&mut host, click(point, released)).is_none());
    assert!(resolver.current().is_none());
    assert!(resolver.poll(&mut host, after(t0, 2000)).is_none());
}

#[test]
fn slow_short_drag_followed_by_click_resolves_nothing() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let start = host.point_in(0, "esperó");
    let end = Point::new(start.x + 3.0 * GLYPH_WIDTH, start.y);
    let t0 = Instant::now();

    resolver.handle(&mut host, InputEvent::TouchStart { point: start, at: t0 });
    let first = host.range_of(0, "esperó").start;
    host.select(TextRange::new(first, TextPosition::new(0, first.offset + 1)));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 200) });
    assert!(resolver.has_pending_gesture());

    let released = after(t0, 300);
    let touch_end = InputEvent::TouchEnd {
        point: end,
        at: released,
    };
    assert!(resolver.handle(&mut host, touch_end).is_none());
    assert!(resolver.handle(&mut host, click(end, released)).is_none());
    assert!(resolver.poll(&mut host, after(t0, 1000)).is_none());
    assert!(resolver.current().is_none());
}

#[test]
fn touch_tap_followed_by_click_fires_once_and_later_taps_still_work() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    let point = host.point_in(0, "corrió");
    let (on_end, on_click) = touch_then_click(&mut resolver, &mut host, point, point, t0, 90);
    assert_eq!(on_end.unwrap().text, "corrió");
    assert!(on_click.is_none());

    let point = host.point_in(0, "esperó");
    let (on_end, on_click) =
        touch_then_click(&mut resolver, &mut host, point, point, after(t0, 1000), 900);
    assert!(on_end.is_none());
    assert!(on_click.is_none());
    assert_eq!(resolver.current().unwrap().text, "corrió");

    let point = host.point_in(0, "pasó");
    let (on_end, on_click) =
        touch_then_click(&mut resolver, &mut host, point, point, after(t0, 3000), 120);
    assert_eq!(on_end.unwrap().text, "pasó");
    assert!(on_click.is_none());

    // A plain click long after the last gesture is a tap of its own.
    let point = host.point_in(0, "Ella");
    let result = resolver.handle(&mut host, click(point, after(t0, 5000)));
    assert_eq!(result.unwrap().text, "Ella");
}

#[test]
fn touch_tap_thresholds() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "esperó");
    let t0 = Instant::now();

    // Held too long.
    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t0 });
    let end = InputEvent::TouchEnd {
        point,
        at: after(t0, 500),
    };
    assert!(resolver.handle(&mut host, end).is_none());

    // Moved too far horizontally.
    let t1 = after(t0, 2000);
    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t1 });
    let end = InputEvent::TouchEnd {
        point: Point::new(point.x + 10.0, point.y),
        at: after(t1, 100),
    };
    assert!(resolver.handle(&mut host, end).is_none());

    // Moved too far vertically.
    let t2 = after(t0, 4000);
    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t2 });
    let end = InputEvent::TouchEnd {
        point: Point::new(point.x, point.y - 12.0),
        at: after(t2, 100),
    };
    assert!(resolver.handle(&mut host, end).is_none());

    // Just inside every bound.
    let t3 = after(t0, 6000);
    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t3 });
    let end = InputEvent::TouchEnd {
        point: Point::new(point.x + 9.0, point.y + 9.0),
        at: after(t3, 499),
    };
    let result = resolver.handle(&mut host, end).expect("tap resolved");
    assert_eq!(result.text, "esperó");
}

#[test]
fn touch_caret_is_taken_at_gesture_start() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "esperó");
    let t0 = Instant::now();

    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t0 });
    assert!(resolver.has_pending_gesture());

    // The host stops answering point queries mid-gesture.
    host.layout = SurfaceLayout::new(host.layout.container());

    let result = resolver
        .handle(
            &mut host,
            InputEvent::TouchEnd {
                point,
                at: after(t0, 80),
            },
        )
        .expect("cached caret committed");
    assert_eq!(result.text, "esperó");
    assert_eq!(result.anchor_region, Rect::new(point.x, point.y, 0.0, 0.0));
}

#[test]
fn growing_native_selection_discards_pending_tap() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "esperó");
    let t0 = Instant::now();

    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t0 });
    host.select(host.range_of(0, "Ella esperó"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 50) });
    assert!(!resolver.has_pending_gesture());

    let end = InputEvent::TouchEnd {
        point,
        at: after(t0, 100),
    };
    assert!(resolver.handle(&mut host, end).is_none());
}

#[test]
fn collapsed_selection_change_keeps_pending_tap() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let point = host.point_in(0, "corrió");
    let t0 = Instant::now();

    resolver.handle(&mut host, InputEvent::TouchStart { point, at: t0 });
    host.selection = Some(NativeSelection::collapsed_at(TextPosition::new(0, 4)));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 10) });
    assert!(resolver.has_pending_gesture());

    let end = InputEvent::TouchEnd {
        point,
        at: after(t0, 90),
    };
    assert_eq!(resolver.handle(&mut host, end).unwrap().text, "corrió");
}

#[test]
fn pending_gesture_retains_previous_result() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.click_word(&mut resolver, "corrió", t0);
    let point = host.point_in(0, "pasó");
    resolver.handle(
        &mut host,
        InputEvent::TouchStart {
            point,
            at: after(t0, 1000),
        },
    );
    assert_eq!(resolver.current().unwrap().text, "corrió");

    let long_press = InputEvent::TouchEnd {
        point,
        at: after(t0, 1800),
    };
    assert!(resolver.handle(&mut host, long_press).is_none());
    assert_eq!(resolver.current().unwrap().text, "corrió");

    resolver.handle(
        &mut host,
        InputEvent::TouchStart {
            point,
            at: after(t0, 3000),
        },
    );
    resolver.handle(&mut host, InputEvent::TouchCancel);
    assert!(!resolver.has_pending_gesture());
    assert_eq!(resolver.current().unwrap().text, "corrió");
}

const HAT: &str = "Llevaba el sombrero de tres picos. Nadie lo vio.";

#[test]
fn drag_selection_resolves_phrase_after_quiescence() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, "el sombrero de tres"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    assert_eq!(resolver.next_deadline(), Some(after(t0, 300)));
    assert!(resolver.poll(&mut host, after(t0, 299)).is_none());

    let result = resolver
        .poll(&mut host, after(t0, 300))
        .expect("phrase resolved");
    assert_eq!(result.text, "el sombrero de tres");
    assert_eq!(result.sentence, "Llevaba el sombrero de tres picos.");
    assert_eq!(
        result.anchor_region,
        Rect::new(8.0 * GLYPH_WIDTH, 0.0, 19.0 * GLYPH_WIDTH, ROW_HEIGHT)
    );
    assert!(resolver.next_deadline().is_none());
}

#[test]
fn selection_changes_restart_the_debounce() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, "el som"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    host.select(host.range_of(0, "el sombrero"));
    resolver.handle(
        &mut host,
        InputEvent::SelectionChange {
            at: after(t0, 200),
        },
    );

    assert!(resolver.poll(&mut host, after(t0, 350)).is_none());
    let result = resolver.poll(&mut host, after(t0, 500)).unwrap();
    assert_eq!(result.text, "el sombrero");
}

#[test]
fn phrase_outer_whitespace_is_trimmed() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, " sombrero de "));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    let result = resolver.poll(&mut host, after(t0, 300)).unwrap();
    assert_eq!(result.text, "sombrero de");
    assert_eq!(result.range, host.range_of(0, "sombrero de"));
    assert_eq!(host.selection, Some(NativeSelection::from_range(result.range)));
}

#[test]
fn short_or_punctuation_selections_are_ignored() {
    let mut host = TestHost::new(&["Y tú, ¿qué? — nada."]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    for (idx, needle) in ["Y ", " —", "¿", ", ¿"].into_iter().enumerate() {
        let at = after(t0, idx as u64 * 1000);
        host.select(host.range_of(0, needle));
        resolver.handle(&mut host, InputEvent::SelectionChange { at });
        assert!(resolver.poll(&mut host, after(at, 300)).is_none(), "{needle:?}");
    }
    assert!(resolver.current().is_none());
}

#[test]
fn drag_released_outside_surface_produces_nothing() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    let start = host.range_of(0, "sombrero").start;
    host.selection = Some(NativeSelection::new(Some(start), None));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    assert!(resolver.poll(&mut host, after(t0, 300)).is_none());
    assert!(resolver.current().is_none());

    // The release that ends the drag is not a word tap either.
    let release = click(host.point_in(0, "tres"), after(t0, 20));
    assert!(resolver.handle(&mut host, release).is_none());
}

#[test]
fn tap_ignored_while_user_selection_active() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, "sombrero de"));
    let point = host.point_in(0, "picos");
    assert!(resolver.handle(&mut host, click(point, t0)).is_none());

    host.selection = None;
    let result = resolver.handle(&mut host, click(point, after(t0, 50))).unwrap();
    assert_eq!(result.text, "picos");
}

#[test]
fn committed_highlight_does_not_block_next_tap() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, "el sombrero"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    resolver.poll(&mut host, after(t0, 300)).unwrap();

    let result = host
        .click_word(&mut resolver, "Nadie", after(t0, 1000))
        .unwrap();
    assert_eq!(result.text, "Nadie");
    assert_eq!(result.sentence, "Nadie lo vio.");
}

#[test]
fn own_highlight_does_not_retrigger_phrase_mode() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.click_word(&mut resolver, "sombrero", t0);
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 5) });
    assert!(resolver.poll(&mut host, after(t0, 400)).is_none());
    assert_eq!(resolver.current().unwrap().text, "sombrero");
}

#[test]
fn phrase_sentence_uses_selection_position_not_first_match() {
    let text = "Dijo que no. Luego dijo que no otra vez.";
    let mut host = TestHost::new(&[text]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    let byte = text.rfind("que no").unwrap();
    let start = text[..byte].chars().count();
    host.select(TextRange::within_paragraph(0, start..start + 6));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });

    let result = resolver.poll(&mut host, after(t0, 300)).unwrap();
    assert_eq!(result.text, "que no");
    assert_eq!(result.sentence, "Luego dijo que no otra vez.");
}

#[test]
fn phrase_across_paragraphs_takes_sentence_from_start() {
    let mut host = TestHost::new(&["Primera parte. Sigue aquí", "y termina allá."]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    let start = host.range_of(0, "Sigue").start;
    let end = host.range_of(1, "y termina").end;
    host.select(TextRange::new(start, end));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });

    let result = resolver.poll(&mut host, after(t0, 300)).unwrap();
    assert_eq!(result.text, "Sigue aquí\ny termina");
    assert_eq!(result.sentence, "Sigue aquí");
}

#[test]
fn token_layout_serves_as_fallback() {
    let mut host = TestHost::tokens_only(&[STORY]);
    let mut resolver = SelectionResolver::default();

    let result = host
        .click_word(&mut resolver, "esperó", Instant::now())
        .unwrap();
    assert_eq!(result.text, "esperó");
    assert_eq!(resolver.caret_strategy(), Some("token-hit-test"));
}

#[test]
fn missing_caret_support_disables_word_taps_only() {
    let mut host = TestHost::tokens_only(&[HAT]);
    let strategies: Vec<Box<dyn CaretStrategy>> = vec![Box::new(GlyphHitTest)];
    let mut resolver = SelectionResolver::with_strategies(ResolverConfig::default(), strategies);
    let t0 = Instant::now();

    assert!(resolver.word_tap_available());
    assert!(host
        .click_word(&mut resolver, "picos", t0)
        .is_none());
    assert!(!resolver.word_tap_available());

    host.select(host.range_of(0, "tres picos"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 10) });
    let result = resolver.poll(&mut host, after(t0, 310)).unwrap();
    assert_eq!(result.text, "tres picos");
    let start = host.offset_of(0, "tres");
    let end = host.offset_of(0, "picos.") + "picos.".chars().count();
    assert_eq!(
        result.anchor_region,
        Rect::new(
            start as f32 * GLYPH_WIDTH,
            0.0,
            (end - start) as f32 * GLYPH_WIDTH,
            ROW_HEIGHT
        )
    );
}

#[test]
fn clear_drops_result_and_highlight() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.click_word(&mut resolver, "corrió", t0);
    assert!(host.selection.is_some());

    resolver.clear(&mut host);
    assert!(resolver.current().is_none());
    assert!(host.selection.is_none());
}

#[test]
fn unmount_cancels_timers_and_ignores_events() {
    let mut host = TestHost::new(&[HAT]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.select(host.range_of(0, "sombrero"));
    resolver.handle(&mut host, InputEvent::SelectionChange { at: t0 });
    assert!(resolver.next_deadline().is_some());

    resolver.unmount(&mut host);
    assert!(!resolver.is_mounted());
    assert!(resolver.next_deadline().is_none());

    host.select(host.range_of(0, "sombrero"));
    assert!(resolver.poll(&mut host, after(t0, 1000)).is_none());
    resolver.handle(&mut host, InputEvent::SelectionChange { at: after(t0, 1000) });
    assert!(resolver.next_deadline().is_none());
    assert!(host
        .click_word(&mut resolver, "picos", after(t0, 2000))
        .is_none());
}

#[test]
fn new_resolution_replaces_previous_result() {
    let mut host = TestHost::new(&[STORY]);
    let mut resolver = SelectionResolver::default();
    let t0 = Instant::now();

    host.click_word(&mut resolver, "corrió", t0);
    host.click_word(&mut resolver, "Qué", after(t0, 500));

    let current = resolver.current().unwrap();
    assert_eq!(current.text, "Qué");
    assert_eq!(current.sentence, "¿Qué pasó?");
    assert_eq!(
        host.selection,
        Some(NativeSelection::from_range(host.range_of(0, "Qué")))
    );
}
