//! Turns taps, clicks and native selection changes into one [`SelectionResult`].
//!
//! Two modes feed the same result slot:
//!
//! * phrase mode, driven by native selection changes once they settle for the
//!   debounce window;
//! * word-tap mode, driven by clicks and by touch gestures short and still
//!   enough to count as taps.
//!
//! Nothing here ever fails loudly. A gesture that cannot be resolved leaves
//! the current result untouched and the next gesture starts from scratch.

use std::mem;
use std::time::{Duration, Instant};

use log::debug;

use crate::caret::{CaretProbe, CaretStrategy, default_strategies};
use crate::layout::{Point, Rect, SurfaceLayout};
use crate::sentence::{
    DEFAULT_PUNCTUATION, extract_sentence, has_content, strip_punctuation, token_bounds,
};
use crate::surface::{TextPosition, TextRange, TextSurface};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_TAP_MAX_DURATION: Duration = Duration::from_millis(500);
pub const DEFAULT_TAP_SLOP: f32 = 10.0;
pub const DEFAULT_TAP_DEDUP: Duration = Duration::from_millis(400);

/// Shortest phrase, in chars after trimming, that phrase mode accepts.
const MIN_PHRASE_CHARS: usize = 2;

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Quiet time after the last selection change before phrase mode runs.
    pub debounce: Duration,
    /// Touch gestures at least this long are not taps.
    pub tap_max_duration: Duration,
    /// Per-axis movement, in device-independent pixels, that breaks a tap.
    pub tap_slop: f32,
    /// Minimum spacing between two fired taps.
    pub tap_dedup: Duration,
    pub punctuation: Vec<char>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            tap_max_duration: DEFAULT_TAP_MAX_DURATION,
            tap_slop: DEFAULT_TAP_SLOP,
            tap_dedup: DEFAULT_TAP_DEDUP,
            punctuation: DEFAULT_PUNCTUATION.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectionResult {
    pub text: String,
    pub sentence: String,
    pub anchor_region: Rect,
    /// What the native highlight was set to.
    pub range: TextRange,
}

/// The host's current selection. An endpoint is `None` when it lies outside
/// the text surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeSelection {
    pub anchor: Option<TextPosition>,
    pub focus: Option<TextPosition>,
}

impl NativeSelection {
    pub fn new(anchor: Option<TextPosition>, focus: Option<TextPosition>) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed_at(position: TextPosition) -> Self {
        Self::new(Some(position), Some(position))
    }

    pub fn from_range(range: TextRange) -> Self {
        Self::new(Some(range.start), Some(range.end))
    }

    /// `None` unless both endpoints are inside the surface.
    pub fn range(&self) -> Option<TextRange> {
        Some(TextRange::new(self.anchor?, self.focus?))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// What the resolver needs from whoever renders the text.
pub trait SelectionHost {
    fn surface(&self) -> &TextSurface;
    fn layout(&self) -> &SurfaceLayout;
    fn native_selection(&self) -> Option<NativeSelection>;
    /// Replaces the native selection. `None` removes it.
    fn set_native_selection(&mut self, range: Option<TextRange>);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    TouchStart { point: Point, at: Instant },
    TouchEnd { point: Point, at: Instant },
    TouchCancel,
    Click { point: Point, at: Instant },
    SelectionChange { at: Instant },
}

#[derive(Clone, Debug)]
struct PendingGesture {
    /// Resolved at first contact; some hosts stop answering point queries
    /// reliably once their own gesture handling kicks in.
    caret: Option<TextPosition>,
    start: Point,
    started_at: Instant,
}

#[derive(Clone, Debug)]
enum ResolverState {
    Idle,
    Pending {
        gesture: PendingGesture,
        retained: Option<SelectionResult>,
    },
    Resolved(SelectionResult),
}

impl ResolverState {
    fn settled(result: Option<SelectionResult>) -> Self {
        match result {
            Some(result) => ResolverState::Resolved(result),
            None => ResolverState::Idle,
        }
    }
}

/// One resolver serves one mounted surface. Build a fresh one when the
/// surface is replaced.
#[derive(Debug)]
pub struct SelectionResolver {
    config: ResolverConfig,
    caret: CaretProbe,
    state: ResolverState,
    selection_deadline: Option<Instant>,
    last_tap_at: Option<Instant>,
    /// End of the last touch gesture, tap or not. The click a host emits
    /// after it belongs to that gesture.
    touch_ended_at: Option<Instant>,
    highlight: Option<TextRange>,
    mounted: bool,
}

impl SelectionResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    pub fn with_strategies(config: ResolverConfig, strategies: Vec<Box<dyn CaretStrategy>>) -> Self {
        Self {
            config,
            caret: CaretProbe::new(strategies),
            state: ResolverState::Idle,
            selection_deadline: None,
            last_tap_at: None,
            touch_ended_at: None,
            highlight: None,
            mounted: true,
        }
    }

    pub fn current(&self) -> Option<&SelectionResult> {
        match &self.state {
            ResolverState::Idle => None,
            ResolverState::Pending { retained, .. } => retained.as_ref(),
            ResolverState::Resolved(result) => Some(result),
        }
    }

    pub fn has_pending_gesture(&self) -> bool {
        matches!(self.state, ResolverState::Pending { .. })
    }

    /// When [`poll`](Self::poll) next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.selection_deadline
    }

    /// False once caret probing found no usable strategy.
    pub fn word_tap_available(&self) -> bool {
        self.caret.is_available()
    }

    pub fn caret_strategy(&self) -> Option<&'static str> {
        self.caret.active_strategy()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Feeds one input event. Returns the result when this event produced a
    /// new one.
    pub fn handle<H>(&mut self, host: &mut H, event: InputEvent) -> Option<SelectionResult>
    where
        H: SelectionHost + ?Sized,
    {
        if !self.mounted {
            return None;
        }
        match event {
            InputEvent::TouchStart { point, at } => {
                self.begin_gesture(host, point, at);
                None
            }
            InputEvent::TouchEnd { point, at } => self.finish_gesture(host, point, at),
            InputEvent::TouchCancel => {
                self.discard_gesture();
                None
            }
            InputEvent::Click { point, at } => self.handle_click(host, point, at),
            InputEvent::SelectionChange { at } => {
                self.selection_changed(host, at);
                None
            }
        }
    }

    /// Fires the debounced phrase resolution once its deadline has passed.
    pub fn poll<H>(&mut self, host: &mut H, now: Instant) -> Option<SelectionResult>
    where
        H: SelectionHost + ?Sized,
    {
        if !self.mounted {
            return None;
        }
        let deadline = self.selection_deadline?;
        if now < deadline {
            return None;
        }
        self.selection_deadline = None;
        self.resolve_phrase(host)
    }

    /// Drops the current result and removes the native highlight.
    pub fn clear<H>(&mut self, host: &mut H)
    where
        H: SelectionHost + ?Sized,
    {
        self.state = ResolverState::Idle;
        self.selection_deadline = None;
        self.highlight = None;
        host.set_native_selection(None);
    }

    /// Detaches from the surface: pending timers and gestures are dropped and
    /// every later event is ignored.
    pub fn unmount<H>(&mut self, host: &mut H)
    where
        H: SelectionHost + ?Sized,
    {
        self.clear(host);
        self.last_tap_at = None;
        self.touch_ended_at = None;
        self.mounted = false;
    }

    fn begin_gesture<H>(&mut self, host: &H, point: Point, at: Instant)
    where
        H: SelectionHost + ?Sized,
    {
        let caret = self.caret_at(host, point);
        let retained = self.take_result();
        self.state = ResolverState::Pending {
            gesture: PendingGesture {
                caret,
                start: point,
                started_at: at,
            },
            retained,
        };
    }

    fn finish_gesture<H>(&mut self, host: &mut H, point: Point, at: Instant) -> Option<SelectionResult>
    where
        H: SelectionHost + ?Sized,
    {
        let ResolverState::Pending { gesture, retained } =
            mem::replace(&mut self.state, ResolverState::Idle)
        else {
            return None;
        };
        self.state = ResolverState::settled(retained);
        self.touch_ended_at = Some(at);

        if !self.is_tap(&gesture, point, at) {
            debug!("touch gesture is not a tap, leaving it to native selection");
            return None;
        }
        if !self.accept_tap(host, at) {
            return None;
        }
        self.commit_word(host, gesture.caret?, gesture.start)
    }

    fn discard_gesture(&mut self) {
        if let ResolverState::Pending { retained, .. } =
            mem::replace(&mut self.state, ResolverState::Idle)
        {
            self.state = ResolverState::settled(retained);
        }
    }

    fn handle_click<H>(&mut self, host: &mut H, point: Point, at: Instant) -> Option<SelectionResult>
    where
        H: SelectionHost + ?Sized,
    {
        if !host.layout().contains_point(point) {
            return None;
        }
        if self
            .touch_ended_at
            .take()
            .is_some_and(|ended| at.saturating_duration_since(ended) < self.config.tap_dedup)
        {
            debug!("click follows a touch gesture, already classified");
            return None;
        }
        if !self.accept_tap(host, at) {
            return None;
        }
        let caret = self.caret_at(host, point)?;
        self.commit_word(host, caret, point)
    }

    /// Applies the drag tie-break and the dedup window. Records the tap when
    /// it goes through.
    fn accept_tap<H>(&mut self, host: &H, at: Instant) -> bool
    where
        H: SelectionHost + ?Sized,
    {
        if self.user_selection_active(host) {
            debug!("tap ignored, a native selection is active");
            return false;
        }
        if self
            .last_tap_at
            .is_some_and(|last| at.saturating_duration_since(last) < self.config.tap_dedup)
        {
            debug!("tap ignored, within dedup window");
            return false;
        }
        self.last_tap_at = Some(at);
        true
    }

    fn is_tap(&self, gesture: &PendingGesture, end: Point, at: Instant) -> bool {
        let elapsed = at.saturating_duration_since(gesture.started_at);
        elapsed < self.config.tap_max_duration
            && (end.x - gesture.start.x).abs() < self.config.tap_slop
            && (end.y - gesture.start.y).abs() < self.config.tap_slop
    }

    fn caret_at<H>(&mut self, host: &H, point: Point) -> Option<TextPosition>
    where
        H: SelectionHost + ?Sized,
    {
        let layout = host.layout();
        if !layout.contains_point(point) {
            return None;
        }
        self.caret.caret_from_point(layout, point)
    }

    fn selection_changed<H>(&mut self, host: &H, at: Instant)
    where
        H: SelectionHost + ?Sized,
    {
        self.selection_deadline = Some(at + self.config.debounce);
        if self.has_pending_gesture() && self.user_selection_active(host) {
            debug!("native selection grew, dropping pending tap");
            self.discard_gesture();
        }
    }

    /// A non-trivial native selection the user made, as opposed to the
    /// highlight this resolver committed.
    fn user_selection_active<H>(&self, host: &H) -> bool
    where
        H: SelectionHost + ?Sized,
    {
        let Some(selection) = host.native_selection() else {
            return false;
        };
        let Some(range) = selection.range() else {
            return !selection.is_collapsed();
        };
        if self.highlight == Some(range) {
            return false;
        }
        host.surface().text_in_range(range).trim().chars().count() > 1
    }

    fn resolve_phrase<H>(&mut self, host: &mut H) -> Option<SelectionResult>
    where
        H: SelectionHost + ?Sized,
    {
        let selection = host.native_selection()?;
        let Some(range) = selection.range() else {
            debug!("selection leaves the text surface, ignoring");
            return None;
        };
        if range.is_collapsed() || self.highlight == Some(range) {
            return None;
        }
        let surface = host.surface();
        if !surface.contains(range.start) || !surface.contains(range.end) {
            return None;
        }
        let trimmed = surface.trim_range(range)?;
        let text = surface.text_in_range(trimmed);
        if text.chars().count() < MIN_PHRASE_CHARS || !has_content(&text, &self.config.punctuation)
        {
            return None;
        }
        if self.current().is_some_and(|current| current.range == trimmed) {
            return None;
        }
        let paragraph = surface.paragraph(trimmed.start.paragraph)?;
        let sentence = extract_sentence(paragraph.chars(), trimmed.start.offset);
        let anchor_region = host.layout().range_bounds(range).unwrap_or_default();

        debug!("phrase resolved: {text:?}");
        Some(self.commit(
            host,
            SelectionResult {
                text,
                sentence,
                anchor_region,
                range: trimmed,
            },
        ))
    }

    fn commit_word<H>(&mut self, host: &mut H, caret: TextPosition, point: Point) -> Option<SelectionResult>
    where
        H: SelectionHost + ?Sized,
    {
        let paragraph = host.surface().paragraph(caret.paragraph)?;
        let chars = paragraph.chars();
        let token = token_bounds(chars, caret.offset);
        let word = strip_punctuation(chars, token, &self.config.punctuation);
        let text: String = chars[word.clone()].iter().collect();
        if !has_content(&text, &self.config.punctuation) {
            debug!("tapped token is only punctuation");
            return None;
        }
        let sentence = extract_sentence(chars, word.start);
        let range = TextRange::within_paragraph(caret.paragraph, word);
        let anchor_region = host
            .layout()
            .range_bounds(range)
            .unwrap_or(Rect::new(point.x, point.y, 0.0, 0.0));

        debug!("word resolved: {text:?}");
        Some(self.commit(
            host,
            SelectionResult {
                text,
                sentence,
                anchor_region,
                range,
            },
        ))
    }

    fn commit<H>(&mut self, host: &mut H, result: SelectionResult) -> SelectionResult
    where
        H: SelectionHost + ?Sized,
    {
        host.set_native_selection(Some(result.range));
        self.highlight = Some(result.range);
        self.selection_deadline = None;
        self.state = ResolverState::Resolved(result.clone());
        result
    }

    fn take_result(&mut self) -> Option<SelectionResult> {
        match mem::replace(&mut self.state, ResolverState::Idle) {
            ResolverState::Idle => None,
            ResolverState::Pending { retained, .. } => retained,
            ResolverState::Resolved(result) => Some(result),
        }
    }
}

impl Default for SelectionResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
