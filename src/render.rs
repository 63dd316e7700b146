use ratatui::{
    layout::Rect as CellRect,
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::layout::{CellMetrics, SurfaceLayout};
use crate::surface::{SurfaceParagraph, TextPosition, TextRange, TextSurface};
use crate::theme::Theme;

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Screen cells the text is drawn into.
    pub area: CellRect,
    pub wrap_width: usize,
    pub left_padding: usize,
    pub scroll_top: usize,
    pub metrics: CellMetrics,
    /// Native selection to paint, if any.
    pub selection: Option<TextRange>,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub total_lines: usize,
    /// Geometry of the lines visible in `area` at `scroll_top`.
    pub layout: SurfaceLayout,
}

pub fn render_surface(surface: &TextSurface, options: &RenderOptions, theme: &Theme) -> RenderResult {
    let mut renderer = Renderer::new(options, theme);
    renderer.render_surface(surface);
    renderer.finish()
}

struct Renderer<'a> {
    options: &'a RenderOptions,
    theme: &'a Theme,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
    layout: SurfaceLayout,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a RenderOptions, theme: &'a Theme) -> Self {
        Self {
            options,
            theme,
            lines: Vec::new(),
            current_line_index: 0,
            layout: SurfaceLayout::new(options.metrics.area_rect(options.area)),
        }
    }

    fn render_surface(&mut self, surface: &TextSurface) {
        for (idx, paragraph) in surface.paragraphs().iter().enumerate() {
            if idx > 0 {
                self.push_blank_line();
            }
            self.render_paragraph(idx, paragraph);
        }
    }

    fn render_paragraph(&mut self, index: usize, paragraph: &SurfaceParagraph) {
        let fragments = tokenize_paragraph(paragraph);
        let lines = wrap_fragments(&fragments, self.options.wrap_width.max(1));
        self.consume_lines(index, lines);
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::from(""));
        self.current_line_index += 1;
    }

    fn visible_row(&self) -> Option<u16> {
        let area = self.options.area;
        let relative = self.current_line_index.checked_sub(self.options.scroll_top)?;
        if relative < area.height as usize {
            Some(area.y + relative as u16)
        } else {
            None
        }
    }

    fn consume_lines(&mut self, paragraph: usize, outputs: Vec<LineOutput>) {
        for output in outputs {
            if let Some(row) = self.visible_row() {
                self.record_geometry(paragraph, &output, row);
            }
            let line = self.styled_line(paragraph, &output);
            self.lines.push(line);
            self.current_line_index += 1;
        }
    }

    fn record_geometry(&mut self, paragraph: usize, output: &LineOutput, row: u16) {
        let metrics = self.options.metrics;
        let origin = self.options.area.x + self.options.left_padding as u16;
        for glyph in &output.glyphs {
            let rect = metrics.cell_rect(origin + glyph.column as u16, row, glyph.width.max(1) as u16);
            self.layout
                .push_glyph(TextPosition::new(paragraph, glyph.offset), rect);
        }
        for token in &output.tokens {
            let rect = metrics.cell_rect(origin + token.column as u16, row, token.width.max(1) as u16);
            self.layout.push_token(
                TextRange::within_paragraph(paragraph, token.start..token.end),
                rect,
            );
        }
    }

    fn styled_line(&self, paragraph: usize, output: &LineOutput) -> Line<'static> {
        let mut spans: Vec<Span<'static>> = Vec::new();
        if self.options.left_padding > 0 {
            spans.push(Span::raw(" ".repeat(self.options.left_padding)));
        }

        let mut run = String::new();
        let mut run_selected = false;
        for glyph in &output.glyphs {
            let selected = self
                .options
                .selection
                .is_some_and(|range| range.contains(TextPosition::new(paragraph, glyph.offset)));
            if selected != run_selected && !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), self.run_style(run_selected)));
            }
            run_selected = selected;
            run.push(glyph.ch);
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, self.run_style(run_selected)));
        }
        Line::from(spans)
    }

    fn run_style(&self, selected: bool) -> Style {
        if selected {
            self.theme.selection_style()
        } else {
            self.theme.text_style()
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            total_lines,
            layout: self.layout,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PlacedGlyph {
    ch: char,
    offset: usize,
    column: usize,
    width: usize,
}

#[derive(Clone, Copy, Debug)]
struct PlacedToken {
    start: usize,
    end: usize,
    column: usize,
    width: usize,
}

#[derive(Default)]
struct LineOutput {
    glyphs: Vec<PlacedGlyph>,
    tokens: Vec<PlacedToken>,
}

#[derive(Clone)]
struct Fragment {
    chars: Vec<(char, usize)>,
    start: usize,
    kind: FragmentKind,
    width: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

fn tokenize_paragraph(paragraph: &SurfaceParagraph) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut builder: Option<TokenBuilder> = None;

    for (offset, &ch) in paragraph.chars().iter().enumerate() {
        let is_whitespace = ch.is_whitespace();
        if let Some(current) = builder.as_mut() {
            if current.kind_matches(is_whitespace) {
                current.push_char(ch);
                continue;
            }
        }
        if let Some(existing) = builder.take() {
            fragments.push(existing.finish());
        }
        let mut new_builder = TokenBuilder::new(offset, is_whitespace);
        new_builder.push_char(ch);
        builder = Some(new_builder);
    }

    if let Some(token) = builder {
        fragments.push(token.finish());
    }
    fragments
}

struct TokenBuilder {
    chars: Vec<(char, usize)>,
    start: usize,
    kind: FragmentKind,
    width: usize,
}

impl TokenBuilder {
    fn new(start: usize, is_whitespace: bool) -> Self {
        Self {
            chars: Vec::new(),
            start,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn push_char(&mut self, ch: char) {
        // Every char gets at least one cell so each offset stays hittable.
        let width = if ch.is_whitespace() {
            1
        } else {
            UnicodeWidthChar::width(ch).unwrap_or(0)
        };
        self.chars.push((ch, width));
        self.width += width;
    }

    fn finish(self) -> Fragment {
        Fragment {
            chars: self.chars,
            start: self.start,
            kind: self.kind,
            width: self.width,
        }
    }
}

fn wrap_fragments(fragments: &[Fragment], width: usize) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::default();
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment.kind {
            FragmentKind::Whitespace => {
                pending_whitespace.push(fragment.clone());
            }
            FragmentKind::Word => {
                let whitespace_width: usize =
                    pending_whitespace.iter().map(|item| item.width).sum();
                if builder.width > 0 && builder.width + whitespace_width + fragment.width > width {
                    builder.consume_pending(&mut pending_whitespace);
                    outputs.push(builder.build_line());
                    builder = LineBuilder::default();
                }
                builder.append_with_pending(fragment, &mut pending_whitespace);
            }
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

#[derive(Default)]
struct LineBuilder {
    output: LineOutput,
    width: usize,
}

impl LineBuilder {
    fn append_with_pending(&mut self, token: &Fragment, pending_whitespace: &mut Vec<Fragment>) {
        self.consume_pending(pending_whitespace);
        self.append_fragment(token);
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_fragment(&fragment);
        }
    }

    fn append_fragment(&mut self, fragment: &Fragment) {
        if fragment.kind == FragmentKind::Word {
            self.output.tokens.push(PlacedToken {
                start: fragment.start,
                end: fragment.start + fragment.chars.len(),
                column: self.width,
                width: fragment.width,
            });
        }
        for (idx, &(ch, width)) in fragment.chars.iter().enumerate() {
            self.output.glyphs.push(PlacedGlyph {
                ch,
                offset: fragment.start + idx,
                column: self.width,
                width,
            });
            self.width += width;
        }
    }

    fn build_line(self) -> LineOutput {
        self.output
    }
}
