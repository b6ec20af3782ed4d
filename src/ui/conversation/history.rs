//! Transcript display component

use crate::controller::TranscriptEntry;
use crate::events::ConversationRole;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Renders the transcript bottom-aligned, `scroll` lines up from the end.
pub struct ConversationHistory<'a> {
    entries: &'a [TranscriptEntry],
    scroll: usize,
    tick: u64,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(entries: &'a [TranscriptEntry], scroll: usize, tick: u64) -> Self {
        Self { entries, scroll, tick }
    }

    /// All lines of the transcript wrapped to `width`
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for entry in self.entries {
            all_lines.extend(self.render_entry(entry, width));
            all_lines.push(Line::default());
        }
        all_lines
    }

    fn render_entry(&self, entry: &TranscriptEntry, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let (icon, color) = match entry.role {
            ConversationRole::User => ("👤", Color::Blue),
            ConversationRole::Assistant => ("🍲", Color::Green),
        };
        let timestamp = entry.timestamp.format("%H:%M").to_string();
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {} ", icon, entry.role.display_name()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        ]));

        if entry.loading {
            let dots = match self.tick % 4 {
                0 => "   ",
                1 => ".  ",
                2 => ".. ",
                _ => "...",
            };
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("thinking{}", dots), Style::default().fg(Color::Yellow)),
            ]));
            return lines;
        }

        let content_width = width.saturating_sub(2) as usize;
        for line in &entry.rendered {
            for wrapped in wrap_line(line, content_width) {
                let mut spans = vec![Span::raw("  ")];
                spans.extend(wrapped.spans);
                lines.push(Line::from(spans));
            }
        }

        lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 ChatBite");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let end = all_lines.len().saturating_sub(self.scroll.min(max_scroll(all_lines.len(), height)));
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Largest useful scroll offset for `total` lines in a view of `height`
pub fn max_scroll(total: usize, height: usize) -> usize {
    total.saturating_sub(height)
}

/// Word-wrap a styled line to `width` columns, keeping span styles.
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line.clone()];
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for span in &line.spans {
        for word in split_keeping_spaces(&span.content) {
            let word_width = word.width();
            if current_width + word_width > width && current_width > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
                current_width = 0;
                if word.trim().is_empty() {
                    continue;
                }
            }

            // A single word wider than the view is hard-split.
            let mut rest: String = word;
            while rest.width() > width {
                let (head, tail) = split_at_width(&rest, width);
                rest = tail;
                lines.push(Line::from(Span::styled(head, span.style)));
            }
            current_width += rest.width();
            current.push(Span::styled(rest, span.style));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

/// Split off the longest prefix fitting in `width` columns, at least one char.
fn split_at_width(text: &str, width: usize) -> (String, String) {
    let mut used = 0;
    let mut split = text.len();
    for (index, c) in text.char_indices() {
        let char_width = c.width().unwrap_or(0);
        if used + char_width > width && index > 0 {
            split = index;
            break;
        }
        used += char_width;
    }
    (text[..split].to_string(), text[split..].to_string())
}

/// Split into alternating runs of non-space and space characters
fn split_keeping_spaces(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_space = None;

    for c in text.chars() {
        let is_space = c == ' ';
        if in_space.is_some_and(|prev| prev != is_space) {
            parts.push(std::mem::take(&mut current));
        }
        in_space = Some(is_space);
        current.push(c);
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
