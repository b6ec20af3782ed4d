//! Turning raw reply text into terminal lines

use crate::config::Config;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Markdown source → styled lines
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> Vec<Line<'static>>;
}

/// Styled lines → lines safe to hand to the terminal
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, lines: Vec<Line<'static>>) -> Vec<Line<'static>>;
}

/// Rendering pipeline used for every transcript entry.
///
/// Displayed form is `sanitize(render(raw))`. When either stage is missing the
/// raw text is shown literally, line by line, and control characters are
/// still stripped.
pub struct Renderer {
    markdown: Option<Box<dyn MarkdownRenderer>>,
    sanitizer: Option<Box<dyn Sanitizer>>,
}

impl Renderer {
    pub fn new(
        markdown: Option<Box<dyn MarkdownRenderer>>,
        sanitizer: Option<Box<dyn Sanitizer>>,
    ) -> Self {
        Self { markdown, sanitizer }
    }

    /// Markdown rendering with control-character stripping.
    pub fn terminal() -> Self {
        Self::new(
            Some(Box::new(TerminalMarkdown)),
            Some(Box::new(ControlCharSanitizer)),
        )
    }

    /// Literal text only.
    pub fn plain() -> Self {
        Self::new(None, None)
    }

    pub fn from_config(config: &Config) -> Self {
        if config.render_markdown {
            Self::terminal()
        } else {
            Self::plain()
        }
    }

    pub fn render(&self, raw: &str) -> Vec<Line<'static>> {
        match (&self.markdown, &self.sanitizer) {
            (Some(markdown), Some(sanitizer)) => sanitizer.sanitize(markdown.render(raw)),
            (None, Some(sanitizer)) => sanitizer.sanitize(literal_lines(raw)),
            _ => ControlCharSanitizer.sanitize(literal_lines(raw)),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::terminal()
    }
}

/// Raw text split into unstyled lines
pub fn literal_lines(raw: &str) -> Vec<Line<'static>> {
    let lines: Vec<Line<'static>> = raw.lines().map(|line| Line::from(line.to_string())).collect();
    if lines.is_empty() {
        vec![Line::default()]
    } else {
        lines
    }
}

/// Flatten rendered lines back to text, dropping styling
pub fn lines_to_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Small markdown subset suited to recipes: headings, lists, emphasis, inline
/// code, fenced code, quotes and rules.
pub struct TerminalMarkdown;

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, source: &str) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let mut in_fence = false;

        for raw_line in source.lines() {
            let trimmed = raw_line.trim_start();

            if trimmed.starts_with("```") {
                in_fence = !in_fence;
                continue;
            }

            if in_fence {
                lines.push(Line::from(Span::styled(
                    format!("  {}", raw_line),
                    Style::default().fg(Color::Yellow),
                )));
                continue;
            }

            lines.push(render_block_line(raw_line, trimmed));
        }

        if lines.is_empty() {
            lines.push(Line::default());
        }
        lines
    }
}

fn render_block_line(raw_line: &str, trimmed: &str) -> Line<'static> {
    if trimmed.is_empty() {
        return Line::default();
    }

    if is_rule(trimmed) {
        return Line::from(Span::styled(
            "─".repeat(24),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some((level, text)) = heading(trimmed) {
        let mut style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        if level == 1 {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        return Line::from(parse_inline(text, style));
    }

    if let Some(text) = trimmed.strip_prefix("> ") {
        let mut spans = vec![Span::styled("│ ", Style::default().fg(Color::DarkGray))];
        spans.extend(parse_inline(text, Style::default().add_modifier(Modifier::ITALIC)));
        return Line::from(spans);
    }

    let indent = " ".repeat(raw_line.len() - trimmed.len());

    if let Some(text) = bullet(trimmed) {
        let mut spans = vec![Span::styled(
            format!("{}• ", indent),
            Style::default().fg(Color::Green),
        )];
        spans.extend(parse_inline(text, Style::default()));
        return Line::from(spans);
    }

    if let Some((number, text)) = numbered(trimmed) {
        let mut spans = vec![Span::styled(
            format!("{}{}. ", indent, number),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )];
        spans.extend(parse_inline(text, Style::default()));
        return Line::from(spans);
    }

    let mut spans = Vec::new();
    if !indent.is_empty() {
        spans.push(Span::raw(indent));
    }
    spans.extend(parse_inline(trimmed, Style::default()));
    Line::from(spans)
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && (compact.chars().all(|c| c == '-')
            || compact.chars().all(|c| c == '*')
            || compact.chars().all(|c| c == '_'))
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level, rest));
    }
    rest.strip_prefix(' ').map(|text| (level, text.trim()))
}

fn bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
}

fn numbered(line: &str) -> Option<(&str, &str)> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let text = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))?;
    Some((&line[..digits], text))
}

fn find_marker(chars: &[char], from: usize, marker: &[char]) -> Option<usize> {
    if marker.is_empty() || chars.len() < marker.len() {
        return None;
    }
    (from..=chars.len() - marker.len()).find(|&i| chars[i..i + marker.len()] == *marker)
}

/// Parse `**bold**`, `*italic*` / `_italic_` and `` `code` `` into spans
fn parse_inline(text: &str, base: Style) -> Vec<Span<'static>> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    let flush = |current: &mut String, spans: &mut Vec<Span<'static>>| {
        if !current.is_empty() {
            spans.push(Span::styled(std::mem::take(current), base));
        }
    };

    while i < chars.len() {
        let c = chars[i];

        if c == '`' {
            if let Some(close) = find_marker(&chars, i + 1, &['`']) {
                if close > i + 1 {
                    flush(&mut current, &mut spans);
                    let code: String = chars[i + 1..close].iter().collect();
                    spans.push(Span::styled(code, base.fg(Color::Yellow)));
                    i = close + 1;
                    continue;
                }
            }
        } else if c == '*' && chars.get(i + 1) == Some(&'*') {
            if let Some(close) = find_marker(&chars, i + 2, &['*', '*']) {
                if close > i + 2 {
                    flush(&mut current, &mut spans);
                    let inner: String = chars[i + 2..close].iter().collect();
                    spans.extend(parse_inline(&inner, base.add_modifier(Modifier::BOLD)));
                    i = close + 2;
                    continue;
                }
            }
        } else if c == '*' || (c == '_' && (i == 0 || !chars[i - 1].is_alphanumeric())) {
            let opens = chars.get(i + 1).is_some_and(|next| !next.is_whitespace());
            if opens {
                if let Some(close) = find_marker(&chars, i + 1, &[c]) {
                    let closes_word = c != '_'
                        || chars.get(close + 1).map_or(true, |next| !next.is_alphanumeric());
                    if close > i + 1 && closes_word {
                        flush(&mut current, &mut spans);
                        let inner: String = chars[i + 1..close].iter().collect();
                        spans.push(Span::styled(inner, base.add_modifier(Modifier::ITALIC)));
                        i = close + 1;
                        continue;
                    }
                }
            }
        }

        current.push(c);
        i += 1;
    }

    flush(&mut current, &mut spans);
    spans
}

/// Strips terminal control characters so replies cannot emit escape sequences.
pub struct ControlCharSanitizer;

impl ControlCharSanitizer {
    fn clean(text: &str) -> String {
        let mut cleaned = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\t' => cleaned.push_str("    "),
                c if c.is_control() => {}
                c => cleaned.push(c),
            }
        }
        cleaned
    }
}

impl Sanitizer for ControlCharSanitizer {
    fn sanitize(&self, mut lines: Vec<Line<'static>>) -> Vec<Line<'static>> {
        for line in lines.iter_mut() {
            for span in line.spans.iter_mut() {
                if span.content.chars().any(|c| c.is_control()) {
                    span.content = Self::clean(&span.content).into();
                }
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn bold_and_italic_become_modifiers() {
        let spans = parse_inline("Add **garam masala** and *stir*", Style::default());
        let bold = spans.iter().find(|s| s.content == "garam masala").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let italic = spans.iter().find(|s| s.content == "stir").unwrap();
        assert!(italic.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn unclosed_markers_stay_literal() {
        let spans = parse_inline("2 * 3 **oops", Style::default());
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "2 * 3 **oops");
    }

    #[test]
    fn snake_case_is_not_italic() {
        let spans = parse_inline("use garam_masala_powder", Style::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "use garam_masala_powder");
    }

    #[test]
    fn block_structure_is_rendered() {
        let source = "# Chicken Fried Rice\n\n- 1 cup rice\n2. Fry the rice\n---\n```\nraw *text*\n```";
        let lines = TerminalMarkdown.render(source);
        let texts: Vec<String> = lines.iter().map(text_of).collect();

        assert_eq!(texts[0], "Chicken Fried Rice");
        assert_eq!(texts[1], "");
        assert_eq!(texts[2], "• 1 cup rice");
        assert_eq!(texts[3], "2. Fry the rice");
        assert!(texts[4].starts_with('─'));
        assert_eq!(texts[5], "  raw *text*");
        assert_eq!(texts.len(), 6);
    }

    #[test]
    fn sanitizer_strips_escape_sequences() {
        let lines = vec![Line::from("safe\u{1b}[2Jtext\tend")];
        let cleaned = ControlCharSanitizer.sanitize(lines);
        assert_eq!(text_of(&cleaned[0]), "safe[2Jtext    end");
    }

    #[test]
    fn pipeline_sanitizes_rendered_markdown() {
        let renderer = Renderer::terminal();
        let lines = renderer.render("**hot\u{7}** pan");
        assert_eq!(lines_to_text(&lines), "hot pan");
    }

    #[test]
    fn missing_collaborators_fall_back_to_literal_text() {
        let renderer = Renderer::new(Some(Box::new(TerminalMarkdown)), None);
        let lines = renderer.render("# Title\n**bold**");
        assert_eq!(lines_to_text(&lines), "# Title\n**bold**");

        let plain = Renderer::plain();
        assert_eq!(plain.render("").len(), 1);
    }

    #[test]
    fn literal_fallback_still_strips_escapes() {
        let text = lines_to_text(&Renderer::plain().render("safe\u{1b}[2Jboom\n**kept**"));
        assert!(!text.contains('\u{1b}'));
        assert_eq!(text, "safe[2Jboom\n**kept**");

        let half = Renderer::new(Some(Box::new(TerminalMarkdown)), None);
        assert!(!lines_to_text(&half.render("a\u{1b}[2Jb")).contains('\u{1b}'));
    }
}
