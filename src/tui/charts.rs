use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, LineGauge, Paragraph},
    Frame,
};

use crate::model::{GenreAnalysis, ScriptAnalysis, ThreeActStructure};
use crate::panels::{act_percentages, scale_position, tone_scales};

const ACT_COLORS: [Color; 3] = [Color::Cyan, Color::Magenta, Color::Yellow];
const ACT_NAMES: [&str; 3] = ["I", "II", "III"];

/// Split `width` cells between the three acts in proportion to their percentages.
/// The widths always add up to `width`; rounding slack goes to act two.
pub fn act_segment_widths(pcts: [f64; 3], width: u16) -> [u16; 3] {
    let total: f64 = pcts.iter().sum();
    if total <= 0.0 || width == 0 {
        return [0, width, 0];
    }
    let scaled = |p: f64| ((p / total) * width as f64).round() as u16;
    let one = scaled(pcts[0]).min(width);
    let three = scaled(pcts[2]).min(width - one);
    [one, width - one - three, three]
}

fn act_strip(pcts: [f64; 3], width: u16) -> Line<'static> {
    let widths = act_segment_widths(pcts, width);
    let spans = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let label = format!("{} {}%", ACT_NAMES[i], pcts[i].round());
            let w = *w as usize;
            let text = if label.chars().count() <= w {
                format!("{label:^w$}")
            } else {
                " ".repeat(w)
            };
            Span::styled(
                text,
                Style::default()
                    .bg(ACT_COLORS[i])
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

/// Three-act proportions: a strip across the top and a bar per act.
pub fn draw_structure(f: &mut Frame, area: Rect, structure: &ThreeActStructure) {
    let block = Block::default().borders(Borders::ALL).title("Structure");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)].as_ref())
        .split(inner);

    let pcts = act_percentages(structure);
    f.render_widget(Paragraph::new(act_strip(pcts, rows[0].width)), rows[0]);

    let bars: Vec<Bar> = pcts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Bar::default()
                .value(p.round() as u64)
                .label(Line::from(format!("Act {}", ACT_NAMES[i])))
                .text_value(format!("{}%", p.round()))
                .style(Style::default().fg(ACT_COLORS[i]))
        })
        .collect();
    let bar_width = (rows[1].width.saturating_sub(2) / 3).clamp(1, 12);
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(100);
    f.render_widget(chart, rows[1]);
}

/// Confidence gauge plus one line gauge per tone scale.
pub fn draw_tone(f: &mut Frame, area: Rect, genre: &GenreAnalysis) {
    let block = Block::default().borders(Borders::ALL).title("Tone");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let scales = tone_scales(genre);
    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(scales.iter().map(|_| Constraint::Length(2)));
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let confidence = genre.confidence.unwrap_or(0.0).clamp(0.0, 100.0);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .label(format!("confidence {}%", confidence.round()))
        .ratio(confidence / 100.0);
    f.render_widget(gauge, rows[0]);

    for (i, (label, value, left, right)) in scales.iter().enumerate() {
        let pos = scale_position(value);
        let g = LineGauge::default()
            .label(Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().fg(Color::Gray)),
                Span::raw(value.to_string()),
                Span::styled(format!("  ({left} → {right})"), Style::default().fg(Color::DarkGray)),
            ]))
            .filled_style(Style::default().fg(Color::Magenta))
            .line_set(symbols::line::THICK)
            .ratio(pos as f64 / 100.0);
        f.render_widget(g, rows[i + 1]);
    }
}

/// Side column next to the results: only what the record actually has.
pub fn draw_sidebar(f: &mut Frame, area: Rect, a: &ScriptAnalysis) {
    let structure = a.three_act_structure.as_ref();
    let genre = a
        .genre_analysis
        .as_ref()
        .filter(|g| g.primary_genre.as_deref().is_some_and(|s| !s.trim().is_empty()));

    match (structure, genre) {
        (Some(s), Some(g)) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(10), Constraint::Min(4)].as_ref())
                .split(area);
            draw_structure(f, rows[0], s);
            draw_tone(f, rows[1], g);
        }
        (Some(s), None) => draw_structure(f, area, s),
        (None, Some(g)) => draw_tone(f, area, g),
        (None, None) => {
            let p = Paragraph::new(Line::from(Span::styled(
                "No structure or tone data",
                Style::default().fg(Color::DarkGray),
            )))
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, area);
        }
    }
}
