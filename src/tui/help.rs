use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const KEYBINDS: &[(&str, &[(&str, &str)])] = &[
    (
        "Global:",
        &[
            ("q / Ctrl-C", "Quit"),
            ("tab", "Switch tabs"),
            ("?", "Show this help"),
        ],
    ),
    (
        "Upload:",
        &[
            ("i", "Edit script path (.pdf .fdx .fountain .txt)"),
            ("t", "Edit title"),
            ("enter", "Start analysis"),
            ("esc", "Stop editing"),
        ],
    ),
    (
        "Results:",
        &[
            ("↑/↓ j/k", "Scroll (PgUp/PgDn for pages)"),
            ("1 / 2 / 3", "Budget tier: Micro / Independent / Studio"),
            ("x", "Show all / collapse long lists"),
            ("/", "Filter scenes"),
            ("[ / ]", "Move in the narrative map"),
            ("n / b", "Open / go back in the narrative map"),
            ("e", "Export JSON to the current directory"),
            ("y", "Copy export JSON to clipboard"),
            ("u", "New analysis"),
        ],
    ),
    (
        "History tab:",
        &[
            ("↑/↓ j/k", "Navigate"),
            ("enter", "Open selected"),
            ("d", "Delete selected"),
            ("r", "Refresh"),
        ],
    ),
];

fn key_line(key: &str, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(what.to_string()),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = Vec::new();
    for (i, (section, keys)) in KEYBINDS.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(*section));
        lines.extend(keys.iter().map(|(k, w)| key_line(k, w)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Logs: ", Style::default().fg(Color::Gray)),
        Span::raw("<data dir>/script-breakdown.log"),
    ]));

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
