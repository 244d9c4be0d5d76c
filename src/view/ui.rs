use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Points},
        Bar, BarChart, BarGroup, Block, Borders, Cell, List, ListItem, Paragraph, Row, Table,
    },
    Frame,
};

use super::app::App;
use super::palette::{server_color, status_color};
use crate::layout::{layout, scale, RingPoint};
use crate::state::{CellStatus, ClusterState, ServerStatus};

/// Histogram bars are sized against this many units.
pub const BAR_SCALE: f64 = 200.0;

// Ring canvas space: a 400x400 square with the ring centered.
pub const RING_CANVAS: f64 = 400.0;
pub const RING_CENTER: f64 = 200.0;
pub const RING_RADIUS: f64 = 180.0;
const RING_LABEL_LIMIT: usize = 16;

pub const TABLE_HEADER: [&str; 7] =
    ["Name", "IP", "Port", "Status", "Load Count", "vNodes", "Weight"];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(8), Constraint::Length(3)])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    match app.cell().current() {
        Some(state) => draw_body(f, state, chunks[1]),
        None => {
            let waiting = Paragraph::new("Loading load balancer data...")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(waiting, chunks[1]);
        }
    }
    draw_footer(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let updated = app
        .cell()
        .updated_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let lines = vec![
        Line::from(Span::styled(
            "Consistent Hashing Dashboard",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("LB Endpoint: ", Style::default().fg(Color::Gray)),
            Span::raw(app.endpoint().to_string()),
            Span::styled("   Updated: ", Style::default().fg(Color::Gray)),
            Span::raw(updated),
        ]),
    ];
    let header = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn draw_body(f: &mut Frame, state: &ClusterState, area: Rect) {
    let table_height = (state.servers().len() as u16).clamp(1, 10) + 3;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(table_height), Constraint::Min(6)])
        .split(area);
    draw_servers(f, state, rows[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);
    draw_histogram(f, state, charts[0]);
    draw_ring(f, state, charts[1]);
}

/// Cell text for each server, in the order of [`TABLE_HEADER`].
pub fn table_rows(state: &ClusterState) -> Vec<[String; 7]> {
    state
        .servers()
        .iter()
        .map(|s| {
            [
                s.name.clone(),
                s.ip.clone(),
                s.port.to_string(),
                s.status.to_string(),
                s.load_count.to_string(),
                s.vnode_count.to_string(),
                s.weight.to_string(),
            ]
        })
        .collect()
}

fn draw_servers(f: &mut Frame, state: &ClusterState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Servers ");
    if state.servers().is_empty() {
        f.render_widget(Paragraph::new("No servers registered yet.").block(block), area);
        return;
    }

    let header = Row::new(TABLE_HEADER)
        .style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray));
    let rows = state.servers().iter().zip(table_rows(state)).map(|(server, cells)| {
        let cells = cells.into_iter().enumerate().map(|(idx, text)| {
            let cell = Cell::from(text);
            // Status column
            if idx == 3 {
                cell.style(Style::default().fg(status_color(server.status)))
            } else {
                cell
            }
        });
        Row::new(cells)
    });
    let widths = [
        Constraint::Percentage(20),
        Constraint::Percentage(18),
        Constraint::Percentage(10),
        Constraint::Percentage(12),
        Constraint::Percentage(14),
        Constraint::Percentage(12),
        Constraint::Percentage(14),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn draw_histogram(f: &mut Frame, state: &ClusterState, area: Rect) {
    let bars: Vec<Bar> = scale(state.histogram(), BAR_SCALE)
        .into_iter()
        .map(|bar| {
            let status = state
                .server(&bar.server_ref)
                .map(|s| s.status)
                .unwrap_or(ServerStatus::Unknown);
            Bar::default()
                .label(Line::from(bar.server_ref))
                .value(bar.height.round() as u64)
                .text_value(bar.load_count.to_string())
                .style(Style::default().fg(status_color(status)))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Request Distribution "))
        .data(BarGroup::default().bars(&bars))
        .max(BAR_SCALE as u64)
        .bar_width(9)
        .bar_gap(2)
        .value_style(Style::default().fg(Color::Black).bg(Color::White));
    f.render_widget(chart, area);
}

/// Hover text of a ring point in the browser dashboard, kept as the legend.
pub fn node_tooltip(point: &RingPoint, state: &ClusterState) -> String {
    if point.explicit_angle {
        format!("{} (angle: {})", point.server_ref, point.angle_degrees)
    } else {
        match state.server(&point.server_ref) {
            Some(server) => format!("{} ({})", point.server_ref, server.weight),
            None => point.server_ref.clone(),
        }
    }
}

fn draw_ring(f: &mut Frame, state: &ClusterState, area: Rect) {
    let title = format!(" Hash Ring (vNodes: {}) ", state.ring_size());
    let block = Block::default().borders(Borders::ALL).title(title);

    let points = match layout(state.vnodes(), RING_RADIUS, RING_CENTER, RING_CENTER) {
        Ok(points) => points,
        Err(err) => {
            let msg = Paragraph::new(format!("ring unavailable: {err}"))
                .style(Style::default().fg(Color::Red))
                .block(block);
            f.render_widget(msg, area);
            return;
        }
    };

    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(block.inner(area));
    f.render_widget(block, area);

    let legend: Vec<ListItem> = points
        .iter()
        .map(|p| {
            ListItem::new(node_tooltip(p, state))
                .style(Style::default().fg(server_color(&p.server_ref)))
        })
        .collect();

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, RING_CANVAS])
        .y_bounds([0.0, RING_CANVAS])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: RING_CENTER,
                y: RING_CENTER,
                radius: RING_RADIUS,
                color: Color::Blue,
            });
            ctx.layer();
            // Canvas y grows upwards; flip so angles run clockwise like on screen.
            for p in &points {
                ctx.draw(&Points {
                    coords: &[(p.x, RING_CANVAS - p.y)],
                    color: server_color(&p.server_ref),
                });
            }
            if points.len() <= RING_LABEL_LIMIT {
                for p in &points {
                    let style = Style::default().fg(server_color(&p.server_ref));
                    ctx.print(
                        p.x,
                        RING_CANVAS - p.y,
                        Span::styled(p.server_ref.clone(), style),
                    );
                }
            }
        });
    f.render_widget(canvas, split[0]);
    f.render_widget(List::new(legend), split[1]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let cell = app.cell();
    let waiting = Style::default().fg(Color::Yellow);
    let status = match cell.status() {
        CellStatus::NoDataYet => match cell.last_failure() {
            Some(failure) => Span::styled(format!("No data yet: {failure}"), waiting),
            None => Span::styled("Loading load balancer data...", waiting),
        },
        CellStatus::Stale(failure) => Span::styled(
            format!("{failure} (showing last good snapshot)"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        CellStatus::Fresh => Span::styled(
            format!("ok, {} updates, {} failed ticks", cell.updates(), cell.failures()),
            Style::default().fg(Color::Green),
        ),
    };
    let footer = Paragraph::new(Line::from(vec![
        status,
        Span::styled("   q/Esc: quit", Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}
