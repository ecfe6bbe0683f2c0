use binroute_core::{
    dispatch::task_message,
    model::{Coordinates, RouteColor, RouteOutcome, VanAssignment, VanRoute},
    service::CycleSnapshot,
};
use chrono::Local;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs,
        Wrap,
        canvas::{Canvas, Line as CanvasLine, Points},
    },
};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: tabs, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let tabs = Tabs::new(Screen::ALL.iter().map(|screen| screen.title()))
        .select(app.screen.position())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(header_title(app)),
        );
    frame.render_widget(tabs, *header_area);

    match &app.snapshot {
        None => {
            let text = if app.is_loading {
                "Fetching bins and vans…"
            } else {
                "No data yet. Press r to fetch."
            };
            let paragraph = Paragraph::new(text)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(app.screen.title()),
                )
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, *content_area);
        }
        Some(snapshot) => match app.screen {
            Screen::Bins => draw_bins(frame, app, snapshot, *content_area),
            Screen::Map => draw_map(frame, snapshot, *content_area),
            Screen::Routes => draw_routes(frame, snapshot, *content_area),
            Screen::Analytics => draw_analytics(frame, snapshot, *content_area),
            Screen::Dispatch => draw_dispatch(frame, app, snapshot, *content_area),
        },
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::Bins => "Tab/Shift-Tab switch · ↑/↓ move · r refresh · q/Ctrl-C quit",
        Screen::Map | Screen::Routes | Screen::Analytics => {
            "Tab/Shift-Tab switch · r refresh · q/Ctrl-C quit"
        }
        Screen::Dispatch => {
            "↑/↓ bin · w next worker · Enter send task · Tab/Shift-Tab switch · q/Ctrl-C quit"
        }
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else if let Some(msg) = &app.status_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else if app.status_message.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn header_title(app: &App) -> String {
    let sms = if app.service.notifications_enabled() {
        "on"
    } else {
        "off"
    };
    let updated = app.snapshot.as_ref().map_or_else(
        || "never".to_owned(),
        |snapshot| {
            snapshot
                .fetched_at
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string()
        },
    );
    format!(
        "binroute · {} · strategy {} · updated {updated} · SMS {sms}",
        app.service.source(),
        app.service.strategy()
    )
}

fn draw_bins(frame: &mut Frame<'_>, app: &App, snapshot: &CycleSnapshot, area: Rect) {
    let issues_height = if snapshot.issues.is_empty() {
        0
    } else {
        u16::try_from(snapshot.issues.len().min(6))
            .unwrap_or(6)
            .saturating_add(2)
    };

    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(issues_height)])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [table_area, issues_area] = chunks else {
        return;
    };

    let rows = snapshot.bins.iter().enumerate().map(|(rank, scored)| {
        let telemetry = &scored.bin.telemetry;
        let (van_label, van_style) = match snapshot.van_for(&scored.bin.id) {
            VanAssignment::Assigned(van) => (van.to_string(), Style::default()),
            VanAssignment::Unassigned => ("unassigned".to_owned(), Style::default().fg(Color::Red)),
        };

        Row::new(vec![
            Cell::from((rank + 1).to_string()),
            Cell::from(scored.bin.id.to_string()),
            Cell::from(format!("{:.1}", telemetry.fill_level)),
            Cell::from(format!("{:.2}", telemetry.tilt)),
            Cell::from(format!("{:.1}", telemetry.temperature)),
            Cell::from(format!("{:.1}", telemetry.humidity)),
            Cell::from(format!("{:.2}", scored.priority)).style(priority_style(scored.priority)),
            Cell::from(van_label).style(van_style),
        ])
    });

    let column_widths = [
        Constraint::Length(4),
        Constraint::Min(10),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(9),
        Constraint::Length(12),
    ];

    let title = format!(
        "Bins by priority ({} bins, {} unassigned)",
        snapshot.bins.len(),
        snapshot.analytics.unassigned
    );

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec![
                "#", "Bin", "Fill %", "Tilt", "Temp °C", "Humidity %", "Priority", "Van",
            ])
            .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .column_spacing(1);

    let mut state = TableState::default();
    if !snapshot.bins.is_empty() {
        state.select(Some(app.bin_list_index));
    }
    frame.render_stateful_widget(table, *table_area, &mut state);

    if !snapshot.issues.is_empty() {
        let items = snapshot
            .issues
            .iter()
            .map(|issue| ListItem::new(issue.to_string()))
            .collect::<Vec<ListItem<'_>>>();
        let list = List::new(items)
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Skipped records ({})",
                snapshot.issues.len()
            )));
        frame.render_widget(list, *issues_area);
    }
}

fn draw_map(frame: &mut Frame<'_>, snapshot: &CycleSnapshot, area: Rect) {
    let (x_bounds, y_bounds) = map_bounds(snapshot);

    let (assigned, unassigned): (Vec<_>, Vec<_>) = snapshot
        .bins
        .iter()
        .partition(|scored| !snapshot.van_for(&scored.bin.id).is_unassigned());
    let assigned_points = plot_points(assigned.iter().map(|scored| scored.bin.location));
    let unassigned_points = plot_points(unassigned.iter().map(|scored| scored.bin.location));

    let failed = snapshot
        .failed_routes()
        .map(|(route, _)| route.van.to_string())
        .collect::<Vec<_>>();
    let title = if failed.is_empty() {
        "Map (bins white, unassigned red)".to_owned()
    } else {
        format!(
            "Map (bins white, unassigned red) · no route for {}",
            failed.join(", ")
        )
    };

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for route in &snapshot.routes {
                let color = route_color(route.color);
                for pair in polyline(route).windows(2) {
                    if let [from, to] = pair {
                        ctx.draw(&CanvasLine {
                            x1: from.longitude,
                            y1: from.latitude,
                            x2: to.longitude,
                            y2: to.latitude,
                            color,
                        });
                    }
                }
            }
            ctx.layer();
            ctx.draw(&Points {
                coords: &assigned_points,
                color: Color::White,
            });
            ctx.draw(&Points {
                coords: &unassigned_points,
                color: Color::Red,
            });
            for route in &snapshot.routes {
                ctx.print(
                    route.origin.longitude,
                    route.origin.latitude,
                    Span::styled(
                        format!("▲{}", route.van),
                        Style::default().fg(route_color(route.color)),
                    ),
                );
            }
        });

    frame.render_widget(canvas, area);
}

fn draw_routes(frame: &mut Frame<'_>, snapshot: &CycleSnapshot, area: Rect) {
    let mut items = snapshot
        .routes
        .iter()
        .map(|route| {
            let marker = Span::styled(
                format!("■ {:<8}", route.van.to_string()),
                Style::default().fg(route_color(route.color)),
            );
            let detail = match &route.outcome {
                RouteOutcome::Routed(planned) => {
                    let stops = planned
                        .stops
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" → ");
                    Span::raw(format!("{} stops: {stops}", planned.stops.len()))
                }
                RouteOutcome::Idle => Span::styled(
                    "idle, no bins assigned",
                    Style::default().fg(Color::DarkGray),
                ),
                RouteOutcome::Failed(reason) => Span::styled(
                    format!("route failed: {reason}"),
                    Style::default().fg(Color::Red),
                ),
            };
            ListItem::new(Line::from(vec![marker, detail]))
        })
        .collect::<Vec<ListItem<'_>>>();

    let unassigned = snapshot
        .assignment
        .unassigned()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if !unassigned.is_empty() {
        items.push(ListItem::new(Span::styled(
            format!("Unassigned bins: {}", unassigned.join(", ")),
            Style::default().fg(Color::Red),
        )));
    }

    if items.is_empty() {
        items.push(ListItem::new("No vans reported."));
    }

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Routes in visiting order"),
    );
    frame.render_widget(list, area);
}

fn draw_analytics(frame: &mut Frame<'_>, snapshot: &CycleSnapshot, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [summary_area, tables_area] = chunks else {
        return;
    };

    let analytics = &snapshot.analytics;
    let average_carbon = analytics
        .average_carbon_kg
        .map_or_else(|| "n/a".to_owned(), |carbon| format!("{carbon:.2} kg"));
    let summary = vec![
        Line::from(format!(
            "Bins: {} ({} records skipped) · Vans: {}",
            snapshot.bins.len(),
            snapshot.issues.len(),
            snapshot.vans.len()
        )),
        Line::from(format!("Total waste: {:.1} % fill", analytics.total_fill)),
        Line::from(format!("Average carbon footprint: {average_carbon}")),
        Line::from(format!("Unassigned bins: {}", analytics.unassigned)),
        Line::from(format!(
            "Failed routes: {}",
            snapshot.failed_routes().count()
        )),
    ];
    let paragraph = Paragraph::new(summary)
        .block(Block::default().borders(Borders::ALL).title("Summary"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, *summary_area);

    let table_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(*tables_area);

    let columns = table_chunks.as_ref();
    let [loads_area, impact_area] = columns else {
        return;
    };

    let load_rows = analytics.van_loads.iter().map(|load| {
        Row::new(vec![
            Cell::from(load.van.to_string()),
            Cell::from(load.bins.to_string()),
            Cell::from(format!("{:.1}", load.total_fill)),
        ])
    });
    let loads = Table::new(
        load_rows,
        [
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Van", "Bins", "Fill %"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Load per van"))
    .column_spacing(1);
    frame.render_widget(loads, *loads_area);

    let impact_rows = analytics.per_bin.iter().map(|impact| {
        Row::new(vec![
            Cell::from(impact.bin.to_string()),
            Cell::from(format!("{:.1}", impact.fill_level)),
            Cell::from(format!("{:.2}", impact.carbon_kg)),
        ])
    });
    let impact = Table::new(
        impact_rows,
        [
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["Bin", "Fill %", "Carbon kg"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Carbon footprint per bin"),
    )
    .column_spacing(1);
    frame.render_widget(impact, *impact_area);
}

fn draw_dispatch(frame: &mut Frame<'_>, app: &App, snapshot: &CycleSnapshot, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [bins_area, side_area] = chunks else {
        return;
    };

    let bin_items = snapshot
        .bins
        .iter()
        .map(|scored| {
            let van = snapshot.van_for(&scored.bin.id);
            ListItem::new(format!(
                "{:<10} fill {:>5.1}%  priority {:>6.2}  {van}",
                scored.bin.id.to_string(),
                scored.bin.telemetry.fill_level,
                scored.priority
            ))
        })
        .collect::<Vec<ListItem<'_>>>();

    let bins = List::new(bin_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Bin (↑/↓)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut bin_state = ListState::default();
    if !snapshot.bins.is_empty() {
        bin_state.select(Some(app.bin_list_index));
    }
    frame.render_stateful_widget(bins, *bins_area, &mut bin_state);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)])
        .split(*side_area);

    let rows = side_chunks.as_ref();
    let [workers_area, preview_area] = rows else {
        return;
    };

    let worker_items = if app.workers.is_empty() {
        vec![ListItem::new(
            "No field workers configured. Set BINROUTE_WORKERS_FILE.",
        )]
    } else {
        app.workers
            .iter()
            .map(|worker| {
                ListItem::new(format!(
                    "{} · {} · {} zone",
                    worker.id, worker.name, worker.zone
                ))
            })
            .collect()
    };

    let workers = List::new(worker_items)
        .block(Block::default().borders(Borders::ALL).title("Worker (w)"))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut worker_state = ListState::default();
    if !app.workers.is_empty() {
        worker_state.select(Some(app.worker_index));
    }
    frame.render_stateful_widget(workers, *workers_area, &mut worker_state);

    let preview = if app.service.notifications_enabled() {
        match (app.selected_bin(), app.selected_worker()) {
            (Some(scored), Some(worker)) => Text::from(vec![
                Line::from(format!("To {} ({})", worker.name, worker.phone)),
                Line::from(task_message(scored, &snapshot.van_for(&scored.bin.id))),
            ]),
            _ => Text::from("Pick a bin and a worker."),
        }
    } else {
        Text::from("SMS is disabled. Set the TWILIO_* variables to send tasks.")
            .style(Style::default().fg(Color::DarkGray))
    };

    let paragraph = Paragraph::new(preview)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Message (Enter to send)"),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, *preview_area);
}

// a tipped bin alone scores 3, a full upright one about 2.5
fn priority_style(priority: f64) -> Style {
    if priority >= 3.0 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if priority >= 2.0 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    }
}

fn route_color(color: RouteColor) -> Color {
    match color {
        RouteColor::Blue => Color::Blue,
        RouteColor::Red => Color::Red,
        RouteColor::Green => Color::Green,
        RouteColor::Purple => Color::Magenta,
        RouteColor::Orange => Color::Rgb(255, 165, 0),
        RouteColor::DarkBlue => Color::Rgb(30, 60, 180),
        RouteColor::DarkRed => Color::Rgb(139, 0, 0),
        RouteColor::DarkGreen => Color::Rgb(0, 100, 0),
    }
}

fn polyline(route: &VanRoute) -> &[Coordinates] {
    match &route.outcome {
        RouteOutcome::Routed(planned) => &planned.polyline,
        RouteOutcome::Idle | RouteOutcome::Failed(_) => &[],
    }
}

// canvas points are (x, y) = (longitude, latitude)
fn plot_points(locations: impl Iterator<Item = Coordinates>) -> Vec<(f64, f64)> {
    locations
        .map(|location| (location.longitude, location.latitude))
        .collect()
}

/// Longitude and latitude bounds covering every bin, van and polyline point.
fn map_bounds(snapshot: &CycleSnapshot) -> ([f64; 2], [f64; 2]) {
    let points = snapshot
        .bins
        .iter()
        .map(|scored| scored.bin.location)
        .chain(snapshot.vans.iter().map(|van| van.location))
        .chain(
            snapshot
                .routes
                .iter()
                .flat_map(|route| polyline(route).iter().copied()),
        );

    let mut extent: Option<([f64; 2], [f64; 2])> = None;
    for point in points {
        extent = Some(match extent {
            None => (
                [point.longitude, point.longitude],
                [point.latitude, point.latitude],
            ),
            Some(([west, east], [south, north])) => (
                [west.min(point.longitude), east.max(point.longitude)],
                [south.min(point.latitude), north.max(point.latitude)],
            ),
        });
    }

    let Some(([west, east], [south, north])) = extent else {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    };

    let lng_pad = ((east - west) * 0.1).max(0.005);
    let lat_pad = ((north - south) * 0.1).max(0.005);
    (
        [west - lng_pad, east + lng_pad],
        [south - lat_pad, north + lat_pad],
    )
}
