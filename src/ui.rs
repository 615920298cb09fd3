use chrono::Utc;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::canvas::{Canvas, Map, MapResolution, Points};
use ratatui::widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, Tabs, Wrap};

use crate::credentials::{CredentialName, CredentialStore};
use crate::faction::{Activity, FactionMember};
use crate::fairness::{Rgb, ScoreScale, color_for};
use crate::format::{
    attack_url, format_elapsed, format_fair_fight, format_money, format_number, format_price,
    format_time_remaining, profile_url, relative_time,
};
use crate::listing::{Enriched, PageBound};
use crate::player::{Bar, PlayerSnapshot, days_remaining};
use crate::state::{AppState, FactionMap, InputMode, Notice, Panel, Tab};
use crate::stocks::{portfolio_rows, portfolio_total};
use crate::world_map::{HOME_CITY, Heading, MapPlot, city_coordinates, city_markers};

const INBOUND: Rgb = Rgb(0x41, 0x69, 0xe1);
const OUTBOUND: Rgb = Rgb(0x00, 0xff, 0x00);
const ABROAD: Rgb = Rgb(0xdc, 0x14, 0x3c);
const IDLE: Rgb = Rgb(0xd4, 0xa5, 0x74);

pub fn ui(frame: &mut Frame, state: &AppState, credentials: &CredentialStore) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(size);

    render_tabs(frame, chunks[0], state);

    if let (Some(message), false) = (&state.fatal, state.tab == Tab::Settings) {
        render_fatal(frame, chunks[1], message);
    } else {
        match state.tab {
            Tab::Player => render_player(frame, chunks[1], state),
            Tab::WorldMap => render_member_map(frame, chunks[1], &state.world_map, "World Map"),
            Tab::FactionMap => render_faction_map(frame, chunks[1], state),
            Tab::Stocks => render_stocks(frame, chunks[1], state),
            Tab::Bounties => render_bounties(frame, chunks[1], state),
            Tab::Targets => render_targets(frame, chunks[1], state),
            Tab::War => render_war(frame, chunks[1], state),
            Tab::Settings => render_settings(frame, chunks[1], state, credentials),
            Tab::Docs => render_docs(frame, chunks[1]),
        }
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if state.input_mode != InputMode::Normal && !matches!(state.input_mode, InputMode::Credential(_))
    {
        render_input_prompt(frame, size, state);
    }
    if let Some(message) = &state.alert {
        render_alert(frame, size, message);
    }
    if state.help_overlay {
        render_help_overlay(frame, size);
    }
}

fn render_tabs(frame: &mut Frame, area: Rect, state: &AppState) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(idx, tab)| {
            let label = format!("{} {}", idx + 1, tab.label());
            if *tab == Tab::War && state.war_alert {
                Line::from(Span::styled(
                    format!("{label} !"),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(label)
            }
        })
        .collect();
    let title = match &state.own_name {
        Some(name) => format!("TORN TERMINAL | {name}"),
        None => "TORN TERMINAL".to_string(),
    };
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        )
        .divider("|");
    frame.render_widget(tabs, area);
}

fn footer_text(state: &AppState) -> String {
    let common = "1-9/Tab Views | r Refresh | ? Help | q Quit";
    match state.tab {
        Tab::Player => format!("/ Search player | {common}"),
        Tab::FactionMap => format!("f Faction ID | {common}"),
        Tab::Bounties | Tab::Targets => format!("n/→ Next | p/← Prev | g Go to page | {common}"),
        Tab::Settings => format!("↑/↓ Select | Enter Edit/Save | Esc Cancel | {common}"),
        _ => common.to_string(),
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn panel_title(name: &str, loading: bool, updated_at: Option<&str>) -> String {
    match (loading, updated_at) {
        (true, _) => format!("{name} (loading...)"),
        (false, Some(at)) => format!("{name} | updated {at}"),
        (false, None) => name.to_string(),
    }
}

fn notice_line(notice: &Notice) -> Line<'static> {
    let color = match notice {
        Notice::NotConfigured(_) => Color::Yellow,
        Notice::Error(_) => Color::Red,
        Notice::Info(_) => Color::DarkGray,
    };
    Line::from(Span::styled(notice.text().to_string(), Style::default().fg(color)))
}

/// Splits off a one-line notice strip when there is something to say.
fn with_notice(frame: &mut Frame, area: Rect, notice: Option<&Notice>) -> Rect {
    let Some(notice) = notice else {
        return area;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    frame.render_widget(Paragraph::new(notice_line(notice)), rows[0]);
    rows[1]
}

fn render_fatal(frame: &mut Frame, area: Rect, message: &str) {
    let text = vec![
        Line::from(Span::styled(
            "Startup failed. Polling has stopped.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("Enter a working API key in Settings (8) to retry."),
    ];
    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Error").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn render_player(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search = Paragraph::new(if state.input_mode == InputMode::Search {
        format!("{}_", state.input_buffer)
    } else if state.subject_input.is_empty() {
        "Press / to look up a player by ID".to_string()
    } else {
        state.subject_input.clone()
    })
    .block(Block::default().title("Player ID").borders(Borders::ALL));
    frame.render_widget(search, rows[0]);

    let body = with_notice(frame, rows[1], state.player.notice.as_ref());
    let Some(player) = &state.player.data else {
        let msg = if state.player.loading {
            "Loading player..."
        } else {
            "No player loaded"
        };
        frame.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title("Player").borders(Borders::ALL)),
            body,
        );
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(body);
    let now = Utc::now().timestamp();

    let info = Paragraph::new(player_lines(state, player, now)).block(
        Block::default()
            .title(panel_title(
                "Player",
                state.player.loading,
                state.player.updated_at.as_deref(),
            ))
            .borders(Borders::ALL),
    );
    frame.render_widget(info, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(columns[1]);
    let bars = [
        ("Life", player.bars.life, Color::Green),
        ("Energy", player.bars.energy, Color::LightGreen),
        ("Nerve", player.bars.nerve, Color::Red),
        ("Happy", player.bars.happy, Color::Yellow),
    ];
    for (idx, (label, bar, color)) in bars.into_iter().enumerate() {
        render_bar(frame, right[idx], label, bar, color);
    }

    frame.render_widget(
        Paragraph::new(battle_lines(state, player))
            .block(Block::default().title("Battle Stats").borders(Borders::ALL)),
        right[4],
    );
}

fn render_bar(frame: &mut Frame, area: Rect, label: &str, bar: Option<Bar>, color: Color) {
    let block = Block::default().title(label.to_string()).borders(Borders::ALL);
    match bar {
        Some(bar) => {
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(color).bg(Color::Black))
                .ratio(bar.ratio())
                .label(format!(
                    "{} / {}",
                    format_number(bar.current),
                    format_number(bar.maximum)
                ));
            frame.render_widget(gauge, area);
        }
        None => frame.render_widget(Paragraph::new("-").block(block), area),
    }
}

fn player_lines(state: &AppState, player: &PlayerSnapshot, now: i64) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let name = player.name.clone().unwrap_or_else(|| "Unknown".to_string());
    match player.id {
        Some(id) => lines.push(Line::from(vec![
            Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" [{id}]")),
        ])),
        None => lines.push(Line::from(name)),
    }
    lines.push(Line::from(format!(
        "Level {} | {}",
        player
            .level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string()),
        player.gender.as_deref().unwrap_or("-")
    )));
    if let Some(faction) = &player.faction {
        lines.push(Line::from(format!(
            "Faction: {}{}",
            faction.name.as_deref().unwrap_or("None"),
            faction
                .position
                .as_deref()
                .map(|p| format!(" ({p})"))
                .unwrap_or_default()
        )));
    }
    if let Some(status) = &player.status {
        lines.push(Line::from(vec![
            Span::raw("Status: "),
            Span::styled(
                status.state.clone(),
                Style::default().fg(state_color(&status.state)),
            ),
            Span::raw(format!(" {}", status.description)),
        ]));
    }
    lines.push(Line::from(format!(
        "Last action: {}",
        relative_time(player.last_action, now)
    )));

    lines.push(Line::from(""));
    let travel = player.travel.as_ref();
    let travelling = travel.is_some_and(|t| t.is_travelling());
    let destination = travel
        .and_then(|t| t.destination.clone())
        .unwrap_or_else(|| HOME_CITY.to_string());
    if travelling {
        let remaining = state.travel_remaining(now).unwrap_or(0);
        lines.push(Line::from(format!(
            "Traveling to {destination} | arrives in {}",
            format_time_remaining(remaining)
        )));
    } else {
        lines.push(Line::from(format!("Location: {destination}")));
    }

    if let Some(money) = &player.money {
        lines.push(Line::from(""));
        let amount = |v: Option<f64>| v.map(format_money).unwrap_or_else(|| "-".to_string());
        lines.push(Line::from(format!("Wallet: {}", amount(money.wallet))));
        lines.push(Line::from(format!("Faction: {}", amount(money.faction))));
        let days = money
            .city_bank_until
            .and_then(|until| days_remaining(until, now))
            .map(|d| format!(" ({d} days left)"))
            .unwrap_or_default();
        lines.push(Line::from(format!(
            "City bank: {}{days}",
            amount(money.city_bank)
        )));
        lines.push(Line::from(format!("Cayman bank: {}", amount(money.cayman_bank))));
    }
    if let Some(id) = player.id {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            profile_url(id),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn battle_lines(state: &AppState, player: &PlayerSnapshot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let stat = |v: Option<u64>| v.map(format_number).unwrap_or_else(|| "-".to_string());
    match &player.battlestats {
        Some(bs) => {
            lines.push(Line::from(format!("Strength:  {}", stat(bs.strength))));
            lines.push(Line::from(format!("Defense:   {}", stat(bs.defense))));
            lines.push(Line::from(format!("Speed:     {}", stat(bs.speed))));
            lines.push(Line::from(format!("Dexterity: {}", stat(bs.dexterity))));
            lines.push(Line::from(format!("Total:     {}", format_number(bs.total()))));
        }
        None => lines.push(Line::from("Battle stats not available for this player")),
    }
    if let Some(stats) = &state.player_stats {
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "Estimate: {} | FF {}",
            stats.bs_estimate_human.as_deref().unwrap_or("-"),
            format_fair_fight(stats.fair_fight)
        )));
    }
    lines
}

fn state_color(state: &str) -> Color {
    match state.to_ascii_lowercase().as_str() {
        "okay" => Color::Green,
        "hospital" => Color::Red,
        "jail" | "federal" => IDLE.as_color(),
        "traveling" | "travelling" | "abroad" => INBOUND.as_color(),
        _ => Color::Gray,
    }
}

fn activity_color(activity: Activity) -> Color {
    match activity {
        Activity::Online => Color::Green,
        Activity::Idle => IDLE.as_color(),
        Activity::Offline => Color::Red,
        Activity::Unknown => Color::DarkGray,
    }
}

fn heading_color(heading: Heading) -> Color {
    match heading {
        Heading::Abroad => ABROAD.as_color(),
        Heading::Outbound => OUTBOUND.as_color(),
        Heading::Inbound => INBOUND.as_color(),
    }
}

fn render_faction_map(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);
    let entry = if state.input_mode == InputMode::FactionId {
        format!("{}_", state.input_buffer)
    } else {
        state
            .faction_map_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "Press f to enter a faction ID".to_string())
    };
    frame.render_widget(
        Paragraph::new(entry).block(Block::default().title("Faction ID").borders(Borders::ALL)),
        rows[0],
    );
    render_member_map(frame, rows[1], &state.faction_map, "Faction Map");
}

fn render_member_map(frame: &mut Frame, area: Rect, panel: &Panel<FactionMap>, name: &str) {
    let area = with_notice(frame, area, panel.notice.as_ref());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let title = panel_title(name, panel.loading, panel.updated_at.as_deref());
    let empty = MapPlot::default();
    let plot = panel.data.as_ref().map(|m| &m.plot).unwrap_or(&empty);
    render_map_canvas(frame, columns[0], plot, &title);
    frame.render_widget(
        Paragraph::new(plot_summary(plot))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Members").borders(Borders::ALL)),
        columns[1],
    );
}

fn render_map_canvas(frame: &mut Frame, area: Rect, plot: &MapPlot, title: &str) {
    let cities = city_markers();
    let home = city_coordinates(HOME_CITY);
    let canvas = Canvas::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });
            for (name, coord) in &cities {
                ctx.draw(&Points {
                    coords: &[(coord.lon, coord.lat)],
                    color: Color::Gray,
                });
                ctx.print(
                    coord.lon + 1.5,
                    coord.lat - 3.0,
                    Span::styled(name.to_string(), Style::default().fg(Color::DarkGray)),
                );
            }
            if let (Some(home), false) = (home, plot.in_torn.is_empty()) {
                ctx.print(
                    home.lon,
                    home.lat + 4.0,
                    Span::styled(
                        format!("{} in Torn", plot.in_torn.len()),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                );
            }
            for group in &plot.markers {
                let color = heading_color(group.heading);
                ctx.draw(&Points {
                    coords: &[(group.coord.lon, group.coord.lat)],
                    color,
                });
                let label = match group.names.as_slice() {
                    [only] => only.clone(),
                    [first, rest @ ..] => format!("{first} +{}", rest.len()),
                    [] => continue,
                };
                ctx.print(
                    group.coord.lon,
                    group.coord.lat + 3.0,
                    Span::styled(label, Style::default().fg(color)),
                );
            }
        });
    frame.render_widget(canvas, area);
}

fn plot_summary(plot: &MapPlot) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("In Torn ({})", plot.in_torn.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(plot.in_torn.join(", ")),
        Line::from(""),
    ];
    for group in &plot.markers {
        let what = match group.heading {
            Heading::Abroad => "Abroad",
            Heading::Outbound => "Outbound",
            Heading::Inbound => "Returning",
        };
        lines.push(Line::from(Span::styled(
            format!("{what}: {}", group.names.join(", ")),
            Style::default().fg(heading_color(group.heading)),
        )));
    }
    if !plot.unplaced.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Elsewhere: {}", plot.unplaced.join(", ")),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn render_stocks(frame: &mut Frame, area: Rect, state: &AppState) {
    let area = with_notice(frame, area, state.stocks.notice.as_ref());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let title = panel_title(
        "Stocks",
        state.stocks.loading,
        state.stocks.updated_at.as_deref(),
    );

    let holdings = state.stocks.data.as_deref().unwrap_or_default();
    let portfolio = portfolio_rows(holdings, &state.stock_catalog);
    let header = Row::new(["Stock", "Shares", "Price", "Value", "Dividend", "Benefit"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table_rows: Vec<Row> = portfolio
        .iter()
        .map(|row| {
            let dividend = if row.dividend_ready {
                Cell::from("Ready").style(Style::default().fg(Color::Green))
            } else {
                Cell::from("-")
            };
            Row::new(vec![
                Cell::from(row.name.clone()),
                Cell::from(format_number(row.shares.round().max(0.0) as u64)),
                Cell::from(row.price.map(format_price).unwrap_or_else(|| "-".to_string())),
                Cell::from(row.value.map(format_money).unwrap_or_else(|| "-".to_string())),
                dividend,
                Cell::from(row.benefit.clone().unwrap_or_default())
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    let empty = table_rows.is_empty();
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(28),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, rows[0]);

    let total = if empty && state.stocks.data.is_some() {
        "No stocks held".to_string()
    } else {
        format!("Portfolio value: {}", format_money(portfolio_total(&portfolio)))
    };
    frame.render_widget(
        Paragraph::new(total).alignment(Alignment::Right),
        rows[1],
    );
}

fn fair_fight_cell(scale: Option<&ScoreScale>, value: Option<f64>) -> Cell<'static> {
    Cell::from(format_fair_fight(value)).style(
        Style::default()
            .fg(color_for(scale, value).as_color())
            .add_modifier(Modifier::BOLD),
    )
}

fn page_label(page: u32, bound: PageBound, total: Option<u32>, has_next: bool) -> String {
    let of = match bound {
        PageBound::Fixed(max) => format!(" of {max}"),
        PageBound::Open => String::new(),
    };
    let mut label = format!("Page {page}{of}");
    if let Some(total) = total {
        label.push_str(&format!(" | {total} total"));
    }
    if has_next {
        label.push_str(" | more available");
    }
    label
}

fn render_bounties(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = &state.bounties;
    let area = with_notice(frame, area, view.notice.as_ref());
    let scale = ScoreScale::from_scores(view.rows.iter().filter_map(Enriched::fair_fight));
    let cursor = view.listing.cursor();
    let title = panel_title(
        &format!(
            "Bounties | {}",
            page_label(
                cursor.page,
                view.listing.bound(),
                cursor.total,
                view.listing.has_next()
            )
        ),
        view.loading,
        view.updated_at.as_deref(),
    );

    let header = Row::new(["#", "Target", "Lvl", "Reward", "Qty", "FF", "Est. stats", "Reason"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = view
        .rows
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let bounty = &item.row;
            let target = match bounty.target_id {
                Some(id) => format!("{} [{id}]", bounty.target_name),
                None => bounty.target_name.clone(),
            };
            Row::new(vec![
                Cell::from((cursor.offset() as usize + idx + 1).to_string()),
                Cell::from(target),
                Cell::from(bounty.target_level.map(|l| l.to_string()).unwrap_or_default()),
                Cell::from(format_money(bounty.reward)),
                Cell::from(bounty.quantity.to_string()),
                fair_fight_cell(scale.as_ref(), item.fair_fight()),
                Cell::from(
                    item.stats
                        .as_ref()
                        .and_then(|s| s.bs_estimate_human.clone())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(bounty.reason.clone().unwrap_or_default())
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(30),
            Constraint::Length(4),
            Constraint::Length(14),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_targets(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = &state.targets;
    let area = with_notice(frame, area, view.notice.as_ref());
    let scale = ScoreScale::from_scores(view.rows.iter().filter_map(|t| t.fair_fight));
    let cursor = view.listing.cursor();
    let title = panel_title(
        &format!(
            "Targets | {}",
            page_label(
                cursor.page,
                view.listing.bound(),
                cursor.total,
                view.listing.has_next()
            )
        ),
        view.loading,
        view.updated_at.as_deref(),
    );
    let now = Utc::now().timestamp();

    let header = Row::new(["Name", "Lvl", "FF", "Est. stats", "Last action", "Attack"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = view
        .rows
        .iter()
        .map(|target| {
            Row::new(vec![
                Cell::from(format!("{} [{}]", target.name, target.player_id)),
                Cell::from(target.level.map(|l| l.to_string()).unwrap_or_default()),
                fair_fight_cell(scale.as_ref(), target.fair_fight),
                Cell::from(
                    target
                        .bs_estimate_human
                        .clone()
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(relative_time(target.last_action, now)),
                Cell::from(attack_url(target.player_id))
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(16),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_war(frame: &mut Frame, area: Rect, state: &AppState) {
    let area = with_notice(frame, area, state.war.notice.as_ref());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);
    let title = panel_title("War", state.war.loading, state.war.updated_at.as_deref());
    let now = Utc::now().timestamp();

    let Some(board) = &state.war.data else {
        frame.render_widget(
            Paragraph::new("No war data yet")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title(title).borders(Borders::ALL)),
            area,
        );
        return;
    };

    let mut score_lines = Vec::new();
    match board.overview.active_war() {
        Some(war) => {
            score_lines.push(Line::from(vec![
                Span::styled(war.kind.label(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("  {}", war.clock(now).label())),
            ]));
            let line: Vec<String> = board
                .overview
                .scoreboard(state.own_faction_id)
                .iter()
                .map(|f| format!("{} {}", f.name, f.score))
                .collect();
            score_lines.push(Line::from(line.join("  vs  ")));
        }
        None => score_lines.push(Line::from(format_elapsed(0))),
    }
    if let Some(opponent) = &board.opponent {
        score_lines.push(Line::from(Span::styled(
            format!("Opponent: {}", opponent.name),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(
        Paragraph::new(score_lines).block(Block::default().title(title).borders(Borders::ALL)),
        rows[0],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    render_war_members(frame, columns[0], &board.members, now);
    render_map_canvas(frame, columns[1], &board.plot, "Enemy Map");
}

fn render_war_members(
    frame: &mut Frame,
    area: Rect,
    members: &[Enriched<FactionMember>],
    now: i64,
) {
    let scale = ScoreScale::from_scores(members.iter().filter_map(Enriched::fair_fight));
    let header = Row::new(["Name", "Lvl", "Status", "Last action", "FF", "Est. stats"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = members
        .iter()
        .map(|item| {
            let member = &item.row;
            let status = if member.description.is_empty() {
                member.state.clone()
            } else {
                member.description.clone()
            };
            let last_action = member
                .last_action_at
                .map(|ts| relative_time(Some(ts), now))
                .or_else(|| member.last_action.clone())
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(format!("{} [{}]", member.name, member.id)),
                Cell::from(member.level.map(|l| l.to_string()).unwrap_or_default()),
                Cell::from(status).style(Style::default().fg(state_color(&member.state))),
                Cell::from(last_action)
                    .style(Style::default().fg(activity_color(member.activity()))),
                fair_fight_cell(scale.as_ref(), item.fair_fight()),
                Cell::from(
                    item.stats
                        .as_ref()
                        .and_then(|s| s.bs_estimate_human.clone())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Length(14),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!("Enemy Members ({})", members.len()))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, area);
}

fn mask(value: &str) -> String {
    let shown: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "*".repeat(value.chars().count())
    } else {
        format!("{shown}{}", "*".repeat(value.chars().count() - 4))
    }
}

fn render_settings(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    credentials: &CredentialStore,
) {
    let mut lines = vec![
        Line::from("API keys are stored in your config directory and sent only to their own service."),
        Line::from(""),
    ];
    for name in CredentialName::ALL {
        let selected = state.settings.selected == name;
        let editing = state.input_mode == InputMode::Credential(name);
        let value = if editing {
            format!("{}_", mask(&state.input_buffer))
        } else {
            let field = credentials.field(name);
            if field.trim().is_empty() {
                "(not set)".to_string()
            } else {
                mask(field.trim())
            }
        };
        let saved = if credentials.stored(name).is_some() {
            "saved"
        } else {
            "not saved"
        };
        let marker = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{:<20}", name.label()), style),
            Span::raw(format!("{value}  ")),
            Span::styled(format!("({saved})"), Style::default().fg(Color::DarkGray)),
        ]));
    }
    if let Some(message) = &state.settings.message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Green),
        )));
    }
    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Settings").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

/// Endpoints this dashboard calls, by group.
const ENDPOINT_DOCS: &[(&str, &str, &str)] = &[
    ("User", "/user/{id}", "basic, profile, bars, money, travel, faction, battlestats, stocks"),
    ("User", "/user/", "key owner (basic, profile, faction)"),
    ("Faction", "/faction/members", "own faction members"),
    ("Faction", "/faction/{id}/members", "members of any faction"),
    ("Faction", "/faction/wars", "ranked wars, raids, territory wars"),
    ("Torn", "/torn/?selections=stocks", "stock catalog and prices"),
    ("Torn", "/torn/bounties", "bounty listing (offset, limit)"),
    ("FFScouter", "/get-stats", "fair fight and battle stat estimates (targets=ids)"),
    ("FFScouter", "/get-targets", "suggested targets (minff, maxff, offset, limit)"),
];

fn render_docs(frame: &mut Frame, area: Rect) {
    let header = Row::new(["Group", "Path", "Used for"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = ENDPOINT_DOCS
        .iter()
        .map(|(group, path, what)| Row::new([*group, *path, *what]))
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(28),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(Block::default().title("API Endpoints").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_input_prompt(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = match state.input_mode {
        InputMode::Search => "Player ID",
        InputMode::PageJump => "Go to page",
        InputMode::FactionId => "Faction ID",
        InputMode::Normal | InputMode::Credential(_) => return,
    };
    let popup = centered_rect(40, 20, area);
    frame.render_widget(Clear, popup);
    let prompt = Paragraph::new(vec![
        Line::from(format!("{}_", state.input_buffer)),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to confirm, Esc to cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(prompt, popup);
}

fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let popup = centered_rect(50, 25, area);
    frame.render_widget(Clear, popup);
    let alert = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(Color::Red))
    .block(Block::default().title("Alert").borders(Borders::ALL));
    frame.render_widget(alert, popup);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Torn Terminal - Help",
        "",
        "Global:",
        "  1-9          Switch view",
        "  Tab / S-Tab  Next / previous view",
        "  r            Refresh current view",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Player:",
        "  /            Look up a player by ID",
        "",
        "Faction Map:",
        "  f            Enter a faction ID",
        "",
        "Bounties / Targets:",
        "  n / →        Next page",
        "  p / ←        Previous page",
        "  g            Go to page",
        "",
        "Settings:",
        "  ↑/↓          Select key",
        "  Enter        Edit, then save",
        "  Esc          Cancel edit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
