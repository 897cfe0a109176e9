//! Ratatui-based terminal UI.
//!
//! The dashboard shows one simulated series at a time (with the fitted model
//! over the phase 1 pressure), the candidate fits, and a piston drawing driven
//! by [`PistonAnimation`] at its fixed frame rate.

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Terminal,
};

use crate::animation::PistonAnimation;
use crate::app::pipeline::{run_simulation, RunOutput};
use crate::domain::{RunConfig, TimeSeries};
use crate::error::AppError;
use crate::models::fitted_values;
use crate::physics::linspace;

mod plotters_chart;

use plotters_chart::SeriesChart;

/// Observed samples drawn per chart; denser series are thinned.
const MAX_CHART_POINTS: usize = 200;

/// Start the TUI.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Which series the chart panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartView {
    Pressure,
    Temperature,
    Displacement,
    Work,
}

impl ChartView {
    const ALL: [ChartView; 4] = [
        ChartView::Pressure,
        ChartView::Temperature,
        ChartView::Displacement,
        ChartView::Work,
    ];

    fn title(self) -> &'static str {
        match self {
            ChartView::Pressure => "Phase 1 pressure + best fit",
            ChartView::Temperature => "Phase 1 temperature",
            ChartView::Displacement => "Phase 2 piston displacement",
            ChartView::Work => "Phase 2 cumulative work",
        }
    }

    fn y_label(self) -> &'static str {
        match self {
            ChartView::Pressure => "P (kPa)",
            ChartView::Temperature => "T (°C)",
            ChartView::Displacement => "h (m)",
            ChartView::Work => "W (kJ)",
        }
    }

    fn step(self, delta: isize) -> Self {
        let n = Self::ALL.len() as isize;
        let i = Self::ALL.iter().position(|&v| v == self).unwrap_or(0) as isize;
        Self::ALL[((i + delta).rem_euclid(n)) as usize]
    }

    /// Phase 2 views track the animation cursor.
    fn follows_animation(self) -> bool {
        matches!(self, ChartView::Displacement | ChartView::Work)
    }
}

struct App {
    config: RunConfig,
    run: RunOutput,
    animation: PistonAnimation,
    current: Option<crate::animation::PistonFrame>,
    playing: bool,
    view: ChartView,
    status: String,
}

impl App {
    fn new(config: RunConfig) -> Result<Self, AppError> {
        let run = run_simulation(&config)?;
        let animation = PistonAnimation::new(&run.phase2.displacement);
        Ok(Self {
            config,
            run,
            animation,
            current: None,
            playing: true,
            view: ChartView::Pressure,
            status: "Playing.".to_string(),
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        let mut last_tick = Instant::now();
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            let interval = self.animation.frame_interval();
            let timeout = if self.playing {
                interval.saturating_sub(last_tick.elapsed())
            } else {
                Duration::from_millis(100)
            };

            if event::poll(timeout).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_key(key.code)? {
                            break;
                        }
                        needs_redraw = true;
                    }
                    Event::Resize(_, _) => needs_redraw = true,
                    _ => {}
                }
            }

            if self.playing && last_tick.elapsed() >= interval {
                self.tick();
                last_tick = Instant::now();
                needs_redraw = true;
            }
        }
        Ok(())
    }

    fn tick(&mut self) {
        match self.animation.next() {
            Some(frame) => self.current = Some(frame),
            None => {
                self.playing = false;
                self.status = "Animation finished (r to replay).".to_string();
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char(' ') => {
                if self.animation.is_finished() {
                    self.animation.restart();
                }
                self.playing = !self.playing;
                self.status = if self.playing { "Playing." } else { "Paused." }.to_string();
            }
            KeyCode::Char('r') => {
                self.animation.restart();
                self.current = None;
                self.playing = true;
                self.status = "Restarted animation.".to_string();
            }
            KeyCode::Left | KeyCode::BackTab => self.view = self.view.step(-1),
            KeyCode::Right | KeyCode::Tab => self.view = self.view.step(1),
            KeyCode::Char('n') => self.reseed()?,
            _ => {}
        }
        Ok(false)
    }

    /// Draw a new noise trace and refit. No-op when noise is disabled.
    fn reseed(&mut self) -> Result<(), AppError> {
        if self.config.noise_std <= 0.0 {
            self.status = "Noise is off (start with --noise-std to enable).".to_string();
            return Ok(());
        }
        self.config.noise_seed = self.config.noise_seed.wrapping_add(1);
        match run_simulation(&self.config) {
            Ok(run) => {
                self.run = run;
                self.status = format!(
                    "seed {}: best {}",
                    self.config.noise_seed, self.run.selection.best.model
                );
            }
            Err(e) => self.status = format!("Refit failed: {e}"),
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let best = &self.run.selection.best;
        let params = &self.config.params;
        let lines = vec![
            Line::from(vec![
                Span::styled("piston", Style::default().fg(Color::Cyan)),
                Span::raw(" | piston-cylinder simulation"),
            ]),
            Line::from(Span::styled(
                format!(
                    "steps: {} | duration: {} s | heat: {} kJ/s | noise: {} | best: {} (R²={:.8}) | ∫W={:.4} kJ",
                    params.steps(),
                    params.duration(),
                    params.heat_rate(),
                    self.config.noise_std,
                    best.model,
                    best.r_squared,
                    self.run.work_integral,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(30)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(6)])
            .split(columns[0]);

        self.draw_chart(frame, left[0]);
        self.draw_fits(frame, left[1]);
        self.draw_piston(frame, columns[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title(self.view.title()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let data = chart_series(&self.run, self.view, self.current.map(|f| f.index));

        let (chart_rect, insets) = chart_layout(inner);
        let widget = SeriesChart {
            line: &data.line,
            points: &data.points,
            marker: data.marker,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "t (s)",
            y_label: self.view.y_label(),
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(
                frame,
                inner,
                chart_rect,
                insets,
                data.x_bounds,
                data.y_bounds,
                self.view.y_label(),
            );
        }
    }

    fn draw_fits(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let selection = &self.run.selection;
        let items: Vec<ListItem> = selection
            .fits
            .iter()
            .map(|fit| {
                let chosen = fit.model == selection.best.model;
                let style = if chosen {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format!(
                    "{} {:<12} R²={:.10}  rmse={:.3e}  {}",
                    if chosen { "*" } else { " " },
                    fit.model.display_name(),
                    fit.r_squared,
                    fit.rmse,
                    fit.model.formula(),
                ))
                .style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().title("Fits").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_piston(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Piston").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(current) = self.current.or_else(|| self.animation.frame(0)) else {
            return;
        };
        let rows = inner.height.saturating_sub(3) as usize;
        let fraction = current.piston_height / self.animation.max_height();
        let mut lines: Vec<Line> = piston_column(fraction, rows, 12)
            .into_iter()
            .map(|row| Line::from(Span::styled(row, Style::default().fg(Color::Gray))))
            .collect();
        lines.push(Line::from(format!(
            "frame {}/{}",
            current.index + 1,
            self.animation.len()
        )));
        lines.push(Line::from(format!("t={:.3} s", current.sim_time)));
        lines.push(Line::from(format!("y={:.4} m", current.piston_height)));

        let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
        frame.render_widget(p, inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ chart  space play/pause  r restart  n new noise  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Prepared data for one chart view.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    line: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    marker: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series for Plotters.
fn chart_series(run: &RunOutput, view: ChartView, frame_index: Option<usize>) -> ChartData {
    let (line, points) = match view {
        ChartView::Pressure => {
            let observed = &run.observed;
            let t_end = observed.time()[observed.len() - 1];
            let grid = linspace(observed.time()[0], t_end, 200);
            let fitted = fitted_values(&run.selection.best, &grid);
            (grid.into_iter().zip(fitted).collect(), thin(observed))
        }
        ChartView::Temperature => (run.phase1.temperature.points(), Vec::new()),
        ChartView::Displacement => (run.phase2.displacement.points(), Vec::new()),
        ChartView::Work => (run.phase2.work.points(), Vec::new()),
    };

    let marker = match (view.follows_animation(), frame_index) {
        (true, Some(i)) => line.get(i).copied(),
        _ => None,
    };

    let x_bounds = match (line.first(), line.last()) {
        (Some(&(t0, _)), Some(&(t1, _))) if t1 > t0 => [t0, t1],
        _ => [0.0, 1.0],
    };

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in line.iter().chain(&points) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        let c = if y_min.is_finite() { y_min } else { 0.0 };
        y_min = c - 0.5;
        y_max = c + 0.5;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    ChartData {
        line,
        points,
        marker,
        x_bounds,
        y_bounds: [y_min - pad, y_max + pad],
    }
}

fn thin(series: &TimeSeries) -> Vec<(f64, f64)> {
    let stride = series.len().div_ceil(MAX_CHART_POINTS).max(1);
    series.iter().step_by(stride).collect()
}

/// Text rendering of the cylinder with the piston at `fraction` of its height.
///
/// Rows are top to bottom; gas fills the space under the piston.
fn piston_column(fraction: f64, rows: usize, width: usize) -> Vec<String> {
    if rows == 0 {
        return Vec::new();
    }
    let inner = width.saturating_sub(2).max(1);
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    // Row index (from the top) of the piston head.
    let head = rows - 1 - ((rows - 1) as f64 * fraction).round() as usize;

    (0..rows)
        .map(|r| {
            let fill = if r < head {
                " "
            } else if r == head {
                "█"
            } else {
                "░"
            };
            format!("│{}│", fill.repeat(inner))
        })
        .collect()
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.1}")
}

fn fmt_axis_y(v: f64) -> String {
    if v.abs() >= 100.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    y_label: &str,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_x(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_y(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("t (s)")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(y_label.to_string())
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
