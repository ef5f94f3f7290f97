use crate::counters::CounterSnapshot;
use std::io::{self, Write};
use std::time::{Duration, Instant};

pub(crate) const SPINNER_FRAMES: [&str; 4] = ["·", "˚", "•", "˚"];

/// Single-line batch progress for the terminal
pub struct ProgressBar {
    width: usize,
    frame: usize,
    start: Instant,
    last_draw: Option<Instant>,
    min_interval: Duration,
}

impl ProgressBar {
    /// width = number of bar character slots (not including the brackets)
    pub fn new(width: usize) -> Self {
        Self {
            width,
            frame: 0,
            start: Instant::now(),
            last_draw: None,
            min_interval: Duration::from_millis(100),
        }
    }

    /// Time since the bar was created
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Redraw unless the last draw was too recent. `written`/`expected` are
    /// bytes over all jobs seen so far.
    pub fn update(&mut self, counters: &CounterSnapshot, written: u64, expected: u64) {
        let now = Instant::now();
        if let Some(last) = self.last_draw {
            if now.duration_since(last) < self.min_interval {
                return;
            }
        }
        self.last_draw = Some(now);
        self.draw(counters, written, expected);
    }

    /// Draw unconditionally and end the line
    pub fn finish(&mut self, counters: &CounterSnapshot, written: u64, expected: u64) {
        self.draw(counters, written, expected);
        println!();
    }

    fn draw(&mut self, counters: &CounterSnapshot, written: u64, expected: u64) {
        let pct = percentage(written, expected);
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();

        let elapsed = self.start.elapsed().as_secs_f64().max(0.0001);
        let speed = written as f64 / elapsed;
        let remaining = expected.saturating_sub(written);
        let eta = if speed > 0.0 {
            (remaining as f64 / speed).round() as u64
        } else {
            0
        };

        let states = &counters.states;
        let line = format!(
            "\r\x1b[2K{} [{}] {:5.1}%  {} @ {}/s  ETA {}  done {}  active {}  queued {}  failed {}",
            SPINNER_FRAMES[self.frame],
            render_bar(pct, self.width),
            pct,
            human_bytes(written as f64),
            human_bytes(speed),
            format_duration(eta),
            states.finished,
            states.processing + states.pausing,
            states.pending,
            states.failed,
        );
        print!("{}", line);
        io::stdout().flush().ok();
    }
}

pub(crate) fn percentage(written: u64, expected: u64) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    (written as f64 / expected as f64 * 100.0).clamp(0.0, 100.0)
}

/// Filled and empty cells for `pct` percent of `width`
pub(crate) fn render_bar(pct: f64, width: usize) -> String {
    let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) };
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Convert bytes (or bytes/sec) to readable string
pub fn human_bytes(bytes: f64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    if bytes <= 0.0 {
        return "0B".to_string();
    }
    let mut val = bytes;
    let mut i = 0usize;
    while val >= 1024.0 && i + 1 < units.len() {
        val /= 1024.0;
        i += 1;
    }
    format!("{:.2}{}", val, units[i])
}

/// Format seconds to H:MM:SS or M:SS
pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
