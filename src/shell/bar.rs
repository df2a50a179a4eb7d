//! Per-monitor status bar
//!
//! A plain window across the top of each monitor showing the focused title,
//! the clock and memory use. Redrawn on expose, on focus changes and on the
//! one-second tick.

use std::fs;

use anyhow::Result;
use chrono::Local;
use tracing::trace;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

use crate::config::Colors;
use crate::shared::Geometry;
use crate::wm::decorations::{self, FontInfo, rect};
use crate::wm::placement::BAR_HEIGHT;

/// Width of the accent stripe on the active monitor's bar
const ACCENT_WIDTH: u32 = 4;
const TEXT_X: i16 = 8;

/// Create and map the bar window for a monitor
pub fn create_bar<C: Connection>(
    conn: &C,
    root: Window,
    monitor: Geometry,
    colors: &Colors,
) -> Result<Window> {
    let bar = conn.generate_id()?;
    conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        bar,
        root,
        monitor.x as i16,
        monitor.y as i16,
        monitor.width as u16,
        BAR_HEIGHT as u16,
        0,
        WindowClass::INPUT_OUTPUT,
        x11rb::COPY_FROM_PARENT,
        &CreateWindowAux::new()
            .background_pixel(colors.bar)
            .event_mask(EventMask::EXPOSURE | EventMask::BUTTON_PRESS),
    )?;
    conn.map_window(bar)?;
    Ok(bar)
}

/// What one bar shows
pub struct BarContent<'a> {
    pub text: &'a str,
    /// Draw the accent stripe
    pub active: bool,
}

/// Repaint a bar of the given width
pub fn draw_bar<C: Connection>(
    conn: &C,
    bar: Window,
    gc: Gcontext,
    width: u32,
    content: &BarContent<'_>,
    colors: &Colors,
    font: &FontInfo,
) -> Result<()> {
    decorations::fill(conn, bar, gc, colors.bar, rect(0, 0, width, BAR_HEIGHT))?;
    decorations::draw_text(
        conn,
        bar,
        gc,
        font,
        colors.text,
        colors.bar,
        TEXT_X,
        font.baseline(BAR_HEIGHT as i32),
        content.text,
    )?;

    let bottom = BAR_HEIGHT as i16 - 1;
    decorations::line(
        conn,
        bar,
        gc,
        colors.line,
        &[Segment {
            x1: 0,
            y1: bottom,
            x2: width as i16,
            y2: bottom,
        }],
    )?;

    if content.active {
        decorations::fill(
            conn,
            bar,
            gc,
            colors.active_border,
            rect(0, 0, ACCENT_WIDTH, BAR_HEIGHT),
        )?;
    }
    Ok(())
}

/// Status line for monitor `index` of `count`
pub fn format_status(
    index: usize,
    count: usize,
    title: Option<&str>,
    clock: &str,
    used_ram_mb: u64,
) -> String {
    let title = title.filter(|t| !t.is_empty()).unwrap_or("Desktop");
    if count > 1 {
        format!(
            "[{}] {} || {} | RAM: {}MB",
            index + 1,
            title,
            clock,
            used_ram_mb
        )
    } else {
        format!("{} || {} | RAM: {}MB", title, clock, used_ram_mb)
    }
}

/// Local time as `HH:MM | dd/mm`
pub fn clock_text() -> String {
    Local::now().format("%H:%M | %d/%m").to_string()
}

/// Used memory (total minus free) in MiB, 0 when unavailable
pub fn used_ram_mb() -> u64 {
    match fs::read_to_string("/proc/meminfo") {
        Ok(content) => parse_used_ram_mb(&content).unwrap_or(0),
        Err(e) => {
            trace!("Cannot read /proc/meminfo: {}", e);
            0
        }
    }
}

/// `MemTotal - MemFree` from /proc/meminfo text, in MiB
pub fn parse_used_ram_mb(meminfo: &str) -> Option<u64> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|kb| kb.parse().ok())
    };

    let total = field("MemTotal")?;
    let free = field("MemFree")?;
    Some(total.saturating_sub(free) / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_monitor_has_no_prefix() {
        assert_eq!(
            format_status(0, 1, Some("xterm"), "12:30 | 01/02", 2048),
            "xterm || 12:30 | 01/02 | RAM: 2048MB"
        );
    }

    #[test]
    fn test_multi_monitor_prefix_and_desktop() {
        assert_eq!(
            format_status(1, 2, None, "08:05 | 31/12", 0),
            "[2] Desktop || 08:05 | 31/12 | RAM: 0MB"
        );
        assert_eq!(
            format_status(0, 3, Some(""), "08:05 | 31/12", 7),
            "[1] Desktop || 08:05 | 31/12 | RAM: 7MB"
        );
    }

    #[test]
    fn test_parse_meminfo() {
        let sample = "MemTotal:       16318480 kB\n\
                      MemFree:         8159240 kB\n\
                      MemAvailable:   12000000 kB\n";
        assert_eq!(parse_used_ram_mb(sample), Some(7968));
    }

    #[test]
    fn test_parse_meminfo_missing_field() {
        assert_eq!(parse_used_ram_mb("MemTotal: 1024 kB\n"), None);
        assert_eq!(parse_used_ram_mb(""), None);
    }

    #[test]
    fn test_clock_shape() {
        let clock = clock_text();
        assert_eq!(clock.len(), "00:00 | 00/00".len());
        assert_eq!(&clock[5..8], " | ");
    }
}
