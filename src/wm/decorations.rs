//! Window decorations (titlebar, close/hide buttons) for lwm
//!
//! Also holds the core-font text helpers shared by the status bars and the
//! overlays.

use anyhow::{Context, Result};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

use crate::config::Colors;
use crate::shared::Geometry;
use crate::wm::placement::TITLE_HEIGHT;

/// Inset of the glyphs drawn inside titlebar buttons
const BUTTON_PADDING: i16 = 8;
/// Titlebar buttons are square, as tall as the titlebar
const BUTTON_SIZE: i32 = TITLE_HEIGHT as i32;

/// A loaded core font plus the metrics needed to lay out text
#[derive(Debug, Clone)]
pub struct FontInfo {
    pub font: Font,
    pub ascent: i16,
    min_char: u16,
    widths: Vec<i16>,
    default_width: i16,
}

impl FontInfo {
    /// Open `name`, falling back to `fixed`
    pub fn load<C: Connection>(conn: &C, name: &str) -> Result<Self> {
        match Self::open(conn, name) {
            Ok(font) => Ok(font),
            Err(e) => {
                warn!("Cannot load font {:?} ({:#}), trying \"fixed\"", name, e);
                Self::open(conn, "fixed").context("Cannot load font")
            }
        }
    }

    fn open<C: Connection>(conn: &C, name: &str) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, name.as_bytes())?.check()?;
        let reply = conn.query_font(font)?.reply()?;
        debug!(
            "Font {:?}: ascent {}, {} glyph metrics",
            name,
            reply.font_ascent,
            reply.char_infos.len()
        );

        Ok(Self {
            font,
            ascent: reply.font_ascent,
            min_char: reply.min_char_or_byte2,
            widths: reply.char_infos.iter().map(|c| c.character_width).collect(),
            default_width: reply.max_bounds.character_width,
        })
    }

    pub fn close<C: Connection>(&self, conn: &C) {
        let _ = conn.close_font(self.font);
    }

    /// Width in pixels of `text` as drawn by [`draw_text`]
    pub fn text_width(&self, text: &str) -> i32 {
        latin1(text)
            .iter()
            .map(|&b| {
                (b as u16)
                    .checked_sub(self.min_char)
                    .and_then(|i| self.widths.get(i as usize))
                    .copied()
                    .unwrap_or(self.default_width) as i32
            })
            .sum()
    }

    /// Baseline that vertically centers text in a row of `height`
    pub fn baseline(&self, height: i32) -> i16 {
        (height / 2 + self.ascent as i32 / 2 - 1) as i16
    }

    pub fn truncate(&self, text: &str, max_width: i32) -> String {
        truncate_to_width(text, max_width, |s| self.text_width(s))
    }
}

/// Shorten `text` with a trailing `...` until it fits in `max_width`.
/// Never goes below the bare ellipsis.
pub fn truncate_to_width(text: &str, max_width: i32, width: impl Fn(&str) -> i32) -> String {
    if width(text) <= max_width {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut keep = chars.len().saturating_sub(1);
    loop {
        let candidate: String = chars[..keep.saturating_sub(3).min(chars.len())]
            .iter()
            .collect::<String>()
            + "...";
        if keep <= 3 || width(&candidate) <= max_width {
            return candidate;
        }
        keep -= 1;
    }
}

/// Core fonts take 8-bit strings; anything outside Latin-1 becomes `?`
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .take(255)
        .collect()
}

/// Fill a rectangle with a solid color
pub fn fill<C: Connection>(
    conn: &C,
    drawable: Drawable,
    gc: Gcontext,
    color: u32,
    rect: Rectangle,
) -> Result<()> {
    conn.change_gc(gc, &ChangeGCAux::new().foreground(color))?;
    conn.poly_fill_rectangle(drawable, gc, &[rect])?;
    Ok(())
}

/// Outline a rectangle (covers width+1 by height+1 pixels, like the server)
pub fn outline<C: Connection>(
    conn: &C,
    drawable: Drawable,
    gc: Gcontext,
    color: u32,
    rect: Rectangle,
) -> Result<()> {
    conn.change_gc(gc, &ChangeGCAux::new().foreground(color))?;
    conn.poly_rectangle(drawable, gc, &[rect])?;
    Ok(())
}

pub fn line<C: Connection>(
    conn: &C,
    drawable: Drawable,
    gc: Gcontext,
    color: u32,
    segments: &[Segment],
) -> Result<()> {
    conn.change_gc(gc, &ChangeGCAux::new().foreground(color))?;
    conn.poly_segment(drawable, gc, segments)?;
    Ok(())
}

/// Draw text on a solid background strip
#[allow(clippy::too_many_arguments)]
pub fn draw_text<C: Connection>(
    conn: &C,
    drawable: Drawable,
    gc: Gcontext,
    font: &FontInfo,
    fg: u32,
    bg: u32,
    x: i16,
    baseline: i16,
    text: &str,
) -> Result<()> {
    conn.change_gc(
        gc,
        &ChangeGCAux::new().foreground(fg).background(bg).font(font.font),
    )?;
    conn.image_text8(drawable, gc, x, baseline, &latin1(text))?;
    Ok(())
}

/// Where a button press inside a frame landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlebarHit {
    /// Leading corner
    Close,
    /// Trailing corner
    Hide,
    /// Anywhere else on the titlebar
    Drag,
}

/// Classify a press at frame-relative (`x`, `y`); `None` below the titlebar
pub fn titlebar_hit(x: i32, y: i32, frame_width: u32) -> Option<TitlebarHit> {
    if y < 0 || y >= TITLE_HEIGHT as i32 {
        return None;
    }
    if x < BUTTON_SIZE {
        Some(TitlebarHit::Close)
    } else if x > frame_width as i32 - BUTTON_SIZE {
        Some(TitlebarHit::Hide)
    } else {
        Some(TitlebarHit::Drag)
    }
}

/// Create (but do not map) a frame window at `geometry`
pub fn create_frame<C: Connection>(
    conn: &C,
    root: Window,
    geometry: Geometry,
    border_width: u32,
    colors: &Colors,
) -> Result<Window> {
    let frame = conn.generate_id()?;
    conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        frame,
        root,
        geometry.x as i16,
        geometry.y as i16,
        geometry.width as u16,
        geometry.height as u16,
        border_width as u16,
        WindowClass::INPUT_OUTPUT,
        x11rb::COPY_FROM_PARENT,
        &CreateWindowAux::new()
            .background_pixel(colors.bar)
            .border_pixel(colors.border)
            .event_mask(
                EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::EXPOSURE
                    | EventMask::ENTER_WINDOW,
            ),
    )?;
    Ok(frame)
}

/// Everything needed to paint one frame
pub struct FrameStyle<'a> {
    pub colors: &'a Colors,
    pub font: &'a FontInfo,
    pub focused: bool,
}

/// Paint the titlebar, buttons, border and title of a frame
pub fn draw_frame<C: Connection>(
    conn: &C,
    frame: Window,
    gc: Gcontext,
    width: u32,
    height: u32,
    title: &str,
    style: &FrameStyle<'_>,
) -> Result<()> {
    let colors = style.colors;
    let border = if style.focused {
        colors.active_border
    } else {
        colors.border
    };
    let w = width as i16;
    let title_h = TITLE_HEIGHT as i16;
    let btn = BUTTON_SIZE as i16;
    let p = BUTTON_PADDING;

    fill(conn, frame, gc, colors.bar, rect(0, 0, width, TITLE_HEIGHT))?;
    outline(
        conn,
        frame,
        gc,
        border,
        rect(0, 0, width.saturating_sub(1), height.saturating_sub(1)),
    )?;
    line(conn, frame, gc, colors.line, &[seg(0, title_h - 1, w, title_h - 1)])?;

    // Close button, leading corner
    fill(conn, frame, gc, colors.button, rect(0, 0, btn as u32, btn as u32))?;
    outline(conn, frame, gc, border, rect(0, 0, btn as u32, btn as u32))?;
    line(
        conn,
        frame,
        gc,
        border,
        &[seg(p, p, btn - p, btn - p), seg(p, btn - p, btn - p, p)],
    )?;

    // Hide button, trailing corner
    let xr = w - btn;
    let (cx, cy) = (xr + btn / 2, btn / 2 + 3);
    fill(conn, frame, gc, colors.button, rect(xr, 0, btn as u32, btn as u32))?;
    outline(conn, frame, gc, border, rect(xr, 0, btn as u32, btn as u32))?;
    line(
        conn,
        frame,
        gc,
        border,
        &[seg(xr + 8, 10, cx, cy), seg(xr + btn - 8, 10, cx, cy)],
    )?;

    let max_width = width as i32 - BUTTON_SIZE * 2 - 20;
    let title = style.font.truncate(title, max_width);
    draw_text(
        conn,
        frame,
        gc,
        style.font,
        colors.text,
        colors.bar,
        btn + 8,
        style.font.baseline(TITLE_HEIGHT as i32),
        &title,
    )?;

    Ok(())
}

pub fn rect(x: i16, y: i16, width: u32, height: u32) -> Rectangle {
    Rectangle {
        x,
        y,
        width: width as u16,
        height: height as u16,
    }
}

fn seg(x1: i16, y1: i16, x2: i16, y2: i16) -> Segment {
    Segment { x1, y1, x2, y2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(s: &str) -> i32 {
        s.chars().count() as i32 * 6
    }

    #[test]
    fn test_titlebar_regions() {
        assert_eq!(titlebar_hit(0, 0, 400), Some(TitlebarHit::Close));
        assert_eq!(titlebar_hit(25, 10, 400), Some(TitlebarHit::Close));
        assert_eq!(titlebar_hit(26, 10, 400), Some(TitlebarHit::Drag));
        assert_eq!(titlebar_hit(374, 10, 400), Some(TitlebarHit::Drag));
        assert_eq!(titlebar_hit(375, 10, 400), Some(TitlebarHit::Hide));
        assert_eq!(titlebar_hit(200, 26, 400), None);
        assert_eq!(titlebar_hit(200, -1, 400), None);
    }

    #[test]
    fn test_truncate_keeps_fitting_text() {
        assert_eq!(truncate_to_width("xterm", 60, mono), "xterm");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        let out = truncate_to_width("a very long window title", 60, mono);
        assert!(out.ends_with("..."));
        assert!(mono(&out) <= 60);
        assert_eq!(out, "a very ...");
    }

    #[test]
    fn test_truncate_bottoms_out_at_ellipsis() {
        assert_eq!(truncate_to_width("abcdefgh", 1, mono), "...");
    }

    #[test]
    fn test_latin1_replaces_wide_chars() {
        assert_eq!(latin1("añb→"), vec![b'a', 0xF1, b'b', b'?']);
    }
}
