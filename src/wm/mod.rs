//! Window Manager Module
//!
//! The event dispatcher. [`WindowManager`] owns the connection-side state
//! (registry, focus, monitors, grabs, overlays) and is the only place that
//! mutates it. Every other module returns decisions that are applied here.

pub mod client;
pub mod cycle;
pub mod decorations;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod grab;
pub mod keyboard;
pub mod keysyms;
pub mod menu;
pub mod moveresize;
pub mod overlay;
pub mod placement;
pub mod screen;
pub mod terminate;

use std::os::unix::process::CommandExt;
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::{CURRENT_TIME, NONE};

use crate::config::Config;
use crate::shared::{Geometry, Visibility};
use crate::shell::bar::{self, BarContent};
use client::{ClientRegistry, MAX_CLIENTS, UnmapAction};
use cycle::{ListKey, OpenPlan, Selection, Switcher, SwitcherSession};
use decorations::{FontInfo, FrameStyle, TitlebarHit, rect};
use events::WmEvent;
use ewmh::Atoms;
use focus::Focus;
use grab::{KeyboardGrab, PointerGrab};
use keyboard::{Action, KeyboardMapping, Modifiers};
use menu::MenuSession;
use moveresize::{DragState, Interaction};
use overlay::Overlay;
use placement::{BAR_HEIGHT, FrameLayout, SnapDirection, TITLE_HEIGHT};
use screen::MonitorSet;

/// Name published on the supporting check window
const WM_NAME: &str = "lwm";
/// `left_ptr` in the core cursor font
const LEFT_PTR_GLYPH: u16 = 68;
/// Text color for hidden windows in the switcher
const DIM_TEXT: u32 = 0x888888;

pub struct WindowManager {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
    config: Config,
    monitors: MonitorSet,
    registry: ClientRegistry,
    focus: Focus,
    interaction: Interaction,
    /// Held for exactly as long as `interaction` is dragging
    drag_grab: Option<PointerGrab>,
    switcher: Switcher,
    menu: Option<MenuSession>,
    font: FontInfo,
    /// Shared GC for frames and bars
    gc: Gcontext,
    keymap: KeyboardMapping,
    check_window: Window,
    running: bool,
}

impl WindowManager {
    /// Take over the screen: hints, bars, grabs, and any windows that are
    /// already mapped
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, config: Config) -> Result<Self> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .cloned()
            .context("Screen not found")?;
        let root = screen.root;
        info!(
            "Managing screen {} ({}x{}), root {}",
            screen_num, screen.width_in_pixels, screen.height_in_pixels, root
        );

        // Only one client may select SubstructureRedirect on the root
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(
                EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::KEY_PRESS
                    | EventMask::KEY_RELEASE,
            ),
        )?
        .check()
        .context("Another window manager is already running")?;

        let mut monitors = MonitorSet::detect(conn.as_ref(), &screen);

        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        atoms.setup_supported(conn.as_ref(), root)?;
        let check_window = atoms
            .setup_supporting_wm_check(conn.as_ref(), root, WM_NAME)
            .context("Failed to create supporting WM check window")?;

        let font = FontInfo::load(conn.as_ref(), &config.font)?;
        let gc = conn.generate_id()?;
        conn.create_gc(gc, root, &CreateGCAux::new().font(font.font))?;

        for monitor in monitors.iter_mut() {
            let window = bar::create_bar(conn.as_ref(), root, monitor.geometry, &config.colors)
                .context("Failed to create status bar")?;
            monitor.bar = Some(window);
        }

        set_root_cursor(conn.as_ref(), root)?;
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().background_pixel(config.colors.background),
        )?;
        conn.clear_area(false, root, 0, 0, 0, 0)?;

        let keymap = KeyboardMapping::query(conn.as_ref()).context("Failed to read keymap")?;
        keyboard::grab_keys(conn.as_ref(), root, &config.keybindings, &keymap)?;
        info!("Grabbed {} key binding(s)", config.keybindings.len());

        for mods in config.mouse_modifier.lock_variants() {
            for button in [ButtonIndex::M1, ButtonIndex::M3] {
                conn.grab_button(
                    true,
                    root,
                    EventMask::BUTTON_PRESS,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                    NONE,
                    NONE,
                    button,
                    ModMask::from(mods),
                )?;
            }
        }

        let mut wm = Self {
            conn,
            root,
            atoms,
            config,
            monitors,
            registry: ClientRegistry::new(),
            focus: Focus::new(),
            interaction: Interaction::default(),
            drag_grab: None,
            switcher: Switcher::default(),
            menu: None,
            font,
            gc,
            keymap,
            check_window,
            running: true,
        };

        wm.adopt_existing()?;
        wm.update_client_list()?;
        wm.update_bars()?;
        wm.conn.flush()?;
        Ok(wm)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Periodic refresh (clock, memory)
    pub fn tick(&self) -> Result<()> {
        self.update_bars()
    }

    /// Frame every viewable top-level window that existed before we started
    fn adopt_existing(&mut self) -> Result<()> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        let mut adopted = 0;
        for window in tree.children {
            if self.monitors.is_bar(window) || window == self.check_window {
                continue;
            }
            let Ok(attrs) = self.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if attrs.map_state != MapState::VIEWABLE || attrs.override_redirect {
                continue;
            }
            if let Err(e) = self.manage_window(window) {
                warn!("Failed to adopt window {}: {:#}", window, e);
            } else {
                adopted += 1;
            }
        }
        info!("Adopted {} existing window(s)", adopted);
        Ok(())
    }

    /// Route one event. While an overlay is open it sees input first;
    /// structural events always reach the registry.
    pub fn handle_event(&mut self, event: WmEvent) -> Result<()> {
        if event.is_motion() {
            trace!("{}", event.name());
        } else {
            debug!("{}", event.name());
        }

        if !event.is_structural() {
            if self.switcher.is_open() && self.switcher_event(&event)? {
                return Ok(());
            }
            if self.menu.is_some() && self.menu_event(&event)? {
                return Ok(());
            }
        }

        match event {
            WmEvent::MapRequest(e) => self.manage_window(e.window),
            WmEvent::Unmap(e) => self.on_unmap(e),
            WmEvent::Destroy(e) => self.on_destroy(e),
            WmEvent::Configure(e) => {
                self.conn
                    .configure_window(e.window, &ConfigureWindowAux::from_configure_request(&e))?;
                Ok(())
            }
            WmEvent::ClientMessage(e) => self.on_client_message(e),
            WmEvent::KeyPress(e) => self.on_key_press(e),
            WmEvent::KeyRelease(_) => Ok(()),
            WmEvent::ButtonPress(e) => self.on_button_press(e),
            WmEvent::Motion(e) => self.on_motion(e),
            WmEvent::ButtonRelease(_) => self.on_button_release(),
            WmEvent::Expose(e) => self.on_expose(e),
            WmEvent::Enter(e) => self.on_enter(e),
        }
    }

    /// Frame (or just map) a window asking to be shown
    fn manage_window(&mut self, window: Window) -> Result<()> {
        if let Some(client) = self.registry.state_of(window) {
            if !client.is_framed() {
                self.conn.map_window(window)?;
            }
            return Ok(());
        }
        if self.monitors.is_bar(window) || window == self.check_window {
            return Ok(());
        }

        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        if attrs.override_redirect {
            return Ok(());
        }

        if self.registry.len() >= MAX_CLIENTS {
            warn!("Client table full, mapping {} unmanaged", window);
            self.conn.map_window(window)?;
            return Ok(());
        }

        if !self.atoms.should_frame(self.conn.as_ref(), window) {
            debug!("Mapping {} without a frame", window);
            self.conn.map_window(window)?;
            self.registry.add(window, None, 0);
            return self.update_client_list();
        }

        let pointer = self.conn.query_pointer(self.root)?.reply()?;
        let monitor = self
            .monitors
            .monitor_at(pointer.root_x as i32, pointer.root_y as i32);
        let requested = self.conn.get_geometry(window)?.reply()?;
        let usable = self.monitors.usable_area(monitor, BAR_HEIGHT);
        let placed =
            placement::initial_placement(usable, requested.width as u32, requested.height as u32);

        if placed.resized {
            self.conn.configure_window(
                window,
                &ConfigureWindowAux::new()
                    .width(placed.client_width)
                    .height(placed.client_height),
            )?;
        }

        let frame = decorations::create_frame(
            self.conn.as_ref(),
            self.root,
            placed.frame,
            self.config.border_width,
            &self.config.colors,
        )?;

        self.conn
            .reparent_window(window, frame, 0, TITLE_HEIGHT as i16)?;
        // Selected after the reparent so its implicit unmap is not seen
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
        )?;
        self.conn.map_window(frame)?;
        self.conn.map_window(window)?;
        self.conn.change_save_set(SetMode::INSERT, window)?;

        self.registry.add(window, Some(frame), monitor);
        info!(
            "Managing {} in frame {} on monitor {} at {:?}",
            window, frame, monitor, placed.frame
        );
        self.update_client_list()?;
        self.set_focus(window)?;
        self.update_bars()
    }

    fn on_unmap(&mut self, e: UnmapNotifyEvent) -> Result<()> {
        let frame = match client::unmap_action(self.registry.state_of(e.window), e.event == self.root) {
            UnmapAction::Ignore => return Ok(()),
            UnmapAction::Forget => return self.forget_client(e.window),
            UnmapAction::Unframe(frame) => frame,
        };

        if self.conn.get_window_attributes(e.window)?.reply().is_ok() {
            // Withdrawn by its owner: hand it back to the root untouched
            let geometry = self.frame_geometry(frame)?;
            self.conn.reparent_window(
                e.window,
                self.root,
                geometry.x as i16,
                geometry.y as i16 + TITLE_HEIGHT as i16,
            )?;
            self.conn.change_save_set(SetMode::DELETE, e.window)?;
            debug!("Client {} withdrew itself", e.window);
        }

        self.conn.destroy_window(frame)?;
        self.forget_client(e.window)
    }

    fn on_destroy(&mut self, e: DestroyNotifyEvent) -> Result<()> {
        let Some(client) = self.registry.lookup(e.window) else {
            return Ok(());
        };
        let window = client.window;
        // A destroyed frame takes its client down with it
        if let Some(frame) = client.frame.filter(|&f| f != e.window) {
            self.conn.destroy_window(frame)?;
        }
        self.forget_client(window)
    }

    /// Drop a client from the registry and republish everything derived
    /// from it
    fn forget_client(&mut self, window: Window) -> Result<()> {
        if self.registry.remove(window).is_none() {
            return Ok(());
        }
        info!("Unmanaged {}", window);
        self.update_client_list()?;
        if self.focus.forget(window) {
            self.atoms
                .update_active_window(self.conn.as_ref(), self.root, None)?;
        }
        self.update_bars()
    }

    fn on_client_message(&mut self, e: ClientMessageEvent) -> Result<()> {
        let data = e.data.as_data32();

        if e.type_ == self.atoms.net_wm_state {
            let Some(current) = self.registry.state_of(e.window).map(|c| c.fullscreen) else {
                return Ok(());
            };
            if let Some(wanted) =
                ewmh::requested_fullscreen(data, self.atoms.net_wm_state_fullscreen, current)
            {
                if wanted != current {
                    self.toggle_fullscreen(e.window)?;
                }
            }
        } else if e.type_ == self.atoms.net_active_window {
            if let Some(frame) = self.registry.frame_of(e.window) {
                self.activate(frame, e.window, true)?;
            }
        }
        Ok(())
    }

    fn on_key_press(&mut self, e: KeyPressEvent) -> Result<()> {
        let keysym = self.keymap.keysym(e.detail);
        let Some(bind) = self
            .config
            .keybindings
            .resolve(keysym, u16::from(e.state))
            .cloned()
        else {
            return Ok(());
        };
        debug!("Key 0x{:X} -> {:?}", keysym, bind.action);
        self.run_action(bind.action, bind.modifiers)
    }

    fn run_action(&mut self, action: Action, modifiers: Modifiers) -> Result<()> {
        match action {
            Action::Quit => {
                info!("Quit requested");
                self.running = false;
            }
            Action::AltTab => self.open_switcher(modifiers)?,
            Action::Menu => self.open_menu()?,
            Action::UnhideAll => self.unhide_all()?,
            Action::Close => {
                if let Some(window) = self.focus.window {
                    self.close(window)?;
                }
            }
            Action::Fullscreen => {
                if let Some(window) = self.focus.window {
                    self.toggle_fullscreen(window)?;
                }
            }
            Action::Snap(direction) => {
                if let Some(window) = self.focus.window {
                    self.snap(window, direction)?;
                }
            }
            Action::Spawn(command) => spawn(&command),
        }
        Ok(())
    }

    fn on_button_press(&mut self, e: ButtonPressEvent) -> Result<()> {
        let tree = self.conn.query_tree(e.event)?.reply()?;
        let parent_frame = if tree.parent != self.root && tree.parent != NONE {
            Some(tree.parent)
        } else if e.event != self.root {
            Some(e.event)
        } else {
            None
        };

        let fullscreen = parent_frame
            .and_then(|f| self.registry.state_of_frame(f))
            .is_some_and(|c| c.fullscreen);
        let modded = Modifiers::clean(u16::from(e.state)).contains(self.config.mouse_modifier);

        // The modifier grabs live on the root only, in async mode, so no
        // press here ever freezes the pointer
        if !fullscreen && modded && (e.detail == 1 || e.detail == 3) {
            let target = parent_frame.or((e.child != NONE).then_some(e.child));
            if let Some(frame) = target.filter(|&t| self.registry.client_of(t).is_some()) {
                self.begin_drag(frame, e.root_x as i32, e.root_y as i32, e.detail == 3)?;
            }
            return Ok(());
        }

        if !fullscreen && e.detail == 1 && self.registry.client_of(e.event).is_some() {
            let geometry = self.frame_geometry(e.event)?;
            if let Some(hit) =
                decorations::titlebar_hit(e.event_x as i32, e.event_y as i32, geometry.width)
            {
                return self.titlebar_click(e.event, hit, e.root_x as i32, e.root_y as i32);
            }
        }

        // Plain click on a frame: raise and focus
        if let Some(frame) = parent_frame.filter(|&f| !self.monitors.is_bar(f)) {
            if let Some(client) = self.registry.client_of(frame) {
                self.raise(frame)?;
                self.raise_bars()?;
                if self.focus.window != Some(client) {
                    self.set_focus(client)?;
                    self.update_bars()?;
                }
            }
        }
        Ok(())
    }

    fn titlebar_click(&mut self, frame: Window, hit: TitlebarHit, root_x: i32, root_y: i32) -> Result<()> {
        match hit {
            TitlebarHit::Close => {
                if let Some(client) = self.registry.client_of(frame) {
                    self.close(client)?;
                }
            }
            TitlebarHit::Hide => {
                debug!("Hiding frame {}", frame);
                self.conn.unmap_window(frame)?;
            }
            TitlebarHit::Drag => self.begin_drag(frame, root_x, root_y, false)?,
        }
        Ok(())
    }

    /// Idle -> Dragging: grab the pointer on the root and snapshot the frame
    fn begin_drag(&mut self, frame: Window, root_x: i32, root_y: i32, resize: bool) -> Result<()> {
        if self.interaction.is_dragging() {
            return Ok(());
        }
        let start = self.frame_geometry(frame)?;
        let Some(grab) = PointerGrab::acquire(
            &self.conn,
            self.root,
            EventMask::BUTTON_MOTION | EventMask::BUTTON_RELEASE,
            false,
        )?
        else {
            return Ok(());
        };

        let state = if resize {
            DragState::begin_resize(frame, root_x, root_y, start)
        } else {
            DragState::begin_move(frame, root_x, root_y, start)
        };
        debug!("Drag start on {}: {:?}", frame, state.mode);
        self.interaction = Interaction::Dragging(state);
        self.drag_grab = Some(grab);

        self.raise(frame)?;
        self.raise_bars()
    }

    fn on_motion(&mut self, e: MotionNotifyEvent) -> Result<()> {
        let Some(drag) = self.interaction.drag().copied() else {
            return Ok(());
        };
        let geometry = drag.motion(e.root_x as i32, e.root_y as i32);

        if drag.is_resize() {
            self.conn.configure_window(
                drag.frame,
                &ConfigureWindowAux::new()
                    .x(geometry.x)
                    .y(geometry.y)
                    .width(geometry.width)
                    .height(geometry.height),
            )?;
            if let Some(client) = self.registry.client_of(drag.frame) {
                self.conn.configure_window(
                    client,
                    &ConfigureWindowAux::new()
                        .width(geometry.width)
                        .height(geometry.height.saturating_sub(TITLE_HEIGHT)),
                )?;
            }
        } else {
            self.conn.configure_window(
                drag.frame,
                &ConfigureWindowAux::new().x(geometry.x).y(geometry.y),
            )?;
        }

        let (cx, cy) = geometry.center();
        let monitor = self.monitors.monitor_at(cx, cy);
        if let Some(client) = self.registry.state_of_frame_mut(drag.frame) {
            client.monitor = monitor;
            self.focus.monitor = monitor;
        }
        Ok(())
    }

    /// Dragging -> Idle
    fn on_button_release(&mut self) -> Result<()> {
        if let Some(drag) = self.interaction.finish() {
            self.drag_grab = None;
            debug!("Drag on {} finished", drag.frame);
            self.update_bars()?;
        }
        Ok(())
    }

    fn on_enter(&mut self, e: EnterNotifyEvent) -> Result<()> {
        if e.mode != NotifyMode::NORMAL || e.event == self.root || self.monitors.is_bar(e.event) {
            return Ok(());
        }
        let Some(client) = self.registry.client_of(e.event) else {
            return Ok(());
        };
        if self.focus.window != Some(client) {
            self.set_focus(client)?;
            self.update_bars()?;
        }
        Ok(())
    }

    fn on_expose(&mut self, e: ExposeEvent) -> Result<()> {
        if e.count != 0 {
            return Ok(());
        }
        if self.monitors.is_bar(e.window) {
            return self.update_bars();
        }
        if self.registry.client_of(e.window).is_some() {
            self.draw_frame(e.window)?;
        }
        Ok(())
    }

    fn close(&self, window: Window) -> Result<()> {
        let outcome = terminate::close_client(self.conn.as_ref(), &self.atoms, window)?;
        debug!("Close {}: {:?}", window, outcome);
        Ok(())
    }

    fn toggle_fullscreen(&mut self, window: Window) -> Result<()> {
        let Some(frame) = self.registry.frame_of(window) else {
            return Ok(());
        };
        let current = self.frame_geometry(frame)?;
        let Some(client) = self.registry.state_of_mut(window) else {
            return Ok(());
        };
        let monitor = self.monitors.get(client.monitor).geometry;
        let layout = placement::toggle_fullscreen(client, current, monitor);
        let fullscreen = client.fullscreen;

        info!("Client {} fullscreen: {}", window, fullscreen);
        self.apply_layout(window, frame, &layout, fullscreen)?;
        if fullscreen {
            self.raise(frame)?;
        } else {
            self.draw_frame(frame)?;
        }
        self.atoms
            .set_fullscreen_state(self.conn.as_ref(), window, fullscreen)
    }

    fn snap(&mut self, window: Window, direction: SnapDirection) -> Result<()> {
        let Some(frame) = self.registry.frame_of(window) else {
            return Ok(());
        };
        let current = self.frame_geometry(frame)?;
        let Some(client) = self.registry.state_of_mut(window) else {
            return Ok(());
        };
        let usable = self.monitors.usable_area(client.monitor, BAR_HEIGHT);
        let Some(layout) = placement::snap(client, current, usable, direction) else {
            return Ok(());
        };

        debug!("Snap {} {:?} -> {:?}", window, direction, layout.frame);
        self.apply_layout(window, frame, &layout, false)
    }

    /// Move/resize a frame and fit its client inside
    fn apply_layout(&self, window: Window, frame: Window, layout: &FrameLayout, fullscreen: bool) -> Result<()> {
        let f = layout.frame;
        let border = if fullscreen { 0 } else { self.config.border_width };
        self.conn.configure_window(
            frame,
            &ConfigureWindowAux::new()
                .x(f.x)
                .y(f.y)
                .width(f.width)
                .height(f.height)
                .border_width(border),
        )?;
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(0)
                .y(if fullscreen { 0 } else { TITLE_HEIGHT as i32 })
                .width(layout.client_width)
                .height(layout.client_height),
        )?;
        Ok(())
    }

    fn unhide_all(&mut self) -> Result<()> {
        let frames: Vec<Window> = self.registry.iter().filter_map(|c| c.frame).collect();
        debug!("Unhiding {} frame(s)", frames.len());
        for frame in frames {
            self.conn.map_window(frame)?;
        }
        self.raise_bars()?;
        self.update_bars()
    }

    fn set_focus(&mut self, window: Window) -> Result<()> {
        let previous = self.focus.window;
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        self.focus.set(window, &self.registry);
        self.atoms
            .update_active_window(self.conn.as_ref(), self.root, Some(window))?;

        // Border colors follow focus
        for w in [previous, Some(window)].into_iter().flatten() {
            if let Some(frame) = self.registry.frame_of(w) {
                if let Err(e) = self.draw_frame(frame) {
                    trace!("Redraw of frame {} failed: {:#}", frame, e);
                }
            }
        }
        Ok(())
    }

    /// Bring a client forward: optionally map its frame, raise, focus
    fn activate(&mut self, frame: Window, client: Window, map: bool) -> Result<()> {
        if map {
            self.conn.map_window(frame)?;
        }
        self.raise(frame)?;
        self.raise_bars()?;
        self.set_focus(client)?;
        self.update_bars()
    }

    fn raise(&self, window: Window) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn raise_bars(&self) -> Result<()> {
        for bar in self.monitors.bars() {
            self.raise(bar)?;
        }
        Ok(())
    }

    fn open_switcher(&mut self, trigger: Modifiers) -> Result<()> {
        if let Some(session) = self.switcher.session_mut() {
            session.selection.next();
            return self.draw_switcher();
        }
        if self.menu.is_some() || !self.interaction.allows_overlay() {
            return Ok(());
        }

        let stacking = self.conn.query_tree(self.root)?.reply()?.children;
        let mut excluded = self.monitors.bars();
        excluded.push(self.check_window);

        let conn = self.conn.as_ref();
        let atoms = &self.atoms;
        let candidates = cycle::build_candidates(
            &stacking,
            &self.registry,
            &excluded,
            |frame| visibility(conn, frame),
            |client| atoms.get_window_title(conn, client).unwrap_or_default(),
        );

        match cycle::plan_open(candidates.len()) {
            OpenPlan::Nothing => return Ok(()),
            OpenPlan::Immediate => {
                let only = &candidates[0];
                return self.activate(only.frame, only.client, only.hidden);
            }
            OpenPlan::Overlay => {}
        }

        let height = SwitcherSession::height_for(candidates.len());
        let area = self.monitors.get(self.focus.monitor).geometry;
        let overlay = Overlay::open(
            &self.conn,
            self.root,
            overlay::centered(area, cycle::ALT_TAB_WIDTH, height),
            self.config.colors.border,
            self.config.colors.bar,
            EventMask::EXPOSURE | EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
            &self.font,
        )?;
        let Some(grab) = KeyboardGrab::acquire(&self.conn, self.root)? else {
            warn!("Switcher aborted: keyboard unavailable");
            return Ok(());
        };

        debug!("Switcher open with {} candidate(s)", candidates.len());
        self.switcher = Switcher::Open(SwitcherSession {
            grab,
            overlay,
            selection: Selection::for_switcher(candidates.len()),
            candidates,
            trigger_keysyms: cycle::trigger_keysyms(trigger),
        });
        self.draw_switcher()
    }

    /// Input while the switcher is open. Returns true when consumed.
    fn switcher_event(&mut self, event: &WmEvent) -> Result<bool> {
        let Some(session) = self.switcher.session_mut() else {
            return Ok(false);
        };

        match event {
            WmEvent::Expose(e) if e.window == session.overlay.window => {
                self.draw_switcher()?;
            }
            WmEvent::KeyPress(e) => {
                let keysym = self.keymap.keysym(e.detail);
                let state = u16::from(e.state);
                let retrigger = self
                    .config
                    .keybindings
                    .resolve(keysym, state)
                    .is_some_and(|b| b.action == Action::AltTab);
                let key = if retrigger {
                    ListKey::Next
                } else {
                    cycle::classify_key(keysym, state)
                };

                match key {
                    ListKey::Next => session.selection.next(),
                    ListKey::Prev => session.selection.prev(),
                    ListKey::Confirm => return self.confirm_switcher().map(|_| true),
                    ListKey::Cancel => {
                        debug!("Switcher cancelled");
                        self.switcher.take();
                        return Ok(true);
                    }
                    ListKey::Ignore => return Ok(true),
                }
                self.draw_switcher()?;
            }
            WmEvent::KeyRelease(e) => {
                let keysym = self.keymap.keysym(e.detail);
                if session.trigger_keysyms.contains(&keysym) {
                    let keycodes: Vec<u8> = session
                        .trigger_keysyms
                        .iter()
                        .flat_map(|&sym| self.keymap.keycodes(sym))
                        .collect();
                    let pressed = self.conn.query_keymap()?.reply()?;
                    if !cycle::any_pressed(&pressed.keys, &keycodes) {
                        self.confirm_switcher()?;
                    }
                }
            }
            WmEvent::ButtonPress(_)
            | WmEvent::ButtonRelease(_)
            | WmEvent::Motion(_)
            | WmEvent::Enter(_) => {}
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn confirm_switcher(&mut self) -> Result<()> {
        let Some(session) = self.switcher.take() else {
            return Ok(());
        };
        let chosen = session.selected().cloned();
        // Keyboard released, overlay destroyed
        drop(session);

        if let Some(c) = chosen {
            if self.registry.client_of(c.frame) == Some(c.client) {
                debug!("Switching to {} ({:?})", c.client, c.name);
                self.activate(c.frame, c.client, c.hidden)?;
            }
        }
        self.update_bars()
    }

    fn draw_switcher(&self) -> Result<()> {
        let Some(session) = self.switcher.session() else {
            return Ok(());
        };
        let conn = self.conn.as_ref();
        let colors = &self.config.colors;
        let window = session.overlay.window;
        let gc = session.overlay.gc;
        let width = cycle::ALT_TAB_WIDTH;
        let height = session.overlay.height;
        let pad = cycle::ALT_TAB_PADDING;
        let item_h = cycle::ALT_TAB_ITEM_H;

        decorations::fill(conn, window, gc, colors.bar, rect(0, 0, width, height))?;

        for (i, candidate) in session.candidates.iter().enumerate() {
            let y = (pad + i as u32 * item_h) as i16;
            let selected = i == session.selection.index();
            if selected {
                decorations::fill(
                    conn,
                    window,
                    gc,
                    colors.highlight,
                    rect(pad as i16, y, width - pad * 2, item_h - 4),
                )?;
            }

            let label = if candidate.hidden {
                format!(" {}.  [hidden] {}", i + 1, candidate.name)
            } else {
                format!(" {}.  {}", i + 1, candidate.name)
            };
            let label = self.font.truncate(&label, width as i32 - 40);
            decorations::draw_text(
                conn,
                window,
                gc,
                &self.font,
                if candidate.hidden { DIM_TEXT } else { colors.text },
                if selected { colors.highlight } else { colors.bar },
                15,
                y + self.font.baseline(item_h as i32) - 1,
                &label,
            )?;
        }

        decorations::outline(
            conn,
            window,
            gc,
            colors.border,
            rect(0, 0, width - 1, height - 1),
        )?;
        conn.flush()?;
        Ok(())
    }

    fn open_menu(&mut self) -> Result<()> {
        if self.menu.is_some() || self.switcher.is_open() || !self.interaction.allows_overlay() {
            return Ok(());
        }

        let conn = self.conn.as_ref();
        let atoms = &self.atoms;
        let entries = menu::hidden_entries(
            &self.registry,
            |frame| visibility(conn, frame),
            |client| atoms.get_window_title(conn, client).unwrap_or_default(),
        );
        if entries.is_empty() {
            debug!("No hidden windows");
            return Ok(());
        }

        let area = self.monitors.get(self.focus.monitor).geometry;
        let height = entries.len() as u32 * menu::MENU_ITEM_H;
        let overlay = Overlay::open(
            &self.conn,
            self.root,
            overlay::centered(area, menu::MENU_WIDTH, height),
            self.config.colors.border,
            self.config.colors.bar,
            EventMask::EXPOSURE
                | EventMask::POINTER_MOTION
                | EventMask::BUTTON_PRESS
                | EventMask::KEY_PRESS,
            &self.font,
        )?;
        let pointer = PointerGrab::acquire(
            &self.conn,
            overlay.window,
            EventMask::BUTTON_PRESS | EventMask::POINTER_MOTION,
            true,
        )?;
        let Some(keyboard) = KeyboardGrab::acquire(&self.conn, overlay.window)? else {
            warn!("Menu aborted: keyboard unavailable");
            return Ok(());
        };

        debug!("Menu open with {} hidden window(s)", entries.len());
        self.menu = Some(MenuSession {
            keyboard,
            pointer,
            overlay,
            selection: Selection::first(entries.len()),
            entries,
        });
        self.draw_menu()
    }

    /// Input while the menu is open. Returns true when consumed.
    fn menu_event(&mut self, event: &WmEvent) -> Result<bool> {
        let Some(session) = self.menu.as_mut() else {
            return Ok(false);
        };

        match event {
            WmEvent::Expose(e) if e.window == session.overlay.window => self.draw_menu()?,
            WmEvent::Motion(e) => {
                if e.event == session.overlay.window && session.hover(e.event_y as i32) {
                    self.draw_menu()?;
                }
            }
            WmEvent::ButtonPress(_) => self.confirm_menu()?,
            WmEvent::KeyPress(e) => match menu::classify_menu_key(self.keymap.keysym(e.detail)) {
                ListKey::Next => {
                    session.selection.next();
                    self.draw_menu()?;
                }
                ListKey::Prev => {
                    session.selection.prev();
                    self.draw_menu()?;
                }
                ListKey::Confirm => self.confirm_menu()?,
                ListKey::Cancel => {
                    debug!("Menu cancelled");
                    self.menu = None;
                    self.update_bars()?;
                }
                ListKey::Ignore => {}
            },
            WmEvent::KeyRelease(_) | WmEvent::ButtonRelease(_) | WmEvent::Enter(_) => {}
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn confirm_menu(&mut self) -> Result<()> {
        let Some(session) = self.menu.take() else {
            return Ok(());
        };
        let chosen = session.selected().cloned();
        drop(session);

        if let Some(entry) = chosen {
            if self.registry.client_of(entry.frame) == Some(entry.client) {
                debug!("Restoring hidden {} ({:?})", entry.client, entry.name);
                self.activate(entry.frame, entry.client, true)?;
            }
        }
        self.update_bars()
    }

    fn draw_menu(&self) -> Result<()> {
        let Some(session) = self.menu.as_ref() else {
            return Ok(());
        };
        let conn = self.conn.as_ref();
        let colors = &self.config.colors;
        let window = session.overlay.window;
        let gc = session.overlay.gc;
        let width = menu::MENU_WIDTH;
        let item_h = menu::MENU_ITEM_H;

        for (i, entry) in session.entries.iter().enumerate() {
            let y = (i as u32 * item_h) as i16;
            let bg = if i == session.selection.index() {
                colors.highlight
            } else {
                colors.bar
            };
            decorations::fill(conn, window, gc, bg, rect(0, y, width, item_h))?;
            let name = self.font.truncate(&entry.name, width as i32 - 20);
            decorations::draw_text(
                conn,
                window,
                gc,
                &self.font,
                colors.text,
                bg,
                10,
                y + self.font.baseline(item_h as i32),
                &name,
            )?;
            let bottom = y + item_h as i16 - 1;
            decorations::line(
                conn,
                window,
                gc,
                colors.border,
                &[Segment {
                    x1: 0,
                    y1: bottom,
                    x2: width as i16,
                    y2: bottom,
                }],
            )?;
        }
        conn.flush()?;
        Ok(())
    }

    fn draw_frame(&self, frame: Window) -> Result<()> {
        let Some(client) = self.registry.state_of_frame(frame) else {
            return Ok(());
        };
        if client.fullscreen {
            return Ok(());
        }
        let geometry = self.frame_geometry(frame)?;
        let title = self
            .atoms
            .get_window_title(self.conn.as_ref(), client.window)
            .unwrap_or_default();
        let style = FrameStyle {
            colors: &self.config.colors,
            font: &self.font,
            focused: self.focus.window == Some(client.window),
        };
        decorations::draw_frame(
            self.conn.as_ref(),
            frame,
            self.gc,
            geometry.width,
            geometry.height,
            &title,
            &style,
        )
    }

    /// Repaint every status bar
    fn update_bars(&self) -> Result<()> {
        let title = self
            .focus
            .window
            .and_then(|w| self.atoms.get_window_title(self.conn.as_ref(), w).ok());
        let clock = bar::clock_text();
        let ram = bar::used_ram_mb();
        let count = self.monitors.len();

        for (i, monitor) in self.monitors.iter().enumerate() {
            let Some(window) = monitor.bar else {
                continue;
            };
            let text = bar::format_status(i, count, title.as_deref(), &clock, ram);
            bar::draw_bar(
                self.conn.as_ref(),
                window,
                self.gc,
                monitor.geometry.width,
                &BarContent {
                    text: &text,
                    active: i == self.focus.monitor,
                },
                &self.config.colors,
                &self.font,
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }

    fn update_client_list(&self) -> Result<()> {
        self.atoms
            .update_client_list(self.conn.as_ref(), self.root, &self.registry.windows())
    }

    fn frame_geometry(&self, frame: Window) -> Result<Geometry> {
        let reply = self.conn.get_geometry(frame)?.reply()?;
        Ok(Geometry::new(
            reply.x as i32,
            reply.y as i32,
            reply.width as u32,
            reply.height as u32,
        ))
    }

    /// Release grabs, close overlays, and destroy everything we created
    pub fn shutdown(&mut self) {
        info!("Shutting down, {} client(s) managed", self.registry.len());
        self.switcher.take();
        self.menu = None;
        self.interaction.finish();
        self.drag_grab = None;

        for bar in self.monitors.bars() {
            let _ = self.conn.destroy_window(bar);
        }
        for monitor in self.monitors.iter_mut() {
            monitor.bar = None;
        }
        let _ = self.conn.destroy_window(self.check_window);
        let _ = self.conn.free_gc(self.gc);
        self.font.close(self.conn.as_ref());
        let _ = self.conn.flush();
    }
}

/// Map state of a window, `None` if it is gone
fn visibility<C: Connection>(conn: &C, window: Window) -> Option<Visibility> {
    let attrs = conn.get_window_attributes(window).ok()?.reply().ok()?;
    Some(Visibility::from(attrs.map_state))
}

fn set_root_cursor<C: Connection>(conn: &C, root: Window) -> Result<()> {
    let font = conn.generate_id()?;
    conn.open_font(font, b"cursor")?;
    let cursor = conn.generate_id()?;
    conn.create_glyph_cursor(
        cursor,
        font,
        font,
        LEFT_PTR_GLYPH,
        LEFT_PTR_GLYPH + 1,
        0,
        0,
        0,
        0xffff,
        0xffff,
        0xffff,
    )?;
    conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().cursor(cursor))?;
    conn.free_cursor(cursor)?;
    conn.close_font(font)?;
    Ok(())
}

/// Run `command` through the shell in its own session
fn spawn(command: &str) {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    // SAFETY: setsid is async-signal-safe and touches no parent state
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()?;
            Ok(())
        });
    }

    match cmd.spawn() {
        Ok(child) => info!("Spawned {:?} (pid {})", command, child.id()),
        Err(e) => warn!("Failed to spawn {:?}: {}", command, e),
    }
}
