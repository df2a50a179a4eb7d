//! Events Module
//!
//! The events the manager reacts to, narrowed from the full X11 event set,
//! plus motion coalescing for a drained batch.

use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;

/// Event kinds the dispatcher handles; everything else is dropped on intake
pub enum WmEvent {
    MapRequest(MapRequestEvent),
    Unmap(UnmapNotifyEvent),
    Destroy(DestroyNotifyEvent),
    Configure(ConfigureRequestEvent),
    ClientMessage(ClientMessageEvent),
    KeyPress(KeyPressEvent),
    /// Only consumed while the switcher is open (modifier release confirms)
    KeyRelease(KeyReleaseEvent),
    ButtonPress(ButtonPressEvent),
    Motion(MotionNotifyEvent),
    ButtonRelease(ButtonReleaseEvent),
    Expose(ExposeEvent),
    Enter(EnterNotifyEvent),
}

impl WmEvent {
    /// Narrow a raw event; `None` for kinds the manager ignores
    pub fn from_x11(event: Event) -> Option<Self> {
        Some(match event {
            Event::MapRequest(e) => WmEvent::MapRequest(e),
            Event::UnmapNotify(e) => WmEvent::Unmap(e),
            Event::DestroyNotify(e) => WmEvent::Destroy(e),
            Event::ConfigureRequest(e) => WmEvent::Configure(e),
            Event::ClientMessage(e) => WmEvent::ClientMessage(e),
            Event::KeyPress(e) => WmEvent::KeyPress(e),
            Event::KeyRelease(e) => WmEvent::KeyRelease(e),
            Event::ButtonPress(e) => WmEvent::ButtonPress(e),
            Event::MotionNotify(e) => WmEvent::Motion(e),
            Event::ButtonRelease(e) => WmEvent::ButtonRelease(e),
            Event::Expose(e) => WmEvent::Expose(e),
            Event::EnterNotify(e) => WmEvent::Enter(e),
            _ => return None,
        })
    }

    pub fn is_motion(&self) -> bool {
        matches!(self, WmEvent::Motion(_))
    }

    /// Map, unmap, destroy and configure must each be reconciled
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            WmEvent::MapRequest(_)
                | WmEvent::Unmap(_)
                | WmEvent::Destroy(_)
                | WmEvent::Configure(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            WmEvent::MapRequest(_) => "MapRequest",
            WmEvent::Unmap(_) => "UnmapNotify",
            WmEvent::Destroy(_) => "DestroyNotify",
            WmEvent::Configure(_) => "ConfigureRequest",
            WmEvent::ClientMessage(_) => "ClientMessage",
            WmEvent::KeyPress(_) => "KeyPress",
            WmEvent::KeyRelease(_) => "KeyRelease",
            WmEvent::ButtonPress(_) => "ButtonPress",
            WmEvent::Motion(_) => "MotionNotify",
            WmEvent::ButtonRelease(_) => "ButtonRelease",
            WmEvent::Expose(_) => "Expose",
            WmEvent::Enter(_) => "EnterNotify",
        }
    }
}

/// Drop every motion sample that is immediately followed by another one.
///
/// Each sample carries an absolute pointer position, so a run of motions
/// collapses to its last member. Nothing else is reordered or removed.
pub fn coalesce_motion<T>(events: Vec<T>, is_motion: impl Fn(&T) -> bool) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(events.len());
    for event in events {
        if is_motion(&event) && out.last().is_some_and(&is_motion) {
            out.pop();
        }
        out.push(event);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ev {
        Motion(i32),
        Map(u32),
        Release,
    }

    fn motion(e: &Ev) -> bool {
        matches!(e, Ev::Motion(_))
    }

    #[test]
    fn test_run_of_motion_keeps_latest() {
        let out = coalesce_motion(
            vec![Ev::Motion(1), Ev::Motion(2), Ev::Motion(3), Ev::Release],
            motion,
        );
        assert_eq!(out, vec![Ev::Motion(3), Ev::Release]);
    }

    #[test]
    fn test_structural_events_break_runs() {
        let out = coalesce_motion(
            vec![
                Ev::Motion(1),
                Ev::Map(7),
                Ev::Motion(2),
                Ev::Motion(3),
                Ev::Map(8),
                Ev::Map(8),
            ],
            motion,
        );
        assert_eq!(
            out,
            vec![Ev::Motion(1), Ev::Map(7), Ev::Motion(3), Ev::Map(8), Ev::Map(8)]
        );
    }

    #[test]
    fn test_empty_and_single() {
        assert!(coalesce_motion(Vec::<Ev>::new(), motion).is_empty());
        assert_eq!(coalesce_motion(vec![Ev::Motion(5)], motion), vec![Ev::Motion(5)]);
    }
}
