//! Control events → queued key events.
//!
//! [`Router`] owns the mapping table, the "modifier held" flag, and a FIFO of
//! [`KeyEvent`]s. The MIDI backend pushes into it through [`Router::handler`] on its own
//! thread; the render loop drains it with [`Router::fetch_event`] once per tick.
//!
//! Routing one event:
//! 1. If the control is the modifier button, remember whether it is held.
//! 2. Look the control up in the table; unmapped controls are dropped.
//! 3. If the key is the quick-save key and the modifier is held, use quick-load instead.
//! 4. Append `{key, pressed}` to the queue.
//!
//! The queue is bounded by [`MAX_QUEUED_EVENTS`] and allocated up front, so the input
//! callback never grows it. Past that limit new events are dropped.

use crate::binding::MappingTable;
use crate::control::{ControlIo, Intensity};
use crate::device::MidiSink;
use crate::error::Result;
use crate::event::{ButtonId, ControlEvent, ControlId, KeyEvent, LogicalKey};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Safety valve: maximum number of key events waiting for the render loop.
pub const MAX_QUEUED_EVENTS: usize = 1024;

/// Router behaviour that is not part of the table itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterSettings {
    /// Button that turns quick-save into quick-load while held.
    pub modifier: ButtonId,
    pub quick_save: LogicalKey,
    pub quick_load: LogicalKey,
    /// Light for mapped controls without their own intensity, and for the modifier.
    pub default_intensity: Intensity,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            modifier: ButtonId(49),
            quick_save: crate::event::keys::F6,
            quick_load: crate::event::keys::F9,
            default_intensity: crate::binding::DEFAULT_INTENSITY,
        }
    }
}

struct RouterState {
    table: MappingTable,
    settings: RouterSettings,
    modifier_held: bool,
    queue: VecDeque<KeyEvent>,
}

impl RouterState {
    fn route(&mut self, event: ControlEvent) {
        if event.id == ControlId::Button(self.settings.modifier) {
            self.modifier_held = event.pressed;
        }

        let Some(mapping) = self.table.lookup(event.id) else {
            return;
        };

        let key = if mapping.key == self.settings.quick_save && self.modifier_held {
            self.settings.quick_load
        } else {
            mapping.key
        };

        if self.queue.len() >= MAX_QUEUED_EVENTS {
            log::warn!("key queue full, dropping {:?} from {}", key, event.id);
            return;
        }

        #[cfg(feature = "debug-log")]
        log::debug!("{} -> {:?} pressed={}", event.id, key, event.pressed);

        self.queue.push_back(KeyEvent {
            key,
            pressed: event.pressed,
        });
    }
}

/// Shared key-event router. Clones refer to the same queue.
#[derive(Clone)]
pub struct Router {
    state: Arc<Mutex<RouterState>>,
}

impl Router {
    pub fn new(table: MappingTable, settings: RouterSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(RouterState {
                table,
                settings,
                modifier_held: false,
                queue: VecDeque::with_capacity(MAX_QUEUED_EVENTS),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Route one decoded control event.
    pub fn route(&self, event: ControlEvent) {
        self.lock().route(event);
    }

    /// Callback suitable for [`ControlIo::new`].
    pub fn handler(&self) -> impl FnMut(ControlEvent) + Send + 'static {
        let router = self.clone();
        move |event| router.route(event)
    }

    /// Oldest pending key event, if any. Never blocks on input.
    pub fn fetch_event(&self) -> Option<KeyEvent> {
        self.lock().queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn modifier_held(&self) -> bool {
        self.lock().modifier_held
    }

    /// Light every mapped control plus the modifier button.
    pub fn light_controls<O: MidiSink>(&self, control: &mut ControlIo<O>) -> Result<()> {
        let (lights, settings) = {
            let state = self.lock();
            let lights: Vec<(ControlId, Intensity)> = state
                .table
                .iter()
                .map(|m| {
                    (
                        m.control,
                        m.intensity.unwrap_or(state.settings.default_intensity),
                    )
                })
                .collect();
            (lights, state.settings)
        };

        for (id, intensity) in lights {
            control.set_light(id, intensity)?;
        }
        control.set_button_light(settings.modifier, settings.default_intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{RecordingMidiOut, VirtualMidiIn};
    use crate::binding::InputMapping;
    use crate::event::{keys, PadId};

    fn router() -> Router {
        Router::new(MappingTable::default(), RouterSettings::default())
    }

    fn press(id: impl Into<ControlId>) -> ControlEvent {
        ControlEvent {
            id: id.into(),
            pressed: true,
        }
    }

    fn release(id: impl Into<ControlId>) -> ControlEvent {
        ControlEvent {
            id: id.into(),
            pressed: false,
        }
    }

    fn drain(router: &Router) -> Vec<KeyEvent> {
        std::iter::from_fn(|| router.fetch_event()).collect()
    }

    #[test]
    fn fire_pad_press_and_release() {
        let router = router();
        router.route(press(PadId::grid(0, 3)));
        router.route(release(PadId::grid(0, 3)));
        assert_eq!(
            drain(&router),
            vec![
                KeyEvent { key: keys::FIRE, pressed: true },
                KeyEvent { key: keys::FIRE, pressed: false },
            ]
        );
    }

    #[test]
    fn save_button_maps_to_quick_save() {
        let router = router();
        router.route(press(ButtonId(82)));
        assert_eq!(
            router.fetch_event(),
            Some(KeyEvent { key: keys::F6, pressed: true })
        );
    }

    #[test]
    fn save_with_modifier_held_maps_to_quick_load() {
        let router = router();
        router.route(press(ButtonId(49)));
        assert!(router.modifier_held());
        router.route(press(ButtonId(82)));
        router.route(release(ButtonId(82)));
        router.route(release(ButtonId(49)));
        router.route(press(ButtonId(82)));

        assert_eq!(
            drain(&router),
            vec![
                KeyEvent { key: keys::F9, pressed: true },
                KeyEvent { key: keys::F9, pressed: false },
                KeyEvent { key: keys::F6, pressed: true },
            ]
        );
        assert!(!router.modifier_held());
    }

    #[test]
    fn modifier_does_not_affect_other_keys() {
        let router = router();
        router.route(press(ButtonId(49)));
        router.route(press(ButtonId(91)));
        assert_eq!(
            drain(&router),
            vec![KeyEvent { key: keys::ENTER, pressed: true }]
        );
    }

    #[test]
    fn unmapped_controls_queue_nothing() {
        let router = router();
        router.route(press(PadId::grid(7, 7)));
        router.route(press(ButtonId(3)));
        router.route(release(ButtonId(49)));
        assert_eq!(router.pending(), 0);
        assert_eq!(router.fetch_event(), None);
    }

    #[test]
    fn empty_queue_stays_empty() {
        let router = router();
        assert_eq!(router.fetch_event(), None);
        assert_eq!(router.fetch_event(), None);
        assert_eq!(router.pending(), 0);
    }

    #[test]
    fn events_come_out_in_enqueue_order() {
        let router = router();
        router.route(press(PadId::grid(5, 3)));
        router.route(press(ButtonId(33)));
        router.route(release(PadId::grid(5, 3)));
        router.route(release(ButtonId(33)));
        assert_eq!(
            drain(&router),
            vec![
                KeyEvent { key: keys::LEFT_ARROW, pressed: true },
                KeyEvent { key: keys::ESCAPE, pressed: true },
                KeyEvent { key: keys::LEFT_ARROW, pressed: false },
                KeyEvent { key: keys::ESCAPE, pressed: false },
            ]
        );
    }

    #[test]
    fn repeated_presses_are_not_merged() {
        let router = router();
        for _ in 0..3 {
            router.route(press(PadId::grid(0, 3)));
        }
        assert_eq!(router.pending(), 3);
    }

    #[test]
    fn queue_is_bounded() {
        let router = router();
        for _ in 0..MAX_QUEUED_EVENTS + 10 {
            router.route(press(PadId::grid(0, 3)));
        }
        assert_eq!(router.pending(), MAX_QUEUED_EVENTS);
    }

    #[test]
    fn lights_mapped_controls_and_modifier() {
        let table = MappingTable::new(vec![
            InputMapping::new(PadId::grid(0, 3).into(), keys::FIRE),
            InputMapping::new(ButtonId(91).into(), keys::ENTER).with_intensity(7),
        ])
        .unwrap();
        let router = Router::new(table, RouterSettings::default());

        let out = RecordingMidiOut::new();
        let mut io = ControlIo::new(VirtualMidiIn::new(), out.clone(), router.handler()).unwrap();
        out.clear();
        router.light_controls(&mut io).unwrap();

        assert_eq!(
            out.sent(),
            vec![vec![0x90, 68, 122], vec![0xb0, 91, 7], vec![0xb0, 49, 122]]
        );
    }
}
