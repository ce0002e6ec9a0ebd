//! Tuning changes driven by pedals and other controllers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::MidiEvent;

/// Soft pedal
pub const DEFAULT_PREVIOUS_CC: u8 = 67;
/// Sostenuto pedal
pub const DEFAULT_NEXT_CC: u8 = 66;
pub const DEFAULT_THRESHOLD: u8 = 64;

/// Navigation requested by a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningChangeRequest {
    /// Previous tuning, wrapping to the last.
    Previous,
    /// Next tuning, wrapping to the first.
    Next,
    /// Jump to an index, clamped to the last tuning.
    Index(usize),
}

/// Configuration of a tuning changer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedalSettings {
    pub kind: String,
    pub previous_controller: Option<u8>,
    pub next_controller: Option<u8>,
    /// Controller `i` jumps to tuning `i`.
    pub index_controllers: Vec<u8>,
    /// `None` listens on every channel.
    pub channel: Option<u8>,
    /// Values at or above count as pressed; 1-127.
    pub threshold: u8,
    /// Pass trigger messages on to the output.
    pub forward_triggers: bool,
}

impl Default for PedalSettings {
    fn default() -> Self {
        Self {
            kind: "pedal".to_string(),
            previous_controller: Some(DEFAULT_PREVIOUS_CC),
            next_controller: Some(DEFAULT_NEXT_CC),
            index_controllers: Vec::new(),
            channel: None,
            threshold: DEFAULT_THRESHOLD,
            forward_triggers: false,
        }
    }
}

/// Edge detector over one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerState {
    controller: u8,
    threshold: u8,
    pressed: bool,
}

impl TriggerState {
    pub fn new(controller: u8, threshold: u8) -> Self {
        Self {
            controller,
            threshold,
            pressed: false,
        }
    }

    pub fn controller(&self) -> u8 {
        self.controller
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Returns true on a released to pressed transition.
    pub fn update(&mut self, value: u8) -> bool {
        let pressed = value >= self.threshold;
        let fired = pressed && !self.pressed;
        self.pressed = pressed;
        fired
    }
}

/// What to do with one incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub request: Option<TuningChangeRequest>,
    pub forward: bool,
}

impl TriggerOutcome {
    const PASS: TriggerOutcome = TriggerOutcome {
        request: None,
        forward: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerAction {
    Previous,
    Next,
    Index(usize),
}

impl TriggerAction {
    fn request(self) -> TuningChangeRequest {
        match self {
            TriggerAction::Previous => TuningChangeRequest::Previous,
            TriggerAction::Next => TuningChangeRequest::Next,
            TriggerAction::Index(i) => TuningChangeRequest::Index(i),
        }
    }
}

/// Turns controller presses into [`TuningChangeRequest`]s.
#[derive(Debug, Clone)]
pub struct PedalTuningChanger {
    triggers: Vec<(TriggerAction, TriggerState)>,
    channel: Option<u8>,
    forward_triggers: bool,
}

const CHANGERS: &[&str] = &["pedal"];

impl PedalTuningChanger {
    pub fn from_settings(settings: &PedalSettings) -> Result<Self> {
        let kind = settings.kind.trim();
        if !CHANGERS.iter().any(|id| id.eq_ignore_ascii_case(kind)) {
            return Err(Error::PluginConfiguration {
                kind: "tuning changer",
                id: kind.to_string(),
            });
        }
        // 0 would hold every trigger pressed forever
        if !(1..=127).contains(&settings.threshold) {
            return Err(Error::InvalidConfig(format!(
                "trigger threshold {} is out of range (1-127)",
                settings.threshold
            )));
        }
        if let Some(channel) = settings.channel.filter(|c| *c > 15) {
            return Err(Error::InvalidConfig(format!(
                "MIDI channel {channel} is out of range (0-15)"
            )));
        }

        let actions = settings
            .previous_controller
            .map(|cc| (TriggerAction::Previous, cc))
            .into_iter()
            .chain(settings.next_controller.map(|cc| (TriggerAction::Next, cc)))
            .chain(
                settings
                    .index_controllers
                    .iter()
                    .enumerate()
                    .map(|(i, cc)| (TriggerAction::Index(i), *cc)),
            );

        let mut triggers: Vec<(TriggerAction, TriggerState)> = Vec::new();
        for (action, controller) in actions {
            if controller > 127 {
                return Err(Error::InvalidConfig(format!(
                    "controller {controller} is out of range (0-127)"
                )));
            }
            if triggers.iter().any(|(_, t)| t.controller == controller) {
                return Err(Error::InvalidConfig(format!(
                    "controller {controller} is assigned to more than one trigger"
                )));
            }
            triggers.push((action, TriggerState::new(controller, settings.threshold)));
        }

        Ok(Self {
            triggers,
            channel: settings.channel,
            forward_triggers: settings.forward_triggers,
        })
    }

    pub fn process(&mut self, event: &MidiEvent) -> TriggerOutcome {
        let Some((controller, value)) = event.controller() else {
            return TriggerOutcome::PASS;
        };
        if self.channel.is_some_and(|c| c != event.channel_num()) {
            return TriggerOutcome::PASS;
        }
        let Some((action, state)) = self
            .triggers
            .iter_mut()
            .find(|(_, t)| t.controller == controller)
        else {
            return TriggerOutcome::PASS;
        };

        let request = state.update(value).then(|| action.request());
        if let Some(request) = request {
            debug!(?request, controller, value, "Tuning change triggered");
        }
        TriggerOutcome {
            request,
            forward: self.forward_triggers,
        }
    }

    /// Releases every trigger.
    pub fn reset(&mut self) {
        for (_, state) in &mut self.triggers {
            state.pressed = false;
        }
    }
}

impl Default for PedalTuningChanger {
    fn default() -> Self {
        Self {
            triggers: vec![
                (
                    TriggerAction::Previous,
                    TriggerState::new(DEFAULT_PREVIOUS_CC, DEFAULT_THRESHOLD),
                ),
                (
                    TriggerAction::Next,
                    TriggerState::new(DEFAULT_NEXT_CC, DEFAULT_THRESHOLD),
                ),
            ],
            channel: None,
            forward_triggers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(channel: u8, controller: u8, value: u8) -> MidiEvent {
        MidiEvent::control_change(channel, controller, value)
    }

    #[test]
    fn test_trigger_state_edges() {
        let mut state = TriggerState::new(66, 64);
        assert!(!state.update(10));
        assert!(state.update(64));
        assert!(state.is_pressed());
        assert!(!state.update(127));
        assert!(!state.update(63));
        assert!(state.update(100));
    }

    #[test]
    fn test_next_and_previous() {
        let mut changer = PedalTuningChanger::default();
        let outcome = changer.process(&cc(0, 66, 127));
        assert_eq!(outcome.request, Some(TuningChangeRequest::Next));
        assert!(!outcome.forward);

        // held pedal does not repeat
        assert_eq!(changer.process(&cc(0, 66, 120)).request, None);
        assert_eq!(changer.process(&cc(0, 66, 0)).request, None);
        assert_eq!(
            changer.process(&cc(3, 67, 90)).request,
            Some(TuningChangeRequest::Previous)
        );
    }

    #[test]
    fn test_other_messages_pass() {
        let mut changer = PedalTuningChanger::default();
        assert_eq!(changer.process(&cc(0, 64, 127)), TriggerOutcome::PASS);
        assert_eq!(
            changer.process(&MidiEvent::note_on(0, 60, 100)),
            TriggerOutcome::PASS
        );
    }

    #[test]
    fn test_index_controllers_and_forwarding() {
        let settings = PedalSettings {
            previous_controller: None,
            next_controller: None,
            index_controllers: vec![20, 21, 22],
            forward_triggers: true,
            ..Default::default()
        };
        let mut changer = PedalTuningChanger::from_settings(&settings).unwrap();
        let outcome = changer.process(&cc(0, 22, 127));
        assert_eq!(outcome.request, Some(TuningChangeRequest::Index(2)));
        assert!(outcome.forward);
        assert_eq!(changer.process(&cc(0, 66, 127)), TriggerOutcome::PASS);
    }

    #[test]
    fn test_channel_filter() {
        let settings = PedalSettings {
            channel: Some(2),
            ..Default::default()
        };
        let mut changer = PedalTuningChanger::from_settings(&settings).unwrap();
        assert_eq!(changer.process(&cc(0, 66, 127)), TriggerOutcome::PASS);
        assert_eq!(
            changer.process(&cc(2, 66, 127)).request,
            Some(TuningChangeRequest::Next)
        );
    }

    #[test]
    fn test_threshold() {
        let settings = PedalSettings {
            threshold: 1,
            ..Default::default()
        };
        let mut changer = PedalTuningChanger::from_settings(&settings).unwrap();
        assert!(changer.process(&cc(0, 66, 1)).request.is_some());

        changer.reset();
        assert!(changer.process(&cc(0, 66, 5)).request.is_some());

        for threshold in [0, 128] {
            let settings = PedalSettings {
                threshold,
                ..Default::default()
            };
            assert!(matches!(
                PedalTuningChanger::from_settings(&settings),
                Err(Error::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_invalid_settings() {
        let unknown = PedalSettings {
            kind: "footswitch-matrix".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PedalTuningChanger::from_settings(&unknown),
            Err(Error::PluginConfiguration { kind: "tuning changer", .. })
        ));

        let duplicate = PedalSettings {
            index_controllers: vec![66],
            ..Default::default()
        };
        assert!(matches!(
            PedalTuningChanger::from_settings(&duplicate),
            Err(Error::InvalidConfig(_))
        ));

        let channel = PedalSettings {
            channel: Some(16),
            ..Default::default()
        };
        assert!(PedalTuningChanger::from_settings(&channel).is_err());
    }

    #[test]
    fn test_settings_from_json() {
        let settings: PedalSettings =
            serde_json::from_str(r#"{"next_controller": 80, "forward_triggers": true}"#).unwrap();
        assert_eq!(settings.next_controller, Some(80));
        assert_eq!(settings.previous_controller, Some(DEFAULT_PREVIOUS_CC));
        assert_eq!(settings.threshold, 64);
        assert!(settings.forward_triggers);
    }
}
