//! Monophonic pitch-bend tuning.
//!
//! Each configured channel plays one note at a time; the deviation of the
//! sounding note's pitch class is applied as a channel pitch bend. Held notes
//! are kept on a stack so releasing the top note falls back to the one below.

use midi_msg::ChannelVoiceMsg;
use smallvec::SmallVec;
use tracing::{debug, warn};

use xentune_tuning::{PitchClass, Tuning, SEMITONE_CENTS};

use crate::error::{Error, Result};
use crate::event::MidiEvent;
use crate::output::{MidiOutputMessage, MidiSink};

pub const PITCH_BEND_CENTER: u16 = 8192;
const PITCH_BEND_MAX: u16 = 16383;

/// Pitch-bend sensitivity most devices power up with.
pub const DEFAULT_SENSITIVITY: PitchBendSensitivity = PitchBendSensitivity {
    semitones: 2,
    cents: 0,
};

// Registered parameter numbers
const CC_RPN_MSB: u8 = 101;
const CC_RPN_LSB: u8 = 100;
const CC_DATA_ENTRY_MSB: u8 = 6;
const CC_DATA_ENTRY_LSB: u8 = 38;
const RPN_NULL: u8 = 127;

/// Range of a full pitch-bend deflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchBendSensitivity {
    pub semitones: u8,
    pub cents: u8,
}

impl PitchBendSensitivity {
    pub fn new(semitones: u8, cents: u8) -> Result<Self> {
        if semitones > 127 || cents > 127 {
            return Err(Error::InvalidConfig(format!(
                "pitch bend sensitivity {semitones} semitones {cents} cents exceeds 7-bit range"
            )));
        }
        if semitones == 0 && cents == 0 {
            return Err(Error::InvalidConfig(
                "pitch bend sensitivity must be greater than zero".to_string(),
            ));
        }
        Ok(Self { semitones, cents })
    }

    pub fn range_cents(self) -> f64 {
        self.semitones as f64 * SEMITONE_CENTS + self.cents as f64
    }

    /// Pitch-bend value that shifts a note by `deviation_cents`.
    pub fn bend_for(self, deviation_cents: f64) -> u16 {
        let offset = (deviation_cents / self.range_cents() * PITCH_BEND_CENTER as f64).round();
        let bend = PITCH_BEND_CENTER as f64 + offset;
        if !(0.0..=PITCH_BEND_MAX as f64).contains(&bend) {
            warn!(
                deviation_cents,
                range_cents = self.range_cents(),
                "Deviation exceeds pitch bend sensitivity, clamping"
            );
        }
        bend.clamp(0.0, PITCH_BEND_MAX as f64) as u16
    }

    /// RPN 0,0 sequence programming this sensitivity, closed with RPN null.
    pub fn rpn_messages(self, channel: u8) -> [MidiOutputMessage; 6] {
        [
            MidiOutputMessage::control_change(channel, CC_RPN_MSB, 0),
            MidiOutputMessage::control_change(channel, CC_RPN_LSB, 0),
            MidiOutputMessage::control_change(channel, CC_DATA_ENTRY_MSB, self.semitones),
            MidiOutputMessage::control_change(channel, CC_DATA_ENTRY_LSB, self.cents),
            MidiOutputMessage::control_change(channel, CC_RPN_MSB, RPN_NULL),
            MidiOutputMessage::control_change(channel, CC_RPN_LSB, RPN_NULL),
        ]
    }
}

impl Default for PitchBendSensitivity {
    fn default() -> Self {
        DEFAULT_SENSITIVITY
    }
}

/// Held notes and the bend currently applied on one channel.
///
/// The bend on the wire is the tuning bend of the sounding note plus the
/// performer's wheel offset.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteState {
    held: SmallVec<[u8; 8]>,
    bend: u16,
    tuning_bend: u16,
    wheel: i32,
}

impl NoteState {
    pub fn new() -> Self {
        Self {
            held: SmallVec::new(),
            bend: PITCH_BEND_CENTER,
            tuning_bend: PITCH_BEND_CENTER,
            wheel: 0,
        }
    }

    /// Note that currently sounds.
    pub fn top(&self) -> Option<u8> {
        self.held.last().copied()
    }

    pub fn held(&self) -> &[u8] {
        &self.held
    }

    /// Bend last sent on the channel.
    pub fn bend(&self) -> u16 {
        self.bend
    }

    /// Performer's pitch-wheel offset from center.
    pub fn wheel(&self) -> i32 {
        self.wheel
    }

    fn combined(&self) -> u16 {
        (self.tuning_bend as i32 + self.wheel).clamp(0, PITCH_BEND_MAX as i32) as u16
    }

    fn push(&mut self, note: u8) {
        self.remove(note);
        self.held.push(note);
    }

    fn remove(&mut self, note: u8) -> bool {
        match self.held.iter().position(|&n| n == note) {
            Some(i) => {
                self.held.remove(i);
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for NoteState {
    fn default() -> Self {
        Self::new()
    }
}

/// Retunes monophonic lines with channel pitch bend.
#[derive(Debug, Clone)]
pub struct MonoPitchBendTuner {
    sensitivity: PitchBendSensitivity,
    /// Indexed by channel; `None` for channels passed through untouched.
    states: [Option<NoteState>; 16],
    tuning: Tuning,
}

impl MonoPitchBendTuner {
    /// Tuner over the given 0-based channels.
    pub fn new(channels: &[u8], sensitivity: PitchBendSensitivity) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::InvalidConfig(
                "pitch bend tuner needs at least one channel".to_string(),
            ));
        }
        let mut states: [Option<NoteState>; 16] = Default::default();
        for &channel in channels {
            let Some(slot) = states.get_mut(channel as usize) else {
                return Err(Error::InvalidConfig(format!(
                    "MIDI channel {channel} is out of range (0-15)"
                )));
            };
            *slot = Some(NoteState::new());
        }
        Ok(Self {
            sensitivity,
            states,
            tuning: Tuning::equal_temperament(),
        })
    }

    /// Tuner over all 16 channels.
    pub fn all_channels(sensitivity: PitchBendSensitivity) -> Self {
        Self {
            sensitivity,
            states: std::array::from_fn(|_| Some(NoteState::new())),
            tuning: Tuning::equal_temperament(),
        }
    }

    pub fn sensitivity(&self) -> PitchBendSensitivity {
        self.sensitivity
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.is_some())
            .map(|(channel, _)| channel as u8)
    }

    pub fn note_state(&self, channel: u8) -> Option<&NoteState> {
        self.states.get(channel as usize)?.as_ref()
    }

    /// Programs pitch-bend sensitivity on every channel.
    pub fn connect(&mut self, tuning: &Tuning, sink: &mut impl MidiSink) {
        self.tuning = tuning.clone();
        for (channel, state) in self.states.iter_mut().enumerate() {
            let Some(state) = state else { continue };
            state.reset();
            for message in self.sensitivity.rpn_messages(channel as u8) {
                sink.send(message);
            }
        }
        debug!(tuning = %self.tuning.name(), "Pitch bend tuner connected");
    }

    /// Centers pitch bend and restores the default sensitivity.
    pub fn disconnect(&mut self, sink: &mut impl MidiSink) {
        for (channel, state) in self.states.iter_mut().enumerate() {
            let Some(state) = state else { continue };
            let channel = channel as u8;
            sink.send(MidiOutputMessage::pitch_bend(channel, PITCH_BEND_CENTER));
            for message in DEFAULT_SENSITIVITY.rpn_messages(channel) {
                sink.send(message);
            }
            state.reset();
        }
    }

    /// Switches tuning; only channels with a held note are re-bent.
    pub fn tune(&mut self, tuning: &Tuning, sink: &mut impl MidiSink) {
        self.tuning = tuning.clone();
        for channel in 0..16u8 {
            self.bend_to_top(channel, sink);
        }
    }

    pub fn process(&mut self, event: &MidiEvent, sink: &mut impl MidiSink) {
        let channel = event.channel_num();
        if self.note_state(channel).is_none() {
            sink.send(MidiOutputMessage::from(event));
            return;
        }

        match event.msg {
            ChannelVoiceMsg::NoteOn { note, velocity } if velocity > 0 => {
                if let Some(state) = self.state_mut(channel) {
                    state.push(note);
                }
                self.bend_to_top(channel, sink);
                sink.send(MidiOutputMessage::from(event));
            }
            ChannelVoiceMsg::NoteOn { note, .. } | ChannelVoiceMsg::NoteOff { note, .. } => {
                if let Some(state) = self.state_mut(channel) {
                    state.remove(note);
                }
                sink.send(MidiOutputMessage::from(event));
                self.bend_to_top(channel, sink);
            }
            ChannelVoiceMsg::PitchBend { bend } => {
                if let Some(state) = self.state_mut(channel) {
                    state.wheel = bend as i32 - PITCH_BEND_CENTER as i32;
                    state.bend = state.combined();
                    sink.send(MidiOutputMessage::pitch_bend(channel, state.bend));
                }
            }
            _ => sink.send(MidiOutputMessage::from(event)),
        }
    }

    fn state_mut(&mut self, channel: u8) -> Option<&mut NoteState> {
        self.states.get_mut(channel as usize)?.as_mut()
    }

    /// Emits a bend for the sounding note if it differs from the active one.
    fn bend_to_top(&mut self, channel: u8, sink: &mut impl MidiSink) {
        let sensitivity = self.sensitivity;
        let tuning = &self.tuning;
        let Some(state) = self
            .states
            .get_mut(channel as usize)
            .and_then(|s| s.as_mut())
        else {
            return;
        };
        let Some(note) = state.top() else { return };

        state.tuning_bend = sensitivity.bend_for(tuning.deviation(PitchClass::from_note(note)));
        let bend = state.combined();
        if bend != state.bend {
            state.bend = bend;
            sink.send(MidiOutputMessage::pitch_bend(channel, bend));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> Tuning {
        let mut deviations = [0.0; 12];
        deviations[PitchClass::E.index()] = -13.69;
        deviations[PitchClass::B.index()] = -50.0;
        Tuning::from_deviations("test", deviations).unwrap()
    }

    fn is_pitch_bend(message: &MidiOutputMessage) -> bool {
        message.bytes[0] & 0xF0 == 0xE0
    }

    fn connected() -> MonoPitchBendTuner {
        let mut tuner = MonoPitchBendTuner::new(&[0], PitchBendSensitivity::default()).unwrap();
        tuner.connect(&tuning(), &mut Vec::<MidiOutputMessage>::new());
        tuner
    }

    #[test]
    fn test_bend_scaling() {
        let sensitivity = PitchBendSensitivity::default();
        assert_eq!(sensitivity.bend_for(0.0), 8192);
        assert_eq!(sensitivity.bend_for(-50.0), 8192 - 2048);
        assert_eq!(sensitivity.bend_for(100.0), 8192 + 4096);
        assert_eq!(sensitivity.bend_for(500.0), 16383);
        assert_eq!(sensitivity.bend_for(-500.0), 0);

        let fine = PitchBendSensitivity::new(1, 0).unwrap();
        assert_eq!(fine.bend_for(50.0), 8192 + 4096);
    }

    #[test]
    fn test_invalid_sensitivity() {
        assert!(matches!(
            PitchBendSensitivity::new(0, 0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(PitchBendSensitivity::new(128, 0).is_err());
        assert!(PitchBendSensitivity::new(0, 50).is_ok());
    }

    #[test]
    fn test_connect_programs_rpn() {
        let mut tuner = MonoPitchBendTuner::new(&[2], PitchBendSensitivity::new(1, 0).unwrap())
            .unwrap();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.connect(&tuning(), &mut out);

        let bytes: Vec<Vec<u8>> = out.into_iter().map(|m| m.bytes).collect();
        assert_eq!(
            bytes,
            vec![
                vec![0xB2, 101, 0],
                vec![0xB2, 100, 0],
                vec![0xB2, 6, 1],
                vec![0xB2, 38, 0],
                vec![0xB2, 101, 127],
                vec![0xB2, 100, 127],
            ]
        );
    }

    #[test]
    fn test_note_on_bends_before_note() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], MidiOutputMessage::pitch_bend(0, 8192 - 2048));
        assert_eq!(out[1].bytes, vec![0x90, 71, 100]);
    }

    #[test]
    fn test_repeated_pitch_class_does_not_rebend() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.process(&MidiEvent::note_on(0, 64, 100), &mut out);
        tuner.process(&MidiEvent::note_on(0, 76, 100), &mut out);
        tuner.process(&MidiEvent::note_on(0, 60, 100), &mut out);

        let bends = out.iter().filter(|m| is_pitch_bend(m)).count();
        // E, E an octave up (same bend), C
        assert_eq!(bends, 2);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_note_off_falls_back_to_held_note() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.process(&MidiEvent::note_on(0, 64, 100), &mut out);
        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);
        out.clear();

        tuner.process(&MidiEvent::note_off(0, 71, 0), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bytes, vec![0x80, 71, 0]);
        let e_bend = PitchBendSensitivity::default().bend_for(-13.69);
        assert_eq!(out[1], MidiOutputMessage::pitch_bend(0, e_bend));

        out.clear();
        tuner.process(&MidiEvent::note_on(0, 64, 0), &mut out);
        assert_eq!(out.len(), 1);
        assert!(tuner.note_state(0).unwrap().top().is_none());
    }

    #[test]
    fn test_releasing_lower_note_keeps_bend() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.process(&MidiEvent::note_on(0, 64, 100), &mut out);
        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);
        out.clear();

        tuner.process(&MidiEvent::note_off(0, 64, 0), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(tuner.note_state(0).unwrap().held(), &[71]);
    }

    #[test]
    fn test_tune_only_bends_held_notes() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.tune(&Tuning::equal_temperament(), &mut out);
        assert!(out.is_empty());

        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);
        out.clear();
        tuner.tune(&Tuning::equal_temperament(), &mut out);
        assert_eq!(out, vec![MidiOutputMessage::pitch_bend(0, 8192)]);
    }

    #[test]
    fn test_pitch_wheel_rides_on_tuning_bend() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        let b_bend = 8192 - 2048;
        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);
        out.clear();

        // centered wheel keeps the tuning bend
        tuner.process(&MidiEvent::pitch_bend(0, 8192), &mut out);
        assert_eq!(out, vec![MidiOutputMessage::pitch_bend(0, b_bend)]);

        out.clear();
        tuner.process(&MidiEvent::note_off(0, 71, 0), &mut out);
        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);
        let last_bend = out.iter().rev().find(|m| is_pitch_bend(m));
        assert_eq!(last_bend, None);
        assert_eq!(tuner.note_state(0).unwrap().bend(), b_bend);

        out.clear();
        tuner.process(&MidiEvent::pitch_bend(0, 8192 + 1000), &mut out);
        assert_eq!(out, vec![MidiOutputMessage::pitch_bend(0, b_bend + 1000)]);
        assert_eq!(tuner.note_state(0).unwrap().wheel(), 1000);

        // a new pitch class keeps the wheel offset
        out.clear();
        tuner.process(&MidiEvent::note_on(0, 60, 100), &mut out);
        assert_eq!(out[0], MidiOutputMessage::pitch_bend(0, 8192 + 1000));

        out.clear();
        tuner.process(&MidiEvent::pitch_bend(0, 16383), &mut out);
        assert_eq!(out, vec![MidiOutputMessage::pitch_bend(0, 16383)]);
    }

    #[test]
    fn test_unconfigured_channel_passes_through() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.process(&MidiEvent::note_on(5, 71, 100), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, vec![0x95, 71, 100]);

        out.clear();
        tuner.process(&MidiEvent::control_change(0, 1, 64), &mut out);
        assert_eq!(out[0].bytes, vec![0xB0, 1, 64]);
    }

    #[test]
    fn test_disconnect_restores_defaults() {
        let mut tuner = connected();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.process(&MidiEvent::note_on(0, 71, 100), &mut out);
        out.clear();

        tuner.disconnect(&mut out);
        assert_eq!(out[0], MidiOutputMessage::pitch_bend(0, 8192));
        assert_eq!(out[3].bytes, vec![0xB0, 6, 2]);
        assert_eq!(out[4].bytes, vec![0xB0, 38, 0]);
        assert_eq!(out.len(), 7);
        assert_eq!(tuner.note_state(0).unwrap().bend(), 8192);
    }

    #[test]
    fn test_channel_validation() {
        let sensitivity = PitchBendSensitivity::default();
        assert!(MonoPitchBendTuner::new(&[], sensitivity).is_err());
        assert!(MonoPitchBendTuner::new(&[16], sensitivity).is_err());
        let tuner = MonoPitchBendTuner::new(&[3, 9], sensitivity).unwrap();
        assert_eq!(tuner.channels().collect::<Vec<_>>(), vec![3, 9]);
        assert_eq!(MonoPitchBendTuner::all_channels(sensitivity).channels().count(), 16);
    }
}
