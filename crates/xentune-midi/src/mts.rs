//! MIDI Tuning Standard encoding.
//!
//! Universal System Exclusive layout:
//!
//! ```text
//! F0 7E dev 08 08 ff gg hh [12 x 1 byte]  F7   scale/octave, 1 byte, non-real-time
//! F0 7E dev 08 09 ff gg hh [12 x 2 bytes] F7   scale/octave, 2 byte, non-real-time
//! F0 7F dev 08 08 ff gg hh [12 x 1 byte]  F7   scale/octave, 1 byte, real-time
//! F0 7F dev 08 09 ff gg hh [12 x 2 bytes] F7   scale/octave, 2 byte, real-time
//! F0 7F dev 08 02 tt ll [kk xx yy zz]...  F7   single note tuning change
//! ```
//!
//! `ff gg hh` is the channel mask (channels 15-16, 8-14, 1-7).

use serde::{Deserialize, Serialize};
use tracing::warn;

use xentune_tuning::{PitchClass, Tuning, SEMITONE_CENTS};

use crate::error::{Error, Result};
use crate::output::MidiOutputMessage;

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;
const SYSEX_NON_REAL_TIME: u8 = 0x7E;
const SYSEX_REAL_TIME: u8 = 0x7F;

const MIDI_TUNING_STANDARD: u8 = 0x08;
const SINGLE_NOTE_TUNING_CHANGE: u8 = 0x02;
const SCALE_OCTAVE_1_BYTE: u8 = 0x08;
const SCALE_OCTAVE_2_BYTE: u8 = 0x09;

/// Broadcast device id.
pub const DEVICE_ID_BROADCAST: u8 = 0x7F;

/// Key changes per single-note message; a full keyboard takes two messages.
const SINGLE_NOTE_BATCH: usize = 64;

const U14_CENTER: f64 = 8192.0;
const U14_MAX: f64 = 16383.0;
const U14_RANGE: f64 = 16384.0;

/// Sub-format of the tuning messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MtsFormat {
    /// Scale/octave, one byte per key (-64..=63 cents), non-real-time.
    #[default]
    NonRealTime1Byte,
    /// Scale/octave, two bytes per key (-100..100 cents), non-real-time.
    NonRealTime2Byte,
    RealTime1Byte,
    RealTime2Byte,
    /// Single note tuning change for all 128 keys.
    SingleNote,
}

const FORMATS: &[(&str, MtsFormat)] = &[
    ("nrt-1-byte", MtsFormat::NonRealTime1Byte),
    ("nrt-2-byte", MtsFormat::NonRealTime2Byte),
    ("rt-1-byte", MtsFormat::RealTime1Byte),
    ("rt-2-byte", MtsFormat::RealTime2Byte),
    ("single-note", MtsFormat::SingleNote),
];

impl MtsFormat {
    /// Resolves a format identifier such as `"nrt-1-byte"`.
    pub fn from_id(id: &str) -> Result<Self> {
        let id = id.trim();
        FORMATS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(id))
            .map(|(_, format)| *format)
            .ok_or_else(|| Error::PluginConfiguration {
                kind: "MTS format",
                id: id.to_string(),
            })
    }

    pub fn id(self) -> &'static str {
        FORMATS
            .iter()
            .find(|(_, format)| *format == self)
            .map(|(name, _)| *name)
            .unwrap_or("nrt-1-byte")
    }

    pub fn ids() -> impl Iterator<Item = &'static str> {
        FORMATS.iter().map(|(name, _)| *name)
    }

    fn universal_id(self) -> u8 {
        match self {
            MtsFormat::NonRealTime1Byte | MtsFormat::NonRealTime2Byte => SYSEX_NON_REAL_TIME,
            _ => SYSEX_REAL_TIME,
        }
    }
}

/// Channels addressed by a scale/octave message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMask(u16);

impl ChannelMask {
    pub const ALL: ChannelMask = ChannelMask(0xFFFF);

    /// Mask over 0-based channels; fails on channels above 15.
    pub fn from_channels(channels: &[u8]) -> Result<Self> {
        let mut mask = 0u16;
        for &channel in channels {
            if channel > 15 {
                return Err(Error::InvalidConfig(format!(
                    "MIDI channel {channel} is out of range (0-15)"
                )));
            }
            mask |= 1 << channel;
        }
        Ok(ChannelMask(mask))
    }

    pub fn contains(self, channel: u8) -> bool {
        channel < 16 && self.0 & (1 << channel) != 0
    }

    pub fn channels(self) -> impl Iterator<Item = u8> {
        (0..16).filter(move |c| self.contains(*c))
    }

    /// `ff gg hh`: bits 0-1 = channels 15-16, 0-6 = 8-14, 0-6 = 1-7.
    pub fn to_bytes(self) -> [u8; 3] {
        [
            ((self.0 >> 14) & 0x03) as u8,
            ((self.0 >> 7) & 0x7F) as u8,
            (self.0 & 0x7F) as u8,
        ]
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Encodes tunings as MTS SysEx for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct MtsEncoder {
    format: MtsFormat,
    device_id: u8,
    channels: ChannelMask,
    tuning_program: u8,
}

impl MtsEncoder {
    pub fn new(format: MtsFormat) -> Self {
        Self {
            format,
            device_id: DEVICE_ID_BROADCAST,
            channels: ChannelMask::ALL,
            tuning_program: 0,
        }
    }

    /// Default: 0x7F (broadcast)
    pub fn device_id(mut self, device_id: u8) -> Result<Self> {
        if device_id > 0x7F {
            return Err(Error::InvalidConfig(format!(
                "MTS device id {device_id:#04x} is out of range (0x00-0x7F)"
            )));
        }
        self.device_id = device_id;
        Ok(self)
    }

    /// Default: all channels. Ignored by the single-note format.
    pub fn channels(mut self, channels: ChannelMask) -> Self {
        self.channels = channels;
        self
    }

    /// Tuning program addressed by the single-note format. Default: 0
    pub fn tuning_program(mut self, program: u8) -> Result<Self> {
        if program > 0x7F {
            return Err(Error::InvalidConfig(format!(
                "tuning program {program} is out of range (0-127)"
            )));
        }
        self.tuning_program = program;
        Ok(self)
    }

    pub fn format(&self) -> MtsFormat {
        self.format
    }

    /// SysEx messages that load `tuning` into the device.
    ///
    /// Deviations beyond what the format can carry are clamped.
    pub fn encode(&self, tuning: &Tuning) -> Vec<MidiOutputMessage> {
        match self.format {
            MtsFormat::NonRealTime1Byte | MtsFormat::RealTime1Byte => {
                vec![self.scale_octave(SCALE_OCTAVE_1_BYTE, tuning)]
            }
            MtsFormat::NonRealTime2Byte | MtsFormat::RealTime2Byte => {
                vec![self.scale_octave(SCALE_OCTAVE_2_BYTE, tuning)]
            }
            MtsFormat::SingleNote => self.single_note(tuning),
        }
    }

    fn header(&self, universal_id: u8, sub_id: u8, capacity: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(capacity);
        bytes.extend_from_slice(&[
            SYSEX_START,
            universal_id,
            self.device_id,
            MIDI_TUNING_STANDARD,
            sub_id,
        ]);
        bytes
    }

    fn scale_octave(&self, sub_id: u8, tuning: &Tuning) -> MidiOutputMessage {
        let mut bytes = self.header(self.format.universal_id(), sub_id, 33);
        bytes.extend_from_slice(&self.channels.to_bytes());
        for pitch_class in PitchClass::all() {
            let cents = tuning.deviation(pitch_class);
            if sub_id == SCALE_OCTAVE_1_BYTE {
                bytes.push(one_byte_value(pitch_class, cents));
            } else {
                let value = two_byte_value(pitch_class, cents);
                bytes.push((value >> 7) as u8);
                bytes.push((value & 0x7F) as u8);
            }
        }
        bytes.push(SYSEX_END);
        MidiOutputMessage::sysex(bytes)
    }

    fn single_note(&self, tuning: &Tuning) -> Vec<MidiOutputMessage> {
        let changes: Vec<[u8; 4]> = (0..128u8)
            .filter_map(|key| single_note_change(key, tuning.note_deviation(key)))
            .collect();

        changes
            .chunks(SINGLE_NOTE_BATCH)
            .map(|batch| {
                let mut bytes =
                    self.header(SYSEX_REAL_TIME, SINGLE_NOTE_TUNING_CHANGE, 8 + batch.len() * 4);
                bytes.push(self.tuning_program);
                bytes.push(batch.len() as u8);
                for change in batch {
                    bytes.extend_from_slice(change);
                }
                bytes.push(SYSEX_END);
                MidiOutputMessage::sysex(bytes)
            })
            .collect()
    }
}

impl Default for MtsEncoder {
    fn default() -> Self {
        Self::new(MtsFormat::default())
    }
}

/// `round(cents) + 64`, clamped to -64..=63 cents.
fn one_byte_value(pitch_class: PitchClass, cents: f64) -> u8 {
    let value = cents.round() + 64.0;
    if !(0.0..=127.0).contains(&value) {
        warn!(%pitch_class, cents, "Deviation exceeds 1-byte MTS range, clamping");
    }
    value.clamp(0.0, 127.0) as u8
}

/// 14-bit value with 0x2000 = 0 cents and a resolution of 100/8192 cents.
fn two_byte_value(pitch_class: PitchClass, cents: f64) -> u16 {
    let value = (U14_CENTER + cents * U14_CENTER / SEMITONE_CENTS).round();
    if !(0.0..=U14_MAX).contains(&value) {
        warn!(%pitch_class, cents, "Deviation exceeds 2-byte MTS range, clamping");
    }
    value.clamp(0.0, U14_MAX) as u16
}

/// `[key, semitone, msb, lsb]` for one key, or `None` if it falls off the keyboard.
fn single_note_change(key: u8, deviation_cents: f64) -> Option<[u8; 4]> {
    let pitch = key as f64 + deviation_cents / SEMITONE_CENTS;
    let mut semitone = pitch.floor();
    let mut fraction = ((pitch - semitone) * U14_RANGE).round();
    if fraction >= U14_RANGE {
        semitone += 1.0;
        fraction = 0.0;
    }
    if !(0.0..=127.0).contains(&semitone) {
        warn!(key, deviation_cents, "Retuned key leaves the MIDI note range, skipping");
        return None;
    }
    let mut fraction = fraction as u16;
    // 7F 7F 7F is reserved for "no change"
    if semitone == 127.0 && fraction == U14_MAX as u16 {
        fraction -= 1;
    }
    Some([
        key,
        semitone as u8,
        (fraction >> 7) as u8,
        (fraction & 0x7F) as u8,
    ])
}
