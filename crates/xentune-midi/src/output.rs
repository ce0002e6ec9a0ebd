//! Outbound MIDI messages and the sink tuners write into.

use crate::event::MidiEvent;

const CONTROL_CHANGE: u8 = 0xB0;
const PITCH_BEND: u8 = 0xE0;

/// Raw bytes of one outbound message: channel voice or a complete SysEx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputMessage {
    pub bytes: Vec<u8>,
}

impl MidiOutputMessage {
    /// Channels above 15 clamp to 15; data bytes are masked to 7 bits.
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            bytes: vec![CONTROL_CHANGE | channel.min(15), controller & 0x7F, value & 0x7F],
        }
    }

    /// `bend`: unsigned 14-bit (0 to 16383), 8192 = center.
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        let bend = bend.min(16383);
        Self {
            bytes: vec![
                PITCH_BEND | channel.min(15),
                (bend & 0x7F) as u8,
                ((bend >> 7) & 0x7F) as u8,
            ],
        }
    }

    /// Wraps a complete `F0 .. F7` System Exclusive buffer.
    pub fn sysex(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.first(), Some(&0xF0));
        debug_assert_eq!(bytes.last(), Some(&0xF7));
        Self { bytes }
    }

    #[inline]
    pub fn is_sysex(&self) -> bool {
        self.bytes.first() == Some(&0xF0)
    }

    pub fn from_event(event: &MidiEvent) -> Self {
        Self {
            bytes: event.to_bytes(),
        }
    }
}

impl From<&MidiEvent> for MidiOutputMessage {
    fn from(event: &MidiEvent) -> Self {
        Self::from_event(event)
    }
}

impl From<MidiEvent> for MidiOutputMessage {
    fn from(event: MidiEvent) -> Self {
        Self::from_event(&event)
    }
}

/// Destination for everything a tuner emits.
///
/// Tuning data goes through [`send_tuning`](Self::send_tuning) so a sink can
/// route it to a separate device; by default it joins the regular stream.
pub trait MidiSink {
    fn send(&mut self, message: MidiOutputMessage);

    fn send_tuning(&mut self, message: MidiOutputMessage) {
        self.send(message);
    }
}

impl MidiSink for Vec<MidiOutputMessage> {
    fn send(&mut self, message: MidiOutputMessage) {
        self.push(message);
    }
}
