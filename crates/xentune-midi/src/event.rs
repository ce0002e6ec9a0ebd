//! Incoming MIDI channel-voice events.

use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};

/// A channel-voice message as it arrives on a track.
///
/// Tracks handle events in arrival order; there is no timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self { channel, msg }
    }

    #[inline]
    fn on_channel(channel: u8, msg: ChannelVoiceMsg) -> Self {
        Self::new(Channel::from_u8(channel), msg)
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::NoteOn { note, velocity })
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::NoteOff { note, velocity })
    }

    #[inline]
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        let control = ControlChange::CC {
            control: controller,
            value,
        };
        Self::on_channel(channel, ChannelVoiceMsg::ControlChange { control })
    }

    /// `bend`: unsigned 14-bit, 8192 = center.
    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::PitchBend { bend })
    }

    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::NoteOn { velocity, .. } if velocity > 0)
    }

    /// Note-off, or note-on with zero velocity.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        match self.msg {
            ChannelVoiceMsg::NoteOff { .. } => true,
            ChannelVoiceMsg::NoteOn { velocity, .. } => velocity == 0,
            _ => false,
        }
    }

    /// Key number of note on/off and polyphonic aftertouch.
    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { note, .. } | ChannelVoiceMsg::NoteOff { note, .. } => {
                Some(note)
            }
            ChannelVoiceMsg::PolyPressure { note, .. } => Some(note),
            _ => None,
        }
    }

    /// Controller number and value of a plain control change.
    #[inline]
    pub fn controller(&self) -> Option<(u8, u8)> {
        if let ChannelVoiceMsg::ControlChange {
            control: ControlChange::CC { control, value },
        } = self.msg
        {
            Some((control, value))
        } else {
            None
        }
    }

    #[inline]
    pub fn to_midi_msg(&self) -> MidiMsg {
        MidiMsg::ChannelVoice {
            channel: self.channel,
            msg: self.msg,
        }
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_midi_msg().to_midi()
    }

    /// Parses a channel-voice message; anything else is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, midi_msg::ParseError> {
        match MidiMsg::from_midi(bytes)?.0 {
            MidiMsg::ChannelVoice { channel, msg } => Ok(Self::new(channel, msg)),
            _ => Err(midi_msg::ParseError::Invalid(
                "track input only carries channel-voice messages",
            )),
        }
    }
}
