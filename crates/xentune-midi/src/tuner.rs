//! Tuners: how a resolved tuning reaches an output device.

use serde::{Deserialize, Serialize};
use tracing::debug;

use xentune_tuning::Tuning;

use crate::error::{Error, Result};
use crate::event::MidiEvent;
use crate::mts::{ChannelMask, MtsEncoder, MtsFormat, DEVICE_ID_BROADCAST};
use crate::output::{MidiOutputMessage, MidiSink};
use crate::pitch_bend::{MonoPitchBendTuner, PitchBendSensitivity, DEFAULT_SENSITIVITY};

/// Configuration of a tuner, as handed in by a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerSettings {
    /// `"mts"` or `"mono-pitch-bend"`.
    pub kind: String,
    /// MTS format id, e.g. `"nrt-1-byte"`.
    pub format: String,
    pub device_id: u8,
    /// 0-based channels; `None` for all 16.
    pub channels: Option<Vec<u8>>,
    /// Forward incoming messages to the output (MTS only).
    pub thru: bool,
    pub pitch_bend_semitones: u8,
    pub pitch_bend_cents: u8,
    pub tuning_program: u8,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            kind: "mts".to_string(),
            format: MtsFormat::default().id().to_string(),
            device_id: DEVICE_ID_BROADCAST,
            channels: None,
            thru: false,
            pitch_bend_semitones: DEFAULT_SENSITIVITY.semitones,
            pitch_bend_cents: DEFAULT_SENSITIVITY.cents,
            tuning_program: 0,
        }
    }
}

impl TunerSettings {
    pub fn mts(format: MtsFormat) -> Self {
        Self {
            format: format.id().to_string(),
            ..Default::default()
        }
    }

    pub fn mono_pitch_bend(channels: Vec<u8>) -> Self {
        Self {
            kind: "mono-pitch-bend".to_string(),
            channels: Some(channels),
            ..Default::default()
        }
    }

    fn channels(&self) -> Result<Option<&[u8]>> {
        match self.channels.as_deref() {
            Some([]) => Err(Error::InvalidConfig(
                "tuner channel list is empty".to_string(),
            )),
            other => Ok(other),
        }
    }
}

type TunerConstructor = fn(&TunerSettings) -> Result<Tuner>;

const TUNERS: &[(&str, TunerConstructor)] = &[
    ("mts", MtsTuner::build),
    ("mono-pitch-bend", MonoPitchBendTuner::build),
];

pub fn tuner_ids() -> impl Iterator<Item = &'static str> {
    TUNERS.iter().map(|(id, _)| *id)
}

/// Sends MTS SysEx on every tuning change.
#[derive(Debug, Clone)]
pub struct MtsTuner {
    encoder: MtsEncoder,
    thru: bool,
}

impl MtsTuner {
    pub fn new(encoder: MtsEncoder) -> Self {
        Self {
            encoder,
            thru: false,
        }
    }

    /// Forward incoming messages unmodified.
    pub fn thru(mut self, thru: bool) -> Self {
        self.thru = thru;
        self
    }

    pub fn encoder(&self) -> &MtsEncoder {
        &self.encoder
    }

    fn build(settings: &TunerSettings) -> Result<Tuner> {
        let format = MtsFormat::from_id(&settings.format)?;
        let channels = match settings.channels()? {
            Some(channels) => ChannelMask::from_channels(channels)?,
            None => ChannelMask::ALL,
        };
        let encoder = MtsEncoder::new(format)
            .device_id(settings.device_id)?
            .tuning_program(settings.tuning_program)?
            .channels(channels);
        Ok(Tuner::Mts(MtsTuner::new(encoder).thru(settings.thru)))
    }

    pub fn tune(&mut self, tuning: &Tuning, sink: &mut impl MidiSink) {
        for message in self.encoder.encode(tuning) {
            sink.send_tuning(message);
        }
    }

    pub fn process(&mut self, event: &MidiEvent, sink: &mut impl MidiSink) {
        if self.thru {
            sink.send(MidiOutputMessage::from(event));
        }
    }
}

impl MonoPitchBendTuner {
    fn build(settings: &TunerSettings) -> Result<Tuner> {
        let sensitivity =
            PitchBendSensitivity::new(settings.pitch_bend_semitones, settings.pitch_bend_cents)?;
        let tuner = match settings.channels()? {
            Some(channels) => MonoPitchBendTuner::new(channels, sensitivity)?,
            None => MonoPitchBendTuner::all_channels(sensitivity),
        };
        Ok(Tuner::MonoPitchBend(tuner))
    }
}

/// The tuner variants a track can drive.
#[derive(Debug, Clone)]
pub enum Tuner {
    Mts(MtsTuner),
    MonoPitchBend(MonoPitchBendTuner),
}

impl Tuner {
    /// Resolves `settings.kind` and validates the rest of the settings.
    pub fn from_settings(settings: &TunerSettings) -> Result<Self> {
        let kind = settings.kind.trim();
        let (_, build) = TUNERS
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(kind))
            .ok_or_else(|| Error::PluginConfiguration {
                kind: "tuner",
                id: kind.to_string(),
            })?;
        build(settings)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Tuner::Mts(_) => "mts",
            Tuner::MonoPitchBend(_) => "mono-pitch-bend",
        }
    }

    /// Prepares the device and loads the initial tuning.
    pub fn connect(&mut self, tuning: &Tuning, sink: &mut impl MidiSink) {
        debug!(tuner = self.kind(), tuning = %tuning.name(), "Connecting tuner");
        match self {
            Tuner::Mts(tuner) => tuner.tune(tuning, sink),
            Tuner::MonoPitchBend(tuner) => tuner.connect(tuning, sink),
        }
    }

    /// Leaves the device in 12-EDO.
    pub fn disconnect(&mut self, sink: &mut impl MidiSink) {
        debug!(tuner = self.kind(), "Disconnecting tuner");
        match self {
            Tuner::Mts(tuner) => tuner.tune(&Tuning::equal_temperament(), sink),
            Tuner::MonoPitchBend(tuner) => tuner.disconnect(sink),
        }
    }

    pub fn tune(&mut self, tuning: &Tuning, sink: &mut impl MidiSink) {
        match self {
            Tuner::Mts(tuner) => tuner.tune(tuning, sink),
            Tuner::MonoPitchBend(tuner) => tuner.tune(tuning, sink),
        }
    }

    pub fn process(&mut self, event: &MidiEvent, sink: &mut impl MidiSink) {
        match self {
            Tuner::Mts(tuner) => tuner.process(event, sink),
            Tuner::MonoPitchBend(tuner) => tuner.process(event, sink),
        }
    }
}

impl Default for Tuner {
    fn default() -> Self {
        Tuner::Mts(MtsTuner::new(MtsEncoder::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xentune_tuning::PitchClass;

    fn tuning() -> Tuning {
        let mut deviations = [0.0; 12];
        deviations[PitchClass::E.index()] = -14.0;
        Tuning::from_deviations("t", deviations).unwrap()
    }

    #[test]
    fn test_registry() {
        assert!(matches!(
            Tuner::from_settings(&TunerSettings::default()),
            Ok(Tuner::Mts(_))
        ));
        assert!(matches!(
            Tuner::from_settings(&TunerSettings::mono_pitch_bend(vec![0])),
            Ok(Tuner::MonoPitchBend(_))
        ));
        let unknown = TunerSettings {
            kind: "mpe".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Tuner::from_settings(&unknown),
            Err(Error::PluginConfiguration { kind: "tuner", .. })
        ));
        assert_eq!(tuner_ids().collect::<Vec<_>>(), vec!["mts", "mono-pitch-bend"]);
    }

    #[test]
    fn test_invalid_settings() {
        let empty = TunerSettings {
            channels: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(Tuner::from_settings(&empty), Err(Error::InvalidConfig(_))));

        let format = TunerSettings {
            format: "bulk-dump".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Tuner::from_settings(&format),
            Err(Error::PluginConfiguration { kind: "MTS format", .. })
        ));

        let zero = TunerSettings {
            pitch_bend_semitones: 0,
            ..TunerSettings::mono_pitch_bend(vec![0])
        };
        assert!(Tuner::from_settings(&zero).is_err());

        let device = TunerSettings {
            device_id: 200,
            ..Default::default()
        };
        assert!(Tuner::from_settings(&device).is_err());
    }

    #[test]
    fn test_mts_connect_and_disconnect() {
        let mut tuner = Tuner::from_settings(&TunerSettings::mts(MtsFormat::RealTime1Byte)).unwrap();
        let mut out: Vec<MidiOutputMessage> = Vec::new();
        tuner.connect(&tuning(), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes[1], 0x7F);
        assert_eq!(out[0].bytes[8 + PitchClass::E.index()], 50);

        out.clear();
        tuner.disconnect(&mut out);
        assert!(out[0].bytes[8..20].iter().all(|b| *b == 64));
    }

    #[test]
    fn test_mts_thru() {
        let note = MidiEvent::note_on(0, 64, 100);
        let mut out: Vec<MidiOutputMessage> = Vec::new();

        let mut tuner = Tuner::default();
        tuner.process(&note, &mut out);
        assert!(out.is_empty());

        let settings = TunerSettings {
            thru: true,
            ..Default::default()
        };
        let mut tuner = Tuner::from_settings(&settings).unwrap();
        tuner.process(&note, &mut out);
        assert_eq!(out, vec![MidiOutputMessage::from(note)]);
    }

    #[test]
    fn test_settings_from_json() {
        let settings: TunerSettings = serde_json::from_str(
            r#"{"kind": "mts", "format": "rt-2-byte", "channels": [0, 1], "thru": true}"#,
        )
        .unwrap();
        let Tuner::Mts(tuner) = Tuner::from_settings(&settings).unwrap() else {
            panic!("expected MTS tuner");
        };
        assert_eq!(tuner.encoder().format(), MtsFormat::RealTime2Byte);
        assert_eq!(settings.device_id, 0x7F);
    }
}
