//! MIDI note output.
//!
//! The pipeline emits note-on/note-off through the [`NoteSink`] trait. The
//! real backend connects to a MIDI output port via `midir`; when no port is
//! available a null sink keeps the pipeline running silently.

use crate::{Error, Result};
use log::{info, warn};

/// Status byte for note-on messages
const NOTE_ON_STATUS: u8 = 0x90;

/// Status byte for note-off messages
const NOTE_OFF_STATUS: u8 = 0x80;

/// Status byte for program-change messages
const PROGRAM_CHANGE_STATUS: u8 = 0xC0;

/// Consumer of note events
pub trait NoteSink {
    /// Begin sounding a note
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot deliver the message.
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) -> Result<()>;

    /// Stop sounding a note
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot deliver the message.
    fn note_off(&mut self, channel: u8, key: u8) -> Result<()>;

    /// Select an instrument program on a channel
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot deliver the message.
    fn program_change(&mut self, channel: u8, program: u8) -> Result<()>;
}

/// MIDI sink over a `midir` output connection
pub struct MidiSink {
    connection: midir::MidiOutputConnection,
}

impl MidiSink {
    /// Connect to a MIDI output port. With `port_name`, the first port whose
    /// name contains it (case-insensitive) is used; otherwise a softsynth
    /// port is preferred, falling back to the first port.
    ///
    /// # Errors
    ///
    /// Returns an error when no output port matches or the connection fails.
    pub fn connect(port_name: Option<&str>) -> Result<Self> {
        let midi_out = midir::MidiOutput::new("virtual-piano")?;
        let ports = midi_out.ports();

        if ports.is_empty() {
            return Err(Error::MidiConnect(
                "No MIDI output ports found; start a synthesizer such as fluidsynth or timidity"
                    .to_string(),
            ));
        }

        let matches_name = |port: &midir::MidiOutputPort, needle: &str| {
            midi_out
                .port_name(port)
                .map(|name| name.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false)
        };

        let port = match port_name {
            Some(needle) => ports
                .iter()
                .find(|port| matches_name(port, needle))
                .ok_or_else(|| Error::MidiConnect(format!("No MIDI output port matching '{needle}'")))?,
            None => ports
                .iter()
                .find(|port| {
                    ["fluid", "timidity", "synth", "gm"]
                        .iter()
                        .any(|hint| matches_name(port, hint))
                })
                .unwrap_or(&ports[0]),
        };

        let name = midi_out.port_name(port).unwrap_or_else(|_| "unknown".to_string());
        info!("Opening MIDI port: {name}");

        let connection = midi_out
            .connect(port, "virtual-piano-out")
            .map_err(|e| Error::MidiConnect(e.to_string()))?;

        Ok(Self { connection })
    }
}

impl NoteSink for MidiSink {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) -> Result<()> {
        self.connection
            .send(&[NOTE_ON_STATUS | (channel & 0x0F), key & 0x7F, velocity & 0x7F])?;
        Ok(())
    }

    fn note_off(&mut self, channel: u8, key: u8) -> Result<()> {
        self.connection
            .send(&[NOTE_OFF_STATUS | (channel & 0x0F), key & 0x7F, 0])?;
        Ok(())
    }

    fn program_change(&mut self, channel: u8, program: u8) -> Result<()> {
        self.connection
            .send(&[PROGRAM_CHANGE_STATUS | (channel & 0x0F), program & 0x7F])?;
        Ok(())
    }
}

/// Silent sink used when no MIDI port is available
#[derive(Debug, Default)]
pub struct NullSink;

impl NoteSink for NullSink {
    fn note_on(&mut self, _channel: u8, _key: u8, _velocity: u8) -> Result<()> {
        Ok(())
    }

    fn note_off(&mut self, _channel: u8, _key: u8) -> Result<()> {
        Ok(())
    }

    fn program_change(&mut self, _channel: u8, _program: u8) -> Result<()> {
        Ok(())
    }
}

/// Open the requested MIDI port, degrading to a [`NullSink`] with a warning
/// when the connection fails.
#[must_use]
pub fn open_sink(port_name: Option<&str>) -> Box<dyn NoteSink> {
    match MidiSink::connect(port_name) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            warn!("{e}; notes will be discarded");
            Box::new(NullSink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records every event, for pipeline tests
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub events: Vec<(u8, u8, Option<u8>)>,
    }

    impl NoteSink for RecordingSink {
        fn note_on(&mut self, channel: u8, key: u8, velocity: u8) -> Result<()> {
            self.events.push((channel, key, Some(velocity)));
            Ok(())
        }

        fn note_off(&mut self, channel: u8, key: u8) -> Result<()> {
            self.events.push((channel, key, None));
            Ok(())
        }

        fn program_change(&mut self, _channel: u8, _program: u8) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.note_on(0, 60, 84).unwrap();
        sink.note_off(0, 60).unwrap();
        sink.program_change(0, 0).unwrap();
    }

    #[test]
    fn test_recording_sink_order() {
        let mut sink = RecordingSink::default();
        sink.note_on(0, 36, 84).unwrap();
        sink.note_off(0, 36).unwrap();
        assert_eq!(sink.events, vec![(0, 36, Some(84)), (0, 36, None)]);
    }
}
