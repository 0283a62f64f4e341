//! Key-state edges through MIDI note emission.

use virtual_piano::app::emit_note_events;
use virtual_piano::hand_tracking::{Fingertip, FingertipObservation};
use virtual_piano::keyboard::VirtualKeyboard;
use virtual_piano::mapper::KeyStateMapper;
use virtual_piano::synth::NoteSink;
use virtual_piano::Result;

/// One recorded MIDI event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    On { channel: u8, note: u8, velocity: u8 },
    Off { channel: u8, note: u8 },
}

#[derive(Debug, Default)]
struct RecordingSink {
    events: Vec<Event>,
}

impl NoteSink for RecordingSink {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) -> Result<()> {
        self.events.push(Event::On {
            channel,
            note: key,
            velocity,
        });
        Ok(())
    }

    fn note_off(&mut self, channel: u8, key: u8) -> Result<()> {
        self.events.push(Event::Off { channel, note: key });
        Ok(())
    }

    fn program_change(&mut self, _channel: u8, _program: u8) -> Result<()> {
        Ok(())
    }
}

fn keyboard() -> VirtualKeyboard {
    VirtualKeyboard::new(640, 480, 22).unwrap()
}

fn tip(x: f64, y: f64) -> FingertipObservation {
    FingertipObservation {
        hand: 0,
        tip: Fingertip::Index,
        x,
        y,
    }
}

/// Lower-zone canvas point over a white key column
fn white_key_point(kb: &VirtualKeyboard, column: usize) -> (f64, f64) {
    let (x0, _, _, y1) = kb.bounding_box();
    (x0 + kb.white_key_width() * (column as f64 + 0.5), y1 - 1.0)
}

#[test]
fn press_then_release_produces_matching_events() {
    let kb = keyboard();
    let mut mapper = KeyStateMapper::new();
    let mut sink = RecordingSink::default();
    let (x, y) = white_key_point(&kb, 3); // F, key 5, note 41

    let edges = mapper.compute_edges(&kb, &[tip(x, y)], &[70.0], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 0, 84, 0).unwrap();

    let edges = mapper.compute_edges(&kb, &[], &[], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 0, 84, 0).unwrap();

    assert_eq!(
        sink.events,
        vec![
            Event::On {
                channel: 0,
                note: 41,
                velocity: 84
            },
            Event::Off { channel: 0, note: 41 },
        ]
    );
}

#[test]
fn chord_emits_ascending_ons_then_ascending_offs() {
    let kb = keyboard();
    let mut mapper = KeyStateMapper::new();
    let mut sink = RecordingSink::default();

    // C and G pressed, observations given high key first
    let (xg, yg) = white_key_point(&kb, 4); // G, key 7
    let (xc, yc) = white_key_point(&kb, 0); // C, key 0

    let edges = mapper.compute_edges(
        &kb,
        &[tip(xg, yg), tip(xc, yc)],
        &[70.0, 70.0],
        68.5,
        kb.total_keys(),
    );
    emit_note_events(&kb, &edges, &mut sink, 0, 84, 0).unwrap();

    // Next frame swaps the chord for one new note: offs follow the ons
    let (xe, ye) = white_key_point(&kb, 2); // E, key 4
    let edges = mapper.compute_edges(&kb, &[tip(xe, ye)], &[70.0], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 0, 84, 0).unwrap();

    assert_eq!(
        sink.events,
        vec![
            Event::On {
                channel: 0,
                note: 36,
                velocity: 84
            },
            Event::On {
                channel: 0,
                note: 43,
                velocity: 84
            },
            Event::On {
                channel: 0,
                note: 40,
                velocity: 84
            },
            Event::Off { channel: 0, note: 36 },
            Event::Off { channel: 0, note: 43 },
        ]
    );
}

#[test]
fn held_key_is_emitted_exactly_once() {
    let kb = keyboard();
    let mut mapper = KeyStateMapper::new();
    let mut sink = RecordingSink::default();
    let (x, y) = white_key_point(&kb, 0);

    for _ in 0..5 {
        let edges = mapper.compute_edges(&kb, &[tip(x, y)], &[70.0], 68.5, kb.total_keys());
        emit_note_events(&kb, &edges, &mut sink, 0, 84, 0).unwrap();
    }

    assert_eq!(sink.events.len(), 1);
}

#[test]
fn finger_above_press_plane_is_silent() {
    let kb = keyboard();
    let mut mapper = KeyStateMapper::new();
    let mut sink = RecordingSink::default();
    let (x, y) = white_key_point(&kb, 0);

    // Height below the threshold: finger hovers without pressing
    let edges = mapper.compute_edges(&kb, &[tip(x, y)], &[60.0], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 0, 84, 0).unwrap();

    assert!(sink.events.is_empty());
}

#[test]
fn note_shift_transposes_and_drops_out_of_range() {
    let kb = keyboard();
    let mut mapper = KeyStateMapper::new();
    let mut sink = RecordingSink::default();
    let (x, y) = white_key_point(&kb, 0); // key 0, note 36

    let edges = mapper.compute_edges(&kb, &[tip(x, y)], &[70.0], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 0, 84, 12).unwrap();
    assert_eq!(
        sink.events,
        vec![Event::On {
            channel: 0,
            note: 48,
            velocity: 84
        }]
    );

    // A shift below MIDI 0 drops the event instead of wrapping
    let mut sink = RecordingSink::default();
    let mut mapper = KeyStateMapper::new();
    let edges = mapper.compute_edges(&kb, &[tip(x, y)], &[70.0], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 0, 84, -37).unwrap();
    assert!(sink.events.is_empty());
}

#[test]
fn channel_and_velocity_are_forwarded() {
    let kb = keyboard();
    let mut mapper = KeyStateMapper::new();
    let mut sink = RecordingSink::default();
    let (x, y) = white_key_point(&kb, 7); // middle C column

    let edges = mapper.compute_edges(&kb, &[tip(x, y)], &[70.0], 68.5, kb.total_keys());
    emit_note_events(&kb, &edges, &mut sink, 9, 100, 0).unwrap();

    assert_eq!(
        sink.events,
        vec![Event::On {
            channel: 9,
            note: 48,
            velocity: 100
        }]
    );
}
