//! Testing utilities for the DMX Pro workspace
//!
//! Shared frame builders, fixtures and assertions.

#![allow(missing_docs)]

use dmxpro_protocol::{Frame, WidgetParameters};
use dmxpro_widget::{Event, MemorySerial, Processor};

pub const TEST_SERIAL: u32 = 0x1234_5678;

/// Processor with a full universe and [`TEST_SERIAL`]
pub fn setup_processor() -> Processor<MemorySerial> {
    setup_processor_with_channels(512)
}

pub fn setup_processor_with_channels(max_channels: u16) -> Processor<MemorySerial> {
    Processor::new(MemorySerial::new(), TEST_SERIAL, max_channels)
}

/// Wire bytes of `frame`; panics on oversize payloads
pub fn wire(frame: &Frame) -> Vec<u8> {
    frame.encode().expect("test frame fits the payload limit")
}

pub fn send_dmx_bytes(channels: &[u8]) -> Vec<u8> {
    wire(&Frame::send_dmx(0, channels))
}

pub fn get_parameters_bytes(user_size: u16) -> Vec<u8> {
    wire(&Frame::get_widget_parameters(user_size))
}

pub fn store_parameters_bytes(break_time: u8, mab: u8, rate: u8) -> Vec<u8> {
    wire(&Frame::store_widget_parameters(
        &WidgetParameters::new(break_time, mab, rate),
        &[],
    ))
}

pub fn get_serial_bytes() -> Vec<u8> {
    wire(&Frame::get_widget_serial())
}

/// Raw frame bytes with an arbitrary label and a caller-chosen end byte
pub fn raw_frame(label: u8, payload: &[u8], end: u8) -> Vec<u8> {
    let len = u16::try_from(payload.len()).expect("payload length fits u16");
    let mut bytes = vec![0x7E, label];
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes.push(end);
    bytes
}

/// Feed `bytes` and drain the processor
pub fn feed(processor: &mut Processor<MemorySerial>, bytes: &[u8]) -> Vec<Event> {
    processor.port_mut().feed(bytes);
    processor.process_available()
}

/// Feed `bytes` one at a time, polling after each
pub fn feed_bytewise(processor: &mut Processor<MemorySerial>, bytes: &[u8]) -> Vec<Event> {
    let mut events = Vec::new();
    for byte in bytes {
        processor.port_mut().feed(std::slice::from_ref(byte));
        events.extend(processor.process_available());
    }
    events
}

/// Parse everything the widget wrote since the last call
pub fn take_replies(processor: &mut Processor<MemorySerial>) -> Vec<Frame> {
    let output = processor.port_mut().take_output();
    Frame::parse_all(&output).expect("widget output is well-formed frames")
}
