//! Widget-side message processor
//!
//! Parses the host byte stream one step at a time:
//!
//! ```text
//! Idle --0x7E--> TypeWait --label--> LengthWait --len<=600--> DataWait --> EndWait --> Idle
//!                                         \--len>600--> Idle
//! ```
//!
//! Malformed input never produces an error. The processor drops back to
//! [`ProcessorState::Idle`] and waits for the next start delimiter.

use crate::config::WidgetConfig;
use crate::event::Event;
use crate::logging::{FrameLog, FrameOutcome, RejectReason};
use crate::serial::SerialPort;
use crate::state_machine::{self, ProcessorState};
use crate::universe::DmxUniverse;
use dmxpro_protocol::{
    Delimiter, DmxStatus, Frame, Label, ProtocolError, WidgetParameters, MAX_PAYLOAD,
    MAX_USER_CONFIG,
};
use serde::Serialize;
use std::sync::Arc;

/// Leading bytes of a store request: user size (2), break, MAB, rate
const STORE_HEADER_LEN: u16 = 5;

/// Leading bytes of a get-parameters request: user size (2)
const GET_PARAMETERS_HEADER_LEN: u16 = 2;

/// Counters kept by a [`Processor`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    /// Bytes read from the port
    pub bytes_read: u64,
    /// Bytes discarded while waiting for a start delimiter
    pub noise_bytes: u64,
    /// Messages that ended with a valid end delimiter
    pub frames_accepted: u64,
    /// Messages dropped for a bad end delimiter
    pub bad_end_delimiters: u64,
    /// Messages dropped for an oversize length
    pub oversize_lengths: u64,
    /// Reply frames written to the host
    pub replies_sent: u64,
}

impl ProcessorStats {
    /// Messages dropped for any reason
    #[inline]
    #[must_use]
    pub fn frames_rejected(&self) -> u64 {
        self.bad_end_delimiters + self.oversize_lengths
    }
}

/// DMX Pro widget emulator bound to a serial port
#[derive(Debug)]
pub struct Processor<S> {
    port: S,
    state: ProcessorState,
    label: Label,
    label_byte: u8,
    data_length: u16,
    data_received: u16,
    pending_parameters: Option<[u8; 3]>,
    universe: DmxUniverse,
    parameters: WidgetParameters,
    user_configuration_size: u16,
    serial_number: u32,
    stats: ProcessorStats,
    log: Option<Arc<FrameLog>>,
}

impl<S: SerialPort> Processor<S> {
    /// Create a processor with `max_channels` zeroed channels and default
    /// widget parameters
    pub fn new(port: S, serial_number: u32, max_channels: u16) -> Self {
        Self {
            port,
            state: ProcessorState::Idle,
            label: Label::Invalid,
            label_byte: Label::Invalid.as_byte(),
            data_length: 0,
            data_received: 0,
            pending_parameters: None,
            universe: DmxUniverse::new(max_channels),
            parameters: WidgetParameters::default(),
            user_configuration_size: 0,
            serial_number,
            stats: ProcessorStats::default(),
            log: None,
        }
    }

    /// Create a processor from configuration
    pub fn with_config(port: S, config: &WidgetConfig) -> Self {
        let mut processor = Self::new(port, config.serial_number, config.max_channels);
        processor.parameters = config.parameters;
        processor
    }

    /// Record accepted and rejected messages in `log`
    #[must_use]
    pub fn with_log(mut self, log: Arc<FrameLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Advance the state machine by one step.
    ///
    /// Does nothing when no byte is available. Call repeatedly from a poll
    /// loop; most steps consume a single byte.
    pub fn process(&mut self) -> Event {
        if self.port.available() == 0 {
            return Event::None;
        }
        self.step().0
    }

    /// Step until the port is drained or no further progress is possible,
    /// returning every event other than [`Event::None`] in order
    pub fn process_available(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while self.port.available() > 0 {
            let (event, progressed) = self.step();
            if !event.is_none() {
                events.push(event);
            }
            if !progressed {
                break;
            }
        }
        events
    }

    /// Value of 1-based `channel`, or `None` outside the universe
    #[inline]
    #[must_use]
    pub fn channel(&self, channel: u16) -> Option<u8> {
        self.universe.get(channel)
    }

    /// Channel data, channel 1 first
    #[inline]
    #[must_use]
    pub fn dmx_data(&self) -> &[u8] {
        self.universe.as_slice()
    }

    #[inline]
    #[must_use]
    pub fn universe(&self) -> &DmxUniverse {
        &self.universe
    }

    /// Channels reserved in the universe
    #[inline]
    #[must_use]
    pub fn max_channels(&self) -> usize {
        self.universe.len()
    }

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &WidgetParameters {
        &self.parameters
    }

    #[inline]
    #[must_use]
    pub fn serial_number(&self) -> u32 {
        self.serial_number
    }

    /// User configuration size from the last get-parameters request
    #[inline]
    #[must_use]
    pub fn user_configuration_size(&self) -> u16 {
        self.user_configuration_size
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    #[inline]
    #[must_use]
    pub fn log(&self) -> Option<&Arc<FrameLog>> {
        self.log.as_ref()
    }

    #[inline]
    pub fn port(&self) -> &S {
        &self.port
    }

    #[inline]
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    #[inline]
    pub fn into_port(self) -> S {
        self.port
    }

    /// Drop any partial message and wait for a start delimiter.
    ///
    /// Channel data and parameters are kept.
    pub fn reset(&mut self) {
        if self.state != ProcessorState::Idle {
            tracing::debug!(state = %self.state, "processor reset");
        }
        self.state = ProcessorState::Idle;
        self.data_length = 0;
        self.data_received = 0;
        self.pending_parameters = None;
    }

    /// Upload received DMX data to the host
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] when `data` does not fit
    /// one frame
    pub fn upload_dmx(&mut self, status: DmxStatus, data: &[u8]) -> Result<(), ProtocolError> {
        let frame = Frame::receive_dmx(status, data)?;
        self.send_frame(&frame)
    }

    fn step(&mut self) -> (Event, bool) {
        match self.state {
            ProcessorState::Idle => {
                self.obtain_start_byte();
                (Event::None, true)
            }
            ProcessorState::TypeWait => {
                self.obtain_type_byte();
                (Event::None, true)
            }
            ProcessorState::LengthWait => (Event::None, self.obtain_length_bytes()),
            ProcessorState::DataWait => (Event::None, self.obtain_data_bytes()),
            ProcessorState::EndWait => {
                let event = if self.obtain_end_byte() {
                    self.process_message()
                } else {
                    Event::None
                };
                (event, true)
            }
        }
    }

    fn transition(&mut self, to: ProcessorState) {
        match state_machine::validate_transition(self.state, to) {
            Ok(()) => {
                tracing::trace!(from = %self.state, %to, "transition");
                self.state = to;
            }
            Err(e) => {
                tracing::error!(error = %e, "framing state machine out of sync");
                self.reset();
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.port.read_byte()?;
        self.stats.bytes_read += 1;
        Some(byte)
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.port.available() < N {
            return None;
        }
        let mut buf = [0u8; N];
        let read = self.port.read_into(&mut buf);
        self.stats.bytes_read += read as u64;
        (read == N).then_some(buf)
    }

    fn obtain_start_byte(&mut self) {
        match self.read_byte() {
            Some(byte) if Delimiter::Start.matches(byte) => {
                self.transition(ProcessorState::TypeWait);
            }
            Some(_) => self.stats.noise_bytes += 1,
            None => {}
        }
    }

    fn obtain_type_byte(&mut self) {
        if let Some(byte) = self.read_byte() {
            self.label_byte = byte;
            self.label = Label::from_byte(byte);
            self.transition(ProcessorState::LengthWait);
        }
    }

    fn obtain_length_bytes(&mut self) -> bool {
        let Some(bytes) = self.read_array::<2>() else {
            return false;
        };
        let length = u16::from_le_bytes(bytes);
        if usize::from(length) > MAX_PAYLOAD {
            tracing::debug!(label = %self.label, length, "length exceeds payload limit");
            self.stats.oversize_lengths += 1;
            self.record(length, FrameOutcome::Rejected(RejectReason::LengthTooLarge));
            self.transition(ProcessorState::Idle);
        } else {
            self.data_length = length;
            self.data_received = 0;
            self.pending_parameters = None;
            if self.label == Label::GetWidgetParameters {
                self.user_configuration_size = 0;
            }
            self.transition(ProcessorState::DataWait);
        }
        true
    }

    fn obtain_data_bytes(&mut self) -> bool {
        if self.data_received == self.data_length {
            self.transition(ProcessorState::EndWait);
            return true;
        }
        match self.label {
            Label::SendDmxData => self.send_dmx_data_acq_data(),
            Label::GetWidgetParameters => self.get_widget_parameters_acq_data(),
            Label::StoreWidgetParameters => self.store_widget_parameters_acq_data(),
            _ => self.discard_data_segment(),
        }
    }

    fn discard_data_segment(&mut self) -> bool {
        if self.read_byte().is_none() {
            return false;
        }
        self.data_received += 1;
        true
    }

    fn send_dmx_data_acq_data(&mut self) -> bool {
        if self.data_received == 0 {
            // DMX start code
            return self.discard_data_segment();
        }
        let mut progressed = false;
        while self.data_received != self.data_length {
            let Some(value) = self.read_byte() else {
                break;
            };
            self.universe
                .set_index(usize::from(self.data_received - 1), value);
            self.data_received += 1;
            progressed = true;
        }
        progressed
    }

    fn get_widget_parameters_acq_data(&mut self) -> bool {
        if self.data_received != 0 || self.data_length < GET_PARAMETERS_HEADER_LEN {
            return self.discard_data_segment();
        }
        let Some(bytes) = self.read_array::<2>() else {
            return false;
        };
        self.user_configuration_size = u16::from_le_bytes(bytes).min(MAX_USER_CONFIG);
        self.data_received += GET_PARAMETERS_HEADER_LEN;
        true
    }

    fn store_widget_parameters_acq_data(&mut self) -> bool {
        if self.data_received != 0 || self.data_length < STORE_HEADER_LEN {
            return self.discard_data_segment();
        }
        let Some([_, _, break_time, mab, rate]) = self.read_array::<5>() else {
            return false;
        };
        self.pending_parameters = Some([break_time, mab, rate]);
        self.data_received += STORE_HEADER_LEN;
        true
    }

    fn obtain_end_byte(&mut self) -> bool {
        let Some(byte) = self.read_byte() else {
            return false;
        };
        self.transition(ProcessorState::Idle);
        if Delimiter::End.matches(byte) {
            self.stats.frames_accepted += 1;
            true
        } else {
            tracing::debug!(label = %self.label, found = byte, "bad end delimiter");
            self.stats.bad_end_delimiters += 1;
            self.pending_parameters = None;
            self.record(
                self.data_length,
                FrameOutcome::Rejected(RejectReason::BadEndDelimiter),
            );
            false
        }
    }

    fn process_message(&mut self) -> Event {
        let event = match self.label {
            Label::GetWidgetParameters => {
                let mut payload = self.parameters.to_bytes().to_vec();
                payload.resize(payload.len() + usize::from(self.user_configuration_size), 0);
                self.reply(Label::GET_WIDGET_PARAMETERS_REPLY, payload);
                Event::ParametersRequested
            }
            Label::StoreWidgetParameters => match self.pending_parameters.take() {
                Some(values) => {
                    self.parameters.read(&values);
                    Event::ParametersChanged
                }
                None => Event::None,
            },
            Label::SendDmxData => Event::DmxData,
            Label::GetWidgetSerial => {
                self.reply(
                    Label::GET_WIDGET_SERIAL_REPLY,
                    self.serial_number.to_le_bytes().to_vec(),
                );
                Event::SerialRequested
            }
            Label::Invalid
            | Label::ReprogramFirmware
            | Label::ProgramFlashPage
            | Label::ReceiveDmxData => Event::None,
        };
        tracing::trace!(label = %self.label, length = self.data_length, %event, "message accepted");
        self.record(self.data_length, FrameOutcome::Accepted(event));
        event
    }

    fn reply(&mut self, label: Label, payload: Vec<u8>) {
        if let Err(e) = self.send_frame(&Frame::new(label, payload)) {
            tracing::error!(%label, error = %e, "failed to encode reply");
        }
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        let bytes = frame.encode()?;
        self.port.write(&bytes);
        self.stats.replies_sent += 1;
        Ok(())
    }

    fn record(&self, length: u16, outcome: FrameOutcome) {
        if let Some(log) = &self.log {
            log.append(self.label_byte, length, outcome);
        }
    }
}
