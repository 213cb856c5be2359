//! Host Traffic Simulator
//!
//! Drives a [`Processor`] with seeded random host traffic and checks every
//! observable outcome against a simple model:
//! 1. Valid requests: expected event, universe contents, parameters, reply frames
//! 2. Corrupted requests: no event, no reply, processor back to idle
//! 3. Line noise: never panics; model resynchronised afterwards
//!
//! Bytes are delivered in random chunk sizes so partial headers and payloads
//! are exercised on every run.

use crate::event::Event;
use crate::processor::{Processor, ProcessorStats};
use crate::serial::MemorySerial;
use crate::state_machine::ProcessorState;
use dmxpro_protocol::{Frame, Label, WidgetParameters, MAX_PAYLOAD, MAX_USER_CONFIG};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt::Write as _;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Host operations to generate
    pub total_operations: u64,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Universe size of the simulated widget
    pub max_channels: u16,
    /// Serial number of the simulated widget
    pub serial_number: u32,
    /// Largest chunk handed to the port at once
    pub max_chunk: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 10_000,
            stop_on_first_violation: true,
            max_channels: 512,
            serial_number: 0x0000_2A2A,
            max_chunk: 64,
        }
    }
}

/// Host traffic generated by the simulator
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    SendDmx { start_code: u8, channels: Vec<u8> },
    GetParameters { user_size: u16 },
    StoreParameters { parameters: WidgetParameters, user_data: Vec<u8> },
    GetSerial,
    /// Well-formed frame with a label the widget ignores
    Unsupported { label: u8, payload: Vec<u8> },
    /// Well-formed frame whose end delimiter was replaced
    BadEnd { frame: Frame, end: u8 },
    /// Header declaring a payload above the limit
    OversizeLength { label: u8, length: u16 },
    Noise(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    SendDmx,
    GetParameters,
    StoreParameters,
    GetSerial,
    Unsupported,
    BadEnd,
    OversizeLength,
    Noise,
}

impl SimulatedOperation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SendDmx { .. } => OperationKind::SendDmx,
            Self::GetParameters { .. } => OperationKind::GetParameters,
            Self::StoreParameters { .. } => OperationKind::StoreParameters,
            Self::GetSerial => OperationKind::GetSerial,
            Self::Unsupported { .. } => OperationKind::Unsupported,
            Self::BadEnd { .. } => OperationKind::BadEnd,
            Self::OversizeLength { .. } => OperationKind::OversizeLength,
            Self::Noise(_) => OperationKind::Noise,
        }
    }

    /// Bytes the host puts on the line
    #[must_use]
    pub fn wire_bytes(&self) -> Vec<u8> {
        match self {
            Self::SendDmx {
                start_code,
                channels,
            } => encode(&Frame::send_dmx(*start_code, channels)),
            Self::GetParameters { user_size } => encode(&Frame::get_widget_parameters(*user_size)),
            Self::StoreParameters {
                parameters,
                user_data,
            } => encode(&Frame::store_widget_parameters(parameters, user_data)),
            Self::GetSerial => encode(&Frame::get_widget_serial()),
            Self::Unsupported { label, payload } => encode(&Frame::new(*label, payload.clone())),
            Self::BadEnd { frame, end } => {
                let mut bytes = encode(frame);
                if let Some(last) = bytes.last_mut() {
                    *last = *end;
                }
                bytes
            }
            Self::OversizeLength { label, length } => {
                let [lo, hi] = length.to_le_bytes();
                vec![0x7E, *label, lo, hi]
            }
            Self::Noise(bytes) => bytes.clone(),
        }
    }
}

fn encode(frame: &Frame) -> Vec<u8> {
    frame.encode().unwrap_or_default()
}

/// A disagreement between the processor and the model
#[derive(Debug, Clone)]
pub enum Violation {
    UnexpectedEvents {
        index: u64,
        kind: OperationKind,
        expected: Vec<Event>,
        actual: Vec<Event>,
    },
    UniverseMismatch {
        index: u64,
        kind: OperationKind,
        channel: usize,
        expected: u8,
        actual: u8,
    },
    ParametersMismatch {
        index: u64,
        kind: OperationKind,
        expected: WidgetParameters,
        actual: WidgetParameters,
    },
    ReplyMismatch {
        index: u64,
        kind: OperationKind,
        detail: String,
    },
    NotIdle {
        index: u64,
        kind: OperationKind,
        state: ProcessorState,
    },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    pub operations: u64,
    pub valid_frames: u64,
    pub corrupted_frames: u64,
    pub noise_bursts: u64,
    pub bytes_fed: u64,
    pub chunks_fed: u64,
    pub events_observed: u64,
    pub replies_checked: u64,
}

/// Final report from simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    pub processor_stats: ProcessorStats,
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== DMX Pro Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Universe Size: {}", self.config.max_channels);
        let _ = writeln!(report, "Operations: {}", self.stats.operations);
        let _ = writeln!(report, "Valid Frames: {}", self.stats.valid_frames);
        let _ = writeln!(report, "Corrupted Frames: {}", self.stats.corrupted_frames);
        let _ = writeln!(report, "Noise Bursts: {}", self.stats.noise_bursts);
        let _ = writeln!(report, "Bytes Fed: {} in {} chunks", self.stats.bytes_fed, self.stats.chunks_fed);
        let _ = writeln!(report, "Events Observed: {}", self.stats.events_observed);
        let _ = writeln!(report, "Replies Checked: {}", self.stats.replies_checked);
        let _ = writeln!(report, "Frames Accepted: {}", self.processor_stats.frames_accepted);
        let _ = writeln!(report, "Frames Rejected: {}", self.processor_stats.frames_rejected());
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// What the widget should look like from the outside
struct Model {
    universe: Vec<u8>,
    parameters: WidgetParameters,
}

impl Model {
    fn new(max_channels: u16) -> Self {
        Self {
            universe: vec![0; usize::from(max_channels)],
            parameters: WidgetParameters::default(),
        }
    }

    fn apply_channels(&mut self, channels: &[u8]) {
        for (slot, value) in self.universe.iter_mut().zip(channels) {
            *slot = *value;
        }
    }

    fn resync(&mut self, processor: &Processor<MemorySerial>) {
        self.universe.copy_from_slice(processor.dmx_data());
        self.parameters = *processor.parameters();
    }
}

/// Run the DMX Pro simulator
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut processor = Processor::new(MemorySerial::new(), config.serial_number, config.max_channels);
    let mut model = Model::new(config.max_channels);
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    for index in 0..config.total_operations {
        let operation = generate_operation(&mut rng);
        let bytes = operation.wire_bytes();
        let events = deliver(&mut processor, &bytes, &mut rng, config.max_chunk, &mut stats);
        let output = processor.port_mut().take_output();

        stats.operations += 1;
        stats.events_observed += events.len() as u64;
        match operation.kind() {
            OperationKind::BadEnd | OperationKind::OversizeLength => stats.corrupted_frames += 1,
            OperationKind::Noise => stats.noise_bursts += 1,
            _ => stats.valid_frames += 1,
        }

        let found = check_operation(
            index,
            &operation,
            &events,
            &output,
            &processor,
            &mut model,
            &config,
            &mut stats,
        );

        if operation.kind() == OperationKind::Noise {
            processor.reset();
            processor.port_mut().clear_input();
            model.resync(&processor);
        }

        let failed = !found.is_empty();
        violations.extend(found);
        if failed && config.stop_on_first_violation {
            break;
        }
    }

    SimulatorReport {
        config,
        stats,
        processor_stats: processor.stats(),
        violations,
    }
}

/// Feed `bytes` in random chunks, polling after each one
fn deliver(
    processor: &mut Processor<MemorySerial>,
    bytes: &[u8],
    rng: &mut StdRng,
    max_chunk: usize,
    stats: &mut SimulatorStats,
) -> Vec<Event> {
    let mut events = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let size = rng.gen_range(1..=max_chunk.max(1)).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        processor.port_mut().feed(chunk);
        events.extend(processor.process_available());
        stats.chunks_fed += 1;
        stats.bytes_fed += size as u64;
        rest = tail;
    }
    events
}

fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen::<u8>()).collect()
}

fn random_parameters(rng: &mut StdRng) -> WidgetParameters {
    WidgetParameters::new(rng.gen_range(9..=127), rng.gen_range(1..=127), rng.gen_range(0..=40))
}

fn random_unsupported_label(rng: &mut StdRng) -> u8 {
    loop {
        let byte = rng.gen::<u8>();
        if !Label::from_byte(byte).is_supported() {
            return byte;
        }
    }
}

/// Generate a random host operation
fn generate_operation(rng: &mut StdRng) -> SimulatedOperation {
    match rng.gen_range(0..100) {
        0..=34 => {
            let len = if rng.gen_bool(0.2) {
                MAX_PAYLOAD - 1
            } else {
                rng.gen_range(0..=MAX_PAYLOAD - 1)
            };
            SimulatedOperation::SendDmx {
                start_code: if rng.gen_bool(0.9) { 0 } else { rng.gen() },
                channels: random_bytes(rng, len),
            }
        }
        35..=44 => SimulatedOperation::GetParameters {
            user_size: rng.gen_range(0..=600),
        },
        45..=54 => {
            let len = rng.gen_range(0..=16);
            SimulatedOperation::StoreParameters {
                parameters: random_parameters(rng),
                user_data: random_bytes(rng, len),
            }
        }
        55..=64 => SimulatedOperation::GetSerial,
        65..=74 => {
            let len = rng.gen_range(0..=64);
            SimulatedOperation::Unsupported {
                label: random_unsupported_label(rng),
                payload: random_bytes(rng, len),
            }
        }
        75..=84 => {
            let frame = match rng.gen_range(0..4) {
                0 => {
                    let len = rng.gen_range(0..=32);
                    Frame::send_dmx(0, &random_bytes(rng, len))
                }
                1 => Frame::get_widget_parameters(rng.gen_range(0..=16)),
                2 => Frame::store_widget_parameters(&random_parameters(rng), &[]),
                _ => Frame::get_widget_serial(),
            };
            let end = loop {
                let byte = rng.gen::<u8>();
                if byte != 0xE7 {
                    break byte;
                }
            };
            SimulatedOperation::BadEnd { frame, end }
        }
        85..=89 => SimulatedOperation::OversizeLength {
            label: rng.gen(),
            length: rng.gen_range(601..=u16::MAX),
        },
        _ => {
            let len = rng.gen_range(1..=32);
            SimulatedOperation::Noise(random_bytes(rng, len))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_operation(
    index: u64,
    operation: &SimulatedOperation,
    events: &[Event],
    output: &[u8],
    processor: &Processor<MemorySerial>,
    model: &mut Model,
    config: &SimulatorConfig,
    stats: &mut SimulatorStats,
) -> Vec<Violation> {
    let kind = operation.kind();
    let mut found = Vec::new();

    if kind == OperationKind::Noise {
        return found;
    }

    let expected_events = match operation {
        SimulatedOperation::SendDmx { channels, .. } => {
            model.apply_channels(channels);
            vec![Event::DmxData]
        }
        SimulatedOperation::GetParameters { user_size } => {
            let mut payload = model.parameters.to_bytes().to_vec();
            payload.resize(payload.len() + usize::from((*user_size).min(MAX_USER_CONFIG)), 0);
            check_reply(index, kind, output, Label::GET_WIDGET_PARAMETERS_REPLY, &payload, stats, &mut found);
            vec![Event::ParametersRequested]
        }
        SimulatedOperation::StoreParameters { parameters, .. } => {
            model.parameters = *parameters;
            vec![Event::ParametersChanged]
        }
        SimulatedOperation::GetSerial => {
            let payload = config.serial_number.to_le_bytes();
            check_reply(index, kind, output, Label::GET_WIDGET_SERIAL_REPLY, &payload, stats, &mut found);
            vec![Event::SerialRequested]
        }
        SimulatedOperation::BadEnd { frame, .. } => {
            if frame.label() == Label::SendDmxData {
                // channel writes are not rolled back
                model.apply_channels(frame.payload().get(1..).unwrap_or_default());
            }
            Vec::new()
        }
        SimulatedOperation::Unsupported { .. }
        | SimulatedOperation::OversizeLength { .. }
        | SimulatedOperation::Noise(_) => Vec::new(),
    };

    if events != expected_events.as_slice() {
        found.push(Violation::UnexpectedEvents {
            index,
            kind,
            expected: expected_events,
            actual: events.to_vec(),
        });
    }

    let expects_reply = matches!(kind, OperationKind::GetParameters | OperationKind::GetSerial);
    if !expects_reply && !output.is_empty() {
        found.push(Violation::ReplyMismatch {
            index,
            kind,
            detail: format!("unexpected output of {} bytes", output.len()),
        });
    }

    if let Some((channel, (expected, actual))) = model
        .universe
        .iter()
        .zip(processor.dmx_data())
        .enumerate()
        .find(|(_, (expected, actual))| expected != actual)
    {
        found.push(Violation::UniverseMismatch {
            index,
            kind,
            channel: channel + 1,
            expected: *expected,
            actual: *actual,
        });
    }

    if *processor.parameters() != model.parameters {
        found.push(Violation::ParametersMismatch {
            index,
            kind,
            expected: model.parameters,
            actual: *processor.parameters(),
        });
    }

    if processor.state() != ProcessorState::Idle {
        found.push(Violation::NotIdle {
            index,
            kind,
            state: processor.state(),
        });
    }

    found
}

fn check_reply(
    index: u64,
    kind: OperationKind,
    output: &[u8],
    label: Label,
    payload: &[u8],
    stats: &mut SimulatorStats,
    found: &mut Vec<Violation>,
) {
    stats.replies_checked += 1;
    let detail = match Frame::parse_all(output) {
        Ok(frames) if frames.len() != 1 => format!("expected one reply, got {}", frames.len()),
        Ok(frames) if frames[0].label() != label => {
            format!("reply label {} instead of {label}", frames[0].label())
        }
        Ok(frames) if frames[0].payload() != payload => "reply payload differs".to_string(),
        Ok(_) => return,
        Err(e) => format!("reply does not parse: {e}"),
    };
    found.push(Violation::ReplyMismatch { index, kind, detail });
}
