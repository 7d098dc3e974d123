// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Native Instruments Maschine Jam
//!
//! Translates input reports into MIDI messages and incoming MIDI
//! messages into LED output reports.

use std::{io, ops::Range, sync::Arc};

use parking_lot::{Mutex, RwLock};
use strum::{EnumCount, EnumIter, FromRepr, IntoEnumIterator as _};

use crate::{
    input::{ConfigError, ControlConfig},
    midi::{
        BoxedMidiOutputConnection, ChannelMessage, Decoded, MidiDecoder, MidiEncoder,
        MidiInputHandler, MidiMessage, MidiOutputConnection as _, MAX_MESSAGE_LEN,
    },
    output::{
        DeferredWriter, ReportOutputConnection, RouteKind, RoutingTable, SentinelId,
        ShadowBuffer,
    },
};

pub mod report;
use self::report::{
    decode_button_bit, decode_knob_nibble, decode_strip, encode_button_bit, encode_knob_nibble,
    new_buttons_report, new_strips_report, ButtonsReport, InputReport, ReportError, StripState,
    StripsReport, NUM_BUTTONS, NUM_KNOBS, NUM_STRIPS, NUM_STRIP_FINGERS,
};

pub mod input;
use self::input::{diff_buttons_report, diff_strips_report, InputConfig, StripInput};

pub mod output;
use self::output::{default_routing_table, IndicatorGroup, OutputNode};

pub mod strip;
use self::strip::{StripDisplay, StripDisplayUpdate, StripDisplays};

#[cfg(feature = "hid")]
pub mod hid;


pub const VENDOR_ID: u16 = 0x17cc;
pub const PRODUCT_ID: u16 = 0x1500;

pub const VENDOR_NAME: &str = "Native Instruments";
pub const PRODUCT_NAME: &str = "Maschine Jam";

/// Named buttons.
///
/// The buttons of the 8x8 pad matrix are addressed by
/// [`matrix_button()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
#[repr(u8)]
pub enum Button {
    Song = 0,
    Scene1,
    Scene2,
    Scene3,
    Scene4,
    Scene5,
    Scene6,
    Scene7,
    Scene8,
    Step,
    PadMode,
    Clear,
    Duplicate,
    DpadUp,
    DpadLeft,
    DpadRight,
    DpadDown,
    NoteRepeat,
    GroupA = 82,
    GroupB,
    GroupC,
    GroupD,
    GroupE,
    GroupF,
    GroupG,
    GroupH,
    Mst,
    Grp,
    In1,
    Cue,
    Browse,
    Macro,
    Level,
    Aux,
    Control,
    Auto,
    Perform,
    Notes,
    Lock,
    Tune,
    Swing,
    /// Also reported by a system exclusive message
    Shift,
    Play,
    Rec,
    PageLeft,
    PageRight,
    Tempo,
    Grid,
    Solo,
    Mute,
    Select,
    EncoderTouch,
    EncoderPush,
}

pub const MATRIX_BUTTONS: Range<usize> = 18..82;

pub const MATRIX_SIZE: usize = 8;

/// Index of a button in the pad matrix, row by row from the top.
#[must_use]
pub const fn matrix_button(row: usize, column: usize) -> usize {
    debug_assert!(row < MATRIX_SIZE);
    debug_assert!(column < MATRIX_SIZE);
    MATRIX_BUTTONS.start + row * MATRIX_SIZE + column
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Number of threads for writing output reports
    pub writer_threads: usize,

    /// Omit repeated status bytes of outgoing MIDI messages
    pub running_status: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            writer_threads: 2,
            running_status: false,
        }
    }
}

/// Addresses a configurable input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputControl {
    Knob(usize),
    Button(usize),
    Strip {
        strip: usize,
        finger: usize,
        input: StripInput,
    },
}

const fn check_index(index: usize, count: usize) -> Result<(), ConfigError> {
    if index >= count {
        return Err(ConfigError::IndexOutOfRange { index, count });
    }
    Ok(())
}

impl InputControl {
    pub const fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Knob(index) => check_index(index, NUM_KNOBS),
            Self::Button(index) => check_index(index, NUM_BUTTONS),
            Self::Strip {
                strip,
                finger,
                input: _,
            } => {
                if let Err(err) = check_index(strip, NUM_STRIPS) {
                    return Err(err);
                }
                check_index(finger, NUM_STRIP_FINGERS)
            }
        }
    }

    fn config(self, config: &InputConfig) -> &ControlConfig {
        match self {
            Self::Knob(index) => &config.knobs[index],
            Self::Button(index) => &config.buttons[index],
            Self::Strip {
                strip,
                finger,
                input,
            } => &config.strips[strip][finger][input as usize],
        }
    }

    fn config_mut(self, config: &mut InputConfig) -> &mut ControlConfig {
        match self {
            Self::Knob(index) => &mut config.knobs[index],
            Self::Button(index) => &mut config.buttons[index],
            Self::Strip {
                strip,
                finger,
                input,
            } => &mut config.strips[strip][finger][input as usize],
        }
    }
}

/// Last received input reports.
#[derive(Debug)]
struct ReportState {
    buttons: Mutex<ButtonsReport>,
    strips: Mutex<StripsReport>,
}

impl Default for ReportState {
    fn default() -> Self {
        Self {
            buttons: Mutex::new(new_buttons_report()),
            strips: Mutex::new(new_strips_report()),
        }
    }
}

/// Encodes and sends messages to the host.
struct Outbox {
    encoder: MidiEncoder,
    connection: Option<BoxedMidiOutputConnection>,
    buf: [u8; MAX_MESSAGE_LEN],
}

impl Outbox {
    fn send(&mut self, message: &MidiMessage<'_>) {
        let Self {
            encoder,
            connection,
            buf,
        } = self;
        let Some(connection) = connection else {
            log::debug!("Dropping {message}: MIDI output detached");
            return;
        };
        let len = match encoder.encode(message, buf) {
            Ok(len) => len,
            Err(err) => {
                log::warn!("Failed to encode {message}: {err}");
                return;
            }
        };
        log::trace!("Sending {message}");
        if let Err(err) = connection.send_midi_output(&buf[..len]) {
            log::error!("Failed to send {message}: {err}");
            // The receiver might have missed the status byte.
            encoder.reset();
        }
    }
}

/// Translation state of a single device.
///
/// All handlers take `&self` and can be invoked concurrently. Locks
/// are acquired in a fixed order: input report, input configuration,
/// and outbox when handling reports; decoder, routing table, strip
/// displays, and shadow buffer when handling MIDI input.
#[allow(missing_debug_implementations)]
pub struct DeviceContext {
    report_state: ReportState,
    input_config: RwLock<InputConfig>,
    outbox: Mutex<Outbox>,
    decoder: Mutex<MidiDecoder>,
    routing: RwLock<RoutingTable>,
    strip_displays: Mutex<StripDisplays>,
    writer: DeferredWriter,
}

impl DeviceContext {
    /// Create the context with the default configuration.
    ///
    /// Spawns the writer threads that send output reports
    /// to `report_output`.
    pub fn new(
        report_output: Arc<dyn ReportOutputConnection>,
        settings: &Settings,
    ) -> io::Result<Self> {
        let groups = IndicatorGroup::iter()
            .map(|group| Arc::new(group.new_shadow_buffer()))
            .collect::<Vec<_>>()
            .into();
        let writer = DeferredWriter::spawn(groups, report_output, settings.writer_threads)?;
        Ok(Self {
            report_state: Default::default(),
            input_config: Default::default(),
            outbox: Mutex::new(Outbox {
                encoder: MidiEncoder::new(settings.running_status),
                connection: None,
                buf: [0; MAX_MESSAGE_LEN],
            }),
            decoder: Default::default(),
            routing: RwLock::new(default_routing_table()),
            strip_displays: Default::default(),
            writer,
        })
    }

    /// Connect the MIDI output to the host.
    ///
    /// Returns the previous connection.
    pub fn attach_midi_output(
        &self,
        connection: BoxedMidiOutputConnection,
    ) -> Option<BoxedMidiOutputConnection> {
        let mut outbox = self.outbox.lock();
        outbox.encoder.reset();
        outbox.connection.replace(connection)
    }

    /// Disconnect the MIDI output from the host.
    ///
    /// Messages are dropped until a new output is attached.
    pub fn detach_midi_output(&self) -> Option<BoxedMidiOutputConnection> {
        self.outbox.lock().connection.take()
    }

    /// Send the initial state of all indicators.
    ///
    /// Should be invoked once after the device has been connected.
    pub fn initialize(&self) {
        log::debug!("Initializing indicators");
        self.writer.schedule_all();
    }

    /// Turn off all indicators and wait until all pending reports
    /// have been sent.
    ///
    /// Should be invoked once before the device is disconnected.
    /// Subsequent output is discarded.
    pub fn finalize(&self) {
        log::debug!("Finalizing indicators");
        {
            let mut strip_displays = self.strip_displays.lock();
            strip_displays.reset();
            for group in self.writer.groups() {
                group.clear();
            }
        }
        self.writer.schedule_all();
        self.writer.shutdown();
    }

    #[must_use]
    pub fn shadow_buffer(&self, group: IndicatorGroup) -> &ShadowBuffer {
        &self.writer.groups()[group as usize]
    }

    /// Handle an input report from the device.
    ///
    /// Invalid reports are discarded.
    pub fn handle_report(&self, data: &[u8]) -> Result<(), ReportError> {
        let report = InputReport::parse(data)
            .inspect_err(|err| log::warn!("Discarding input report: {err}"))?;
        match report {
            InputReport::Buttons(report) => {
                let mut stored = self.report_state.buttons.lock();
                let config = self.input_config.read();
                let mut outbox = self.outbox.lock();
                diff_buttons_report(&mut stored, report, &config, |message| {
                    outbox.send(&message);
                });
            }
            InputReport::Strips(report) => {
                let mut stored = self.report_state.strips.lock();
                let config = self.input_config.read();
                let mut outbox = self.outbox.lock();
                diff_strips_report(&mut stored, report, &config, |message| {
                    outbox.send(&message);
                });
            }
        }
        Ok(())
    }

    /// Handle raw MIDI input from the host.
    ///
    /// Returns `false` if the decoder had to resynchronize.
    pub fn handle_midi_input(&self, input: &[u8]) -> bool {
        let mut decoder = self.decoder.lock();
        let mut in_sync = true;
        for &byte in input {
            match decoder.decode_byte(byte) {
                Decoded::Incomplete => (),
                Decoded::Message(MidiMessage::Channel(message)) => {
                    self.dispatch_channel_message(&message);
                }
                Decoded::Message(MidiMessage::SystemExclusive(payload)) => {
                    self.dispatch_exclusive_message(payload);
                }
                Decoded::Error(err) => {
                    log::warn!("Resynchronizing MIDI input: {err}");
                    in_sync = false;
                }
            }
        }
        in_sync
    }

    fn dispatch_channel_message(&self, message: &ChannelMessage) {
        let Some((kind, value)) = RouteKind::of_message(message) else {
            log::trace!("Ignoring {message}");
            return;
        };
        let Some(sentinel) = RoutingTable::lookup(kind, message.channel, message.key) else {
            return;
        };
        let mut pending = [false; IndicatorGroup::COUNT];
        {
            let routing = self.routing.read();
            for node in routing.nodes(sentinel).map(OutputNode::from_id) {
                let buffer = self.shadow_buffer(node.group);
                match node.group {
                    IndicatorGroup::ButtonLeds | IndicatorGroup::PadLeds => {
                        buffer.set(node.index, value);
                    }
                    IndicatorGroup::Strips => {
                        let mut strip_displays = self.strip_displays.lock();
                        strip_displays.set_value(node.index, value);
                        let (offset, segments) = strip_displays.render(node.index);
                        buffer.set_range(offset, &segments);
                    }
                }
                log::trace!("{message} -> {node}");
                pending[node.group as usize] = true;
            }
        }
        if !pending.contains(&true) {
            log::debug!("Dropping unmapped {message}");
            return;
        }
        for (index, _) in pending.iter().enumerate().filter(|(_, pending)| **pending) {
            self.writer.schedule(index);
        }
    }

    fn dispatch_exclusive_message(&self, payload: &[u8]) {
        let Some(update) = StripDisplayUpdate::parse(payload) else {
            log::debug!("Dropping system exclusive message {payload:02x?}");
            return;
        };
        let changed = {
            let mut strip_displays = self.strip_displays.lock();
            let changed = strip_displays.apply(update);
            let buffer = self.shadow_buffer(IndicatorGroup::Strips);
            for strip in (0..NUM_STRIPS).filter(|strip| changed & (1 << strip) != 0) {
                let (offset, segments) = strip_displays.render(strip);
                buffer.set_range(offset, &segments);
            }
            changed
        };
        if changed != 0 {
            self.writer.schedule(IndicatorGroup::Strips as usize);
        }
    }

    pub fn read_config(&self, control: InputControl) -> Result<ControlConfig, ConfigError> {
        control.validate()?;
        Ok(*control.config(&self.input_config.read()))
    }

    /// Replace the configuration of an input control.
    ///
    /// Returns the previous configuration.
    pub fn write_config(
        &self,
        control: InputControl,
        config: ControlConfig,
    ) -> Result<ControlConfig, ConfigError> {
        control.validate()?;
        config.validate()?;
        let mut input_config = self.input_config.write();
        Ok(std::mem::replace(
            control.config_mut(&mut input_config),
            config,
        ))
    }

    /// Rotation nibble of a knob as last reported.
    pub fn knob_status(&self, index: usize) -> Result<u8, ConfigError> {
        check_index(index, NUM_KNOBS)?;
        Ok(decode_knob_nibble(&self.report_state.buttons.lock(), index))
    }

    /// Overwrite the stored rotation nibble of a knob.
    ///
    /// Only the lower 4 bits are used. The next report is compared
    /// against the new value.
    ///
    /// The HID transport discards a report that equals its predecessor
    /// before it reaches [`Self::handle_report()`]. If the device keeps
    /// sending the same state, the overwrite only takes effect with the
    /// next report that differs.
    pub fn set_knob_status(&self, index: usize, nibble: u8) -> Result<(), ConfigError> {
        check_index(index, NUM_KNOBS)?;
        encode_knob_nibble(&mut self.report_state.buttons.lock(), index, nibble & 0x0f);
        Ok(())
    }

    pub fn button_status(&self, index: usize) -> Result<bool, ConfigError> {
        check_index(index, NUM_BUTTONS)?;
        Ok(decode_button_bit(&self.report_state.buttons.lock(), index))
    }

    /// Overwrite the stored state of a button.
    ///
    /// The next report is compared against the new state. Consecutive
    /// duplicate reports are discarded by the HID transport, see
    /// [`Self::set_knob_status()`].
    pub fn set_button_status(&self, index: usize, pressed: bool) -> Result<(), ConfigError> {
        check_index(index, NUM_BUTTONS)?;
        encode_button_bit(&mut self.report_state.buttons.lock(), index, pressed);
        Ok(())
    }

    pub fn strip_status(&self, index: usize) -> Result<StripState, ConfigError> {
        check_index(index, NUM_STRIPS)?;
        Ok(decode_strip(&self.report_state.strips.lock(), index))
    }

    pub fn strip_display(&self, index: usize) -> Result<StripDisplay, ConfigError> {
        check_index(index, NUM_STRIPS)?;
        Ok(self.strip_displays.lock().get(index))
    }

    pub fn output_binding(&self, node: OutputNode) -> Result<Option<SentinelId>, ConfigError> {
        check_index(node.index, node.group.num_nodes())?;
        Ok(self.routing.read().binding(node.id()))
    }

    /// Route messages with the given coordinates to `node`.
    ///
    /// Returns the previous binding.
    pub fn rebind_output(
        &self,
        node: OutputNode,
        kind: RouteKind,
        channel: u8,
        key: u8,
    ) -> Result<Option<SentinelId>, ConfigError> {
        check_index(node.index, node.group.num_nodes())?;
        let Some(sentinel) = RoutingTable::lookup(kind, channel, key) else {
            return Err(if key > 0x7f {
                ConfigError::InvalidKey(key)
            } else {
                ConfigError::InvalidChannel(channel)
            });
        };
        let previous = self.routing.write().rebind(node.id(), sentinel);
        log::debug!("Rebound {node}: {previous:?} -> {sentinel}");
        Ok(previous)
    }

    /// Stop routing messages to `node`.
    ///
    /// Returns the previous binding.
    pub fn unbind_output(&self, node: OutputNode) -> Result<Option<SentinelId>, ConfigError> {
        check_index(node.index, node.group.num_nodes())?;
        let previous = self.routing.write().unbind(node.id());
        log::debug!("Unbound {node}: {previous:?}");
        Ok(previous)
    }
}

/// Feeds MIDI input from the host into a shared [`DeviceContext`].
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct SharedMidiInput(pub Arc<DeviceContext>);

impl MidiInputHandler for SharedMidiInput {
    fn handle_midi_input(&mut self, input: &[u8]) -> bool {
        let Self(context) = self;
        context.handle_midi_input(input)
    }
}
