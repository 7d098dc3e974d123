// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Host MIDI ports driven by [`midir`]

use midir::{
    ConnectError, Ignore, InitError, MidiInput, MidiInputConnection, MidiOutput,
    MidiOutputConnection, SendError,
};
use thiserror::Error;

use crate::{MidiInputHandler, OutputError};

#[derive(Debug, Error)]
pub enum MidiPortError {
    #[error("no port with name prefix \"{prefix}\"")]
    NotFound { prefix: String },
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    ConnectInput(#[from] ConnectError<MidiInput>),
    #[error(transparent)]
    ConnectOutput(#[from] ConnectError<MidiOutput>),
}

impl From<SendError> for OutputError {
    fn from(err: SendError) -> Self {
        OutputError::Send {
            msg: err.to_string().into(),
        }
    }
}

impl super::MidiOutputConnection for MidiOutputConnection {
    fn send_midi_output(&mut self, output: &[u8]) -> crate::OutputResult<()> {
        self.send(output).map_err(Into::into)
    }
}

// Adapter for the midir callback closure
fn handle_input<I>(micros: u64, input: &[u8], input_handler: &mut I)
where
    I: MidiInputHandler,
{
    log::trace!("Received MIDI input @ {micros} us: {input:02x?}");
    if !input_handler.handle_midi_input(input) {
        log::warn!("Failed to decode MIDI input {input:02x?}");
    }
}

fn new_input(client_name: &str) -> Result<MidiInput, MidiPortError> {
    let mut input = MidiInput::new(client_name)?;
    // System exclusive messages are needed for the strip displays.
    input.ignore(Ignore::TimeAndActiveSense);
    Ok(input)
}

/// Connect to the first existing host output port whose name starts
/// with `port_name_prefix`.
pub fn connect_output_port(
    client_name: &str,
    port_name_prefix: &str,
) -> Result<MidiOutputConnection, MidiPortError> {
    let output = MidiOutput::new(client_name)?;
    let Some((port_name, port)) = output.ports().into_iter().find_map(|port| {
        let port_name = output.port_name(&port).ok()?;
        port_name
            .starts_with(port_name_prefix)
            .then_some((port_name, port))
    }) else {
        return Err(MidiPortError::NotFound {
            prefix: port_name_prefix.to_owned(),
        });
    };
    log::debug!("Connecting output port \"{port_name}\"");
    output.connect(&port, client_name).map_err(Into::into)
}

/// Connect the input handler to the first existing host input port
/// whose name starts with `port_name_prefix`.
pub fn connect_input_port<I>(
    client_name: &str,
    port_name_prefix: &str,
    input_handler: I,
) -> Result<MidiInputConnection<I>, MidiPortError>
where
    I: MidiInputHandler + 'static,
{
    let input = new_input(client_name)?;
    let Some((port_name, port)) = input.ports().into_iter().find_map(|port| {
        let port_name = input.port_name(&port).ok()?;
        port_name
            .starts_with(port_name_prefix)
            .then_some((port_name, port))
    }) else {
        return Err(MidiPortError::NotFound {
            prefix: port_name_prefix.to_owned(),
        });
    };
    log::debug!("Connecting input port \"{port_name}\"");
    input
        .connect(
            &port,
            client_name,
            |micros, input, input_handler| {
                handle_input(micros, input, input_handler);
            },
            input_handler,
        )
        .map_err(Into::into)
}

/// Publish a virtual output port that other applications can read from.
#[cfg(unix)]
pub fn create_virtual_output_port(
    client_name: &str,
    port_name: &str,
) -> Result<MidiOutputConnection, MidiPortError> {
    use midir::os::unix::VirtualOutput as _;

    log::debug!("Creating virtual output port \"{port_name}\"");
    MidiOutput::new(client_name)?
        .create_virtual(port_name)
        .map_err(Into::into)
}

/// Publish a virtual input port that other applications can write to.
#[cfg(unix)]
pub fn create_virtual_input_port<I>(
    client_name: &str,
    port_name: &str,
    input_handler: I,
) -> Result<MidiInputConnection<I>, MidiPortError>
where
    I: MidiInputHandler + 'static,
{
    use midir::os::unix::VirtualInput as _;

    log::debug!("Creating virtual input port \"{port_name}\"");
    new_input(client_name)?
        .create_virtual(
            port_name,
            |micros, input, input_handler| {
                handle_input(micros, input, input_handler);
            },
            input_handler,
        )
        .map_err(Into::into)
}
