// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use std::{io::stdin, sync::Arc};

use jamio::{
    devices::maschine_jam::{self, hid::AttachedDevice, Settings, SharedMidiInput},
    midi::midir as midi_ports,
    HidApi,
};

const CLIENT_NAME: &str = "jamio";

fn main() {
    pretty_env_logger::init();

    match run() {
        Ok(()) => (),
        Err(err) => log::error!("{err}"),
    }
}

fn run() -> anyhow::Result<()> {
    log::info!("Initializing HID API");
    let mut api = HidApi::new()?;

    log::info!(
        "Searching {vendor} {product}",
        vendor = maschine_jam::VENDOR_NAME,
        product = maschine_jam::PRODUCT_NAME
    );
    let mut device = api.find_device(maschine_jam::VENDOR_ID, maschine_jam::PRODUCT_ID)?;
    device.connect(&api)?;
    log::info!(
        "Connected HID device: path = {path}, sn = '{sn}'",
        path = device.info().path().to_str().unwrap_or_default(),
        sn = device.info().serial_number().unwrap_or_default(),
    );

    let attached = AttachedDevice::attach(device, &Settings::default())?;
    let context = Arc::clone(attached.context());

    #[cfg(unix)]
    let (output, input) = (
        midi_ports::create_virtual_output_port(CLIENT_NAME, maschine_jam::PRODUCT_NAME)?,
        midi_ports::create_virtual_input_port(
            CLIENT_NAME,
            maschine_jam::PRODUCT_NAME,
            SharedMidiInput(Arc::clone(&context)),
        )?,
    );
    #[cfg(not(unix))]
    let (output, input) = {
        // Virtual ports are not available. Connect to existing loopback ports.
        let port_name_prefix = std::env::args().nth(1).unwrap_or_else(|| "loopMIDI".to_owned());
        (
            midi_ports::connect_output_port(CLIENT_NAME, &port_name_prefix)?,
            midi_ports::connect_input_port(
                CLIENT_NAME,
                &port_name_prefix,
                SharedMidiInput(Arc::clone(&context)),
            )?,
        )
    };
    context.attach_midi_output(Box::new(output));

    println!("Translating, press ENTER to exit...");
    stdin().read_line(&mut String::new())?;

    log::info!("Closing MIDI ports");
    input.close();
    context.detach_midi_output();

    log::info!("Detaching device");
    let mut device = attached.detach()?;
    device.disconnect();

    Ok(())
}
