// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

pub mod devices;

#[cfg(feature = "hid")]
pub mod hid;
#[cfg(feature = "hid")]
pub use self::hid::{HidApi, HidDevice, HidDeviceError, HidError, HidResult, HidThread};

pub mod input;
pub use self::input::{ConfigError, ControlConfig, ControlKind};

pub mod midi;
pub use self::midi::{
    BoxedMidiOutputConnection, ChannelMessage, MidiInputHandler, MidiMessage, MidiOutputConnection,
};

pub mod output;
pub use self::output::{
    Error as OutputError, ReportOutputConnection, Result as OutputResult, RouteKind, SentinelId,
};
