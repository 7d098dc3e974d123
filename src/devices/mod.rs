// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

pub mod maschine_jam;
