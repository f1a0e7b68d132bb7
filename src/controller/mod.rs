// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Screen state holders. Each controller owns a set of observable values and
//! a scope for the actions it launches; closing a controller cancels them.

pub(crate) mod coffee;
pub(crate) mod login;
mod scope;

#[cfg(test)]
pub(crate) use fixture::{fixture, fixture_with};
