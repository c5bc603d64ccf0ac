// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Presentation layer: the HTTP adapter in front of the core engine.
//! Everything here validates input, calls the core through
//! [`price_history_domain`]'s capability traits, and translates the result
//! back into an HTTP response. It owns no linearization-bearing state
//! itself.

pub mod http;
