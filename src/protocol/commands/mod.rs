// SPDX-License-Identifier: MIT

pub mod actuation;
pub mod query;
pub mod schedule_cmds;
pub mod toggles;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::door::Simulator;

/// A command handler's return type: the reply object to send back to the
/// originating peer. Handlers are free to also broadcast before resolving.
pub type HandlerFut = Pin<Box<dyn Future<Output = Map<String, Value>> + Send>>;

/// A registered command handler, one entry in the eagerly-built startup
/// table from tag to handler.
pub type Handler = fn(Arc<Simulator>, Value, Option<Value>) -> HandlerFut;
