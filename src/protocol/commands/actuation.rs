// SPDX-License-Identifier: MIT

//! OPEN / OPEN_AND_HOLD / CLOSE command handlers and their preconditions.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::HandlerFut;
use crate::door::{motion, Simulator};
use crate::error::FailureReason;
use crate::protocol::message::{failure, success};

async fn check_preconditions(sim: &Arc<Simulator>) -> Option<FailureReason> {
    let state = sim.state.inner.lock().await;
    if !state.power {
        return Some(FailureReason::PowerOff);
    }
    if state.cmd_lockout {
        return Some(FailureReason::CommandLockout);
    }
    None
}

pub fn open(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        if let Some(reason) = check_preconditions(&sim).await {
            return failure("OPEN", msg_id.as_ref(), reason.message());
        }
        motion::request_open(&sim, false).await;
        success("OPEN", msg_id.as_ref(), Map::new())
    })
}

pub fn open_and_hold(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        if let Some(reason) = check_preconditions(&sim).await {
            return failure("OPEN_AND_HOLD", msg_id.as_ref(), reason.message());
        }
        motion::request_open(&sim, true).await;
        success("OPEN_AND_HOLD", msg_id.as_ref(), Map::new())
    })
}

pub fn close(sim: Arc<Simulator>, _msg: Value, msg_id: Option<Value>) -> HandlerFut {
    Box::pin(async move {
        if let Some(reason) = check_preconditions(&sim).await {
            return failure("CLOSE", msg_id.as_ref(), reason.message());
        }
        motion::request_close(&sim).await;
        success("CLOSE", msg_id.as_ref(), Map::new())
    })
}
