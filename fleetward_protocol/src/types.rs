// Core protocol types shared by `message.rs` and the host SDK.
//
// `RequestId` is a channel-scoped correlation ID, not a fleet-wide
// identifier — the host assigns compact increasing integers to in-flight
// requests so replies can be matched to the call that produced them.

use serde::{Deserialize, Serialize};

/// Protocol revision carried in `RegisterProcess`. The agent refuses
/// registration from hosts speaking an unknown revision.
pub const PROTOCOL_VERSION: u32 = 1;

/// Host-assigned request correlation ID (compact u64, monotonic per channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);
