use http::StatusCode;
use hyper::Response;
use std::net::IpAddr;
use std::time::Duration;
use tracing::info;

use crate::admission::Decision;
use crate::proxy::synthetic_response::{synthetic_response, RespBody};

/// Why an issue submission is not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Interval ceiling reached
    IntervalBust,
    /// Client budget exhausted
    RateLimit,
    /// No remap rule and unmapped submissions are dropped
    UnmappedRoute,
}

impl DropReason {
    pub fn from_decision(decision: Decision) -> Option<Self> {
        match decision {
            Decision::Accept => None,
            Decision::RejectBusted => Some(DropReason::IntervalBust),
            Decision::RejectRateLimited => Some(DropReason::RateLimit),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::IntervalBust => "interval_bust",
            DropReason::RateLimit => "rate_limit",
            DropReason::UnmappedRoute => "unmapped_route",
        }
    }

    /// Whether the response is delayed by the hold time. A busted interval answers right away.
    pub fn holds_connection(&self) -> bool {
        !matches!(self, DropReason::IntervalBust)
    }
}

/// Answer a dropped submission with `200 OK` and an empty body, after `hold` if the reason
/// calls for it.
pub async fn drop_response(reason: DropReason, hold: Duration, client: IpAddr) -> Response<RespBody> {
    info!(%client, reason = reason.as_str(), "dropping issue submission");
    if reason.holds_connection() && !hold.is_zero() {
        tokio::time::sleep(hold).await;
    }
    synthetic_response(StatusCode::OK)
}
