//! Control-channel wire protocol.
//!
//! One JSON object per line in each direction. The host sends a
//! [`ControlRequest`] and reads exactly one [`ControlResponse`] before
//! sending the next request; a blocking launch therefore owns the channel
//! until the remote service exits.

use serde::{Deserialize, Serialize};

/// Protocol revision both ends must agree on.
pub const PROTOCOL_VERSION: u32 = 1;

/// Operation names a conforming provider serves, in contract order.
pub const CONTRACT_OPERATIONS: &[&str] = &["launch", "stop", "is_running", "port", "base_url"];

/// Request frames sent from the host to a provider process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Asks the provider to identify itself and list the operations it
    /// serves. Sent once, immediately after spawning.
    Describe,
    /// Starts the service.
    Launch {
        /// Foreground launch: the reply is deferred until the service exits.
        block: bool,
    },
    /// Stops the service.
    Stop,
    /// Queries the running state.
    IsRunning,
    /// Queries the listening port.
    Port,
    /// Queries the base URL.
    BaseUrl,
}

impl ControlRequest {
    /// Contract operation name carried by this frame.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Describe => "describe",
            Self::Launch { .. } => "launch",
            Self::Stop => "stop",
            Self::IsRunning => "is_running",
            Self::Port => "port",
            Self::BaseUrl => "base_url",
        }
    }
}

/// Reply frames sent from a provider process back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum ControlResponse {
    /// Identity and operation surface of the provider.
    Contract {
        /// Protocol revision the provider speaks.
        version: u32,
        /// Backend name, for logs and error messages.
        provider: String,
        /// Operation names the provider serves.
        operations: Vec<String>,
    },
    /// The launch was accepted (non-blocking) or ran to completion
    /// (blocking).
    Launched,
    /// The service stopped.
    Stopped,
    /// Answer to [`ControlRequest::IsRunning`].
    Running {
        /// Whether the service is accepting work.
        value: bool,
    },
    /// Answer to [`ControlRequest::Port`].
    Port {
        /// Listening port, absent while not running.
        value: Option<u16>,
    },
    /// Answer to [`ControlRequest::BaseUrl`].
    BaseUrl {
        /// Base URL, absent while not running.
        value: Option<String>,
    },
    /// The requested operation failed inside the provider.
    Failure {
        /// Operation that failed.
        operation: String,
        /// Failure detail, propagated unchanged.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frames_round_trip_as_single_json_objects() {
        let frames = [
            ControlRequest::Describe,
            ControlRequest::Launch { block: true },
            ControlRequest::Stop,
            ControlRequest::IsRunning,
        ];
        for frame in frames {
            let encoded = serde_json::to_string(&frame).expect("encode");
            assert!(!encoded.contains('\n'), "frame must stay on one line");
            let decoded: ControlRequest = serde_json::from_str(&encoded).expect("decode");
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn launch_frame_uses_snake_case_tag() {
        let encoded =
            serde_json::to_string(&ControlRequest::Launch { block: false }).expect("encode");
        assert_eq!(encoded, r#"{"op":"launch","block":false}"#);
    }

    #[test]
    fn failure_reply_carries_message_verbatim() {
        let reply = ControlResponse::Failure {
            operation: "stop".to_owned(),
            message: "listener already gone".to_owned(),
        };
        let encoded = serde_json::to_string(&reply).expect("encode");
        let decoded: ControlResponse = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, reply);
    }

    #[test]
    fn operation_names_cover_the_contract() {
        assert_eq!(
            CONTRACT_OPERATIONS,
            ["launch", "stop", "is_running", "port", "base_url"]
        );
        assert_eq!(ControlRequest::Launch { block: true }.operation(), "launch");
        assert_eq!(ControlRequest::BaseUrl.operation(), "base_url");
    }
}
