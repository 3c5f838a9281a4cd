//! JSON bodies exchanged with the registry API

use serde::{Deserialize, Serialize};

use callsync_call_core::{CallId, CallSnapshot, CallType, ParticipantStatus, UserId};

pub const START_PATH: &str = "api/calls/start";
pub const JOIN_PATH: &str = "api/calls/join";
pub const LEAVE_PATH: &str = "api/calls/leave";
pub const UPDATE_STATUS_PATH: &str = "api/calls/update-status";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest<'a> {
    pub receiver_ids: &'a [UserId],
    #[serde(rename = "type")]
    pub call_type: CallType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIdRequest<'a> {
    pub call_id: &'a CallId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest<'a> {
    pub call_id: &'a CallId,
    pub status: ParticipantStatus,
}

/// Envelope of every successful registry response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub call: Option<CallSnapshot>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub call_ended: Option<bool>,
}

/// Body of a non-2xx response
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_request_shape() {
        let receivers = vec![UserId::from("u2")];
        let body = serde_json::to_value(StartCallRequest {
            receiver_ids: &receivers,
            call_type: CallType::Video,
        })
        .unwrap();
        assert_eq!(body, json!({ "receiverIds": ["u2"], "type": "VIDEO" }));
    }

    #[test]
    fn test_update_status_shape() {
        let call_id = CallId::from("c1");
        let body = serde_json::to_value(UpdateStatusRequest {
            call_id: &call_id,
            status: ParticipantStatus::Connected,
        })
        .unwrap();
        assert_eq!(body, json!({ "callId": "c1", "status": "CONNECTED" }));
    }

    #[test]
    fn test_leave_response_without_call() {
        let response: CallResponse =
            serde_json::from_value(json!({ "success": true, "call": null, "callEnded": true })).unwrap();
        assert!(response.success);
        assert!(response.call.is_none());
        assert_eq!(response.call_ended, Some(true));
    }
}
