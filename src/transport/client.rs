//! HTTP client for the game server.
//!
//! Two endpoints: `POST /start_game` and `POST /submit_move`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{GameServer, StartError, SubmitResult};
use crate::state::GameState;

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    agent_id: &'a str,
    level_id: &'a str,
    ai_model: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    state: GameState,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub command: &'a str,
    pub reasoning: &'a str,
    pub meta: SubmitMeta,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitMeta {
    pub token_usage: TokenTotal,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenTotal {
    pub total: u64,
}

/// Classify a 200 reply body.
///
/// `success` is read first so that an accepted move is never mistaken for a
/// lost one, even when its state does not decode.
pub(crate) fn classify_reply(body: &Value) -> SubmitResult {
    let Some(success) = body.get("success").and_then(Value::as_bool) else {
        return SubmitResult::TransportError {
            detail: "reply has no success flag".into(),
        };
    };

    let state = decode_state(body);
    if !success {
        let message = body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("(no message)")
            .to_string();
        return SubmitResult::Rejected { message, state };
    }

    let terminated = body
        .pointer("/gym_metrics/terminated")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    SubmitResult::Accepted { state, terminated }
}

fn decode_state(body: &Value) -> Option<GameState> {
    let raw = body.get("state").filter(|v| !v.is_null())?;
    match GameState::deserialize(raw) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, "reply state does not decode");
            None
        }
    }
}

/// reqwest-backed game server client.
#[derive(Debug, Clone)]
pub struct GameClient {
    http: Client,
    base_url: String,
    agent_id: String,
    ai_model: String,
}

impl GameClient {
    pub fn new(base_url: &str, agent_id: String, ai_model: String) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            agent_id,
            ai_model,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl GameServer for GameClient {
    async fn start(&self, level_id: &str) -> Result<GameState, StartError> {
        let request = StartRequest {
            agent_id: &self.agent_id,
            level_id,
            ai_model: &self.ai_model,
        };

        let response = self
            .http
            .post(self.url("start_game"))
            .json(&request)
            .send()
            .await
            .map_err(StartError::Unreachable)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(StartError::Refused {
                status: status.as_u16(),
                body,
            });
        }

        let body: StartResponse = response
            .json()
            .await
            .map_err(|e| StartError::InvalidResponse(e.to_string()))?;
        Ok(body.state)
    }

    async fn submit(&self, command: &str, reasoning: &str, token_total: u64) -> SubmitResult {
        let request = SubmitRequest {
            command,
            reasoning,
            meta: SubmitMeta {
                token_usage: TokenTotal { total: token_total },
            },
        };
        debug!(command, token_total, "submitting move");

        let response = match self
            .http
            .post(self.url("submit_move"))
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return SubmitResult::TransportError {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return SubmitResult::TransportError {
                detail: format!("HTTP {}", status.as_u16()),
            };
        }

        match response.json::<Value>().await {
            Ok(body) => classify_reply(&body),
            Err(e) => SubmitResult::TransportError {
                detail: format!("undecodable reply: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_shape() {
        let req = SubmitRequest {
            command: "G4@P12(b=2)-90",
            reasoning: "connects to the hub",
            meta: SubmitMeta {
                token_usage: TokenTotal { total: 114481 },
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["command"], "G4@P12(b=2)-90");
        assert_eq!(json["reasoning"], "connects to the hub");
        assert_eq!(json["meta"]["token_usage"]["total"], 114481);
    }

    #[test]
    fn start_request_shape() {
        let req = StartRequest {
            agent_id: "Gear-Agent",
            level_id: "3",
            ai_model: "claude-sonnet-4-5-20250514",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["agent_id"], "Gear-Agent");
        assert_eq!(json["level_id"], "3");
        assert_eq!(json["ai_model"], "claude-sonnet-4-5-20250514");
    }

    fn classify(json: &str) -> SubmitResult {
        classify_reply(&serde_json::from_str(json).unwrap())
    }

    #[test]
    fn accepted_reply() {
        match classify(
            r#"{"success": true, "state": {"meta": {"turn": 2}}, "gym_metrics": {"terminated": false}}"#,
        ) {
            SubmitResult::Accepted { state, terminated } => {
                assert_eq!(state.unwrap().meta.turn, 2);
                assert!(!terminated);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn terminated_reply() {
        assert!(matches!(
            classify(
                r#"{"success": true, "state": {"status": {"game_over": true}}, "gym_metrics": {"terminated": true}}"#,
            ),
            SubmitResult::Accepted {
                terminated: true,
                ..
            }
        ));
    }

    #[test]
    fn accepted_reply_with_null_fields_keeps_state() {
        let result = classify(
            r#"{"success": true,
                "state": {"meta": {"turn": 6, "max_moves": 22},
                          "status": {"game_over": false, "result": null, "mice_rescued": null},
                          "scoring": {"raw_points": null, "benchmark_score": null}},
                "gym_metrics": null}"#,
        );
        match result {
            SubmitResult::Accepted { state, terminated } => {
                let state = state.expect("null fields should decode");
                assert_eq!(state.meta.turn, 6);
                assert_eq!(state.status.result, "");
                assert!(!terminated);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn accepted_reply_with_undecodable_state_is_still_accepted() {
        let result = classify(r#"{"success": true, "state": {"meta": {"turn": "six"}}}"#);
        assert_eq!(
            result,
            SubmitResult::Accepted {
                state: None,
                terminated: false,
            }
        );
    }

    #[test]
    fn accepted_without_state_is_still_accepted() {
        assert!(matches!(
            classify(r#"{"success": true}"#),
            SubmitResult::Accepted { state: None, .. }
        ));
    }

    #[test]
    fn rejected_reply_surfaces_message() {
        match classify(r#"{"success": false, "msg": "illegal placement"}"#) {
            SubmitResult::Rejected { message, state } => {
                assert_eq!(message, "illegal placement");
                assert!(state.is_none());
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn rejected_reply_may_carry_state() {
        match classify(
            r#"{"success": false, "msg": "out of moves", "state": {"status": {"game_over": true}}}"#,
        ) {
            SubmitResult::Rejected { state, .. } => assert!(state.unwrap().is_over()),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn reply_without_success_flag_is_transport_error() {
        for json in [r#"{}"#, r#"{"success": "yes"}"#, r#"[1, 2]"#] {
            assert!(
                matches!(classify(json), SubmitResult::TransportError { .. }),
                "{json}"
            );
        }
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = GameClient::new("http://localhost:9009/", "a".into(), "m".into());
        assert_eq!(client.url("start_game"), "http://localhost:9009/start_game");
    }

    #[tokio::test]
    async fn unreachable_server_fails_start_and_submit() {
        let client = GameClient::new("http://127.0.0.1:9", "a".into(), "m".into());
        let err = client.start("1").await.unwrap_err();
        assert!(matches!(err, StartError::Unreachable(_)));
        assert!(matches!(
            client.submit("G@P11+90", "r", 0).await,
            SubmitResult::TransportError { .. }
        ));
    }
}
