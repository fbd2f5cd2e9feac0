//! MQTT bus client
//!
//! Owns the broker connection as an explicitly constructed object with a
//! defined lifecycle: connect on startup, subscribe to the vehicle
//! wildcard topics, forward decoded inbound messages to the reconciler
//! over a channel, and drain an outbound channel of route publishes.
//!
//! Every inbound publish is decoded exactly once at this boundary into
//! the tagged `InboundMessage` union; nothing downstream ever matches on
//! topic strings.
//!
//! Transport failures are surfaced once per drop as a `BusDisconnected`
//! event. Reconnection itself is the transport library's concern: the
//! event loop keeps polling and re-establishes the session; on the
//! reconnect acknowledgment the wildcard subscriptions are re-issued and
//! `BusConnected` fires again.

use dispatch_common::config::BrokerConfig;
use dispatch_common::events::{DispatchEvent, EventBus};
use dispatch_common::model::{RoutePayload, StopStatus, TelemetryPayload, Waypoint};
use dispatch_common::{Error, Result};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Wildcard subscription for route messages, one level per vehicle id
pub const ROUTE_FILTER: &str = "vehicle/+/route";
/// Wildcard subscription for telemetry messages
pub const TELEMETRY_FILTER: &str = "vehicle/+/telemetry";

/// Publish topic for a vehicle's route
pub fn route_topic(vehicle_id: &str) -> String {
    format!("vehicle/{}/route", vehicle_id)
}

/// An inbound bus message, decoded once at the boundary
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// `vehicle/{id}/route`
    Route {
        vehicle_id: String,
        payload: RoutePayload,
    },
    /// `vehicle/{id}/telemetry`
    Telemetry {
        vehicle_id: String,
        payload: TelemetryPayload,
    },
    /// A topic outside the two subscribed shapes
    Unrecognized { topic: String },
}

/// An outbound route publish (new booking, manual advance, or auto-clear)
#[derive(Debug, Clone)]
pub struct OutboundRoute {
    pub vehicle_id: String,
    pub route: Vec<Waypoint>,
    pub status_arr: Vec<StopStatus>,
}

/// Message kind derived from the topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TopicKind {
    Route,
    Telemetry,
}

/// Parse a `vehicle/{id}/route` or `vehicle/{id}/telemetry` topic.
/// The id occupies exactly one topic level, matching the `+` wildcard.
fn parse_topic(topic: &str) -> Option<(&str, TopicKind)> {
    let rest = topic.strip_prefix("vehicle/")?;
    let (vehicle_id, kind) = rest.rsplit_once('/')?;
    if vehicle_id.is_empty() || vehicle_id.contains('/') {
        return None;
    }
    match kind {
        "route" => Some((vehicle_id, TopicKind::Route)),
        "telemetry" => Some((vehicle_id, TopicKind::Telemetry)),
        _ => None,
    }
}

/// Decode one inbound publish into the tagged message union.
///
/// A malformed payload (bad JSON, missing `position`, `route` not a
/// sequence, out-of-domain status code) is an error; the caller logs it
/// and discards the message without touching fleet state.
pub fn decode(topic: &str, payload: &[u8]) -> Result<InboundMessage> {
    let Some((vehicle_id, kind)) = parse_topic(topic) else {
        return Ok(InboundMessage::Unrecognized {
            topic: topic.to_string(),
        });
    };

    match kind {
        TopicKind::Route => {
            let payload: RoutePayload = serde_json::from_slice(payload)?;
            Ok(InboundMessage::Route {
                vehicle_id: vehicle_id.to_string(),
                payload,
            })
        }
        TopicKind::Telemetry => {
            let payload: TelemetryPayload = serde_json::from_slice(payload)?;
            Ok(InboundMessage::Telemetry {
                vehicle_id: vehicle_id.to_string(),
                payload,
            })
        }
    }
}

/// Owned bus client: an `AsyncClient` handle plus its event loop
pub struct BusClient {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl BusClient {
    /// Build the client from broker settings. The connection itself is
    /// established lazily by the event loop inside `run`.
    pub fn connect(config: &BrokerConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, 64);
        Self { client, eventloop }
    }

    /// Drive the connection until the inbound receiver goes away.
    ///
    /// - Inbound publishes are decoded and forwarded to `inbound`.
    /// - `outbound` route publishes are serialized and sent fire-and-forget
    ///   at QoS 0 (at-most-once); a rejected publish surfaces once as a
    ///   `PublishFailed` event and changes no local state.
    pub async fn run(
        mut self,
        inbound: mpsc::Sender<InboundMessage>,
        mut outbound: mpsc::Receiver<OutboundRoute>,
        events: Arc<EventBus>,
    ) {
        let mut connected = false;

        loop {
            tokio::select! {
                polled = self.eventloop.poll() => match polled {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to broker");
                        if let Err(e) = Self::subscribe_all(&self.client).await {
                            error!("Subscription failed: {}", e);
                        }
                        if !connected {
                            connected = true;
                            events.emit(DispatchEvent::BusConnected {
                                timestamp: chrono::Utc::now(),
                            });
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        match decode(&publish.topic, &publish.payload) {
                            Ok(InboundMessage::Unrecognized { topic }) => {
                                debug!("Ignoring message on unrecognized topic {}", topic);
                            }
                            Ok(message) => {
                                if inbound.send(message).await.is_err() {
                                    debug!("Reconciler gone, stopping bus client");
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!("Discarding malformed payload on {}: {}", publish.topic, e);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if connected {
                            connected = false;
                            warn!("Bus connection lost: {}", e);
                            events.emit(DispatchEvent::BusDisconnected {
                                reason: e.to_string(),
                                timestamp: chrono::Utc::now(),
                            });
                        } else {
                            debug!("Bus connection attempt failed: {}", e);
                        }
                        // Pause before the event loop retries the transport
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
                publish = outbound.recv() => match publish {
                    Some(out) => Self::publish_route(&self.client, out, &events).await,
                    None => {
                        debug!("Outbound channel closed, stopping bus client");
                        return;
                    }
                },
            }
        }
    }

    async fn subscribe_all(client: &AsyncClient) -> Result<()> {
        for filter in [ROUTE_FILTER, TELEMETRY_FILTER] {
            client
                .subscribe(filter, QoS::AtMostOnce)
                .await
                .map_err(|e| Error::Bus(e.to_string()))?;
            info!("Subscribed to {}", filter);
        }
        Ok(())
    }

    async fn publish_route(client: &AsyncClient, out: OutboundRoute, events: &EventBus) {
        let topic = route_topic(&out.vehicle_id);
        let payload = RoutePayload {
            route: out.route,
            status_arr: Some(out.status_arr),
            position: None,
        };

        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize route payload for {}: {}", topic, e);
                return;
            }
        };

        debug!("Publishing route to {}", topic);
        if let Err(e) = client
            .publish(topic.as_str(), QoS::AtMostOnce, false, body)
            .await
        {
            warn!("Publish to {} failed: {}", topic, e);
            events.emit(DispatchEvent::PublishFailed {
                topic,
                reason: e.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_parsing_accepts_both_message_kinds() {
        assert_eq!(
            parse_topic("vehicle/v1/route"),
            Some(("v1", TopicKind::Route))
        );
        assert_eq!(
            parse_topic("vehicle/taxi-42/telemetry"),
            Some(("taxi-42", TopicKind::Telemetry))
        );
    }

    #[test]
    fn topic_parsing_rejects_foreign_shapes() {
        assert_eq!(parse_topic("vehicle/v1/position"), None);
        assert_eq!(parse_topic("fleet/v1/route"), None);
        assert_eq!(parse_topic("vehicle//route"), None);
        // id must be a single topic level
        assert_eq!(parse_topic("vehicle/a/b/route"), None);
    }

    #[test]
    fn decode_produces_tagged_route_message() {
        let payload = br#"{"route":[{"id":"w1","title":"Pickup","lat":21.0,"lng":105.8}],"statusArr":[0]}"#;
        let message = decode("vehicle/v1/route", payload).unwrap();
        match message {
            InboundMessage::Route {
                vehicle_id,
                payload,
            } => {
                assert_eq!(vehicle_id, "v1");
                assert_eq!(payload.route.len(), 1);
                assert_eq!(payload.status_arr, Some(vec![StopStatus::Pending]));
            }
            other => panic!("expected route message, got {:?}", other),
        }
    }

    #[test]
    fn decode_produces_tagged_telemetry_message() {
        let payload = br#"{"position":{"lat":1.5,"lng":2.5},"statusArr":[1,0]}"#;
        let message = decode("vehicle/v1/telemetry", payload).unwrap();
        match message {
            InboundMessage::Telemetry {
                vehicle_id,
                payload,
            } => {
                assert_eq!(vehicle_id, "v1");
                assert_eq!(payload.position.lat, 1.5);
                assert_eq!(
                    payload.status_arr,
                    vec![StopStatus::EnRoute, StopStatus::Pending]
                );
            }
            other => panic!("expected telemetry message, got {:?}", other),
        }
    }

    #[test]
    fn decode_flags_unknown_topics_without_error() {
        let message = decode("vehicle/v1/battery", b"{}").unwrap();
        assert!(matches!(message, InboundMessage::Unrecognized { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode("vehicle/v1/route", b"not json").is_err());
    }

    #[test]
    fn route_field_must_be_a_sequence() {
        assert!(decode("vehicle/v1/route", br#"{"route":"A-B"}"#).is_err());
        assert!(decode("vehicle/v1/route", br#"{"statusArr":[0]}"#).is_err());
    }

    #[test]
    fn telemetry_requires_position() {
        assert!(decode("vehicle/v1/telemetry", br#"{"statusArr":[0]}"#).is_err());
    }

    #[test]
    fn out_of_domain_status_code_is_malformed() {
        let payload = br#"{"position":{"lat":0.0,"lng":0.0},"statusArr":[0,7]}"#;
        assert!(decode("vehicle/v1/telemetry", payload).is_err());
    }

    #[test]
    fn route_topic_round_trips_through_the_parser() {
        let topic = route_topic("v9");
        assert_eq!(parse_topic(&topic), Some(("v9", TopicKind::Route)));
    }
}
