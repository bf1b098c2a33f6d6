//! MQTT change feed for region snapshots
//!
//! Every message on the topic carries the full region list in the import
//! format. Snapshots that fail validation are dropped; the editor only ever
//! sees complete, valid batches.

use crate::config::FeedSettings;
use crate::error::{Result, ZoneError};
use crate::regions::{export_regions, import_regions, Region};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Subscription to remote region changes, received on a background thread
pub struct RegionFeed {
    client: Client,
    topic: String,
    receiver: Receiver<Vec<Region>>,
    _thread: thread::JoinHandle<()>,
}

impl RegionFeed {
    /// Connect to the broker and subscribe to the snapshot topic.
    /// Fails immediately if the broker cannot be reached.
    pub fn subscribe(settings: &FeedSettings) -> Result<Self> {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(30));
        // Snapshots of large coverage maps exceed the default packet limit
        options.set_max_packet_size(4 * 1024 * 1024, 4 * 1024 * 1024);

        let (client, mut connection) = Client::new(options, 10);

        client
            .subscribe(&settings.topic, QoS::AtLeastOnce)
            .map_err(|e| ZoneError::Feed(format!("subscribe to '{}' failed: {}", settings.topic, e)))?;

        match connection.iter().next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                return Err(ZoneError::Feed(format!(
                    "cannot reach broker at {}:{} - {}",
                    settings.host, settings.port, e
                )));
            }
            None => {
                return Err(ZoneError::Feed(format!(
                    "cannot reach broker at {}:{} - connection closed",
                    settings.host, settings.port
                )));
            }
        }

        let (sender, receiver) = mpsc::channel();
        let topic = settings.topic.clone();
        let handle = thread::spawn(move || {
            Self::message_loop(connection, sender, &topic);
        });

        info!(host = %settings.host, port = settings.port, topic = %settings.topic, "region feed connected");

        Ok(Self {
            client,
            topic: settings.topic.clone(),
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: Connection, sender: Sender<Vec<Region>>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    if let Some(regions) = decode_snapshot(&publish.payload) {
                        if sender.send(regions).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // rumqttc reconnects on the next iteration
                    error!("region feed error: {}", e);
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }

    /// Latest snapshot received since the previous poll (non-blocking)
    pub fn poll(&self) -> Option<Vec<Region>> {
        let mut latest = None;
        while let Ok(regions) = self.receiver.try_recv() {
            latest = Some(regions);
        }
        latest
    }

    /// Publish the local region list as a retained snapshot
    pub fn publish(&self, regions: &[Region]) -> Result<()> {
        let payload = export_regions(regions)?;
        self.client
            .publish(&self.topic, QoS::AtLeastOnce, true, payload.into_bytes())
            .map_err(|e| ZoneError::Feed(format!("publish to '{}' failed: {}", self.topic, e)))?;
        info!(topic = %self.topic, count = regions.len(), "region snapshot published");
        Ok(())
    }

    /// Stop receiving changes and close the connection
    pub fn unsubscribe(self) -> Result<()> {
        self.client
            .unsubscribe(&self.topic)
            .map_err(|e| ZoneError::Feed(e.to_string()))?;
        self.client
            .disconnect()
            .map_err(|e| ZoneError::Feed(e.to_string()))
    }
}

/// Validate a raw snapshot payload; invalid snapshots yield `None`
pub fn decode_snapshot(payload: &[u8]) -> Option<Vec<Region>> {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text.trim(),
        Err(e) => {
            warn!("region snapshot is not UTF-8: {}", e);
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }
    match import_regions(text) {
        Ok(regions) => Some(regions),
        Err(e) => {
            warn!("rejected region snapshot: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_snapshot() {
        let payload = br#"[{"id": "z1", "name": "Centro", "fee": 1500,
            "polygon": [[0, 0], [0, 1], [1, 1]], "etaLabel": "20-30 min"}]"#;
        let regions = decode_snapshot(payload).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].eta_label, "20-30 min");
    }

    #[test]
    fn test_decode_rejects_invalid_snapshots() {
        assert!(decode_snapshot(b"").is_none());
        assert!(decode_snapshot(b"   ").is_none());
        assert!(decode_snapshot(&[0xff, 0xfe]).is_none());
        assert!(decode_snapshot(b"not json").is_none());
        assert!(decode_snapshot(br#"[{"id": "z1", "name": "x", "fee": 1, "polygon": [[0, 0], [1, 1]]}]"#).is_none());
    }

    #[test]
    fn test_unreachable_broker_fails_fast() {
        let settings = FeedSettings {
            enabled: true,
            host: "127.0.0.1".into(),
            port: 1,
            ..FeedSettings::default()
        };
        assert!(matches!(RegionFeed::subscribe(&settings), Err(ZoneError::Feed(_))));
    }
}
