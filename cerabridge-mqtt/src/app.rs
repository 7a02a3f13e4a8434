// Cerabridge MQTT - Bridge daemon for the shift accumulator engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! MQTT transport around the engine router.
//!
//! Owns the broker session: persistent (clean-session false), QoS 1 on
//! every subscription and publication, automatic resubscription on
//! reconnect. Inbound messages are handed to the router inline, so
//! per-topic arrival order is preserved; outbound publications are
//! fire-and-forget.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use rumqttc::{
    AsyncClient, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS, SubscribeFilter,
};
use tokio::time::sleep;
use tracing::{error, info, warn};

use cerabridge::{Router, SUBSCRIBED_TOPICS};

// Backoff between reconnect attempts after the session is up
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker endpoint from a `tcp://host:port` style URI.
///
/// Accepts `tcp://`, `mqtt://` or a bare `host[:port]`; the port
/// defaults to 1883.
pub fn parse_broker(uri: &str) -> Result<(String, u16)> {
    let rest = uri
        .strip_prefix("tcp://")
        .or_else(|| uri.strip_prefix("mqtt://"))
        .unwrap_or(uri);
    match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid broker port in '{uri}'"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((rest.to_string(), 1883)),
    }
}

/// The broker session plus the engine router.
pub struct Bridge {
    client: AsyncClient,
    eventloop: EventLoop,
    router: Router,
}

impl Bridge {
    pub fn new(broker_uri: &str, client_id: &str, router: Router) -> Result<Self> {
        let (host, port) = parse_broker(broker_uri)?;

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_clean_session(false);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(options, 64);
        Ok(Self {
            client,
            eventloop,
            router,
        })
    }

    /// Poll until the broker accepts the session. A failure before the
    /// first ConnAck is fatal.
    pub async fn connect(&mut self) -> Result<()> {
        loop {
            let event = self.eventloop.poll().await;
            match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("connected to broker");
                    subscribe_all(&self.client).await?;
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(anyhow::Error::new(e).context("initial broker connection failed"))
                }
            }
        }
    }

    /// Consume the broker session until `shutdown` resolves, then
    /// unsubscribe, disconnect and drain.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let Self {
            client,
            eventloop,
            router,
        } = &mut *self;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("session re-established, restoring subscriptions");
                        subscribe_all(client).await?;
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        let payload = String::from_utf8_lossy(&publish.payload);
                        dispatch(client, router, &publish.topic, &payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Broker connection error: {}, retrying", e);
                        sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }

        self.teardown().await;
        Ok(())
    }

    async fn teardown(&mut self) {
        for topic in SUBSCRIBED_TOPICS {
            if let Err(e) = self.client.unsubscribe(topic).await {
                warn!("Unsubscribe from {} failed: {}", topic, e);
            }
        }
        if let Err(e) = self.client.disconnect().await {
            warn!("Disconnect request failed: {}", e);
            return;
        }
        // drain until the disconnect goes out or the broker hangs up
        loop {
            let event = self.eventloop.poll().await;
            match event {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        info!("disconnected");
    }
}

async fn subscribe_all(client: &AsyncClient) -> Result<()> {
    let filters: Vec<SubscribeFilter> = SUBSCRIBED_TOPICS
        .iter()
        .map(|t| SubscribeFilter::new((*t).to_string(), QoS::AtLeastOnce))
        .collect();
    client
        .subscribe_many(filters)
        .await
        .context("subscribe failed")?;
    info!("Subscribed to topics (QoS 1): {:?}", SUBSCRIBED_TOPICS);
    Ok(())
}

/// Hand one inbound message to the engine and publish the results.
/// Publish failures are logged, never retried: the next PLC sample
/// closes the gap through its delta.
async fn dispatch(client: &AsyncClient, router: &Router, topic: &str, payload: &str) {
    for publication in router.handle(topic, payload) {
        if let Err(e) = client
            .publish(
                publication.topic.as_str(),
                QoS::AtLeastOnce,
                false,
                publication.payload,
            )
            .await
        {
            warn!("Publish to {} failed: {}", publication.topic, e);
        }
    }
}
