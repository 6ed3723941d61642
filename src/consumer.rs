//! AMQP consumer - feeds the stat fanout queue into the dispatcher
//!
//! ```text
//!  RabbitMQ ──▶ basic_consume ──▶ one task per delivery ──▶ Dispatcher ──▶ store
//!                (prefetch)        (≤ concurrency active)        │
//!                    ▲                                           │
//!                    └────────────── ack / requeue ◀─────────────┘
//! ```
//!
//! Exchange and queue topology is provisioned elsewhere; this side only
//! consumes an existing queue.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions},
    types::FieldTable,
    Connection, ConnectionProperties,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::constants::CONSUMER_TAG;
use crate::error::ConsumerError;
use crate::ingest::{Acknowledgement, DeliveryPolicy, Dispatcher};

/// Broker-side settings of the subscription
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub addr: String,
    pub queue: String,
    pub concurrency: usize,
    pub prefetch: u16,
}

impl From<&Config> for ConsumerSettings {
    fn from(config: &Config) -> Self {
        Self {
            addr: config.rabbitmq_addr.clone(),
            queue: config.queue_name.clone(),
            concurrency: config.concurrency,
            prefetch: config.prefetch_count,
        }
    }
}

/// One message handed out by the broker, settled exactly once
#[async_trait]
pub trait BrokerDelivery: Send + Sync + 'static {
    fn body(&self) -> &[u8];

    fn redelivered(&self) -> bool;

    fn tag(&self) -> u64;

    async fn settle(&self, acknowledgement: Acknowledgement) -> Result<(), lapin::Error>;
}

#[async_trait]
impl BrokerDelivery for Delivery {
    fn body(&self) -> &[u8] {
        &self.data
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    fn tag(&self) -> u64 {
        self.delivery_tag
    }

    async fn settle(&self, acknowledgement: Acknowledgement) -> Result<(), lapin::Error> {
        match acknowledgement {
            Acknowledgement::Ack => self.acker.ack(BasicAckOptions::default()).await,
            Acknowledgement::Requeue => {
                self.acker
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..BasicNackOptions::default()
                    })
                    .await
            }
        }
    }
}

pub struct StatConsumer {
    dispatcher: Arc<Dispatcher>,
    policy: DeliveryPolicy,
    settings: ConsumerSettings,
}

impl StatConsumer {
    pub fn new(dispatcher: Arc<Dispatcher>, policy: DeliveryPolicy, settings: ConsumerSettings) -> Self {
        Self {
            dispatcher,
            policy,
            settings,
        }
    }

    /// Connect, subscribe and consume until `shutdown` resolves or the broker
    /// ends the stream.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ConsumerError>
    where
        F: Future<Output = ()>,
    {
        let connection = Connection::connect(&self.settings.addr, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .basic_qos(self.settings.prefetch, BasicQosOptions::default())
            .await?;

        let consumer = channel
            .basic_consume(
                &self.settings.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            queue = %self.settings.queue,
            concurrency = self.settings.concurrency,
            prefetch = self.settings.prefetch,
            "Consuming stat events"
        );

        let result = consume(
            consumer,
            self.dispatcher,
            self.policy,
            self.settings.concurrency,
            shutdown,
        )
        .await;

        if let Err(e) = channel.close(200, "shutdown").await {
            debug!(error = %e, "Channel close failed");
        }
        if let Err(e) = connection.close(200, "shutdown").await {
            debug!(error = %e, "Connection close failed");
        }

        info!("Consumer stopped");
        result
    }
}

/// Worker pool over a delivery stream.
///
/// Each delivery runs on its own task, at most `concurrency` of them inside
/// the dispatcher at once. In-flight deliveries are settled before this
/// returns, whether it ends on `shutdown`, stream end or a stream error.
pub async fn consume<S, D, E, F>(
    deliveries: S,
    dispatcher: Arc<Dispatcher>,
    policy: DeliveryPolicy,
    concurrency: usize,
    shutdown: F,
) -> Result<(), ConsumerError>
where
    S: Stream<Item = Result<D, E>>,
    D: BrokerDelivery,
    ConsumerError: From<E>,
    F: Future<Output = ()>,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();
    tokio::pin!(deliveries);
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, draining in-flight deliveries");
                break Ok(());
            }
            next = deliveries.next() => match next {
                Some(Ok(delivery)) => {
                    let dispatcher = dispatcher.clone();
                    let permits = permits.clone();

                    workers.spawn(async move {
                        // never closed
                        let Ok(_permit) = permits.acquire_owned().await else {
                            return;
                        };
                        handle_delivery(&dispatcher, policy, delivery).await;
                    });
                }
                Some(Err(e)) => break Err(ConsumerError::from(e)),
                None => {
                    warn!("Consumer stream closed by broker");
                    break Ok(());
                }
            },
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                report_worker(joined);
            }
        }
    };

    while let Some(joined) = workers.join_next().await {
        report_worker(joined);
    }

    result
}

async fn handle_delivery<D: BrokerDelivery>(dispatcher: &Dispatcher, policy: DeliveryPolicy, delivery: D) {
    let disposition = dispatcher.on_message(delivery.body()).await;
    let acknowledgement = policy.decide(disposition, delivery.redelivered());

    if acknowledgement == Acknowledgement::Requeue {
        debug!(delivery_tag = delivery.tag(), "Requeueing delivery after store failure");
    }

    if let Err(e) = delivery.settle(acknowledgement).await {
        warn!(delivery_tag = delivery.tag(), error = %e, "Failed to acknowledge delivery");
    }
}

fn report_worker(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Delivery worker panicked");
    }
}
