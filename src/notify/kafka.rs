use std::time::Duration;
use serde_json::Value;
use tracing::instrument;
use async_trait::async_trait;
use super::NotificationGateway;
use crate::{APP_NAME, model::events::EmailRequested, utils::{config::Configuration, errors::RecoveryError}};
use rdkafka::{ClientConfig, message::OwnedHeaders, producer::{FutureProducer, FutureRecord}};

/// Bumped whenever the EmailRequested payload changes shape.
const EMAIL_REQUESTED_VERSION: u8 = 1;

///
/// Publishes EmailRequested events for the downstream mailer.
///
pub struct KafkaGateway {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaGateway {
    pub fn new(config: &Configuration) -> Result<Self, RecoveryError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_servers)
            .set("message.timeout.ms", format!("{}", config.kafka_timeout))
            .create()?;

        Ok(KafkaGateway {
            producer,
            topic: config.email_topic.clone(),
            timeout: Duration::from_millis(config.kafka_timeout as u64),
        })
    }
}

#[async_trait]
impl NotificationGateway for KafkaGateway {
    #[instrument(name = "kafka:send", skip(self, variables))]
    async fn send_template(
        &self,
        to: &str,
        subject_key: &str,
        template_name: &str,
        variables: &Value,
        locale: &str) -> Result<(), RecoveryError> {

        let payload = serde_json::to_string(&EmailRequested {
            to: to.to_string(),
            subject_key: subject_key.to_string(),
            template_name: template_name.to_string(),
            variables: variables.clone(),
            locale: locale.to_string(),
        })?;

        self.producer
            .send(
                FutureRecord::to(&self.topic)
                    .payload(payload.as_str())
                    .key(to) // Partition key - keeps one recipient's mail in order.
                    .headers(OwnedHeaders::new()
                        .add("version", &format!("{}", EMAIL_REQUESTED_VERSION))
                        .add("sender", APP_NAME)),
                self.timeout)
            .await?;

        Ok(())
    }
}
