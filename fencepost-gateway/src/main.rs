//! Fencepost gateway
//!
//! Subscribes to RSSI readings on an MQTT broker, localizes each device once
//! every receiver node has reported, and publishes a geofence verdict per
//! completed reading set.
//!
//! Usage:
//!   fencepost-gateway --broker localhost --port 1883 --config ward.json
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fencepost_connectors::mqtt::{MqttConfig, MqttConnector};
use fencepost_connectors::GatewayService;
use fencepost_core::{FencepostConfig, LocalizationPipeline};
use log::info;
use tracing_subscriber::EnvFilter;

/// MQTT gateway for RSSI localization and geofence alerts
#[derive(Parser, Debug)]
#[command(name = "fencepost-gateway", version, about)]
struct Cli {
    /// Broker host name or address
    #[arg(long, default_value = "localhost")]
    broker: String,

    /// Broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// MQTT client identifier
    #[arg(long, default_value = "fencepost-gateway")]
    client_id: String,

    /// Topic readings are consumed from
    #[arg(long, default_value = "sensor/data")]
    input_topic: String,

    /// Topic alerts are published to
    #[arg(long, default_value = "sensor/alerts")]
    alert_topic: String,

    /// Keep-alive interval in seconds
    #[arg(long, default_value_t = 60)]
    keep_alive: u64,

    /// JSON deployment config (node table, safe zone, policies)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn mqtt_config(&self) -> MqttConfig {
        MqttConfig::new(self.broker.clone(), self.port)
            .client_id(self.client_id.clone())
            .keep_alive_secs(self.keep_alive)
            .input_topic(self.input_topic.clone())
            .alert_topic(self.alert_topic.clone())
    }

    fn deployment(&self) -> anyhow::Result<FencepostConfig> {
        match &self.config {
            Some(path) => FencepostConfig::from_path(path)
                .with_context(|| format!("loading deployment config {}", path.display())),
            None => Ok(FencepostConfig::default()),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let deployment = cli.deployment()?;
    let pipeline = LocalizationPipeline::new(&deployment).context("invalid deployment config")?;
    info!(
        "Tracking against {} nodes, safe zone {:?}",
        pipeline.nodes().len(),
        pipeline.zone()
    );

    let mqtt = cli.mqtt_config();
    let alert_topic = mqtt.alert_topic.clone();
    let (source, publisher) = MqttConnector::connect(mqtt).context("invalid MQTT settings")?;
    let mut service = GatewayService::new(pipeline, source, publisher, alert_topic);

    tokio::select! {
        result = service.run() => {
            result.context("MQTT source failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for shutdown signal")?;
            info!("Shutting down");
        }
    }

    let stats = service.stats();
    info!(
        "Processed {} messages: {} rejected, {} cycles, {} alerts published, {} publish failures",
        stats.received, stats.rejected, stats.cycles, stats.published, stats.publish_failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn defaults_match_reference_deployment() {
        let cli = Cli::try_parse_from(["fencepost-gateway"]).unwrap();
        let mqtt = cli.mqtt_config();

        assert_eq!(mqtt.host, "localhost");
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.input_topic, "sensor/data");
        assert_eq!(mqtt.alert_topic, "sensor/alerts");
        assert_eq!(mqtt.keep_alive, Duration::from_secs(60));
        assert!(cli.config.is_none());
        assert_eq!(cli.deployment().unwrap(), FencepostConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "fencepost-gateway",
            "--broker",
            "10.0.0.5",
            "--port",
            "8883",
            "--client-id",
            "ward-2",
            "--input-topic",
            "ward2/rssi",
            "--alert-topic",
            "ward2/alerts",
            "--keep-alive",
            "15",
        ])
        .unwrap();
        let mqtt = cli.mqtt_config();

        assert_eq!(mqtt.host, "10.0.0.5");
        assert_eq!(mqtt.port, 8883);
        assert_eq!(mqtt.client_id, "ward-2");
        assert_eq!(mqtt.input_topic, "ward2/rssi");
        assert_eq!(mqtt.alert_topic, "ward2/alerts");
        assert_eq!(mqtt.keep_alive, Duration::from_secs(15));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Cli::try_parse_from(["fencepost-gateway", "--port", "99999"]).is_err());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["fencepost-gateway", "--config", "/nonexistent/ward.json"]).unwrap();
        let err = cli.deployment().unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/ward.json"));
    }

    #[test]
    fn loads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"safe_zone": {"xmin": 0, "xmax": 1, "ymin": 0, "ymax": 1}}"#)
            .unwrap();

        let path = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["fencepost-gateway", "--config", path]).unwrap();
        let deployment = cli.deployment().unwrap();

        assert_eq!(deployment.safe_zone.xmax, 1.0);
        assert_eq!(deployment.nodes.len(), 4);
    }
}
