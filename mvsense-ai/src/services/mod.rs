//! Pipeline services
//!
//! Upstream clients sit behind traits (`SnapshotApi`, `RecognitionService`,
//! `ImageFetcher`, `MessageBus`) so the pipeline can run against scripted
//! collaborators in tests.

pub mod meraki_client;
pub mod mqtt_bus;
pub mod recognition;
pub mod rekognition_client;
pub mod result_publisher;
pub mod snapshot_acquirer;
pub mod stats_aggregator;
pub mod word_cloud;

pub use meraki_client::{MerakiClient, SnapshotApi};
pub use mqtt_bus::{MessageBus, MqttBus, TriggerListener};
pub use recognition::{HttpImageFetcher, ImageFetcher, RecognitionClient};
pub use rekognition_client::{RecognitionService, RekognitionClient};
pub use result_publisher::ResultPublisher;
pub use snapshot_acquirer::SnapshotAcquirer;
pub use stats_aggregator::{FaceAccumulation, StatsAggregator};
pub use word_cloud::WordCloudEncoder;
