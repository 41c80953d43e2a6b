use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use backlog_core::domain::{QueueStatus, TaskMetadata};
use backlog_core::http::{HttpClient, HttpRequest, HttpResponse, HttpRetryPolicy, TransportError};
use backlog_core::impls::FileRecordStore;
use backlog_core::ports::{HttpTransport, SystemClock};
use backlog_core::tasks::{
    self, DeletePushToken, IdentifyProfile, MetricEvent, RegisterPushToken, TrackDeliveryMetric,
    TrackEvent, TrackPushMetric,
};
use backlog_core::{QueueBuilder, QueueConfig};

/// Pretend API: every request takes a moment, every third one finds no network.
struct SimulatedTransport {
    calls: AtomicU32,
}

impl SimulatedTransport {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl HttpTransport for SimulatedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        sleep(Duration::from_millis(20)).await;
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call % 3 == 0 {
            return Err(TransportError::NoNetwork("simulated outage".to_string()));
        }
        println!("-> {} {}", request.method, request.path);
        Ok(HttpResponse::new(200, "{}"))
    }
}

#[derive(Serialize)]
struct Summary {
    status: QueueStatus,
    remaining: Vec<TaskMetadata>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) 設定と保存先
    let config = QueueConfig::from_env()?;
    let storage_dir = config
        .storage_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("backlog-demo"));
    info!(dir = %storage_dir.display(), "using file record store");

    // (B) HTTP クライアントとキューを組み立てる
    let client = Arc::new(HttpClient::new(
        Arc::new(SimulatedTransport::new()),
        Arc::new(SystemClock),
        HttpRetryPolicy::standard(),
        config.unauthorized_pause,
    ));
    let queue = QueueBuilder::new(config)
        .record_store(Arc::new(FileRecordStore::new(storage_dir)))
        .register_sdk_tasks(client)?
        .expect_tasks(&tasks::SDK_TASK_TYPES)
        .build()?;

    // (C) SDK のタスクを投入
    let now = Utc::now();
    let mut attributes = serde_json::Map::new();
    attributes.insert("plan".to_string(), serde_json::json!("pro"));
    tasks::enqueue(
        &queue,
        &IdentifyProfile {
            identifier: "ann".to_string(),
            attributes,
        },
    );
    tasks::enqueue(
        &queue,
        &TrackEvent {
            identifier: "ann".to_string(),
            name: "purchase".to_string(),
            data: serde_json::Map::new(),
            timestamp: Some(now),
        },
    );
    tasks::enqueue(
        &queue,
        &RegisterPushToken {
            identifier: "ann".to_string(),
            token: "device-token-1".to_string(),
            platform: "ios".to_string(),
            last_used: now,
        },
    );
    tasks::enqueue(
        &queue,
        &TrackPushMetric {
            delivery_id: "delivery-1".to_string(),
            event: MetricEvent::Opened,
            device_token: "device-token-1".to_string(),
            timestamp: now,
        },
    );
    tasks::enqueue(
        &queue,
        &TrackDeliveryMetric {
            delivery_id: "delivery-2".to_string(),
            event: MetricEvent::Clicked,
            timestamp: now,
        },
    );
    let added = tasks::enqueue(
        &queue,
        &DeletePushToken {
            identifier: "ann".to_string(),
            token: "old-token".to_string(),
        },
    );
    println!(
        "queued: {} task(s) in '{}'",
        added.status.num_tasks_in_queue, added.status.queue_id
    );

    // (D) 1 パス分を実行して残りを表示（失敗したものは次回の起動で再実行される）
    queue.run_until_complete().await;

    let summary = Summary {
        status: queue.status(),
        remaining: queue.get_all_stored_tasks(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
