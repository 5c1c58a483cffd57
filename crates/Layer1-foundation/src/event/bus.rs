//! Event Bus - 이벤트 브로드캐스트 시스템
//!
//! `EventSink` 는 coordinator 가 의존하는 최소 계약이고,
//! `EventBus` 는 리스너/히스토리/broadcast 채널을 가진 기본 구현이다.

use super::types::{EventKind, TrainingEvent};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, trace, warn};

// ============================================================================
// EventSink Trait
// ============================================================================

/// Event-sink collaborator
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn notify(&self, kind: EventKind, job_id: u64, message: &str);
}

/// Sink that only writes to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn notify(&self, kind: EventKind, job_id: u64, message: &str) {
        match kind {
            EventKind::FatalTrainingError => error!(job_id, kind = %kind, "{}", message),
            EventKind::RetryableTrainingError => warn!(job_id, kind = %kind, "{}", message),
            EventKind::SampleClassified => trace!(job_id, kind = %kind, "{}", message),
            _ => info!(job_id, kind = %kind, "{}", message),
        }
    }
}

// ============================================================================
// EventListener Trait
// ============================================================================

/// 이벤트 리스너 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// 이벤트 리스너 trait
#[async_trait]
pub trait EventListener: Send + Sync {
    /// 리스너 이름 (디버깅용)
    fn name(&self) -> &str;

    /// 관심 있는 이벤트 종류 (None이면 모든 이벤트)
    fn kinds(&self) -> Option<Vec<EventKind>> {
        None
    }

    /// 이벤트 처리
    async fn on_event(&self, event: &TrainingEvent);
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            history_size: 100,
        }
    }
}

/// 이벤트 버스
pub struct EventBus {
    config: EventBusConfig,

    /// 브로드캐스트 채널 송신자
    sender: broadcast::Sender<TrainingEvent>,

    listeners: RwLock<HashMap<ListenerId, Arc<dyn EventListener>>>,

    listener_counter: AtomicU64,

    history: RwLock<VecDeque<TrainingEvent>>,

    event_count: AtomicU64,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            config,
            sender,
            listeners: RwLock::new(HashMap::new()),
            listener_counter: AtomicU64::new(0),
            history: RwLock::new(VecDeque::new()),
            event_count: AtomicU64::new(0),
        }
    }

    /// 리스너 등록
    pub async fn subscribe(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.listener_counter.fetch_add(1, Ordering::SeqCst));

        debug!(
            listener_name = listener.name(),
            listener_id = %id,
            "Registering event listener"
        );

        self.listeners.write().await.insert(id, listener);
        id
    }

    /// 리스너 해제
    pub async fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.listeners.write().await.remove(&id).is_some();
        if removed {
            debug!(listener_id = %id, "Unregistered event listener");
        }
        removed
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: TrainingEvent) {
        self.event_count.fetch_add(1, Ordering::SeqCst);

        {
            let mut history = self.history.write().await;
            history.push_back(event.clone());
            while history.len() > self.config.history_size {
                history.pop_front();
            }
        }

        // 수신자가 없으면 에러지만 무시한다
        let _ = self.sender.send(event.clone());

        let listeners = self.listeners.read().await;
        for (id, listener) in listeners.iter() {
            let wanted = listener
                .kinds()
                .map_or(true, |kinds| kinds.contains(&event.kind));
            if wanted {
                trace!(
                    listener_id = %id,
                    listener_name = listener.name(),
                    kind = %event.kind,
                    "Delivering event to listener"
                );
                listener.on_event(&event).await;
            }
        }
    }

    /// 브로드캐스트 수신자 생성 (스트림 방식)
    pub fn receiver(&self) -> broadcast::Receiver<TrainingEvent> {
        self.sender.subscribe()
    }

    /// 최근 이벤트 히스토리 조회 (최신 순)
    pub async fn history(&self, limit: Option<usize>) -> Vec<TrainingEvent> {
        let history = self.history.read().await;
        let limit = limit.unwrap_or(history.len());
        history.iter().rev().take(limit).cloned().collect()
    }

    /// 특정 종류 이벤트만 조회 (발생 순)
    pub async fn events_of(&self, kind: EventKind) -> Vec<TrainingEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// 등록된 리스너 수
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn notify(&self, kind: EventKind, job_id: u64, message: &str) {
        TracingSink.notify(kind, job_id, message).await;
        self.publish(TrainingEvent::new(kind, job_id, message)).await;
    }
}

// ============================================================================
// 테스트
// ============================================================================
