use crate::models::DrawEvent;
use tokio::sync::broadcast;

/// 抽奖事件广播，展示屏通过 SSE 订阅
#[derive(Clone)]
pub struct DrawEventBus {
    sender: broadcast::Sender<DrawEvent>,
}

impl DrawEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 没有订阅者时直接丢弃
    pub fn publish(&self, event: DrawEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            log::debug!("Draw event {name} dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DrawEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for DrawEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
