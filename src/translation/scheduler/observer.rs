//! 变更观察与帧合并
//!
//! 文档变更通知在一帧内合并为一次回调。状态只有两种：
//! 空闲与已安排；已安排期间的通知被吸收。

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// 文档变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// 节点增删
    ChildList,
    /// 文本内容变化
    CharacterData,
    /// 属性变化
    Attributes,
}

impl MutationKind {
    /// 是否需要重新处理
    pub fn qualifies(&self) -> bool {
        matches!(self, MutationKind::ChildList | MutationKind::CharacterData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Scheduled,
}

/// 变更观察器
///
/// 需要在 `LocalSet` 中使用。
pub struct MutationObserver {
    scheduled: Rc<Cell<bool>>,
    connected: Rc<Cell<bool>>,
    frame_interval: Duration,
    callback: Rc<dyn Fn()>,
    fired: Rc<Cell<usize>>,
}

impl std::fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationObserver")
            .field("state", &self.state())
            .field("connected", &self.connected.get())
            .field("frame_interval", &self.frame_interval)
            .field("fired", &self.fired.get())
            .finish()
    }
}

impl MutationObserver {
    pub fn new(frame_interval: Duration, callback: Rc<dyn Fn()>) -> Self {
        Self {
            scheduled: Rc::new(Cell::new(false)),
            connected: Rc::new(Cell::new(true)),
            frame_interval,
            callback,
            fired: Rc::new(Cell::new(0)),
        }
    }

    /// 接收一条变更通知，返回是否安排了新的回调
    pub fn notify(&self, kind: MutationKind) -> bool {
        if !self.connected.get() || !kind.qualifies() {
            return false;
        }
        if self.scheduled.replace(true) {
            return false;
        }

        let scheduled = Rc::clone(&self.scheduled);
        let connected = Rc::clone(&self.connected);
        let callback = Rc::clone(&self.callback);
        let fired = Rc::clone(&self.fired);
        let frame_interval = self.frame_interval;

        tokio::task::spawn_local(async move {
            tokio::time::sleep(frame_interval).await;
            // 先复位，回调期间的新通知会安排下一帧
            scheduled.set(false);
            if connected.get() {
                fired.set(fired.get() + 1);
                callback();
            }
        });

        true
    }

    pub fn state(&self) -> ObserverState {
        if self.scheduled.get() {
            ObserverState::Scheduled
        } else {
            ObserverState::Idle
        }
    }

    pub fn connect(&self) {
        self.connected.set(true);
    }

    /// 断开后通知被忽略，已安排的回调也不再执行
    pub fn disconnect(&self) {
        self.connected.set(false);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// 已执行的回调次数
    pub fn fired(&self) -> usize {
        self.fired.get()
    }
}
