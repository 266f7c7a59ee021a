//! 串行任务队列
//!
//! 所有处理任务按提交顺序逐个执行，前一个任务结束（无论成功与否）
//! 后才开始下一个。任务在提交时立即入队，因此顺序由调用顺序决定。
//!
//! 队列由一个本地工作任务消费，必须在 `LocalSet` 中创建。

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};
use tokio::sync::{mpsc, oneshot};

use crate::translation::error::{TranslationError, TranslationResult};

type Job = LocalBoxFuture<'static, ()>;

/// 串行任务队列
#[derive(Clone)]
pub struct SerialQueue {
    sender: mpsc::UnboundedSender<Job>,
    depth: Rc<Cell<usize>>,
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("depth", &self.depth.get())
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl SerialQueue {
    /// 创建队列并启动工作任务
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        tokio::task::spawn_local(async move {
            while let Some(job) = receiver.recv().await {
                job.await;
            }
            tracing::trace!("任务队列已停止");
        });

        Self {
            sender,
            depth: Rc::new(Cell::new(0)),
        }
    }

    /// 提交任务
    ///
    /// 返回的句柄可以等待任务结果；丢弃句柄不会取消任务。
    pub fn submit<F, T>(&self, task: F) -> QueuedTask<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let depth = Rc::clone(&self.depth);

        let job = async move {
            let output = task.await;
            depth.set(depth.get().saturating_sub(1));
            let _ = done_tx.send(output);
        }
        .boxed_local();

        self.depth.set(self.depth.get() + 1);
        if self.sender.send(job).is_err() {
            self.depth.set(self.depth.get().saturating_sub(1));
            tracing::warn!("任务队列已关闭，任务被丢弃");
        }

        QueuedTask { receiver: done_rx }
    }

    /// 已提交但尚未完成的任务数
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_idle(&self) -> bool {
        self.depth.get() == 0
    }
}

/// 已入队任务的结果句柄
#[derive(Debug)]
pub struct QueuedTask<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for QueuedTask<T> {
    type Output = TranslationResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|result| {
            result.map_err(|_| TranslationError::ConcurrencyError("任务在完成前被丢弃".to_string()))
        })
    }
}
