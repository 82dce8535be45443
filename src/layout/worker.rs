use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui::Pos2;
use log::warn;

use super::force::{ForceParams, LayoutNode, force_layout, grid_layout};
use crate::error::Result;

/// A force layout running on its own thread.
pub struct LayoutJob {
    count: usize,
    rx: Option<Receiver<Result<Vec<Pos2>>>>,
}

pub fn spawn_layout(nodes: Vec<LayoutNode>, edges: Vec<(usize, usize)>) -> LayoutJob {
    let count = nodes.len();
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("navgraph-layout".to_owned())
        .spawn(move || {
            let params = ForceParams::for_node_count(nodes.len());
            let _ = tx.send(force_layout(&nodes, &edges, &params));
        });

    match spawned {
        Ok(_) => LayoutJob {
            count,
            rx: Some(rx),
        },
        Err(error) => {
            warn!("cannot start layout thread: {error}");
            LayoutJob { count, rx: None }
        }
    }
}

impl LayoutJob {
    /// Non-blocking check, meant to be called once per frame. `None` while the
    /// worker is still running; a failed or vanished worker yields the grid.
    pub fn poll(&mut self) -> Option<Vec<Pos2>> {
        let Some(rx) = self.rx.as_ref() else {
            return Some(grid_layout(self.count));
        };
        let outcome = match rx.try_recv() {
            Ok(Ok(positions)) => positions,
            Ok(Err(error)) => {
                warn!("layout failed, using grid: {error}");
                grid_layout(self.count)
            }
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                warn!("layout worker exited without a result, using grid");
                grid_layout(self.count)
            }
        };
        self.rx = None;
        Some(outcome)
    }

    /// Blocks up to `timeout`. Failure, a dead worker or a timeout all yield the
    /// fallback grid.
    pub fn wait(self, timeout: Duration) -> Vec<Pos2> {
        let Some(rx) = self.rx else {
            return grid_layout(self.count);
        };
        match rx.recv_timeout(timeout) {
            Ok(Ok(positions)) => positions,
            Ok(Err(error)) => {
                warn!("layout failed, using grid: {error}");
                grid_layout(self.count)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("layout timed out after {timeout:?}, using grid");
                grid_layout(self.count)
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("layout worker exited without a result, using grid");
                grid_layout(self.count)
            }
        }
    }
}
