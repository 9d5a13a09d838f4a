// SPDX-License-Identifier: GPL-3.0-only
//! Render thread lifecycle
//!
//! The render thread owns all GPU access. It is started with an init closure
//! that builds its state (the backend) on the thread itself, then idles on a
//! command channel and handles one command at a time until told to stop.

use super::backend::Snapshot;
use crate::errors::{RenderError, RenderResult};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Work sent to the render thread
pub(crate) enum Command {
    /// Upload the latest frame if it changed, then draw
    Draw,
    /// Host surface size changed
    Resize { width: u32, height: u32 },
    /// Reply once every earlier command has been handled
    Sync(mpsc::Sender<()>),
    /// Read the render target back
    ReadBack(mpsc::Sender<RenderResult<Option<Snapshot>>>),
    /// Leave the loop and release the state
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Draw => write!(f, "Draw"),
            Command::Resize { width, height } => write!(f, "Resize({}x{})", width, height),
            Command::Sync(_) => write!(f, "Sync"),
            Command::ReadBack(_) => write!(f, "ReadBack"),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Action returned by the command handler to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopAction {
    Continue,
    Stop,
}

/// Controller for the render loop thread
pub(crate) struct RenderLoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Command channel into the loop
    commands: mpsc::Sender<Command>,
    /// Name for logging
    name: String,
}

impl RenderLoopController {
    /// Start the loop, blocking until initialization on the thread finishes
    ///
    /// If `init_fn` fails the thread exits without ever calling `handle_fn`,
    /// and its error is returned here.
    pub(crate) fn start_with_init<S, I, F>(
        name: &str,
        init_fn: I,
        mut handle_fn: F,
    ) -> RenderResult<Self>
    where
        S: 'static,
        I: FnOnce() -> RenderResult<S> + Send + 'static,
        F: FnMut(&mut S, Command) -> LoopAction + Send + 'static,
    {
        let (commands, receiver) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = mpsc::sync_channel::<RenderResult<()>>(1);
        let name_clone = name.to_string();

        info!(name = %name, "Starting render loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %name_clone, "Render loop thread started, initializing...");

                let mut state = match init_fn() {
                    Ok(s) => {
                        debug!(name = %name_clone, "Initialization successful");
                        let _ = init_tx.send(Ok(()));
                        s
                    }
                    Err(e) => {
                        warn!(name = %name_clone, error = %e, "Initialization failed");
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };

                while let Ok(command) = receiver.recv() {
                    if let Command::Shutdown = command {
                        debug!(name = %name_clone, "Shutdown received");
                        break;
                    }
                    if handle_fn(&mut state, command) == LoopAction::Stop {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }

                drop(state);
                info!(name = %name_clone, "Render loop thread exiting");
            })
            .map_err(|e| RenderError::InitFailed(format!("failed to spawn render thread: {}", e)))?;

        let mut controller = Self {
            thread_handle: Some(thread_handle),
            commands,
            name: name.to_string(),
        };

        match init_rx.recv() {
            Ok(Ok(())) => Ok(controller),
            Ok(Err(e)) => {
                controller.join();
                Err(e)
            }
            Err(_) => {
                controller.join();
                Err(RenderError::InitFailed(
                    "render thread exited during initialization".to_string(),
                ))
            }
        }
    }

    /// Queue a command; false if the loop is gone
    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Check if the loop is still running
    pub(crate) fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Whether the caller is running on the render thread itself
    fn on_render_thread(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| h.thread().id() == thread::current().id())
            .unwrap_or(false)
    }

    /// Ask the loop to stop after the commands already queued (non-blocking)
    pub(crate) fn request_stop(&self) {
        debug!(name = %self.name, "Requesting render loop stop");
        let _ = self.commands.send(Command::Shutdown);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// Called from the render thread itself, the thread is detached instead
    /// and exits once the current command returns.
    pub(crate) fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending a stop command
    pub(crate) fn join(&mut self) {
        if self.on_render_thread() {
            debug!(name = %self.name, "Stop requested from the render thread, detaching");
            self.thread_handle = None;
            return;
        }
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for render loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Render loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Render loop thread finished");
            }
        }
    }
}

impl Drop for RenderLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "RenderLoopController dropped, stopping loop");
            self.stop();
        }
    }
}
