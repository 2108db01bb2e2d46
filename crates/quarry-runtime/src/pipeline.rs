// Copyright 2025 the quarry developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The background streaming pipeline.
//!
//! Two long-lived worker threads sit behind command queues: the streaming
//! worker pulls load requests and reads bytes out of a source, the
//! initialization worker runs thread-safe setup on streamed bytes. Both
//! publish [`StreamResult`]s on the registry's handoff bus and exit on an
//! explicit shutdown command, which wakes a blocked `recv` immediately.

use crossbeam_channel::{Receiver, Sender};
use quarry_core::{Resource, ResourceKey, SlotId, Source};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

/// A queued load request: the key, the source to stream from, and the
/// freshly constructed (still empty) resource.
pub struct StreamRequest {
    /// The resource's address.
    pub key: ResourceKey,
    /// The source named by the key.
    pub source: Arc<dyn Source>,
    /// The target resource, size zero until streamed.
    pub resource: Arc<Resource>,
}

/// The outcome of one trip through the pipeline, staged until the main
/// context folds it into a cache.
pub struct StreamResult {
    /// The resource's address.
    pub key: ResourceKey,
    /// Whether streaming (and initialization, if any) succeeded.
    pub success: bool,
    /// The streamed bytes; empty on failure.
    pub bytes: Vec<u8>,
    /// Final byte size; zero on failure.
    pub size: usize,
    /// The target resource.
    pub resource: Arc<Resource>,
}

pub(crate) enum StreamCommand {
    Load(StreamRequest),
    Shutdown,
}

pub(crate) enum InitCommand {
    Init(StreamResult),
    Shutdown,
}

/// The streaming worker: blocks on its command queue, reads one resource
/// per request, and routes the result either through the initialization
/// worker or straight onto the handoff bus.
pub struct StreamWorker {
    commands: Sender<StreamCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StreamWorker {
    /// Spawns the worker thread. Results that need no thread-side
    /// initialization go to `results`; the rest are forwarded to
    /// `init_queue`.
    pub(crate) fn start(
        init_queue: Sender<InitCommand>,
        results: flume::Sender<StreamResult>,
    ) -> Self {
        let (commands, queue) = crossbeam_channel::unbounded();
        let handle = thread::spawn(move || stream_loop(queue, init_queue, results));
        log::info!("Streaming worker started");
        Self {
            commands,
            handle: Some(handle),
        }
    }

    /// Queues a request. Returns `false` if the worker has already shut
    /// down.
    pub(crate) fn submit(&self, request: StreamRequest) -> bool {
        self.commands.send(StreamCommand::Load(request)).is_ok()
    }

    /// Sends the shutdown command and joins the thread. Requests still in
    /// the queue behind the command are abandoned.
    pub fn stop(&mut self) {
        let _ = self.commands.send(StreamCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The initialization worker: blocks on its command queue and runs each
/// resource's thread-safe initialization hook, then deposits the result on
/// the handoff bus regardless of outcome.
pub struct InitWorker {
    commands: Sender<InitCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl InitWorker {
    /// Spawns the worker thread.
    pub(crate) fn start(results: flume::Sender<StreamResult>) -> Self {
        let (commands, queue) = crossbeam_channel::unbounded();
        let handle = thread::spawn(move || init_loop(queue, results));
        log::info!("Initialization worker started");
        Self {
            commands,
            handle: Some(handle),
        }
    }

    /// The queue the streaming worker forwards into.
    pub(crate) fn queue(&self) -> Sender<InitCommand> {
        self.commands.clone()
    }

    /// Sends the shutdown command and joins the thread.
    pub fn stop(&mut self) {
        let _ = self.commands.send(InitCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InitWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stream_loop(
    commands: Receiver<StreamCommand>,
    init_queue: Sender<InitCommand>,
    results: flume::Sender<StreamResult>,
) {
    // One slot per source, owned by this thread for its whole life.
    let mut slots: HashMap<String, SlotId> = HashMap::new();
    while let Ok(command) = commands.recv() {
        let request = match command {
            StreamCommand::Shutdown => break,
            StreamCommand::Load(request) => request,
        };
        let result = stream_one(&mut slots, request);
        if result.success && result.resource.payload().requires_thread_init() {
            if init_queue.send(InitCommand::Init(result)).is_err() {
                log::error!("Initialization queue closed; dropping streamed result");
            }
        } else if results.send(result).is_err() {
            // Receiver gone: registry tear-down already abandoned us.
            log::debug!("Handoff bus closed; dropping streamed result");
        }
    }
    log::info!("Streaming worker stopped");
}

fn stream_one(slots: &mut HashMap<String, SlotId>, request: StreamRequest) -> StreamResult {
    let StreamRequest {
        key,
        source,
        resource,
    } = request;

    let slot = match slots.get(key.source()) {
        Some(&slot) => Ok(slot),
        None => source.new_thread_slot().inspect(|&slot| {
            slots.insert(key.source().to_string(), slot);
        }),
    };

    match slot.and_then(|slot| source.read(key.name(), slot)) {
        Ok(bytes) if !bytes.is_empty() => {
            let size = bytes.len();
            // Init routines rely on an accurate size, set it before staging.
            resource.set_size(size);
            log::debug!("Streamed '{key}' ({size} bytes)");
            StreamResult {
                key,
                success: true,
                bytes,
                size,
                resource,
            }
        }
        Ok(_) => {
            log::warn!("Streaming '{key}' produced no bytes");
            failed(key, resource)
        }
        Err(e) => {
            log::warn!("Streaming '{key}' failed: {e}");
            failed(key, resource)
        }
    }
}

fn init_loop(commands: Receiver<InitCommand>, results: flume::Sender<StreamResult>) {
    while let Ok(command) = commands.recv() {
        let mut result = match command {
            InitCommand::Shutdown => break,
            InitCommand::Init(result) => result,
        };
        if let Err(e) = result.resource.payload().on_thread_init(&result.bytes) {
            log::warn!("Thread initialization of '{}' failed: {e}", result.key);
            result.success = false;
        }
        // Deposited regardless of outcome so the poller can observe the
        // failure.
        if results.send(result).is_err() {
            log::debug!("Handoff bus closed; dropping initialized result");
        }
    }
    log::info!("Initialization worker stopped");
}

fn failed(key: ResourceKey, resource: Arc<Resource>) -> StreamResult {
    StreamResult {
        key,
        success: false,
        bytes: Vec::new(),
        size: 0,
        resource,
    }
}
