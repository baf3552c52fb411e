use std::thread;

use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::models::error::MediaError;
use crate::models::event::EngineEvent;
use crate::models::track::{EffectDescriptor, MediaType, TrackId};
use crate::session::manager::TrackManager;
use crate::session::mute::MuteOutcome;
use crate::traits::effect::StreamEffect;

type ManagerTask = Box<dyn FnOnce(&mut TrackManager) + Send>;

enum Command {
    Event(EngineEvent),
    Run(ManagerTask),
    Shutdown,
}

/// Runs a `TrackManager` on its own thread.
///
/// Engine events, caller commands and due liveness timers are handled one at
/// a time in arrival order; the thread sleeps until the next command or the
/// next timer deadline, whichever comes first.
pub struct EventLoop;

impl EventLoop {
    pub fn spawn(manager: TrackManager) -> Result<EventLoopHandle, MediaError> {
        let (tx, rx) = unbounded();
        let handle = thread::Builder::new()
            .name("media-track-events".into())
            .spawn(move || run(manager, rx))
            .map_err(|e| MediaError::ConfigurationFailed(format!("failed to spawn event loop: {}", e)))?;

        Ok(EventLoopHandle {
            tx,
            thread: Some(handle),
        })
    }
}

fn run(mut manager: TrackManager, rx: Receiver<Command>) -> TrackManager {
    loop {
        let received = match manager.next_deadline() {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Command::Event(event)) => {
                if let Err(e) = manager.handle_event(event) {
                    log::warn!("Engine event handled with error: {}", e);
                }
            }
            Ok(Command::Run(task)) => task(&mut manager),
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        manager.run_due_timers();
        manager.check_effects();
    }
    log::debug!("Event loop stopped with {} tracks", manager.registry().len());
    manager
}

/// Caller side of an `EventLoop`. Dropping it stops the loop.
pub struct EventLoopHandle {
    tx: Sender<Command>,
    thread: Option<thread::JoinHandle<TrackManager>>,
}

impl EventLoopHandle {
    /// Queue an engine event. Errors raised while handling it are logged.
    pub fn dispatch(&self, event: EngineEvent) -> Result<(), MediaError> {
        self.tx
            .send(Command::Event(event))
            .map_err(|_| MediaError::EventLoopClosed)
    }

    /// Run `f` on the loop thread and wait for its result.
    pub fn with_manager<R, F>(&self, f: F) -> Result<R, MediaError>
    where
        R: Send + 'static,
        F: FnOnce(&mut TrackManager) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        let task: ManagerTask = Box::new(move |manager| {
            let _ = reply_tx.send(f(manager));
        });
        self.tx
            .send(Command::Run(task))
            .map_err(|_| MediaError::EventLoopClosed)?;
        reply_rx.recv().map_err(|_| MediaError::EventLoopClosed)
    }

    pub fn set_muted(
        &self,
        track_id: Option<TrackId>,
        media_type: MediaType,
        muted: bool,
        ensure_track: bool,
    ) -> Result<MuteOutcome, MediaError> {
        self.with_manager(move |manager| manager.set_muted(track_id.as_ref(), media_type, muted, ensure_track))?
    }

    pub fn attach_effect(&self, track_id: TrackId, effect: Box<dyn StreamEffect>) -> Result<EffectDescriptor, MediaError> {
        self.with_manager(move |manager| manager.attach_effect(&track_id, effect))?
    }

    pub fn detach_effect(&self, track_id: TrackId) -> Result<bool, MediaError> {
        self.with_manager(move |manager| manager.detach_effect(&track_id))
    }

    /// Stop the loop after every queued command and hand the manager back.
    pub fn shutdown(mut self) -> Result<TrackManager, MediaError> {
        let _ = self.tx.send(Command::Shutdown);
        let handle = self.thread.take().ok_or(MediaError::EventLoopClosed)?;
        handle.join().map_err(|_| MediaError::EventLoopClosed)
    }
}

impl Drop for EventLoopHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = self.tx.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}
