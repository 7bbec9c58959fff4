//! Barrido de retención en segundo plano.
//!
//! Hilo que llama `purge_expired` cada `interval` hasta que se detiene. La
//! espera usa un `Condvar`, así que `stop` no tiene que esperar el intervalo
//! completo.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};

use crate::claim::ClaimStore;
use crate::clock::Clock;

type StopSignal = Arc<(Mutex<bool>, Condvar)>;

pub struct RetentionSweeper {
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

impl RetentionSweeper {
    pub fn spawn<S: ClaimStore>(store: S, clock: Arc<dyn Clock>, interval: Duration) -> std::io::Result<Self> {
        let stop: StopSignal = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = stop.clone();
        let handle = std::thread::Builder::new().name("cmdclaim-sweeper".into())
                                                .spawn(move || run(store, clock, interval, signal))?;
        Ok(Self { stop, handle: Some(handle) })
    }

    /// Detiene el hilo y espera a que termine.
    pub fn stop(&mut self) {
        let (lock, cvar) = &*self.stop;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("sweeper:join panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RetentionSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<S: ClaimStore>(store: S, clock: Arc<dyn Clock>, interval: Duration, signal: StopSignal) {
    let (lock, cvar) = &*signal;
    let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        let (guard, _) = cvar.wait_timeout_while(stopped, interval, |s| !*s)
                             .unwrap_or_else(PoisonError::into_inner);
        stopped = guard;
        if *stopped {
            break;
        }
        // El purge no debe retener el lock de parada.
        drop(stopped);
        match store.purge_expired(clock.now()) {
            Ok(0) => {}
            Ok(n) => debug!("sweeper:purged count={n}"),
            Err(e) => warn!("sweeper:purge_failed err={e}"),
        }
        stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
    }
    debug!("sweeper:stopped");
}
