#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use filterbench::{FilterBackend, FilterError, FilterParameter, FilterResult, PixelBuffer};

const WAIT: Duration = Duration::from_secs(10);

/// Backend whose calls can be held open and scripted to fail.
///
/// `apply` reports the control value it started with, then (when gated) waits for one release
/// token. The returned 1x1 image carries the control value in its red channel.
pub struct ScriptedBackend {
    name: &'static str,
    gate: Option<Receiver<()>>,
    started: Sender<u8>,
    fail_on: Vec<u8>,
    applies: Arc<AtomicUsize>,
    configured: bool,
}

/// Test-side handles for a [`ScriptedBackend`].
pub struct Probe {
    started: Receiver<u8>,
    release: Sender<()>,
    applies: Arc<AtomicUsize>,
}

impl Probe {
    /// Block until the backend starts an execution, returning its control value.
    pub fn next_started(&self) -> u8 {
        self.started
            .recv_timeout(WAIT)
            .expect("backend did not start an execution in time")
    }

    /// Let one held execution finish.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }

    /// Number of `apply` calls so far.
    pub fn applies(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }

    /// Whether an execution started that was not yet observed.
    pub fn pending_start(&self) -> Option<u8> {
        self.started.try_recv().ok()
    }
}

pub fn scripted(name: &'static str, gated: bool, fail_on: &[u8]) -> (ScriptedBackend, Probe) {
    let (release, gate) = mpsc::channel();
    let (started_tx, started_rx) = mpsc::channel();
    let applies = Arc::new(AtomicUsize::new(0));
    let backend = ScriptedBackend {
        name,
        gate: gated.then_some(gate),
        started: started_tx,
        fail_on: fail_on.to_vec(),
        applies: Arc::clone(&applies),
        configured: false,
    };
    let probe = Probe {
        started: started_rx,
        release,
        applies,
    };
    (backend, probe)
}

impl FilterBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn configure(&mut self, _input: Arc<PixelBuffer>, _slot_count: usize) -> FilterResult<()> {
        if self.configured {
            return Err(FilterError::invalid_state("configured twice"));
        }
        self.configured = true;
        Ok(())
    }

    fn apply(&mut self, param: FilterParameter, _slot: usize) -> FilterResult<Arc<PixelBuffer>> {
        if !self.configured {
            return Err(FilterError::NotConfigured);
        }
        self.applies.fetch_add(1, Ordering::SeqCst);
        let control = param.control.get();
        let _ = self.started.send(control);
        if let Some(gate) = &self.gate {
            gate.recv_timeout(WAIT)
                .map_err(|_| FilterError::invalid_state("test gate never released"))?;
        }
        if self.fail_on.contains(&control) {
            return Err(FilterError::resource(format!("scripted failure at {control}")));
        }
        Ok(Arc::new(PixelBuffer::from_rgba8(1, 1, vec![control, 0, 0, 255])?))
    }

    fn cleanup(&mut self) {
        self.configured = false;
    }
}

pub fn tiny_input() -> Arc<PixelBuffer> {
    Arc::new(PixelBuffer::from_rgba8(1, 1, vec![0, 0, 0, 255]).unwrap())
}
