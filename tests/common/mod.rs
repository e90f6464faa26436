//! Counting service doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use talk_bridge::bridge::{self, Bridge};
use talk_bridge::config::BridgeConfig;
use talk_bridge::interpreter::Env;
use talk_bridge::service::{
    CallContext, Cell, Identity, IdentityService, Module, ProcessResult, ProcessService,
    ServiceError, ServiceResult, Services,
};

/// Backend that records every call it receives.
#[derive(Default)]
pub struct CountingBackend {
    pub identities: HashMap<String, Identity>,
    pub results: HashMap<String, Vec<ProcessResult>>,
    pub failing: Mutex<HashSet<String>>,
    pub identity_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
}

impl CountingBackend {
    pub fn seeded() -> Self {
        let mut backend = Self::default();
        backend.identities.insert(
            "abc123".into(),
            Identity::Cell(Cell {
                id: "cell-1".into(),
                nvid: "abc123".into(),
            }),
        );
        backend.identities.insert(
            "mod001".into(),
            Identity::Module(Module {
                id: "module-1".into(),
                nvid: "mod001".into(),
                cells: vec!["cell-1".into()],
            }),
        );
        backend.results.insert(
            "abc123".into(),
            vec![result("r-1", "formation"), result("r-2", "aging"), result("r-3", "grading")],
        );
        backend.failing.lock().insert("zzz999".into());
        backend
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub fn recover(&self, id: &str) {
        self.failing.lock().remove(id);
    }

    fn check(&self, id: &str) -> ServiceResult<()> {
        if self.failing.lock().contains(id) {
            return Err(ServiceError::Unavailable(format!("backend down for {}", id)));
        }
        Ok(())
    }
}

impl IdentityService for CountingBackend {
    fn lookup_identity(&self, _ctx: &CallContext, id: &str) -> ServiceResult<Identity> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        self.check(id)?;
        self.identities
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }
}

impl ProcessService for CountingBackend {
    fn fetch_results(&self, _ctx: &CallContext, id: &str) -> ServiceResult<Vec<ProcessResult>> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.check(id)?;
        Ok(self.results.get(id).cloned().unwrap_or_default())
    }
}

pub fn result(id: &str, kind: &str) -> ProcessResult {
    ProcessResult {
        id: id.into(),
        identity: "abc123".into(),
        kind: kind.into(),
    }
}

/// Environment with the bridge installed over `backend`.
pub fn setup(backend: Arc<CountingBackend>) -> (Env, Arc<Bridge>) {
    let mut env = Env::new();
    let bridge = bridge::load(
        &mut env,
        Services::from_backend(backend),
        &BridgeConfig::default(),
    );
    (env, bridge)
}
