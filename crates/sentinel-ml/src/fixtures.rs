//! Deterministic inference fixtures for tests.
//!
//! The real engine is swapped out for a backend that returns fixed logits,
//! so pipeline behavior can be pinned down exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use sentinel_core::MlError;

use crate::backend::{InferenceBackend, IoSpec, Tensor, TensorSpec};

/// Test backend returning fixed logits under the `logits` output name.
pub struct FixtureBackend {
    logits: Vec<f32>,
    output_name: String,
    fail_init: AtomicBool,
    fail_run: AtomicBool,
    delay: Option<Duration>,
    init_count: AtomicUsize,
    run_count: AtomicUsize,
}

impl FixtureBackend {
    pub fn with_logits(logits: Vec<f32>) -> Self {
        Self {
            logits,
            output_name: "logits".into(),
            fail_init: AtomicBool::new(false),
            fail_run: AtomicBool::new(false),
            delay: None,
            init_count: AtomicUsize::new(0),
            run_count: AtomicUsize::new(0),
        }
    }

    /// Rename the output tensor, for exercising the missing-`logits` path.
    pub fn with_output_name(mut self, name: &str) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn failing_init(self) -> Self {
        self.fail_init.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_run(self) -> Self {
        self.fail_run.store(true, Ordering::SeqCst);
        self
    }

    /// Make every `run` sleep, for exercising the deadline path.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for FixtureBackend {
    async fn initialize(&self) -> Result<(), MlError> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(MlError::Backend("fixture init failure".into()));
        }
        self.init_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn run(
        &self,
        _inputs: HashMap<String, Tensor>,
    ) -> Result<HashMap<String, Tensor>, MlError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_run.load(Ordering::SeqCst) {
            return Err(MlError::Backend("fixture run failure".into()));
        }
        self.run_count.fetch_add(1, Ordering::SeqCst);
        Ok(HashMap::from([(
            self.output_name.clone(),
            Tensor::row(self.logits.clone()),
        )]))
    }

    fn metadata(&self) -> IoSpec {
        IoSpec {
            inputs: vec![TensorSpec {
                name: "input".into(),
                shape: vec![1, -1],
            }],
            outputs: vec![TensorSpec {
                name: self.output_name.clone(),
                shape: vec![1, self.logits.len() as i64],
            }],
        }
    }

    async fn dispose(&self) {}
}
