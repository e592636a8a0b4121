//! Sources of randomness for simulated activities.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Yields samples uniformly distributed in `[0, 1)`.
pub trait ChanceSource: Send + Sync + fmt::Debug {
    fn sample(&self) -> f32;
}

/// Samples from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngChance;

impl ChanceSource for ThreadRngChance {
    fn sample(&self) -> f32 {
        rand::random::<f32>()
    }
}

/// Always yields the same sample.
#[derive(Debug, Clone, Copy)]
pub struct FixedChance(pub f32);

impl ChanceSource for FixedChance {
    fn sample(&self) -> f32 {
        self.0
    }
}

/// Yields a scripted sequence, then `fallback` once it runs out.
#[derive(Debug)]
pub struct ScriptedChance {
    samples: Mutex<VecDeque<f32>>,
    fallback: f32,
}

impl ScriptedChance {
    pub fn new(samples: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            samples: Mutex::new(samples.into_iter().collect()),
            fallback,
        }
    }
}

impl ChanceSource for ScriptedChance {
    fn sample(&self) -> f32 {
        // A poisoned lock still holds a usable queue.
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.pop_front().unwrap_or(self.fallback)
    }
}

/// Decides whether a simulated failure happens on a given draw.
#[derive(Debug, Clone)]
pub struct FailureInjector {
    probability: f32,
    source: Arc<dyn ChanceSource>,
}

impl FailureInjector {
    pub fn new(probability: f32, source: Arc<dyn ChanceSource>) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            source,
        }
    }

    /// Injector drawing from the thread RNG.
    pub fn random(probability: f32) -> Self {
        Self::new(probability, Arc::new(ThreadRngChance))
    }

    pub fn never() -> Self {
        Self::new(0.0, Arc::new(FixedChance(1.0)))
    }

    pub fn always() -> Self {
        Self::new(1.0, Arc::new(FixedChance(0.0)))
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }

    /// Draws a sample and reports whether it falls under the probability.
    pub fn should_fail(&self) -> bool {
        self.probability > 0.0 && self.source.sample() < self.probability
    }
}

impl Default for FailureInjector {
    fn default() -> Self {
        Self::never()
    }
}
