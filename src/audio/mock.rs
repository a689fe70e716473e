//! Recording audio platform for tests
//!
//! Every device call is appended to an op log. Sleeps resolve immediately
//! (optionally running a hook first) and spawned tasks queue until
//! `run_tasks` drives them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::device::{
    AudioDevice, AudioError, AudioPlatform, AudioResult, GainControl, LocalBoxFuture,
    OscillatorControl, Waveform,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Open,
    Resume,
    Close,
    CreateGain(u32),
    CreateOscillator(u32, Waveform),
    Connect { from: u32, to: u32 },
    ConnectOutput(u32),
    SetGain { node: u32, value: f32, at: f64 },
    RampGain { node: u32, value: f32, at: f64 },
    SetFrequency { node: u32, hz: f32, at: f64 },
    RampFrequency { node: u32, hz: f32, at: f64 },
    Start { node: u32, at: f64 },
    Stop { node: u32, at: f64 },
    Sleep(u32),
}

#[derive(Default)]
pub struct MockHost {
    pub mobile: Cell<bool>,
    pub fail_open: Cell<bool>,
    /// How many `is_suspended` polls report true
    pub suspended_polls: Cell<u32>,
    /// How many upcoming `start_at` calls fail
    pub fail_starts: Cell<u32>,
    pub time: Cell<f64>,
    next_node: Cell<u32>,
    ops: RefCell<Vec<Op>>,
    ended: RefCell<HashMap<u32, Box<dyn FnOnce()>>>,
    tasks: RefCell<Vec<LocalBoxFuture<()>>>,
    on_sleep: RefCell<Option<Box<dyn FnMut(u32)>>>,
}

impl MockHost {
    fn record(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    fn node_id(&self) -> u32 {
        let id = self.next_node.get() + 1;
        self.next_node.set(id);
        id
    }
}

#[derive(Clone, Default)]
pub struct MockPlatform {
    pub host: Rc<MockHost>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mobile() -> Self {
        let platform = Self::default();
        platform.host.mobile.set(true);
        platform
    }

    pub fn failing() -> Self {
        let platform = Self::default();
        platform.host.fail_open.set(true);
        platform
    }

    pub fn ops(&self) -> Vec<Op> {
        self.host.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.host.ops.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.host.ops.borrow().iter().filter(|op| pred(op)).count()
    }

    pub fn opens(&self) -> usize {
        self.count(|op| *op == Op::Open)
    }

    pub fn starts(&self) -> usize {
        self.count(|op| matches!(op, Op::Start { .. }))
    }

    pub fn sleeps(&self) -> Vec<u32> {
        self.host
            .ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Sleep(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    /// Most recently created oscillator
    pub fn last_oscillator(&self) -> Option<u32> {
        self.host.ops.borrow().iter().rev().find_map(|op| match op {
            Op::CreateOscillator(id, _) => Some(*id),
            _ => None,
        })
    }

    /// Frequencies scheduled on one oscillator, in order
    pub fn frequencies(&self, node: u32) -> Vec<f32> {
        self.host
            .ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::SetFrequency { node: n, hz, .. } if *n == node => Some(*hz),
                _ => None,
            })
            .collect()
    }

    /// Stop calls on one node, the scheduled end included
    pub fn stops(&self, node: u32) -> usize {
        self.count(|op| matches!(op, Op::Stop { node: n, .. } if *n == node))
    }

    /// Run a hook whenever something sleeps
    pub fn on_sleep(&self, hook: impl FnMut(u32) + 'static) {
        *self.host.on_sleep.borrow_mut() = Some(Box::new(hook));
    }

    /// Fire the natural-end notification of an oscillator
    pub fn finish(&self, node: u32) -> bool {
        let callback = self.host.ended.borrow_mut().remove(&node);
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.host.tasks.borrow().len()
    }

    /// Drive every spawned task to completion
    pub fn run_tasks(&self) {
        loop {
            let tasks: Vec<_> = self.host.tasks.borrow_mut().drain(..).collect();
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                pollster::block_on(task);
            }
        }
    }
}

pub struct MockDevice {
    host: Rc<MockHost>,
}

pub struct MockGain {
    id: u32,
    host: Rc<MockHost>,
}

pub struct MockOscillator {
    id: u32,
    host: Rc<MockHost>,
}

impl GainControl for MockGain {
    fn set_value_at(&self, value: f32, time: f64) {
        self.host.record(Op::SetGain {
            node: self.id,
            value,
            at: time,
        });
    }

    fn exponential_ramp_to(&self, value: f32, time: f64) {
        self.host.record(Op::RampGain {
            node: self.id,
            value,
            at: time,
        });
    }

    fn connect(&self, target: &Self) -> AudioResult<()> {
        self.host.record(Op::Connect {
            from: self.id,
            to: target.id,
        });
        Ok(())
    }
}

impl OscillatorControl for MockOscillator {
    type Gain = MockGain;

    fn set_frequency_at(&self, hz: f32, time: f64) {
        self.host.record(Op::SetFrequency {
            node: self.id,
            hz,
            at: time,
        });
    }

    fn exponential_ramp_frequency_to(&self, hz: f32, time: f64) {
        self.host.record(Op::RampFrequency {
            node: self.id,
            hz,
            at: time,
        });
    }

    fn connect(&self, gain: &Self::Gain) -> AudioResult<()> {
        self.host.record(Op::Connect {
            from: self.id,
            to: gain.id,
        });
        Ok(())
    }

    fn start_at(&self, time: f64) -> AudioResult<()> {
        let failures = self.host.fail_starts.get();
        if failures > 0 {
            self.host.fail_starts.set(failures - 1);
            return Err(AudioError::Scheduling("mock start failure".into()));
        }
        self.host.record(Op::Start {
            node: self.id,
            at: time,
        });
        Ok(())
    }

    fn stop_at(&self, time: f64) {
        self.host.record(Op::Stop {
            node: self.id,
            at: time,
        });
    }

    fn on_ended(&self, callback: Box<dyn FnOnce()>) {
        self.host.ended.borrow_mut().insert(self.id, callback);
    }
}

impl AudioDevice for MockDevice {
    type Gain = MockGain;
    type Oscillator = MockOscillator;

    fn current_time(&self) -> f64 {
        self.host.time.get()
    }

    fn is_suspended(&self) -> bool {
        let polls = self.host.suspended_polls.get();
        if polls > 0 {
            self.host.suspended_polls.set(polls - 1);
            true
        } else {
            false
        }
    }

    fn resume(&self) {
        self.host.record(Op::Resume);
    }

    fn close(&self) {
        self.host.record(Op::Close);
    }

    fn create_gain(&self) -> AudioResult<Self::Gain> {
        let id = self.host.node_id();
        self.host.record(Op::CreateGain(id));
        Ok(MockGain {
            id,
            host: Rc::clone(&self.host),
        })
    }

    fn create_oscillator(&self, waveform: Waveform) -> AudioResult<Self::Oscillator> {
        let id = self.host.node_id();
        self.host.record(Op::CreateOscillator(id, waveform));
        Ok(MockOscillator {
            id,
            host: Rc::clone(&self.host),
        })
    }

    fn connect_to_output(&self, gain: &Self::Gain) -> AudioResult<()> {
        self.host.record(Op::ConnectOutput(gain.id));
        Ok(())
    }
}

impl AudioPlatform for MockPlatform {
    type Device = MockDevice;

    fn open(&self) -> AudioResult<Self::Device> {
        self.host.record(Op::Open);
        if self.host.fail_open.get() {
            return Err(AudioError::Unavailable("mock open failure".into()));
        }
        Ok(MockDevice {
            host: Rc::clone(&self.host),
        })
    }

    fn is_mobile(&self) -> bool {
        self.host.mobile.get()
    }

    fn sleep(&self, ms: u32) -> LocalBoxFuture<()> {
        self.host.record(Op::Sleep(ms));
        let hook = self.host.on_sleep.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook(ms);
            let mut slot = self.host.on_sleep.borrow_mut();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
        Box::pin(std::future::ready(()))
    }

    fn spawn(&self, task: LocalBoxFuture<()>) {
        self.host.tasks.borrow_mut().push(task);
    }
}
