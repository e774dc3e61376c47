#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

//! Shared test harness: parse a script, run it against a recording
//! device, inspect the op log and captured stdout.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use core_context::ContextStack;
use core_device::recording::{DeviceOp, RecordingFactory, RecordingLog};
use core_device::{MemoryDatasetFactory, Row};
use core_interp::Interpreter;
use core_lang::{Preprocessor, parse_source};
use core_value::error::Result;

#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct Harness {
    pub interp: Interpreter,
    pub ctx: ContextStack,
    pub log: RecordingLog,
    pub stdout: SharedBuf,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_factories(RecordingFactory::new(), MemoryDatasetFactory::new())
    }

    pub fn with_restore_behaviour(restores_cleanly: bool) -> Self {
        Self::with_factories(
            RecordingFactory::with_restore_behaviour(restores_cleanly),
            MemoryDatasetFactory::new(),
        )
    }

    pub fn with_dataset(name: &str, fields: Vec<String>, rows: Vec<Row>) -> Self {
        let mut datasets = MemoryDatasetFactory::new();
        datasets.register(name, fields, rows);
        Self::with_factories(RecordingFactory::new(), datasets)
    }

    fn with_factories(devices: RecordingFactory, datasets: MemoryDatasetFactory) -> Self {
        let log = devices.log();
        let stdout = SharedBuf::default();
        let interp = Interpreter::new(
            Rc::new(devices),
            Rc::new(datasets),
            Box::new(stdout.clone()),
        );
        Self {
            interp,
            ctx: ContextStack::new(),
            log,
            stdout,
        }
    }

    pub fn run(&mut self, script: &str) -> Result<()> {
        let statements = parse_source(Preprocessor::from_string("test.myr", script))?;
        self.interp.execute(&statements, &mut self.ctx)
    }

    pub fn ops(&self) -> Vec<DeviceOp> {
        self.log.ops()
    }

    pub fn printed(&self) -> String {
        self.stdout.contents()
    }
}

/// Run a script, panicking on failure; convenience for the common case.
pub fn run_script(script: &str) -> Harness {
    let mut h = Harness::new();
    if let Err(e) = h.run(script) {
        panic!("script failed: {e}");
    }
    h
}
