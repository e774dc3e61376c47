//! Statement execution.
//!
//! An [`Interpreter`] walks parsed statement trees against a
//! [`ContextStack`], dispatching built-in commands and procedure calls.
//! Instances are cheap; [`Interpreter::clone_runtime`] produces an
//! independent runtime sharing the immutable procedure bodies, one per
//! concurrent request.
//!
//! Procedure calls apply per-moveto dispatch: when the current path holds
//! only moveto points, the block runs once per point with the origin
//! translated and rotated there; otherwise it runs once.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use core_context::ContextStack;
use core_device::{DatasetFactory, DeviceFactory};
use core_lang::expression::Expression;
use core_lang::{Block, Statement, StatementKind, VariableResolver};
use core_value::error::{MapyrusError, Result};
use core_value::numeric::doubles_equal;
use core_value::Value;
use tracing::{debug, trace};

mod commands;
mod legend_render;
mod shapes;

/// Wall-clock budget and cooperative cancellation, polled at every
/// statement dispatch.
pub struct Throttle {
    start: Instant,
    budget: Option<Duration>,
    cancelled: Arc<AtomicBool>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new()
    }
}

impl Throttle {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            budget: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget: Some(budget),
            ..Self::new()
        }
    }

    /// Flag handed to whoever may cancel this interpretation.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(MapyrusError::Interrupted);
        }
        if let Some(budget) = self.budget
            && self.start.elapsed() > budget
        {
            self.cancelled.store(true, Ordering::Relaxed);
            return Err(MapyrusError::Interrupted);
        }
        Ok(())
    }
}

/// A frame of the procedure call stack, recorded so the `key` command can
/// capture the calling block and its arguments.
struct CallFrame {
    block_name: String,
    args: Vec<Value>,
}

enum Flow {
    Normal,
    Returned,
}

pub struct Interpreter {
    blocks: HashMap<String, Arc<Block>>,
    device_factory: Rc<dyn DeviceFactory>,
    dataset_factory: Rc<dyn DatasetFactory>,
    stdout: Box<dyn Write>,
    throttle: Throttle,
    call_stack: Vec<CallFrame>,
    mime_type: String,
}

impl Interpreter {
    pub fn new(
        device_factory: Rc<dyn DeviceFactory>,
        dataset_factory: Rc<dyn DatasetFactory>,
        stdout: Box<dyn Write>,
    ) -> Self {
        Self {
            blocks: HashMap::new(),
            device_factory,
            dataset_factory,
            stdout,
            throttle: Throttle::new(),
            call_stack: Vec::new(),
            mime_type: "text/html".to_string(),
        }
    }

    /// Independent runtime sharing the immutable block registry.
    pub fn clone_runtime(&self, stdout: Box<dyn Write>) -> Self {
        Self {
            blocks: self.blocks.clone(),
            device_factory: Rc::clone(&self.device_factory),
            dataset_factory: Rc::clone(&self.dataset_factory),
            stdout,
            throttle: Throttle::new(),
            call_stack: Vec::new(),
            mime_type: "text/html".to_string(),
        }
    }

    pub fn set_throttle(&mut self, throttle: Throttle) {
        self.throttle = throttle;
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Response MIME type set by the `mimetype` command.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Run a statement sequence to completion. A top-level `return` ends
    /// the interpretation normally.
    pub fn execute(&mut self, statements: &[Statement], ctx: &mut ContextStack) -> Result<()> {
        match self.execute_body(statements, ctx)? {
            Flow::Normal | Flow::Returned => Ok(()),
        }
    }

    fn execute_body(&mut self, statements: &[Statement], ctx: &mut ContextStack) -> Result<Flow> {
        for statement in statements {
            if let Flow::Returned = self.execute_statement(statement, ctx)? {
                return Ok(Flow::Returned);
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_statement(&mut self, st: &Statement, ctx: &mut ContextStack) -> Result<Flow> {
        self.throttle.check()?;
        self.execute_kind(&st.kind, ctx)
            .map_err(|e| e.at(&st.file, st.line))
    }

    fn execute_kind(&mut self, kind: &StatementKind, ctx: &mut ContextStack) -> Result<Flow> {
        match kind {
            StatementKind::Command(command, args) => {
                let values = eval_args(args, ctx)?;
                commands::dispatch(self, *command, values, ctx)?;
                Ok(Flow::Normal)
            }
            StatementKind::Assign { name, index, value } => {
                let value = value.evaluate(ctx)?;
                match index {
                    Some(key_expr) => {
                        let key = key_expr.evaluate(ctx)?.as_string()?;
                        ctx.define_map_element(name, &key, value)?;
                    }
                    None => ctx.define_variable(name, value),
                }
                Ok(Flow::Normal)
            }
            StatementKind::LocalDecl(names) => {
                for name in names {
                    ctx.set_local_scope(name);
                }
                Ok(Flow::Normal)
            }
            StatementKind::If {
                cond,
                then_block,
                else_block,
            } => {
                if cond.evaluate(ctx)?.is_true()? {
                    self.execute_body(then_block, ctx)
                } else {
                    self.execute_body(else_block, ctx)
                }
            }
            StatementKind::While { cond, body } => {
                while cond.evaluate(ctx)?.is_true()? {
                    if let Flow::Returned = self.execute_body(body, ctx)? {
                        return Ok(Flow::Returned);
                    }
                    self.throttle.check()?;
                }
                Ok(Flow::Normal)
            }
            StatementKind::Repeat { count, body } => {
                let raw = count.evaluate(ctx)?.as_number()?;
                // Round when within the double tolerance of an integer,
                // truncate otherwise; negative counts run nothing.
                let rounded = raw.round();
                let iterations = if doubles_equal(raw, rounded) {
                    rounded
                } else {
                    raw.floor()
                }
                .max(0.0) as u64;
                for _ in 0..iterations {
                    if let Flow::Returned = self.execute_body(body, ctx)? {
                        return Ok(Flow::Returned);
                    }
                    self.throttle.check()?;
                }
                Ok(Flow::Normal)
            }
            StatementKind::For { var, map, body } => {
                let value = map.evaluate(ctx)?;
                let Value::Map(map) = value else {
                    return Err(MapyrusError::WrongTypes);
                };
                // Snapshot of the insertion-order keys: mutations inside
                // the body do not affect the iteration.
                let keys = map.keys_in_insertion_order();
                for key in keys {
                    ctx.define_variable(var, Value::Str(key));
                    if let Flow::Returned = self.execute_body(body, ctx)? {
                        return Ok(Flow::Returned);
                    }
                    self.throttle.check()?;
                }
                Ok(Flow::Normal)
            }
            StatementKind::BlockDef(block) => {
                // Last definition wins.
                debug!(target: "interp", block = block.name.as_str(), "block_defined");
                self.blocks.insert(block.name.clone(), Arc::clone(block));
                Ok(Flow::Normal)
            }
            StatementKind::Call { name, args } => {
                let values = eval_args(args, ctx)?;
                self.call_block(name, values, ctx)?;
                Ok(Flow::Normal)
            }
            StatementKind::Return => Ok(Flow::Returned),
        }
    }

    /// Invoke a procedure block, applying per-moveto dispatch.
    pub(crate) fn call_block(
        &mut self,
        name: &str,
        args: Vec<Value>,
        ctx: &mut ContextStack,
    ) -> Result<()> {
        let block = self
            .blocks
            .get(name)
            .cloned()
            .ok_or_else(|| MapyrusError::UndefinedProc(name.to_string()))?;
        if args.len() != block.params.len() {
            return Err(MapyrusError::WrongParameters(format!(
                "procedure {} expects {} arguments, got {}",
                block.name,
                block.params.len(),
                args.len()
            )));
        }
        let dispatch_points = {
            let top = ctx.top();
            match top.current_path() {
                Some(path) if path.move_to_count() > 0 && path.line_to_count() == 0 => {
                    let points = path.move_tos();
                    let rotations = path.move_to_rotations();
                    points
                        .into_iter()
                        .zip(rotations)
                        .collect::<Vec<((f64, f64), f64)>>()
                }
                _ => Vec::new(),
            }
        };
        if dispatch_points.is_empty() {
            self.invoke(&block, &args, ctx, None)
        } else {
            trace!(
                target: "interp",
                block = block.name.as_str(),
                points = dispatch_points.len(),
                "per_moveto_dispatch"
            );
            for ((px, py), rotation) in dispatch_points {
                self.invoke(&block, &args, ctx, Some((px, py, rotation)))?;
            }
            Ok(())
        }
    }

    fn invoke(
        &mut self,
        block: &Arc<Block>,
        args: &[Value],
        ctx: &mut ContextStack,
        at: Option<(f64, f64, f64)>,
    ) -> Result<()> {
        ctx.push()?;
        if let Some((px, py, rotation)) = at {
            let top = ctx.top_mut();
            top.set_dispatch_transform(px, py, rotation);
            top.clear_path();
            top.move_to(0.0, 0.0);
        }
        for (param, value) in block.params.iter().zip(args) {
            ctx.set_local_scope(param);
            ctx.define_variable(param, value.clone());
        }
        self.call_stack.push(CallFrame {
            block_name: block.name.clone(),
            args: args.to_vec(),
        });
        let result = self.execute_body(&block.body, ctx);
        self.call_stack.pop();
        let popped = ctx.pop();
        result?;
        popped
    }

    pub(crate) fn current_call(&self) -> Option<(&str, &[Value])> {
        self.call_stack
            .last()
            .map(|f| (f.block_name.as_str(), f.args.as_slice()))
    }

    pub(crate) fn write_stdout(&mut self, text: &str) -> Result<()> {
        self.stdout
            .write_all(text.as_bytes())
            .map_err(|e| MapyrusError::Io(e.to_string()))
    }

    pub(crate) fn set_mime_type(&mut self, mime: String) {
        self.mime_type = mime;
    }

    pub(crate) fn device_factory(&self) -> Rc<dyn DeviceFactory> {
        Rc::clone(&self.device_factory)
    }

    pub(crate) fn dataset_factory(&self) -> Rc<dyn DatasetFactory> {
        Rc::clone(&self.dataset_factory)
    }
}

fn eval_args(args: &[Expression], ctx: &ContextStack) -> Result<Vec<Value>> {
    args.iter()
        .map(|a| a.evaluate(ctx as &dyn VariableResolver))
        .collect()
}
