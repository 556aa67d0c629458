use crate::config::ExecConfig;
use crate::runtime::{
    builtins::Builtin,
    bytecode::{Chunk, Instruction},
    environment::{EnvId, Heap},
    error::{RuntimeError, RuntimeResult},
    value::{binary, compare, Closure, Value},
};
use std::io::Write;
use std::rc::Rc;

struct Frame {
    code: Rc<Chunk>,
    ip: usize,
    env: EnvId,
    /// Operand stack height when the frame was entered.
    base: usize,
    name: String,
}

/// Executes lowered chunks. User calls push a [`Frame`] onto a heap-allocated
/// frame stack, so the depth of recursion in a program never grows the host
/// call stack. Environments live in a [`Heap`] owned by the machine.
pub struct Machine<'o> {
    heap: Heap,
    globals: EnvId,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    max_depth: Option<usize>,
    out: &'o mut dyn Write,
}

impl<'o> Machine<'o> {
    pub fn new(config: &ExecConfig, out: &'o mut dyn Write) -> Self {
        let mut heap = Heap::default();
        let globals = heap.alloc(None);
        for builtin in Builtin::ALL {
            heap.declare(globals, builtin.name(), Value::Builtin(builtin));
        }
        Self {
            heap,
            globals,
            stack: Vec::new(),
            frames: Vec::new(),
            max_depth: config.max_depth,
            out,
        }
    }

    /// Runs `chunk` in the global environment and returns the value of its
    /// last statement.
    pub fn run(&mut self, chunk: Rc<Chunk>) -> RuntimeResult<Value> {
        self.stack.clear();
        self.frames.clear();
        self.frames.push(Frame {
            code: chunk,
            ip: 0,
            env: self.globals,
            base: 0,
            name: "<main>".to_string(),
        });

        loop {
            let (code, ip, env) = {
                let frame = self.frames.last_mut().ok_or(RuntimeError::StackUnderflow)?;
                let ip = frame.ip;
                frame.ip += 1;
                (Rc::clone(&frame.code), ip, frame.env)
            };
            let Some(instruction) = code.instructions.get(ip) else {
                self.stack.push(Value::Unit);
                if let Some(value) = self.return_from_frame()? {
                    return Ok(value);
                }
                continue;
            };

            match instruction {
                Instruction::Const(value) => self.stack.push(value.clone()),
                Instruction::Load(name) => {
                    let value = self
                        .heap
                        .get(env, name)
                        .ok_or_else(|| RuntimeError::UnboundName { name: name.clone() })?;
                    self.stack.push(value);
                }
                Instruction::Store(name) => {
                    let value = self.stack.last().cloned().ok_or(RuntimeError::StackUnderflow)?;
                    self.heap.declare(env, name, value);
                }
                Instruction::BuildList(len) => {
                    let items = self.pop_many(*len)?;
                    self.stack.push(Value::list(items));
                }
                Instruction::Binary(op) => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.stack.push(binary(*op, &lhs, &rhs)?);
                }
                Instruction::Compare(op) => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.stack.push(compare(*op, &lhs, &rhs)?);
                }
                Instruction::Call { callee, argc } => {
                    let args = self.pop_many(*argc)?;
                    let target = self.heap.get(env, callee).ok_or_else(|| {
                        RuntimeError::UnboundName {
                            name: callee.clone(),
                        }
                    })?;
                    self.call(callee, target, args)?;
                }
                Instruction::Closure(proto) => {
                    self.stack.push(Value::Function(Rc::new(Closure {
                        proto: Rc::clone(proto),
                        env,
                    })));
                }
                Instruction::JumpIfFalse(target) => {
                    if !self.pop()?.as_bool() {
                        self.jump(*target)?;
                    }
                }
                Instruction::Jump(target) => self.jump(*target)?,
                Instruction::Pop => {
                    self.pop()?;
                }
                Instruction::Return => {
                    if let Some(value) = self.return_from_frame()? {
                        return Ok(value);
                    }
                }
            }
        }
    }

    fn call(&mut self, callee: &str, target: Value, args: Vec<Value>) -> RuntimeResult<()> {
        match target {
            Value::Builtin(builtin) => {
                let result = builtin.call(args, &mut *self.out)?;
                self.stack.push(result);
                Ok(())
            }
            Value::Function(closure) => {
                let proto = &closure.proto;
                if proto.params.len() != args.len() {
                    return Err(RuntimeError::ArityMismatch {
                        name: proto.name.clone(),
                        expected: proto.params.len().to_string(),
                        received: args.len(),
                    });
                }
                let active = self.frames.len().saturating_sub(1);
                if let Some(limit) = self.max_depth {
                    if active >= limit {
                        return Err(RuntimeError::RecursionLimit {
                            name: proto.name.clone(),
                            limit,
                        });
                    }
                }
                let env = self.heap.alloc(Some(closure.env));
                for (param, arg) in proto.params.iter().zip(args) {
                    self.heap.declare(env, param, arg);
                }
                log::trace!("call {} at depth {}", proto.name, active + 1);
                self.frames.push(Frame {
                    code: Rc::clone(&proto.chunk),
                    ip: 0,
                    env,
                    base: self.stack.len(),
                    name: proto.name.clone(),
                });
                Ok(())
            }
            other => Err(RuntimeError::NotCallable {
                name: callee.to_string(),
                type_name: other.type_name(),
            }),
        }
    }

    /// Pops the finished frame. Returns the program result once the outermost
    /// frame has returned.
    fn return_from_frame(&mut self) -> RuntimeResult<Option<Value>> {
        let value = self.pop()?;
        let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.stack.truncate(frame.base);
        if self.frames.is_empty() {
            self.heap.collect([self.globals], [&value]);
            return Ok(Some(value));
        }
        log::trace!("return from {}", frame.name);
        self.stack.push(value);
        if self.heap.should_collect() {
            self.collect_garbage();
        }
        Ok(None)
    }

    /// Frees environments that no frame, stack value or global can reach.
    fn collect_garbage(&mut self) {
        let roots = std::iter::once(self.globals)
            .chain(self.frames.iter().map(|frame| frame.env));
        self.heap.collect(roots, self.stack.iter());
    }

    /// Environment levels still allocated, globals included.
    pub fn live_envs(&self) -> usize {
        self.heap.live()
    }

    fn jump(&mut self, target: usize) -> RuntimeResult<()> {
        let frame = self.frames.last_mut().ok_or(RuntimeError::StackUnderflow)?;
        frame.ip = target;
        Ok(())
    }

    fn pop(&mut self) -> RuntimeResult<Value> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn pop_many(&mut self, count: usize) -> RuntimeResult<Vec<Value>> {
        let at = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.stack.split_off(at))
    }
}
