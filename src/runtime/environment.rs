use crate::runtime::value::Value;
use std::collections::HashMap;

const MIN_COLLECT_THRESHOLD: usize = 1024;

/// Handle to one level of runtime bindings in a [`Heap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvId(usize);

struct Level {
    bindings: HashMap<String, Value>,
    parent: Option<EnvId>,
}

/// Owns every environment level of a run. Function calls get a fresh level
/// whose parent is the level the function was defined in; closures refer to
/// levels by [`EnvId`], so a level that holds its own closure is not kept
/// alive by a reference count. Unreachable levels are reclaimed by
/// [`Heap::collect`].
pub struct Heap {
    slots: Vec<Option<Level>>,
    free: Vec<usize>,
    live: usize,
    threshold: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            threshold: MIN_COLLECT_THRESHOLD,
        }
    }
}

impl Heap {
    pub fn alloc(&mut self, parent: Option<EnvId>) -> EnvId {
        let level = Level {
            bindings: HashMap::new(),
            parent,
        };
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(level);
                EnvId(index)
            }
            None => {
                self.slots.push(Some(level));
                EnvId(self.slots.len() - 1)
            }
        }
    }

    /// Binds in this level, shadowing any outer binding of the same name.
    pub fn declare(&mut self, env: EnvId, name: &str, value: Value) {
        if let Some(Some(level)) = self.slots.get_mut(env.0) {
            level.bindings.insert(name.to_string(), value);
        }
    }

    pub fn get(&self, env: EnvId, name: &str) -> Option<Value> {
        let mut current = Some(env);
        while let Some(EnvId(index)) = current {
            let level = self.slots.get(index).and_then(Option::as_ref)?;
            if let Some(value) = level.bindings.get(name) {
                return Some(value.clone());
            }
            current = level.parent;
        }
        None
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn should_collect(&self) -> bool {
        self.live >= self.threshold
    }

    /// Frees every level not reachable from `roots` or from a closure inside
    /// `values`. Returns how many levels were freed.
    pub fn collect<'v>(
        &mut self,
        roots: impl IntoIterator<Item = EnvId>,
        values: impl IntoIterator<Item = &'v Value>,
    ) -> usize {
        let mut marked = vec![false; self.slots.len()];
        let mut pending: Vec<EnvId> = roots.into_iter().collect();
        for value in values {
            trace(value, &mut pending);
        }

        while let Some(EnvId(index)) = pending.pop() {
            match marked.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            let Some(level) = self.slots[index].as_ref() else {
                continue;
            };
            pending.extend(level.parent);
            for value in level.bindings.values() {
                trace(value, &mut pending);
            }
        }

        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !marked[index] {
                *slot = None;
                self.free.push(index);
                freed += 1;
            }
        }
        self.live -= freed;
        self.threshold = (self.live * 2).max(MIN_COLLECT_THRESHOLD);
        log::debug!("freed {freed} environment(s), {} live", self.live);
        freed
    }
}

/// Pushes the level of every closure reachable through `value`.
fn trace(value: &Value, pending: &mut Vec<EnvId>) {
    let mut values = vec![value];
    while let Some(value) = values.pop() {
        match value {
            Value::Function(closure) => pending.push(closure.env),
            Value::List(items) => values.extend(items.iter()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::bytecode::{Chunk, FunctionProto};
    use crate::runtime::value::Closure;
    use std::rc::Rc;

    fn closure_over(env: EnvId) -> Value {
        Value::Function(Rc::new(Closure {
            proto: Rc::new(FunctionProto {
                name: "inner".into(),
                params: vec!["y".into()],
                chunk: Rc::new(Chunk::default()),
            }),
            env,
        }))
    }

    #[test]
    fn lookups_walk_outwards() {
        let mut heap = Heap::default();
        let globals = heap.alloc(None);
        heap.declare(globals, "x", Value::Int(1));
        heap.declare(globals, "y", Value::Int(2));

        let local = heap.alloc(Some(globals));
        heap.declare(local, "x", Value::Int(10));

        assert_eq!(heap.get(local, "x"), Some(Value::Int(10)));
        assert_eq!(heap.get(local, "y"), Some(Value::Int(2)));
        assert_eq!(heap.get(globals, "x"), Some(Value::Int(1)));
        assert_eq!(heap.get(local, "z"), None);
    }

    #[test]
    fn self_referencing_levels_are_freed() {
        let mut heap = Heap::default();
        let globals = heap.alloc(None);
        let frame = heap.alloc(Some(globals));
        heap.declare(frame, "inner", closure_over(frame));

        assert_eq!(heap.collect([globals], Vec::<&Value>::new()), 1);
        assert_eq!(heap.live(), 1);
        assert_eq!(heap.get(frame, "inner"), None);
    }

    #[test]
    fn captured_levels_survive_collection() {
        let mut heap = Heap::default();
        let globals = heap.alloc(None);
        let outer = heap.alloc(Some(globals));
        heap.declare(outer, "x", Value::Int(10));
        let escaped = closure_over(outer);
        heap.declare(outer, "inner", escaped.clone());
        heap.declare(globals, "kept", Value::list(vec![escaped]));
        let dropped = heap.alloc(Some(globals));

        assert_eq!(heap.collect([globals], Vec::<&Value>::new()), 1);
        assert_eq!(heap.get(outer, "x"), Some(Value::Int(10)));

        let reused = heap.alloc(None);
        assert_eq!(reused, dropped);
        assert_eq!(heap.live(), 3);
    }

    #[test]
    fn values_on_the_stack_are_roots() {
        let mut heap = Heap::default();
        let globals = heap.alloc(None);
        let frame = heap.alloc(Some(globals));
        let result = closure_over(frame);

        assert_eq!(heap.collect([globals], [&result]), 0);
        assert_eq!(heap.live(), 2);
    }
}
