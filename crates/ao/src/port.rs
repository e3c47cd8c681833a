//! Thread provider boundary.
//!
//! The runtime never creates threads itself; it hands a [`TaskSpec`] and
//! the event-loop body to a [`TaskSpawner`]. Priority and core affinity are
//! carried through untouched so a platform port can apply them.

use std::io;
use std::thread::{self, JoinHandle};

/// Default stack budget for an active object thread, in bytes.
pub const DEFAULT_STACK_SIZE: usize = 4096;

/// Scheduling priority. Zero is reserved for the idle task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u8);

impl Priority {
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

/// Processing core a thread should be pinned to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CoreAffinity {
    #[default]
    Any,
    Core(usize),
}

/// Everything a platform needs to create one thread of control.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: &'static str,
    pub stack_size: usize,
    pub priority: Priority,
    pub affinity: CoreAffinity,
}

pub type TaskBody = Box<dyn FnOnce() + Send + 'static>;

pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, spec: &TaskSpec, body: TaskBody) -> io::Result<JoinHandle<()>>;
}

/// Spawner backed by `std::thread::Builder`.
///
/// Hosted targets have no portable priority or pinning API, so both are
/// recorded in the log and otherwise ignored. The stack budget is raised to
/// the platform minimum when it is smaller.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdSpawner;

/// Smallest stack handed to the host OS; embedded budgets are far below it.
const HOST_MIN_STACK: usize = 64 * 1024;

impl TaskSpawner for StdSpawner {
    fn spawn(&self, spec: &TaskSpec, body: TaskBody) -> io::Result<JoinHandle<()>> {
        log::debug!(
            "spawning `{}` (stack {} B, priority {}, affinity {:?})",
            spec.name,
            spec.stack_size,
            spec.priority.0,
            spec.affinity
        );
        thread::Builder::new()
            .name(spec.name.to_string())
            .stack_size(spec.stack_size.max(HOST_MIN_STACK))
            .spawn(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn std_spawner_names_thread() {
        let spec = TaskSpec {
            name: "probe",
            stack_size: DEFAULT_STACK_SIZE,
            priority: Priority(3),
            affinity: CoreAffinity::Core(1),
        };
        let (tx, rx) = mpsc::channel();
        let handle = StdSpawner
            .spawn(
                &spec,
                Box::new(move || {
                    let name = thread::current().name().map(str::to_owned);
                    tx.send(name).unwrap();
                }),
            )
            .unwrap();
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("probe"));
    }

    #[test]
    fn zero_priority_is_invalid() {
        assert!(!Priority(0).is_valid());
        assert!(Priority(1).is_valid());
    }
}
