//! One V8 isolate on its own thread.
//!
//! V8 isolates are `!Send`, so the runtime is created, driven and dropped on
//! a dedicated OS thread with its own current-thread tokio runtime. The async
//! side only holds an [`IsolatedUnit`]: a receiver for the posted message and
//! the termination control.

use super::harness::{HarnessProgram, PostedMessage, PROGRAM_NAME};
use crate::error::ExecutionFault;
use deno_core::{op2, v8, JsRuntime, OpState, RuntimeOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Raw text posted by the harness, first message wins
struct PostedPayload(String);

#[op2(fast)]
fn op_harness_post(state: &mut OpState, #[string] payload: &str) {
    if !state.has::<PostedPayload>() {
        state.put(PostedPayload(payload.to_string()));
    }
}

deno_core::extension!(verdict_harness, ops = [op_harness_post]);

enum UnitState {
    Starting,
    Running(v8::IsolateHandle),
    Finished,
    Terminated,
}

/// Termination control shared between the async caller and the isolate thread.
///
/// The isolate handle is only reachable while the thread reports it running;
/// the thread detaches it before the runtime is dropped.
pub struct UnitControl {
    state: Mutex<UnitState>,
}

impl UnitControl {
    fn new() -> Self {
        Self {
            state: Mutex::new(UnitState::Starting),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish the isolate handle. Returns false when termination already happened.
    fn attach(&self, handle: v8::IsolateHandle) -> bool {
        let mut state = self.lock();
        match *state {
            UnitState::Starting => {
                *state = UnitState::Running(handle);
                true
            }
            _ => false,
        }
    }

    fn detach(&self) {
        let mut state = self.lock();
        if matches!(*state, UnitState::Running(_)) {
            *state = UnitState::Finished;
        }
    }

    /// Stop the isolate if it is still starting or running. Idempotent.
    pub fn terminate(&self) -> bool {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, UnitState::Terminated) {
            UnitState::Running(handle) => {
                handle.terminate_execution();
                true
            }
            UnitState::Starting => true,
            previous @ (UnitState::Finished | UnitState::Terminated) => {
                *state = previous;
                false
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(*self.lock(), UnitState::Terminated)
    }
}

/// Handle to a launched isolate run. Dropping it terminates the isolate.
pub struct IsolatedUnit {
    control: Arc<UnitControl>,
    receiver: oneshot::Receiver<Result<PostedMessage, ExecutionFault>>,
}

impl IsolatedUnit {
    /// Start `program` on a fresh isolate thread
    pub fn launch(program: HarnessProgram, heap_limit_bytes: usize) -> Result<Self, ExecutionFault> {
        let control = Arc::new(UnitControl::new());
        let (tx, rx) = oneshot::channel();

        let thread_control = control.clone();
        std::thread::Builder::new()
            .name("verdict-isolate".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let fault = ExecutionFault::boundary(format!("Failed to start isolate runtime: {}", e));
                        if tx.send(Err(fault)).is_err() {
                            warn!("isolate result receiver dropped");
                        }
                        return;
                    }
                };
                let _enter = rt.enter();
                let result = run_program(program, &thread_control, heap_limit_bytes);
                if tx.send(result).is_err() {
                    debug!("isolate result receiver dropped before result was sent");
                }
            })
            .map_err(|e| ExecutionFault::boundary(format!("Failed to spawn isolate thread: {}", e)))?;

        Ok(Self {
            control,
            receiver: rx,
        })
    }

    /// Wait for the message posted through the isolation boundary
    pub async fn outcome(&mut self) -> Result<PostedMessage, ExecutionFault> {
        (&mut self.receiver)
            .await
            .map_err(|_| ExecutionFault::boundary("Isolate thread exited without reporting"))?
    }
}

impl Drop for IsolatedUnit {
    fn drop(&mut self) {
        if self.control.terminate() {
            debug!("Terminated isolate on drop");
        }
    }
}

struct HeapLimitState {
    handle: v8::IsolateHandle,
    triggered: AtomicBool,
}

/// Terminate execution near the heap limit and grant 1MB grace so the
/// termination can propagate instead of aborting the process.
extern "C" fn near_heap_limit_callback(
    data: *mut std::ffi::c_void,
    current_heap_limit: usize,
    _initial_heap_limit: usize,
) -> usize {
    // SAFETY: `data` points at the boxed `HeapLimitState` in `run_program`,
    // which removes this callback before the box is dropped.
    let state = unsafe { &*(data as *const HeapLimitState) };
    if !state.triggered.swap(true, Ordering::SeqCst) {
        state.handle.terminate_execution();
    }
    current_heap_limit + 1024 * 1024
}

/// Create, run and tear down the isolate. Runs on the isolate thread.
fn run_program(
    program: HarnessProgram,
    control: &UnitControl,
    heap_limit_bytes: usize,
) -> Result<PostedMessage, ExecutionFault> {
    let create_params = v8::CreateParams::default().heap_limits(0, heap_limit_bytes);
    let mut runtime = JsRuntime::new(RuntimeOptions {
        extensions: vec![verdict_harness::init()],
        create_params: Some(create_params),
        ..Default::default()
    });

    let heap_state = Box::new(HeapLimitState {
        handle: runtime.v8_isolate().thread_safe_handle(),
        triggered: AtomicBool::new(false),
    });
    runtime.v8_isolate().add_near_heap_limit_callback(
        near_heap_limit_callback,
        &*heap_state as *const HeapLimitState as *mut std::ffi::c_void,
    );

    if !control.attach(runtime.v8_isolate().thread_safe_handle()) {
        runtime
            .v8_isolate()
            .remove_near_heap_limit_callback(near_heap_limit_callback, 0);
        return Err(ExecutionFault::boundary("Isolate terminated before start"));
    }

    let executed = runtime
        .execute_script(PROGRAM_NAME, program.into_source())
        .map(|_| ())
        .map_err(|e| e.to_string());

    control.detach();
    runtime
        .v8_isolate()
        .remove_near_heap_limit_callback(near_heap_limit_callback, 0);

    if heap_state.triggered.load(Ordering::SeqCst) {
        return Err(ExecutionFault::harness("Memory limit exceeded"));
    }
    if control.is_terminated() {
        return Err(ExecutionFault::boundary("Isolate terminated"));
    }
    if let Err(message) = executed {
        return Err(ExecutionFault::harness(message));
    }

    let payload = {
        let state = runtime.op_state();
        let mut state = state.borrow_mut();
        state.try_take::<PostedPayload>()
    };

    match payload {
        Some(PostedPayload(text)) => PostedMessage::parse(&text),
        None => Err(ExecutionFault::boundary("No result posted by the harness")),
    }
}
