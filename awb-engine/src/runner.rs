//! Runs a simulation on a background thread.
//!
//! The automation calls block for the whole solve, which can take minutes
//! against a real backend. [`SimulationRun`] moves the session onto its own
//! thread and publishes the current phase through a shared mutex so a UI
//! can poll it every frame without stalling.

use std::{
    sync::Arc,
    thread::JoinHandle,
};

use parking_lot::Mutex;

use crate::{
    engine::{
        AdaptivePass,
        EngineSession,
    },
    workflow::{
        Session,
        SimulationRequest,
        SimulationResults,
        WorkflowError,
    },
};

/// Where a background simulation currently is.
///
/// Preparing covers everything before the first adaptive pass (geometry,
/// boundaries, port, setup, sweep); after the last pass the phase stays at
/// [`Solving`](Self::Solving) while results are fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum RunPhase {
    #[default]
    Preparing,
    Solving(AdaptivePass),
    Done,
}

#[derive(Debug, Default)]
struct Shared {
    phase: Mutex<RunPhase>,
}

/// A simulation in flight. Dropping it detaches the thread; the session is
/// handed back through [`join`](Self::join).
#[derive(Debug)]
pub struct SimulationRun<S> {
    shared: Arc<Shared>,
    join_handle: Option<JoinHandle<(Session<S>, Result<SimulationResults, WorkflowError>)>>,
}

impl<S> SimulationRun<S>
where
    S: EngineSession + Send + 'static,
{
    pub fn spawn(mut session: Session<S>, request: SimulationRequest) -> Self {
        let shared = Arc::new(Shared::default());

        let join_handle = spawn_thread("simulation", {
            let shared = shared.clone();

            move || {
                let result = session.run_simulation(&request, &mut |pass| {
                    *shared.phase.lock() = RunPhase::Solving(pass);
                });

                *shared.phase.lock() = RunPhase::Done;
                (session, result)
            }
        });

        Self {
            shared,
            join_handle: Some(join_handle),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.shared.phase.lock()
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(|join_handle| join_handle.is_finished())
    }

    /// Waits for the thread and hands the session back together with the
    /// outcome. `None` if the thread panicked or was already joined.
    pub fn join(&mut self) -> Option<(Session<S>, Result<SimulationResults, WorkflowError>)> {
        let join_handle = self.join_handle.take()?;
        match join_handle.join() {
            Ok(output) => Some(output),
            Err(_) => {
                tracing::error!("simulation thread panicked");
                None
            }
        }
    }
}

pub fn spawn_thread<F, R>(name: impl ToString, f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .expect("std::thread::spawn failed")
}

#[cfg(test)]
#[cfg(feature = "emulator")]
mod tests {
    use std::time::Duration;

    use super::{
        RunPhase,
        SimulationRun,
    };
    use crate::{
        emulator::EmulatedEngine,
        engine::{
            DesignInfo,
            Engine,
            SolutionType,
        },
        settings::EngineSettings,
        workflow::{
            AntennaKind,
            Session,
            SimulationRequest,
        },
    };

    fn open_session() -> Session<<EmulatedEngine as Engine>::Session> {
        let engine = EmulatedEngine {
            pass_duration: Duration::ZERO,
        };
        Session::connect(
            &engine,
            &EngineSettings::default(),
            DesignInfo {
                project_name: "Runner".to_owned(),
                design_name: "Runner".to_owned(),
                solution_type: SolutionType::Terminal,
            },
        )
        .unwrap()
    }

    #[test]
    fn it_hands_the_session_back_with_results() {
        let session = open_session();
        let mut run = SimulationRun::spawn(
            session,
            SimulationRequest::new(AntennaKind::Dipole, 1.0),
        );

        let (session, result) = run.join().unwrap();
        assert_eq!(run.phase(), RunPhase::Done);
        assert!(!result.unwrap().trace.is_empty());

        session.release(None).unwrap();
    }

    #[test]
    fn it_joins_only_once() {
        let mut run = SimulationRun::spawn(
            open_session(),
            SimulationRequest::new(AntennaKind::Dipole, 1.0),
        );
        assert!(run.join().is_some());
        assert!(run.join().is_none());
        assert!(run.is_finished());
    }
}
