#![warn(unused_qualifications)]

//! The seam to the external electromagnetic field solver.
//!
//! The vendor application does all the heavy lifting (meshing, field
//! solution, S-parameter extraction, far-field computation); this crate
//! only assembles typed automation calls against it. The surface is a pair
//! of traits ([`Engine`], [`EngineSession`]) so the workflow and the UI
//! stay independent of the concrete backend, plus an analytical
//! [emulated backend](emulator) so the workbench runs end to end without
//! the vendor application installed.

pub mod engine;
#[cfg(feature = "emulator")]
pub mod emulator;
pub mod runner;
pub mod settings;
pub mod workflow;

pub use crate::{
    engine::{
        AdaptivePass,
        DesignInfo,
        Engine,
        EngineError,
        EngineSession,
        FarFieldTable,
        ObjectRef,
        PortRef,
        SetupRef,
        SolutionType,
        SweepRef,
        SweepTrace,
    },
    runner::{
        RunPhase,
        SimulationRun,
    },
    settings::EngineSettings,
    workflow::{
        AntennaKind,
        RadiationPattern,
        Session,
        SimulationRequest,
        SimulationResults,
        WorkflowError,
    },
};
