use std::{
    mem,
    time::Duration,
};

use awb_design::{
    DipoleParameters,
    MicrostripParameters,
};
use awb_engine::{
    AntennaKind,
    DesignInfo,
    RunPhase,
    Session,
    SimulationRequest,
    SimulationResults,
    SimulationRun,
    emulator::{
        EmulatedEngine,
        EmulatedSession,
    },
};
use color_eyre::eyre::{
    Error,
    eyre,
};
use eframe::NativeOptions;
use egui::ViewportBuilder;
use strum::IntoEnumIterator;

use crate::{
    args::Args,
    config::AppConfig,
    error::{
        ErrorDialog,
        ResultExt,
    },
    files::AppFiles,
    views::{
        pattern::PatternView,
        s11,
    },
};

pub(super) fn run_app(args: Args) -> Result<(), Error> {
    let app_files = AppFiles::open()?;

    let config = if args.ignore_config {
        AppConfig::default()
    }
    else {
        app_files.read_config_or_create::<AppConfig>()?
    };

    eframe::run_native(
        "awb",
        NativeOptions {
            viewport: ViewportBuilder::default()
                .with_title("Antenna Workbench")
                .with_app_id("awb")
                .with_inner_size([1200.0, 800.0]),
            persistence_path: Some(app_files.egui_persist_path()),
            ..Default::default()
        },
        Box::new(move |_cc| Ok(Box::new(App::new(app_files, config, args)))),
    )
    // the glow backend's error type is not Send + Sync, so it can't ride
    // through `?` into an eyre report
    .map_err(|error| eyre!(error.to_string()))?;

    Ok(())
}

#[derive(Debug, Default)]
enum EngineState {
    #[default]
    Disconnected,
    Ready(Session<EmulatedSession>),
    Running(SimulationRun<EmulatedSession>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Action {
    Connect,
    Simulate,
    SaveProject,
    Disconnect,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ResultsTab {
    #[default]
    Reflection,
    Pattern,
}

#[derive(Clone, Copy, Debug)]
struct Controls {
    antenna: AntennaKind,
    frequency_ghz: f64,
    override_arm_length: bool,
    arm_length_mm: f64,
}

impl Controls {
    fn new(config: &AppConfig, args: &Args) -> Self {
        let frequency_ghz = args.frequency.unwrap_or(config.simulation.frequency_ghz);

        Self {
            antenna: args
                .antenna
                .map_or(config.simulation.antenna, Into::into),
            frequency_ghz,
            override_arm_length: false,
            arm_length_mm: DipoleParameters::default_arm_length_mm(frequency_ghz),
        }
    }

    fn request(&self) -> SimulationRequest {
        let mut request = SimulationRequest::new(self.antenna, self.frequency_ghz);
        if self.antenna == AntennaKind::Dipole && self.override_arm_length {
            request.arm_length_override_mm = Some(self.arm_length_mm);
        }
        request
    }
}

#[derive(Debug)]
pub struct App {
    app_files: AppFiles,
    config: AppConfig,
    error_dialog: ErrorDialog,

    engine: EmulatedEngine,
    state: EngineState,

    controls: Controls,
    results: Option<SimulationResults>,
    results_tab: ResultsTab,
    pattern_view: PatternView,
}

impl App {
    pub fn new(app_files: AppFiles, config: AppConfig, args: Args) -> Self {
        tracing::info!(?app_files);

        Self {
            controls: Controls::new(&config, &args),
            pattern_view: PatternView::new(&config.plot),
            app_files,
            config,
            error_dialog: ErrorDialog::default(),
            engine: EmulatedEngine::default(),
            state: EngineState::default(),
            results: None,
            results_tab: ResultsTab::default(),
        }
    }

    fn poll_running(&mut self) {
        let EngineState::Running(run) = &mut self.state else {
            return;
        };

        if !run.is_finished() {
            return;
        }

        let EngineState::Running(mut run) = mem::take(&mut self.state) else {
            unreachable!();
        };

        match run.join() {
            Some((session, result)) => {
                self.state = EngineState::Ready(session);
                match result {
                    Ok(results) => {
                        tracing::info!(
                            sweep_points = results.trace.len(),
                            "simulation finished"
                        );
                        self.results = Some(results);
                    }
                    Err(error) => self.error_dialog.set_error(error),
                }
            }
            None => {
                // the thread panicked and took the session with it
                self.error_dialog.set_error(eyre!("simulation thread panicked"));
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Connect => {
                let design = DesignInfo {
                    project_name: self.config.simulation.project_name.clone(),
                    design_name: self.config.simulation.design_name.clone(),
                    solution_type: self.config.simulation.solution_type,
                };

                if let Some(session) =
                    Session::connect(&self.engine, &self.config.engine, design)
                        .ok_or_show(&mut self.error_dialog)
                {
                    self.state = EngineState::Ready(session);
                }
            }
            Action::Simulate => {
                let EngineState::Ready(session) = mem::take(&mut self.state) else {
                    return;
                };

                self.results = None;
                self.state = EngineState::Running(SimulationRun::spawn(
                    session,
                    self.controls.request(),
                ));
            }
            Action::SaveProject => {
                if let EngineState::Ready(session) = &mut self.state {
                    let path = self
                        .app_files
                        .projects_dir()
                        .join(format!("{}.awb", self.config.simulation.project_name));

                    if session
                        .save_project(&path)
                        .ok_or_show(&mut self.error_dialog)
                        .is_some()
                    {
                        tracing::info!(path = %path.display(), "project saved");
                    }
                }
            }
            Action::Disconnect => {
                if let EngineState::Ready(session) = mem::take(&mut self.state) {
                    let _ = session.release(None).ok_or_show(&mut self.error_dialog);
                }
            }
        }
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui) -> Option<Action> {
        let mut action = None;

        ui.heading("Antenna");
        ui.add_space(4.0);

        let controls = &mut self.controls;
        let busy = matches!(self.state, EngineState::Running(_));

        ui.add_enabled_ui(!busy, |ui| {
            egui::ComboBox::from_label("type")
                .selected_text(controls.antenna.to_string())
                .show_ui(ui, |ui| {
                    for kind in AntennaKind::iter() {
                        ui.selectable_value(&mut controls.antenna, kind, kind.to_string());
                    }
                });

            ui.horizontal(|ui| {
                ui.add(
                    egui::DragValue::new(&mut controls.frequency_ghz)
                        .speed(0.01)
                        .range(0.001..=1000.0)
                        .suffix(" GHz"),
                );
                ui.label("frequency");
            });

            if controls.antenna == AntennaKind::Dipole {
                ui.checkbox(&mut controls.override_arm_length, "override arm length");

                if !controls.override_arm_length {
                    controls.arm_length_mm =
                        DipoleParameters::default_arm_length_mm(controls.frequency_ghz);
                }

                ui.add_enabled(
                    controls.override_arm_length,
                    egui::DragValue::new(&mut controls.arm_length_mm)
                        .speed(0.1)
                        .range(0.01..=100_000.0)
                        .suffix(" mm"),
                );
            }
        });

        ui.add_space(8.0);
        ui.collapsing("Derived dimensions", |ui| {
            derived_dimensions_ui(ui, controls.antenna, controls.frequency_ghz);
        });

        ui.separator();

        match &self.state {
            EngineState::Disconnected => {
                if ui.button("Connect").clicked() {
                    action = Some(Action::Connect);
                }
            }
            EngineState::Ready(_) => {
                if ui.button("Simulate").clicked() {
                    action = Some(Action::Simulate);
                }
                if ui.button("Save project").clicked() {
                    action = Some(Action::SaveProject);
                }
                if ui.button("Disconnect").clicked() {
                    action = Some(Action::Disconnect);
                }
            }
            EngineState::Running(run) => {
                match run.phase() {
                    RunPhase::Preparing => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("building model");
                        });
                    }
                    RunPhase::Solving(pass) => {
                        let text = match pass.delta_s {
                            Some(delta_s) => {
                                format!(
                                    "pass {}/{}, ΔS {:.4}",
                                    pass.pass, pass.max_passes, delta_s
                                )
                            }
                            None => format!("pass {}/{}", pass.pass, pass.max_passes),
                        };
                        ui.add(
                            egui::ProgressBar::new(
                                pass.pass as f32 / pass.max_passes as f32,
                            )
                            .text(text),
                        );
                    }
                    RunPhase::Done => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("fetching results");
                        });
                    }
                }

                ui.ctx().request_repaint_after(Duration::from_millis(100));
            }
        }

        action
    }

    fn results_ui(&mut self, ui: &mut egui::Ui) {
        let Some(results) = &self.results else {
            ui.centered_and_justified(|ui| {
                ui.label("No results yet. Connect and run a simulation.");
            });
            return;
        };

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.results_tab, ResultsTab::Reflection, "S11");
            ui.selectable_value(
                &mut self.results_tab,
                ResultsTab::Pattern,
                "Radiation pattern",
            );
        });
        ui.separator();

        match self.results_tab {
            ResultsTab::Reflection => {
                s11::show(ui, &results.trace, self.config.plot.s11_floor_db)
            }
            ResultsTab::Pattern => self.pattern_view.show(ui, &results.pattern),
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_running();

        let mut action = None;
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                action = self.controls_ui(ui);
            });

        if let Some(action) = action {
            self.apply(action);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.results_ui(ui);
        });

        self.error_dialog.show(ctx);
    }
}

fn derived_dimensions_ui(ui: &mut egui::Ui, antenna: AntennaKind, frequency_ghz: f64) {
    if frequency_ghz <= 0.0 {
        ui.label("frequency must be positive");
        return;
    }

    egui::Grid::new("derived_dimensions")
        .num_columns(2)
        .show(ui, |ui| {
            match antenna {
                AntennaKind::Dipole => {
                    let parameters = DipoleParameters::derive(frequency_ghz, None);
                    ui.label("wavelength");
                    ui.label(format!("{:.2} mm", parameters.wavelength_mm));
                    ui.end_row();
                    ui.label("total length");
                    ui.label(format!("{:.2} mm", parameters.dipole_total_length_mm));
                    ui.end_row();
                    ui.label("wire radius");
                    ui.label(format!("{:.2} mm", parameters.wire_radius_mm));
                    ui.end_row();
                    ui.label("feed gap");
                    ui.label(format!("{:.2} mm", parameters.gap_mm));
                    ui.end_row();
                }
                AntennaKind::Microstrip => {
                    let parameters = MicrostripParameters::derive(frequency_ghz);
                    ui.label("patch length");
                    ui.label(format!("{:.2} mm", parameters.patch_length_mm));
                    ui.end_row();
                    ui.label("patch width");
                    ui.label(format!("{:.2} mm", parameters.patch_width_mm));
                    ui.end_row();
                    ui.label("substrate height");
                    ui.label(format!("{:.2} mm", parameters.substrate_height_mm));
                    ui.end_row();
                    ui.label("substrate εr");
                    ui.label(format!("{:.2}", parameters.substrate_epsr));
                    ui.end_row();
                }
            }
        });
}
