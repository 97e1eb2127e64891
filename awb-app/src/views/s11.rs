use awb_engine::SweepTrace;
use egui_plot::{
    Legend,
    Line,
    MarkerShape,
    Plot,
    PlotPoints,
    Points,
};

/// Reflection coefficient over the frequency sweep, with the best match
/// marked.
pub fn show(ui: &mut egui::Ui, trace: &SweepTrace, floor_db: f64) {
    let line: Vec<[f64; 2]> = trace
        .frequency_ghz
        .iter()
        .zip(&trace.s11_db)
        .map(|(frequency, s11)| [*frequency, *s11])
        .collect();

    let minimum = trace
        .frequency_ghz
        .iter()
        .zip(&trace.s11_db)
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(frequency, s11)| [*frequency, *s11]);

    Plot::new("s11")
        .legend(Legend::default())
        .x_axis_label("frequency [GHz]")
        .y_axis_label("S11 [dB]")
        .include_y(floor_db)
        .include_y(0.0)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new("S11", PlotPoints::from(line)));

            if let Some(minimum) = minimum {
                plot_ui.points(
                    Points::new("best match", vec![minimum])
                        .shape(MarkerShape::Diamond)
                        .radius(5.0)
                        .highlight(true),
                );
            }
        });
}
