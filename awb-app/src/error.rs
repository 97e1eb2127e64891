use color_eyre::eyre::Error;

/// Modal error window. Anything the UI can't recover from inline lands
/// here; the user reads it and closes it.
#[derive(Debug, Default)]
pub struct ErrorDialog {
    error: Option<Error>,
}

impl ErrorDialog {
    pub fn set_error<E>(&mut self, error: E)
    where
        Error: From<E>,
    {
        self.error = Some(error.into());
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        if let Some(error) = &self.error {
            let mut open1 = true;
            let mut open2 = true;

            egui::Window::new("Error")
                .movable(true)
                .open(&mut open1)
                .collapsible(false)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical()
                        .id_salt("error_message")
                        .show(ui, |ui| {
                            egui::Frame::new().inner_margin(5).show(ui, |ui| {
                                ui.label(format!("{error:#}"));
                            });
                        });

                    ui.separator();

                    ui.with_layout(egui::Layout::right_to_left(Default::default()), |ui| {
                        if ui.button("Close").clicked() {
                            open2 = false;
                        }
                    });
                });

            if !open1 || !open2 {
                self.error = None;
            }
        }
    }
}

pub trait ResultExt<T>: Sized {
    fn ok_or_show(self, dialog: &mut ErrorDialog) -> Option<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    Error: From<E>,
{
    fn ok_or_show(self, dialog: &mut ErrorDialog) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                dialog.set_error(error);
                None
            }
        }
    }
}
