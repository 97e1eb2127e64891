use awb_engine::AntennaKind;

#[derive(Clone, Debug, clap::Parser)]
pub struct Args {
    /// Driving frequency to start with, in GHz.
    #[clap(long)]
    pub frequency: Option<f64>,

    #[clap(long, value_enum)]
    pub antenna: Option<AntennaArg>,

    #[clap(long)]
    pub ignore_config: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum AntennaArg {
    Dipole,
    Microstrip,
}

impl From<AntennaArg> for AntennaKind {
    fn from(value: AntennaArg) -> Self {
        match value {
            AntennaArg::Dipole => AntennaKind::Dipole,
            AntennaArg::Microstrip => AntennaKind::Microstrip,
        }
    }
}
