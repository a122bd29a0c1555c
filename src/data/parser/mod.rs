pub mod records;

pub use records::{read_experiment_csv, read_experiment_reader};
