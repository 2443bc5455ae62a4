mod checks;

pub use checks::{BatchCreated, CheckService};
