use montylib::{Fault, EXIT_FAILURE};
use tracing::debug;


/// Print the diagnostic line for `fault` and terminate the process.
/// Callers release the data area before getting here.
pub fn fatal(fault: &Fault) -> ! {
    debug!(line = ?fault.line(), ?fault, "halting on fault");
    eprintln!("{fault}");
    std::process::exit(EXIT_FAILURE);
}
