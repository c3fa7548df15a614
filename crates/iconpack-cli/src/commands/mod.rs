pub mod completions;
pub mod generate;
pub mod man_pages;
pub mod publish;

use iconpack_core::ErrorClass;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_UPSTREAM_ERROR: u8 = 3;

/// Exit status for a failed run: request and configuration problems are 2,
/// icon service and feed failures 3, everything else 1.
pub fn exit_code_for(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Config => EXIT_CONFIG_ERROR,
        ErrorClass::Fetch | ErrorClass::Publish => EXIT_UPSTREAM_ERROR,
        ErrorClass::Generation | ErrorClass::Assembly | ErrorClass::Cleanup => EXIT_FAILURE,
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_class(class: ErrorClass) -> String {
    use console::Style;
    let label = class.to_string();
    match class {
        ErrorClass::Config => Style::new().yellow().apply_to(label).to_string(),
        ErrorClass::Fetch | ErrorClass::Publish => {
            Style::new().magenta().bold().apply_to(label).to_string()
        }
        ErrorClass::Generation | ErrorClass::Assembly | ErrorClass::Cleanup => {
            Style::new().red().apply_to(label).to_string()
        }
    }
}
