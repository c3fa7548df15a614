use super::{
    colorize_class, exit_code_for, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS,
};
use iconpack_core::{Pipeline, PipelineConfig, PublishRequest, PublishResult};
use std::path::Path;

pub fn run(config_path: &Path, request: &PublishRequest, json: bool) -> Result<u8, String> {
    let config = PipelineConfig::load(config_path).map_err(|e| format!("config error: {e}"))?;
    let pipeline = Pipeline::from_config(&config).map_err(|e| e.to_string())?;

    let pb = if json {
        None
    } else {
        Some(spinner(&format!(
            "publishing icons for '{}'...",
            request.project_name
        )))
    };

    let result = pipeline.execute(request);
    match &result {
        PublishResult::Published(report) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "package published");
            }
            if json {
                println!("{}", json_pretty(&result)?);
            } else {
                println!("{}", report.message);
                println!("archive: {}", report.archive);
                println!("digest: {}", report.digest);
                println!("remote: {}", report.remote_reference);
            }
            Ok(EXIT_SUCCESS)
        }
        PublishResult::Failed { error } => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "publish failed");
            }
            if json {
                println!("{}", json_pretty(&result)?);
            } else {
                eprintln!("error [{}]: {}", colorize_class(error.class), error.message);
            }
            Ok(exit_code_for(error.class))
        }
    }
}
