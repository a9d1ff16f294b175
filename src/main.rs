use std::process::ExitCode;

fn main() -> ExitCode {
    match vol_mesh::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("curate: {} stage failed: {err}", err.stage());
            ExitCode::from(err.exit_code())
        }
    }
}
