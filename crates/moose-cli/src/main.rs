use std::{env, fs, process::ExitCode, time::Instant};

use moose::{Runner, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.moose" };
    let code = match read_file(file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let runner = match Runner::new(&code, file_path) {
        Ok(runner) => runner,
        Err(errors) => {
            eprintln!("compilation failed with {} error(s):\n{errors}", errors.len());
            return ExitCode::FAILURE;
        }
    };
    eprintln!("compiled in {:?}", start.elapsed());

    let start = Instant::now();
    match runner.run(&mut StdPrint) {
        Ok(_globals) => {
            eprintln!("finished in {:?}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(panic) => {
            eprintln!("{panic}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("cannot read {file_path}: {err}"));
        }
    }
    fs::read_to_string(file_path).map_err(|err| format!("cannot read {file_path}: {err}"))
}
