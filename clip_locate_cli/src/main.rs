#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]

mod app;
mod cli;
mod logging;
mod timestamp;

fn main() {
    let return_code = app::run_app();
    std::process::exit(return_code);
}
